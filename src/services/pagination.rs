// src/services/pagination.rs

//! Listing pagination.
//!
//! The first listing page is an ordinary HTML page. How the next batch is
//! requested depends on the site: a query parameter, or a Drupal Views AJAX
//! endpoint that needs the view's DOM id captured from the first page.

use regex::Regex;
use serde_json::Value;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::PaginationConfig;

/// State needed to request the next listing batch. Lives for one run only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationCursor {
    /// Zero-based index of the next page (the first listing page is 0)
    page: u32,
    /// Site-specific continuation token
    token: Option<String>,
}

impl PaginationCursor {
    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Cursor for the page after this one.
    pub fn advance(self) -> Self {
        Self {
            page: self.page + 1,
            token: self.token,
        }
    }
}

/// A fetch to perform for the next listing batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub url: String,
    pub params: Vec<(String, String)>,
}

/// Builds continuation requests and reads their responses.
#[derive(Debug, Clone)]
pub enum Paginator {
    Single,
    QueryParam {
        listing_url: Url,
        param: String,
    },
    DrupalViews {
        ajax_url: Url,
        view_name: String,
        view_display_id: String,
        token_pattern: Regex,
        fragment_key: String,
    },
}

impl Paginator {
    pub fn new(config: &PaginationConfig, base_url: &Url, listing_url: &Url) -> Result<Self> {
        Ok(match config {
            PaginationConfig::Single => Self::Single,
            PaginationConfig::QueryParam { param } => Self::QueryParam {
                listing_url: listing_url.clone(),
                param: param.clone(),
            },
            PaginationConfig::DrupalViews {
                ajax_path,
                view_name,
                view_display_id,
                token_pattern,
                fragment_key,
            } => Self::DrupalViews {
                ajax_url: base_url.join(ajax_path)?,
                view_name: view_name.clone(),
                view_display_id: view_display_id.clone(),
                token_pattern: Regex::new(token_pattern).map_err(|e| {
                    AppError::config(format!("pagination.token_pattern is invalid: {e}"))
                })?,
                fragment_key: fragment_key.clone(),
            },
        })
    }

    /// Create the cursor from the first listing page.
    ///
    /// `None` means the listing cannot continue past the first page.
    pub fn start(&self, first_page: &str) -> Option<PaginationCursor> {
        match self {
            Self::Single => None,
            Self::QueryParam { .. } => Some(PaginationCursor {
                page: 1,
                token: None,
            }),
            Self::DrupalViews { token_pattern, .. } => {
                let token = token_pattern
                    .captures(first_page)
                    .and_then(|caps| caps.get(1))
                    .map(|m| m.as_str().to_string());
                if token.is_none() {
                    log::warn!("No view DOM id found on the first listing page");
                }
                token.map(|token| PaginationCursor {
                    page: 1,
                    token: Some(token),
                })
            }
        }
    }

    /// Request for the page the cursor points at.
    pub fn next_request(&self, cursor: &PaginationCursor) -> Option<PageRequest> {
        match self {
            Self::Single => None,
            Self::QueryParam { listing_url, param } => Some(PageRequest {
                url: listing_url.to_string(),
                params: vec![(param.clone(), cursor.page.to_string())],
            }),
            Self::DrupalViews {
                ajax_url,
                view_name,
                view_display_id,
                ..
            } => Some(PageRequest {
                url: ajax_url.to_string(),
                params: vec![
                    ("view_name".into(), view_name.clone()),
                    ("view_display_id".into(), view_display_id.clone()),
                    ("view_dom_id".into(), cursor.token.clone().unwrap_or_default()),
                    ("page".into(), cursor.page.to_string()),
                    ("_drupal_ajax".into(), "1".into()),
                ],
            }),
        }
    }

    /// Extract the HTML fragment from a continuation response.
    ///
    /// `Ok(None)` means the site signalled there is nothing more to fetch.
    pub fn read_page(&self, body: &str) -> Result<Option<String>> {
        match self {
            Self::Single => Ok(None),
            Self::QueryParam { .. } => {
                Ok((!body.trim().is_empty()).then(|| body.to_string()))
            }
            Self::DrupalViews { fragment_key, .. } => read_ajax_fragment(body, fragment_key),
        }
    }
}

/// Find the first non-empty `insert` fragment in a Drupal AJAX command array.
fn read_ajax_fragment(body: &str, key: &str) -> Result<Option<String>> {
    if body.trim().is_empty() {
        return Ok(None);
    }

    let payload: Value = serde_json::from_str(body)
        .map_err(|e| AppError::payload(format!("listing response is not JSON: {e}")))?;
    let Value::Array(commands) = payload else {
        return Err(AppError::payload("listing response is not a command array"));
    };

    let fragment = commands
        .iter()
        .filter(|cmd| {
            cmd.get("command")
                .and_then(Value::as_str)
                .is_none_or(|name| name == "insert")
        })
        .filter_map(|cmd| cmd.get(key).and_then(Value::as_str))
        .find(|html| !html.trim().is_empty())
        .map(str::to_string);

    Ok(fragment)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://knowledge.insead.edu").unwrap()
    }

    fn drupal() -> Paginator {
        let config = PaginationConfig::DrupalViews {
            ajax_path: "/views/ajax".into(),
            view_name: "articles".into(),
            view_display_id: "block_1".into(),
            token_pattern: r"js-view-dom-id-([A-Za-z0-9_-]+)".into(),
            fragment_key: "data".into(),
        };
        Paginator::new(&config, &base(), &base()).unwrap()
    }

    #[test]
    fn test_single_never_continues() {
        let paginator = Paginator::new(&PaginationConfig::Single, &base(), &base()).unwrap();
        assert!(paginator.start("<html></html>").is_none());
    }

    #[test]
    fn test_query_param_requests() {
        let config = PaginationConfig::QueryParam {
            param: "page".into(),
        };
        let listing = base().join("/latest").unwrap();
        let paginator = Paginator::new(&config, &base(), &listing).unwrap();

        let cursor = paginator.start("<html></html>").unwrap();
        let request = paginator.next_request(&cursor).unwrap();
        assert_eq!(request.url, "https://knowledge.insead.edu/latest");
        assert_eq!(request.params, vec![("page".to_string(), "1".to_string())]);

        let cursor = cursor.advance();
        assert_eq!(cursor.page(), 2);
        assert_eq!(paginator.read_page("  ").unwrap(), None);
    }

    #[test]
    fn test_drupal_token_captured() {
        let page = r#"<div class="view js-view-dom-id-4f2a9c_b1">...</div>"#;
        let paginator = drupal();
        let cursor = paginator.start(page).unwrap();
        assert_eq!(cursor.token(), Some("4f2a9c_b1"));

        let request = paginator.next_request(&cursor).unwrap();
        assert_eq!(request.url, "https://knowledge.insead.edu/views/ajax");
        assert!(request
            .params
            .contains(&("view_dom_id".to_string(), "4f2a9c_b1".to_string())));
        assert!(request.params.contains(&("page".to_string(), "1".to_string())));
    }

    #[test]
    fn test_drupal_missing_token_stops() {
        assert!(drupal().start("<div class='view'></div>").is_none());
    }

    #[test]
    fn test_drupal_reads_insert_fragment() {
        let body = r#"[
            {"command":"settings","data":{"ajaxPageState":{}}},
            {"command":"insert","method":"replaceWith","data":"<div class=\"card-object\"></div>"}
        ]"#;
        let fragment = drupal().read_page(body).unwrap();
        assert_eq!(fragment.as_deref(), Some("<div class=\"card-object\"></div>"));
    }

    #[test]
    fn test_drupal_empty_payload_is_end() {
        assert_eq!(drupal().read_page("[]").unwrap(), None);
        assert_eq!(drupal().read_page("").unwrap(), None);
        assert_eq!(
            drupal()
                .read_page(r#"[{"command":"insert","data":"  "}]"#)
                .unwrap(),
            None
        );
    }

    #[test]
    fn test_drupal_non_json_is_error() {
        assert!(matches!(
            drupal().read_page("<html>oops</html>"),
            Err(AppError::Payload(_))
        ));
        assert!(drupal().read_page(r#"{"data":"x"}"#).is_err());
    }

    #[test]
    fn test_invalid_token_pattern_is_config_error() {
        let config = PaginationConfig::DrupalViews {
            ajax_path: "/views/ajax".into(),
            view_name: "a".into(),
            view_display_id: "b".into(),
            token_pattern: "([".into(),
            fragment_key: "data".into(),
        };
        assert!(matches!(
            Paginator::new(&config, &base(), &base()),
            Err(AppError::Config(_))
        ));
    }
}
