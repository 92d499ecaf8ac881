// src/services/fetcher.rs

//! Page fetching.

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{AppError, Result};
use crate::models::CrawlerConfig;
use crate::utils::http::create_async_client;

/// Source of page content.
///
/// Implementations may be plain HTTP clients or browser automation; the
/// ingestion engine only sees the returned body.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch `url` with optional query parameters and return the body.
    async fn fetch(&self, url: &str, params: &[(String, String)]) -> Result<String>;
}

/// Statuses the site's bot protection answers with.
const BLOCKED_STATUSES: [u16; 3] = [403, 429, 503];

/// Markers of the interstitial served while a challenge is pending.
const CHALLENGE_MARKERS: [&str; 2] = ["<title>Just a moment...</title>", "cf-chl"];

/// Fetcher backed by a `reqwest` client.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a fetcher with a client configured from crawler settings.
    pub fn from_config(config: &CrawlerConfig) -> Result<Self> {
        Ok(Self::new(create_async_client(config)?))
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, params: &[(String, String)]) -> Result<String> {
        let mut request = self.client.get(url);
        if !params.is_empty() {
            request = request.query(params);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        check_response(url, status, &body)?;
        log::debug!("Fetched {} (HTTP {}, {} bytes)", url, status, body.len());
        Ok(body)
    }
}

/// Classify a response as content, a challenge page or a plain failure.
fn check_response(url: &str, status: u16, body: &str) -> Result<()> {
    if BLOCKED_STATUSES.contains(&status) || CHALLENGE_MARKERS.iter().any(|m| body.contains(m)) {
        return Err(AppError::Blocked {
            url: url.to_string(),
            status,
        });
    }
    if !(200..300).contains(&status) {
        return Err(AppError::fetch(url, format!("HTTP {status}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_response() {
        assert!(check_response("https://x.com", 200, "<html></html>").is_ok());
    }

    #[test]
    fn test_challenge_status_is_blocked() {
        let err = check_response("https://x.com", 403, "Forbidden").unwrap_err();
        assert!(matches!(err, AppError::Blocked { status: 403, .. }));
    }

    #[test]
    fn test_challenge_page_with_200_is_blocked() {
        let body = "<html><head><title>Just a moment...</title></head></html>";
        assert!(matches!(
            check_response("https://x.com", 200, body),
            Err(AppError::Blocked { status: 200, .. })
        ));
    }

    #[test]
    fn test_not_found_is_fetch_error() {
        assert!(matches!(
            check_response("https://x.com/missing", 404, ""),
            Err(AppError::Fetch { .. })
        ));
    }
}
