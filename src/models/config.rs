//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::SelectorConfig;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Target site location
    #[serde(default)]
    pub site: SiteConfig,

    /// HTTP and crawling behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Store write retry policy
    #[serde(default)]
    pub retry: RetryConfig,

    /// How further listing pages are requested
    #[serde(default)]
    pub pagination: PaginationConfig,

    /// Listing and article-page selectors
    #[serde(default)]
    pub selectors: SelectorConfig,

    /// Remote table settings
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Parsed site base URL.
    pub fn base_url(&self) -> Result<Url> {
        Ok(Url::parse(&self.site.base_url)?)
    }

    /// URL of the first listing page.
    pub fn listing_url(&self) -> Result<Url> {
        Ok(self.base_url()?.join(&self.site.listing_path)?)
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        let base = self
            .base_url()
            .map_err(|e| AppError::validation(format!("site.base_url is invalid: {e}")))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(AppError::validation("site.base_url must be http(s)"));
        }
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.crawler.page_delay_ms == 0 {
            return Err(AppError::validation("crawler.page_delay_ms must be > 0"));
        }
        if self.crawler.max_pages == 0 {
            return Err(AppError::validation("crawler.max_pages must be > 0"));
        }
        if self.retry.max_attempts == 0 {
            return Err(AppError::validation("retry.max_attempts must be > 0"));
        }
        if self.selectors.listing.card.is_empty() {
            return Err(AppError::validation("selectors.listing.card is empty"));
        }
        if self.selectors.listing.link.is_empty() {
            return Err(AppError::validation("selectors.listing.link is empty"));
        }
        if self.selectors.date.formats.is_empty() {
            return Err(AppError::validation("selectors.date.formats is empty"));
        }
        self.pagination.validate()?;
        self.store.validate()?;
        Ok(())
    }
}

/// Target site settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Base URL; relative links are resolved against it
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// Path of the first listing page, relative to `base_url`
    #[serde(default = "defaults::listing_path")]
    pub listing_path: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            listing_path: defaults::listing_path(),
        }
    }
}

/// HTTP client and crawling behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Delay between pagination requests in milliseconds
    #[serde(default = "defaults::page_delay")]
    pub page_delay_ms: u64,

    /// Maximum number of listing pages per run
    #[serde(default = "defaults::max_pages")]
    pub max_pages: u32,

    /// Extract and dedupe but print records instead of writing them
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            page_delay_ms: defaults::page_delay(),
            max_pages: defaults::max_pages(),
            dry_run: false,
        }
    }
}

/// Retry policy for store writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per record, including the first
    #[serde(default = "defaults::max_attempts")]
    pub max_attempts: u32,

    /// Fixed delay between attempts in milliseconds
    #[serde(default = "defaults::backoff")]
    pub backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: defaults::max_attempts(),
            backoff_ms: defaults::backoff(),
        }
    }
}

/// How the listing continues past the first page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PaginationConfig {
    /// Only the first listing page is harvested.
    #[serde(alias = "none")]
    Single,

    /// Plain HTML pages selected by a query parameter (`?page=1`, `?page=2`, ...).
    QueryParam {
        #[serde(default = "defaults::page_param")]
        param: String,
    },

    /// Drupal Views AJAX pager. The view's DOM id is captured from the first
    /// page and echoed back on every request; responses are JSON command
    /// arrays carrying an HTML fragment.
    DrupalViews {
        #[serde(default = "defaults::ajax_path")]
        ajax_path: String,
        view_name: String,
        view_display_id: String,
        #[serde(default = "defaults::token_pattern")]
        token_pattern: String,
        #[serde(default = "defaults::fragment_key")]
        fragment_key: String,
    },
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self::Single
    }
}

impl PaginationConfig {
    fn validate(&self) -> Result<()> {
        match self {
            Self::Single => Ok(()),
            Self::QueryParam { param } if param.trim().is_empty() => {
                Err(AppError::validation("pagination.param is empty"))
            }
            Self::QueryParam { .. } => Ok(()),
            Self::DrupalViews {
                view_name,
                view_display_id,
                fragment_key,
                ..
            } => {
                if view_name.trim().is_empty() || view_display_id.trim().is_empty() {
                    return Err(AppError::validation(
                        "pagination.view_name and pagination.view_display_id are required",
                    ));
                }
                if fragment_key.trim().is_empty() {
                    return Err(AppError::validation("pagination.fragment_key is empty"));
                }
                Ok(())
            }
        }
    }
}

/// Which store adapter to use.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    Airtable,
    Local,
}

/// Remote table settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    #[serde(default)]
    pub airtable: AirtableConfig,

    #[serde(default)]
    pub local: LocalStoreConfig,
}

impl StoreConfig {
    fn validate(&self) -> Result<()> {
        match self.backend {
            StoreBackend::Airtable => self.airtable.validate(),
            StoreBackend::Local => {
                if self.local.path.as_os_str().is_empty() {
                    return Err(AppError::validation("store.local.path is empty"));
                }
                Ok(())
            }
        }
    }
}

/// Airtable connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AirtableConfig {
    #[serde(default = "defaults::api_url")]
    pub api_url: String,

    /// Base identifier (`app...`)
    #[serde(default)]
    pub base_id: String,

    /// Table identifier (`tbl...`) or name
    #[serde(default)]
    pub table: String,

    /// Environment variable holding the personal access token
    #[serde(default = "defaults::token_env")]
    pub token_env: String,

    /// Field keys in `fields` are field IDs (`fld...`) rather than names
    #[serde(default)]
    pub use_field_ids: bool,

    #[serde(default = "defaults::airtable_page_size")]
    pub page_size: u32,

    #[serde(default)]
    pub fields: FieldMap,
}

impl Default for AirtableConfig {
    fn default() -> Self {
        Self {
            api_url: defaults::api_url(),
            base_id: String::new(),
            table: String::new(),
            token_env: defaults::token_env(),
            use_field_ids: false,
            page_size: defaults::airtable_page_size(),
            fields: FieldMap::default(),
        }
    }
}

impl AirtableConfig {
    fn validate(&self) -> Result<()> {
        if self.base_id.trim().is_empty() || self.table.trim().is_empty() {
            return Err(AppError::validation(
                "store.airtable.base_id and store.airtable.table are required",
            ));
        }
        if self.token_env.trim().is_empty() {
            return Err(AppError::validation("store.airtable.token_env is empty"));
        }
        if !(1..=100).contains(&self.page_size) {
            return Err(AppError::validation(
                "store.airtable.page_size must be between 1 and 100",
            ));
        }
        Url::parse(&self.api_url)
            .map_err(|e| AppError::validation(format!("store.airtable.api_url: {e}")))?;
        Ok(())
    }
}

/// Table column key for each record field.
///
/// Keys must match the live table schema exactly; Airtable silently ignores
/// unknown names when `typecast` is on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldMap {
    #[serde(default = "defaults::field_title")]
    pub title: String,
    #[serde(default = "defaults::field_url")]
    pub url: String,
    #[serde(default = "defaults::field_image_url")]
    pub image_url: String,
    #[serde(default = "defaults::field_category")]
    pub category: String,
    #[serde(default = "defaults::field_summary")]
    pub summary: String,
    #[serde(default = "defaults::field_author")]
    pub author: String,
    #[serde(default = "defaults::field_publication_date")]
    pub publication_date: String,
}

impl Default for FieldMap {
    fn default() -> Self {
        Self {
            title: defaults::field_title(),
            url: defaults::field_url(),
            image_url: defaults::field_image_url(),
            category: defaults::field_category(),
            summary: defaults::field_summary(),
            author: defaults::field_author(),
            publication_date: defaults::field_publication_date(),
        }
    }
}

/// Local JSON file store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalStoreConfig {
    #[serde(default = "defaults::local_path")]
    pub path: PathBuf,
}

impl Default for LocalStoreConfig {
    fn default() -> Self {
        Self {
            path: defaults::local_path(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    #[serde(default = "defaults::log_level")]
    pub level: String,

    /// Write log output to this file instead of stderr
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
            file: None,
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    // Site defaults
    pub fn base_url() -> String {
        "https://knowledge.insead.edu".into()
    }
    pub fn listing_path() -> String {
        "/".into()
    }

    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
         (KHTML, like Gecko) Chrome/124.0 Safari/537.36"
            .into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn page_delay() -> u64 {
        2000
    }
    pub fn max_pages() -> u32 {
        5
    }

    // Retry defaults
    pub fn max_attempts() -> u32 {
        3
    }
    pub fn backoff() -> u64 {
        2000
    }

    // Pagination defaults
    pub fn page_param() -> String {
        "page".into()
    }
    pub fn ajax_path() -> String {
        "/views/ajax".into()
    }
    pub fn token_pattern() -> String {
        r"js-view-dom-id-([A-Za-z0-9_-]+)".into()
    }
    pub fn fragment_key() -> String {
        "data".into()
    }

    // Store defaults
    pub fn api_url() -> String {
        "https://api.airtable.com/v0".into()
    }
    pub fn token_env() -> String {
        "AIRTABLE_API_KEY".into()
    }
    pub fn airtable_page_size() -> u32 {
        100
    }
    pub fn local_path() -> PathBuf {
        PathBuf::from("articles.json")
    }

    // Field defaults (display names)
    pub fn field_title() -> String {
        "Title".into()
    }
    pub fn field_url() -> String {
        "Article URL".into()
    }
    pub fn field_image_url() -> String {
        "Image URL".into()
    }
    pub fn field_category() -> String {
        "Category".into()
    }
    pub fn field_summary() -> String {
        "Summary".into()
    }
    pub fn field_author() -> String {
        "Author".into()
    }
    pub fn field_publication_date() -> String {
        "Publication Date".into()
    }

    pub fn log_level() -> String {
        "info".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn airtable_config() -> Config {
        let mut config = Config::default();
        config.store.airtable.base_id = "appTest".to_string();
        config.store.airtable.table = "tblTest".to_string();
        config
    }

    #[test]
    fn validate_configured_airtable_ok() {
        assert!(airtable_config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_missing_airtable_ids() {
        assert!(Config::default().validate().is_err());
    }

    #[test]
    fn validate_accepts_local_store_without_airtable() {
        let mut config = Config::default();
        config.store.backend = StoreBackend::Local;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_max_pages() {
        let mut config = airtable_config();
        config.crawler.max_pages = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_page_delay() {
        let mut config = airtable_config();
        config.crawler.page_delay_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_attempts() {
        let mut config = airtable_config();
        config.retry.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_base_url() {
        let mut config = airtable_config();
        config.site.base_url = "not a url".to_string();
        assert!(config.validate().is_err());

        config.site.base_url = "ftp://example.com".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn listing_url_joins_path() {
        let mut config = Config::default();
        config.site.listing_path = "/latest".to_string();
        assert_eq!(
            config.listing_url().unwrap().as_str(),
            "https://knowledge.insead.edu/latest"
        );
    }

    #[test]
    fn parse_drupal_views_pagination() {
        let config: Config = toml::from_str(
            r#"
            [pagination]
            mode = "drupal_views"
            view_name = "articles"
            view_display_id = "block_1"

            [store]
            backend = "local"
            "#,
        )
        .unwrap();

        match &config.pagination {
            PaginationConfig::DrupalViews {
                ajax_path,
                fragment_key,
                ..
            } => {
                assert_eq!(ajax_path, "/views/ajax");
                assert_eq!(fragment_key, "data");
            }
            other => panic!("unexpected pagination: {other:?}"),
        }
        assert_eq!(config.store.backend, StoreBackend::Local);
        assert_eq!(config.crawler.max_pages, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_field_ids() {
        let config: Config = toml::from_str(
            r#"
            [store.airtable]
            base_id = "appX"
            table = "tblY"
            use_field_ids = true

            [store.airtable.fields]
            title = "fldTitle"
            url = "fldUrl"
            "#,
        )
        .unwrap();

        let fields = &config.store.airtable.fields;
        assert_eq!(fields.title, "fldTitle");
        assert_eq!(fields.url, "fldUrl");
        assert_eq!(fields.author, "Author");
        assert!(config.store.airtable.use_field_ids);
    }
}
