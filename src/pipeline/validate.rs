// src/pipeline/validate.rs

use crate::error::Result;
use crate::models::{Config, StoreBackend};
use crate::services::{DateExtractor, ListingExtractor, Paginator};

/// Validate configuration and compile every selector chain.
///
/// A missing store credential is only reported; it does not fail validation.
pub fn run_validate(config: &Config) -> Result<()> {
    log::info!("Validating configuration...");

    if let Err(e) = check(config) {
        log::error!("Config validation failed: {}", e);
        return Err(e);
    }

    log::info!("✓ Config OK");
    log::info!("  Listing: {}", config.listing_url()?);
    log::info!("  User agent: {}", config.crawler.user_agent);
    log::info!(
        "  Timeout: {}s, page delay: {}ms, max pages: {}",
        config.crawler.timeout_secs,
        config.crawler.page_delay_ms,
        config.crawler.max_pages
    );
    log::info!(
        "  Retry: {} attempt(s), {}ms backoff",
        config.retry.max_attempts,
        config.retry.backoff_ms
    );
    log::info!(
        "✓ Selectors OK ({} listing, {} date)",
        config.selectors.listing.all().count(),
        config.selectors.date.all().count()
    );

    match config.store.backend {
        StoreBackend::Airtable => {
            let airtable = &config.store.airtable;
            log::info!("  Store: Airtable {}/{}", airtable.base_id, airtable.table);
            if credential_present(&airtable.token_env) {
                log::info!("✓ Credential {} is set", airtable.token_env);
            } else {
                log::warn!("Credential {} is not set; runs will fail", airtable.token_env);
            }
        }
        StoreBackend::Local => {
            log::info!("  Store: local file {}", config.store.local.path.display());
        }
    }

    log::info!("All validations passed!");
    Ok(())
}

fn check(config: &Config) -> Result<()> {
    config.validate()?;
    let base_url = config.base_url()?;
    ListingExtractor::new(&config.selectors.listing, base_url.clone())?;
    DateExtractor::new(&config.selectors.date)?;
    Paginator::new(&config.pagination, &base_url, &config.listing_url()?)?;
    Ok(())
}

fn credential_present(var: &str) -> bool {
    std::env::var(var).is_ok_and(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    fn local_config() -> Config {
        let mut config = Config::default();
        config.store.backend = StoreBackend::Local;
        config
    }

    #[test]
    fn test_defaults_with_local_store_pass() {
        assert!(run_validate(&local_config()).is_ok());
    }

    #[test]
    fn test_invalid_selector_fails() {
        let mut config = local_config();
        config.selectors.listing.summary = vec!["p[[".into()];
        assert!(matches!(
            run_validate(&config),
            Err(AppError::Selector { .. })
        ));
    }

    #[test]
    fn test_missing_credential_only_warns() {
        let mut config = local_config();
        config.store.backend = StoreBackend::Airtable;
        config.store.airtable.base_id = "appBase".into();
        config.store.airtable.table = "Articles".into();
        config.store.airtable.token_env = "HARVESTER_VALIDATE_TOKEN_NEVER_SET".into();
        assert!(run_validate(&config).is_ok());
    }
}
