//! Store adapters for article records.
//!
//! The ingestion engine only needs two operations from the remote table:
//! list what is already there, and append a record.
//!
//! - `AirtableStore`: Airtable REST API (production)
//! - `LocalStore`: JSON file on disk (offline runs, tests)

pub mod airtable;
pub mod local;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{ArticleRecord, CrawlerConfig, StoreBackend, StoreConfig};
use crate::utils::http::create_api_client;

// Re-export for convenience
pub use airtable::AirtableStore;
pub use local::LocalStore;

/// A row already present in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    /// Store-assigned identifier, if the backend has one
    pub id: Option<String>,
    /// Raw value of the URL column (not yet canonicalized)
    pub url: Option<String>,
}

/// Trait for record storage backends.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// List every record currently stored.
    async fn list(&self) -> Result<Vec<StoredRecord>>;

    /// Append one record.
    async fn create(&self, record: &ArticleRecord) -> Result<()>;
}

/// Build the configured store backend.
///
/// Fails with `AppError::MissingCredential` when the Airtable token is not
/// set in the environment.
pub fn build_store(config: &StoreConfig, crawler: &CrawlerConfig) -> Result<Box<dyn RecordStore>> {
    match config.backend {
        StoreBackend::Airtable => {
            let client = create_api_client(crawler)?;
            Ok(Box::new(AirtableStore::from_env(client, &config.airtable)?))
        }
        StoreBackend::Local => Ok(Box::new(LocalStore::new(&config.local.path))),
    }
}
