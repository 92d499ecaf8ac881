//! Local filesystem storage implementation.
//!
//! Keeps records as a pretty-printed JSON array in a single file, for
//! offline runs and testing. Production deployments should use
//! `AirtableStore`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::ArticleRecord;
use crate::storage::{RecordStore, StoredRecord};

/// JSON file storage backend.
#[derive(Debug, Clone)]
pub struct LocalStore {
    path: PathBuf,
}

impl LocalStore {
    /// Create a store backed by the file at `path` (created on first write).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read all records, returning an empty list if the file doesn't exist.
    pub async fn load(&self) -> Result<Vec<ArticleRecord>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Vec::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let tmp = self.path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for LocalStore {
    async fn list(&self) -> Result<Vec<StoredRecord>> {
        let records = self.load().await?;
        Ok(records
            .into_iter()
            .map(|r| StoredRecord {
                id: None,
                url: Some(r.url.to_string()),
            })
            .collect())
    }

    async fn create(&self, record: &ArticleRecord) -> Result<()> {
        let mut records = self.load().await?;
        if records.iter().any(|r| r.url == record.url) {
            return Err(AppError::validation(format!(
                "record for {} already stored",
                record.url
            )));
        }

        records.push(record.clone());
        let bytes = serde_json::to_vec_pretty(&records)?;
        self.write_bytes(&bytes).await?;
        log::debug!("Stored {} ({} records in {:?})", record.url, records.len(), self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CanonicalUrl;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn record(url: &str) -> ArticleRecord {
        ArticleRecord {
            title: "Leading Through Change".to_string(),
            url: CanonicalUrl::from(url),
            image_url: None,
            category: "Leadership".to_string(),
            summary: None,
            author: Some("Jane Doe".to_string()),
            publication_date: NaiveDate::from_ymd_opt(2025, 6, 2),
        }
    }

    #[tokio::test]
    async fn test_list_nonexistent_is_empty() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path().join("nope.json"));

        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path().join("data/articles.json"));

        store.create(&record("https://x.com/a")).await.unwrap();
        store.create(&record("https://x.com/b")).await.unwrap();

        let listed = store.list().await.unwrap();
        let urls: Vec<_> = listed.iter().filter_map(|r| r.url.as_deref()).collect();
        assert_eq!(urls, vec!["https://x.com/a", "https://x.com/b"]);

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded[0].publication_date, NaiveDate::from_ymd_opt(2025, 6, 2));
        assert!(!store.path().with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_url() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path().join("articles.json"));

        store.create(&record("https://x.com/a")).await.unwrap();
        let result = store.create(&record("https://x.com/a/?utm=1")).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(store.load().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("articles.json");
        std::fs::write(&path, b"{not json").unwrap();

        let store = LocalStore::new(&path);
        assert!(matches!(store.list().await, Err(AppError::Json(_))));
    }
}
