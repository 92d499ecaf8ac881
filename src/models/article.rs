//! Article data structures.

use std::collections::HashSet;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::utils::url::canonicalize;

/// Category stored when a listing card carries none.
pub const DEFAULT_CATEGORY: &str = "unknown";

/// A URL reduced to scheme, host and path.
///
/// Query string and fragment are dropped and trailing slashes are stripped,
/// so every representation of the same article maps to one key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct CanonicalUrl(String);

impl CanonicalUrl {
    pub(crate) fn from_normalized(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for CanonicalUrl {
    fn from(value: String) -> Self {
        canonicalize(&value)
    }
}

impl From<&str> for CanonicalUrl {
    fn from(value: &str) -> Self {
        canonicalize(value)
    }
}

impl From<CanonicalUrl> for String {
    fn from(value: CanonicalUrl) -> Self {
        value.0
    }
}

impl fmt::Display for CanonicalUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A listing entry as it was found on the page, before normalization.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawArticle {
    pub title: String,
    /// Link as written in the markup (may be relative)
    pub href: String,
    pub category: Option<String>,
    pub summary: Option<String>,
    pub author: Option<String>,
    /// Image source, already resolved against the site base URL
    pub image_url: Option<String>,
}

/// An article ready to be written to the remote table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub title: String,

    /// Canonical article URL, the de-duplication key
    pub url: CanonicalUrl,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    #[serde(default = "default_category")]
    pub category: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    /// Serialized as `YYYY-MM-DD`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_date: Option<NaiveDate>,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

impl ArticleRecord {
    /// Assemble a record from a listing entry, its canonical URL and the
    /// date found on its detail page.
    pub fn from_raw(
        raw: RawArticle,
        url: CanonicalUrl,
        publication_date: Option<NaiveDate>,
    ) -> Self {
        Self {
            title: raw.title,
            url,
            image_url: raw.image_url,
            category: raw.category.unwrap_or_else(default_category),
            summary: raw.summary,
            author: raw.author,
            publication_date,
        }
    }

    /// Publication date formatted as ISO 8601 (`YYYY-MM-DD`).
    pub fn iso_date(&self) -> Option<String> {
        self.publication_date.map(|d| d.format("%Y-%m-%d").to_string())
    }
}

/// Set of canonical URLs already present in the store.
///
/// Seeded once from the store listing and grown as records are written.
/// Entries are never removed.
#[derive(Debug, Default)]
pub struct DuplicateIndex {
    urls: HashSet<CanonicalUrl>,
}

impl DuplicateIndex {
    pub fn contains(&self, url: &CanonicalUrl) -> bool {
        self.urls.contains(url)
    }

    /// Returns `false` if the URL was already known.
    pub fn insert(&mut self, url: CanonicalUrl) -> bool {
        self.urls.insert(url)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

impl FromIterator<CanonicalUrl> for DuplicateIndex {
    fn from_iter<I: IntoIterator<Item = CanonicalUrl>>(iter: I) -> Self {
        Self {
            urls: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_defaults_category() {
        let raw = RawArticle {
            title: "Leading in Uncertain Times".to_string(),
            href: "/leadership/leading".to_string(),
            ..RawArticle::default()
        };
        let record = ArticleRecord::from_raw(
            raw,
            CanonicalUrl::from("https://knowledge.insead.edu/leadership/leading"),
            None,
        );

        assert_eq!(record.category, DEFAULT_CATEGORY);
        assert!(record.summary.is_none());
        assert!(record.author.is_none());
        assert!(record.image_url.is_none());
        assert!(record.iso_date().is_none());
    }

    #[test]
    fn test_record_serializes_iso_date() {
        let record = ArticleRecord {
            title: "T".to_string(),
            url: CanonicalUrl::from("https://x.com/a"),
            image_url: None,
            category: "Strategy".to_string(),
            summary: None,
            author: None,
            publication_date: NaiveDate::from_ymd_opt(2025, 6, 2),
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["publication_date"], "2025-06-02");
        assert_eq!(json["url"], "https://x.com/a");
        assert!(json.get("summary").is_none());
    }

    #[test]
    fn test_deserialize_canonicalizes_url() {
        let json = r#"{"title":"T","url":"https://x.com/a/?utm=1","category":"c"}"#;
        let record: ArticleRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.url.as_str(), "https://x.com/a");
    }

    #[test]
    fn test_duplicate_index_grows() {
        let mut index: DuplicateIndex = vec![CanonicalUrl::from("https://x.com/a")]
            .into_iter()
            .collect();

        assert!(index.contains(&CanonicalUrl::from("https://x.com/a#top")));
        assert!(index.insert(CanonicalUrl::from("https://x.com/b")));
        assert!(!index.insert(CanonicalUrl::from("https://x.com/b/")));
        assert_eq!(index.len(), 2);
    }
}
