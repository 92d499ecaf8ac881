// src/models/mod.rs

//! Domain models for the harvester.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod article;
mod config;
mod selectors;

// Re-export all public types
pub use article::{ArticleRecord, CanonicalUrl, DEFAULT_CATEGORY, DuplicateIndex, RawArticle};
pub use config::{
    AirtableConfig, Config, CrawlerConfig, FieldMap, LocalStoreConfig, LoggingConfig,
    PaginationConfig, RetryConfig, SiteConfig, StoreBackend, StoreConfig,
};
pub use selectors::{AttrSelector, DateSelectors, ListingSelectors, SelectorConfig};
