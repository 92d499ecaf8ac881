//! Service layer for the harvester.
//!
//! This module contains the collaborators the ingestion engine drives:
//! - Page fetching (`PageFetcher`, `HttpFetcher`)
//! - Listing and date extraction (`ListingExtractor`, `DateExtractor`)
//! - Listing continuation (`Paginator`)

pub mod extractor;
pub mod fetcher;
pub mod pagination;

pub use extractor::{DateExtractor, ListingExtractor};
pub use fetcher::{HttpFetcher, PageFetcher};
pub use pagination::{PageRequest, PaginationCursor, Paginator};
