// src/pipeline/events.rs

//! Per-entry outcome reporting.
//!
//! The ingestion engine reports every skip, retry and failure through an
//! injected `IngestEvents` sink instead of logging directly, so callers
//! decide where the detail goes.

use std::fmt;

use crate::error::AppError;
use crate::models::{ArticleRecord, CanonicalUrl};

/// Why pagination stopped. None of these abort the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HaltReason {
    /// A page yielded no entries
    EmptyPage,
    /// The site returned no further page data
    Exhausted,
    /// No continuation is available from the current page
    NoContinuation,
    /// The configured page ceiling was reached
    PageCeiling(u32),
    /// Fetching or reading the next page failed
    PageFailed(String),
}

impl fmt::Display for HaltReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPage => write!(f, "page has no entries"),
            Self::Exhausted => write!(f, "site returned no further pages"),
            Self::NoContinuation => write!(f, "no continuation available"),
            Self::PageCeiling(max) => write!(f, "page ceiling of {max} reached"),
            Self::PageFailed(error) => write!(f, "next page failed: {error}"),
        }
    }
}

/// Sink for ingestion outcomes. Every method defaults to doing nothing.
pub trait IngestEvents: Send + Sync {
    /// A record was written to the store.
    fn added(&self, _record: &ArticleRecord) {}

    /// An entry was skipped because its URL is already stored.
    fn duplicate(&self, _url: &CanonicalUrl) {}

    /// No publication date could be found; the record is kept without one.
    fn no_date(&self, _url: &CanonicalUrl, _error: Option<&AppError>) {}

    /// A store write failed and will be retried.
    fn retrying(
        &self,
        _url: &CanonicalUrl,
        _attempt: u32,
        _max_attempts: u32,
        _error: &AppError,
    ) {
    }

    /// A record was given up on after all attempts.
    fn failed(&self, _record: &ArticleRecord, _attempts: u32, _error: &AppError) {}

    /// Dry run: the record that would have been written.
    fn dry_run(&self, _record: &ArticleRecord) {}

    /// A listing page was processed.
    fn page_done(&self, _page: u32, _entries: usize) {}

    /// Pagination stopped after `pages` pages.
    fn halted(&self, _pages: u32, _reason: &HaltReason) {}
}

/// Default sink: everything goes to the `log` facade, dry-run records are
/// printed to stdout as JSON.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEvents;

impl IngestEvents for LogEvents {
    fn added(&self, record: &ArticleRecord) {
        log::info!(
            "ADDED: '{}' by {} (Date: {})",
            record.title,
            record.author.as_deref().unwrap_or("N/A"),
            record.iso_date().as_deref().unwrap_or("N/A")
        );
    }

    fn duplicate(&self, url: &CanonicalUrl) {
        log::debug!("Skipping duplicate: {}", url);
    }

    fn no_date(&self, url: &CanonicalUrl, error: Option<&AppError>) {
        match error {
            Some(e) => log::warn!("Failed to load article page {} for date: {}", url, e),
            None => log::warn!("No publication date found for {}", url),
        }
    }

    fn retrying(&self, url: &CanonicalUrl, attempt: u32, max_attempts: u32, error: &AppError) {
        log::warn!(
            "Store write failed for {} (attempt {}/{}): {}",
            url,
            attempt,
            max_attempts,
            error
        );
    }

    fn failed(&self, record: &ArticleRecord, attempts: u32, error: &AppError) {
        log::error!(
            "FAILED: '{}' ({}) after {} attempt(s): {}",
            record.title,
            record.url,
            attempts,
            error
        );
    }

    fn dry_run(&self, record: &ArticleRecord) {
        match serde_json::to_string_pretty(record) {
            Ok(json) => println!("{json}"),
            Err(e) => log::warn!("Could not render {}: {}", record.url, e),
        }
    }

    fn page_done(&self, page: u32, entries: usize) {
        log::info!("Page {}: {} entries", page, entries);
    }

    fn halted(&self, pages: u32, reason: &HaltReason) {
        log::info!("Pagination stopped after {} page(s): {}", pages, reason);
    }
}
