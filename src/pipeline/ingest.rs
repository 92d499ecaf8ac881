// src/pipeline/ingest.rs

//! Incremental ingestion.
//!
//! Loads the URLs already in the store, walks the listing page by page,
//! skips known articles, dates and writes the rest. Delivery is at most once
//! per canonical URL, within a run and across runs.
//!
//! Only the store listing and the first page fetch are fatal. A failing
//! next page stops pagination, and a failing entry is reported and skipped.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use backon::{ConstantBuilder, Retryable};
use chrono::NaiveDate;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{ArticleRecord, CanonicalUrl, Config, DuplicateIndex, RawArticle};
use crate::pipeline::events::{HaltReason, IngestEvents};
use crate::services::{DateExtractor, ListingExtractor, PageFetcher, PaginationCursor, Paginator};
use crate::storage::RecordStore;
use crate::utils::url::{canonicalize, canonicalize_href};

/// Totals for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Records written (or, in a dry run, that would have been written)
    pub added: usize,
    /// Entries skipped because their URL was already known
    pub duplicates: usize,
    /// Entries given up on after all store attempts
    pub failed: usize,
    /// Entries with a title and a resolvable link
    pub seen: usize,
    /// Listing pages processed
    pub pages: u32,
    pub dry_run: bool,
    pub halt: Option<HaltReason>,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = if self.dry_run { "would be added" } else { "added" };
        write!(
            f,
            "{} new article(s) {}. {} duplicates skipped. {} failed. {} entries seen across {} page(s).",
            self.added, verb, self.duplicates, self.failed, self.seen, self.pages
        )
    }
}

/// Mutable state owned by a single run.
struct RunSession {
    index: DuplicateIndex,
    summary: RunSummary,
}

/// The ingestion engine.
pub struct Ingestor<'a> {
    fetcher: &'a dyn PageFetcher,
    store: &'a dyn RecordStore,
    events: &'a dyn IngestEvents,
    listing: ListingExtractor,
    dates: DateExtractor,
    paginator: Paginator,
    base_url: Url,
    listing_url: Url,
    max_pages: u32,
    page_delay: Duration,
    max_attempts: u32,
    backoff: ConstantBuilder,
    dry_run: bool,
}

impl<'a> Ingestor<'a> {
    /// Build an engine from configuration. Fails on invalid selectors or URLs.
    pub fn new(
        config: &Config,
        fetcher: &'a dyn PageFetcher,
        store: &'a dyn RecordStore,
        events: &'a dyn IngestEvents,
    ) -> Result<Self> {
        let base_url = config.base_url()?;
        let listing_url = config.listing_url()?;
        let max_attempts = config.retry.max_attempts.max(1);
        let backoff = ConstantBuilder::default()
            .with_delay(Duration::from_millis(config.retry.backoff_ms))
            .with_max_times(max_attempts as usize - 1);

        Ok(Self {
            fetcher,
            store,
            events,
            listing: ListingExtractor::new(&config.selectors.listing, base_url.clone())?,
            dates: DateExtractor::new(&config.selectors.date)?,
            paginator: Paginator::new(&config.pagination, &base_url, &listing_url)?,
            base_url,
            listing_url,
            max_pages: config.crawler.max_pages.max(1),
            page_delay: Duration::from_millis(config.crawler.page_delay_ms),
            max_attempts,
            backoff,
            dry_run: config.crawler.dry_run,
        })
    }

    /// Run one harvest.
    ///
    /// Returns an error only if the store cannot be listed or the first
    /// listing page cannot be fetched; nothing is written in either case.
    pub async fn run(&self) -> Result<RunSummary> {
        let index = self.load_index().await?;

        log::info!("Fetching listing: {}", self.listing_url);
        let first_page = self
            .fetcher
            .fetch(self.listing_url.as_str(), &[])
            .await
            .inspect_err(|e| log::error!("Error fetching listing page: {}", e))?;

        let mut session = RunSession {
            index,
            summary: RunSummary {
                dry_run: self.dry_run,
                ..RunSummary::default()
            },
        };

        let mut cursor = self.paginator.start(&first_page);
        let mut page_html = first_page;
        let mut page_no: u32 = 1;

        let halt = loop {
            session.summary.pages = page_no;

            let entries = self.listing.extract(&page_html);
            self.events.page_done(page_no, entries.len());
            if entries.is_empty() {
                break HaltReason::EmptyPage;
            }
            for raw in entries {
                self.process_entry(raw, &mut session).await;
            }

            if page_no >= self.max_pages {
                break HaltReason::PageCeiling(self.max_pages);
            }
            let Some(current) = cursor.take() else {
                break HaltReason::NoContinuation;
            };

            match self.fetch_next(&current).await {
                Ok(Some(html)) => {
                    page_html = html;
                    cursor = Some(current.advance());
                    page_no += 1;
                }
                Ok(None) => break HaltReason::Exhausted,
                Err(e) => break HaltReason::PageFailed(e.to_string()),
            }
        };

        self.events.halted(page_no, &halt);
        session.summary.halt = Some(halt);
        Ok(session.summary)
    }

    /// Seed the duplicate index from the store.
    async fn load_index(&self) -> Result<DuplicateIndex> {
        log::info!("Fetching existing article URLs from store...");
        let records = self
            .store
            .list()
            .await
            .inspect_err(|e| log::error!("Error loading existing records: {}", e))?;

        let index: DuplicateIndex = records
            .into_iter()
            .filter_map(|r| r.url)
            .filter(|url| !url.trim().is_empty())
            .map(|url| canonicalize(&url))
            .collect();

        log::info!("Found {} existing articles in store", index.len());
        Ok(index)
    }

    /// Fetch the page `cursor` points at, after the inter-page delay.
    async fn fetch_next(&self, cursor: &PaginationCursor) -> Result<Option<String>> {
        let Some(request) = self.paginator.next_request(cursor) else {
            return Ok(None);
        };

        if !self.page_delay.is_zero() {
            tokio::time::sleep(self.page_delay).await;
        }

        log::debug!(
            "Fetching listing page {} from {} (token: {})",
            cursor.page(),
            request.url,
            cursor.token().unwrap_or("-")
        );
        let body = self.fetcher.fetch(&request.url, &request.params).await?;
        self.paginator.read_page(&body)
    }

    async fn process_entry(&self, raw: RawArticle, session: &mut RunSession) {
        let Some(url) = canonicalize_href(&self.base_url, &raw.href) else {
            log::debug!("Skipping '{}': unresolvable link '{}'", raw.title, raw.href);
            return;
        };
        session.summary.seen += 1;

        if session.index.contains(&url) {
            session.summary.duplicates += 1;
            self.events.duplicate(&url);
            return;
        }

        let date = self.fetch_date(&url).await;
        let record = ArticleRecord::from_raw(raw, url, date);

        if self.dry_run {
            self.events.dry_run(&record);
            session.index.insert(record.url);
            session.summary.added += 1;
            return;
        }

        match self.persist(&record).await {
            Ok(()) => {
                self.events.added(&record);
                session.index.insert(record.url);
                session.summary.added += 1;
            }
            Err(_) => session.summary.failed += 1,
        }
    }

    /// Publication date from the article's own page. Never fails.
    async fn fetch_date(&self, url: &CanonicalUrl) -> Option<NaiveDate> {
        match self.fetcher.fetch(url.as_str(), &[]).await {
            Ok(html) => {
                let date = self.dates.extract(&html);
                if date.is_none() {
                    self.events.no_date(url, None);
                }
                date
            }
            Err(e) => {
                self.events.no_date(url, Some(&e));
                None
            }
        }
    }

    /// Write with a fixed backoff between attempts.
    ///
    /// Only transient errors are retried. Reports the final failure through
    /// `IngestEvents::failed`.
    async fn persist(&self, record: &ArticleRecord) -> Result<()> {
        let tries = AtomicU32::new(0);

        let result = (|| {
            tries.fetch_add(1, Ordering::Relaxed);
            self.store.create(record)
        })
        .retry(self.backoff.clone())
        .sleep(tokio::time::sleep)
        .when(AppError::is_transient)
        .notify(|e: &AppError, _| {
            let attempt = tries.load(Ordering::Relaxed);
            self.events.retrying(&record.url, attempt, self.max_attempts, e);
        })
        .await;

        if let Err(e) = &result {
            self.events.failed(record, tries.load(Ordering::Relaxed), e);
        }
        result
    }
}

/// Run one harvest with the given collaborators.
pub async fn run_ingest(
    config: &Config,
    fetcher: &dyn PageFetcher,
    store: &dyn RecordStore,
    events: &dyn IngestEvents,
) -> Result<RunSummary> {
    Ingestor::new(config, fetcher, store, events)?.run().await
}
