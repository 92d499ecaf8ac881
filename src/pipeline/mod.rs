//! Pipeline entry points.
//!
//! - `run_ingest`: Harvest new articles from the listing into the store
//! - `run_validate`: Check configuration and selectors without fetching

pub mod events;
pub mod ingest;
pub mod validate;

pub use events::{HaltReason, IngestEvents, LogEvents};
pub use ingest::{Ingestor, RunSummary, run_ingest};
pub use validate::run_validate;
