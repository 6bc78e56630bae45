//! Crawler module for archiving a docket
//!
//! This module contains the core archiving logic, including:
//! - Rate-governed HTTP fetching with quota accounting
//! - Draining paginated result sets, with cursor fallback for comments
//! - Overall stage coordination and checkpointing

mod coordinator;
mod fetcher;
mod paginator;

pub use coordinator::{run_archive, ArchiveOptions, ArchiveReport, Coordinator};
pub use fetcher::{build_http_client, Cancellation, FetchOutcome, Fetcher};
pub use paginator::Paginator;
