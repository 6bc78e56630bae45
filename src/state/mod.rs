//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `QuotaWindow`: per-window request accounting owned by the fetcher
//! - `ArchiveStage`: the ordered stages of an archive run

mod quota;
mod stage;

// Re-export main types
pub use quota::{describe_wait, QuotaCheck, QuotaWindow};
pub use stage::ArchiveStage;
