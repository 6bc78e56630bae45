//! Docket Archiver: a resumable, quota-aware docket crawler
//!
//! This crate archives a regulatory docket (its documents, their comments and
//! the comments' attachments) from a paginated, rate-limited REST API into a
//! local directory, checkpointing progress so an interrupted run can resume.

pub mod api;
pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for archive operations
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Received a 400/BAD_REQUEST from {url} with: {body}")]
    BadRequest { url: String, body: String },

    #[error("Unparseable response body from {url}: {source}")]
    InvalidPayload {
        url: String,
        source: serde_json::Error,
    },

    #[error("No data in response from {url} (HTTP {status})")]
    MissingPayload { url: String, status: u16 },

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Rate limit wait was cancelled")]
    Cancelled,
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration is missing api-key")]
    MissingApiKey,

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for archive operations
pub type Result<T> = std::result::Result<T, ArchiveError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{ArchiveOptions, ArchiveReport, Cancellation, Coordinator, Fetcher, Paginator};
pub use state::{ArchiveStage, QuotaWindow};
pub use storage::{CheckpointStore, JsonManifestStore, ResumeManifest};
