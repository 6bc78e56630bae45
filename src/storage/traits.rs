//! Storage traits and error types
//!
//! This module defines the trait interface for checkpoint backends and
//! associated error types.

use crate::storage::ResumeManifest;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt resume manifest at {}: {}", .path.display(), .reason)]
    CorruptManifest { path: PathBuf, reason: String },

    #[error("Unsupported resume manifest version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("Output directory belongs to docket {found}, not {expected}")]
    DocketMismatch { expected: String, found: String },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for checkpoint backends
///
/// A store holds exactly one manifest per archive output. `save` is a full,
/// idempotent overwrite; `load` of a store that was never saved returns an
/// empty manifest.
pub trait CheckpointStore {
    /// Loads the persisted manifest, or an empty one if none exists
    fn load(&self) -> StorageResult<ResumeManifest>;

    /// Persists the manifest, replacing any previous copy
    fn save(&self, manifest: &ResumeManifest) -> StorageResult<()>;
}
