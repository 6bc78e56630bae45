//! Output module for post-processing an archive directory
//!
//! This module handles:
//! - Rendering archived comments as plain text
//! - Copying spreadsheet attachments into one folder
//! - Comparing two archives and extracting the new comments
//! - Summarizing archive progress from the resume manifest

mod differ;
mod formatter;
mod mover;
pub mod stats;

pub use differ::{
    collect_comment_keys, diff_archives, extract_new_comments, print_diff, ArchiveDiff, CommentKey,
};
pub use formatter::{extract_comments, format_comment, write_comment_text};
pub use mover::{move_spreadsheets, SPREADSHEET_EXTENSIONS};
pub use stats::{load_statistics, print_statistics, ArchiveStatistics};

use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised by the post-processing tools
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Archive artifact not found: {}", .0.display())]
    MissingArtifact(PathBuf),

    #[error("Malformed archive: {0}")]
    Malformed(String),
}

pub type OutputResult<T> = std::result::Result<T, OutputError>;

/// Reads a JSON artifact, reporting a missing file as `MissingArtifact`
pub(crate) fn read_json(path: &Path) -> OutputResult<Value> {
    if !path.is_file() {
        return Err(OutputError::MissingArtifact(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
