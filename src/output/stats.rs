//! Statistics from a resume manifest
//!
//! This module summarizes how far an archive run has progressed, using
//! only the checkpoint store.

use crate::state::ArchiveStage;
use crate::storage::{CheckpointStore, ResumeManifest, StorageError};

/// Archive progress summary
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveStatistics {
    /// Docket the archive belongs to, if any run started
    pub docket_id: Option<String>,

    /// Whether the docket details were fetched
    pub docket_completed: bool,

    /// Documents in the listing, once drained
    pub documents: Option<usize>,

    /// Documents whose comment ids have been discovered
    pub documents_discovered: usize,

    /// Comment ids discovered across all documents
    pub comments_discovered: usize,

    /// Comments whose details have been fetched
    pub comments_detailed: usize,

    /// Fetched comments that had at least one saved attachment file
    pub comments_with_attachments: usize,

    /// Attachment files saved
    pub attachment_files: usize,

    /// First stage with outstanding work
    pub pending_stage: ArchiveStage,
}

impl ArchiveStatistics {
    pub fn from_manifest(manifest: &ResumeManifest) -> Self {
        Self {
            docket_id: manifest.docket_id.clone(),
            docket_completed: manifest.docket_completed,
            documents: manifest.documents().map(<[_]>::len),
            documents_discovered: manifest.document_comments.len(),
            comments_discovered: manifest.discovered_comments().len(),
            comments_detailed: manifest.comment_attachments.len(),
            comments_with_attachments: manifest
                .comment_attachments
                .values()
                .filter(|paths| !paths.is_empty())
                .count(),
            attachment_files: manifest.comment_attachments.values().map(Vec::len).sum(),
            pending_stage: manifest.pending_stage(),
        }
    }
}

/// Loads statistics from a checkpoint store
///
/// # Arguments
///
/// * `store` - The checkpoint store to read
///
/// # Returns
///
/// * `Ok(ArchiveStatistics)` - Successfully loaded statistics
/// * `Err(StorageError)` - The manifest could not be read
pub fn load_statistics(store: &dyn CheckpointStore) -> Result<ArchiveStatistics, StorageError> {
    let manifest = store.load()?;
    Ok(ArchiveStatistics::from_manifest(&manifest))
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &ArchiveStatistics) {
    println!("=== Archive Statistics ===\n");

    println!("Overview:");
    println!(
        "  Docket: {}",
        stats.docket_id.as_deref().unwrap_or("(not started)")
    );
    println!(
        "  Docket details: {}",
        if stats.docket_completed { "fetched" } else { "pending" }
    );
    match stats.documents {
        Some(count) => println!("  Documents listed: {}", count),
        None => println!("  Documents listed: pending"),
    }
    println!();

    println!("Comments:");
    println!(
        "  Documents with discovered comments: {}",
        stats.documents_discovered
    );
    println!("  Comment ids discovered: {}", stats.comments_discovered);

    let percentage = if stats.comments_discovered > 0 {
        (stats.comments_detailed as f64 / stats.comments_discovered as f64) * 100.0
    } else {
        0.0
    };
    println!(
        "  Comments fetched: {} ({:.1}%)",
        stats.comments_detailed, percentage
    );
    println!(
        "  Attachment files: {} across {} comments",
        stats.attachment_files, stats.comments_with_attachments
    );
    println!();

    println!("Next stage: {}", stats.pending_stage);
}
