//! Storage module for persisting archive data
//!
//! This module handles everything the archive writes to disk:
//! - The resume manifest and its checkpoint store
//! - Atomic JSON artifact writes
//! - The on-disk layout of an archive output directory

mod artifacts;
mod manifest;
mod traits;

pub use artifacts::{write_atomic, write_json_artifact};
pub use manifest::{JsonManifestStore, ResumeManifest, MANIFEST_VERSION};
pub use traits::{CheckpointStore, StorageError, StorageResult};

use crate::api::DocumentRef;
use std::path::{Path, PathBuf};

/// Resume manifest file name
pub const MANIFEST_FILE: &str = "__resume_info.dat";

/// Docket details artifact
pub const DOCKET_DETAILS_FILE: &str = "docket_details.json";

/// Raw document listing artifact
pub const DOCUMENTS_FILE: &str = "docket_documents.json";

/// Comment to attachment-paths summary artifact
pub const SUMMARY_FILE: &str = "comment_attachments.json";

/// Folder holding comment details and attachment folders
pub const COMMENTS_DIR: &str = "comments";

/// Paths of every artifact inside one archive output directory
#[derive(Debug, Clone)]
pub struct ArchiveLayout {
    root: PathBuf,
}

impl ArchiveLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn docket_details(&self) -> PathBuf {
        self.root.join(DOCKET_DETAILS_FILE)
    }

    pub fn documents(&self) -> PathBuf {
        self.root.join(DOCUMENTS_FILE)
    }

    pub fn document_comments(&self, document: &DocumentRef) -> PathBuf {
        self.root.join(document.comments_artifact_name())
    }

    pub fn comments_dir(&self) -> PathBuf {
        self.root.join(COMMENTS_DIR)
    }

    pub fn comment_detail(&self, artifact_name: &str) -> PathBuf {
        self.comments_dir().join(artifact_name)
    }

    /// Folder name for a comment's attachments, relative to `comments/`
    pub fn attachment_folder_name(comment_id: &str) -> String {
        format!("{}_attachments", comment_id)
    }

    pub fn attachment_dir(&self, comment_id: &str) -> PathBuf {
        self.comments_dir()
            .join(Self::attachment_folder_name(comment_id))
    }

    /// Path recorded in the manifest for a saved attachment file
    pub fn attachment_relative_path(comment_id: &str, filename: &str) -> String {
        format!("{}/{}", Self::attachment_folder_name(comment_id), filename)
    }

    pub fn summary(&self) -> PathBuf {
        self.root.join(SUMMARY_FILE)
    }

    pub fn manifest(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }
}
