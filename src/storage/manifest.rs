//! Resume manifest and its JSON checkpoint store
//!
//! The manifest is a versioned record of which crawl units have completed.
//! It is rewritten wholesale after every unit and trusted verbatim when a
//! run resumes.

use crate::api::DocumentRef;
use crate::state::ArchiveStage;
use crate::storage::artifacts::write_json_artifact;
use crate::storage::traits::{CheckpointStore, StorageError, StorageResult};
use crate::storage::ArchiveLayout;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Current manifest schema version
pub const MANIFEST_VERSION: u32 = 1;

/// Persisted record of crawl progress
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResumeManifest {
    /// Schema version, always `MANIFEST_VERSION` when written
    pub version: u32,

    /// Docket this output directory belongs to
    #[serde(default)]
    pub docket_id: Option<String>,

    /// Docket details have been fetched and written
    #[serde(default)]
    pub docket_completed: bool,

    /// Full document listing, once drained
    #[serde(default)]
    pub documents: Option<Vec<DocumentRef>>,

    /// Comment ids discovered per document object id
    #[serde(default)]
    pub document_comments: BTreeMap<String, Vec<String>>,

    /// Attachment paths saved per fetched comment (empty when none)
    #[serde(default)]
    pub comment_attachments: BTreeMap<String, Vec<String>>,
}

impl ResumeManifest {
    /// Creates an empty manifest
    pub fn new() -> Self {
        Self {
            version: MANIFEST_VERSION,
            docket_id: None,
            docket_completed: false,
            documents: None,
            document_comments: BTreeMap::new(),
            comment_attachments: BTreeMap::new(),
        }
    }

    /// Ties the manifest to a docket, refusing a different one
    pub fn bind_docket(&mut self, docket_id: &str) -> StorageResult<()> {
        match &self.docket_id {
            Some(existing) if existing != docket_id => Err(StorageError::DocketMismatch {
                expected: docket_id.to_string(),
                found: existing.clone(),
            }),
            Some(_) => Ok(()),
            None => {
                self.docket_id = Some(docket_id.to_string());
                Ok(())
            }
        }
    }

    pub fn mark_docket_completed(&mut self) {
        self.docket_completed = true;
    }

    pub fn documents(&self) -> Option<&[DocumentRef]> {
        self.documents.as_deref()
    }

    pub fn record_documents(&mut self, documents: Vec<DocumentRef>) {
        self.documents = Some(documents);
    }

    /// Comment ids discovered for a document, if its discovery completed
    pub fn comments_for(&self, object_id: &str) -> Option<&[String]> {
        self.document_comments.get(object_id).map(Vec::as_slice)
    }

    pub fn record_document_comments(&mut self, object_id: &str, comment_ids: Vec<String>) {
        self.document_comments
            .insert(object_id.to_string(), comment_ids);
    }

    /// Attachment paths of a comment, if its detail stage completed
    pub fn attachments_for(&self, comment_id: &str) -> Option<&[String]> {
        self.comment_attachments.get(comment_id).map(Vec::as_slice)
    }

    pub fn record_comment(&mut self, comment_id: &str, attachment_paths: Vec<String>) {
        self.comment_attachments
            .insert(comment_id.to_string(), attachment_paths);
    }

    /// Comment ids of all listed documents, in discovery order
    pub fn discovered_comments(&self) -> Vec<&str> {
        self.documents()
            .unwrap_or(&[])
            .iter()
            .filter_map(|doc| self.comments_for(&doc.object_id))
            .flatten()
            .map(String::as_str)
            .collect()
    }

    /// The first stage with outstanding work
    pub fn pending_stage(&self) -> ArchiveStage {
        if !self.docket_completed {
            return ArchiveStage::DocketDetails;
        }
        let Some(documents) = self.documents() else {
            return ArchiveStage::DocumentList;
        };
        if documents
            .iter()
            .any(|doc| self.comments_for(&doc.object_id).is_none())
        {
            return ArchiveStage::CommentDiscovery;
        }
        if self
            .discovered_comments()
            .into_iter()
            .any(|id| self.attachments_for(id).is_none())
        {
            return ArchiveStage::CommentDetail;
        }
        ArchiveStage::Finalize
    }
}

impl Default for ResumeManifest {
    fn default() -> Self {
        Self::new()
    }
}

/// Checkpoint store keeping the manifest as JSON inside the output directory
#[derive(Debug, Clone)]
pub struct JsonManifestStore {
    output_dir: PathBuf,
}

impl JsonManifestStore {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Location of the manifest file
    pub fn path(&self) -> PathBuf {
        ArchiveLayout::new(&self.output_dir).manifest()
    }
}

impl CheckpointStore for JsonManifestStore {
    fn load(&self) -> StorageResult<ResumeManifest> {
        let path = self.path();
        if !path.exists() {
            return Ok(ResumeManifest::new());
        }
        let content = std::fs::read_to_string(&path)?;
        parse_manifest(&path, &content)
    }

    fn save(&self, manifest: &ResumeManifest) -> StorageResult<()> {
        write_json_artifact(&self.path(), manifest)
    }
}

/// Parses manifest text, checking the version before the schema
fn parse_manifest(path: &Path, content: &str) -> StorageResult<ResumeManifest> {
    let corrupt = |reason: String| StorageError::CorruptManifest {
        path: path.to_path_buf(),
        reason,
    };

    let raw: Value = serde_json::from_str(content).map_err(|e| corrupt(e.to_string()))?;
    let version = raw
        .get("version")
        .and_then(Value::as_u64)
        .ok_or_else(|| corrupt("missing version".to_string()))?;
    if version != u64::from(MANIFEST_VERSION) {
        return Err(StorageError::UnsupportedVersion {
            found: u32::try_from(version).unwrap_or(u32::MAX),
            expected: MANIFEST_VERSION,
        });
    }

    serde_json::from_value(raw).map_err(|e| corrupt(e.to_string()))
}
