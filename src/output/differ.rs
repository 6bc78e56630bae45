//! Comparison of two archives of the same docket
//!
//! Comments are keyed by `(document id, comment id)` as listed in each
//! archive's document listing and per-document comment listings. Comments
//! present only in the newer archive can be extracted as text together with
//! their attachment folders.

use crate::api::{record_id, DocumentRef};
use crate::output::{read_json, write_comment_text, OutputError, OutputResult};
use crate::storage::ArchiveLayout;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// One comment's identity within an archive
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CommentKey {
    pub doc_id: String,
    pub comment_id: String,
}

impl CommentKey {
    /// File name of the comment's detail artifact under `comments/`
    pub fn artifact_name(&self) -> String {
        format!("{}_{}.json", self.doc_id, self.comment_id)
    }
}

/// Comments present in only one of two archives
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArchiveDiff {
    pub only_in_newer: Vec<CommentKey>,
    pub only_in_original: Vec<CommentKey>,
}

impl ArchiveDiff {
    pub fn is_empty(&self) -> bool {
        self.only_in_newer.is_empty() && self.only_in_original.is_empty()
    }
}

/// Collects every comment key listed in an archive directory
pub fn collect_comment_keys(archive_dir: &Path) -> OutputResult<BTreeSet<CommentKey>> {
    let layout = ArchiveLayout::new(archive_dir);
    let listing = read_json(&layout.documents())?;
    let records = listing.as_array().map(Vec::as_slice).unwrap_or_default();

    let mut keys = BTreeSet::new();
    for record in records {
        let document = DocumentRef::from_record(record).map_err(malformed)?;
        let comments = read_json(&layout.document_comments(&document))?;
        for comment in comments.as_array().map(Vec::as_slice).unwrap_or_default() {
            keys.insert(CommentKey {
                doc_id: document.id.clone(),
                comment_id: record_id(comment).map_err(malformed)?.to_string(),
            });
        }
    }
    Ok(keys)
}

/// Computes the symmetric difference of two archives' comment keys
pub fn diff_archives(newer: &Path, original: &Path) -> OutputResult<ArchiveDiff> {
    let newer_keys = collect_comment_keys(newer)?;
    let original_keys = collect_comment_keys(original)?;

    Ok(ArchiveDiff {
        only_in_newer: newer_keys.difference(&original_keys).cloned().collect(),
        only_in_original: original_keys.difference(&newer_keys).cloned().collect(),
    })
}

/// Writes the text and attachments of each comment only in the newer archive
///
/// Returns the keys whose detail artifact could not be found; those are
/// logged and skipped.
pub fn extract_new_comments(
    newer: &Path,
    diff: &ArchiveDiff,
    out_dir: &Path,
) -> OutputResult<Vec<CommentKey>> {
    let layout = ArchiveLayout::new(newer);
    fs::create_dir_all(out_dir)?;

    let mut missing = Vec::new();
    for key in &diff.only_in_newer {
        let detail = match read_json(&layout.comment_detail(&key.artifact_name())) {
            Ok(detail) => detail,
            Err(OutputError::MissingArtifact(path)) => {
                tracing::warn!("Could not find file for comment: {}", path.display());
                missing.push(key.clone());
                continue;
            }
            Err(e) => return Err(e),
        };
        write_comment_text(out_dir, &detail)?;

        let attachment_dir = layout.attachment_dir(&key.comment_id);
        if attachment_dir.is_dir() {
            let copy_dir = out_dir.join(ArchiveLayout::attachment_folder_name(&key.comment_id));
            copy_files(&attachment_dir, &copy_dir)?;
        }
    }

    Ok(missing)
}

/// Prints the differing comment ids
pub fn print_diff(diff: &ArchiveDiff) {
    if diff.is_empty() {
        println!("No differing comments");
        return;
    }
    for key in &diff.only_in_newer {
        println!("+ {} ({})", key.comment_id, key.doc_id);
    }
    for key in &diff.only_in_original {
        println!("- {} ({})", key.comment_id, key.doc_id);
    }
}

fn copy_files(from: &Path, to: &Path) -> OutputResult<()> {
    fs::create_dir_all(to)?;
    let files: Vec<PathBuf> = fs::read_dir(from)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .collect();
    for file in files {
        if let Some(name) = file.file_name() {
            fs::copy(&file, to.join(name))?;
        }
    }
    Ok(())
}

fn malformed(error: crate::ArchiveError) -> OutputError {
    OutputError::Malformed(error.to_string())
}
