//! Spreadsheet attachment collection

use crate::output::{read_json, OutputError, OutputResult};
use crate::storage::ArchiveLayout;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Attachment extensions copied by `move_spreadsheets`
pub const SPREADSHEET_EXTENSIONS: [&str; 2] = ["xlsx", "xls"];

/// Copies every spreadsheet attachment of an archive into `target`
///
/// Files are read from the `comment_attachments.json` summary and land in
/// `target` as `{commentId}_{filename}`. Returns the number of files copied.
pub fn move_spreadsheets(archive_dir: &Path, target: &Path) -> OutputResult<usize> {
    let layout = ArchiveLayout::new(archive_dir);
    tracing::info!("copying spreadsheet attachments to: {}", target.display());

    let summary: BTreeMap<String, Vec<String>> =
        serde_json::from_value(read_json(&layout.summary())?)?;
    fs::create_dir_all(target)?;

    let mut copied = 0;
    for (comment_id, paths) in &summary {
        for relative in paths.iter().filter(|path| is_spreadsheet(path)) {
            let source = layout.comments_dir().join(relative);
            let filename = source
                .file_name()
                .and_then(|name| name.to_str())
                .ok_or_else(|| {
                    OutputError::Malformed(format!("attachment path without a file name: {}", relative))
                })?;
            if !source.is_file() {
                return Err(OutputError::MissingArtifact(source));
            }

            tracing::info!("moving: {}", relative);
            fs::copy(&source, target.join(format!("{}_{}", comment_id, filename)))?;
            copied += 1;
        }
    }

    Ok(copied)
}

fn is_spreadsheet(path: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SPREADSHEET_EXTENSIONS
                .iter()
                .any(|candidate| ext.eq_ignore_ascii_case(candidate))
        })
}
