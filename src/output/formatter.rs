//! Plain-text rendering of archived comments
//!
//! Each comment detail artifact becomes `{id}-comment.txt`: the comment's
//! non-empty attributes as `key: value` header lines, a blank line, then
//! the comment body.

use crate::output::{read_json, OutputResult};
use crate::storage::ArchiveLayout;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Attributes that never appear in the header block
const IGNORED_HEADERS: [&str; 2] = ["displayProperties", "comment"];

/// Renders a comment detail as `(comment id, text)`
///
/// Returns `None` for records without `id`, `type` or `attributes`, and for
/// comments without a body.
pub fn format_comment(detail: &Value) -> Option<(String, String)> {
    let id = detail.get("id")?.as_str()?;
    detail.get("type")?;
    let attributes = detail.get("attributes")?.as_object()?;

    let body = attributes.get("comment")?.as_str()?;
    if body.is_empty() {
        return None;
    }

    let mut text = String::new();
    for (key, value) in attributes {
        if IGNORED_HEADERS.contains(&key.as_str()) || is_empty_value(value) {
            continue;
        }
        text.push_str(&format!("{}: {}\n", key, render_value(value)));
    }
    text.push('\n');
    text.push_str(body);
    text.push('\n');

    Some((id.to_string(), text))
}

/// Writes one comment's text file into `out_dir`
///
/// Returns the written path, or `None` if the comment had nothing to render.
pub fn write_comment_text(out_dir: &Path, detail: &Value) -> OutputResult<Option<PathBuf>> {
    let Some((id, text)) = format_comment(detail) else {
        return Ok(None);
    };
    let path = out_dir.join(format!("{}-comment.txt", id));
    fs::write(&path, text)?;
    Ok(Some(path))
}

/// Renders every comment artifact of an archive into `out_dir`
///
/// Returns the number of text files written.
pub fn extract_comments(archive_dir: &Path, out_dir: &Path) -> OutputResult<usize> {
    let layout = ArchiveLayout::new(archive_dir);
    fs::create_dir_all(out_dir)?;

    let mut artifacts: Vec<PathBuf> = fs::read_dir(layout.comments_dir())?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    artifacts.sort();

    let mut written = 0;
    for artifact in &artifacts {
        let detail = read_json(artifact)?;
        if write_comment_text(out_dir, &detail)?.is_some() {
            written += 1;
        }
    }

    tracing::info!(
        "Extracted {} of {} comments to {}",
        written,
        artifacts.len(),
        out_dir.display()
    );
    Ok(written)
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
