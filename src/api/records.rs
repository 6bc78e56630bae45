//! Typed access to the handful of record fields the crawl consumes
//!
//! Records stay opaque `serde_json::Value`s everywhere else; only these
//! accessors look inside them.

use crate::ArchiveError;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Wire format of `attributes.lastModifiedDate`
const API_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Format the `filter[lastModifiedDate][ge]` parameter expects
const FILTER_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A document of the docket, as recorded in the resume manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DocumentRef {
    /// Stable document id
    pub id: String,

    /// Internal object id comments are filed against
    pub object_id: String,
}

impl DocumentRef {
    pub fn from_record(record: &Value) -> Result<Self, ArchiveError> {
        let id = record_id(record)?.to_string();
        let object_id = attribute_str(record, "objectId")
            .ok_or_else(|| {
                ArchiveError::MalformedRecord(format!("document {} has no objectId", id))
            })?
            .to_string();
        Ok(Self { id, object_id })
    }

    /// Name of the per-document comment listing artifact
    pub fn comments_artifact_name(&self) -> String {
        format!("{}_{}_comments.json", self.id, self.object_id)
    }
}

/// One downloadable file-format variant of an attachment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentFile {
    pub attachment_id: String,
    pub url: String,
    pub filename: String,
}

/// Returns a record's stable `id`
pub fn record_id(record: &Value) -> Result<&str, ArchiveError> {
    record
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| ArchiveError::MalformedRecord(format!("record without id: {}", record)))
}

/// Returns `attributes.{name}` when it is a string
pub fn attribute_str<'a>(record: &'a Value, name: &str) -> Option<&'a str> {
    record.get("attributes")?.get(name)?.as_str()
}

/// Returns the `data` records of one page (empty when absent)
pub fn page_records(body: &Value) -> &[Value] {
    body.get("data")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Returns true only if `meta.hasNextPage` is present and true
pub fn has_next_page(body: &Value) -> bool {
    body.get("meta")
        .and_then(|meta| meta.get("hasNextPage"))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// Converts a comment's `lastModifiedDate` into a cursor filter value
pub fn cursor_timestamp(record: &Value) -> Result<String, ArchiveError> {
    let raw = attribute_str(record, "lastModifiedDate").ok_or_else(|| {
        ArchiveError::MalformedRecord(format!(
            "comment {} has no lastModifiedDate",
            record_id(record).unwrap_or("<unknown>")
        ))
    })?;
    let parsed = NaiveDateTime::parse_from_str(raw, API_TIMESTAMP_FORMAT).map_err(|e| {
        ArchiveError::MalformedRecord(format!("bad lastModifiedDate '{}': {}", raw, e))
    })?;
    Ok(parsed.format(FILTER_TIMESTAMP_FORMAT).to_string())
}

/// Name of a comment's detail artifact: `{commentOnDocumentId}_{commentId}.json`
pub fn comment_artifact_name(detail: &Value, comment_id: &str) -> Result<String, ArchiveError> {
    let document_id = attribute_str(detail, "commentOnDocumentId").ok_or_else(|| {
        ArchiveError::MalformedRecord(format!("comment {} has no commentOnDocumentId", comment_id))
    })?;
    Ok(format!("{}_{}.json", document_id, comment_id))
}

/// Collects the downloadable variants of a comment's attachments
///
/// `response` is the full `GET /comments/{id}?include=attachments` body.
/// Attachments come back in `included` order, variants in `fileFormats`
/// order. Variants without a usable `fileUrl` are skipped.
pub fn attachment_files(response: &Value) -> Vec<AttachmentFile> {
    let Some(linked) = response
        .pointer("/data/relationships/attachments/data")
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };
    let linked_ids: Vec<&str> = linked
        .iter()
        .filter_map(|link| link.get("id").and_then(Value::as_str))
        .collect();

    let Some(included) = response.get("included").and_then(Value::as_array) else {
        return Vec::new();
    };

    let mut files = Vec::new();
    for attachment in included {
        let Some(attachment_id) = attachment.get("id").and_then(Value::as_str) else {
            continue;
        };
        if !linked_ids.contains(&attachment_id) {
            continue;
        }
        let Some(formats) = attachment
            .pointer("/attributes/fileFormats")
            .and_then(Value::as_array)
        else {
            continue;
        };
        for format in formats {
            let Some(url) = format.get("fileUrl").and_then(Value::as_str) else {
                continue;
            };
            if let Some(filename) = file_name_from_url(url) {
                files.push(AttachmentFile {
                    attachment_id: attachment_id.to_string(),
                    url: url.to_string(),
                    filename,
                });
            }
        }
    }
    files
}

/// Last path segment of a file URL, if it has one
fn file_name_from_url(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let name = parsed.path_segments()?.last()?;
    if name.is_empty() || name == "." || name == ".." {
        return None;
    }
    Some(name.to_string())
}
