//! Result-set draining over the paginated API
//!
//! Offset pagination walks `page[number]` until the server reports no next
//! page. The server only serves a fixed window of pages per query, so
//! comment listings that fill the window continue with a cursor on
//! `lastModifiedDate`.

use crate::api::{
    comment_listing_params, cursor_timestamp, has_next_page, page_records, record_id, set_param,
    LAST_MODIFIED_GE, PAGE_NUMBER,
};
use crate::config::PaginationConfig;
use crate::crawler::Fetcher;
use crate::Result;
use serde_json::Value;
use std::collections::HashSet;

/// Records collected so far, unique by `id`, in first-seen order
#[derive(Debug, Default)]
struct UniqueRecords {
    seen: HashSet<String>,
    records: Vec<Value>,
}

impl UniqueRecords {
    /// Appends unseen records and returns how many were new
    fn extend(&mut self, batch: Vec<Value>) -> Result<usize> {
        let mut added = 0;
        for record in batch {
            let id = record_id(&record)?.to_string();
            if self.seen.insert(id) {
                self.records.push(record);
                added += 1;
            }
        }
        Ok(added)
    }
}

/// Drains complete result sets through a `Fetcher`
#[derive(Debug, Clone)]
pub struct Paginator {
    page_size: u32,
    max_pages_per_batch: u32,
}

impl Paginator {
    pub fn new(config: &PaginationConfig) -> Self {
        Self {
            page_size: config.page_size,
            max_pages_per_batch: config.max_pages_per_batch,
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Most records one offset-paginated query can return
    pub fn max_items_per_batch(&self) -> usize {
        self.page_size as usize * self.max_pages_per_batch as usize
    }

    /// Drains every page of `url`, dropping records whose id was already seen
    pub async fn drain_all(
        &self,
        fetcher: &mut Fetcher,
        url: &str,
        base_params: &[(String, String)],
    ) -> Result<Vec<Value>> {
        let mut unique = UniqueRecords::default();
        let batch = self.drain_batch(fetcher, url, base_params).await?;
        unique.extend(batch)?;
        Ok(unique.records)
    }

    /// Drains all comments on one document, switching to cursor mode when
    /// the offset window fills up
    ///
    /// The cursor filter is inclusive, so each cursor batch re-returns at
    /// least the pivot record; duplicates are dropped by id.
    pub async fn drain_comments(
        &self,
        fetcher: &mut Fetcher,
        url: &str,
        object_id: &str,
    ) -> Result<Vec<Value>> {
        let max_items = self.max_items_per_batch();
        let mut params = comment_listing_params(object_id, self.page_size);
        let mut unique = UniqueRecords::default();

        let first = self.drain_batch(fetcher, url, &params).await?;
        let first_len = first.len();
        unique.extend(first)?;
        if first_len < max_items {
            return Ok(unique.records);
        }

        tracing::info!(
            "Comment listing for {} filled the {}-item window, continuing by lastModifiedDate",
            object_id,
            max_items
        );

        while let Some(last) = unique.records.last() {
            let cursor = cursor_timestamp(last)?;
            set_param(&mut params, LAST_MODIFIED_GE, cursor.as_str());

            let batch = self.drain_batch(fetcher, url, &params).await?;
            if batch.is_empty() {
                break;
            }
            let batch_len = batch.len();
            let added = unique.extend(batch)?;
            tracing::debug!(
                "Cursor batch from {}: {} records, {} new",
                cursor,
                batch_len,
                added
            );

            if batch_len < max_items {
                break;
            }
            if added == 0 {
                tracing::warn!(
                    "Cursor stalled at {}: a full batch of {} comments shares this timestamp, later comments on {} are unreachable",
                    cursor,
                    batch_len,
                    object_id
                );
                break;
            }
        }

        Ok(unique.records)
    }

    /// Walks `page[number]` from 1 until the result set is exhausted
    ///
    /// Stops on an absent body, an empty `data` page, or a missing/false
    /// `meta.hasNextPage`. Records are returned in server order, duplicates
    /// included.
    async fn drain_batch(
        &self,
        fetcher: &mut Fetcher,
        url: &str,
        base_params: &[(String, String)],
    ) -> Result<Vec<Value>> {
        let mut batch = Vec::new();
        let mut page_number: u32 = 1;

        loop {
            let mut params = base_params.to_vec();
            set_param(&mut params, PAGE_NUMBER, page_number.to_string());

            let outcome = fetcher.get_or_wait(url, &params).await?;
            let Some(body) = outcome.body else {
                break;
            };
            let records = page_records(&body);
            if records.is_empty() {
                break;
            }
            batch.extend(records.iter().cloned());

            if !has_next_page(&body) {
                break;
            }
            page_number += 1;
        }

        Ok(batch)
    }
}
