//! API model: resource URLs, query parameters and record accessors
//!
//! This module knows the shape of the docket API: which endpoints exist,
//! which query parameters drive paging and filtering, and where in a record
//! the crawl finds ids, cursors and attachment links.

mod endpoints;
mod records;

pub use endpoints::{
    comment_detail_params, comment_listing_params, describe_params, document_listing_params,
    set_param, ApiEndpoints, QueryParams, COMMENT_SORT, LAST_MODIFIED_GE, PAGE_NUMBER, PAGE_SIZE,
};
pub use records::{
    attachment_files, attribute_str, comment_artifact_name, cursor_timestamp, has_next_page,
    page_records, record_id, AttachmentFile, DocumentRef,
};
