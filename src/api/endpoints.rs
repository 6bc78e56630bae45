use url::Url;

/// Query parameter carrying the 1-based page index
pub const PAGE_NUMBER: &str = "page[number]";

/// Query parameter carrying the page size
pub const PAGE_SIZE: &str = "page[size]";

/// Inclusive lower bound on a comment's modification time (cursor mode)
pub const LAST_MODIFIED_GE: &str = "filter[lastModifiedDate][ge]";

/// Sort order that makes the comment cursor stable
pub const COMMENT_SORT: &str = "lastModifiedDate,documentId";

/// Ordered query parameters for one request
pub type QueryParams = Vec<(String, String)>;

/// Resolves resource URLs against the configured API root
#[derive(Debug, Clone)]
pub struct ApiEndpoints {
    base: Url,
}

impl ApiEndpoints {
    pub fn new(base_url: &str) -> Result<Self, url::ParseError> {
        Ok(Self {
            base: Url::parse(base_url)?,
        })
    }

    /// `GET /dockets/{id}`
    pub fn docket(&self, docket_id: &str) -> String {
        self.resource(&["dockets", docket_id])
    }

    /// `GET /documents`
    pub fn documents(&self) -> String {
        self.resource(&["documents"])
    }

    /// `GET /comments`
    pub fn comments(&self) -> String {
        self.resource(&["comments"])
    }

    /// `GET /comments/{id}`
    pub fn comment(&self, comment_id: &str) -> String {
        self.resource(&["comments", comment_id])
    }

    fn resource(&self, segments: &[&str]) -> String {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url.into()
    }
}

/// Query for one docket's documents
pub fn document_listing_params(docket_id: &str, page_size: u32) -> QueryParams {
    vec![
        ("filter[docketId]".to_string(), docket_id.to_string()),
        (PAGE_SIZE.to_string(), page_size.to_string()),
    ]
}

/// Query for the comments on one document, sorted for cursor pagination
pub fn comment_listing_params(object_id: &str, page_size: u32) -> QueryParams {
    vec![
        ("filter[commentOnId]".to_string(), object_id.to_string()),
        (PAGE_SIZE.to_string(), page_size.to_string()),
        ("sort".to_string(), COMMENT_SORT.to_string()),
    ]
}

/// Query for a comment's details with its attachment metadata
pub fn comment_detail_params() -> QueryParams {
    vec![("include".to_string(), "attachments".to_string())]
}

/// Replaces the value of `key`, or appends it if absent
pub fn set_param(params: &mut QueryParams, key: &str, value: impl Into<String>) {
    let value = value.into();
    match params.iter_mut().find(|(k, _)| k == key) {
        Some(entry) => entry.1 = value,
        None => params.push((key.to_string(), value)),
    }
}

/// Renders params as `?k=v&k=v` for log lines
pub fn describe_params(params: &[(String, String)]) -> String {
    if params.is_empty() {
        return String::new();
    }
    let joined: Vec<String> = params.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
    format!("?{}", joined.join("&"))
}
