use serde::Deserialize;
use std::time::Duration;

/// Default API root for regulations.gov v4
pub const DEFAULT_BASE_URL: &str = "https://api.regulations.gov/v4";

/// Main configuration structure for the archiver
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub pagination: PaginationConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
}

/// API access configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiConfig {
    /// Static API key appended to every API request
    #[serde(rename = "api-key", default)]
    pub api_key: Option<String>,

    /// Root of the REST API (no trailing slash required)
    #[serde(rename = "base-url", default = "default_base_url")]
    pub base_url: String,
}

/// Request quota and rate-limit wait configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FetcherConfig {
    /// Maximum API requests per quota window
    #[serde(rename = "requests-per-window", default = "default_requests_per_window")]
    pub requests_per_window: u64,

    /// Length of the quota window (milliseconds)
    #[serde(rename = "quota-window-ms", default = "default_quota_window_ms")]
    pub quota_window_ms: u64,

    /// Forced cool-down after the server answers 429 (milliseconds)
    #[serde(rename = "rate-limit-cooldown-ms", default = "default_cooldown_ms")]
    pub rate_limit_cooldown_ms: u64,

    /// Sleep granularity while waiting out a rate limit (milliseconds)
    #[serde(rename = "wait-tick-ms", default = "default_wait_tick_ms")]
    pub wait_tick_ms: u64,

    /// Per-request timeout (milliseconds)
    #[serde(rename = "request-timeout-ms", default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

/// Page-window configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PaginationConfig {
    /// Items requested per page
    #[serde(rename = "page-size", default = "default_page_size")]
    pub page_size: u32,

    /// Pages the server will serve before the offset window is exhausted
    #[serde(rename = "max-pages-per-batch", default = "default_max_pages")]
    pub max_pages_per_batch: u32,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserAgentConfig {
    #[serde(default = "default_agent_name")]
    pub name: String,

    #[serde(default = "default_agent_version")]
    pub version: String,

    /// Optional contact address advertised to the API operator
    #[serde(rename = "contact-email", default)]
    pub contact_email: Option<String>,
}

impl FetcherConfig {
    pub fn quota_window(&self) -> Duration {
        Duration::from_millis(self.quota_window_ms)
    }

    pub fn rate_limit_cooldown(&self) -> Duration {
        Duration::from_millis(self.rate_limit_cooldown_ms)
    }

    pub fn wait_tick(&self) -> Duration {
        Duration::from_millis(self.wait_tick_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl PaginationConfig {
    /// Largest number of records one offset-paginated drain can return
    pub fn max_items_per_batch(&self) -> usize {
        self.page_size as usize * self.max_pages_per_batch as usize
    }
}

impl UserAgentConfig {
    /// Formats the User-Agent header: `Name/Version (+email)`
    pub fn header_value(&self) -> String {
        match &self.contact_email {
            Some(email) => format!("{}/{} (+{})", self.name, self.version, email),
            None => format!("{}/{}", self.name, self.version),
        }
    }
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            requests_per_window: default_requests_per_window(),
            quota_window_ms: default_quota_window_ms(),
            rate_limit_cooldown_ms: default_cooldown_ms(),
            wait_tick_ms: default_wait_tick_ms(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_pages_per_batch: default_max_pages(),
        }
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            version: default_agent_version(),
            contact_email: None,
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_requests_per_window() -> u64 {
    1000
}

// One hour plus ten seconds of slack.
fn default_quota_window_ms() -> u64 {
    3_610_000
}

fn default_cooldown_ms() -> u64 {
    5 * 60 * 1000
}

fn default_wait_tick_ms() -> u64 {
    60 * 1000
}

fn default_request_timeout_ms() -> u64 {
    30 * 1000
}

fn default_page_size() -> u32 {
    250
}

fn default_max_pages() -> u32 {
    20
}

fn default_agent_name() -> String {
    "docket-archiver".to_string()
}

fn default_agent_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
