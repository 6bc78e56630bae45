//! Rate-governed HTTP fetcher
//!
//! This module handles all HTTP requests for the archiver, including:
//! - Building the HTTP client with a proper user agent string
//! - Self-throttling against the per-window request quota
//! - Classifying responses (success, rate limited, bad request, other)
//! - Waiting out rate limits before retrying the same request
//! - Downloading attachment files

use crate::api::describe_params;
use crate::config::{Config, FetcherConfig, UserAgentConfig};
use crate::state::{describe_wait, QuotaCheck, QuotaWindow};
use crate::{ArchiveError, Result};
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Query parameter carrying the API key
const API_KEY_PARAM: &str = "api_key";

/// Result of a single fetch attempt
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome {
    /// HTTP status code (429 for locally refused requests)
    pub status_code: u16,

    /// Parsed JSON body, `None` when the response had no body
    pub body: Option<Value>,

    /// The caller must wait before trying again
    pub rate_limited: bool,

    /// When the wait ends, for rate-limited outcomes
    pub retry_after: Option<DateTime<Utc>>,
}

impl FetchOutcome {
    fn rate_limited(retry_after: DateTime<Utc>) -> Self {
        Self {
            status_code: StatusCode::TOO_MANY_REQUESTS.as_u16(),
            body: None,
            rate_limited: true,
            retry_after: Some(retry_after),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Returns the body if it carries a `data` member
    pub fn into_payload(self, url: &str) -> Result<Value> {
        match self.body {
            Some(body) if body.get("data").is_some_and(|data| !data.is_null()) => Ok(body),
            _ => Err(ArchiveError::MissingPayload {
                url: url.to_string(),
                status: self.status_code,
            }),
        }
    }
}

/// Shared flag a host can set to stop the run
///
/// Checked before every API request, between archive units and on every
/// rate-limit wait tick.
///
/// Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    cancelled: Arc<AtomicBool>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `agent` - The user agent configuration
/// * `timeout` - Per-request timeout
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(agent: &UserAgentConfig, timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(agent.header_value())
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Issues API requests one at a time, within the request quota
///
/// # Response handling
///
/// | Condition | Action |
/// |-----------|--------|
/// | Quota spent, window open | No request; rate-limited outcome until window end |
/// | HTTP 429 | Counter pinned above quota; rate-limited outcome for the cool-down |
/// | HTTP 400 | `ArchiveError::BadRequest` with the response body |
/// | Empty body | Outcome with `body = None` |
/// | Anything else | Outcome with the parsed JSON body |
pub struct Fetcher {
    client: Client,
    api_key: Option<String>,
    quota: QuotaWindow,
    cooldown: Duration,
    wait_tick: Duration,
    cancellation: Cancellation,
    requests_sent: u64,
}

impl Fetcher {
    pub fn new(client: Client, api_key: Option<String>, config: &FetcherConfig) -> Self {
        Self {
            client,
            api_key,
            quota: QuotaWindow::new(config.requests_per_window, config.quota_window()),
            cooldown: config.rate_limit_cooldown(),
            wait_tick: config.wait_tick(),
            cancellation: Cancellation::new(),
            requests_sent: 0,
        }
    }

    /// Builds the client and fetcher described by the configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = build_http_client(&config.user_agent, config.fetcher.request_timeout())?;
        Ok(Self::new(client, config.api.api_key.clone(), &config.fetcher))
    }

    /// Replaces the cancellation handle observed while waiting
    pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Returns a handle that aborts any current or future wait
    pub fn cancellation(&self) -> Cancellation {
        self.cancellation.clone()
    }

    pub fn quota(&self) -> &QuotaWindow {
        &self.quota
    }

    /// Number of API requests actually put on the wire
    pub fn requests_sent(&self) -> u64 {
        self.requests_sent
    }

    /// Performs one GET against the API, honoring the quota
    ///
    /// Rate limiting (local or server-side) is reported in the outcome;
    /// only transport failures, 400 responses and unparseable success
    /// bodies are errors.
    pub async fn fetch(&mut self, url: &str, params: &[(String, String)]) -> Result<FetchOutcome> {
        if let QuotaCheck::Exhausted { reset_at } = self.quota.check(Utc::now()) {
            tracing::debug!("Quota spent, deferring {} until {}", url, reset_at);
            return Ok(FetchOutcome::rate_limited(reset_at));
        }

        let mut query: Vec<(&str, &str)> = params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        if let Some(key) = &self.api_key {
            query.push((API_KEY_PARAM, key.as_str()));
        }

        self.quota.record_request();
        tracing::debug!(
            "GET {}{} ({} requests left in window)",
            url,
            describe_params(params),
            self.quota.requests_remaining()
        );
        self.requests_sent += 1;

        let response = self
            .client
            .get(url)
            .query(&query)
            .send()
            .await
            .map_err(|source| ArchiveError::Http {
                url: url.to_string(),
                source,
            })?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let reset_at = self.quota.mark_exhausted(Utc::now(), self.cooldown);
            tracing::warn!(
                "Server rate limit hit on {}, cooling down until {}",
                url,
                reset_at
            );
            return Ok(FetchOutcome::rate_limited(reset_at));
        }

        let text = response.text().await.map_err(|source| ArchiveError::Http {
            url: url.to_string(),
            source,
        })?;

        if status == StatusCode::BAD_REQUEST {
            tracing::error!("Bad request for {}: {}", url, text);
            return Err(ArchiveError::BadRequest {
                url: url.to_string(),
                body: text,
            });
        }

        let body = if text.trim().is_empty() {
            None
        } else {
            match serde_json::from_str(&text) {
                Ok(value) => Some(value),
                Err(source) if status.is_success() => {
                    return Err(ArchiveError::InvalidPayload {
                        url: url.to_string(),
                        source,
                    });
                }
                Err(_) => None,
            }
        };

        if !status.is_success() {
            tracing::warn!("HTTP {} from {}", status.as_u16(), url);
        }

        Ok(FetchOutcome {
            status_code: status.as_u16(),
            body,
            rate_limited: false,
            retry_after: None,
        })
    }

    /// Fetches `url`, sleeping through rate limits until it goes through
    ///
    /// There is no retry cap: the quota bookkeeping guarantees the wait
    /// ends. A cancelled handle stops the call before any further request
    /// and cuts a running wait short.
    pub async fn get_or_wait(
        &mut self,
        url: &str,
        params: &[(String, String)],
    ) -> Result<FetchOutcome> {
        tracing::info!("getting: {}{}", url, describe_params(params));
        loop {
            self.ensure_active()?;
            let outcome = self.fetch(url, params).await?;
            if !outcome.rate_limited {
                return Ok(outcome);
            }
            let until = outcome.retry_after.unwrap_or_else(Utc::now);
            self.wait_until(until).await?;
        }
    }

    /// Fails with `ArchiveError::Cancelled` once the handle is cancelled
    pub fn ensure_active(&self) -> Result<()> {
        if self.cancellation.is_cancelled() {
            return Err(ArchiveError::Cancelled);
        }
        Ok(())
    }

    async fn wait_until(&self, until: DateTime<Utc>) -> Result<()> {
        loop {
            self.ensure_active()?;
            let now = Utc::now();
            if now >= until {
                return Ok(());
            }
            tracing::info!(
                "rate limit reached - waiting for {}",
                describe_wait(until, now)
            );
            let remaining = (until - now).to_std().unwrap_or_default();
            tokio::time::sleep(remaining.min(self.wait_tick)).await;
        }
    }

    /// Downloads an attachment file
    ///
    /// File hosts are not the API: no key is attached and the quota is not
    /// charged. Non-2xx responses yield `None` so the variant is skipped.
    pub async fn download(&self, url: &str) -> Result<Option<Vec<u8>>> {
        tracing::debug!("downloading: {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| ArchiveError::Http {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("Skipping {}: HTTP {}", url, status.as_u16());
            return Ok(None);
        }

        let bytes = response.bytes().await.map_err(|source| ArchiveError::Http {
            url: url.to_string(),
            source,
        })?;
        Ok(Some(bytes.to_vec()))
    }
}
