use chrono::{DateTime, Utc};
use std::time::Duration;

/// Multiplier used to pin the counter far above quota after a server 429
const EXHAUSTED_MULTIPLIER: u64 = 1000;

/// Result of consulting the quota before a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaCheck {
    /// The request may be sent now
    Allowed,

    /// The quota is spent; nothing may be sent before `reset_at`
    Exhausted { reset_at: DateTime<Utc> },
}

/// Tracks API requests made in the current quota window
///
/// The window opens lazily on the first check and is renewed once the
/// current time passes `reset_at` with the quota spent. A server-side 429
/// pins the counter above quota and shortens `reset_at` to a cool-down.
#[derive(Debug, Clone)]
pub struct QuotaWindow {
    /// Requests counted in the current window
    pub requests_made: u64,

    /// When the current window (or cool-down) ends
    pub reset_at: Option<DateTime<Utc>>,

    /// Requests allowed per window
    pub quota: u64,

    window: chrono::Duration,
}

impl QuotaWindow {
    pub fn new(quota: u64, window: Duration) -> Self {
        Self {
            requests_made: 0,
            reset_at: None,
            quota,
            window: to_chrono(window),
        }
    }

    /// Checks whether a request may be sent at `now`
    ///
    /// Opens the first window if none is running, and starts a fresh one
    /// when the quota is spent but `reset_at` has passed.
    pub fn check(&mut self, now: DateTime<Utc>) -> QuotaCheck {
        let reset_at = *self.reset_at.get_or_insert(now + self.window);

        if self.requests_made >= self.quota {
            if now < reset_at {
                return QuotaCheck::Exhausted { reset_at };
            }
            self.requests_made = 0;
            self.reset_at = Some(now + self.window);
        }

        QuotaCheck::Allowed
    }

    /// Records that a request is being put on the wire
    pub fn record_request(&mut self) {
        self.requests_made += 1;
    }

    /// Marks the window as spent after a server-side rate limit
    ///
    /// Returns the end of the forced cool-down.
    pub fn mark_exhausted(&mut self, now: DateTime<Utc>, cooldown: Duration) -> DateTime<Utc> {
        let reset_at = now + to_chrono(cooldown);
        self.requests_made = self.quota.saturating_mul(EXHAUSTED_MULTIPLIER);
        self.reset_at = Some(reset_at);
        reset_at
    }

    /// Returns the number of requests remaining in the current window
    pub fn requests_remaining(&self) -> u64 {
        self.quota.saturating_sub(self.requests_made)
    }
}

fn to_chrono(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::days(365))
}

/// Formats the time left until `until` for wait logging
pub fn describe_wait(until: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let delta = until - now;
    if delta < chrono::Duration::zero() {
        return "(passed)".to_string();
    }
    let total = delta.num_seconds();
    format!("{} minute(s) and {} second(s)", total / 60, total % 60)
}
