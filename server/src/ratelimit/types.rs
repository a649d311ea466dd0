//! Rate limiting types.

use serde::{Deserialize, Serialize};

use crate::ratelimit::UNLIMITED_REMAINING;

/// Request quota for one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitPolicy {
    /// Maximum requests per fixed one-minute window
    pub requests_per_minute: u32,
    /// Maximum requests per fixed one-hour window
    pub requests_per_hour: u32,
}

impl RateLimitPolicy {
    #[must_use]
    pub const fn new(requests_per_minute: u32, requests_per_hour: u32) -> Self {
        Self {
            requests_per_minute,
            requests_per_hour,
        }
    }

    /// Returns the configured limit for a window.
    #[must_use]
    pub const fn limit_for(&self, window: RateLimitWindow) -> u32 {
        match window {
            RateLimitWindow::Minute => self.requests_per_minute,
            RateLimitWindow::Hour => self.requests_per_hour,
        }
    }
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self::new(60, 1000)
    }
}

/// Fixed counting windows, evaluated in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateLimitWindow {
    Minute,
    Hour,
}

impl RateLimitWindow {
    /// Returns the string identifier for this window (used in counter keys).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Minute => "minute",
            Self::Hour => "hour",
        }
    }

    /// Window length in seconds.
    #[must_use]
    pub const fn duration_secs(&self) -> u64 {
        match self {
            Self::Minute => 60,
            Self::Hour => 3600,
        }
    }

    /// All windows in evaluation order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Minute, Self::Hour]
    }
}

/// Result of a rate limit check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateLimitResult {
    /// Whether the request is allowed
    pub allowed: bool,
    /// Limit of the window that governs this result
    pub limit: u32,
    /// Remaining requests in the tighter of the two windows
    pub remaining: u32,
    /// Seconds to wait before retrying (0 if allowed)
    pub retry_after: u64,
    /// Human-readable outcome
    pub message: String,
}

impl RateLimitResult {
    /// Result for requests that are not counted at all (disabled, allowlisted, bypass role).
    #[must_use]
    pub fn unlimited() -> Self {
        Self {
            allowed: true,
            limit: 0,
            remaining: UNLIMITED_REMAINING,
            retry_after: 0,
            message: "Rate limit bypassed".to_string(),
        }
    }

    #[must_use]
    pub const fn is_unlimited(&self) -> bool {
        self.allowed && self.remaining == UNLIMITED_REMAINING
    }
}

/// Normalized IP address stored in request extensions.
///
/// IPv4 addresses are stored as-is.
/// IPv6 addresses are normalized to /64 prefix for rate limiting.
#[derive(Debug, Clone)]
pub struct NormalizedIp(pub String);

/// Builds the endpoint key for a request: `METHOD:lowercased-path`.
///
/// ```
/// use kb_server::ratelimit::endpoint_key;
///
/// assert_eq!(endpoint_key("post", "/api/Boards/42"), "POST:/api/boards/42");
/// ```
#[must_use]
pub fn endpoint_key(method: &str, path: &str) -> String {
    format!(
        "{}:{}",
        method.to_ascii_uppercase(),
        path.to_ascii_lowercase()
    )
}
