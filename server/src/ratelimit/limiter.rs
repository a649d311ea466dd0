//! Rate limit policy evaluator.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::ratelimit::{
    CounterStore, RateLimitConfig, RateLimitError, RateLimitPolicy, RateLimitResult,
    RateLimitWindow, StoreError, IP_IDENTIFIER_PREFIX, REDIS_KEY_CAPACITY, TTL_KEY_NOT_FOUND,
    TTL_NO_EXPIRY,
};
use crate::roles::SystemRole;

/// Count observed for one window after incrementing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct WindowCount {
    window: RateLimitWindow,
    count: i64,
    ttl_secs: u64,
}

/// Per-identifier, per-endpoint rate limiter over fixed minute and hour windows.
///
/// Counting is delegated to a [`CounterStore`]; the limiter itself is
/// stateless and cheap to clone.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    config: Arc<RateLimitConfig>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CounterStore>, config: RateLimitConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }

    /// Returns the configuration for this rate limiter.
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Checks a request for a caller holding `roles` against the endpoint's policy.
    ///
    /// Callers holding a bypass role are not counted and always allowed.
    #[tracing::instrument(skip(self, roles))]
    pub async fn check_request(
        &self,
        identifier: &str,
        roles: &[SystemRole],
        endpoint: &str,
    ) -> Result<RateLimitResult, RateLimitError> {
        if let Some(role) = roles.iter().find(|r| self.config.bypass_roles.contains(*r)) {
            debug!(role = %role, "Role bypasses rate limit");
            return Ok(RateLimitResult::unlimited());
        }

        let policy = *self.config.policy_for(endpoint);
        self.check(identifier, endpoint, &policy).await
    }

    /// Counts a request and decides whether it may proceed under `policy`.
    ///
    /// Both windows are incremented. The minute window is evaluated first;
    /// the first window over its limit denies the request and supplies
    /// `retry_after`.
    ///
    /// # Errors
    /// Returns `RateLimitError::CounterStoreUnavailable` if the store fails.
    #[tracing::instrument(skip(self, policy))]
    pub async fn check(
        &self,
        identifier: &str,
        endpoint: &str,
        policy: &RateLimitPolicy,
    ) -> Result<RateLimitResult, RateLimitError> {
        if !self.config.enabled {
            return Ok(RateLimitResult::unlimited());
        }

        if self.is_allowed_by_config(identifier) {
            debug!(identifier = %identifier, "Identifier in allowlist, bypassing rate limit");
            return Ok(RateLimitResult::unlimited());
        }

        let mut counts = Vec::with_capacity(RateLimitWindow::all().len());
        for window in RateLimitWindow::all() {
            counts.push(self.hit_window(identifier, endpoint, *window).await?);
        }

        let result = evaluate(policy, &counts);
        if !result.allowed {
            debug!(
                identifier = %identifier,
                endpoint = %endpoint,
                retry_after = result.retry_after,
                "Rate limit exceeded"
            );
        }
        Ok(result)
    }

    /// Clears both window counters for an identifier on an endpoint.
    #[tracing::instrument(skip(self))]
    pub async fn reset(&self, identifier: &str, endpoint: &str) -> Result<(), RateLimitError> {
        for window in RateLimitWindow::all() {
            let key = self.build_key(identifier, endpoint, *window);
            self.store.delete(&key).await.map_err(store_unavailable)?;
        }
        debug!(identifier = %identifier, endpoint = %endpoint, "Rate limit counters cleared");
        Ok(())
    }

    /// Checks if the identifier (or the IP behind it) is in the allowlist.
    pub fn is_allowed_by_config(&self, identifier: &str) -> bool {
        let allowlist = &self.config.allowlist;
        allowlist.contains(identifier)
            || identifier
                .strip_prefix(IP_IDENTIFIER_PREFIX)
                .is_some_and(|ip| allowlist.contains(ip))
    }

    /// Increments one window and makes sure it carries an expiry.
    async fn hit_window(
        &self,
        identifier: &str,
        endpoint: &str,
        window: RateLimitWindow,
    ) -> Result<WindowCount, RateLimitError> {
        let key = self.build_key(identifier, endpoint, window);
        let count = self.store.increment(&key).await.map_err(store_unavailable)?;

        let ttl_secs = if count == 1 {
            self.start_window(&key, window).await?
        } else {
            match self.store.ttl(&key).await.map_err(store_unavailable)? {
                // Expiry lost (e.g. increment raced a key eviction); restart the window
                TTL_NO_EXPIRY | TTL_KEY_NOT_FOUND => self.start_window(&key, window).await?,
                ttl => ttl.max(0) as u64,
            }
        };

        Ok(WindowCount {
            window,
            count,
            ttl_secs,
        })
    }

    async fn start_window(&self, key: &str, window: RateLimitWindow) -> Result<u64, RateLimitError> {
        let ttl = window.duration_secs();
        self.store
            .expire(key, ttl)
            .await
            .map_err(store_unavailable)?;
        Ok(ttl)
    }

    /// Builds a counter key: `{prefix}:{identifier}:{endpoint}:{window}`.
    fn build_key(&self, identifier: &str, endpoint: &str, window: RateLimitWindow) -> String {
        let mut key = String::with_capacity(REDIS_KEY_CAPACITY);
        key.push_str(&self.config.key_prefix);
        key.push(':');
        key.push_str(identifier);
        key.push(':');
        key.push_str(endpoint);
        key.push(':');
        key.push_str(window.as_str());
        key
    }
}

fn store_unavailable(e: StoreError) -> RateLimitError {
    warn!(error = %e, "Rate limit counter store failed");
    RateLimitError::CounterStoreUnavailable(e)
}

fn remaining_for(limit: u32, count: i64) -> u32 {
    let left = i64::from(limit).saturating_sub(count).max(0);
    u32::try_from(left).unwrap_or(u32::MAX)
}

/// Turns post-increment window counts into a decision.
fn evaluate(policy: &RateLimitPolicy, counts: &[WindowCount]) -> RateLimitResult {
    if let Some(exceeded) = counts
        .iter()
        .find(|c| c.count > i64::from(policy.limit_for(c.window)))
    {
        let limit = policy.limit_for(exceeded.window);
        // A window expiring this second still asks the client to wait
        let retry_after = exceeded.ttl_secs.max(1);
        return RateLimitResult {
            allowed: false,
            limit,
            remaining: 0,
            retry_after,
            message: format!(
                "Rate limit exceeded: maximum {limit} requests per {}. Retry in {retry_after} seconds.",
                exceeded.window.as_str()
            ),
        };
    }

    // The window with the least quota left governs the reported limit
    let tightest = counts
        .iter()
        .map(|c| {
            let limit = policy.limit_for(c.window);
            (remaining_for(limit, c.count), limit)
        })
        .min_by_key(|(remaining, _)| *remaining);

    let (remaining, limit) = tightest.unwrap_or((policy.requests_per_minute, policy.requests_per_minute));

    RateLimitResult {
        allowed: true,
        limit,
        remaining,
        retry_after: 0,
        message: "OK".to_string(),
    }
}
