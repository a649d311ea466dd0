//! Rate limiting configuration.

use std::collections::{HashMap, HashSet};

use tracing::warn;

use crate::ratelimit::{endpoint_key, RateLimitPolicy, DEFAULT_KEY_PREFIX};
use crate::roles::SystemRole;

/// Configuration for the rate limiting system.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Whether rate limiting is enabled
    pub enabled: bool,
    /// Prefix for counter keys (e.g., "ratelimit")
    pub key_prefix: String,
    /// Whether to allow requests when the counter store is unavailable.
    /// Off unless the integrator opts in explicitly.
    pub fail_open: bool,
    /// Whether X-Forwarded-For / X-Real-IP take precedence over the connection address
    pub trust_proxy: bool,
    /// IP addresses that bypass rate limiting
    pub allowlist: HashSet<String>,
    /// System roles that bypass rate limiting
    pub bypass_roles: HashSet<SystemRole>,
    /// Policy for endpoints without a specific entry
    pub default_policy: RateLimitPolicy,
    /// Per-endpoint policies keyed by `METHOD:lowercased-path`
    pub endpoint_policies: HashMap<String, RateLimitPolicy>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            fail_open: false,
            trust_proxy: false,
            allowlist: HashSet::new(),
            bypass_roles: HashSet::from([SystemRole::SuperAdmin, SystemRole::Admin]),
            default_policy: RateLimitPolicy::default(),
            endpoint_policies: HashMap::new(),
        }
    }
}

impl RateLimitConfig {
    /// Creates configuration from environment variables.
    ///
    /// Boolean flags accept `true`/`false`, `1`/`0`, `yes`/`no` and `on`/`off`;
    /// anything else keeps the default and logs a warning.
    ///
    /// Environment variables:
    /// - `RATE_LIMIT_ENABLED`: Enable/disable rate limiting (default: true)
    /// - `RATE_LIMIT_PREFIX`: Counter key prefix (default: "ratelimit")
    /// - `RATE_LIMIT_FAIL_OPEN`: Allow requests when the store is unavailable (default: false)
    /// - `RATE_LIMIT_TRUST_PROXY`: Prefer forwarding headers over the peer address (default: false)
    /// - `RATE_LIMIT_ALLOWLIST`: Comma-separated IP allowlist
    /// - `RATE_LIMIT_BYPASS_ROLES`: Comma-separated system roles (default: "SuperAdmin,Admin")
    /// - `RATE_LIMIT_DEFAULT`: Default policy as "per_minute,per_hour" (default: "60,1000")
    /// - `RATE_LIMIT_ENDPOINTS`: Per-endpoint policies as
    ///   "METHOD:/path=per_minute,per_hour;METHOD:/path=per_minute,per_hour"
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("RATE_LIMIT_ENABLED") {
            config.enabled = parse_flag("RATE_LIMIT_ENABLED", &val, config.enabled);
        }
        if let Ok(val) = std::env::var("RATE_LIMIT_PREFIX") {
            config.key_prefix = val;
        }
        if let Ok(val) = std::env::var("RATE_LIMIT_FAIL_OPEN") {
            config.fail_open = parse_flag("RATE_LIMIT_FAIL_OPEN", &val, config.fail_open);
        }
        if let Ok(val) = std::env::var("RATE_LIMIT_TRUST_PROXY") {
            config.trust_proxy = parse_flag("RATE_LIMIT_TRUST_PROXY", &val, config.trust_proxy);
        }
        if let Ok(val) = std::env::var("RATE_LIMIT_ALLOWLIST") {
            config.allowlist = parse_list(&val).map(str::to_string).collect();
        }
        if let Ok(val) = std::env::var("RATE_LIMIT_BYPASS_ROLES") {
            config.bypass_roles = parse_bypass_roles(&val);
        }
        if let Ok(val) = std::env::var("RATE_LIMIT_DEFAULT") {
            match parse_policy(&val) {
                Some(policy) => config.default_policy = policy,
                None => warn!(value = %val, "Ignoring malformed RATE_LIMIT_DEFAULT"),
            }
        }
        if let Ok(val) = std::env::var("RATE_LIMIT_ENDPOINTS") {
            config.endpoint_policies = parse_endpoint_policies(&val);
        }

        config
    }

    /// Returns the policy for an endpoint key, falling back to the default policy.
    pub fn policy_for(&self, endpoint: &str) -> &RateLimitPolicy {
        self.endpoint_policies
            .get(endpoint)
            .unwrap_or(&self.default_policy)
    }

    /// Registers a policy for `method` + `path`.
    #[must_use]
    pub fn with_endpoint_policy(mut self, method: &str, path: &str, policy: RateLimitPolicy) -> Self {
        self.endpoint_policies
            .insert(endpoint_key(method, path), policy);
        self
    }
}

/// Parses a boolean flag, keeping `default` for unrecognized values.
fn parse_flag(name: &str, val: &str, default: bool) -> bool {
    match val.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => true,
        "false" | "0" | "no" | "off" => false,
        _ => {
            warn!(variable = name, value = %val, default, "Ignoring malformed boolean flag");
            default
        }
    }
}

fn parse_list(val: &str) -> impl Iterator<Item = &str> {
    val.split(',').map(str::trim).filter(|s| !s.is_empty())
}

/// Parses a policy from "per_minute,per_hour" format.
fn parse_policy(val: &str) -> Option<RateLimitPolicy> {
    let parts: Vec<&str> = val.split(',').collect();
    if parts.len() == 2 {
        let per_minute = parts[0].trim().parse().ok()?;
        let per_hour = parts[1].trim().parse().ok()?;
        Some(RateLimitPolicy::new(per_minute, per_hour))
    } else {
        None
    }
}

/// Parses "METHOD:/path=per_minute,per_hour" entries separated by `;`.
fn parse_endpoint_policies(val: &str) -> HashMap<String, RateLimitPolicy> {
    let mut policies = HashMap::new();

    for entry in val.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        let parsed = entry.split_once('=').and_then(|(endpoint, policy)| {
            let (method, path) = endpoint.trim().split_once(':')?;
            if method.is_empty() || !path.starts_with('/') {
                return None;
            }
            Some((endpoint_key(method, path), parse_policy(policy)?))
        });

        match parsed {
            Some((key, policy)) => {
                policies.insert(key, policy);
            }
            None => warn!(entry = %entry, "Ignoring malformed RATE_LIMIT_ENDPOINTS entry"),
        }
    }

    policies
}

fn parse_bypass_roles(val: &str) -> HashSet<SystemRole> {
    parse_list(val)
        .filter_map(|role| match role.parse::<SystemRole>() {
            Ok(role) => Some(role),
            Err(e) => {
                warn!(error = %e, "Ignoring unknown role in RATE_LIMIT_BYPASS_ROLES");
                None
            }
        })
        .collect()
}
