//! Server Configuration
//!
//! Loads configuration from environment variables. Rate limiting has its own
//! section, see [`crate::ratelimit::RateLimitConfig::from_env`].

use anyhow::{Context, Result};
use std::env;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (e.g., "0.0.0.0:8080")
    pub bind_address: String,

    /// Redis connection URL. Counters stay in process memory when unset.
    pub redis_url: Option<String>,

    /// JWT signing secret
    pub jwt_secret: String,

    /// JWT access token expiry in seconds (default: 900 = 15 min)
    pub jwt_access_expiry: i64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            redis_url: env::var("REDIS_URL").ok().filter(|url| !url.trim().is_empty()),
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            jwt_access_expiry: env::var("JWT_ACCESS_EXPIRY")
                .ok()
                .map(|v| v.parse::<i64>())
                .transpose()
                .context("JWT_ACCESS_EXPIRY must be a number of seconds")?
                .unwrap_or(900),
        })
    }

    /// Create a default configuration for testing.
    ///
    /// Redis-backed tests expect a local instance:
    /// `docker run -d --name kb-test-redis -p 6379:6379 redis:7`
    #[must_use]
    pub fn default_for_test() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".into(),
            redis_url: None,
            jwt_secret: "test-secret".into(),
            jwt_access_expiry: 900,
        }
    }
}
