//! Counter store backends for rate limiting.
//!
//! The limiter only needs an atomic increment-and-read plus key expiry:
//! - Redis for shared, multi-instance deployments
//! - In-memory for development, single-instance deployments and tests

use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use fred::prelude::*;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::ratelimit::{TTL_KEY_NOT_FOUND, TTL_NO_EXPIRY};

/// Errors raised by a counter store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Redis command failed or the connection is down.
    #[error("Redis error: {0}")]
    Redis(#[from] fred::error::Error),

    /// Any other backend failure.
    #[error("Counter store unavailable: {0}")]
    Unavailable(String),
}

/// Atomic counters with expiry, keyed by string.
///
/// `ttl` follows Redis semantics: remaining seconds, [`TTL_NO_EXPIRY`] for a
/// key without expiry, [`TTL_KEY_NOT_FOUND`] for a missing key.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Atomically increments the counter and returns the new value.
    async fn increment(&self, key: &str) -> Result<i64, StoreError>;

    /// Sets the counter to expire after `ttl_secs`. Returns `false` if the key does not exist.
    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<bool, StoreError>;

    /// Remaining time to live in seconds.
    async fn ttl(&self, key: &str) -> Result<i64, StoreError>;

    /// Removes the counter.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// Redis-backed counter store.
#[derive(Clone)]
pub struct RedisCounterStore {
    redis: Client,
}

impl RedisCounterStore {
    pub const fn new(redis: Client) -> Self {
        Self { redis }
    }

    /// Connects to Redis and waits until the connection is established.
    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        let config = Config::from_url(redis_url)?;
        let client = Client::new(config, None, None, None);
        client.connect();
        client.wait_for_connect().await?;

        info!("Connected to Redis");
        Ok(Self::new(client))
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn increment(&self, key: &str) -> Result<i64, StoreError> {
        Ok(self.redis.incr::<i64, _>(key).await?)
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<bool, StoreError> {
        Ok(self
            .redis
            .expire::<bool, _>(key, ttl_secs as i64, None)
            .await?)
    }

    async fn ttl(&self, key: &str) -> Result<i64, StoreError> {
        Ok(self.redis.ttl::<i64, _>(key).await?)
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.redis.del::<(), _>(key).await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct Counter {
    count: i64,
    expires_at: Option<Instant>,
}

impl Counter {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Process-local counter store.
///
/// Each key lives in its own `DashMap` entry, so increments on the same key
/// are serialized by the shard lock. Expiry uses `tokio::time::Instant`.
#[derive(Default)]
pub struct InMemoryCounterStore {
    counters: DashMap<String, Counter>,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked counters, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    /// Drops expired counters. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.counters.len();
        self.counters.retain(|_, counter| !counter.is_expired(now));
        before.saturating_sub(self.counters.len())
    }

    /// Spawns a background task that purges expired counters every `every`.
    ///
    /// The task holds a weak reference and stops once the store is dropped.
    pub fn spawn_purge_task(self: &Arc<Self>, every: Duration) -> tokio::task::JoinHandle<()> {
        let store: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            // First tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                let Some(store) = store.upgrade() else {
                    break;
                };
                let removed = store.purge_expired();
                if removed > 0 {
                    debug!(removed, remaining = store.len(), "Purged expired rate limit counters");
                }
            }
        })
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn increment(&self, key: &str) -> Result<i64, StoreError> {
        let now = Instant::now();
        let mut counter = self.counters.entry(key.to_string()).or_insert(Counter {
            count: 0,
            expires_at: None,
        });

        if counter.is_expired(now) {
            counter.count = 0;
            counter.expires_at = None;
        }

        counter.count += 1;
        Ok(counter.count)
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<bool, StoreError> {
        let now = Instant::now();
        match self.counters.get_mut(key) {
            Some(mut counter) if !counter.is_expired(now) => {
                counter.expires_at = Some(now + Duration::from_secs(ttl_secs));
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn ttl(&self, key: &str) -> Result<i64, StoreError> {
        let now = Instant::now();
        let Some(counter) = self.counters.get(key) else {
            return Ok(TTL_KEY_NOT_FOUND);
        };

        Ok(match counter.expires_at {
            None => TTL_NO_EXPIRY,
            Some(at) if at <= now => TTL_KEY_NOT_FOUND,
            Some(at) => {
                let left = at - now;
                // Round up so a live key never reports 0
                let secs = left.as_secs() + u64::from(left.subsec_nanos() > 0);
                secs as i64
            }
        })
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.counters.remove(key);
        Ok(())
    }
}
