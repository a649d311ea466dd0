//! Rate limiting constants.

/// Default prefix for counter keys
pub const DEFAULT_KEY_PREFIX: &str = "ratelimit";

/// Counter key pre-allocation size
pub const REDIS_KEY_CAPACITY: usize = 64;

/// IPv6 prefix segments for rate limiting (uses /64)
pub const IPV6_PREFIX_SEGMENTS: usize = 4;

/// Client IP used when no address can be determined
pub const UNKNOWN_IP: &str = "unknown";

/// Identifier prefixes
pub const USER_IDENTIFIER_PREFIX: &str = "user:";
pub const IP_IDENTIFIER_PREFIX: &str = "ip:";

/// Remaining quota reported for unlimited (bypassed) requests
pub const UNLIMITED_REMAINING: u32 = u32::MAX;

/// Interval between purges of expired in-memory counters
pub const COUNTER_PURGE_INTERVAL_SECS: u64 = 60;

/// Redis TTL sentinel values
pub const TTL_NO_EXPIRY: i64 = -1;
pub const TTL_KEY_NOT_FOUND: i64 = -2;

/// Response headers
pub const HEADER_LIMIT: &str = "X-RateLimit-Limit";
pub const HEADER_REMAINING: &str = "X-RateLimit-Remaining";
pub const HEADER_RETRY_AFTER: &str = "Retry-After";
