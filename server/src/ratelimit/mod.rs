//! Rate limiting module for protecting against abuse.
//!
//! Counts requests per identifier (user or client IP) and endpoint in fixed
//! minute and hour windows, backed by a pluggable counter store (Redis or
//! in-memory). Callers holding a bypass role skip counting entirely.

pub mod config;
pub mod constants;
pub mod error;
pub mod ip;
pub mod limiter;
pub mod middleware;
pub mod store;
pub mod types;

pub use config::*;
pub use constants::*;
pub use error::*;
pub use ip::*;
pub use limiter::*;
pub use middleware::{apply_rate_limit_headers, rate_limit};
pub use store::*;
pub use types::*;
