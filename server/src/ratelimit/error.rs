//! Rate limiting error types for HTTP responses.

use axum::http::header::HeaderValue;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::ratelimit::{
    RateLimitResult, StoreError, HEADER_LIMIT, HEADER_REMAINING, HEADER_RETRY_AFTER,
};

/// Errors that can occur during rate limit checks.
#[derive(Debug, Error)]
pub enum RateLimitError {
    /// The counter store could not be reached. Never treated as "allowed" here;
    /// the HTTP layer applies the configured `fail_open` policy.
    #[error("Rate limit counter store unavailable")]
    CounterStoreUnavailable(#[source] StoreError),

    /// Request exceeded the rate limit.
    #[error("{}", .0.message)]
    LimitExceeded(RateLimitResult),
}

/// JSON response body for rate limit errors.
#[derive(Serialize)]
pub struct RateLimitErrorResponse {
    /// Error code identifier.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
    /// Seconds to wait before retrying.
    pub retry_after: u64,
    /// Maximum requests allowed in the window.
    pub limit: u32,
    /// Remaining requests (always 0 when rate limited).
    pub remaining: u32,
}

impl IntoResponse for RateLimitError {
    fn into_response(self) -> Response {
        match self {
            Self::CounterStoreUnavailable(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({
                    "error": "service_unavailable",
                    "message": "Rate limiting is temporarily unavailable",
                })),
            )
                .into_response(),
            Self::LimitExceeded(result) => {
                let body = RateLimitErrorResponse {
                    error: "rate_limited",
                    message: result.message.clone(),
                    retry_after: result.retry_after,
                    limit: result.limit,
                    remaining: 0,
                };
                let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
                let headers = response.headers_mut();
                headers.insert(HEADER_RETRY_AFTER, HeaderValue::from(result.retry_after));
                headers.insert(HEADER_LIMIT, HeaderValue::from(result.limit));
                headers.insert(HEADER_REMAINING, HeaderValue::from(0u32));
                response
            }
        }
    }
}
