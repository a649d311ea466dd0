//! Axum middleware for rate limiting.
//!
//! Identifies the caller (authenticated user first, client IP otherwise),
//! derives the endpoint key from method and path, and enforces the matching
//! policy. Must run after `optional_auth` so `AuthUser` is already present.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header::HeaderValue, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use crate::api::AppState;
use crate::auth::AuthUser;
use crate::ratelimit::{
    endpoint_key, extract_client_ip, ip_identifier, normalize_ip, user_identifier, NormalizedIp,
    RateLimitError, RateLimitResult, HEADER_LIMIT, HEADER_REMAINING,
};
use crate::roles::SystemRole;

/// Middleware to rate limit requests per caller and endpoint.
///
/// # Usage
///
/// ```ignore
/// Router::new()
///     .route("/api/boards", get(list_boards))
///     .layer(from_fn_with_state(state.clone(), rate_limit))
///     .layer(from_fn_with_state(state.clone(), optional_auth))
/// ```
///
/// # Behavior
///
/// - If rate limiter is not configured (`state.rate_limiter` is `None`), requests pass through.
/// - Callers holding a bypass role are never counted.
/// - If the counter store is unavailable, the request passes only when `fail_open` is set;
///   otherwise `503 Service Unavailable`.
/// - If the rate limit is exceeded, returns `429 Too Many Requests` with retry information.
/// - Allowed responses carry `X-RateLimit-Limit` and `X-RateLimit-Remaining`.
/// - Stores `NormalizedIp` in request extensions for anonymous callers.
#[tracing::instrument(skip(state, request, next))]
pub async fn rate_limit(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, RateLimitError> {
    // Skip rate limiting if not configured
    let Some(ref rate_limiter) = state.rate_limiter else {
        return Ok(next.run(request).await);
    };

    let endpoint = endpoint_key(request.method().as_str(), request.uri().path());
    let auth_user = request.extensions().get::<AuthUser>().cloned();

    let identifier = if let Some(ref user) = auth_user {
        user_identifier(user.id)
    } else {
        let connect_info = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .cloned();
        let trust_proxy = rate_limiter.config().trust_proxy;
        let normalized_ip = extract_client_ip(request.headers(), connect_info.as_ref(), trust_proxy)
            .map(normalize_ip);

        if let Some(ref ip) = normalized_ip {
            request.extensions_mut().insert(NormalizedIp(ip.clone()));
        }

        ip_identifier(normalized_ip.as_deref())
    };

    let roles: &[SystemRole] = auth_user
        .as_ref()
        .map_or(&[], |user| std::slice::from_ref(&user.role));

    debug!(
        endpoint = %endpoint,
        identifier = %identifier,
        "Checking rate limit"
    );

    let result = match rate_limiter
        .check_request(&identifier, roles, &endpoint)
        .await
    {
        Ok(result) => result,
        Err(RateLimitError::CounterStoreUnavailable(e)) if rate_limiter.config().fail_open => {
            warn!(
                endpoint = %endpoint,
                identifier = %identifier,
                error = %e,
                "Counter store unavailable, allowing request (fail_open=true)"
            );
            return Ok(next.run(request).await);
        }
        Err(e) => return Err(e),
    };

    if !result.allowed {
        return Err(RateLimitError::LimitExceeded(result));
    }

    let mut response = next.run(request).await;
    apply_rate_limit_headers(response.headers_mut(), &result);
    Ok(response)
}

/// Adds quota headers to a successful response. Unlimited results add none.
pub fn apply_rate_limit_headers(headers: &mut HeaderMap, result: &RateLimitResult) {
    if result.is_unlimited() {
        return;
    }
    headers.insert(HEADER_LIMIT, HeaderValue::from(result.limit));
    headers.insert(HEADER_REMAINING, HeaderValue::from(result.remaining));
}
