//! API Router and Application State
//!
//! Central routing configuration and shared state.

pub mod authz;

use axum::{
    extract::State,
    middleware::from_fn_with_state,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::{
    auth,
    config::Config,
    ratelimit::{rate_limit, RateLimiter},
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration
    pub config: Arc<Config>,
    /// Rate limiter (optional, disabled by configuration)
    pub rate_limiter: Option<RateLimiter>,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(config: Config, rate_limiter: Option<RateLimiter>) -> Self {
        Self {
            config: Arc::new(config),
            rate_limiter,
        }
    }
}

/// Create the main application router.
///
/// Layer order matters: `optional_auth` is added last so it runs first and
/// the rate limiter can key on the authenticated user.
pub fn create_router(state: AppState) -> Router {
    let authz_routes = Router::new()
        .route(
            "/system-roles/assign",
            post(authz::assign_system_role),
        )
        .route(
            "/system-roles/{role}/lower",
            get(authz::lower_system_roles),
        )
        .route("/board-members/role", post(authz::change_member_role))
        .route("/board-members/remove", post(authz::remove_member))
        .route("/board-roles/{role}/lower", get(authz::lower_board_roles));

    let api_routes = Router::new()
        .nest("/api/authz", authz_routes)
        .layer(from_fn_with_state(state.clone(), rate_limit))
        .layer(from_fn_with_state(state.clone(), auth::optional_auth));

    Router::new()
        // Health check
        .route("/health", get(health_check))
        .merge(api_routes)
        // Middleware
        .layer(TraceLayer::new_for_http())
        // State
        .with_state(state)
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    /// Service status
    status: &'static str,
    /// Whether rate limiting is enabled
    rate_limiting: bool,
}

/// Health check endpoint.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        rate_limiting: state.rate_limiter.is_some(),
    })
}
