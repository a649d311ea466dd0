//! Reusable test helpers for HTTP integration tests.
//!
//! Provides `TestApp` for building and sending requests through the full axum router,
//! plus utilities for JWT generation and response parsing.
//!
//! ## Counter Store
//!
//! Rate-limited apps share one [`InMemoryCounterStore`] per `TestApp`, so state
//! persists across `oneshot` calls made on the same app.
//!
//! ## Test Servers
//!
//! Use [`spawn_test_server()`] when a test needs a real TCP connection
//! (client address detection) instead of `tower::ServiceExt::oneshot`.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{self, header, Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use kb_server::api::{create_router, AppState};
use kb_server::auth::jwt;
use kb_server::config::Config;
use kb_server::ratelimit::{CounterStore, InMemoryCounterStore, RateLimitConfig, RateLimiter};
use kb_server::roles::SystemRole;
use tokio::task::JoinHandle;
use tower::ServiceExt;
use uuid::Uuid;

// ============================================================================
// Test App
// ============================================================================

pub struct TestApp {
    pub router: Router,
    pub config: Arc<Config>,
    pub limiter: Option<RateLimiter>,
}

impl TestApp {
    /// Create a test app with rate limiting disabled.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Create a test app with rate limiting backed by a fresh in-memory store.
    pub fn with_rate_limit(rl_config: RateLimitConfig) -> Self {
        Self::with_store(Arc::new(InMemoryCounterStore::new()), rl_config)
    }

    /// Create a test app with rate limiting over a caller-supplied store.
    pub fn with_store(store: Arc<dyn CounterStore>, rl_config: RateLimitConfig) -> Self {
        Self::build(Some(RateLimiter::new(store, rl_config)))
    }

    fn build(limiter: Option<RateLimiter>) -> Self {
        let config = Config::default_for_test();
        let state = AppState::new(config.clone(), limiter.clone());
        let router = create_router(state);

        Self {
            router,
            config: Arc::new(config),
            limiter,
        }
    }

    /// Build an HTTP request with the given method and URI.
    pub fn request(method: Method, uri: &str) -> http::request::Builder {
        Request::builder().method(method).uri(uri)
    }

    /// Send a request through the router via `tower::ServiceExt::oneshot`.
    pub async fn oneshot(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("oneshot request failed")
    }

    /// Send a request as if it arrived over a connection from `peer`.
    pub async fn oneshot_from(&self, mut request: Request<Body>, peer: &str) -> Response<Body> {
        let addr: SocketAddr = peer.parse().expect("invalid peer address");
        request.extensions_mut().insert(ConnectInfo(addr));
        self.oneshot(request).await
    }

    /// Access token for a fresh user holding `role`.
    pub fn token_for(&self, role: SystemRole) -> (Uuid, String) {
        let user_id = Uuid::new_v4();
        (user_id, generate_access_token(&self.config, user_id, role))
    }
}

/// Build a JSON POST request, optionally authenticated.
pub fn json_post(uri: &str, body: &serde_json::Value, token: Option<&str>) -> Request<Body> {
    let mut builder = TestApp::request(Method::POST, uri).header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("Failed to build request")
}

/// Build a GET request, optionally authenticated.
pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = TestApp::request(Method::GET, uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).expect("Failed to build request")
}

// ============================================================================
// Test Server
// ============================================================================

/// A running test server bound to a random port.
pub struct TestServer {
    /// Server address (127.0.0.1:PORT).
    pub addr: SocketAddr,
    /// Base URL for HTTP requests (e.g., `http://127.0.0.1:12345`).
    pub url: String,
    /// Handle to the server task for cleanup.
    _handle: JoinHandle<()>,
}

/// Spawn a real HTTP server on a random port, with peer addresses available
/// to the middleware through `ConnectInfo`.
pub async fn spawn_test_server(router: Router) -> TestServer {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test server");
    let addr = listener.local_addr().expect("Failed to get local addr");
    let url = format!("http://{addr}");

    let handle = tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .expect("Test server failed");
    });

    TestServer {
        addr,
        url,
        _handle: handle,
    }
}

// ============================================================================
// Auth & response helpers
// ============================================================================

/// Generate an access token for the given user and role.
pub fn generate_access_token(config: &Config, user_id: Uuid, role: SystemRole) -> String {
    jwt::generate_access_token(user_id, role, &config.jwt_secret, config.jwt_access_expiry)
        .expect("Failed to generate access token")
}

/// Collect a response body and parse it as JSON.
pub async fn body_to_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to collect response body")
        .to_bytes();
    serde_json::from_slice(&bytes).unwrap_or_else(|e| {
        let preview = String::from_utf8_lossy(&bytes);
        panic!("Failed to parse response as JSON: {e}\nBody: {preview}")
    })
}
