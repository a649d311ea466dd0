//! Board Authorization Server - Main Entry Point

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use kb_server::{
    api, config,
    ratelimit::{
        CounterStore, InMemoryCounterStore, RateLimitConfig, RateLimiter, RedisCounterStore,
        COUNTER_PURGE_INTERVAL_SECS,
    },
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kb_server=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting Board Authorization Server"
    );

    // Initialize rate limiter (optional)
    let rate_limiter = {
        let rl_config = RateLimitConfig::from_env();
        if rl_config.enabled {
            let store = counter_store(&config).await?;
            info!(
                fail_open = rl_config.fail_open,
                per_minute = rl_config.default_policy.requests_per_minute,
                per_hour = rl_config.default_policy.requests_per_hour,
                "Rate limiter initialized"
            );
            Some(RateLimiter::new(store, rl_config))
        } else {
            info!("Rate limiting disabled by configuration");
            None
        }
    };

    // Build application state
    let state = api::AppState::new(config.clone(), rate_limiter);

    // Build router
    let app = api::create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!(address = %config.bind_address, "Server listening");

    // Graceful shutdown handler
    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install CTRL+C signal handler");
            std::future::pending::<()>().await;
        }
        info!("Received shutdown signal, cleaning up...");
    };

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal)
    .await?;

    info!("Server shutdown complete");

    Ok(())
}

/// Redis when configured, otherwise process-local counters.
async fn counter_store(config: &config::Config) -> Result<Arc<dyn CounterStore>> {
    match config.redis_url {
        Some(ref url) => Ok(Arc::new(RedisCounterStore::connect(url).await?)),
        None => {
            warn!("REDIS_URL not set, rate limit counters are kept in memory and not shared between instances");
            let store = Arc::new(InMemoryCounterStore::new());
            store.spawn_purge_task(Duration::from_secs(COUNTER_PURGE_INTERVAL_SECS));
            Ok(store as Arc<dyn CounterStore>)
        }
    }
}
