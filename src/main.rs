//! Ray Tracer API server
//!
//! ## Usage
//!
//! ```bash
//! PORT=10000 \
//!   RAY_TRACER_BINARY=./calcus RAY_TRACER_WORKDIR=/app \
//!   cargo run --release
//! ```

use ray_tracer_api::config::ServerConfig;
use ray_tracer_api::routes::{app, AppState};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("ray_tracer_api=info,tower_http=warn")),
        )
        .with_target(true)
        .init();

    let config = match ServerConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!(op = "server.init.error", error = %e, "Config error");
            std::process::exit(1);
        }
    };

    info!(
        op = "server.init",
        ray_tracer_binary = %config.resolved_binary().display(),
        working_dir = %config.working_dir.display(),
        staging_dir = %config.staging_dir.display(),
        port = config.port,
        timeout_secs = config.timeout.as_secs(),
        max_request_size = config.max_request_size,
        "Configuration loaded"
    );

    if !config.resolved_binary().exists() {
        warn!(
            op = "server.init.binary_missing",
            ray_tracer_binary = %config.resolved_binary().display(),
            "Ray tracer binary not found - calculations will fail until it is installed"
        );
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = match TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!(op = "server.bind_failed", addr = %addr, error = %e, "Failed to bind");
            std::process::exit(1);
        }
    };

    info!(op = "server.start", addr = %addr, "Starting Ray Tracer Web Server");

    let router = app(AppState::from_config(config));
    if let Err(e) = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(op = "server.error", error = %e, "Server error");
        std::process::exit(1);
    }

    info!(op = "server.stopped", "Server stopped");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.ok();
    info!(op = "server.shutdown.signal", "Ctrl+C received");
}
