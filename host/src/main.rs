//! ==============================================================================
//! main.rs - sensor host entry point
//! ==============================================================================
//!
//! purpose:
//!     serves synthetic environmental sensor readings over http. each reading
//!     sits on a real address point sampled from a postgis table; the
//!     measurements themselves are random and generated per request.
//!     nothing is stored.
//!
//! responsibilities:
//!     - load configuration (config/host.toml, DATABASE_URL override)
//!     - initialize logging
//!     - build the postgres pool once (lazily connecting)
//!     - serve GET /api/sensors until ctrl-c
//!
//! relationships:
//!     - config.rs    (host.toml schema)
//!     - logging.rs   (tracing subscriber)
//!     - sampler.rs   (postgis TABLESAMPLE query)
//!     - generator.rs (random measurements)
//!     - api.rs       (router + handler)
//!     - error.rs     (error envelope)
//!
//! architecture:
//!
//!     ┌──────────────────────────────────────────────────────────┐
//!     │                     sensor host                          │
//!     │  ┌─────────────┐   ┌─────────────┐   ┌───────────────┐   │
//!     │  │  api.rs     │──▶│ sampler.rs  │──▶│ PgPool (sqlx) │───┼──▶ postgis
//!     │  │ /api/sensors│   └─────────────┘   └───────────────┘   │
//!     │  │             │   ┌─────────────┐                       │
//!     │  │             │──▶│generator.rs │  (rand + chrono-tz)   │
//!     │  └─────────────┘   └─────────────┘                       │
//!     └──────────────────────────────────────────────────────────┘
//!
//! ==============================================================================

mod api;
mod config;
mod domain;
mod error;
mod generator;
mod logging;
mod sampler;

use std::sync::Arc;

use anyhow::{Context, Result};

#[tokio::main]
async fn main() -> Result<()> {
    // step 1: load configuration
    let config = logging::with_bootstrap_logger(config::HostConfig::load_or_default);

    // step 2: logging
    logging::init(&config.logging);
    tracing::info!("===========================================================");
    tracing::info!("  Sensor Host - synthetic readings on real address points");
    tracing::info!("===========================================================");
    config.log_summary();

    // step 3: database pool + sampler
    // connect_lazy never touches the network, so an unreachable database shows
    // up per request as a 503 rather than keeping the host from starting
    let pool = sampler::connect_lazy(&config.database).context("invalid database url")?;
    let sampler = sampler::PgSampler::new(pool.clone(), &config.sampling, config.database.query_timeout())
        .context("invalid [sampling] configuration")?;
    tracing::debug!(query = sampler.query(), "sample query prepared");

    // step 4: web server
    let app = api::router(api::ApiState::new(Arc::new(sampler)));
    let listener = tokio::net::TcpListener::bind(&config.server.bind_address)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind_address))?;
    tracing::info!("[STARTUP] ✓ Listening on http://{}/api/sensors", config.server.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("web server error")?;

    pool.close().await;
    tracing::info!("[SHUTDOWN] ✓ Stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for ctrl-c: {e}");
        // without a signal handler, never resolve and keep serving
        std::future::pending::<()>().await;
    }
    tracing::info!("[SHUTDOWN] ctrl-c received, draining connections");
}
