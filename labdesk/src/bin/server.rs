//! Labdesk HTTP server.
//!
//! Lab resource requests, stock availability and request conversations.

use labdesk::broadcast::ChannelBroadcaster;
use labdesk::config::{Config, StorageBackend};
use labdesk::metrics::register_business_metrics;
use labdesk::registration::RegistrationService;
use labdesk::server::{build_router, spawn_expiration_sweep, AppState, Providers};
use labdesk::stores::postgres::PostgresStores;
use labdesk_core::environment::SystemClock;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file (if present)
    let _ = dotenvy::dotenv();

    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.server.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting labdesk server");
    info!(
        backend = ?config.storage.backend,
        ttl_days = config.requests.ttl_days,
        sweep_interval_secs = config.requests.sweep_interval_secs,
        "Configuration loaded"
    );

    if config.server.metrics_port != 0 {
        let metrics_addr = SocketAddr::from(([0, 0, 0, 0], config.server.metrics_port));
        PrometheusBuilder::new()
            .with_http_listener(metrics_addr)
            .install()?;
        info!(address = %metrics_addr, "Prometheus exporter listening");
    }
    register_business_metrics();

    let providers = match config.storage.backend {
        StorageBackend::Memory => {
            warn!("Using in-memory storage; data is lost on shutdown");
            Providers::in_memory()
        }
        StorageBackend::Postgres => {
            let stores = PostgresStores::connect(&config.storage).await?;
            stores.migrate().await?;
            Providers::postgres(&stores)
        }
    };

    let clock = Arc::new(SystemClock);

    let registration = RegistrationService::new(
        providers.users.clone(),
        providers.tokens.clone(),
        providers.registration.clone(),
        clock.clone(),
    );
    registration.bootstrap_admin(&config.admin).await?;

    let state = AppState::new(
        providers,
        ChannelBroadcaster::new(),
        clock,
        &config.requests,
    );
    let sweep = spawn_expiration_sweep(state.requests.clone(), config.requests.sweep_interval_secs);

    let app = build_router(state);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "Server listening");

    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout);
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .into_future();
    tokio::select! {
        result = server => result?,
        () = async {
            shutdown_signal().await;
            tokio::time::sleep(shutdown_timeout).await;
        } => warn!(?shutdown_timeout, "Graceful shutdown timed out"),
    }

    if let Some(sweep) = sweep {
        sweep.abort();
    }
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
