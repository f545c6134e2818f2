//! scanhub service entry point.
//!
//! Loads settings, registers the configured plugins, keeps their health
//! current and serves the orchestrator API until interrupted.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::{net::TcpListener, signal};

use scanhub::config::Settings;
use scanhub::logging::init_tracing;
use scanhub::orchestrator::ScanOrchestrator;
use scanhub::registry::{probe_all, HealthMonitor};
use scanhub::server::{create_router, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = Settings::load().map_err(|e| {
        std::io::Error::other(format!(
            "Failed to load configuration. Check config/ files and SCANHUB__* env vars: {}",
            e
        ))
    })?;

    init_tracing(&settings.logging)?;

    tracing::info!(
        host = %settings.server.host,
        port = settings.server.port,
        plugins = settings.plugins.len(),
        "Starting scanhub"
    );

    let registry = Arc::new(settings.build_registry()?);

    let probe_timeout = Duration::from_secs(settings.health.probe_timeout_seconds);
    for (name, status) in probe_all(&registry, probe_timeout).await {
        tracing::info!(plugin = %name, status = %status, "Initial health probe");
    }

    let monitor = HealthMonitor::spawn(
        Arc::clone(&registry),
        Duration::from_secs(settings.health.interval_seconds),
    );

    let orchestrator = ScanOrchestrator::builder()
        .with_registry(registry)
        .with_config(settings.orchestrator_config())
        .build();

    let router = create_router(
        AppState::new(orchestrator),
        Duration::from_secs(settings.server.request_timeout_seconds),
    );

    let addr = SocketAddr::new(settings.server.host.parse()?, settings.server.port);
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    monitor.shutdown();
    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
