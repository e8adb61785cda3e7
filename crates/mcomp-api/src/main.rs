//! Media compressor API server binary.

use std::net::SocketAddr;

use anyhow::Context;
use tracing::{info, warn};

use mcomp_api::logging::init_tracing;
use mcomp_api::{create_router, metrics, ApiConfig, AppState, JobJanitor};
use mcomp_media::MediaCapabilities;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    info!("Starting mcomp-api v{}", env!("CARGO_PKG_VERSION"));

    let config = ApiConfig::from_env();
    info!(
        host = %config.host,
        port = config.port,
        environment = %config.environment,
        max_upload_mb = config.max_upload_size_mb,
        workers = config.max_concurrent_jobs,
        "API config loaded"
    );

    config
        .ensure_dirs()
        .await
        .context("Failed to create upload/download directories")?;

    let capabilities = tokio::task::spawn_blocking(MediaCapabilities::detect)
        .await
        .context("Capability detection panicked")?;
    if capabilities.ffmpeg_available {
        info!(heic_support = capabilities.heic_support, "FFmpeg available");
    } else {
        warn!("FFmpeg not found: video, GIF, WebP and HEIC compression will fail");
    }

    let metrics_enabled = std::env::var("METRICS_ENABLED")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(true);
    let metrics_handle = if metrics_enabled {
        let handle = metrics::init_metrics().context("Failed to install metrics recorder")?;
        info!("Prometheus metrics enabled at /metrics");
        Some(handle)
    } else {
        None
    };

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", config.host, config.port))?;

    let state = AppState::new(config, capabilities);

    let janitor = JobJanitor::new(state.jobs.clone(), &state.config);
    tokio::spawn(async move {
        janitor.run().await;
    });

    let app = create_router(state, metrics_handle);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on {}", addr);

    let service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Received shutdown signal");
}
