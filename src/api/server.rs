use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post},
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, decompression::RequestDecompressionLayer};
use tracing::{info, warn};

use super::{
    services::{
        cancel_task, download_file, health, queue_status, service_info, submit_download,
        task_status,
    },
    state::AppState,
};
use crate::config::Config;
use crate::ledger::Reaper;
use crate::observability::Metrics;
use crate::queue::Scheduler;
use crate::worker::YtDlpFetcher;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// All routes with CORS (any origin) and transparent gzip request decompression
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(service_info))
        .route("/health", get(health))
        .route("/api/download", post(submit_download))
        .route("/api/download/{task_id}", get(download_file))
        .route("/api/status/{task_id}", get(task_status))
        .route("/api/task/{task_id}", delete(cancel_task))
        .route("/api/queue", get(queue_status))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(CorsLayer::permissive())
                .layer(RequestDecompressionLayer::new()),
        )
}

/// Start the scheduler, the reaper and the HTTP server; returns after a
/// shutdown signal once the worker loop has drained its current step.
pub async fn run(mut config: Config, address: Option<SocketAddr>) -> Result<(), AnyError> {
    let address = address.unwrap_or(config.server.bind_addr);

    let download_dir = config.server.download_dir.clone();
    tokio::fs::create_dir_all(&download_dir).await.map_err(|e| {
        format!(
            "Failed to create download directory {}: {}",
            download_dir.display(),
            e
        )
    })?;
    // Recorded artifact paths stay valid regardless of the working directory
    let download_dir = tokio::fs::canonicalize(&download_dir).await.map_err(|e| {
        format!(
            "Failed to resolve download directory {}: {}",
            download_dir.display(),
            e
        )
    })?;
    info!(path = %download_dir.display(), "Download directory ready");
    config.server.download_dir = download_dir;

    let metrics = Arc::new(Metrics::new());
    let fetcher = Arc::new(YtDlpFetcher::new(config.ytdlp_options()));
    let scheduler = Scheduler::new(config.scheduler_settings(), fetcher, metrics.clone());
    let worker = scheduler.start();

    let reaper = Reaper::new(
        scheduler.clone(),
        metrics.clone(),
        config.retention(),
        config.sweep_interval(),
    )
    .start(scheduler.shutdown_token());

    let state = AppState::new(config, scheduler.clone(), metrics);
    let app = router(state);

    let listener = TcpListener::bind(address).await?;
    info!(%address, "vidbox API listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.shutdown();
    if let Err(e) = reaper.await {
        warn!(error = %e, "Reaper task ended abnormally");
    }
    info!("Waiting for the in-flight task to finish");
    if let Err(e) = worker.await {
        warn!(error = %e, "Scheduler worker ended abnormally");
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
