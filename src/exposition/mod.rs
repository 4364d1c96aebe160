pub mod render;

use crate::scheduler::{RefreshScheduler, SchedulerStatus};
use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use serde::Serialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

pub struct AppState {
    pub scheduler: Arc<RefreshScheduler>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    collector: SchedulerStatus,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// The Prometheus scrape surface. A degraded snapshot is still a 200: the
/// puller learns about tracker trouble from the health metrics, not from
/// HTTP failures. Only a cold start with no snapshot at all answers 503.
async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.scheduler.ensure_fresh().await {
        Some(snapshot) => {
            match render::render(Some(&snapshot), state.scheduler.metrics().registry()) {
                Ok(body) => {
                    ([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body).into_response()
                }
                Err(err) => {
                    error!(error = %err, "Failed to encode metrics");
                    (StatusCode::INTERNAL_SERVER_ERROR, "encoding error\n").into_response()
                }
            }
        }
        None => (StatusCode::SERVICE_UNAVAILABLE, "no snapshot collected yet\n").into_response(),
    }
}

async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let collector = state.scheduler.status().await;
    Json(HealthResponse {
        status: if collector.degraded { "degraded" } else { "ok" },
        version: crate::VERSION,
        collector,
    })
}

pub async fn serve(addr: &str, state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind listen address {}", addr))?;

    info!(
        "Exposition endpoint listening on http://{}/metrics",
        listener.local_addr()?
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Exposition server stopped");
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())
        .expect("Failed to setup SIGTERM handler");
    let mut sigint = signal(SignalKind::interrupt())
        .expect("Failed to setup SIGINT handler");

    tokio::select! {
        _ = sigterm.recv() => {
            info!("Received SIGTERM signal");
        }
        _ = sigint.recv() => {
            info!("Received SIGINT signal (Ctrl+C)");
        }
    }
}
