use anyhow::Result;
use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use promock_corpus::{CorpusManager, ServiceConfig};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

#[derive(Clone)]
pub struct AppState {
    manager: Arc<CorpusManager>,
    start_time: Instant,
}

impl AppState {
    pub fn new(manager: Arc<CorpusManager>) -> Self {
        Self {
            manager,
            start_time: Instant::now(),
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    uptime_seconds: u64,
    files: usize,
    families: usize,
    series: usize,
    built_at: Option<DateTime<Utc>>,
}

pub async fn execute(config: ServiceConfig) -> Result<()> {
    let manager = Arc::new(CorpusManager::new(&config));
    if let Err(e) = manager.refresh().await {
        warn!("Initial corpus load failed, serving empty output until a refresh succeeds: {}", e);
    }

    let shutdown = CancellationToken::new();
    let refresher = {
        let manager = manager.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move { manager.run(shutdown).await })
    };

    let app = router(AppState::new(manager));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.listen_port));
    info!("Starting promock on {}", addr);
    info!("Monitoring directory: {}", config.metrics_dir.display());
    info!("Endpoints:");
    info!("  GET  /metrics  - Generated metrics");
    info!("  GET  /health   - Health check");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    shutdown.cancel();
    refresher.await?;
    Ok(())
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/metrics", get(metrics))
        .route("/health", get(health_check))
        .with_state(state)
}

async fn shutdown_signal(shutdown: CancellationToken) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                warn!("Failed to listen for Ctrl-C: {}", e);
            }
            info!("shutdown signal received");
        }
        () = shutdown.cancelled() => {}
    }
    shutdown.cancel();
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let body = state.manager.render(Utc::now());
    ([(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)], body)
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let summary = state.manager.summary();
    let status = if summary.series > 0 { "healthy" } else { "empty" };
    Json(HealthResponse {
        status: status.to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        files: summary.files,
        families: summary.families,
        series: summary.series,
        built_at: summary.built_at,
    })
}
