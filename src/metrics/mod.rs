//! Prometheus endpoint for the ping figures.
//!
//! Every scrape asks the stats table for fresh figures, renders them, and
//! appends the agent's own counters from the `metrics` recorder.
//!
//! ```bash
//! curl http://127.0.0.1:8000/metrics
//! ```

pub mod agent_metrics;
pub mod exposition;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::get,
    Router,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tokio::{net::TcpListener, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::{
    error::{Error, Result},
    stats::StatsTable,
};

const CONTENT_TYPE: &str = "text/plain; version=0.0.4";

#[derive(Clone)]
struct ScrapeState {
    stats: Arc<StatsTable>,
    recorder: Option<PrometheusHandle>,
}

/// Handle to the running metrics server.
pub struct MetricsServer {
    local_addr: SocketAddr,
    task: JoinHandle<()>,
}

impl MetricsServer {
    /// Address the server actually listens on.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Waits until the server has shut down.
    pub async fn join(self) {
        let _ = self.task.await;
    }
}

/// Installs the global recorder backing [`agent_metrics`].
pub fn install_recorder() -> Result<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| Error::Metrics(e.to_string()))
}

/// Binds the HTTP server and serves `/metrics` until `cancel` fires.
pub async fn init(
    addr: SocketAddr,
    stats: Arc<StatsTable>,
    recorder: Option<PrometheusHandle>,
    cancel: CancellationToken,
) -> Result<MetricsServer> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| Error::Bind { addr, source })?;
    let local_addr = listener.local_addr()?;
    log::info!("Metrics server listening on http://{}/metrics", local_addr);

    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(ScrapeState { stats, recorder });

    let task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async move { cancel.cancelled().await })
            .await
        {
            log::error!("Metrics server failed: {}", e);
        }
    });

    Ok(MetricsServer { local_addr, task })
}

async fn metrics_handler(State(state): State<ScrapeState>) -> impl IntoResponse {
    let mut body = exposition::render(&state.stats.collect());
    if let Some(recorder) = &state.recorder {
        body.push_str(&recorder.render());
    }
    ([(header::CONTENT_TYPE, CONTENT_TYPE)], body)
}
