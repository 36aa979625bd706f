use std::sync::Arc;
use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json},
    routing::get,
};
use serde::Deserialize;
use tracing::{info, warn};

use crate::config::Config;
use crate::metrics;
use crate::report::Reporter;

/// Web adapter - band conditions weather map
///
/// Serves the same report text a voice front end would speak, plus a
/// structured per-band view for the dashboard. Any conversational front end
/// sits on top of /api/report the same way this UI does.
pub struct WebServer {
    reporter: Arc<Reporter>,
    config: Arc<Config>,
}

#[derive(Clone)]
struct AppState {
    reporter: Arc<Reporter>,
}

#[derive(Deserialize)]
struct ReportQuery {
    band: Option<String>,
}

impl WebServer {
    pub fn new(reporter: Arc<Reporter>, config: Arc<Config>) -> Self {
        Self { reporter, config }
    }

    pub async fn run(&self) -> anyhow::Result<()> {
        let state = AppState {
            reporter: self.reporter.clone(),
        };

        let app = Router::new()
            .route("/", get(dashboard))
            .route("/api/report", get(api_report))
            .route("/api/conditions", get(api_conditions))
            .route("/api/stats", get(api_stats))
            .route("/metrics", get(prometheus_metrics))
            .with_state(state);

        let addr = format!("{}:{}", self.config.web.address, self.config.web.port);
        info!("🌐 Web UI listening on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, app).await?;
        Ok(())
    }
}

/// Dashboard HTML - embedded single-page app
async fn dashboard() -> Html<String> {
    Html(include_str!("../../static/dashboard.html").to_string())
}

/// Report API - the text a voice front end reads out verbatim
async fn api_report(
    State(state): State<AppState>,
    Query(params): Query<ReportQuery>,
) -> impl IntoResponse {
    let band = params.band.unwrap_or_else(|| "all".to_string());
    match state.reporter.summarize(&band).await {
        Ok(report) => (
            StatusCode::OK,
            Json(serde_json::json!({ "band": band, "report": report })),
        ),
        Err(e) => {
            // Callers get a generic failure; the cause goes to the log
            warn!("Report request for {:?} failed: {}", band, e);
            (
                StatusCode::BAD_GATEWAY,
                Json(serde_json::json!({
                    "error": "Band conditions are unavailable right now."
                })),
            )
        }
    }
}

/// Structured per-band conditions API
async fn api_conditions(State(state): State<AppState>) -> impl IntoResponse {
    match state.reporter.conditions().await {
        Ok(bands) => (
            StatusCode::OK,
            Json(serde_json::json!({ "bands": bands })),
        ),
        Err(e) => {
            warn!("Conditions request failed: {}", e);
            (
                StatusCode::BAD_GATEWAY,
                Json(serde_json::json!({
                    "error": "Band conditions are unavailable right now."
                })),
            )
        }
    }
}

/// Stats API
async fn api_stats(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(state.reporter.get_stats())
}

/// Prometheus exposition
async fn prometheus_metrics(State(state): State<AppState>) -> String {
    metrics::render_metrics(&state.reporter)
}
