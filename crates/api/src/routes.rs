//! HTTP route handlers for the API.

use crate::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use conclave_common::{QueryContext, UnifiedResponse};
use conclave_coordinator::PerformanceRecord;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Longest query accepted by the orchestrate endpoint, in characters.
pub const MAX_QUERY_CHARS: usize = 16_384;

const DEFAULT_PERFORMANCE_LIMIT: usize = 50;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub registered_agents: usize,
}

/// Health check endpoint.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.uptime_seconds(),
        registered_agents: state.coordinator.registered_agents().await,
    })
}

/// Orchestrate request body.
#[derive(Debug, Deserialize)]
pub struct OrchestrateRequest {
    pub query: String,
    #[serde(default)]
    pub context: QueryContext,
}

/// API error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, Json(self)).into_response()
    }
}

/// Answer a query. Failures inside the pipeline come back as fallback answers.
pub async fn orchestrate(
    State(state): State<Arc<AppState>>,
    Json(request): Json<OrchestrateRequest>,
) -> Result<Json<UnifiedResponse>, ErrorResponse> {
    let query_chars = request.query.chars().count();
    if query_chars > MAX_QUERY_CHARS {
        warn!(query_chars, "Rejected oversized query");
        return Err(ErrorResponse {
            error: format!("Query exceeds {} characters", MAX_QUERY_CHARS),
            code: "QUERY_TOO_LONG",
        });
    }

    info!(
        content_preview = %request.query.chars().take(50).collect::<String>(),
        user_id = ?request.context.user_id,
        "Received query"
    );

    let response = state
        .coordinator
        .orchestrate(&request.query, request.context)
        .await;

    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
pub struct PerformanceParams {
    pub limit: Option<usize>,
}

/// Recent performance records and aggregates.
#[derive(Debug, Serialize)]
pub struct PerformanceResponse {
    pub records: Vec<PerformanceRecord>,
    pub average_processing_ms: f64,
    pub classification_under_target: usize,
    pub classification_total: usize,
}

pub async fn performance(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PerformanceParams>,
) -> Json<PerformanceResponse> {
    let tracker = state.coordinator.performance();
    let (under, total) = tracker.classification_within_target();

    Json(PerformanceResponse {
        records: tracker.recent(params.limit.unwrap_or(DEFAULT_PERFORMANCE_LIMIT)),
        average_processing_ms: tracker.average_processing_ms(),
        classification_under_target: under,
        classification_total: total,
    })
}
