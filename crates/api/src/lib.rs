//! HTTP gateway for the Conclave orchestration core.
//!
//! # Endpoints
//!
//! - `GET /health` - Health check
//! - `POST /api/v1/orchestrate` - Answer a query with the selected agents
//! - `GET /api/v1/performance` - Recent performance records and aggregates
//!
//! # Architecture
//!
//! ```text
//! Client
//!    │
//!    ▼
//! ┌─────────────────┐
//! │   API Gateway   │ ◄── This crate
//! │     (Axum)      │
//! └────────┬────────┘
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │   Coordinator   │ ──► │  Agent service   │  (HttpAgentInvoker)
//! │                 │ ──► │  Knowledge base  │  (HttpKnowledgeRetriever)
//! └─────────────────┘     └──────────────────┘
//! ```

pub mod adapters;
pub mod routes;
pub mod state;

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

pub use adapters::{HttpAgentInvoker, HttpKnowledgeRetriever};
pub use state::AppState;

/// Create the API router with all routes configured.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(routes::health))
        .route("/api/v1/orchestrate", post(routes::orchestrate))
        .route("/api/v1/performance", get(routes::performance))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the API server on the given address.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> anyhow::Result<()> {
    let router = create_router(state);

    info!(%addr, "Starting Conclave API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
