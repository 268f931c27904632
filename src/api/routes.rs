//! API route definitions
//!
//! - GET  /                     - service info and endpoint list
//! - POST /api/submit           - ingest a completed battle
//! - POST /api/recommend        - tactical recommendation for a scenario
//! - POST /api/feedback         - post-battle debrief (attack)
//! - POST /api/defense-feedback - post-battle debrief (defense)
//! - GET  /api/stats            - global and per-scenario totals
//! - GET  /health               - liveness and advisor status

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{self, ApiState};

/// Create all routes
pub fn api_routes(state: ApiState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/api/submit", post(handlers::submit))
        .route("/api/recommend", post(handlers::recommend))
        .route("/api/feedback", post(handlers::feedback))
        .route("/api/defense-feedback", post(handlers::defense_feedback))
        .route("/api/stats", get(handlers::stats))
        .with_state(state)
}
