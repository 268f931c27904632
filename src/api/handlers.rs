//! API route handlers
//!
//! Thin adapters over the `Flywheel`: decode the body, call one flywheel
//! operation, encode the result.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};

use super::envelope::ApiError;
use crate::advisor::{BattleDebrief, DebriefMode};
use crate::flywheel::Flywheel;
use crate::ingest::BattlePayload;
use crate::types::{BattleMetrics, GlobalStats, RecommendQuery, Recommendation};

/// Endpoints listed by the index route
pub const ENDPOINTS: [&str; 6] = [
    "/api/submit",
    "/api/recommend",
    "/api/feedback",
    "/api/defense-feedback",
    "/api/stats",
    "/health",
];

// ============================================================================
// API State
// ============================================================================

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub flywheel: Flywheel,
}

impl ApiState {
    pub fn new(flywheel: Flywheel) -> Self {
        Self { flywheel }
    }
}

// ============================================================================
// Service Info
// ============================================================================

pub async fn index(State(state): State<ApiState>) -> Json<Value> {
    Json(json!({
        "service": "BattleBottle Flywheel",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "storage": state.flywheel.store().backend_name(),
        "ai_enabled": state.flywheel.advisor_enabled(),
        "endpoints": ENDPOINTS,
    }))
}

pub async fn health(State(state): State<ApiState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "ai_enabled": state.flywheel.advisor_enabled(),
        "storage": state.flywheel.store().backend_name(),
        "model": state.flywheel.advisor_config().model,
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

// ============================================================================
// Write Path
// ============================================================================

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub success: bool,
    pub simulation_id: u64,
    pub message: &'static str,
    pub metrics: BattleMetrics,
    pub patterns_refreshed: usize,
    pub ai_feedback: Option<BattleDebrief>,
}

/// POST /api/submit
pub async fn submit(
    State(state): State<ApiState>,
    body: Result<Json<BattlePayload>, JsonRejection>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let Json(payload) = body?;
    let receipt = state.flywheel.ingest(&payload)?;

    let ai_feedback = if state.flywheel.advisor_config().debrief_on_submit {
        state.flywheel.debrief(&payload, DebriefMode::Attack).await.ok()
    } else {
        None
    };

    Ok(Json(SubmitResponse {
        success: true,
        simulation_id: receipt.battle_id,
        message: "Simulation recorded",
        metrics: receipt.metrics,
        patterns_refreshed: receipt.patterns_refreshed,
        ai_feedback,
    }))
}

// ============================================================================
// Read Path
// ============================================================================

/// POST /api/recommend. Always 200; failures produce a degraded body.
pub async fn recommend(
    State(state): State<ApiState>,
    body: Result<Json<RecommendQuery>, JsonRejection>,
) -> Json<Recommendation> {
    match body {
        Ok(Json(query)) => Json(state.flywheel.recommend(&query).await),
        Err(rejection) => {
            let query = RecommendQuery {
                map: String::new(),
                enemy: String::new(),
                budget: crate::config::defaults::DEFAULT_QUERY_BUDGET,
            };
            Json(crate::flywheel::synthesizer::degraded(&query, &rejection.body_text()))
        }
    }
}

/// GET /api/stats
pub async fn stats(State(state): State<ApiState>) -> Result<Json<GlobalStats>, ApiError> {
    Ok(Json(state.flywheel.stats()?))
}

// ============================================================================
// Debriefs
// ============================================================================

/// POST /api/feedback
pub async fn feedback(
    State(state): State<ApiState>,
    body: Result<Json<BattlePayload>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(payload) = body?;
    Ok(Json(debrief_body(&state, &payload, DebriefMode::Attack).await))
}

/// POST /api/defense-feedback
pub async fn defense_feedback(
    State(state): State<ApiState>,
    body: Result<Json<BattlePayload>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(payload) = body?;
    Ok(Json(debrief_body(&state, &payload, DebriefMode::Defense).await))
}

async fn debrief_body(state: &ApiState, payload: &BattlePayload, mode: DebriefMode) -> Value {
    match state.flywheel.debrief(payload, mode).await {
        Ok(debrief) => json!({
            "success": true,
            "feedback": debrief,
            "mode": mode.as_str(),
        }),
        Err(e) => json!({
            "success": false,
            "error": format!("Could not generate {} feedback", mode.as_str()),
            "advisor_status": e.code(),
            "mode": mode.as_str(),
        }),
    }
}
