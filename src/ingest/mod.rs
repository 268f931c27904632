//! Telemetry Ingestor
//!
//! Validates a battle-completion payload into a strict `NewBattle` and
//! derives the per-battle metrics. Nothing here touches storage; the
//! flywheel hands the validated battle to the store in one atomic write.

mod deployments;
pub mod payload;

pub use deployments::record_deployments;
pub use payload::{AllyState, BattlePayload, EnemyState, PositionOverride};

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::storage::StorageError;
use crate::types::{BattleMetrics, BattleResult, NewBattle, ScenarioKey, UnitCategory, UnitDeployment};
pub(crate) use deployments::non_negative_u64;

/// Errors returned to the caller of an ingest
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("invalid result '{0}': expected 'victory' or 'defeat'")]
    InvalidResult(String),
    #[error("failed to persist battle: {0}")]
    Storage(#[from] StorageError),
}

impl IngestError {
    /// Whether the caller sent a bad payload (as opposed to a server fault)
    pub fn is_validation(&self) -> bool {
        !matches!(self, Self::Storage(_))
    }
}

/// Validate a payload and derive its metrics.
///
/// Map, enemy and result are required; every other field falls back to a
/// documented default (numbers → 0, category → attack, session → "").
pub fn validate(payload: &BattlePayload, now: DateTime<Utc>) -> Result<NewBattle, IngestError> {
    let map = required(payload.map.as_deref(), "map")?;
    let enemy = required(payload.enemy.as_deref(), "enemy")?;
    let raw_result = required(payload.result.as_deref(), "result")?;
    let result =
        BattleResult::parse(raw_result).ok_or_else(|| IngestError::InvalidResult(raw_result.to_string()))?;

    let deployments = record_deployments(&payload.allies, &payload.initial_positions);
    let killed_enemies = payload.enemies.iter().filter(|e| e.is_killed()).count();
    let spent = non_negative_u64(payload.spent);
    let metrics = compute_metrics(&deployments, killed_enemies, spent);

    Ok(NewBattle {
        scenario: ScenarioKey::new(map, enemy),
        session_id: payload.session_id.clone().unwrap_or_default(),
        budget: non_negative_u64(payload.budget),
        spent,
        result,
        duration_secs: non_negative_u64(payload.timer),
        metrics,
        recorded_at: now,
        deployments,
    })
}

fn required<'a>(value: Option<&'a str>, field: &'static str) -> Result<&'a str, IngestError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(IngestError::MissingField(field))
}

/// Derive survival rate, cost per kill and kill efficiency.
///
/// Every ratio is 0 when its denominator is 0.
pub fn compute_metrics(
    deployments: &[UnitDeployment],
    killed_enemies: usize,
    spent: u64,
) -> BattleMetrics {
    let total_allies = deployments.len();
    let alive_allies = deployments.iter().filter(|d| d.survived).count();
    let attack_units = deployments
        .iter()
        .filter(|d| d.category == UnitCategory::Attack)
        .count();

    let survival_rate = if total_allies == 0 {
        0.0
    } else {
        alive_allies as f64 / total_allies as f64 * 100.0
    };

    let cost_per_kill = if killed_enemies == 0 {
        0.0
    } else {
        spent as f64 / killed_enemies as f64
    };

    let kill_efficiency = if attack_units == 0 {
        0.0
    } else {
        killed_enemies as f64 / attack_units as f64
    };

    BattleMetrics {
        survival_rate,
        cost_per_kill,
        kill_efficiency,
    }
}
