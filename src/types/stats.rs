//! Service-wide statistics and operation reports

use serde::{Deserialize, Serialize};

/// Outcome totals across every recorded battle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalStats {
    pub total_simulations: u64,
    pub total_victories: u64,
    /// Whole percent
    pub global_win_rate: u64,
    /// Distinct non-empty session ids
    pub unique_players: u64,
    pub ai_enabled: bool,
    pub scenarios: Vec<ScenarioStats>,
}

/// Outcome totals of one (map, enemy) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioStats {
    pub map: String,
    pub enemy: String,
    pub battles: u64,
    pub victories: u64,
    /// Percent, one decimal
    pub win_rate: f64,
}

/// Result of an ingest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestReceipt {
    pub battle_id: u64,
    pub map: String,
    pub enemy: String,
    pub result: super::BattleResult,
    pub metrics: super::BattleMetrics,
    /// Patterns written by the post-ingest recompute
    pub patterns_refreshed: usize,
}

/// Result of rebuilding the derived caches from history
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RebuildReport {
    pub battles: usize,
    pub scenarios: usize,
    pub aggregates: usize,
    pub patterns: usize,
}
