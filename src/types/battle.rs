//! Battle types: ScenarioKey, BattleResult, UnitCategory, BattleRecord, UnitDeployment

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Scenario
// ============================================================================

/// A (map, enemy type) pair under which battles and patterns are grouped.
///
/// Both parts are normalised (trimmed, lower-cased) on construction so that
/// `"Gaza"` and `"gaza "` land in the same scenario.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScenarioKey {
    pub map: String,
    pub enemy: String,
}

impl ScenarioKey {
    pub fn new(map: &str, enemy: &str) -> Self {
        Self {
            map: normalize_ident(map),
            enemy: normalize_ident(enemy),
        }
    }
}

impl fmt::Display for ScenarioKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} vs {}", self.map, self.enemy)
    }
}

/// Trim and lower-case a scenario identifier.
pub fn normalize_ident(raw: &str) -> String {
    raw.trim().to_lowercase()
}

// ============================================================================
// Outcome
// ============================================================================

/// Final outcome of a completed battle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BattleResult {
    Victory,
    Defeat,
}

impl BattleResult {
    /// Parse the wire value (`"victory"` / `"defeat"`, case-insensitive).
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "victory" => Some(Self::Victory),
            "defeat" => Some(Self::Defeat),
            _ => None,
        }
    }

    pub fn is_victory(self) -> bool {
        self == Self::Victory
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Victory => "victory",
            Self::Defeat => "defeat",
        }
    }
}

impl fmt::Display for BattleResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Unit Category
// ============================================================================

/// Role of a deployed unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitCategory {
    Recon,
    Attack,
    Defense,
    Equip,
}

impl UnitCategory {
    /// All categories in canonical order
    pub const ALL: [Self; 4] = [Self::Recon, Self::Attack, Self::Defense, Self::Equip];

    /// Parse a category name (case-insensitive, with common aliases).
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "recon" => Some(Self::Recon),
            "attack" => Some(Self::Attack),
            "defense" | "defence" => Some(Self::Defense),
            "equip" | "equipment" => Some(Self::Equip),
            _ => None,
        }
    }

    /// Parse a wire category. Unknown or missing values fall back to `Attack`.
    pub fn parse_or_default(raw: Option<&str>) -> Self {
        raw.and_then(Self::parse).unwrap_or(Self::Attack)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Recon => "recon",
            Self::Attack => "attack",
            Self::Defense => "defense",
            Self::Equip => "equip",
        }
    }
}

impl fmt::Display for UnitCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Persisted Records
// ============================================================================

/// Scalar metrics derived from one battle at ingest time
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BattleMetrics {
    /// Surviving allies as a percentage of deployed allies (0-100)
    pub survival_rate: f64,
    /// Budget spent per enemy killed (0 when nothing was killed)
    pub cost_per_kill: f64,
    /// Enemies killed per attack unit deployed
    pub kill_efficiency: f64,
}

/// Position on the map, in scenario-relative percentages
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// One deployed allied unit. Owned by exactly one battle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitDeployment {
    pub battle_id: u64,
    pub unit_id: String,
    pub name: String,
    pub category: UnitCategory,
    pub cost: u64,
    pub start: Position,
    pub survived: bool,
    pub kills: u32,
    pub damage_dealt: f64,
}

/// A validated battle that has not been assigned an id yet.
///
/// Deployments carry `battle_id = 0` until the store assigns the real id
/// inside the write transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBattle {
    pub scenario: ScenarioKey,
    pub session_id: String,
    pub budget: u64,
    pub spent: u64,
    pub result: BattleResult,
    pub duration_secs: u64,
    pub metrics: BattleMetrics,
    pub recorded_at: DateTime<Utc>,
    pub deployments: Vec<UnitDeployment>,
}

/// Immutable record of a completed battle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleRecord {
    pub id: u64,
    pub scenario: ScenarioKey,
    pub session_id: String,
    pub budget: u64,
    pub spent: u64,
    pub result: BattleResult,
    pub duration_secs: u64,
    pub metrics: BattleMetrics,
    pub recorded_at: DateTime<Utc>,
}

impl BattleRecord {
    /// Split a `NewBattle` into its record and deployments under `id`.
    pub fn assign(id: u64, battle: NewBattle) -> (Self, Vec<UnitDeployment>) {
        let deployments = battle
            .deployments
            .into_iter()
            .map(|d| UnitDeployment { battle_id: id, ..d })
            .collect();

        let record = Self {
            id,
            scenario: battle.scenario,
            session_id: battle.session_id,
            budget: battle.budget,
            spent: battle.spent,
            result: battle.result,
            duration_secs: battle.duration_secs,
            metrics: battle.metrics,
            recorded_at: battle.recorded_at,
        };

        (record, deployments)
    }
}

/// A battle together with its deployments, as read back from the store
#[derive(Debug, Clone, PartialEq)]
pub struct BattleWithDeployments {
    pub record: BattleRecord,
    pub deployments: Vec<UnitDeployment>,
}
