//! Recommendation types returned by the synthesizer. Never persisted.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::UnitCategory;

/// Query for a recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendQuery {
    #[serde(default)]
    pub map: String,
    #[serde(default)]
    pub enemy: String,
    #[serde(default = "default_budget")]
    pub budget: u64,
}

fn default_budget() -> u64 {
    crate::config::defaults::DEFAULT_QUERY_BUDGET
}

/// Recommended number of units per category
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RecommendedComposition {
    pub recon: u32,
    pub attack: u32,
    pub defense: u32,
    pub equipment: u32,
    pub explanation: String,
}

impl RecommendedComposition {
    pub fn count(&self, category: UnitCategory) -> u32 {
        match category {
            UnitCategory::Recon => self.recon,
            UnitCategory::Attack => self.attack,
            UnitCategory::Defense => self.defense,
            UnitCategory::Equip => self.equipment,
        }
    }

    pub fn total(&self) -> u32 {
        self.recon + self.attack + self.defense + self.equipment
    }
}

/// Observed statistics of one unit type in winning battles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitStat {
    pub name: String,
    pub category: UnitCategory,
    pub cost: u64,
    /// Share of this unit's deployments that ended in victory (percent)
    pub win_rate: f64,
    pub avg_kills: f64,
    /// Deployments in victorious battles
    pub usage_count: u32,
    /// Survival rate in victorious battles (percent)
    pub survival_rate: f64,
}

/// Recommended deployment centroid for one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentZone {
    pub x: f64,
    pub y: f64,
    /// Number of surviving units the centroid was averaged over (0 for defaults)
    pub sample_size: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A specific unit suggestion with count and reason
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitSuggestion {
    pub name: String,
    #[serde(default)]
    pub count: u32,
    #[serde(default)]
    pub reason: String,
}

/// Summary of a ranked strategy pattern, as exposed to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternSummary {
    pub signature: String,
    /// Percent
    pub win_rate: f64,
    pub sample_count: u32,
    pub avg_cost_efficiency: Option<f64>,
}

/// Synthesized tactical recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub data_points: u64,
    /// 0-100
    pub confidence: u8,
    /// Percent, one decimal
    pub overall_win_rate: f64,
    pub recommended_composition: RecommendedComposition,
    pub top_units: Vec<UnitStat>,
    pub deployment_zones: BTreeMap<String, DeploymentZone>,
    pub tactical_notes: Vec<String>,
    pub specific_units: Vec<UnitSuggestion>,
    pub priority_targets: Vec<String>,
    pub top_patterns: Vec<PatternSummary>,
    /// Whether the tactical advisor contributed to this response
    pub enriched: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advisor_status: Option<String>,
    /// Set when the store could not be read and the response is degraded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
