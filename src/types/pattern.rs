//! Aggregate types: BudgetTier, StrategyPattern, ScenarioAggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{ScenarioKey, UnitCategory};

// ============================================================================
// Budget Tier
// ============================================================================

/// Coarse budget bucket used to segment scenario aggregates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetTier {
    Low,
    Medium,
    High,
    Unlimited,
}

impl BudgetTier {
    pub const ALL: [Self; 4] = [Self::Low, Self::Medium, Self::High, Self::Unlimited];

    /// Pure step function of the budget.
    pub fn from_budget(budget: u64) -> Self {
        if budget < 1_000_000 {
            Self::Low
        } else if budget < 3_000_000 {
            Self::Medium
        } else if budget < 5_000_000 {
            Self::High
        } else {
            Self::Unlimited
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Unlimited => "unlimited",
        }
    }
}

impl fmt::Display for BudgetTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Strategy Pattern
// ============================================================================

/// One (category, name) entry of a composition with its multiplicity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CompositionEntry {
    pub category: UnitCategory,
    pub name: String,
    pub count: u32,
}

/// Unique key of a strategy pattern
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PatternKey {
    pub scenario: ScenarioKey,
    pub signature: String,
}

/// Aggregate performance of one composition within one scenario.
///
/// Refreshed on every recompute that sees enough samples; never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyPattern {
    pub key: PatternKey,
    /// Canonical composition the signature was built from
    pub composition: Vec<CompositionEntry>,
    /// Wins / samples, as a fraction (0.0-1.0)
    pub win_rate: f64,
    pub sample_count: u32,
    /// Mean cost-per-kill over samples that killed anything
    pub avg_cost_efficiency: Option<f64>,
    pub first_seen: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Scenario Aggregate
// ============================================================================

/// Unique key of a scenario aggregate
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AggregateKey {
    pub scenario: ScenarioKey,
    pub tier: BudgetTier,
}

/// Running outcome totals for one scenario and budget tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioAggregate {
    pub key: AggregateKey,
    pub total_battles: u64,
    pub victories: u64,
    /// Running mean battle duration in seconds
    pub avg_duration_secs: f64,
    pub updated_at: DateTime<Utc>,
}

impl ScenarioAggregate {
    pub fn empty(key: AggregateKey, now: DateTime<Utc>) -> Self {
        Self {
            key,
            total_battles: 0,
            victories: 0,
            avg_duration_secs: 0.0,
            updated_at: now,
        }
    }

    /// Victories / battles as a fraction, 0 when empty
    pub fn win_rate(&self) -> f64 {
        if self.total_battles == 0 {
            0.0
        } else {
            self.victories as f64 / self.total_battles as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_tier_boundaries() {
        assert_eq!(BudgetTier::from_budget(0), BudgetTier::Low);
        assert_eq!(BudgetTier::from_budget(999_999), BudgetTier::Low);
        assert_eq!(BudgetTier::from_budget(1_000_000), BudgetTier::Medium);
        assert_eq!(BudgetTier::from_budget(2_999_999), BudgetTier::Medium);
        assert_eq!(BudgetTier::from_budget(3_000_000), BudgetTier::High);
        assert_eq!(BudgetTier::from_budget(4_999_999), BudgetTier::High);
        assert_eq!(BudgetTier::from_budget(5_000_000), BudgetTier::Unlimited);
        assert_eq!(BudgetTier::from_budget(u64::MAX), BudgetTier::Unlimited);
    }

    #[test]
    fn test_budget_tier_is_monotonic() {
        let mut last = BudgetTier::Low;
        for budget in (0..8_000_000).step_by(250_000) {
            let tier = BudgetTier::from_budget(budget);
            assert!(tier >= last, "tier went backwards at {budget}");
            last = tier;
        }
    }

    #[test]
    fn test_empty_aggregate_win_rate() {
        let key = AggregateKey {
            scenario: ScenarioKey::new("gaza", "army"),
            tier: BudgetTier::Medium,
        };
        assert_eq!(ScenarioAggregate::empty(key, Utc::now()).win_rate(), 0.0);
    }
}
