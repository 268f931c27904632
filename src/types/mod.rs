//! Shared data structures for the battle telemetry flywheel
//!
//! - battle: ScenarioKey, BattleRecord, UnitDeployment (immutable history)
//! - pattern: StrategyPattern, ScenarioAggregate, BudgetTier (derived caches)
//! - recommendation: Recommendation and its parts (ephemeral)
//! - stats: GlobalStats, ingest receipts and rebuild reports

mod battle;
mod pattern;
mod recommendation;
mod stats;

pub use battle::*;
pub use pattern::*;
pub use recommendation::*;
pub use stats::*;
