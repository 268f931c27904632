//! Pattern Aggregator
//!
//! Turns battle history into the two derived caches:
//! - `StrategyPattern`: per-signature outcome stats over the recent window
//! - `ScenarioAggregate`: running totals per scenario and budget tier
//!
//! Both are refreshed with explicit read-merge-write steps. Concurrent
//! writers race with last-writer-wins; a lost update is repaired by the next
//! recompute (patterns) or by a rebuild from history (aggregates).

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use super::signature;
use crate::config::FlywheelConfig;
use crate::storage::{BattleStore, StorageError};
use crate::types::{
    AggregateKey, BattleRecord, BattleWithDeployments, BudgetTier, PatternKey, ScenarioAggregate,
    ScenarioKey, StrategyPattern,
};

// ============================================================================
// Strategy Patterns
// ============================================================================

/// Recompute every qualifying pattern of a scenario from its recent window.
///
/// Returns the number of patterns written.
pub fn recompute_patterns(
    store: &dyn BattleStore,
    scenario: &ScenarioKey,
    config: &FlywheelConfig,
    now: DateTime<Utc>,
) -> Result<usize, StorageError> {
    let window = store.recent_battles(scenario, config.recompute_window)?;
    let fresh = observe_patterns(scenario, &window, config.min_samples, now);

    let mut written = 0;
    for pattern in fresh {
        let stored = store.get_pattern(&pattern.key)?;
        if let Some(merged) = merge_pattern(stored, pattern) {
            store.put_pattern(&merged)?;
            written += 1;
        }
    }

    debug!(
        scenario = %scenario,
        window = window.len(),
        patterns = written,
        "Recomputed strategy patterns"
    );
    Ok(written)
}

/// Group a window of battles by signature and compute the stats of every
/// group with at least `min_samples` battles.
///
/// Battles without deployments have no composition and are skipped.
pub fn observe_patterns(
    scenario: &ScenarioKey,
    window: &[BattleWithDeployments],
    min_samples: u32,
    now: DateTime<Utc>,
) -> Vec<StrategyPattern> {
    let mut groups: BTreeMap<String, Vec<&BattleWithDeployments>> = BTreeMap::new();
    for battle in window.iter().filter(|b| !b.deployments.is_empty()) {
        groups
            .entry(signature::signature(&battle.deployments))
            .or_default()
            .push(battle);
    }

    groups
        .into_iter()
        .filter(|(_, battles)| battles.len() >= min_samples as usize)
        .map(|(sig, battles)| {
            let samples = battles.len();
            let wins = battles.iter().filter(|b| b.record.result.is_victory()).count();

            let efficiencies: Vec<f64> = battles
                .iter()
                .map(|b| b.record.metrics.cost_per_kill)
                .filter(|c| *c > 0.0)
                .collect();
            let avg_cost_efficiency = if efficiencies.is_empty() {
                None
            } else {
                Some(efficiencies.iter().sum::<f64>() / efficiencies.len() as f64)
            };

            StrategyPattern {
                key: PatternKey {
                    scenario: scenario.clone(),
                    signature: sig,
                },
                composition: signature::composition(&battles[0].deployments),
                win_rate: wins as f64 / samples as f64,
                sample_count: u32::try_from(samples).unwrap_or(u32::MAX),
                avg_cost_efficiency,
                first_seen: now,
                updated_at: now,
            }
        })
        .collect()
}

/// Merge a freshly computed pattern into the stored one.
///
/// Returns `None` when the stored record was refreshed after `fresh` was
/// computed (the newer write wins). `first_seen` survives every merge.
pub fn merge_pattern(
    stored: Option<StrategyPattern>,
    fresh: StrategyPattern,
) -> Option<StrategyPattern> {
    match stored {
        None => Some(fresh),
        Some(stored) if stored.updated_at > fresh.updated_at => None,
        Some(stored) => Some(StrategyPattern {
            first_seen: stored.first_seen.min(fresh.first_seen),
            ..fresh
        }),
    }
}

// ============================================================================
// Scenario Aggregates
// ============================================================================

/// Fold one committed battle into its scenario aggregate.
pub fn record_scenario_outcome(
    store: &dyn BattleStore,
    record: &BattleRecord,
    now: DateTime<Utc>,
) -> Result<ScenarioAggregate, StorageError> {
    let key = aggregate_key(record);
    let stored = store.get_aggregate(&key)?;
    let merged = merge_outcome(stored.unwrap_or_else(|| ScenarioAggregate::empty(key, now)), record, now);
    store.put_aggregate(&merged)?;
    Ok(merged)
}

/// Add one battle to an aggregate, keeping the running mean duration.
pub fn merge_outcome(
    mut aggregate: ScenarioAggregate,
    record: &BattleRecord,
    now: DateTime<Utc>,
) -> ScenarioAggregate {
    aggregate.total_battles += 1;
    if record.result.is_victory() {
        aggregate.victories += 1;
    }
    let n = aggregate.total_battles as f64;
    aggregate.avg_duration_secs += (record.duration_secs as f64 - aggregate.avg_duration_secs) / n;
    aggregate.updated_at = now;
    aggregate
}

/// Reconstruct every scenario aggregate from full battle history.
pub fn rebuild_aggregates(battles: &[BattleRecord], now: DateTime<Utc>) -> Vec<ScenarioAggregate> {
    let mut aggregates: HashMap<AggregateKey, ScenarioAggregate> = HashMap::new();
    for record in battles {
        let key = aggregate_key(record);
        let current = aggregates
            .remove(&key)
            .unwrap_or_else(|| ScenarioAggregate::empty(key.clone(), now));
        aggregates.insert(key, merge_outcome(current, record, now));
    }

    let mut rebuilt: Vec<_> = aggregates.into_values().collect();
    rebuilt.sort_by(|a, b| a.key.cmp(&b.key));
    rebuilt
}

fn aggregate_key(record: &BattleRecord) -> AggregateKey {
    AggregateKey {
        scenario: record.scenario.clone(),
        tier: BudgetTier::from_budget(record.budget),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStore;
    use crate::types::{
        BattleMetrics, BattleResult, NewBattle, Position, UnitCategory, UnitDeployment,
    };
    use chrono::Duration;

    fn unit(category: UnitCategory, name: &str) -> UnitDeployment {
        UnitDeployment {
            battle_id: 0,
            unit_id: String::new(),
            name: name.to_string(),
            category,
            cost: 50_000,
            start: Position { x: 50.0, y: 85.0 },
            survived: true,
            kills: 1,
            damage_dealt: 10.0,
        }
    }

    fn battle(result: BattleResult, cost_per_kill: f64, duration: u64) -> NewBattle {
        NewBattle {
            scenario: ScenarioKey::new("gaza", "army"),
            session_id: "s".to_string(),
            budget: 2_000_000,
            spent: 500_000,
            result,
            duration_secs: duration,
            metrics: BattleMetrics {
                survival_rate: 100.0,
                cost_per_kill,
                kill_efficiency: 1.0,
            },
            recorded_at: Utc::now(),
            deployments: vec![
                unit(UnitCategory::Recon, "RQ-11 Raven"),
                unit(UnitCategory::Attack, "Switchblade 600"),
            ],
        }
    }

    #[test]
    fn test_two_samples_never_qualify_three_do() {
        let store = InMemoryStore::new();
        let scenario = ScenarioKey::new("gaza", "army");
        let config = FlywheelConfig::default();

        for _ in 0..2 {
            store.insert_battle(battle(BattleResult::Victory, 100.0, 60)).unwrap();
        }
        assert_eq!(recompute_patterns(&store, &scenario, &config, Utc::now()).unwrap(), 0);
        assert!(store.patterns_for(&scenario).unwrap().is_empty());

        store.insert_battle(battle(BattleResult::Defeat, 0.0, 60)).unwrap();
        assert_eq!(recompute_patterns(&store, &scenario, &config, Utc::now()).unwrap(), 1);

        let patterns = store.patterns_for(&scenario).unwrap();
        assert_eq!(patterns[0].sample_count, 3);
        assert!((patterns[0].win_rate - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_cost_efficiency_ignores_zero_kill_battles() {
        let scenario = ScenarioKey::new("gaza", "army");
        let window: Vec<_> = [100.0, 300.0, 0.0]
            .into_iter()
            .enumerate()
            .map(|(i, cpk)| {
                let (record, deployments) =
                    BattleRecord::assign(i as u64 + 1, battle(BattleResult::Victory, cpk, 60));
                BattleWithDeployments { record, deployments }
            })
            .collect();

        let patterns = observe_patterns(&scenario, &window, 3, Utc::now());
        assert_eq!(patterns[0].avg_cost_efficiency, Some(200.0));
    }

    #[test]
    fn test_cost_efficiency_absent_without_kills() {
        let scenario = ScenarioKey::new("gaza", "army");
        let window: Vec<_> = (1..=3)
            .map(|id| {
                let (record, deployments) =
                    BattleRecord::assign(id, battle(BattleResult::Defeat, 0.0, 60));
                BattleWithDeployments { record, deployments }
            })
            .collect();

        let patterns = observe_patterns(&scenario, &window, 3, Utc::now());
        assert_eq!(patterns[0].avg_cost_efficiency, None);
        assert_eq!(patterns[0].win_rate, 0.0);
    }

    #[test]
    fn test_battles_without_deployments_are_skipped() {
        let scenario = ScenarioKey::new("gaza", "army");
        let window: Vec<_> = (1..=3)
            .map(|id| {
                let mut b = battle(BattleResult::Victory, 10.0, 60);
                b.deployments.clear();
                let (record, deployments) = BattleRecord::assign(id, b);
                BattleWithDeployments { record, deployments }
            })
            .collect();

        assert!(observe_patterns(&scenario, &window, 3, Utc::now()).is_empty());
    }

    #[test]
    fn test_merge_preserves_first_seen_and_rejects_stale() {
        let scenario = ScenarioKey::new("gaza", "army");
        let earlier = Utc::now() - Duration::hours(1);
        let now = Utc::now();

        let window: Vec<_> = (1..=3)
            .map(|id| {
                let (record, deployments) =
                    BattleRecord::assign(id, battle(BattleResult::Victory, 10.0, 60));
                BattleWithDeployments { record, deployments }
            })
            .collect();
        let old = observe_patterns(&scenario, &window, 3, earlier).remove(0);
        let fresh = observe_patterns(&scenario, &window, 3, now).remove(0);

        let merged = merge_pattern(Some(old.clone()), fresh.clone()).unwrap();
        assert_eq!(merged.first_seen, earlier);
        assert_eq!(merged.updated_at, now);

        // A computation older than the stored record loses.
        assert!(merge_pattern(Some(fresh), old).is_none());
    }

    #[test]
    fn test_scenario_outcome_running_mean() {
        let store = InMemoryStore::new();
        let first = store.insert_battle(battle(BattleResult::Victory, 1.0, 60)).unwrap();
        let second = store.insert_battle(battle(BattleResult::Defeat, 1.0, 120)).unwrap();

        record_scenario_outcome(&store, &first, Utc::now()).unwrap();
        let agg = record_scenario_outcome(&store, &second, Utc::now()).unwrap();

        assert_eq!(agg.total_battles, 2);
        assert_eq!(agg.victories, 1);
        assert!((agg.avg_duration_secs - 90.0).abs() < 1e-9);
        assert_eq!(agg.key.tier, BudgetTier::Medium);
    }

    #[test]
    fn test_rebuild_matches_incremental() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        for (i, result) in [BattleResult::Victory, BattleResult::Defeat, BattleResult::Victory]
            .into_iter()
            .enumerate()
        {
            let mut b = battle(result, 1.0, 30 * (i as u64 + 1));
            if i == 2 {
                b.budget = 6_000_000;
            }
            let record = store.insert_battle(b).unwrap();
            record_scenario_outcome(&store, &record, now).unwrap();
        }

        let rebuilt = rebuild_aggregates(&store.list_battles().unwrap(), now);
        assert_eq!(rebuilt, store.list_aggregates().unwrap());
        assert_eq!(rebuilt.len(), 2);
    }
}
