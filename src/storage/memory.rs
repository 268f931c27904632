//! In-memory `BattleStore`
//!
//! Thread-safe via a single `RwLock`, which also makes the battle insert
//! atomic. Not durable: data is lost on restart.

use std::collections::HashMap;
use std::sync::RwLock;

use super::{BattleStore, StorageError};
use crate::types::{
    AggregateKey, BattleRecord, BattleWithDeployments, NewBattle, PatternKey, ScenarioAggregate,
    ScenarioKey, StrategyPattern, UnitDeployment,
};

#[derive(Default)]
struct MemoryInner {
    next_id: u64,
    battles: Vec<BattleRecord>,
    deployments: HashMap<u64, Vec<UnitDeployment>>,
    patterns: HashMap<PatternKey, StrategyPattern>,
    aggregates: HashMap<AggregateKey, ScenarioAggregate>,
}

/// In-memory store for tests and minimal deployments
#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<MemoryInner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, MemoryInner>, StorageError> {
        self.inner
            .read()
            .map_err(|e| StorageError::Storage(e.to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, MemoryInner>, StorageError> {
        self.inner
            .write()
            .map_err(|e| StorageError::Storage(e.to_string()))
    }
}

impl BattleStore for InMemoryStore {
    fn insert_battle(&self, battle: NewBattle) -> Result<BattleRecord, StorageError> {
        let mut store = self.write()?;

        store.next_id += 1;
        let (record, deployments) = BattleRecord::assign(store.next_id, battle);

        store.deployments.insert(record.id, deployments);
        store.battles.push(record.clone());

        Ok(record)
    }

    fn recent_battles(
        &self,
        scenario: &ScenarioKey,
        limit: usize,
    ) -> Result<Vec<BattleWithDeployments>, StorageError> {
        let store = self.read()?;

        Ok(store
            .battles
            .iter()
            .rev()
            .filter(|b| &b.scenario == scenario)
            .take(limit)
            .map(|record| BattleWithDeployments {
                deployments: store.deployments.get(&record.id).cloned().unwrap_or_default(),
                record: record.clone(),
            })
            .collect())
    }

    fn list_battles(&self) -> Result<Vec<BattleRecord>, StorageError> {
        Ok(self.read()?.battles.clone())
    }

    fn get_pattern(&self, key: &PatternKey) -> Result<Option<StrategyPattern>, StorageError> {
        Ok(self.read()?.patterns.get(key).cloned())
    }

    fn put_pattern(&self, pattern: &StrategyPattern) -> Result<(), StorageError> {
        self.write()?
            .patterns
            .insert(pattern.key.clone(), pattern.clone());
        Ok(())
    }

    fn patterns_for(&self, scenario: &ScenarioKey) -> Result<Vec<StrategyPattern>, StorageError> {
        Ok(self
            .read()?
            .patterns
            .values()
            .filter(|p| &p.key.scenario == scenario)
            .cloned()
            .collect())
    }

    fn get_aggregate(&self, key: &AggregateKey) -> Result<Option<ScenarioAggregate>, StorageError> {
        Ok(self.read()?.aggregates.get(key).cloned())
    }

    fn put_aggregate(&self, aggregate: &ScenarioAggregate) -> Result<(), StorageError> {
        self.write()?
            .aggregates
            .insert(aggregate.key.clone(), aggregate.clone());
        Ok(())
    }

    fn list_aggregates(&self) -> Result<Vec<ScenarioAggregate>, StorageError> {
        let mut aggregates: Vec<_> = self.read()?.aggregates.values().cloned().collect();
        aggregates.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(aggregates)
    }

    fn replace_aggregates(&self, aggregates: &[ScenarioAggregate]) -> Result<(), StorageError> {
        let mut store = self.write()?;
        store.aggregates = aggregates
            .iter()
            .map(|a| (a.key.clone(), a.clone()))
            .collect();
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "InMemory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BattleMetrics, BattleResult, Position, UnitCategory};
    use chrono::Utc;

    fn new_battle(map: &str, units: usize) -> NewBattle {
        NewBattle {
            scenario: ScenarioKey::new(map, "army"),
            session_id: "s1".to_string(),
            budget: 1_000_000,
            spent: 500_000,
            result: BattleResult::Victory,
            duration_secs: 90,
            metrics: BattleMetrics::default(),
            recorded_at: Utc::now(),
            deployments: (0..units)
                .map(|i| UnitDeployment {
                    battle_id: 0,
                    unit_id: format!("u{i}"),
                    name: "Switchblade 300".to_string(),
                    category: UnitCategory::Attack,
                    cost: 60_000,
                    start: Position { x: 10.0, y: 90.0 },
                    survived: true,
                    kills: 1,
                    damage_dealt: 40.0,
                })
                .collect(),
        }
    }

    #[test]
    fn test_insert_assigns_ids_and_owner() {
        let store = InMemoryStore::new();
        let first = store.insert_battle(new_battle("gaza", 2)).unwrap();
        let second = store.insert_battle(new_battle("gaza", 1)).unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);

        let recent = store.recent_battles(&ScenarioKey::new("gaza", "army"), 10).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].record.id, 2); // newest first
        assert!(recent[1].deployments.iter().all(|d| d.battle_id == 1));
    }

    #[test]
    fn test_recent_battles_filters_scenario_and_limits() {
        let store = InMemoryStore::new();
        for _ in 0..3 {
            store.insert_battle(new_battle("gaza", 1)).unwrap();
        }
        store.insert_battle(new_battle("kyiv", 1)).unwrap();

        let gaza = store.recent_battles(&ScenarioKey::new("gaza", "army"), 2).unwrap();
        assert_eq!(gaza.len(), 2);
        assert!(gaza.iter().all(|b| b.record.scenario.map == "gaza"));
    }

    #[test]
    fn test_trait_object() {
        let store: Box<dyn BattleStore> = Box::new(InMemoryStore::new());
        assert_eq!(store.backend_name(), "InMemory");
        store.insert_battle(new_battle("gaza", 1)).unwrap();
        assert_eq!(store.list_battles().unwrap().len(), 1);
    }
}
