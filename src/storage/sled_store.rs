//! Sled-backed `BattleStore`
//!
//! Trees:
//! - `battles`: battle id (u64 BE) → JSON `BattleRecord`
//! - `deployments`: battle id (u64 BE) ++ index (u32 BE) → JSON `UnitDeployment`
//! - `battles_by_scenario`: map \0 enemy \0 battle id (u64 BE) → empty
//! - `patterns`: map \0 enemy \0 signature → JSON `StrategyPattern`
//! - `scenario_aggregates`: map \0 enemy \0 tier → JSON `ScenarioAggregate`
//!
//! Battle ids come from `Db::generate_id`, so big-endian keys sort
//! chronologically and reverse scans yield the newest battles first.

use sled::transaction::TransactionError;
use sled::Transactional;
use std::path::Path;
use std::sync::Arc;

use super::{BattleStore, StorageError};
use crate::types::{
    AggregateKey, BattleRecord, BattleWithDeployments, NewBattle, PatternKey, ScenarioAggregate,
    ScenarioKey, StrategyPattern, UnitDeployment,
};

const BATTLES_TREE: &str = "battles";
const DEPLOYMENTS_TREE: &str = "deployments";
const SCENARIO_INDEX_TREE: &str = "battles_by_scenario";
const PATTERNS_TREE: &str = "patterns";
const AGGREGATES_TREE: &str = "scenario_aggregates";

/// Durable battle storage
#[derive(Clone)]
pub struct SledStore {
    db: Arc<sled::Db>,
    battles: sled::Tree,
    deployments: sled::Tree,
    scenario_index: sled::Tree,
    patterns: sled::Tree,
    aggregates: sled::Tree,
}

impl SledStore {
    /// Open or create the store at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path_ref = path.as_ref();
        let db = sled::open(path_ref)?;

        let store = Self {
            battles: db.open_tree(BATTLES_TREE)?,
            deployments: db.open_tree(DEPLOYMENTS_TREE)?,
            scenario_index: db.open_tree(SCENARIO_INDEX_TREE)?,
            patterns: db.open_tree(PATTERNS_TREE)?,
            aggregates: db.open_tree(AGGREGATES_TREE)?,
            db: Arc::new(db),
        };

        tracing::info!(
            path = ?path_ref,
            battles = store.battles.len(),
            patterns = store.patterns.len(),
            "Battle store opened"
        );

        Ok(store)
    }

    /// Flush pending writes to disk
    pub fn flush(&self) -> Result<(), StorageError> {
        self.db.flush()?;
        Ok(())
    }

    /// Database size in bytes
    pub fn size_bytes(&self) -> u64 {
        self.db.size_on_disk().unwrap_or(0)
    }

    fn load_deployments(&self, battle_id: u64) -> Result<Vec<UnitDeployment>, StorageError> {
        let mut deployments = Vec::new();
        for item in self.deployments.scan_prefix(battle_id.to_be_bytes()) {
            let (_key, value) = item?;
            deployments.push(serde_json::from_slice(&value)?);
        }
        Ok(deployments)
    }
}

// ============================================================================
// Key Encoding
// ============================================================================

fn scenario_prefix(scenario: &ScenarioKey) -> Vec<u8> {
    let mut key = Vec::with_capacity(scenario.map.len() + scenario.enemy.len() + 2);
    key.extend_from_slice(scenario.map.as_bytes());
    key.push(0);
    key.extend_from_slice(scenario.enemy.as_bytes());
    key.push(0);
    key
}

fn index_key(scenario: &ScenarioKey, battle_id: u64) -> Vec<u8> {
    let mut key = scenario_prefix(scenario);
    key.extend_from_slice(&battle_id.to_be_bytes());
    key
}

fn deployment_key(battle_id: u64, index: u32) -> Vec<u8> {
    let mut key = Vec::with_capacity(12);
    key.extend_from_slice(&battle_id.to_be_bytes());
    key.extend_from_slice(&index.to_be_bytes());
    key
}

fn pattern_key(key: &PatternKey) -> Vec<u8> {
    let mut bytes = scenario_prefix(&key.scenario);
    bytes.extend_from_slice(key.signature.as_bytes());
    bytes
}

fn aggregate_key(key: &AggregateKey) -> Vec<u8> {
    let mut bytes = scenario_prefix(&key.scenario);
    bytes.extend_from_slice(key.tier.as_str().as_bytes());
    bytes
}

/// Battle id stored in the trailing 8 bytes of an index key
fn battle_id_from_index(key: &[u8]) -> Option<u64> {
    let tail: [u8; 8] = key.get(key.len().checked_sub(8)?..)?.try_into().ok()?;
    Some(u64::from_be_bytes(tail))
}

// ============================================================================
// BattleStore
// ============================================================================

impl BattleStore for SledStore {
    fn insert_battle(&self, battle: NewBattle) -> Result<BattleRecord, StorageError> {
        let id = self.db.generate_id()? + 1;
        let (record, deployments) = BattleRecord::assign(id, battle);

        // Serialize up front so the transaction body only touches the trees
        let record_bytes = serde_json::to_vec(&record)?;
        let deployment_rows = deployments
            .iter()
            .enumerate()
            .map(|(i, d)| {
                let index = u32::try_from(i)
                    .map_err(|_| StorageError::Storage("too many deployments".to_string()))?;
                Ok((deployment_key(id, index), serde_json::to_vec(d)?))
            })
            .collect::<Result<Vec<_>, StorageError>>()?;
        let scenario_entry = index_key(&record.scenario, id);

        (&self.battles, &self.deployments, &self.scenario_index)
            .transaction(|(battles, deployments, index)| {
                battles.insert(id.to_be_bytes().to_vec(), record_bytes.clone())?;
                for (key, value) in &deployment_rows {
                    deployments.insert(key.clone(), value.clone())?;
                }
                index.insert(scenario_entry.clone(), Vec::<u8>::new())?;
                Ok::<(), sled::transaction::ConflictableTransactionError<StorageError>>(())
            })
            .map_err(|e| match e {
                TransactionError::Abort(e) => e,
                TransactionError::Storage(e) => StorageError::Transaction(e.to_string()),
            })?;

        tracing::debug!(
            battle_id = id,
            scenario = %record.scenario,
            deployments = deployment_rows.len(),
            "Stored battle"
        );

        Ok(record)
    }

    fn recent_battles(
        &self,
        scenario: &ScenarioKey,
        limit: usize,
    ) -> Result<Vec<BattleWithDeployments>, StorageError> {
        let mut battles = Vec::with_capacity(limit.min(256));

        for item in self.scenario_index.scan_prefix(scenario_prefix(scenario)).rev() {
            if battles.len() >= limit {
                break;
            }

            let (key, _) = item?;
            let Some(id) = battle_id_from_index(&key) else {
                tracing::warn!("Malformed scenario index key, skipping");
                continue;
            };
            let Some(value) = self.battles.get(id.to_be_bytes())? else {
                tracing::warn!(battle_id = id, "Scenario index points at missing battle");
                continue;
            };

            let record: BattleRecord = serde_json::from_slice(&value)?;
            // identifiers containing the separator byte can alias another scenario
            if &record.scenario != scenario {
                continue;
            }
            battles.push(BattleWithDeployments {
                record,
                deployments: self.load_deployments(id)?,
            });
        }

        Ok(battles)
    }

    fn list_battles(&self) -> Result<Vec<BattleRecord>, StorageError> {
        let mut records = Vec::with_capacity(self.battles.len());
        for item in self.battles.iter() {
            let (_key, value) = item?;
            match serde_json::from_slice::<BattleRecord>(&value) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!("Failed to deserialize stored battle: {}", e),
            }
        }
        Ok(records)
    }

    fn get_pattern(&self, key: &PatternKey) -> Result<Option<StrategyPattern>, StorageError> {
        match self.patterns.get(pattern_key(key))? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    fn put_pattern(&self, pattern: &StrategyPattern) -> Result<(), StorageError> {
        let value = serde_json::to_vec(pattern)?;
        self.patterns.insert(pattern_key(&pattern.key), value)?;
        Ok(())
    }

    fn patterns_for(&self, scenario: &ScenarioKey) -> Result<Vec<StrategyPattern>, StorageError> {
        let mut patterns = Vec::new();
        for item in self.patterns.scan_prefix(scenario_prefix(scenario)) {
            let (_key, value) = item?;
            match serde_json::from_slice::<StrategyPattern>(&value) {
                // identifiers containing the separator byte can alias another scenario
                Ok(pattern) if &pattern.key.scenario == scenario => patterns.push(pattern),
                Ok(_) => {}
                Err(e) => tracing::warn!("Failed to deserialize stored pattern: {}", e),
            }
        }
        Ok(patterns)
    }

    fn get_aggregate(&self, key: &AggregateKey) -> Result<Option<ScenarioAggregate>, StorageError> {
        match self.aggregates.get(aggregate_key(key))? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    fn put_aggregate(&self, aggregate: &ScenarioAggregate) -> Result<(), StorageError> {
        let value = serde_json::to_vec(aggregate)?;
        self.aggregates.insert(aggregate_key(&aggregate.key), value)?;
        Ok(())
    }

    fn list_aggregates(&self) -> Result<Vec<ScenarioAggregate>, StorageError> {
        let mut aggregates = Vec::new();
        for item in self.aggregates.iter() {
            let (_key, value) = item?;
            aggregates.push(serde_json::from_slice(&value)?);
        }
        Ok(aggregates)
    }

    fn replace_aggregates(&self, aggregates: &[ScenarioAggregate]) -> Result<(), StorageError> {
        let mut batch = sled::Batch::default();
        for item in self.aggregates.iter() {
            let (key, _) = item?;
            batch.remove(key);
        }
        for aggregate in aggregates {
            batch.insert(aggregate_key(&aggregate.key), serde_json::to_vec(aggregate)?);
        }
        self.aggregates.apply_batch(batch)?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "Sled"
    }
}
