//! Battle Storage
//!
//! `BattleStore` is the repository the flywheel calls through. Two backends:
//! - `InMemoryStore`: tests and throwaway deployments
//! - `SledStore`: durable storage using Sled DB trees
//!
//! Battle history (records + deployments) is append-only and written
//! atomically. Patterns and scenario aggregates are derived caches that the
//! aggregator refreshes through plain get/put calls.

mod memory;
mod sled_store;

pub use memory::InMemoryStore;
pub use sled_store::SledStore;

use crate::types::{
    AggregateKey, BattleRecord, BattleWithDeployments, NewBattle, PatternKey, ScenarioAggregate,
    ScenarioKey, StrategyPattern,
};

/// Trait for pluggable storage backends
///
/// Implementations must be thread-safe (Send + Sync) for shared access
/// across request handlers.
pub trait BattleStore: Send + Sync {
    /// Atomically write a battle and all of its deployments.
    ///
    /// Either both land or neither does. Returns the stored record with its
    /// assigned id.
    fn insert_battle(&self, battle: NewBattle) -> Result<BattleRecord, StorageError>;

    /// Most recent battles for a scenario, newest first.
    fn recent_battles(
        &self,
        scenario: &ScenarioKey,
        limit: usize,
    ) -> Result<Vec<BattleWithDeployments>, StorageError>;

    /// Every battle record (without deployments), oldest first.
    fn list_battles(&self) -> Result<Vec<BattleRecord>, StorageError>;

    fn get_pattern(&self, key: &PatternKey) -> Result<Option<StrategyPattern>, StorageError>;

    /// Insert or overwrite the pattern stored under `pattern.key`.
    fn put_pattern(&self, pattern: &StrategyPattern) -> Result<(), StorageError>;

    /// All stored patterns of a scenario, regardless of sample count.
    fn patterns_for(&self, scenario: &ScenarioKey) -> Result<Vec<StrategyPattern>, StorageError>;

    fn get_aggregate(&self, key: &AggregateKey) -> Result<Option<ScenarioAggregate>, StorageError>;

    /// Insert or overwrite the aggregate stored under `aggregate.key`.
    fn put_aggregate(&self, aggregate: &ScenarioAggregate) -> Result<(), StorageError>;

    fn list_aggregates(&self) -> Result<Vec<ScenarioAggregate>, StorageError>;

    /// Drop every stored aggregate and store `aggregates` instead.
    fn replace_aggregates(&self, aggregates: &[ScenarioAggregate]) -> Result<(), StorageError>;

    /// Backend name for logging
    fn backend_name(&self) -> &'static str;
}

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("transaction aborted: {0}")]
    Transaction(String),
}

impl From<sled::Error> for StorageError {
    fn from(err: sled::Error) -> Self {
        StorageError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}
