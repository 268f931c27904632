//! BattleBottle: battle telemetry data flywheel
//!
//! Ingests completed battle simulations, aggregates winning unit
//! compositions per scenario and synthesizes tactical recommendations.
//!
//! ## Architecture
//!
//! - **Ingest**: payload validation, metrics, deployment records
//! - **Storage**: `BattleStore` repository (sled or in-memory)
//! - **Flywheel**: signature, pattern aggregation, recommendation synthesis, fallback rules
//! - **Advisor**: optional LLM enrichment and post-battle debriefs
//! - **API**: Axum HTTP adapter

pub mod advisor;
pub mod api;
pub mod config;
pub mod flywheel;
pub mod ingest;
pub mod storage;
pub mod types;

pub use advisor::{AdvisorError, DisabledAdvisor, HttpAdvisor, TacticalAdvisor};
pub use config::AppConfig;
pub use flywheel::Flywheel;
pub use ingest::{BattlePayload, IngestError};
pub use storage::{BattleStore, InMemoryStore, SledStore, StorageError};
pub use types::{Recommendation, RecommendQuery, ScenarioKey};
