//! Wire format of a battle-completion payload.
//!
//! Everything is optional here; the ingestor decides what is required and
//! which default applies. Numbers are read as `f64` so integer and float
//! encodings from the game client are both accepted.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Battle-completion payload as sent by the simulator client
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BattlePayload {
    pub session_id: Option<String>,
    pub map: Option<String>,
    pub enemy: Option<String>,
    pub budget: Option<f64>,
    pub spent: Option<f64>,
    pub result: Option<String>,
    /// Battle duration in seconds
    pub timer: Option<f64>,
    pub allies: Vec<AllyState>,
    pub enemies: Vec<EnemyState>,
    /// Deployment positions keyed by unit id, overriding the ally's own x/y
    #[serde(rename = "initialPositions", alias = "initial_positions")]
    pub initial_positions: HashMap<String, PositionOverride>,
}

/// Final state of one allied unit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllyState {
    /// Unit id; the client sends either a string or a number
    pub id: Option<serde_json::Value>,
    pub name: Option<String>,
    #[serde(alias = "cat")]
    pub category: Option<String>,
    pub cost: Option<f64>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub hp: Option<f64>,
    #[serde(rename = "maxHp", alias = "max_hp")]
    pub max_hp: Option<f64>,
    pub kills: Option<f64>,
    #[serde(rename = "damageDealt", alias = "damage_dealt")]
    pub damage_dealt: Option<f64>,
}

impl AllyState {
    /// Unit id as a string key (numbers are rendered without quotes)
    pub fn id_key(&self) -> Option<String> {
        match self.id.as_ref()? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.hp.unwrap_or(0.0) > 0.0
    }
}

/// Final state of one enemy unit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyState {
    pub id: Option<serde_json::Value>,
    pub name: Option<String>,
    pub hp: Option<f64>,
    #[serde(rename = "maxHp", alias = "max_hp")]
    pub max_hp: Option<f64>,
}

impl EnemyState {
    pub fn is_killed(&self) -> bool {
        self.hp.unwrap_or(0.0) <= 0.0
    }
}

/// Initial position override for one unit
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionOverride {
    pub x: f64,
    pub y: f64,
}
