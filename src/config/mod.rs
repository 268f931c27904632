//! Configuration Module
//!
//! Loads `AppConfig` from TOML, replacing hardcoded flywheel and advisor
//! constants with operator-tunable values.
//!
//! ## Loading Order
//!
//! 1. `BATTLEBOTTLE_CONFIG` environment variable (path to TOML file)
//! 2. `battlebottle.toml` in the current working directory
//! 3. Built-in defaults (see [`defaults`])

mod app_config;
pub mod defaults;
pub mod validation;

pub use app_config::*;
