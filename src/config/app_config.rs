//! Application configuration: every tunable of the flywheel as a TOML value
//!
//! Each struct implements `Default` with the values from [`super::defaults`],
//! so a missing file or a partial file behaves exactly like the built-ins.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use super::defaults;

/// Environment variable pointing at a config file
pub const CONFIG_ENV: &str = "BATTLEBOTTLE_CONFIG";

/// Config file looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "battlebottle.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration.
///
/// Load with `AppConfig::load()` which searches:
/// 1. `$BATTLEBOTTLE_CONFIG`
/// 2. `./battlebottle.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    /// Aggregation and ranking parameters
    #[serde(default)]
    pub flywheel: FlywheelConfig,

    /// Optional natural-language enrichment
    #[serde(default)]
    pub advisor: AdvisorConfig,
}

impl AppConfig {
    /// Load configuration using the standard search order.
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded config from {}", CONFIG_ENV);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config, falling back");
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", CONFIG_ENV);
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded config from ./{}", LOCAL_CONFIG_FILE);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", LOCAL_CONFIG_FILE);
                }
            }
        }

        info!("No config file found, using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, err) => ConfigError::Parse(path.to_path_buf(), err),
            other => other,
        })
    }

    /// Parse and validate TOML text. Unknown keys only produce warnings.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Check every section, collecting all problems before failing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.server.addr.trim().is_empty() {
            errors.push("server.addr must not be empty".to_string());
        }
        if self.storage.data_dir.as_os_str().is_empty() {
            errors.push("storage.data_dir must not be empty".to_string());
        }

        let fw = &self.flywheel;
        if fw.recompute_window == 0 {
            errors.push("flywheel.recompute_window must be > 0".to_string());
        }
        if fw.min_samples == 0 {
            errors.push("flywheel.min_samples must be > 0".to_string());
        }
        if fw.top_patterns == 0 {
            errors.push("flywheel.top_patterns must be > 0".to_string());
        }
        if fw.min_recon + fw.min_attack > fw.squad_size {
            errors.push(format!(
                "flywheel.squad_size ({}) must fit min_recon ({}) + min_attack ({})",
                fw.squad_size, fw.min_recon, fw.min_attack
            ));
        }
        if fw.confidence_step == 0 {
            errors.push("flywheel.confidence_step must be > 0".to_string());
        }

        let adv = &self.advisor;
        if adv.timeout_secs == 0 || adv.timeout_secs > defaults::ADVISOR_TIMEOUT_SECS {
            errors.push(format!(
                "advisor.timeout_secs ({}) must be within 1..={}",
                adv.timeout_secs,
                defaults::ADVISOR_TIMEOUT_SECS
            ));
        }
        if !(0.0..=2.0).contains(&adv.temperature) {
            errors.push(format!(
                "advisor.temperature ({}) must be within 0.0..=2.0",
                adv.temperature
            ));
        }
        if adv.enabled && adv.api_url.trim().is_empty() {
            errors.push("advisor.api_url must be set when the advisor is enabled".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config I/O error ({p}): {e}", p = .0.display(), e = .1)]
    Io(PathBuf, std::io::Error),
    #[error("Config parse error ({p}): {e}", p = .0.display(), e = .1)]
    Parse(PathBuf, toml::de::Error),
    #[error("Config serialization error: {0}")]
    Serialize(toml::ser::Error),
    #[error("Config validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
}

// ============================================================================
// Sections
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
    /// Allowed CORS origins. Empty allows any origin.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: defaults::SERVER_ADDR.to_string(),
            cors_origins: Vec::new(),
        }
    }
}

/// Which `BattleStore` implementation backs the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Sled,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Sled,
            data_dir: PathBuf::from(defaults::DATA_DIR),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlywheelConfig {
    pub recompute_window: usize,
    pub min_samples: u32,
    pub top_patterns: usize,
    pub top_units: usize,
    pub squad_size: u32,
    pub min_recon: u32,
    pub min_attack: u32,
    pub confidence_step: u32,
}

impl Default for FlywheelConfig {
    fn default() -> Self {
        Self {
            recompute_window: defaults::RECOMPUTE_WINDOW,
            min_samples: defaults::MIN_PATTERN_SAMPLES,
            top_patterns: defaults::TOP_PATTERNS,
            top_units: defaults::TOP_UNITS,
            squad_size: defaults::SQUAD_SIZE,
            min_recon: defaults::MIN_RECON,
            min_attack: defaults::MIN_ATTACK,
            confidence_step: defaults::CONFIDENCE_STEP,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisorConfig {
    pub enabled: bool,
    pub api_url: String,
    pub model: String,
    /// Name of the environment variable that holds the API key
    pub api_key_env: String,
    pub max_tokens: u32,
    pub debrief_max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
    /// Attach an advisor debrief to every submit response
    pub debrief_on_submit: bool,
}

impl AdvisorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.min(defaults::ADVISOR_TIMEOUT_SECS))
    }

    /// API key from the configured environment variable, if set and non-empty
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_url: defaults::ADVISOR_API_URL.to_string(),
            model: defaults::ADVISOR_MODEL.to_string(),
            api_key_env: defaults::ADVISOR_API_KEY_ENV.to_string(),
            max_tokens: defaults::ADVISOR_MAX_TOKENS,
            debrief_max_tokens: defaults::ADVISOR_DEBRIEF_MAX_TOKENS,
            temperature: defaults::ADVISOR_TEMPERATURE,
            timeout_secs: defaults::ADVISOR_TIMEOUT_SECS,
            debrief_on_submit: true,
        }
    }
}
