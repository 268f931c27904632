//! System-wide default constants.
//!
//! Centralises the numbers the flywheel and the advisor are tuned with.
//! Every value here is the built-in default of a field in [`super::AppConfig`].

// ============================================================================
// Server & Storage
// ============================================================================

/// Default HTTP bind address.
pub const SERVER_ADDR: &str = "0.0.0.0:5000";

/// Default data directory for the sled database.
pub const DATA_DIR: &str = "./data";

// ============================================================================
// Flywheel
// ============================================================================

/// Most recent battles per (map, enemy) considered by a pattern recompute.
pub const RECOMPUTE_WINDOW: usize = 100;

/// Minimum samples before a composition becomes a rankable pattern.
pub const MIN_PATTERN_SAMPLES: u32 = 3;

/// Patterns fetched for a recommendation.
pub const TOP_PATTERNS: usize = 5;

/// Units listed in a recommendation.
pub const TOP_UNITS: usize = 6;

/// Canonical squad size the recommended composition is normalised to.
pub const SQUAD_SIZE: u32 = 6;

/// Confidence points per observed simulation (saturates at 100).
pub const CONFIDENCE_STEP: u32 = 5;

/// Minimum recon units in a data-driven composition.
pub const MIN_RECON: u32 = 1;

/// Minimum attack units in a data-driven composition.
pub const MIN_ATTACK: u32 = 2;

/// Budget assumed when a recommendation query omits it.
pub const DEFAULT_QUERY_BUDGET: u64 = 2_000_000;

// ============================================================================
// Tactical Advisor
// ============================================================================

/// OpenAI-compatible chat completions endpoint.
pub const ADVISOR_API_URL: &str = "https://api.fireworks.ai/inference/v1/chat/completions";

/// Model requested from the advisor endpoint.
pub const ADVISOR_MODEL: &str = "accounts/fireworks/models/llama-v3p3-70b-instruct";

/// Environment variable holding the advisor API key.
pub const ADVISOR_API_KEY_ENV: &str = "FIREWORKS_API_KEY";

/// Token budget for recommendation enrichment.
pub const ADVISOR_MAX_TOKENS: u32 = 600;

/// Token budget for post-battle debriefs.
pub const ADVISOR_DEBRIEF_MAX_TOKENS: u32 = 400;

/// Sampling temperature.
pub const ADVISOR_TEMPERATURE: f32 = 0.7;

/// Request timeout (seconds). Also the hard ceiling accepted by validation.
pub const ADVISOR_TIMEOUT_SECS: u64 = 30;
