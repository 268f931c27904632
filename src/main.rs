//! BattleBottle - battle telemetry data flywheel
//!
//! Records completed battle simulations and serves tactical
//! recommendations learned from them.
//!
//! # Usage
//!
//! ```bash
//! # Run the HTTP service (default)
//! battlebottle serve --addr 0.0.0.0:5000
//!
//! # Print global stats as JSON
//! battlebottle stats
//!
//! # Rebuild aggregates and patterns from battle history
//! battlebottle rebuild
//! ```
//!
//! # Environment Variables
//!
//! - `BATTLEBOTTLE_CONFIG`: Path to a TOML config file
//! - `BATTLEBOTTLE_ADDR`: HTTP bind address
//! - `BATTLEBOTTLE_DATA_DIR`: Data directory for the sled database
//! - `FIREWORKS_API_KEY`: Advisor API key (enrichment is off without it)
//! - `RUST_LOG`: Logging level (default: info)
//! - `RESET_DB`: Set to "true" to wipe all persistent data on startup

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use battlebottle::advisor::{DisabledAdvisor, HttpAdvisor, TacticalAdvisor};
use battlebottle::api::{create_app, ApiState};
use battlebottle::config::{AppConfig, StorageBackend};
use battlebottle::storage::{BattleStore, InMemoryStore, SledStore};
use battlebottle::Flywheel;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "battlebottle")]
#[command(about = "BattleBottle battle telemetry flywheel")]
#[command(version)]
struct CliArgs {
    /// HTTP bind address (overrides config)
    #[arg(long, value_name = "HOST:PORT", env = "BATTLEBOTTLE_ADDR")]
    addr: Option<String>,

    /// Data directory for the battle database (overrides config)
    #[arg(long, value_name = "DIR", env = "BATTLEBOTTLE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Wipe all persistent data before starting.
    /// Can also be set via RESET_DB=true environment variable.
    #[arg(long)]
    reset_db: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<SubCommand>,
}

#[derive(clap::Subcommand, Debug)]
enum SubCommand {
    /// Run the HTTP service (default)
    Serve,
    /// Print global and per-scenario stats as JSON
    Stats,
    /// Rebuild scenario aggregates and patterns from battle history
    Rebuild,
}

/// File name of the sled database inside the data directory
const DB_FILE: &str = "battles.db";

// ============================================================================
// Startup Helpers
// ============================================================================

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}

/// Check if database reset is requested via CLI flag or environment variable.
fn should_reset_db(cli_flag: bool) -> bool {
    if cli_flag {
        return true;
    }
    if let Ok(val) = std::env::var("RESET_DB") {
        let val_lower = val.to_lowercase();
        return val_lower == "true" || val_lower == "1" || val_lower == "yes";
    }
    false
}

/// Remove the data directory and all its contents.
fn reset_data_directory(data_path: &Path) -> Result<()> {
    if !data_path.exists() {
        info!("Data directory does not exist, nothing to reset");
        return Ok(());
    }

    warn!(path = %data_path.display(), "RESET_DB detected, wiping all persistent data");
    std::fs::remove_dir_all(data_path).context("Failed to remove data directory")?;
    warn!("Data directory removed; a fresh database will be created");
    Ok(())
}

/// Open the configured store. The sled handle is returned separately so it
/// can be flushed on shutdown.
fn open_store(config: &AppConfig) -> Result<(Arc<dyn BattleStore>, Option<SledStore>)> {
    match config.storage.backend {
        StorageBackend::Memory => {
            warn!("Using in-memory storage: battle history is lost on exit");
            let store: Arc<dyn BattleStore> = Arc::new(InMemoryStore::new());
            Ok((store, None))
        }
        StorageBackend::Sled => {
            let dir = &config.storage.data_dir;
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create data directory {}", dir.display()))?;
            let store = SledStore::open(dir.join(DB_FILE)).context("Failed to open battle store")?;
            info!(size_bytes = store.size_bytes(), "Sled store ready");
            let shared: Arc<dyn BattleStore> = Arc::new(store.clone());
            Ok((shared, Some(store)))
        }
    }
}

fn build_advisor(config: &AppConfig) -> Result<Arc<dyn TacticalAdvisor>> {
    if !config.advisor.enabled {
        info!("Tactical advisor disabled by config");
        return Ok(Arc::new(DisabledAdvisor));
    }
    let advisor = HttpAdvisor::from_config(&config.advisor).context("Failed to build advisor client")?;
    Ok(Arc::new(advisor))
}

// ============================================================================
// Commands
// ============================================================================

async fn run_server(flywheel: Flywheel, config: &AppConfig) -> Result<()> {
    let addr = config.server.addr.clone();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    let app = create_app(ApiState::new(flywheel), &config.server.cors_origins);

    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received Ctrl+C, initiating shutdown...");
        shutdown_token.cancel();
    });

    info!(addr = %addr, "HTTP server listening");
    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            cancel_token.cancelled().await;
            info!("[HttpServer] Received shutdown signal");
        })
        .await;

    match result {
        Ok(()) => {
            info!("[HttpServer] Graceful shutdown complete");
            Ok(())
        }
        Err(e) => {
            error!("[HttpServer] Server error: {}", e);
            Err(anyhow::anyhow!("HTTP server error: {}", e))
        }
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(args.log_json);

    let mut config = AppConfig::load();
    if let Some(addr) = args.addr {
        config.server.addr = addr;
    }
    if let Some(dir) = args.data_dir {
        config.storage.data_dir = dir;
    }
    config.validate().context("Invalid configuration")?;

    // Reset DB check, before any storage initialization
    if should_reset_db(args.reset_db) {
        reset_data_directory(&config.storage.data_dir)?;
    }

    let (store, sled) = open_store(&config)?;
    let advisor = build_advisor(&config)?;
    let flywheel = Flywheel::new(store, advisor, &config);

    let outcome = match args.command.unwrap_or(SubCommand::Serve) {
        SubCommand::Serve => {
            info!(
                backend = flywheel.store().backend_name(),
                ai_enabled = flywheel.advisor_enabled(),
                "BattleBottle flywheel starting"
            );
            run_server(flywheel, &config).await
        }
        SubCommand::Stats => {
            let stats = flywheel.stats().context("Failed to read stats")?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
            Ok(())
        }
        SubCommand::Rebuild => {
            let report = flywheel.rebuild().context("Rebuild failed")?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
    };

    if let Some(store) = sled {
        if let Err(e) = store.flush() {
            warn!(error = %e, "Failed to flush battle store");
        }
    }

    outcome
}
