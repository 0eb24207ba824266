//! StrataCache maintenance CLI
//!
//! Operational companion to the engine library: probe tier backends, print
//! performance and size snapshots, and flush a tier. The cache-facing
//! applications construct the engine through the library API; this binary
//! only covers maintenance tasks.

use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use stratacache::{CacheEngine, EngineConfig};
use stratacache::error::Result;

// =============================================================================
// CLI Arguments
// =============================================================================

/// StrataCache - maintenance tool for the tiered cache
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a YAML engine configuration file
    #[arg(long, env = "STRATACACHE_CONFIG")]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Probe every tier backend and report availability
    Probe,
    /// Print the hit-rate snapshot as JSON
    Stats,
    /// Print per-tier key counts and memory usage as JSON
    Sizes,
    /// Wipe one tier's backend (irreversible)
    Flush {
        /// Tier name: hot, predictive, warm, or cold
        #[arg(long)]
        tier: String,
    },
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args);

    let config = match &args.config {
        Some(path) => EngineConfig::from_yaml_file(path)?,
        None => EngineConfig::default(),
    };

    info!("Starting StrataCache maintenance tool");

    let engine = CacheEngine::connect(config).await?;

    match args.command {
        Command::Probe => {
            let available = engine.available_tiers();
            for spec in engine.registry().by_priority() {
                let state = if available.contains(&spec.tier) {
                    "available"
                } else {
                    "degraded"
                };
                println!(
                    "{:<12} priority={:<4} ttl={}s  {}",
                    spec.tier,
                    spec.priority,
                    spec.ttl.as_secs(),
                    state
                );
            }
        }
        Command::Stats => {
            let stats = engine.performance_stats();
            println!("{}", serde_json::to_string_pretty(&stats).expect("stats serialize"));
        }
        Command::Sizes => {
            let stats = engine.size_stats().await;
            println!("{}", serde_json::to_string_pretty(&stats).expect("stats serialize"));
        }
        Command::Flush { tier } => {
            let tier = engine.registry().resolve(&tier)?;
            if engine.flush_tier(tier).await {
                info!(%tier, "flush complete");
            } else {
                info!(%tier, "flush failed or tier degraded");
            }
        }
    }

    Ok(())
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}
