//! CivicForge CLI - a narrow facade around the deterministic runner
//!
//! ```bash
//! # execute a blueprint envelope from a file
//! civicforge --store civic.json apply blueprint.json
//!
//! # inspect the ledger and verify the hash chain
//! civicforge --store civic.json ledger
//!
//! # dump a state summary
//! civicforge --store civic.json state
//!
//! # run the escalation/expiry sweep
//! civicforge --store civic.json maintain
//!
//! # scripted flows
//! civicforge demo
//! civicforge tests
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod display;
mod flows;

use civicforge_kernel::RuntimeConfig;

/// CivicForge - deterministic civic-economy runner
#[derive(Parser)]
#[command(name = "civicforge")]
#[command(author = "CivicForge Contributors")]
#[command(version)]
#[command(about = "Signed blueprints in, hash-chained ledger events out", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Checkpoint file backing this invocation
    #[arg(long, global = true, default_value = "civicforge.json")]
    store: PathBuf,

    /// Optional runtime config file (JSON RuntimeConfig)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a blueprint envelope from a JSON file
    Apply {
        /// Path to the envelope file
        file: PathBuf,
    },

    /// Dump ledger events and verify chain integrity
    Ledger,

    /// Dump a state snapshot summary
    State,

    /// Run the escalation and deadline-expiry sweep
    Maintain,

    /// Run the scripted quest happy path against the store
    Demo,

    /// Run the scripted end-to-end flows and report pass/fail
    Tests,
}

fn load_config(path: &Option<PathBuf>) -> Result<RuntimeConfig> {
    match path {
        Some(path) => {
            let bytes = std::fs::read(path)?;
            Ok(serde_json::from_slice(&bytes)?)
        }
        None => Ok(RuntimeConfig::default()),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let result = (|| -> Result<()> {
        let config = load_config(&cli.config)?;
        match cli.command {
            Commands::Apply { file } => commands::apply(&cli.store, config, &file),
            Commands::Ledger => commands::ledger(&cli.store, config),
            Commands::State => commands::state(&cli.store, config),
            Commands::Maintain => commands::maintain(&cli.store, config),
            Commands::Demo => commands::demo(&cli.store),
            Commands::Tests => commands::tests(),
        }
    })();

    if let Err(error) = result {
        use colored::Colorize;
        eprintln!("{} {error:#}", "error:".red().bold());
        std::process::exit(1);
    }
}
