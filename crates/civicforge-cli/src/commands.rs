//! Subcommand implementations

use crate::{display, flows};
use anyhow::{Context, Result};
use civicforge_kernel::RuntimeConfig;
use civicforge_store::CheckpointStore;
use civicforge_types::Blueprint;
use colored::Colorize;
use std::path::Path;

pub fn apply(store_path: &Path, config: RuntimeConfig, file: &Path) -> Result<()> {
    let bytes = std::fs::read(file)
        .with_context(|| format!("reading envelope file {}", file.display()))?;
    let envelope: Blueprint =
        serde_json::from_slice(&bytes).context("parsing blueprint envelope")?;

    let store = CheckpointStore::new(store_path);
    let mut runtime = store.load_or_new(config)?;

    let event = runtime
        .execute(&envelope)
        .with_context(|| format!("executing {} {}", envelope.kind, envelope.id))?;

    store.save(&runtime)?;
    println!("{} {}", "committed".green().bold(), envelope.id);
    display::print_event(&event);
    Ok(())
}

pub fn ledger(store_path: &Path, config: RuntimeConfig) -> Result<()> {
    let store = CheckpointStore::new(store_path);
    let runtime = store.load_or_new(config)?;

    for event in runtime.ledger().events() {
        display::print_event(event);
    }

    let report = runtime.verify_integrity();
    if report.ok {
        println!(
            "{} {} events, chain intact",
            "ok".green().bold(),
            runtime.ledger().len()
        );
        Ok(())
    } else {
        for error in &report.errors {
            eprintln!("{} {error}", "chain".red().bold());
        }
        anyhow::bail!("ledger integrity check failed");
    }
}

pub fn state(store_path: &Path, config: RuntimeConfig) -> Result<()> {
    let store = CheckpointStore::new(store_path);
    let runtime = store.load_or_new(config)?;
    display::print_state_summary(runtime.state());
    Ok(())
}

pub fn maintain(store_path: &Path, config: RuntimeConfig) -> Result<()> {
    let store = CheckpointStore::new(store_path);
    let mut runtime = store.load_or_new(config)?;

    let report = runtime.maintain()?;
    store.save(&runtime)?;

    println!(
        "{} {} escalated, {} expired, {} stakes released",
        "maintenance".bold(),
        report.escalated_jobs.len(),
        report.expired_jobs.len(),
        report.stake_releases.len()
    );
    for event in &report.events {
        display::print_event(event);
    }
    Ok(())
}

/// Run the S1 happy path against the given store
pub fn demo(store_path: &Path) -> Result<()> {
    use civicforge_types::{Cc, StampDecision, TREASURY};

    let (mut runtime, _clock) = flows::scripted_runtime(None);

    println!("{}", "seeding settlers".bold());
    runtime.seed_account("sponsor", "sponsor", Cc::new(300))?;
    runtime.seed_account("author", "author", Cc::new(0))?;
    for v in ["vera", "victor", "vance"] {
        runtime.seed_account(v, v, Cc::new(20))?;
    }

    println!("{}", "posting quest (escrow 110 CC, 10% admin)".bold());
    runtime.execute(&flows::quest_contract("quest-1", "sponsor", None))?;

    println!("{}", "author submits work".bold());
    runtime.execute(&flows::work_submission("sub-1", "author", "quest-1"))?;

    for (seq, (role, verifier, stake)) in [
        ("QUALITY", "vera", 5),
        ("EVIDENCE", "victor", 5),
        ("SAFETY", "vance", 10),
    ]
    .into_iter()
    .enumerate()
    {
        println!("{}", format!("{verifier} verifies {role}").bold());
        let job_id = flows::open_job(&runtime, "sub-1", role)
            .with_context(|| format!("no open {role} job"))?;
        runtime.execute(&flows::job_accept(
            &format!("bp-accept-{seq}"),
            verifier,
            &job_id,
            stake,
        ))?;
        runtime.execute(&flows::stamp(
            &format!("bp-stamp-{seq}"),
            verifier,
            &job_id,
            StampDecision::Pass,
        ))?;
    }

    println!();
    display::print_state_summary(runtime.state());
    println!(
        "\n{} author IRON tokens: {}, treasury: {}",
        "result".green().bold(),
        runtime
            .state()
            .tokens_by_owner("author")
            .iter()
            .filter(|t| t.is_active())
            .count(),
        runtime.state().account_balance(TREASURY)
    );

    CheckpointStore::new(store_path).save(&runtime)?;
    println!("saved to {}", store_path.display());
    Ok(())
}

/// Run every scripted scenario; non-zero exit on the first divergence
pub fn tests() -> Result<()> {
    let mut failed = 0usize;
    for (name, scenario) in flows::scenarios() {
        match scenario() {
            Ok(()) => println!("{} {name}", "pass".green().bold()),
            Err(error) => {
                failed += 1;
                println!("{} {name}: {error:#}", "FAIL".red().bold());
            }
        }
    }
    if failed > 0 {
        anyhow::bail!("{failed} scenario(s) failed");
    }
    Ok(())
}
