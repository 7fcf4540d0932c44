//! Terminal rendering helpers

use civicforge_state::State;
use civicforge_types::LedgerEvent;
use colored::Colorize;

pub fn print_event(event: &LedgerEvent) {
    println!(
        "{} {} {} {}",
        format!("#{}", short(&event.id)).dimmed(),
        format!("{:?}", event.event_type).cyan(),
        event.actor_id.bold(),
        event.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    );
    for change in &event.cc_changes {
        let rendered = format!("    {} {} ({})", change.account_id, change.delta, change.reason);
        if change.delta.is_negative() {
            println!("{}", rendered.red());
        } else {
            println!("{}", rendered.green());
        }
    }
    if !event.tokens_minted.is_empty() {
        println!("    {} {}", "minted:".green(), short_list(&event.tokens_minted));
    }
    if !event.tokens_burned.is_empty() {
        println!("    {} {}", "burned:".red(), short_list(&event.tokens_burned));
    }
}

pub fn print_state_summary(state: &State) {
    println!("{}", "accounts".bold());
    for account in state.accounts.values() {
        println!(
            "  {:<24} {:>12}  licenses={} incidents={}",
            account.id,
            account.cc_balance.to_string(),
            account.licenses.len(),
            account.incident_count
        );
    }

    println!(
        "{} {} active / {} total",
        "tokens".bold(),
        state.tokens.values().filter(|t| t.is_active()).count(),
        state.tokens.len()
    );
    println!(
        "{} {} open / {} total",
        "escrows".bold(),
        state.escrows.values().filter(|e| e.is_open()).count(),
        state.escrows.len()
    );
    println!(
        "{} {} locked / {} total",
        "stakes".bold(),
        state.stakes.values().filter(|s| s.is_locked()).count(),
        state.stakes.len()
    );
    println!(
        "{} {} live / {} total",
        "jobs".bold(),
        state.jobs.values().filter(|j| !j.status.is_terminal()).count(),
        state.jobs.len()
    );
    println!(
        "{} {} submissions, {} stamps, {} contracts, {} sanctions, {} appeals",
        "records".bold(),
        state.submissions.len(),
        state.stamps.len(),
        state.contracts.len(),
        state.sanctions.len(),
        state.appeals.len()
    );
}

fn short(id: &str) -> &str {
    &id[..id.len().min(12)]
}

fn short_list(ids: &[String]) -> String {
    ids.iter()
        .map(|id| short(id))
        .collect::<Vec<_>>()
        .join(", ")
}
