//! Maintenance sweep - escalation and deadline expiry
//!
//! Walks every non-terminal verification job at `now`:
//! - past its deadline: mark EXPIRED and release any locked stake,
//!   appending a STAKE_RELEASE event per release
//! - otherwise: apply every elapsed escalation step not yet recorded,
//!   raising `current_pay_cc` to `max(current, ceil(base * multiplier))`

use crate::ids;
use chrono::{DateTime, Duration, Utc};
use civicforge_ledger::Ledger;
use civicforge_state::State;
use civicforge_types::{
    stake_id, EscalationRecord, JobStatus, LedgerEvent, LedgerEventType, Result, StampRequirement,
    SYSTEM_ACTOR,
};
use serde::{Deserialize, Serialize};

/// What one sweep did
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaintenanceReport {
    pub escalated_jobs: Vec<String>,
    pub expired_jobs: Vec<String>,
    pub stake_releases: Vec<String>,
    pub events: Vec<LedgerEvent>,
}

pub(crate) fn run_maintenance(
    state: &mut State,
    ledger: &mut Ledger,
    now: DateTime<Utc>,
) -> Result<MaintenanceReport> {
    let mut report = MaintenanceReport::default();

    let live_jobs: Vec<String> = state
        .jobs
        .values()
        .filter(|j| !j.status.is_terminal())
        .map(|j| j.id.clone())
        .collect();

    for job_id in live_jobs {
        let job = state.get_job(&job_id).expect("job listed above").clone();

        if now > job.deadline_at {
            expire_job(state, ledger, now, &job_id, &mut report)?;
            continue;
        }

        let Some(requirement) = requirement_for(state, &job).cloned() else {
            continue;
        };

        let mut escalated = false;
        for step in &requirement.escalation {
            if now - job.created_at < Duration::minutes(step.after_minutes) {
                continue;
            }
            let record = state.get_job_mut(&job_id).expect("job listed above");
            if record.has_escalation(step.multiplier) {
                continue;
            }
            if let Some(candidate) = record.base_pay_cc.checked_mul_rate(step.multiplier) {
                record.current_pay_cc = record.current_pay_cc.max(candidate.ceil());
                record.escalation_history.push(EscalationRecord {
                    at: now,
                    multiplier: step.multiplier,
                });
                escalated = true;
            }
        }
        if escalated {
            tracing::debug!(job_id = %job_id, "escalated verification job pay");
            report.escalated_jobs.push(job_id);
        }
    }

    Ok(report)
}

fn expire_job(
    state: &mut State,
    ledger: &mut Ledger,
    now: DateTime<Utc>,
    job_id: &str,
    report: &mut MaintenanceReport,
) -> Result<()> {
    let assigned_to = {
        let job = state.get_job_mut(job_id).expect("job listed above");
        job.status = JobStatus::Expired;
        job.assigned_to.clone()
    };
    tracing::debug!(job_id = %job_id, "expired verification job");
    report.expired_jobs.push(job_id.into());

    let Some(verifier) = assigned_to else {
        return Ok(());
    };
    let stake_key = stake_id(job_id, &verifier);
    let locked = state
        .get_stake(&stake_key)
        .map(|s| s.is_locked())
        .unwrap_or(false);
    if !locked {
        return Ok(());
    }

    let changes = state.release_stake(&stake_key, now)?;
    report.stake_releases.push(stake_key);

    let meta = ledger.next_meta();
    let event_id = ids::system_event_id(&meta, "STAKE_RELEASE", job_id)?;
    let event = LedgerEvent {
        id: event_id,
        timestamp: now,
        event_type: LedgerEventType::StakeRelease,
        actor_id: SYSTEM_ACTOR.into(),
        blueprint_id: None,
        tokens_minted: vec![],
        tokens_burned: vec![],
        tokens_transferred: vec![],
        cc_changes: changes,
        prev_hash: meta.prev_hash,
        event_hash: String::new(),
    };
    report.events.push(ledger.seal_and_append(event)?);
    Ok(())
}

/// The requirement behind a job's role, via submission -> contract
fn requirement_for<'a>(
    state: &'a State,
    job: &civicforge_types::VerificationJob,
) -> Option<&'a StampRequirement> {
    let submission = state.get_submission(&job.submission_id)?;
    let contract = state.get_contract(&submission.contract_id)?;
    contract.verification_plan.requirement(&job.stamp_role)
}
