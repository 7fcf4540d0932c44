//! Executors - one per blueprint kind
//!
//! An executor mutates state, collects the envelope's CC changes in
//! insertion order, and appends exactly one sealed ledger event. The
//! kernel's snapshot makes the whole thing all-or-nothing; executors
//! just propagate errors.

mod craft;
mod job;
mod mint;
mod moderation;
mod quest;
mod stamp;
mod submission;

pub(crate) use craft::execute_craft;
pub(crate) use job::execute_job_accept;
pub(crate) use mint::execute_mint;
pub(crate) use moderation::{execute_appeal, execute_sanction};
pub(crate) use quest::execute_quest_contract;
pub(crate) use stamp::execute_stamp;
pub(crate) use submission::execute_work_submission;

use chrono::{DateTime, Utc};
use civicforge_ledger::Ledger;
use civicforge_policy::{PolicyEngine, TreasuryBudget};
use civicforge_state::State;
use civicforge_types::{
    CcChange, Contract, EventMeta, JobStatus, LedgerEvent, LedgerEventType, Result, StampDecision,
    Submission, SubmissionStatus,
};

/// Everything an executor may touch
pub(crate) struct ExecCtx<'a> {
    pub state: &'a mut State,
    pub ledger: &'a mut Ledger,
    pub policy: &'a PolicyEngine,
    pub budget: &'a TreasuryBudget,
    pub now: DateTime<Utc>,
}

/// An unsealed event; `seal_and_append` fills the hash
pub(crate) fn build_event(
    id: String,
    meta: EventMeta,
    now: DateTime<Utc>,
    event_type: LedgerEventType,
    actor_id: &str,
    blueprint_id: Option<&str>,
) -> LedgerEvent {
    LedgerEvent {
        id,
        timestamp: now,
        event_type,
        actor_id: actor_id.into(),
        blueprint_id: blueprint_id.map(Into::into),
        tokens_minted: vec![],
        tokens_burned: vec![],
        tokens_transferred: vec![],
        cc_changes: vec![],
        prev_hash: meta.prev_hash,
        event_hash: String::new(),
    }
}

/// Whether every stamp requirement has `min_unique` distinct-verifier
/// PASS stamps
pub(crate) fn requirements_satisfied(
    state: &State,
    submission: &Submission,
    contract: &Contract,
) -> bool {
    contract
        .verification_plan
        .required_stamps
        .iter()
        .all(|req| {
            let mut verifiers = std::collections::BTreeSet::new();
            for stamp in state.stamps_by_submission(&submission.id) {
                if stamp.role == req.role && stamp.decision == StampDecision::Pass {
                    verifiers.insert(stamp.verifier_id.as_str());
                }
            }
            verifiers.len() as u32 >= req.min_unique
        })
}

/// Reject a submission: expire its live jobs (releasing any locked
/// stakes), refund the remaining escrow to the sponsor, mark REJECTED.
///
/// Shared by FAIL stamps and SANCTION REJECT. CC changes append to
/// `changes` in the order they happen.
pub(crate) fn reject_submission(
    ctx: &mut ExecCtx,
    submission_id: &str,
    changes: &mut Vec<CcChange>,
) -> Result<()> {
    let job_ids: Vec<String> = ctx
        .state
        .jobs_by_submission(submission_id)
        .into_iter()
        .filter(|j| !j.status.is_terminal())
        .map(|j| j.id.clone())
        .collect();

    for job_id in job_ids {
        let assigned_to = {
            let job = ctx
                .state
                .get_job_mut(&job_id)
                .expect("job listed by submission");
            job.status = JobStatus::Expired;
            job.assigned_to.clone()
        };
        if let Some(verifier) = assigned_to {
            let stake_id = civicforge_types::stake_id(&job_id, &verifier);
            let locked = ctx
                .state
                .get_stake(&stake_id)
                .map(|s| s.is_locked())
                .unwrap_or(false);
            if locked {
                changes.extend(ctx.state.release_stake(&stake_id, ctx.now)?);
            }
        }
    }

    let submission = ctx
        .state
        .get_submission(submission_id)
        .ok_or_else(|| civicforge_types::ExecutionError::SubmissionNotFound {
            submission_id: submission_id.into(),
        })?;
    let contract_id = submission.contract_id.clone();

    let escrow_open = ctx
        .state
        .get_escrow(&contract_id)
        .map(|e| e.is_open())
        .unwrap_or(false);
    if escrow_open {
        let (_, refund) = ctx.state.refund_escrow(&contract_id, ctx.now)?;
        changes.extend(refund);
    }

    let submission = ctx
        .state
        .get_submission_mut(submission_id)
        .expect("submission presence checked");
    submission.status = SubmissionStatus::Rejected;
    submission.updated_at = ctx.now;
    Ok(())
}
