//! VERIFICATION_JOB - accept an open job with a stake lock

use super::{build_event, ExecCtx};
use crate::ids;
use civicforge_types::{
    Blueprint, ExecutionError, JobAcceptPayload, JobStatus, LedgerEvent, LedgerEventType, Result,
};

pub(crate) fn execute_job_accept(ctx: &mut ExecCtx, envelope: &Blueprint) -> Result<LedgerEvent> {
    let payload: JobAcceptPayload = envelope.typed_payload()?;
    let verifier_id = envelope.proposer_id.as_str();

    let job = ctx
        .state
        .get_job(&payload.job_id)
        .ok_or_else(|| ExecutionError::JobNotFound {
            job_id: payload.job_id.clone(),
        })?
        .clone();

    if job.status != JobStatus::Open {
        return Err(ExecutionError::JobNotOpen { job_id: job.id }.into());
    }

    let ineligible = || ExecutionError::VerifierIneligible {
        job_id: job.id.clone(),
        verifier_id: verifier_id.into(),
    };

    if !job.open_to_pool {
        return Err(ineligible().into());
    }
    if !job.eligible_verifiers.is_empty()
        && !job.eligible_verifiers.iter().any(|v| v == verifier_id)
    {
        return Err(ineligible().into());
    }

    // conflict rules ride on the contract the submission points at
    if let Some(submission) = ctx.state.get_submission(&job.submission_id) {
        let rules = ctx
            .state
            .get_contract(&submission.contract_id)
            .map(|c| c.verification_plan.conflict_rules.clone())
            .unwrap_or_default();

        if rules.forbid_proposer && submission.proposer_id == verifier_id {
            return Err(ineligible().into());
        }
        if rules.forbid_repeat_verifier {
            let repeat = ctx
                .state
                .jobs_by_submission(&job.submission_id)
                .iter()
                .any(|j| j.id != job.id && j.assigned_to.as_deref() == Some(verifier_id));
            if repeat {
                return Err(ineligible().into());
            }
        }
    }

    if payload.stake_cc_locked < job.stake_required_cc {
        return Err(ExecutionError::StakeTooSmall {
            job_id: job.id,
            required: job.stake_required_cc,
            offered: payload.stake_cc_locked,
        }
        .into());
    }

    let meta = ctx.ledger.next_meta();
    let event_id = ids::event_id(&meta, &envelope.id, &envelope.kind, &envelope.proposer_id)?;

    let mut event = build_event(
        event_id,
        meta,
        ctx.now,
        LedgerEventType::StakeLock,
        verifier_id,
        Some(&envelope.id),
    );

    event.cc_changes.extend(ctx.state.lock_stake(
        &job.id,
        verifier_id,
        payload.stake_cc_locked,
        ctx.now,
    )?);

    let job = ctx.state.get_job_mut(&payload.job_id).expect("job fetched above");
    job.status = JobStatus::Assigned;
    job.assigned_to = Some(verifier_id.into());

    ctx.ledger.seal_and_append(event)
}
