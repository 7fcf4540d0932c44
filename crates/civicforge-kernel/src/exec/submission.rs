//! WORK_SUBMISSION - submit work and open its verification jobs

use super::{build_event, ExecCtx};
use crate::ids;
use chrono::Duration;
use civicforge_types::{
    reason, Blueprint, ExecutionError, JobStatus, LedgerEvent, LedgerEventType, Result,
    Submission, SubmissionPayload, SubmissionStatus, VerificationJob, WorkSubmissionPayload,
};

pub(crate) fn execute_work_submission(
    ctx: &mut ExecCtx,
    envelope: &Blueprint,
) -> Result<LedgerEvent> {
    let payload: WorkSubmissionPayload = envelope.typed_payload()?;

    let contract = ctx
        .state
        .get_contract(&payload.contract_id)
        .ok_or_else(|| ExecutionError::ContractNotFound {
            contract_id: payload.contract_id.clone(),
        })?
        .clone();

    let escrow = ctx
        .state
        .get_escrow(&contract.id)
        .ok_or_else(|| ExecutionError::EscrowNotFound {
            escrow_id: contract.id.clone(),
        })?;
    if !escrow.is_open() {
        return Err(ExecutionError::EscrowClosed {
            escrow_id: contract.id.clone(),
        }
        .into());
    }

    let meta = ctx.ledger.next_meta();
    let event_id = ids::event_id(&meta, &envelope.id, &envelope.kind, &envelope.proposer_id)?;

    let submission = Submission {
        id: envelope.id.clone(),
        contract_id: contract.id.clone(),
        proposer_id: envelope.proposer_id.clone(),
        payload: SubmissionPayload {
            artifacts: payload.artifacts,
            claims: payload.claims,
            requested_mint: payload.requested_mint,
        },
        status: SubmissionStatus::Submitted,
        stamp_ids: vec![],
        minted: false,
        created_at: ctx.now,
        updated_at: ctx.now,
    };

    // one OPEN job per required unique stamp
    let mut jobs = Vec::new();
    for req in &contract.verification_plan.required_stamps {
        for index in 0..req.min_unique {
            let job_id = ids::job_id(&submission.id, &req.role, index, ctx.now)?;
            jobs.push(VerificationJob {
                id: job_id,
                submission_id: submission.id.clone(),
                stamp_role: req.role.clone(),
                open_to_pool: true,
                eligible_verifiers: vec![],
                base_pay_cc: req.pay_cc,
                current_pay_cc: req.pay_cc,
                stake_required_cc: req.stake_cc,
                created_at: ctx.now,
                deadline_at: ctx.now + Duration::minutes(req.timeout_minutes),
                escalation_history: vec![],
                status: JobStatus::Open,
                assigned_to: None,
                stamp_id: None,
            });
        }
    }

    let mut event = build_event(
        event_id,
        meta,
        ctx.now,
        LedgerEventType::BlueprintExec,
        &envelope.proposer_id,
        Some(&envelope.id),
    );

    let stipend = contract.payload.author_stipend_cc;
    if stipend.is_positive() {
        event.cc_changes.extend(ctx.state.release_escrow(
            &contract.id,
            &submission.proposer_id,
            stipend,
            ctx.now,
            reason::AUTHOR_STIPEND,
        )?);
    }

    ctx.state.add_submission(submission)?;
    for job in jobs {
        ctx.state.add_job(job)?;
    }

    ctx.ledger.seal_and_append(event)
}
