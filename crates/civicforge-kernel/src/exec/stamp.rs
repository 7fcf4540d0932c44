//! VERIFICATION_STAMP - record a verifier's decision and settle it
//!
//! Whatever the decision, the stamp completes the job, releases the
//! verifier's stake, and pays the verifier (escrow for primary roles,
//! TREASURY for audits, gated by the weekly budget). The decision then
//! drives the submission state machine: PASS may trigger audit sampling
//! or mint rewards, FAIL rejects the submission, ABSTAIN requeues the
//! role.

use super::{build_event, reject_submission, requirements_satisfied, ExecCtx};
use crate::ids;
use chrono::Duration;
use civicforge_types::{
    escrow_account_id, reason, stake_id, Blueprint, Cc, CcChange, Contract, ExecutionError,
    JobStatus, LedgerEvent, LedgerEventType, MintTarget, Result, Stamp, StampDecision,
    StampPayload, SubmissionStatus, Token, TokenStatus, VerificationJob, AUDIT_ROLE, TREASURY,
};

/// Minutes an audit job stays open
const AUDIT_TIMEOUT_MINUTES: i64 = 240;

pub(crate) fn execute_stamp(ctx: &mut ExecCtx, envelope: &Blueprint) -> Result<LedgerEvent> {
    let payload: StampPayload = envelope.typed_payload()?;
    let verifier_id = envelope.proposer_id.clone();

    let job = ctx
        .state
        .get_job(&payload.job_id)
        .ok_or_else(|| ExecutionError::JobNotFound {
            job_id: payload.job_id.clone(),
        })?
        .clone();

    if job.status != JobStatus::Assigned || job.assigned_to.as_deref() != Some(&verifier_id) {
        return Err(ExecutionError::JobNotAssignedTo {
            job_id: job.id,
            verifier_id,
        }
        .into());
    }

    let stake_key = stake_id(&job.id, &verifier_id);
    let stake = ctx
        .state
        .get_stake(&stake_key)
        .ok_or_else(|| ExecutionError::StakeNotFound {
            stake_id: stake_key.clone(),
        })?
        .clone();
    if !stake.is_locked() {
        return Err(ExecutionError::StakeNotLocked {
            stake_id: stake_key,
        }
        .into());
    }
    if stake.balance_cc < job.stake_required_cc {
        return Err(ExecutionError::StakeTooSmall {
            job_id: job.id,
            required: job.stake_required_cc,
            offered: stake.balance_cc,
        }
        .into());
    }

    let submission = ctx
        .state
        .get_submission(&job.submission_id)
        .ok_or_else(|| ExecutionError::SubmissionNotFound {
            submission_id: job.submission_id.clone(),
        })?
        .clone();
    if submission.status.is_terminal() {
        return Err(ExecutionError::SubmissionTerminal {
            submission_id: submission.id,
            status: submission.status.as_str().into(),
        }
        .into());
    }

    let contract = ctx
        .state
        .get_contract(&submission.contract_id)
        .ok_or_else(|| ExecutionError::ContractNotFound {
            contract_id: submission.contract_id.clone(),
        })?
        .clone();

    let meta = ctx.ledger.next_meta();
    let event_id = ids::event_id(&meta, &envelope.id, &envelope.kind, &envelope.proposer_id)?;
    let stamp_id = ids::stamp_id(&event_id, &job.id)?;

    ctx.state.add_stamp(Stamp {
        id: stamp_id.clone(),
        job_id: job.id.clone(),
        submission_id: submission.id.clone(),
        verifier_id: verifier_id.clone(),
        role: job.stamp_role.clone(),
        decision: payload.decision,
        notes: payload.notes.clone(),
        artifacts: payload.artifacts.clone(),
        stake_cc_locked: stake.balance_cc,
        created_at: ctx.now,
    })?;

    {
        let job_record = ctx.state.get_job_mut(&job.id).expect("job fetched above");
        job_record.status = JobStatus::Completed;
        job_record.stamp_id = Some(stamp_id.clone());
    }
    {
        let submission_record = ctx
            .state
            .get_submission_mut(&submission.id)
            .expect("submission fetched above");
        submission_record.stamp_ids.push(stamp_id.clone());
        submission_record.updated_at = ctx.now;
    }

    let mut changes: Vec<CcChange> = Vec::new();
    changes.extend(ctx.state.release_stake(&stake_key, ctx.now)?);
    pay_verifier(ctx, &job, &contract, &verifier_id, &mut changes)?;

    let mut minted: Vec<String> = Vec::new();
    match payload.decision {
        StampDecision::Pass => {
            let submission = ctx
                .state
                .get_submission(&job.submission_id)
                .expect("submission fetched above")
                .clone();
            let satisfied = requirements_satisfied(ctx.state, &submission, &contract);

            if job.is_audit() {
                if satisfied {
                    minted = mint_rewards(ctx, &contract, &submission.id, &event_id)?;
                }
            } else if submission.status == SubmissionStatus::Submitted && satisfied {
                if audit_triggered(&contract, &submission.id)? {
                    open_audit_job(ctx, &contract, &submission.id)?;
                    let record = ctx
                        .state
                        .get_submission_mut(&submission.id)
                        .expect("submission fetched above");
                    record.status = SubmissionStatus::PendingAudit;
                    record.updated_at = ctx.now;
                } else {
                    minted = mint_rewards(ctx, &contract, &submission.id, &event_id)?;
                }
            }
        }
        StampDecision::Fail => {
            reject_submission(ctx, &submission.id, &mut changes)?;
        }
        StampDecision::Abstain => {
            requeue_role(ctx, &contract, &job)?;
        }
    }

    let event_type = if minted.is_empty() {
        LedgerEventType::BlueprintExec
    } else {
        LedgerEventType::Mint
    };
    let mut event = build_event(
        event_id,
        meta,
        ctx.now,
        event_type,
        &verifier_id,
        Some(&envelope.id),
    );
    event.tokens_minted = minted;
    event.cc_changes = changes;
    ctx.ledger.seal_and_append(event)
}

/// Stake released, now the pay: escrow for primary roles (admin fee
/// first), TREASURY for audits (budget-gated, no admin fee)
fn pay_verifier(
    ctx: &mut ExecCtx,
    job: &VerificationJob,
    contract: &Contract,
    verifier_id: &str,
    changes: &mut Vec<CcChange>,
) -> Result<()> {
    let pay = job.current_pay_cc;
    if job.is_audit() {
        if pay.is_positive() {
            ctx.budget.assert_can_spend(pay, ctx.now, ctx.ledger)?;
            changes.extend(ctx.state.transfer_cc(
                TREASURY,
                verifier_id,
                pay,
                ctx.now,
                reason::AUDIT_PAY,
                true,
            )?);
        }
        return Ok(());
    }

    let admin_fee = pay
        .checked_mul_rate(contract.funding.fees.admin_percent)
        .ok_or(ExecutionError::AmountOverflow)?;
    if admin_fee.is_positive() {
        changes.extend(ctx.state.release_escrow(
            &contract.id,
            TREASURY,
            admin_fee,
            ctx.now,
            reason::ADMIN_FEE,
        )?);
    }
    if pay.is_positive() {
        changes.extend(ctx.state.release_escrow(
            &contract.id,
            verifier_id,
            pay,
            ctx.now,
            reason::VERIFIER_PAY,
        )?);
    }
    Ok(())
}

/// Whether the sampling draw lands below the configured rate
fn audit_triggered(contract: &Contract, submission_id: &str) -> Result<bool> {
    let Some(audit) = &contract.verification_plan.sampling_audit else {
        return Ok(false);
    };
    if !audit.enabled {
        return Ok(false);
    }
    let draw = ids::audit_draw(submission_id, audit.rate)?;
    Ok(draw < audit.rate)
}

fn open_audit_job(ctx: &mut ExecCtx, contract: &Contract, submission_id: &str) -> Result<()> {
    let audit = contract
        .verification_plan
        .sampling_audit
        .as_ref()
        .expect("caller checked sampling_audit");
    let index = ctx
        .state
        .jobs_by_submission(submission_id)
        .iter()
        .filter(|j| j.is_audit())
        .count() as u32;
    let job_id = ids::job_id(submission_id, AUDIT_ROLE, index, ctx.now)?;

    ctx.state.add_job(VerificationJob {
        id: job_id,
        submission_id: submission_id.into(),
        stamp_role: AUDIT_ROLE.into(),
        open_to_pool: true,
        eligible_verifiers: vec![],
        base_pay_cc: audit.audit_pay_cc,
        current_pay_cc: audit.audit_pay_cc,
        stake_required_cc: Cc::zero(),
        created_at: ctx.now,
        deadline_at: ctx.now + Duration::minutes(AUDIT_TIMEOUT_MINUTES),
        escalation_history: vec![],
        status: JobStatus::Open,
        assigned_to: None,
        stamp_id: None,
    })
}

/// ABSTAIN leaves the role short a verdict; open a fresh job for it
fn requeue_role(ctx: &mut ExecCtx, contract: &Contract, completed: &VerificationJob) -> Result<()> {
    let timeout = contract
        .verification_plan
        .requirement(&completed.stamp_role)
        .map(|r| r.timeout_minutes)
        .unwrap_or(AUDIT_TIMEOUT_MINUTES);
    let index = ctx
        .state
        .jobs_by_submission(&completed.submission_id)
        .iter()
        .filter(|j| j.stamp_role == completed.stamp_role)
        .count() as u32;
    let job_id = ids::job_id(&completed.submission_id, &completed.stamp_role, index, ctx.now)?;

    ctx.state.add_job(VerificationJob {
        id: job_id,
        submission_id: completed.submission_id.clone(),
        stamp_role: completed.stamp_role.clone(),
        open_to_pool: true,
        eligible_verifiers: vec![],
        base_pay_cc: completed.base_pay_cc,
        current_pay_cc: completed.base_pay_cc,
        stake_required_cc: completed.stake_required_cc,
        created_at: ctx.now,
        deadline_at: ctx.now + Duration::minutes(timeout),
        escalation_history: vec![],
        status: JobStatus::Open,
        assigned_to: None,
        stamp_id: None,
    })
}

/// Mint the contract's rewards for a verified submission
///
/// Rewards whose token type is outside the author's `requested_mint`
/// (when constrained) are skipped. Token provenance: `proof_refs` are the
/// submission's artifact hashes, `stamp_ids` its passing stamps in
/// stamping order.
fn mint_rewards(
    ctx: &mut ExecCtx,
    contract: &Contract,
    submission_id: &str,
    event_id: &str,
) -> Result<Vec<String>> {
    let submission = ctx
        .state
        .get_submission(submission_id)
        .ok_or_else(|| ExecutionError::SubmissionNotFound {
            submission_id: submission_id.into(),
        })?
        .clone();

    let mut minted = Vec::new();
    if !submission.minted {
        let proof_refs = submission.artifact_hashes();
        let passing_stamps: Vec<String> = submission
            .stamp_ids
            .iter()
            .filter(|id| {
                ctx.state
                    .get_stamp(id)
                    .map(|s| s.decision == StampDecision::Pass)
                    .unwrap_or(false)
            })
            .cloned()
            .collect();

        let mut index = 0u32;
        for reward in &contract.payload.mint_rewards {
            let constrained = !submission.payload.requested_mint.is_empty();
            if constrained && !submission.payload.requested_mint.contains(&reward.token_type) {
                continue;
            }
            let owner_id = match reward.target {
                MintTarget::Author => submission.proposer_id.clone(),
                MintTarget::Sponsor => contract
                    .funding
                    .sponsor_id
                    .clone()
                    .unwrap_or_else(|| contract.proposer_id.clone()),
                MintTarget::Escrow => escrow_account_id(&contract.id),
            };
            for _ in 0..reward.amount {
                let token_id = ids::token_id(event_id, index, reward.token_type, &reward.template)?;
                ctx.state.add_token(Token {
                    id: token_id.clone(),
                    token_type: reward.token_type,
                    template: reward.template.clone(),
                    owner_id: owner_id.clone(),
                    status: TokenStatus::Active,
                    mint_event_id: event_id.into(),
                    proof_refs: proof_refs.clone(),
                    stamp_ids: passing_stamps.clone(),
                    spent_by_event_id: None,
                    created_at: ctx.now,
                    updated_at: ctx.now,
                })?;
                minted.push(token_id);
                index += 1;
            }
        }
    }

    let record = ctx
        .state
        .get_submission_mut(submission_id)
        .expect("submission fetched above");
    record.status = SubmissionStatus::Verified;
    record.minted = true;
    record.updated_at = ctx.now;
    Ok(minted)
}
