//! SANCTION and APPEAL - moderation flows

use super::{build_event, reject_submission, ExecCtx};
use crate::ids;
use civicforge_types::{
    Appeal, AppealPayload, AppealStatus, Blueprint, CcChange, ExecutionError, LedgerEvent,
    LedgerEventType, Result, Sanction, SanctionAction, SanctionPayload, SanctionStatus,
    TargetType, TREASURY,
};

pub(crate) fn execute_sanction(ctx: &mut ExecCtx, envelope: &Blueprint) -> Result<LedgerEvent> {
    let payload: SanctionPayload = envelope.typed_payload()?;

    let target_mismatch = || ExecutionError::InvalidSanctionTarget {
        action: payload.action.to_string(),
        target_type: payload.target_type.to_string(),
    };

    let mut changes: Vec<CcChange> = Vec::new();
    match payload.action {
        SanctionAction::Slash => {
            if payload.target_type != TargetType::Stake {
                return Err(target_mismatch().into());
            }
            let recipient = payload.recipient_id.as_deref().unwrap_or(TREASURY);
            let (_, slash_changes) =
                ctx.state
                    .slash_stake(&payload.target_id, payload.amount_cc, recipient, ctx.now)?;
            changes.extend(slash_changes);
        }
        SanctionAction::Reject => {
            if payload.target_type != TargetType::Submission {
                return Err(target_mismatch().into());
            }
            let submission = ctx
                .state
                .get_submission(&payload.target_id)
                .ok_or_else(|| ExecutionError::SubmissionNotFound {
                    submission_id: payload.target_id.clone(),
                })?;
            if submission.status.is_terminal() {
                return Err(ExecutionError::SubmissionTerminal {
                    submission_id: submission.id.clone(),
                    status: submission.status.as_str().into(),
                }
                .into());
            }
            reject_submission(ctx, &payload.target_id, &mut changes)?;
        }
        SanctionAction::Flag => {
            if payload.target_type != TargetType::Account {
                return Err(target_mismatch().into());
            }
            let account = ctx
                .state
                .get_account_mut(&payload.target_id)
                .ok_or_else(|| ExecutionError::AccountNotFound {
                    account_id: payload.target_id.clone(),
                })?;
            account.incident_count += 1;
            account.last_active_at = ctx.now;
        }
    }

    ctx.state.add_sanction(Sanction {
        id: envelope.id.clone(),
        action: payload.action,
        target_type: payload.target_type,
        target_id: payload.target_id.clone(),
        reason: payload.reason.clone(),
        amount_cc: payload.amount_cc,
        recipient_id: payload.recipient_id.clone(),
        status: SanctionStatus::Applied,
        created_at: ctx.now,
        updated_at: ctx.now,
    })?;

    let meta = ctx.ledger.next_meta();
    let event_id = ids::event_id(&meta, &envelope.id, &envelope.kind, &envelope.proposer_id)?;
    let mut event = build_event(
        event_id,
        meta,
        ctx.now,
        LedgerEventType::BlueprintExec,
        &envelope.proposer_id,
        Some(&envelope.id),
    );
    event.cc_changes = changes;
    ctx.ledger.seal_and_append(event)
}

pub(crate) fn execute_appeal(ctx: &mut ExecCtx, envelope: &Blueprint) -> Result<LedgerEvent> {
    let payload: AppealPayload = envelope.typed_payload()?;

    let sanction = ctx
        .state
        .get_sanction(&payload.sanction_id)
        .ok_or_else(|| ExecutionError::SanctionNotFound {
            sanction_id: payload.sanction_id.clone(),
        })?
        .clone();

    ctx.state.add_appeal(Appeal {
        id: envelope.id.clone(),
        sanction_id: sanction.id.clone(),
        appellant_id: envelope.proposer_id.clone(),
        reason: payload.reason.clone(),
        status: AppealStatus::Pending,
        created_at: ctx.now,
        updated_at: ctx.now,
    })?;

    if sanction.status == SanctionStatus::Applied {
        let record = ctx
            .state
            .get_sanction_mut(&sanction.id)
            .expect("sanction fetched above");
        record.status = SanctionStatus::UnderAppeal;
        record.updated_at = ctx.now;
    }

    let meta = ctx.ledger.next_meta();
    let event_id = ids::event_id(&meta, &envelope.id, &envelope.kind, &envelope.proposer_id)?;
    let event = build_event(
        event_id,
        meta,
        ctx.now,
        LedgerEventType::BlueprintExec,
        &envelope.proposer_id,
        Some(&envelope.id),
    );
    ctx.ledger.seal_and_append(event)
}
