//! QUEST_CONTRACT - propose a funded quest and lock its escrow

use super::{build_event, ExecCtx};
use crate::ids;
use civicforge_types::{
    reason, Blueprint, Contract, ContractPayload, LedgerEventType, Result, ValidationError,
    TREASURY,
};
use rust_decimal::Decimal;

pub(crate) fn execute_quest_contract(
    ctx: &mut ExecCtx,
    envelope: &Blueprint,
) -> Result<civicforge_types::LedgerEvent> {
    let payload: ContractPayload = envelope.typed_payload()?;

    let funding = envelope
        .funding
        .clone()
        .ok_or_else(|| ValidationError::InvalidFunding {
            reason: "funding block missing".into(),
        })?;
    if !funding.escrow_required {
        return Err(ValidationError::InvalidFunding {
            reason: "quest contracts require escrow_required=true".into(),
        }
        .into());
    }
    let sponsor_id = funding
        .sponsor_id
        .clone()
        .ok_or_else(|| ValidationError::InvalidFunding {
            reason: "sponsor_id missing".into(),
        })?;
    let admin_percent = funding.fees.admin_percent;
    if admin_percent < Decimal::ZERO || admin_percent > Decimal::ONE {
        return Err(ValidationError::InvalidFunding {
            reason: format!("admin_percent {admin_percent} outside [0, 1]"),
        }
        .into());
    }
    if funding.fees.fixed_cc.is_negative() || funding.escrow_cc_amount.is_negative() {
        return Err(ValidationError::InvalidFunding {
            reason: "negative funding amounts".into(),
        }
        .into());
    }

    let contract = Contract {
        id: envelope.id.clone(),
        proposer_id: envelope.proposer_id.clone(),
        funding: funding.clone(),
        verification_plan: envelope.verification_plan.clone().unwrap_or_default(),
        payload,
        created_at: ctx.now,
    };

    let predicted = contract.predicted_payout()?;
    if funding.escrow_cc_amount < predicted {
        return Err(ValidationError::EscrowUnderfunded {
            required: predicted,
            offered: funding.escrow_cc_amount,
        }
        .into());
    }

    let meta = ctx.ledger.next_meta();
    let event_id = ids::event_id(&meta, &envelope.id, &envelope.kind, &envelope.proposer_id)?;

    let mut event = build_event(
        event_id,
        meta,
        ctx.now,
        LedgerEventType::EscrowLock,
        &envelope.proposer_id,
        Some(&envelope.id),
    );

    event.cc_changes.extend(ctx.state.lock_escrow(
        &contract.id,
        &sponsor_id,
        funding.escrow_cc_amount,
        ctx.now,
    )?);

    // the flat admin fee leaves the escrow the moment it locks
    if funding.fees.fixed_cc.is_positive() {
        event.cc_changes.extend(ctx.state.release_escrow(
            &contract.id,
            TREASURY,
            funding.fees.fixed_cc,
            ctx.now,
            reason::ADMIN_FEE,
        )?);
    }

    ctx.state.add_contract(contract)?;
    ctx.ledger.seal_and_append(event)
}
