//! CRAFT - burn input tokens, mint ITEM outputs
//!
//! Inputs must exist, be ACTIVE, and belong to the proposer. The fee goes
//! to TREASURY, the burned inputs record the craft event as their
//! spender, and the minted items carry the burned ids as provenance.

use super::{build_event, ExecCtx};
use crate::ids;
use civicforge_types::{
    reason, Blueprint, CraftPayload, ExecutionError, LedgerEvent, LedgerEventType, Result,
    Token, TokenStatus, TokenType, ValidationError, TREASURY,
};
use std::collections::BTreeSet;

pub(crate) fn execute_craft(ctx: &mut ExecCtx, envelope: &Blueprint) -> Result<LedgerEvent> {
    let payload: CraftPayload = envelope.typed_payload()?;
    let malformed = |reason: &str| ValidationError::MalformedPayload {
        kind: envelope.kind.clone(),
        reason: reason.into(),
    };

    if payload.inputs.is_empty() {
        return Err(malformed("inputs is empty").into());
    }
    if payload.output.amount == 0 {
        return Err(malformed("output amount must be at least 1").into());
    }
    let distinct: BTreeSet<&String> = payload.inputs.iter().collect();
    if distinct.len() != payload.inputs.len() {
        return Err(malformed("duplicate input token").into());
    }
    if payload.craft_fee_cc.is_negative() {
        return Err(malformed("negative craft fee").into());
    }

    ctx.policy.assert_craft_fee(payload.craft_fee_cc)?;

    for token_id in &payload.inputs {
        let token = ctx
            .state
            .get_token(token_id)
            .ok_or_else(|| ExecutionError::TokenNotFound {
                token_id: token_id.clone(),
            })?;
        if token.owner_id != envelope.proposer_id {
            return Err(ExecutionError::TokenNotOwned {
                token_id: token_id.clone(),
                account_id: envelope.proposer_id.clone(),
            }
            .into());
        }
        if !token.is_active() {
            return Err(ExecutionError::TokenNotActive {
                token_id: token_id.clone(),
            }
            .into());
        }
    }

    let meta = ctx.ledger.next_meta();
    let event_id = ids::event_id(&meta, &envelope.id, &envelope.kind, &envelope.proposer_id)?;

    let mut event = build_event(
        event_id.clone(),
        meta,
        ctx.now,
        LedgerEventType::BlueprintExec,
        &envelope.proposer_id,
        Some(&envelope.id),
    );

    if payload.craft_fee_cc.is_positive() {
        event.cc_changes.extend(ctx.state.transfer_cc(
            &envelope.proposer_id,
            TREASURY,
            payload.craft_fee_cc,
            ctx.now,
            reason::CRAFT_FEE,
            true,
        )?);
    }

    for token_id in &payload.inputs {
        let token = ctx
            .state
            .get_token_mut(token_id)
            .expect("input presence checked");
        token.status = TokenStatus::Burned;
        token.spent_by_event_id = Some(event_id.clone());
        token.updated_at = ctx.now;
        event.tokens_burned.push(token_id.clone());
    }

    for index in 0..payload.output.amount {
        let token_id = ids::token_id(&event_id, index, TokenType::Item, &payload.output.template)?;
        ctx.state.add_token(Token {
            id: token_id.clone(),
            token_type: TokenType::Item,
            template: payload.output.template.clone(),
            owner_id: envelope.proposer_id.clone(),
            status: TokenStatus::Active,
            mint_event_id: event_id.clone(),
            proof_refs: payload.inputs.clone(),
            stamp_ids: vec![],
            spent_by_event_id: None,
            created_at: ctx.now,
            updated_at: ctx.now,
        })?;
        event.tokens_minted.push(token_id);
    }

    ctx.ledger.seal_and_append(event)
}
