//! MINT - direct policy-gated admin mint

use super::{build_event, ExecCtx};
use crate::ids;
use civicforge_types::{
    Blueprint, LedgerEvent, LedgerEventType, MintPayload, Result, Token, TokenStatus,
    ValidationError,
};

pub(crate) fn execute_mint(ctx: &mut ExecCtx, envelope: &Blueprint) -> Result<LedgerEvent> {
    let payload: MintPayload = envelope.typed_payload()?;
    if payload.amount == 0 {
        return Err(ValidationError::MalformedPayload {
            kind: envelope.kind.clone(),
            reason: "amount must be at least 1".into(),
        }
        .into());
    }
    if payload.owner_id.trim().is_empty() {
        return Err(ValidationError::MalformedPayload {
            kind: envelope.kind.clone(),
            reason: "owner_id is empty".into(),
        }
        .into());
    }

    ctx.policy.assert_can_mint(
        ctx.state,
        payload.token_type,
        &payload.owner_id,
        payload.amount,
        ctx.now,
    )?;

    let meta = ctx.ledger.next_meta();
    let event_id = ids::event_id(&meta, &envelope.id, &envelope.kind, &envelope.proposer_id)?;

    let mut minted = Vec::with_capacity(payload.amount as usize);
    for index in 0..payload.amount {
        let token_id = ids::token_id(&event_id, index, payload.token_type, &payload.template)?;
        ctx.state.add_token(Token {
            id: token_id.clone(),
            token_type: payload.token_type,
            template: payload.template.clone(),
            owner_id: payload.owner_id.clone(),
            status: TokenStatus::Active,
            mint_event_id: event_id.clone(),
            proof_refs: payload.proof_refs.clone(),
            stamp_ids: payload.stamp_ids.clone(),
            spent_by_event_id: None,
            created_at: ctx.now,
            updated_at: ctx.now,
        })?;
        minted.push(token_id);
    }

    ctx.policy
        .record_mint(payload.token_type, &payload.owner_id, payload.amount, ctx.now);

    let mut event = build_event(
        event_id,
        meta,
        ctx.now,
        LedgerEventType::Mint,
        &envelope.proposer_id,
        Some(&envelope.id),
    );
    event.tokens_minted = minted;
    ctx.ledger.seal_and_append(event)
}
