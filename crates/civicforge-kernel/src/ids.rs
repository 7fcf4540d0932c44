//! Derived ids - deterministic identifiers from chain position
//!
//! Event ids commit to the chain position (`prev_hash`, `sequence`), so
//! the same envelope replayed at a different point yields a different id.
//! Token, job, and stamp ids derive from their parent event or submission.

use chrono::{DateTime, Utc};
use civicforge_crypto::{content_hash, CryptoError};
use civicforge_types::{CoreError, EventMeta, Result, TokenType};
use rust_decimal::Decimal;
use serde_json::json;

fn hash(value: serde_json::Value) -> Result<String> {
    content_hash(&value).map_err(|e| match e {
        CryptoError::Serialization(e) => CoreError::Serialization(e),
        other => CoreError::Checkpoint(other.to_string()),
    })
}

/// `H({prev_hash, sequence, blueprint_id, kind, proposer_id})`
pub fn event_id(
    meta: &EventMeta,
    blueprint_id: &str,
    kind: &str,
    proposer_id: &str,
) -> Result<String> {
    hash(json!({
        "blueprint_id": blueprint_id,
        "kind": kind,
        "prev_hash": meta.prev_hash,
        "proposer_id": proposer_id,
        "sequence": meta.sequence,
    }))
}

/// Event id for ledger entries produced outside envelope execution
/// (maintenance stake releases, seeded accounts)
pub fn system_event_id(meta: &EventMeta, kind: &str, subject: &str) -> Result<String> {
    hash(json!({
        "kind": kind,
        "prev_hash": meta.prev_hash,
        "sequence": meta.sequence,
        "subject": subject,
    }))
}

/// `H({event_id, index, token_type, token_template})`
pub fn token_id(
    event_id: &str,
    index: u32,
    token_type: TokenType,
    template: &str,
) -> Result<String> {
    hash(json!({
        "event_id": event_id,
        "index": index,
        "token_template": template,
        "token_type": token_type,
    }))
}

/// `H({submission_id, role, index, timestamp})`
pub fn job_id(
    submission_id: &str,
    role: &str,
    index: u32,
    timestamp: DateTime<Utc>,
) -> Result<String> {
    hash(json!({
        "index": index,
        "role": role,
        "submission_id": submission_id,
        "timestamp": timestamp,
    }))
}

/// Stamp ids derive from the event that recorded them
pub fn stamp_id(event_id: &str, job_id: &str) -> Result<String> {
    hash(json!({
        "event_id": event_id,
        "job_id": job_id,
        "kind": "STAMP",
    }))
}

/// Deterministic audit draw in [0, 1)
///
/// First 32 bits of `H({rate, submission_id})` as a fraction. The draw
/// depends on the configured rate: retuning the rate reshuffles which
/// submissions get audited, not just how many.
pub fn audit_draw(submission_id: &str, rate: Decimal) -> Result<Decimal> {
    let digest = hash(json!({
        "rate": rate,
        "submission_id": submission_id,
    }))?;
    // first 8 hex chars = first 32 bits; the digest is our own lowercase hex
    let bits = u32::from_str_radix(&digest[..8], 16)
        .map_err(|e| CoreError::Checkpoint(format!("malformed digest: {e}")))?;
    Ok(Decimal::from(bits) / Decimal::from(1u64 << 32))
}
