//! Ledger events
//!
//! Events are append-only and hash-chained: `prev_hash` commits to the
//! previous event's `event_hash` (the literal `GENESIS` for index 0), and
//! `event_hash` is the SHA-256 of the event's canonical encoding with the
//! `event_hash` field removed. Every field always serializes, so the hash
//! preimage and the checkpoint format coincide.

use crate::Cc;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `prev_hash` of the first event in a chain
pub const GENESIS_HASH: &str = "GENESIS";

/// CC-change reason tags carried on ledger events
///
/// The treasury budget tracks outflows by these tags; they are part of the
/// canonical hash and must not change meaning.
pub mod reason {
    pub const SEED: &str = "SEED";
    pub const ESCROW_LOCK: &str = "ESCROW_LOCK";
    pub const ESCROW_REFUND: &str = "ESCROW_REFUND";
    pub const ADMIN_FEE: &str = "ADMIN_FEE";
    pub const AUTHOR_STIPEND: &str = "AUTHOR_STIPEND";
    pub const STAKE_LOCK: &str = "STAKE_LOCK";
    pub const STAKE_RELEASE: &str = "STAKE_RELEASE";
    pub const VERIFIER_PAY: &str = "VERIFIER_PAY";
    pub const AUDIT_PAY: &str = "AUDIT_PAY";
    pub const CRAFT_FEE: &str = "CRAFT_FEE";
    pub const SLASH: &str = "SLASH";
}

/// Event types on the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerEventType {
    Mint,
    BlueprintExec,
    EscrowLock,
    EscrowRelease,
    StakeLock,
    StakeRelease,
    Transfer,
    Burn,
    Spend,
}

/// One account balance delta inside an event
///
/// Within one envelope the `cc_changes` array preserves insertion order;
/// that order is part of the canonical hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CcChange {
    pub account_id: String,
    pub delta: Cc,
    pub reason: String,
}

/// A hash-chained ledger event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEvent {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub event_type: LedgerEventType,
    pub actor_id: String,
    pub blueprint_id: Option<String>,
    pub tokens_minted: Vec<String>,
    pub tokens_burned: Vec<String>,
    pub tokens_transferred: Vec<String>,
    pub cc_changes: Vec<CcChange>,
    pub prev_hash: String,
    pub event_hash: String,
}

/// Chain position handed to executors before they derive ids
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMeta {
    pub prev_hash: String,
    pub sequence: u64,
}
