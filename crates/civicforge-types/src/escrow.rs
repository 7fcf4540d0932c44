//! Escrows and stakes - CC reserved against future obligations
//!
//! An escrow backs a quest contract; a stake bonds a verifier to a job.
//! Both are ordinary CC accounts with derived ids plus a status record
//! that only the kernel may drive.

use crate::Cc;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Escrow status; CLOSED is terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EscrowStatus {
    Open,
    Closed,
}

/// Funds a sponsor reserved to pay out a contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Escrow {
    /// Same id as the contract it backs
    pub id: String,
    /// Derived holding account: `ESCROW:<contract_id>`
    pub account_id: String,
    pub sponsor_id: String,
    pub balance_cc: Cc,
    pub status: EscrowStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Escrow {
    pub fn is_open(&self) -> bool {
        self.status == EscrowStatus::Open
    }
}

/// Stake status
///
/// LOCKED -> RELEASED on completion or expiry; LOCKED -> SLASHED on a full
/// slash. A partial slash reduces the balance and stays LOCKED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StakeStatus {
    Locked,
    Released,
    Slashed,
}

/// A verifier's locked bond on a verification job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stake {
    /// `<job_id>:<verifier_id>`
    pub id: String,
    pub job_id: String,
    pub verifier_id: String,
    /// Derived holding account: `STAKE:<job_id>:<verifier_id>`
    pub account_id: String,
    pub balance_cc: Cc,
    pub status: StakeStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Stake {
    pub fn is_locked(&self) -> bool {
        self.status == StakeStatus::Locked
    }
}
