//! Verification jobs and stamps
//!
//! A job is a slot a verifier can accept against a submission; a stamp is
//! the verifier's recorded decision. The AUDIT role is reserved for
//! sampling audits and is paid from TREASURY rather than escrow.

use crate::Cc;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Role reserved for sampling-audit jobs
pub const AUDIT_ROLE: &str = "AUDIT";

/// Verification job status
///
/// OPEN -> ASSIGNED -> COMPLETED; OPEN/ASSIGNED -> EXPIRED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Open,
    Assigned,
    Completed,
    Expired,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Expired)
    }
}

/// An escalation already applied to a job's pay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationRecord {
    pub at: DateTime<Utc>,
    pub multiplier: Decimal,
}

/// A slot a verifier can accept
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationJob {
    pub id: String,
    pub submission_id: String,
    pub stamp_role: String,
    pub open_to_pool: bool,
    /// Explicit allow-list; empty means any eligible verifier
    pub eligible_verifiers: Vec<String>,
    pub base_pay_cc: Cc,
    pub current_pay_cc: Cc,
    pub stake_required_cc: Cc,
    pub created_at: DateTime<Utc>,
    pub deadline_at: DateTime<Utc>,
    pub escalation_history: Vec<EscalationRecord>,
    pub status: JobStatus,
    pub assigned_to: Option<String>,
    pub stamp_id: Option<String>,
}

impl VerificationJob {
    pub fn is_audit(&self) -> bool {
        self.stamp_role == AUDIT_ROLE
    }

    /// Whether an escalation multiplier was already applied
    pub fn has_escalation(&self, multiplier: Decimal) -> bool {
        self.escalation_history
            .iter()
            .any(|r| r.multiplier == multiplier)
    }
}

/// A verifier's decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StampDecision {
    Pass,
    Fail,
    Abstain,
}

/// A verifier's decision attached to a submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stamp {
    pub id: String,
    pub job_id: String,
    pub submission_id: String,
    pub verifier_id: String,
    pub role: String,
    pub decision: StampDecision,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<crate::Artifact>,
    pub stake_cc_locked: Cc,
    pub created_at: DateTime<Utc>,
}
