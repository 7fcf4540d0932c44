//! Work submissions against quest contracts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An artifact attached to a submission or stamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub name: String,
    /// Content hash of the artifact (lowercase hex)
    pub hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
}

/// Submission status
///
/// SUBMITTED -> VERIFIED | PENDING_AUDIT | REJECTED.
/// VERIFIED and REJECTED are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionStatus {
    Submitted,
    Verified,
    Rejected,
    PendingAudit,
}

impl SubmissionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SubmissionStatus::Verified | SubmissionStatus::Rejected)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Submitted => "SUBMITTED",
            SubmissionStatus::Verified => "VERIFIED",
            SubmissionStatus::Rejected => "REJECTED",
            SubmissionStatus::PendingAudit => "PENDING_AUDIT",
        }
    }
}

/// The submitted work itself
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmissionPayload {
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claims: Option<serde_json::Value>,
    /// Token types the author wants minted; empty means unconstrained
    #[serde(default)]
    pub requested_mint: Vec<crate::TokenType>,
}

/// Work submitted against a contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: String,
    pub contract_id: String,
    pub proposer_id: String,
    pub payload: SubmissionPayload,
    pub status: SubmissionStatus,
    pub stamp_ids: Vec<String>,
    pub minted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Submission {
    /// Hashes of all attached artifacts, in attachment order
    pub fn artifact_hashes(&self) -> Vec<String> {
        self.payload
            .artifacts
            .iter()
            .map(|a| a.hash.clone())
            .collect()
    }
}
