//! Moderation records - sanctions and appeals

use crate::Cc;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a sanction does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SanctionAction {
    /// Seize a locked stake (target must be a stake)
    Slash,
    /// Force-reject a submission
    Reject,
    /// Flag an account, incrementing its incident counter
    Flag,
}

impl fmt::Display for SanctionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SanctionAction::Slash => "SLASH",
            SanctionAction::Reject => "REJECT",
            SanctionAction::Flag => "FLAG",
        };
        f.write_str(s)
    }
}

/// What a sanction targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TargetType {
    Stake,
    Submission,
    Account,
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TargetType::Stake => "STAKE",
            TargetType::Submission => "SUBMISSION",
            TargetType::Account => "ACCOUNT",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SanctionStatus {
    Applied,
    UnderAppeal,
    Resolved,
}

/// A moderation action against a stake, submission, or account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sanction {
    pub id: String,
    pub action: SanctionAction,
    pub target_type: TargetType,
    pub target_id: String,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_cc: Option<Cc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_id: Option<String>,
    pub status: SanctionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppealStatus {
    Pending,
    Resolved,
    Denied,
}

/// An appellant's challenge against a sanction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appeal {
    pub id: String,
    pub sanction_id: String,
    pub appellant_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub status: AppealStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
