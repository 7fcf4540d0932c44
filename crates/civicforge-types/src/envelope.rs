//! Blueprint envelopes - the wire shape the runner executes
//!
//! An envelope carries a kind, a proposer, funding and verification plans,
//! a kind-specific payload, and an optional auth block. Optional fields are
//! omitted (not nulled) when absent so the canonical signing bytes match
//! the minimal wire form an external signer produced.

use crate::{Cc, FundingSpec, TokenType, ValidationError, VerificationPlan};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The only signature algorithm the runner accepts
pub const ED25519_ALGORITHM: &str = "ED25519";

/// Envelope kinds, one executor per variant
///
/// The wire carries the kind as a string; parsing an unknown string is a
/// `ValidationError`, never a panic or a silent default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlueprintKind {
    QuestContract,
    WorkSubmission,
    VerificationJob,
    VerificationStamp,
    Mint,
    Craft,
    Sanction,
    Appeal,
}

impl BlueprintKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlueprintKind::QuestContract => "QUEST_CONTRACT",
            BlueprintKind::WorkSubmission => "WORK_SUBMISSION",
            BlueprintKind::VerificationJob => "VERIFICATION_JOB",
            BlueprintKind::VerificationStamp => "VERIFICATION_STAMP",
            BlueprintKind::Mint => "MINT",
            BlueprintKind::Craft => "CRAFT",
            BlueprintKind::Sanction => "SANCTION",
            BlueprintKind::Appeal => "APPEAL",
        }
    }
}

impl FromStr for BlueprintKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "QUEST_CONTRACT" => Ok(BlueprintKind::QuestContract),
            "WORK_SUBMISSION" => Ok(BlueprintKind::WorkSubmission),
            "VERIFICATION_JOB" => Ok(BlueprintKind::VerificationJob),
            "VERIFICATION_STAMP" => Ok(BlueprintKind::VerificationStamp),
            "MINT" => Ok(BlueprintKind::Mint),
            "CRAFT" => Ok(BlueprintKind::Craft),
            "SANCTION" => Ok(BlueprintKind::Sanction),
            "APPEAL" => Ok(BlueprintKind::Appeal),
            other => Err(ValidationError::UnknownKind { kind: other.into() }),
        }
    }
}

impl fmt::Display for BlueprintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Envelope authentication block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthBlock {
    pub signer_id: String,
    pub algorithm: String,
    pub nonce: String,
    pub signature: String,
    /// Inline base64 SPKI DER key, honored only when the security config
    /// allows it and the registry has no key for the signer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
}

/// A structured proposal the runner may execute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blueprint {
    pub id: String,
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub irl_min: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub proposer_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requested_scopes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub funding: Option<FundingSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_plan: Option<VerificationPlan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_plan: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub economy_impact: Option<serde_json::Value>,
    pub payload: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl Blueprint {
    /// Parse the kind string; unknown kinds are a validation failure
    pub fn parsed_kind(&self) -> Result<BlueprintKind, ValidationError> {
        self.kind.parse()
    }

    /// Reject envelopes missing the fields every kind requires
    pub fn validate_shape(&self) -> Result<(), ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::InvalidEnvelope {
                reason: "id is empty".into(),
            });
        }
        if self.kind.trim().is_empty() {
            return Err(ValidationError::InvalidEnvelope {
                reason: "kind is empty".into(),
            });
        }
        if self.proposer_id.trim().is_empty() {
            return Err(ValidationError::InvalidEnvelope {
                reason: "proposer_id is empty".into(),
            });
        }
        if self.payload.is_null() {
            return Err(ValidationError::InvalidEnvelope {
                reason: "payload is null".into(),
            });
        }
        Ok(())
    }

    /// Deserialize the payload into the schema for `kind`
    pub fn typed_payload<T: serde::de::DeserializeOwned>(
        &self,
    ) -> Result<T, ValidationError> {
        serde_json::from_value(self.payload.clone()).map_err(|e| {
            ValidationError::MalformedPayload {
                kind: self.kind.clone(),
                reason: e.to_string(),
            }
        })
    }
}

// ============================================================================
// Kind-specific payload schemas
// ============================================================================

/// QUEST_CONTRACT payload: deliverable terms (funding and the verification
/// plan ride on the envelope itself)
pub type QuestContractPayload = crate::ContractPayload;

/// WORK_SUBMISSION payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkSubmissionPayload {
    pub contract_id: String,
    #[serde(default)]
    pub artifacts: Vec<crate::Artifact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claims: Option<serde_json::Value>,
    #[serde(default)]
    pub requested_mint: Vec<TokenType>,
}

/// VERIFICATION_JOB payload: accept an open job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobAcceptPayload {
    pub job_id: String,
    #[serde(default)]
    pub stake_cc_locked: Cc,
}

/// VERIFICATION_STAMP payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StampPayload {
    pub job_id: String,
    pub decision: crate::StampDecision,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub artifacts: Vec<crate::Artifact>,
}

/// MINT payload: direct policy-gated mint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MintPayload {
    pub token_type: TokenType,
    pub template: String,
    pub owner_id: String,
    pub amount: u32,
    #[serde(default)]
    pub proof_refs: Vec<String>,
    #[serde(default)]
    pub stamp_ids: Vec<String>,
}

/// What a craft produces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CraftOutput {
    pub template: String,
    pub amount: u32,
}

/// CRAFT payload: burn inputs, mint ITEM outputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CraftPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipe: Option<String>,
    pub inputs: Vec<String>,
    #[serde(default)]
    pub craft_fee_cc: Cc,
    pub output: CraftOutput,
}

/// SANCTION payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SanctionPayload {
    pub action: crate::SanctionAction,
    pub target_type: crate::TargetType,
    pub target_id: String,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_cc: Option<Cc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_id: Option<String>,
}

/// APPEAL payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppealPayload {
    pub sanction_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}
