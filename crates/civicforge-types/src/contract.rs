//! Quest contracts - funded offerings with a verification plan
//!
//! A contract binds sponsor funding, the stamps required before payout,
//! and the deliverable payload (stipend, mint rewards). The escrow that
//! backs it must cover the predicted payout at proposal time.

use crate::{Cc, ValidationError};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Fee schedule on a contract's funding
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeeSpec {
    /// Fraction of every verifier payout routed to TREASURY, in [0, 1]
    #[serde(default)]
    pub admin_percent: Decimal,
    /// Flat fee released to TREASURY when the escrow locks
    #[serde(default)]
    pub fixed_cc: Cc,
}

/// How a contract is funded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundingSpec {
    #[serde(default)]
    pub escrow_required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sponsor_id: Option<String>,
    pub escrow_cc_amount: Cc,
    #[serde(default)]
    pub fees: FeeSpec,
}

/// One escalation step on a stamp requirement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationStep {
    pub after_minutes: i64,
    pub multiplier: Decimal,
}

/// A stamp requirement inside a verification plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StampRequirement {
    pub role: String,
    pub min_unique: u32,
    pub stake_cc: Cc,
    pub pay_cc: Cc,
    pub timeout_minutes: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub escalation: Vec<EscalationStep>,
}

/// Who may not verify a submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictRules {
    /// The submission's proposer may not verify their own work
    #[serde(default = "default_true")]
    pub forbid_proposer: bool,
    /// One verifier may not hold two jobs on the same submission
    #[serde(default = "default_true")]
    pub forbid_repeat_verifier: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ConflictRules {
    fn default() -> Self {
        Self {
            forbid_proposer: true,
            forbid_repeat_verifier: true,
        }
    }
}

/// Random audit sampling after primary verification passes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingAudit {
    pub enabled: bool,
    /// Draw threshold in [0, 1); the hash draw must fall below it
    pub rate: Decimal,
    pub audit_pay_cc: Cc,
}

/// The stamps a submission must collect before payout
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VerificationPlan {
    #[serde(default)]
    pub required_stamps: Vec<StampRequirement>,
    #[serde(default)]
    pub conflict_rules: ConflictRules,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sampling_audit: Option<SamplingAudit>,
}

impl VerificationPlan {
    pub fn requirement(&self, role: &str) -> Option<&StampRequirement> {
        self.required_stamps.iter().find(|r| r.role == role)
    }
}

/// Where minted reward tokens go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MintTarget {
    Author,
    Sponsor,
    Escrow,
}

/// A token reward minted when a submission verifies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MintReward {
    pub token_type: crate::TokenType,
    pub template: String,
    pub amount: u32,
    pub target: MintTarget,
}

/// Deliverable terms of a contract
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContractPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deliverable_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acceptance_criteria: Option<String>,
    #[serde(default)]
    pub author_stipend_cc: Cc,
    #[serde(default)]
    pub mint_rewards: Vec<MintReward>,
}

/// A quest offering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub id: String,
    pub proposer_id: String,
    pub funding: FundingSpec,
    pub verification_plan: VerificationPlan,
    pub payload: ContractPayload,
    pub created_at: DateTime<Utc>,
}

impl Contract {
    /// Predicted payout the escrow must cover:
    /// stipend + sum(pay_cc * min_unique) + admin fee on that sum + fixed fee
    pub fn predicted_payout(&self) -> Result<Cc, ValidationError> {
        let overflow = || ValidationError::InvalidFunding {
            reason: "payout prediction overflowed".into(),
        };

        let mut verifier_pay = Cc::zero();
        for req in &self.verification_plan.required_stamps {
            let role_total = req
                .pay_cc
                .checked_mul_rate(Decimal::from(req.min_unique))
                .ok_or_else(overflow)?;
            verifier_pay = verifier_pay.checked_add(role_total).ok_or_else(overflow)?;
        }

        let admin_fee = verifier_pay
            .checked_mul_rate(self.funding.fees.admin_percent)
            .ok_or_else(overflow)?;

        self.payload
            .author_stipend_cc
            .checked_add(verifier_pay)
            .and_then(|t| t.checked_add(admin_fee))
            .and_then(|t| t.checked_add(self.funding.fees.fixed_cc))
            .ok_or_else(overflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TokenType;
    use rust_decimal_macros::dec;

    fn quest_contract() -> Contract {
        Contract {
            id: "c1".into(),
            proposer_id: "sponsor".into(),
            funding: FundingSpec {
                escrow_required: true,
                sponsor_id: Some("sponsor".into()),
                escrow_cc_amount: Cc::new(110),
                fees: FeeSpec {
                    admin_percent: dec!(0.1),
                    fixed_cc: Cc::zero(),
                },
            },
            verification_plan: VerificationPlan {
                required_stamps: vec![
                    StampRequirement {
                        role: "QUALITY".into(),
                        min_unique: 1,
                        stake_cc: Cc::new(5),
                        pay_cc: Cc::new(25),
                        timeout_minutes: 60,
                        escalation: vec![],
                    },
                    StampRequirement {
                        role: "EVIDENCE".into(),
                        min_unique: 1,
                        stake_cc: Cc::new(5),
                        pay_cc: Cc::new(30),
                        timeout_minutes: 60,
                        escalation: vec![],
                    },
                    StampRequirement {
                        role: "SAFETY".into(),
                        min_unique: 1,
                        stake_cc: Cc::new(10),
                        pay_cc: Cc::new(35),
                        timeout_minutes: 60,
                        escalation: vec![],
                    },
                ],
                conflict_rules: ConflictRules::default(),
                sampling_audit: None,
            },
            payload: ContractPayload {
                deliverable_type: Some("essay".into()),
                acceptance_criteria: None,
                author_stipend_cc: Cc::zero(),
                mint_rewards: vec![MintReward {
                    token_type: TokenType::Iron,
                    template: "iron".into(),
                    amount: 1,
                    target: MintTarget::Author,
                }],
            },
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_predicted_payout() {
        // 0 stipend + (25 + 30 + 35) + 10% admin = 99
        let payout = quest_contract().predicted_payout().unwrap();
        assert_eq!(payout, Cc::new(99));
    }

    #[test]
    fn test_predicted_payout_counts_min_unique() {
        let mut contract = quest_contract();
        contract.verification_plan.required_stamps[0].min_unique = 3;
        // stipend 0 + (75 + 30 + 35) + 14 admin = 154
        let payout = contract.predicted_payout().unwrap();
        assert_eq!(payout, Cc::new(154));
    }
}
