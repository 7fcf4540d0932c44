//! Accounts and licenses
//!
//! An account is a participant in the civic economy. Accounts are lazily
//! created on first credit (when the caller allows) and never destroyed.
//! `TREASURY` is a privileged well-known account.

use crate::Cc;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// License tiers, ordered by rank
///
/// Variant order is the rank order; comparison gates licensed kinds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LicenseTier {
    Visitor,
    Citizen,
    Apprentice,
    Journeyman,
    Master,
    Accredited,
}

impl LicenseTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            LicenseTier::Visitor => "VISITOR",
            LicenseTier::Citizen => "CITIZEN",
            LicenseTier::Apprentice => "APPRENTICE",
            LicenseTier::Journeyman => "JOURNEYMAN",
            LicenseTier::Master => "MASTER",
            LicenseTier::Accredited => "ACCREDITED",
        }
    }
}

impl fmt::Display for LicenseTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A license an account holds in a school of work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct License {
    pub school: String,
    pub tier: LicenseTier,
    pub granted_at: DateTime<Utc>,
    pub granted_by: String,
    pub seals_earned: u32,
}

/// A participant in the civic economy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub handle: String,
    pub display_name: String,
    pub cc_balance: Cc,
    pub licenses: Vec<License>,
    pub trust_score: Decimal,
    pub incident_count: u32,
    pub diversity_score: Decimal,
    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
    pub flags: Vec<String>,
}

impl Account {
    /// A fresh account with a zero balance
    pub fn new(id: impl Into<String>, handle: impl Into<String>, now: DateTime<Utc>) -> Self {
        let id = id.into();
        let handle = handle.into();
        Self {
            display_name: handle.clone(),
            id,
            handle,
            cc_balance: Cc::zero(),
            licenses: Vec::new(),
            trust_score: Decimal::ZERO,
            incident_count: 0,
            diversity_score: Decimal::ZERO,
            created_at: now,
            last_active_at: now,
            flags: Vec::new(),
        }
    }

    /// Whether the account holds `school` at `min_tier` or above
    pub fn holds_license(&self, school: &str, min_tier: LicenseTier) -> bool {
        self.licenses
            .iter()
            .any(|l| l.school == school && l.tier >= min_tier)
    }
}
