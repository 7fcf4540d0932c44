//! Tokens - non-forgeable proof artifacts
//!
//! A token is owned by exactly one account, carries provenance
//! (mint event, proof refs, stamps), and can transition ACTIVE -> BURNED
//! exactly once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Token classes recognized by the runner
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenType {
    Ore,
    Iron,
    Steel,
    SealBronze,
    SealSilver,
    SealGold,
    Item,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Ore => "ORE",
            TokenType::Iron => "IRON",
            TokenType::Steel => "STEEL",
            TokenType::SealBronze => "SEAL_BRONZE",
            TokenType::SealSilver => "SEAL_SILVER",
            TokenType::SealGold => "SEAL_GOLD",
            TokenType::Item => "ITEM",
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token lifecycle status; BURNED is terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenStatus {
    Active,
    Burned,
}

/// A non-forgeable proof artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub id: String,
    #[serde(rename = "type")]
    pub token_type: TokenType,
    pub template: String,
    pub owner_id: String,
    pub status: TokenStatus,
    /// Ledger event that minted this token
    pub mint_event_id: String,
    /// Artifact hashes backing the mint
    pub proof_refs: Vec<String>,
    /// Stamps that verified the work behind this token
    pub stamp_ids: Vec<String>,
    /// Ledger event that burned this token, once BURNED
    pub spent_by_event_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Token {
    pub fn is_active(&self) -> bool {
        self.status == TokenStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_type_wire_names() {
        let json = serde_json::to_string(&TokenType::SealBronze).unwrap();
        assert_eq!(json, "\"SEAL_BRONZE\"");

        let back: TokenType = serde_json::from_str("\"IRON\"").unwrap();
        assert_eq!(back, TokenType::Iron);
    }

    #[test]
    fn test_token_type_field_serializes_as_type() {
        let token = Token {
            id: "t1".into(),
            token_type: TokenType::Ore,
            template: "ore".into(),
            owner_id: "alice".into(),
            status: TokenStatus::Active,
            mint_event_id: "e1".into(),
            proof_refs: vec![],
            stamp_ids: vec![],
            spent_by_event_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let value = serde_json::to_value(&token).unwrap();
        assert_eq!(value["type"], "ORE");
    }
}
