//! Signer registry - signer_id to public key
//!
//! Read-mostly; callers needing concurrent updates put their own
//! synchronization in front. The registry rides along in checkpoints so a
//! reloaded store verifies the same envelopes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Known signers and their base64 SPKI DER Ed25519 public keys
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignerRegistry {
    keys: BTreeMap<String, String>,
}

impl SignerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a signer's public key
    pub fn register(&mut self, signer_id: impl Into<String>, public_key: impl Into<String>) {
        self.keys.insert(signer_id.into(), public_key.into());
    }

    pub fn get(&self, signer_id: &str) -> Option<&str> {
        self.keys.get(signer_id).map(String::as_str)
    }

    pub fn contains(&self, signer_id: &str) -> bool {
        self.keys.contains_key(signer_id)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_get() {
        let mut registry = SignerRegistry::new();
        assert!(registry.get("alice").is_none());

        registry.register("alice", "KEYDATA");
        assert_eq!(registry.get("alice"), Some("KEYDATA"));
        assert!(registry.contains("alice"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_replace_key() {
        let mut registry = SignerRegistry::new();
        registry.register("alice", "OLD");
        registry.register("alice", "NEW");
        assert_eq!(registry.get("alice"), Some("NEW"));
        assert_eq!(registry.len(), 1);
    }
}
