//! CivicForge Security - envelope admission
//!
//! Validates an envelope's auth block before any executor runs:
//! algorithm pin (ED25519 only), detached-signature verification over the
//! canonical envelope bytes, signer/proposer match, nonce anti-replay,
//! and license gating per kind. Every switch is configurable.
//!
//! The engine mutates state only to register the nonce; the kernel's
//! snapshot rolls that back together with everything else if a later
//! stage fails.

use civicforge_crypto::{parse_public_key, signing_bytes, SignerRegistry};
use civicforge_state::State;
use civicforge_types::{
    AuthBlock, Blueprint, LicenseTier, Result, ValidationError, ED25519_ALGORITHM,
};
use ed25519_dalek::{Signature, Verifier};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// License a kind demands of its proposer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LicenseRequirement {
    pub school: String,
    pub min_tier: LicenseTier,
}

/// Security engine switches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub require_signature: bool,
    pub require_known_signer: bool,
    pub require_nonce: bool,
    pub enforce_proposer_match: bool,
    pub require_license: bool,
    pub allow_inline_public_key: bool,
    /// kind -> required license
    #[serde(default)]
    pub license_requirements: BTreeMap<String, LicenseRequirement>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            require_signature: true,
            require_known_signer: true,
            require_nonce: true,
            enforce_proposer_match: true,
            require_license: true,
            allow_inline_public_key: false,
            license_requirements: BTreeMap::new(),
        }
    }
}

impl SecurityConfig {
    /// Everything off; for trusted local tooling and scripted demos
    pub fn permissive() -> Self {
        Self {
            require_signature: false,
            require_known_signer: false,
            require_nonce: false,
            enforce_proposer_match: false,
            require_license: false,
            allow_inline_public_key: true,
            license_requirements: BTreeMap::new(),
        }
    }
}

/// Validates envelopes against the security rules
#[derive(Debug, Clone, Default)]
pub struct SecurityEngine {
    config: SecurityConfig,
}

impl SecurityEngine {
    pub fn new(config: SecurityConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SecurityConfig {
        &self.config
    }

    /// Run every admission rule; registers the nonce on success paths
    pub fn validate(
        &self,
        envelope: &Blueprint,
        state: &mut State,
        registry: &SignerRegistry,
    ) -> Result<()> {
        match &envelope.auth {
            Some(auth) => self.validate_auth(envelope, auth, state, registry)?,
            None => {
                if self.config.require_signature {
                    return Err(ValidationError::SignatureMissing.into());
                }
            }
        }

        self.check_license(envelope, state)?;
        Ok(())
    }

    fn validate_auth(
        &self,
        envelope: &Blueprint,
        auth: &AuthBlock,
        state: &mut State,
        registry: &SignerRegistry,
    ) -> Result<()> {
        if auth.algorithm != ED25519_ALGORITHM {
            return Err(ValidationError::UnsupportedAlgorithm {
                algorithm: auth.algorithm.clone(),
            }
            .into());
        }

        if self.config.require_signature && auth.signature.trim().is_empty() {
            return Err(ValidationError::SignatureMissing.into());
        }

        if self.config.enforce_proposer_match && auth.signer_id != envelope.proposer_id {
            return Err(ValidationError::ProposerMismatch {
                signer_id: auth.signer_id.clone(),
                proposer_id: envelope.proposer_id.clone(),
            }
            .into());
        }

        let registry_key = registry.get(&auth.signer_id);
        let inline_key = if self.config.allow_inline_public_key {
            auth.public_key.as_deref()
        } else {
            None
        };
        let key = match registry_key.or(inline_key) {
            Some(key) => Some(key),
            None if self.config.require_known_signer || self.config.require_signature => {
                return Err(ValidationError::UnknownSigner {
                    signer_id: auth.signer_id.clone(),
                }
                .into());
            }
            None => None,
        };

        if let Some(key) = key {
            if !auth.signature.trim().is_empty() || self.config.require_signature {
                self.verify_signature(envelope, auth, key)?;
            }
        }

        if self.config.require_nonce {
            if auth.nonce.trim().is_empty() {
                return Err(ValidationError::NonceMissing.into());
            }
            state.register_nonce(&auth.signer_id, &auth.nonce)?;
        }

        Ok(())
    }

    fn verify_signature(&self, envelope: &Blueprint, auth: &AuthBlock, key: &str) -> Result<()> {
        let verifying_key =
            parse_public_key(key).map_err(|e| ValidationError::MalformedPublicKey {
                signer_id: auth.signer_id.clone(),
                reason: e.to_string(),
            })?;

        let invalid = || ValidationError::SignatureInvalid {
            signer_id: auth.signer_id.clone(),
        };

        let sig_bytes: [u8; 64] = hex::decode(&auth.signature)
            .map_err(|_| invalid())?
            .try_into()
            .map_err(|_| invalid())?;
        let signature = Signature::from_bytes(&sig_bytes);

        let message = signing_bytes(envelope)
            .map_err(|e| ValidationError::InvalidEnvelope {
                reason: e.to_string(),
            })?;

        verifying_key
            .verify(&message, &signature)
            .map_err(|_| invalid())?;
        Ok(())
    }

    fn check_license(&self, envelope: &Blueprint, state: &State) -> Result<()> {
        if !self.config.require_license {
            return Ok(());
        }
        let Some(requirement) = self.config.license_requirements.get(&envelope.kind) else {
            return Ok(());
        };

        let holds = state
            .get_account(&envelope.proposer_id)
            .map(|a| a.holds_license(&requirement.school, requirement.min_tier))
            .unwrap_or(false);
        if !holds {
            return Err(ValidationError::LicenseRequired {
                proposer_id: envelope.proposer_id.clone(),
                school: requirement.school.clone(),
                min_tier: requirement.min_tier.to_string(),
            }
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use civicforge_crypto::{sign_envelope, KeyPair, SignRequest};
    use civicforge_types::{Account, CoreError, License};
    use serde_json::json;

    fn envelope() -> Blueprint {
        Blueprint {
            id: "bp1".into(),
            kind: "MINT".into(),
            class: None,
            irl_min: None,
            created_at: Utc::now(),
            proposer_id: "alice".into(),
            title: None,
            summary: None,
            requested_scopes: vec![],
            funding: None,
            verification_plan: None,
            execution_plan: None,
            economy_impact: None,
            payload: json!({ "amount": 1 }),
            auth: None,
            status: None,
        }
    }

    fn signed(keypair: &KeyPair, nonce: &str) -> Blueprint {
        sign_envelope(
            &envelope(),
            &SignRequest {
                signer_id: "alice".into(),
                private_key_base64: keypair.seed_base64(),
                nonce: Some(nonce.into()),
                public_key: None,
            },
        )
        .unwrap()
    }

    fn registry_for(keypair: &KeyPair) -> SignerRegistry {
        let mut registry = SignerRegistry::new();
        registry.register("alice", keypair.public_key_base64().unwrap());
        registry
    }

    fn strict() -> SecurityEngine {
        SecurityEngine::new(SecurityConfig {
            require_license: false,
            ..SecurityConfig::default()
        })
    }

    #[test]
    fn test_valid_signed_envelope_passes() {
        let keypair = KeyPair::generate();
        let engine = strict();
        let mut state = State::new();

        let result = engine.validate(&signed(&keypair, "n1"), &mut state, &registry_for(&keypair));
        assert!(result.is_ok(), "{result:?}");
    }

    #[test]
    fn test_unsigned_envelope_fails_strict() {
        let engine = strict();
        let mut state = State::new();
        let result = engine.validate(&envelope(), &mut state, &SignerRegistry::new());
        assert!(matches!(
            result,
            Err(CoreError::Validation(ValidationError::SignatureMissing))
        ));
    }

    #[test]
    fn test_wrong_algorithm_fails() {
        let keypair = KeyPair::generate();
        let mut signed = signed(&keypair, "n1");
        signed.auth.as_mut().unwrap().algorithm = "RSA".into();

        let result = strict().validate(&signed, &mut State::new(), &registry_for(&keypair));
        assert!(matches!(
            result,
            Err(CoreError::Validation(
                ValidationError::UnsupportedAlgorithm { .. }
            ))
        ));
    }

    #[test]
    fn test_tampered_envelope_fails_verification() {
        let keypair = KeyPair::generate();
        let mut signed = signed(&keypair, "n1");
        signed.payload = json!({ "amount": 9999 });

        let result = strict().validate(&signed, &mut State::new(), &registry_for(&keypair));
        assert!(matches!(
            result,
            Err(CoreError::Validation(ValidationError::SignatureInvalid { .. }))
        ));
    }

    #[test]
    fn test_unknown_signer_fails() {
        let keypair = KeyPair::generate();
        let result = strict().validate(&signed(&keypair, "n1"), &mut State::new(), &SignerRegistry::new());
        assert!(matches!(
            result,
            Err(CoreError::Validation(ValidationError::UnknownSigner { .. }))
        ));
    }

    #[test]
    fn test_inline_key_honored_when_allowed() {
        let keypair = KeyPair::generate();
        let signed = sign_envelope(
            &envelope(),
            &SignRequest {
                signer_id: "alice".into(),
                private_key_base64: keypair.seed_base64(),
                nonce: Some("n1".into()),
                public_key: Some(keypair.public_key_base64().unwrap()),
            },
        )
        .unwrap();

        let engine = SecurityEngine::new(SecurityConfig {
            allow_inline_public_key: true,
            require_known_signer: false,
            require_license: false,
            ..SecurityConfig::default()
        });
        let result = engine.validate(&signed, &mut State::new(), &SignerRegistry::new());
        assert!(result.is_ok(), "{result:?}");
    }

    #[test]
    fn test_proposer_mismatch_fails() {
        let keypair = KeyPair::generate();
        let signed = sign_envelope(
            &envelope(),
            &SignRequest {
                signer_id: "mallory".into(),
                private_key_base64: keypair.seed_base64(),
                nonce: Some("n1".into()),
                public_key: None,
            },
        )
        .unwrap();

        let mut registry = SignerRegistry::new();
        registry.register("mallory", keypair.public_key_base64().unwrap());

        let result = strict().validate(&signed, &mut State::new(), &registry);
        assert!(matches!(
            result,
            Err(CoreError::Validation(ValidationError::ProposerMismatch { .. }))
        ));
    }

    #[test]
    fn test_nonce_replay_fails() {
        let keypair = KeyPair::generate();
        let engine = strict();
        let registry = registry_for(&keypair);
        let mut state = State::new();

        let envelope = signed(&keypair, "n1");
        engine.validate(&envelope, &mut state, &registry).unwrap();

        let result = engine.validate(&envelope, &mut state, &registry);
        assert!(matches!(
            result,
            Err(CoreError::Validation(ValidationError::NonceReplayed { .. }))
        ));
    }

    #[test]
    fn test_license_gate() {
        let keypair = KeyPair::generate();
        let mut config = SecurityConfig {
            require_license: true,
            ..SecurityConfig::default()
        };
        config.license_requirements.insert(
            "MINT".into(),
            LicenseRequirement {
                school: "FORGING".into(),
                min_tier: LicenseTier::Journeyman,
            },
        );
        let engine = SecurityEngine::new(config);
        let registry = registry_for(&keypair);

        // no account at all
        let mut state = State::new();
        let result = engine.validate(&signed(&keypair, "n1"), &mut state, &registry);
        assert!(matches!(
            result,
            Err(CoreError::Validation(ValidationError::LicenseRequired { .. }))
        ));

        // under-tier license
        let mut account = Account::new("alice", "alice", Utc::now());
        account.licenses.push(License {
            school: "FORGING".into(),
            tier: LicenseTier::Apprentice,
            granted_at: Utc::now(),
            granted_by: "guild".into(),
            seals_earned: 0,
        });
        let mut state = State::new();
        state.add_account(account.clone()).unwrap();
        let result = engine.validate(&signed(&keypair, "n2"), &mut state, &registry);
        assert!(result.is_err());

        // sufficient tier
        account.licenses[0].tier = LicenseTier::Master;
        let mut state = State::new();
        state.add_account(account).unwrap();
        let result = engine.validate(&signed(&keypair, "n3"), &mut state, &registry);
        assert!(result.is_ok(), "{result:?}");
    }

    #[test]
    fn test_permissive_config_accepts_unsigned() {
        let engine = SecurityEngine::new(SecurityConfig::permissive());
        let result = engine.validate(&envelope(), &mut State::new(), &SignerRegistry::new());
        assert!(result.is_ok());
    }
}
