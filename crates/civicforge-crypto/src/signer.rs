//! Detached envelope signatures
//!
//! The signing input is the canonical encoding of the envelope with
//! `auth.signature` removed; `auth.signer_id`, `auth.nonce`,
//! `auth.algorithm`, and `auth.public_key` stay in the preimage, so a
//! replayed envelope cannot swap any of them without breaking the
//! signature.

use crate::canonical::canonical_value;
use crate::keys::KeyPair;
use crate::{CryptoError, CryptoResult};
use civicforge_types::{AuthBlock, Blueprint, ED25519_ALGORITHM};
use ed25519_dalek::Signer;
use serde_json::Value;

/// Inputs to the signing helper
pub struct SignRequest {
    pub signer_id: String,
    /// base64 of the raw 32-byte Ed25519 seed
    pub private_key_base64: String,
    /// Defaults to a fresh unique string
    pub nonce: Option<String>,
    /// Inline base64 SPKI DER key to embed for registries that allow it
    pub public_key: Option<String>,
}

/// Canonical bytes an envelope signature covers
pub fn signing_bytes(envelope: &Blueprint) -> CryptoResult<Vec<u8>> {
    let mut value = canonical_value(envelope)?;
    if let Some(Value::Object(auth)) = value.get_mut("auth") {
        auth.remove("signature");
    }
    Ok(serde_json::to_vec(&value)?)
}

/// Sign an envelope, returning it with a populated auth block
pub fn sign_envelope(envelope: &Blueprint, request: &SignRequest) -> CryptoResult<Blueprint> {
    let keypair = KeyPair::from_seed_base64(&request.private_key_base64)?;

    let nonce = request
        .nonce
        .clone()
        .unwrap_or_else(|| format!("nonce_{}", uuid::Uuid::new_v4()));

    let mut signed = envelope.clone();
    signed.auth = Some(AuthBlock {
        signer_id: request.signer_id.clone(),
        algorithm: ED25519_ALGORITHM.to_string(),
        nonce,
        signature: String::new(),
        public_key: request.public_key.clone(),
    });

    let message = signing_bytes(&signed)?;
    let signature = keypair
        .signing_key()
        .try_sign(&message)
        .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;

    if let Some(auth) = signed.auth.as_mut() {
        auth.signature = hex::encode(signature.to_bytes());
    }
    Ok(signed)
}
