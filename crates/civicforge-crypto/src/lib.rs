//! Cryptographic primitives for CivicForge
//!
//! - Canonical encoding: deterministic JSON bytes for hashing and signing
//! - Hashing: SHA-256, lowercase hex
//! - Keys: Ed25519, public keys exchanged as base64 SPKI DER
//! - Signer registry: signer_id -> public key
//! - Signing helper: detached envelope signatures

pub mod canonical;
pub mod hash;
pub mod keys;
pub mod registry;
pub mod signer;

pub use canonical::{canonical_bytes, canonical_value, content_hash};
pub use hash::{sha256, sha256_hex};
pub use keys::{parse_public_key, KeyPair};
pub use registry::SignerRegistry;
pub use signer::{sign_envelope, signing_bytes, SignRequest};

use thiserror::Error;

/// Errors from key handling and signing
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid key material: {0}")]
    InvalidKey(String),

    #[error("signing failed: {0}")]
    SigningFailed(String),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type CryptoResult<T> = std::result::Result<T, CryptoError>;
