//! Canonical encoding - deterministic bytes for hashing and signing
//!
//! Object keys sort lexicographically at every depth, arrays preserve
//! order, strings are JSON-escaped, numbers render without redundant
//! zeros, booleans and null are literals. `serde_json::Value` backs the
//! encoding: its object map is a `BTreeMap`, so converting any
//! serializable value through it yields sorted keys for free, and compact
//! serialization of the `Value` is the canonical byte sequence.
//!
//! CC amounts serialize as decimal strings, so no float formatting can
//! leak into a hash preimage from the money path.

use crate::hash::sha256_hex;
use crate::CryptoResult;
use serde::Serialize;
use serde_json::Value;

/// Convert any serializable value into its canonical `Value` form
pub fn canonical_value<T: Serialize>(value: &T) -> CryptoResult<Value> {
    Ok(serde_json::to_value(value)?)
}

/// Canonical byte sequence for any serializable value
pub fn canonical_bytes<T: Serialize>(value: &T) -> CryptoResult<Vec<u8>> {
    let value = canonical_value(value)?;
    Ok(serde_json::to_vec(&value)?)
}

/// SHA-256 of the canonical bytes, as lowercase hex
///
/// This is the content hash used for ledger event hashes and all derived
/// ids (event ids, token ids, stamp ids).
pub fn content_hash<T: Serialize>(value: &T) -> CryptoResult<String> {
    Ok(sha256_hex(&canonical_bytes(value)?))
}
