//! Error types for CivicForge
//!
//! Two kinds suffice for the core: an envelope is either inadmissible
//! (`ValidationError` - safe to retry after correction) or admissible but
//! inapplicable against current state (`ExecutionError`). Everything else
//! (I/O, corrupt checkpoints) propagates as itself.

use crate::Cc;
use thiserror::Error;

/// Result type for CivicForge operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// The envelope is inadmissible; the kernel rolls back and the caller may
/// retry after correcting the envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    // ========================================================================
    // Envelope shape
    // ========================================================================
    /// Required envelope field missing or empty
    #[error("invalid envelope: {reason}")]
    InvalidEnvelope { reason: String },

    /// Kind string does not name an executor
    #[error("unknown blueprint kind: {kind}")]
    UnknownKind { kind: String },

    /// Payload does not match the schema for its kind
    #[error("malformed {kind} payload: {reason}")]
    MalformedPayload { kind: String, reason: String },

    // ========================================================================
    // Security engine
    // ========================================================================
    /// Only ED25519 is accepted
    #[error("unsupported signature algorithm: {algorithm}")]
    UnsupportedAlgorithm { algorithm: String },

    /// Signatures are required and the auth block is absent or empty
    #[error("envelope is not signed")]
    SignatureMissing,

    /// The signature does not verify against the canonical envelope bytes
    #[error("signature verification failed for signer {signer_id}")]
    SignatureInvalid { signer_id: String },

    /// No registry key for the signer and inline keys are not allowed
    #[error("unknown signer: {signer_id}")]
    UnknownSigner { signer_id: String },

    /// Signer public key is not valid base64 SPKI DER Ed25519
    #[error("malformed public key for signer {signer_id}: {reason}")]
    MalformedPublicKey { signer_id: String, reason: String },

    /// auth.signer_id must equal envelope.proposer_id
    #[error("signer {signer_id} does not match proposer {proposer_id}")]
    ProposerMismatch {
        signer_id: String,
        proposer_id: String,
    },

    /// Nonce required but absent
    #[error("nonce required")]
    NonceMissing,

    /// Nonce already registered for this signer (anti-replay)
    #[error("nonce {nonce} already used by signer {signer_id}")]
    NonceReplayed { signer_id: String, nonce: String },

    /// Proposer lacks the license the kind requires
    #[error("proposer {proposer_id} lacks {school} license at tier {min_tier} or above")]
    LicenseRequired {
        proposer_id: String,
        school: String,
        min_tier: String,
    },

    // ========================================================================
    // Policy engine
    // ========================================================================
    /// Per-settler or global mint cap would be exceeded this cycle
    #[error("mint cap exceeded for {token_type} ({scope}): cap {cap}, already minted {minted}, requested {requested}")]
    MintCapExceeded {
        token_type: String,
        scope: String,
        cap: u32,
        minted: u32,
        requested: u32,
    },

    /// Craft fee must match the configured policy value exactly
    #[error("craft fee mismatch: policy requires {expected}, envelope carries {actual}")]
    CraftFeeMismatch { expected: Cc, actual: Cc },

    /// Contract escrow does not cover the predicted payout
    #[error("escrow underfunded: predicted payout {required}, escrow {offered}")]
    EscrowUnderfunded { required: Cc, offered: Cc },

    /// Funding block missing, escrow not required, or sponsor absent
    #[error("invalid funding: {reason}")]
    InvalidFunding { reason: String },
}

/// The envelope is admissible but cannot be applied against current state.
/// Also rolled back; retry safety depends on the cause.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    #[error("account not found: {account_id}")]
    AccountNotFound { account_id: String },

    #[error("insufficient CC in {account_id}: available {available}, required {required}")]
    InsufficientCc {
        account_id: String,
        available: Cc,
        required: Cc,
    },

    #[error("contract not found: {contract_id}")]
    ContractNotFound { contract_id: String },

    #[error("submission not found: {submission_id}")]
    SubmissionNotFound { submission_id: String },

    #[error("submission {submission_id} is terminal ({status})")]
    SubmissionTerminal {
        submission_id: String,
        status: String,
    },

    #[error("verification job not found: {job_id}")]
    JobNotFound { job_id: String },

    #[error("job {job_id} is not open")]
    JobNotOpen { job_id: String },

    #[error("job {job_id} is not assigned to {verifier_id}")]
    JobNotAssignedTo { job_id: String, verifier_id: String },

    #[error("verifier {verifier_id} is not eligible for job {job_id}")]
    VerifierIneligible { job_id: String, verifier_id: String },

    #[error("stake for job {job_id} requires {required}, offered {offered}")]
    StakeTooSmall {
        job_id: String,
        required: Cc,
        offered: Cc,
    },

    #[error("stake not found: {stake_id}")]
    StakeNotFound { stake_id: String },

    #[error("stake {stake_id} is not locked")]
    StakeNotLocked { stake_id: String },

    #[error("escrow not found: {escrow_id}")]
    EscrowNotFound { escrow_id: String },

    #[error("escrow {escrow_id} is closed")]
    EscrowClosed { escrow_id: String },

    #[error("token not found: {token_id}")]
    TokenNotFound { token_id: String },

    #[error("token {token_id} is not owned by {account_id}")]
    TokenNotOwned {
        token_id: String,
        account_id: String,
    },

    #[error("token {token_id} is not active")]
    TokenNotActive { token_id: String },

    #[error("duplicate entity id: {entity} {id}")]
    DuplicateEntity { entity: String, id: String },

    #[error("sanction not found: {sanction_id}")]
    SanctionNotFound { sanction_id: String },

    #[error("stamp not found: {stamp_id}")]
    StampNotFound { stamp_id: String },

    #[error("appeal not found: {appeal_id}")]
    AppealNotFound { appeal_id: String },

    #[error("sanction action {action} cannot target {target_type}")]
    InvalidSanctionTarget { action: String, target_type: String },

    #[error("treasury budget exceeded: requested {requested}, remaining {remaining} this week")]
    BudgetExceeded { requested: Cc, remaining: Cc },

    #[error("amount overflow during CC arithmetic")]
    AmountOverflow,
}

/// Top-level error for the core
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization failure: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A persisted checkpoint failed integrity validation
    #[error("checkpoint rejected: {0}")]
    Checkpoint(String),
}

impl CoreError {
    /// True when the failure is an admissibility rejection
    pub fn is_validation(&self) -> bool {
        matches!(self, CoreError::Validation(_))
    }

    /// True when the failure is a state-level rejection
    pub fn is_execution(&self) -> bool {
        matches!(self, CoreError::Execution(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_classification() {
        let v: CoreError = ValidationError::SignatureMissing.into();
        let x: CoreError = ExecutionError::AccountNotFound {
            account_id: "a".into(),
        }
        .into();

        assert!(v.is_validation());
        assert!(!v.is_execution());
        assert!(x.is_execution());
    }

    #[test]
    fn test_error_messages_name_the_rule() {
        let err = ValidationError::NonceReplayed {
            signer_id: "alice".into(),
            nonce: "n1".into(),
        };
        assert!(err.to_string().contains("alice"));
        assert!(err.to_string().contains("n1"));
    }
}
