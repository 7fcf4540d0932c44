//! Canonical types for CivicForge
//!
//! These types form the foundation of every CivicForge operation:
//! civic entities (tokens, accounts, escrows, stakes, quest contracts,
//! submissions, verification jobs, stamps, moderation records), the
//! blueprint envelope wire model, the ledger event model, and the
//! error taxonomy.
//!
//! # Invariants
//!
//! 1. Every entity is identified by a stable string id
//! 2. CC amounts are exact decimals; no balance ever goes negative
//! 3. Ledger events are immutable once hashed
//! 4. Failure is explicit - every rule violation has its own error variant

pub mod account;
pub mod amount;
pub mod contract;
pub mod envelope;
pub mod error;
pub mod escrow;
pub mod event;
pub mod moderation;
pub mod submission;
pub mod token;
pub mod treasury;
pub mod verification;

pub use account::{Account, License, LicenseTier};
pub use amount::Cc;
pub use contract::{
    ConflictRules, Contract, ContractPayload, EscalationStep, FeeSpec, FundingSpec, MintReward,
    MintTarget, SamplingAudit, StampRequirement, VerificationPlan,
};
pub use envelope::{
    AppealPayload, AuthBlock, Blueprint, BlueprintKind, CraftOutput, CraftPayload,
    JobAcceptPayload, MintPayload, SanctionPayload, StampPayload, WorkSubmissionPayload,
    ED25519_ALGORITHM,
};
pub use error::{CoreError, ExecutionError, Result, ValidationError};
pub use escrow::{Escrow, EscrowStatus, Stake, StakeStatus};
pub use event::{reason, CcChange, EventMeta, LedgerEvent, LedgerEventType, GENESIS_HASH};
pub use moderation::{Appeal, AppealStatus, Sanction, SanctionAction, SanctionStatus, TargetType};
pub use submission::{Artifact, Submission, SubmissionPayload, SubmissionStatus};
pub use token::{Token, TokenStatus, TokenType};
pub use treasury::{escrow_account_id, stake_account_id, stake_id, SYSTEM_ACTOR, TREASURY};
pub use verification::{
    EscalationRecord, JobStatus, Stamp, StampDecision, VerificationJob, AUDIT_ROLE,
};
