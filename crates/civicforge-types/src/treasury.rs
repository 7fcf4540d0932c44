//! Well-known account ids and derived-account helpers

/// The privileged treasury account
pub const TREASURY: &str = "TREASURY";

/// Actor recorded on events produced outside envelope execution
/// (maintenance sweeps, seeded accounts)
pub const SYSTEM_ACTOR: &str = "SYSTEM";

/// The holding account backing a contract escrow
pub fn escrow_account_id(contract_id: &str) -> String {
    format!("ESCROW:{contract_id}")
}

/// The id of a verifier's stake on a job
pub fn stake_id(job_id: &str, verifier_id: &str) -> String {
    format!("{job_id}:{verifier_id}")
}

/// The holding account backing a verifier's stake
pub fn stake_account_id(job_id: &str, verifier_id: &str) -> String {
    format!("STAKE:{job_id}:{verifier_id}")
}
