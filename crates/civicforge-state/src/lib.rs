//! CivicForge State - in-memory civic entity maps
//!
//! State exclusively owns every entity record. It exposes typed CRUD,
//! atomic CC operations, escrow/stake helpers that pair the CC movement
//! with the status transition, the nonce anti-replay index, and
//! value-semantics snapshot/restore.
//!
//! # Invariants
//!
//! 1. No account, escrow account, or stake account balance goes negative
//! 2. `add_*` fails on a present id; `update_*` fails on an absent id
//! 3. A snapshot is value-independent of live state
//! 4. Maps are ordered (`BTreeMap`) so iteration and serialization are
//!    deterministic

use chrono::{DateTime, Utc};
use civicforge_types::{
    escrow_account_id, reason, stake_account_id, stake_id, Account, Appeal, Cc, CcChange,
    Contract, Escrow, EscrowStatus, ExecutionError, Result, Sanction, Stake, StakeStatus, Stamp,
    Submission, Token, TokenType, ValidationError, VerificationJob,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A deep, value-independent copy of the whole state
pub type StateSnapshot = State;

/// The civic state: every entity map in one owned value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub accounts: BTreeMap<String, Account>,
    pub tokens: BTreeMap<String, Token>,
    pub escrows: BTreeMap<String, Escrow>,
    pub stakes: BTreeMap<String, Stake>,
    pub contracts: BTreeMap<String, Contract>,
    pub submissions: BTreeMap<String, Submission>,
    pub jobs: BTreeMap<String, VerificationJob>,
    pub stamps: BTreeMap<String, Stamp>,
    pub sanctions: BTreeMap<String, Sanction>,
    pub appeals: BTreeMap<String, Appeal>,
    /// signer_id -> used nonces
    pub nonces: BTreeMap<String, BTreeSet<String>>,
}

macro_rules! typed_crud {
    ($get:ident, $get_mut:ident, $add:ident, $update:ident, $map:ident, $ty:ty, $entity:literal) => {
        pub fn $get(&self, id: &str) -> Option<&$ty> {
            self.$map.get(id)
        }

        pub fn $get_mut(&mut self, id: &str) -> Option<&mut $ty> {
            self.$map.get_mut(id)
        }

        /// Insert a new record; fails if the id is already present
        pub fn $add(&mut self, record: $ty) -> Result<()> {
            if self.$map.contains_key(&record.id) {
                return Err(ExecutionError::DuplicateEntity {
                    entity: $entity.into(),
                    id: record.id.clone(),
                }
                .into());
            }
            self.$map.insert(record.id.clone(), record);
            Ok(())
        }

        /// Replace an existing record; fails if the id is absent
        pub fn $update(&mut self, record: $ty) -> Result<()> {
            if !self.$map.contains_key(&record.id) {
                return Err(Self::missing($entity, &record.id));
            }
            self.$map.insert(record.id.clone(), record);
            Ok(())
        }
    };
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    fn missing(entity: &str, id: &str) -> civicforge_types::CoreError {
        let id = id.to_string();
        match entity {
            "account" => ExecutionError::AccountNotFound { account_id: id },
            "token" => ExecutionError::TokenNotFound { token_id: id },
            "escrow" => ExecutionError::EscrowNotFound { escrow_id: id },
            "stake" => ExecutionError::StakeNotFound { stake_id: id },
            "contract" => ExecutionError::ContractNotFound { contract_id: id },
            "submission" => ExecutionError::SubmissionNotFound { submission_id: id },
            "job" => ExecutionError::JobNotFound { job_id: id },
            "sanction" => ExecutionError::SanctionNotFound { sanction_id: id },
            "stamp" => ExecutionError::StampNotFound { stamp_id: id },
            "appeal" => ExecutionError::AppealNotFound { appeal_id: id },
            other => ExecutionError::DuplicateEntity {
                entity: other.into(),
                id,
            },
        }
        .into()
    }

    // ========================================================================
    // Typed CRUD
    // ========================================================================

    typed_crud!(get_account, get_account_mut, add_account, update_account, accounts, Account, "account");
    typed_crud!(get_token, get_token_mut, add_token, update_token, tokens, Token, "token");
    typed_crud!(get_escrow, get_escrow_mut, add_escrow, update_escrow, escrows, Escrow, "escrow");
    typed_crud!(get_stake, get_stake_mut, add_stake, update_stake, stakes, Stake, "stake");
    typed_crud!(get_contract, get_contract_mut, add_contract, update_contract, contracts, Contract, "contract");
    typed_crud!(get_submission, get_submission_mut, add_submission, update_submission, submissions, Submission, "submission");
    typed_crud!(get_job, get_job_mut, add_job, update_job, jobs, VerificationJob, "job");
    typed_crud!(get_stamp, get_stamp_mut, add_stamp, update_stamp, stamps, Stamp, "stamp");
    typed_crud!(get_sanction, get_sanction_mut, add_sanction, update_sanction, sanctions, Sanction, "sanction");
    typed_crud!(get_appeal, get_appeal_mut, add_appeal, update_appeal, appeals, Appeal, "appeal");

    // ========================================================================
    // Relation queries
    // ========================================================================

    pub fn jobs_by_submission(&self, submission_id: &str) -> Vec<&VerificationJob> {
        self.jobs
            .values()
            .filter(|j| j.submission_id == submission_id)
            .collect()
    }

    pub fn stamps_by_submission(&self, submission_id: &str) -> Vec<&Stamp> {
        self.stamps
            .values()
            .filter(|s| s.submission_id == submission_id)
            .collect()
    }

    pub fn tokens_by_owner(&self, owner_id: &str) -> Vec<&Token> {
        self.tokens
            .values()
            .filter(|t| t.owner_id == owner_id)
            .collect()
    }

    /// Count tokens of `token_type` minted in `[start, end)`, optionally
    /// restricted to one owner. The mint-cap policy counts through this.
    pub fn count_minted_in_window(
        &self,
        token_type: TokenType,
        owner_id: Option<&str>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> u32 {
        self.tokens
            .values()
            .filter(|t| t.token_type == token_type)
            .filter(|t| t.created_at >= start && t.created_at < end)
            .filter(|t| owner_id.map_or(true, |o| t.owner_id == o))
            .count() as u32
    }

    pub fn account_balance(&self, account_id: &str) -> Cc {
        self.accounts
            .get(account_id)
            .map(|a| a.cc_balance)
            .unwrap_or_else(Cc::zero)
    }

    // ========================================================================
    // Atomic CC operations
    // ========================================================================

    /// Apply one balance delta
    ///
    /// Forbids a negative result, touches `last_active_at`, and returns the
    /// `{account_id, delta, reason}` record the ledger event will carry.
    pub fn apply_cc_change(
        &mut self,
        account_id: &str,
        delta: Cc,
        now: DateTime<Utc>,
        reason: &str,
        create_if_missing: bool,
    ) -> Result<CcChange> {
        if !self.accounts.contains_key(account_id) {
            if !create_if_missing {
                return Err(ExecutionError::AccountNotFound {
                    account_id: account_id.into(),
                }
                .into());
            }
            self.accounts
                .insert(account_id.into(), Account::new(account_id, account_id, now));
        }

        let account = self
            .accounts
            .get_mut(account_id)
            .expect("account just ensured");

        let new_balance = account
            .cc_balance
            .checked_add(delta)
            .ok_or(ExecutionError::AmountOverflow)?;
        if new_balance.is_negative() {
            return Err(ExecutionError::InsufficientCc {
                account_id: account_id.into(),
                available: account.cc_balance,
                required: delta.abs(),
            }
            .into());
        }

        account.cc_balance = new_balance;
        account.last_active_at = now;

        Ok(CcChange {
            account_id: account_id.into(),
            delta,
            reason: reason.into(),
        })
    }

    /// Debit `from`, credit `to`
    ///
    /// Atomicity across the pair is the kernel's snapshot: a failed credit
    /// propagates and the whole envelope rolls back.
    pub fn transfer_cc(
        &mut self,
        from: &str,
        to: &str,
        amount: Cc,
        now: DateTime<Utc>,
        reason: &str,
        create_recipient: bool,
    ) -> Result<Vec<CcChange>> {
        let debit = self.apply_cc_change(from, amount.negate(), now, reason, false)?;
        let credit = self.apply_cc_change(to, amount, now, reason, create_recipient)?;
        Ok(vec![debit, credit])
    }

    // ========================================================================
    // Escrow helpers
    // ========================================================================

    /// Reserve sponsor CC under `ESCROW:<contract_id>` and open the escrow
    pub fn lock_escrow(
        &mut self,
        contract_id: &str,
        sponsor_id: &str,
        amount: Cc,
        now: DateTime<Utc>,
    ) -> Result<Vec<CcChange>> {
        let account_id = escrow_account_id(contract_id);
        let changes =
            self.transfer_cc(sponsor_id, &account_id, amount, now, reason::ESCROW_LOCK, true)?;

        self.add_escrow(Escrow {
            id: contract_id.into(),
            account_id,
            sponsor_id: sponsor_id.into(),
            balance_cc: amount,
            status: EscrowStatus::Open,
            created_at: now,
            updated_at: now,
        })?;
        Ok(changes)
    }

    /// Pay `amount` out of an open escrow to `to`, closing it on exhaustion
    pub fn release_escrow(
        &mut self,
        escrow_id: &str,
        to: &str,
        amount: Cc,
        now: DateTime<Utc>,
        reason: &str,
    ) -> Result<Vec<CcChange>> {
        let escrow = self
            .escrows
            .get(escrow_id)
            .ok_or_else(|| ExecutionError::EscrowNotFound {
                escrow_id: escrow_id.into(),
            })?;
        if !escrow.is_open() {
            return Err(ExecutionError::EscrowClosed {
                escrow_id: escrow_id.into(),
            }
            .into());
        }
        let account_id = escrow.account_id.clone();

        let changes = self.transfer_cc(&account_id, to, amount, now, reason, true)?;

        let escrow = self
            .escrows
            .get_mut(escrow_id)
            .expect("escrow presence checked");
        escrow.balance_cc = escrow
            .balance_cc
            .checked_sub(amount)
            .ok_or(ExecutionError::AmountOverflow)?;
        escrow.updated_at = now;
        if escrow.balance_cc.is_zero() {
            escrow.status = EscrowStatus::Closed;
        }
        Ok(changes)
    }

    /// Return the full remaining balance to the sponsor and close
    pub fn refund_escrow(
        &mut self,
        escrow_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(Cc, Vec<CcChange>)> {
        let escrow = self
            .escrows
            .get(escrow_id)
            .ok_or_else(|| ExecutionError::EscrowNotFound {
                escrow_id: escrow_id.into(),
            })?;
        if !escrow.is_open() {
            return Err(ExecutionError::EscrowClosed {
                escrow_id: escrow_id.into(),
            }
            .into());
        }

        let remaining = escrow.balance_cc;
        let sponsor = escrow.sponsor_id.clone();
        if remaining.is_zero() {
            // Nothing left to move; just close.
            let escrow = self.escrows.get_mut(escrow_id).expect("presence checked");
            escrow.status = EscrowStatus::Closed;
            escrow.updated_at = now;
            return Ok((remaining, vec![]));
        }

        let changes =
            self.release_escrow(escrow_id, &sponsor, remaining, now, reason::ESCROW_REFUND)?;
        Ok((remaining, changes))
    }

    // ========================================================================
    // Stake helpers
    // ========================================================================

    /// Bond a verifier to a job: CC moves verifier -> `STAKE:<job>:<verifier>`
    pub fn lock_stake(
        &mut self,
        job_id: &str,
        verifier_id: &str,
        amount: Cc,
        now: DateTime<Utc>,
    ) -> Result<Vec<CcChange>> {
        let account_id = stake_account_id(job_id, verifier_id);
        let changes =
            self.transfer_cc(verifier_id, &account_id, amount, now, reason::STAKE_LOCK, true)?;

        self.add_stake(Stake {
            id: stake_id(job_id, verifier_id),
            job_id: job_id.into(),
            verifier_id: verifier_id.into(),
            account_id,
            balance_cc: amount,
            status: StakeStatus::Locked,
            created_at: now,
            updated_at: now,
        })?;
        Ok(changes)
    }

    /// Return a locked stake to its verifier
    pub fn release_stake(&mut self, stake_id: &str, now: DateTime<Utc>) -> Result<Vec<CcChange>> {
        let stake = self
            .stakes
            .get(stake_id)
            .ok_or_else(|| ExecutionError::StakeNotFound {
                stake_id: stake_id.into(),
            })?;
        if !stake.is_locked() {
            return Err(ExecutionError::StakeNotLocked {
                stake_id: stake_id.into(),
            }
            .into());
        }
        let amount = stake.balance_cc;
        let verifier = stake.verifier_id.clone();
        let account_id = stake.account_id.clone();

        let changes = if amount.is_zero() {
            vec![]
        } else {
            self.transfer_cc(&account_id, &verifier, amount, now, reason::STAKE_RELEASE, false)?
        };

        let stake = self.stakes.get_mut(stake_id).expect("presence checked");
        stake.balance_cc = Cc::zero();
        stake.status = StakeStatus::Released;
        stake.updated_at = now;
        Ok(changes)
    }

    /// Seize up to `amount` (full balance when `None`) to `recipient`
    ///
    /// A partial slash leaves the stake LOCKED with the remainder; a full
    /// slash transitions it to SLASHED.
    pub fn slash_stake(
        &mut self,
        stake_id: &str,
        amount: Option<Cc>,
        recipient: &str,
        now: DateTime<Utc>,
    ) -> Result<(Cc, Vec<CcChange>)> {
        let stake = self
            .stakes
            .get(stake_id)
            .ok_or_else(|| ExecutionError::StakeNotFound {
                stake_id: stake_id.into(),
            })?;
        if !stake.is_locked() {
            return Err(ExecutionError::StakeNotLocked {
                stake_id: stake_id.into(),
            }
            .into());
        }

        let seized = amount
            .map(|a| a.min(stake.balance_cc))
            .unwrap_or(stake.balance_cc);
        let account_id = stake.account_id.clone();

        let changes = if seized.is_zero() {
            vec![]
        } else {
            self.transfer_cc(&account_id, recipient, seized, now, reason::SLASH, true)?
        };

        let stake = self.stakes.get_mut(stake_id).expect("presence checked");
        stake.balance_cc = stake
            .balance_cc
            .checked_sub(seized)
            .ok_or(ExecutionError::AmountOverflow)?;
        stake.updated_at = now;
        if stake.balance_cc.is_zero() {
            stake.status = StakeStatus::Slashed;
        }
        Ok((seized, changes))
    }

    // ========================================================================
    // Nonce index
    // ========================================================================

    /// Register a nonce; re-use fails (anti-replay)
    pub fn register_nonce(&mut self, signer_id: &str, nonce: &str) -> Result<()> {
        let used = self.nonces.entry(signer_id.into()).or_default();
        if !used.insert(nonce.into()) {
            return Err(ValidationError::NonceReplayed {
                signer_id: signer_id.into(),
                nonce: nonce.into(),
            }
            .into());
        }
        Ok(())
    }

    // ========================================================================
    // Snapshot / restore
    // ========================================================================

    /// A deep copy, value-independent of live state
    pub fn snapshot(&self) -> StateSnapshot {
        self.clone()
    }

    /// Replace the entire state with a snapshot
    pub fn restore(&mut self, snapshot: StateSnapshot) {
        *self = snapshot;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        "2025-06-02T10:00:00Z".parse().unwrap()
    }

    fn seeded(id: &str, balance: i64) -> State {
        let mut state = State::new();
        state
            .apply_cc_change(id, Cc::new(balance), now(), reason::SEED, true)
            .unwrap();
        state
    }

    #[test]
    fn test_apply_cc_change_creates_lazily() {
        let mut state = State::new();
        let change = state
            .apply_cc_change("alice", Cc::new(10), now(), reason::SEED, true)
            .unwrap();

        assert_eq!(change.delta, Cc::new(10));
        assert_eq!(state.account_balance("alice"), Cc::new(10));
        assert_eq!(state.get_account("alice").unwrap().last_active_at, now());
    }

    #[test]
    fn test_apply_cc_change_refuses_unknown_account() {
        let mut state = State::new();
        let result = state.apply_cc_change("ghost", Cc::new(10), now(), reason::SEED, false);
        assert!(result.is_err());
    }

    #[test]
    fn test_no_negative_balances() {
        let mut state = seeded("alice", 5);
        let result = state.apply_cc_change("alice", Cc::new(-6), now(), "TEST", false);
        assert!(result.is_err());
        assert_eq!(state.account_balance("alice"), Cc::new(5));
    }

    #[test]
    fn test_transfer_debits_then_credits() {
        let mut state = seeded("alice", 50);
        let changes = state
            .transfer_cc("alice", "bob", Cc::new(20), now(), "TEST", true)
            .unwrap();

        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].delta, Cc::new(-20));
        assert_eq!(changes[1].delta, Cc::new(20));
        assert_eq!(state.account_balance("alice"), Cc::new(30));
        assert_eq!(state.account_balance("bob"), Cc::new(20));
    }

    #[test]
    fn test_escrow_lock_release_close() {
        let mut state = seeded("sponsor", 300);
        state.lock_escrow("c1", "sponsor", Cc::new(110), now()).unwrap();

        assert_eq!(state.account_balance("sponsor"), Cc::new(190));
        assert_eq!(state.account_balance("ESCROW:c1"), Cc::new(110));
        assert!(state.get_escrow("c1").unwrap().is_open());

        state
            .release_escrow("c1", "verifier", Cc::new(110), now(), reason::VERIFIER_PAY)
            .unwrap();
        let escrow = state.get_escrow("c1").unwrap();
        assert_eq!(escrow.balance_cc, Cc::zero());
        assert_eq!(escrow.status, EscrowStatus::Closed);

        // closed escrow refuses further releases
        let result =
            state.release_escrow("c1", "verifier", Cc::new(1), now(), reason::VERIFIER_PAY);
        assert!(result.is_err());
    }

    #[test]
    fn test_escrow_refund_returns_remainder() {
        let mut state = seeded("sponsor", 300);
        state.lock_escrow("c1", "sponsor", Cc::new(110), now()).unwrap();
        state
            .release_escrow("c1", "verifier", Cc::new(25), now(), reason::VERIFIER_PAY)
            .unwrap();

        let (refunded, changes) = state.refund_escrow("c1", now()).unwrap();
        assert_eq!(refunded, Cc::new(85));
        assert_eq!(changes.len(), 2);
        assert_eq!(state.account_balance("sponsor"), Cc::new(275));
        assert_eq!(state.get_escrow("c1").unwrap().status, EscrowStatus::Closed);
    }

    #[test]
    fn test_stake_lock_and_release() {
        let mut state = seeded("verifier", 20);
        state.lock_stake("j1", "verifier", Cc::new(5), now()).unwrap();

        assert_eq!(state.account_balance("verifier"), Cc::new(15));
        let stake = state.get_stake("j1:verifier").unwrap();
        assert_eq!(stake.balance_cc, Cc::new(5));
        assert!(stake.is_locked());

        state.release_stake("j1:verifier", now()).unwrap();
        assert_eq!(state.account_balance("verifier"), Cc::new(20));
        assert_eq!(
            state.get_stake("j1:verifier").unwrap().status,
            StakeStatus::Released
        );

        // double release fails
        assert!(state.release_stake("j1:verifier", now()).is_err());
    }

    #[test]
    fn test_partial_slash_stays_locked() {
        let mut state = seeded("verifier", 20);
        state.lock_stake("j1", "verifier", Cc::new(10), now()).unwrap();

        let (seized, _) = state
            .slash_stake("j1:verifier", Some(Cc::new(4)), "TREASURY", now())
            .unwrap();
        assert_eq!(seized, Cc::new(4));

        let stake = state.get_stake("j1:verifier").unwrap();
        assert_eq!(stake.balance_cc, Cc::new(6));
        assert_eq!(stake.status, StakeStatus::Locked);
        assert_eq!(state.account_balance("TREASURY"), Cc::new(4));
    }

    #[test]
    fn test_full_slash_is_terminal() {
        let mut state = seeded("verifier", 20);
        state.lock_stake("j1", "verifier", Cc::new(10), now()).unwrap();

        let (seized, _) = state
            .slash_stake("j1:verifier", None, "TREASURY", now())
            .unwrap();
        assert_eq!(seized, Cc::new(10));
        assert_eq!(
            state.get_stake("j1:verifier").unwrap().status,
            StakeStatus::Slashed
        );

        // slashing again fails: no longer locked
        assert!(state
            .slash_stake("j1:verifier", None, "TREASURY", now())
            .is_err());
    }

    #[test]
    fn test_slash_caps_at_balance() {
        let mut state = seeded("verifier", 20);
        state.lock_stake("j1", "verifier", Cc::new(10), now()).unwrap();

        let (seized, _) = state
            .slash_stake("j1:verifier", Some(Cc::new(999)), "TREASURY", now())
            .unwrap();
        assert_eq!(seized, Cc::new(10));
    }

    #[test]
    fn test_nonce_replay_fails() {
        let mut state = State::new();
        state.register_nonce("alice", "n1").unwrap();
        assert!(state.register_nonce("alice", "n1").is_err());
        // same nonce, different signer is fine
        state.register_nonce("bob", "n1").unwrap();
    }

    #[test]
    fn test_snapshot_is_value_independent() {
        let mut state = seeded("alice", 10);
        let snapshot = state.snapshot();

        state
            .apply_cc_change("alice", Cc::new(-10), now(), "TEST", false)
            .unwrap();
        state.register_nonce("alice", "n1").unwrap();
        assert_eq!(state.account_balance("alice"), Cc::zero());

        state.restore(snapshot);
        assert_eq!(state.account_balance("alice"), Cc::new(10));
        assert!(state.nonces.get("alice").is_none());
    }

    #[test]
    fn test_add_rejects_duplicates() {
        let mut state = seeded("sponsor", 300);
        state.lock_escrow("c1", "sponsor", Cc::new(10), now()).unwrap();
        let result = state.lock_escrow("c1", "sponsor", Cc::new(10), now());
        assert!(result.is_err());
    }
}
