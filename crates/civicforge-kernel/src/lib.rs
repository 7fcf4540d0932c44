//! CivicForge Kernel - transactional envelope execution
//!
//! The `Runtime` owns the civic state, the ledger, the security and
//! policy engines, the signer registry, and the snapshot ring. Executing
//! an envelope is all-or-nothing:
//!
//! 1. Validate the envelope shape
//! 2. Push a deep snapshot (state + ledger length) onto the rollback ring
//! 3. Run the security engine
//! 4. Dispatch on kind to an executor that mutates state and appends one
//!    sealed ledger event
//! 5. On any error: restore the snapshot, pop it, re-raise
//!
//! The kernel is single-threaded and synchronous; callers needing
//! parallelism serialize envelopes in front of it. Post-commit
//! subscribers receive events outside the transaction.

pub mod clock;
mod exec;
pub mod ids;
pub mod maintenance;
pub mod ring;

pub use clock::{Clock, ManualClock, SystemClock};
pub use maintenance::MaintenanceReport;
pub use ring::{KernelSnapshot, SnapshotRing};

use civicforge_crypto::SignerRegistry;
use civicforge_ledger::{IntegrityReport, Ledger};
use civicforge_policy::{MintPolicyConfig, PolicyEngine, TreasuryBudget, TreasuryBudgetConfig};
use civicforge_security::{SecurityConfig, SecurityEngine};
use civicforge_state::State;
use civicforge_types::{
    reason, Blueprint, BlueprintKind, Cc, CoreError, LedgerEvent, LedgerEventType, License,
    Result, SYSTEM_ACTOR,
};
use exec::ExecCtx;
use serde::{Deserialize, Serialize};
use std::sync::mpsc::{channel, Receiver, Sender};

/// Default rollback ring depth
pub const DEFAULT_RING_DEPTH: usize = 50;

/// Everything configurable about a runtime
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub policy: MintPolicyConfig,
    #[serde(default)]
    pub budget: TreasuryBudgetConfig,
    #[serde(default = "default_ring_depth")]
    pub snapshot_ring_depth: usize,
}

fn default_ring_depth() -> usize {
    DEFAULT_RING_DEPTH
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            security: SecurityConfig::default(),
            policy: MintPolicyConfig::default(),
            budget: TreasuryBudgetConfig::default(),
            snapshot_ring_depth: DEFAULT_RING_DEPTH,
        }
    }
}

/// The deterministic economic runner
///
/// One value, owned by the process entry point and threaded explicitly;
/// lifecycle is `create -> execute* -> save`.
pub struct Runtime {
    state: State,
    ledger: Ledger,
    security: SecurityEngine,
    policy: PolicyEngine,
    budget: TreasuryBudget,
    ring: SnapshotRing,
    registry: SignerRegistry,
    clock: Box<dyn Clock>,
    subscribers: Vec<Sender<LedgerEvent>>,
}

impl Runtime {
    pub fn new(config: RuntimeConfig) -> Self {
        Self::with_clock(config, Box::new(SystemClock))
    }

    pub fn with_clock(config: RuntimeConfig, clock: Box<dyn Clock>) -> Self {
        Self {
            state: State::new(),
            ledger: Ledger::new(),
            security: SecurityEngine::new(config.security),
            policy: PolicyEngine::new(config.policy),
            budget: TreasuryBudget::new(config.budget),
            ring: SnapshotRing::new(config.snapshot_ring_depth),
            registry: SignerRegistry::new(),
            clock,
            subscribers: Vec::new(),
        }
    }

    /// Rebuild a runtime from checkpointed parts
    pub fn from_parts(
        config: RuntimeConfig,
        state: State,
        ledger: Ledger,
        snapshots: Vec<KernelSnapshot>,
        registry: SignerRegistry,
    ) -> Self {
        let mut runtime = Self::new(config);
        runtime.state = state;
        runtime.ledger = ledger;
        runtime.ring.restore(snapshots);
        runtime.registry = registry;
        runtime
    }

    pub fn set_clock(&mut self, clock: Box<dyn Clock>) {
        self.clock = clock;
    }

    // ========================================================================
    // Read surface
    // ========================================================================

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn signer_registry(&self) -> &SignerRegistry {
        &self.registry
    }

    pub fn snapshots(&self) -> Vec<KernelSnapshot> {
        self.ring.export()
    }

    pub fn verify_integrity(&self) -> IntegrityReport {
        self.ledger.verify_integrity()
    }

    // ========================================================================
    // Administration
    // ========================================================================

    pub fn register_signer(&mut self, signer_id: &str, public_key: &str) {
        self.registry.register(signer_id, public_key);
    }

    /// Create (or top up) a funded account outside envelope flow
    ///
    /// Demo drivers and tests bootstrap participants with this; the
    /// ledger still records the credit.
    pub fn seed_account(&mut self, id: &str, handle: &str, amount: Cc) -> Result<LedgerEvent> {
        let now = self.clock.now();
        let change = self
            .state
            .apply_cc_change(id, amount, now, reason::SEED, true)?;
        if let Some(account) = self.state.get_account_mut(id) {
            account.handle = handle.into();
            account.display_name = handle.into();
        }

        let meta = self.ledger.next_meta();
        let event_id = ids::system_event_id(&meta, "SEED", id)?;
        let mut event = exec::build_event(
            event_id,
            meta,
            now,
            LedgerEventType::Mint,
            SYSTEM_ACTOR,
            None,
        );
        event.cc_changes.push(change);
        let event = self.ledger.seal_and_append(event)?;
        self.notify(&event);
        Ok(event)
    }

    /// Attach a license to an account (registry-side administration)
    pub fn grant_license(&mut self, account_id: &str, license: License) -> Result<()> {
        let account = self.state.get_account_mut(account_id).ok_or_else(|| {
            civicforge_types::ExecutionError::AccountNotFound {
                account_id: account_id.into(),
            }
        })?;
        account.licenses.push(license);
        Ok(())
    }

    /// Receive every committed event, delivered after the transaction
    pub fn subscribe(&mut self) -> Receiver<LedgerEvent> {
        let (sender, receiver) = channel();
        self.subscribers.push(sender);
        receiver
    }

    fn notify(&mut self, event: &LedgerEvent) {
        self.subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }

    // ========================================================================
    // Execution
    // ========================================================================

    /// Execute one envelope, all-or-nothing
    pub fn execute(&mut self, envelope: &Blueprint) -> Result<LedgerEvent> {
        envelope.validate_shape()?;
        let now = self.clock.now();

        self.ring.push(KernelSnapshot {
            taken_at: now,
            ledger_len: self.ledger.len(),
            state: self.state.snapshot(),
        });

        match self.execute_inner(envelope, now) {
            Ok(event) => {
                tracing::info!(kind = %envelope.kind, event_id = %event.id, "committed blueprint");
                self.notify(&event);
                Ok(event)
            }
            Err(error) => {
                if let Some(snapshot) = self.ring.pop() {
                    self.state.restore(snapshot.state);
                    self.ledger.truncate(snapshot.ledger_len);
                }
                tracing::warn!(kind = %envelope.kind, error = %error, "rolled back blueprint");
                Err(error)
            }
        }
    }

    fn execute_inner(
        &mut self,
        envelope: &Blueprint,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<LedgerEvent> {
        self.security
            .validate(envelope, &mut self.state, &self.registry)?;
        let kind = envelope.parsed_kind()?;

        let mut ctx = ExecCtx {
            state: &mut self.state,
            ledger: &mut self.ledger,
            policy: &self.policy,
            budget: &self.budget,
            now,
        };

        match kind {
            BlueprintKind::QuestContract => exec::execute_quest_contract(&mut ctx, envelope),
            BlueprintKind::WorkSubmission => exec::execute_work_submission(&mut ctx, envelope),
            BlueprintKind::VerificationJob => exec::execute_job_accept(&mut ctx, envelope),
            BlueprintKind::VerificationStamp => exec::execute_stamp(&mut ctx, envelope),
            BlueprintKind::Mint => exec::execute_mint(&mut ctx, envelope),
            BlueprintKind::Craft => exec::execute_craft(&mut ctx, envelope),
            BlueprintKind::Sanction => exec::execute_sanction(&mut ctx, envelope),
            BlueprintKind::Appeal => exec::execute_appeal(&mut ctx, envelope),
        }
    }

    /// Restore the snapshot `steps` back, discarding newer ones
    pub fn rollback(&mut self, steps: usize) -> Result<()> {
        let snapshot = self.ring.take_back(steps).ok_or_else(|| {
            CoreError::Checkpoint(format!(
                "no snapshot {steps} back (ring holds {})",
                self.ring.len()
            ))
        })?;
        self.state.restore(snapshot.state);
        self.ledger.truncate(snapshot.ledger_len);
        Ok(())
    }

    /// Run the periodic escalation and expiry sweep
    pub fn maintain(&mut self) -> Result<MaintenanceReport> {
        let now = self.clock.now();
        let report = maintenance::run_maintenance(&mut self.state, &mut self.ledger, now)?;
        for event in &report.events {
            self.notify(event);
        }
        Ok(report)
    }
}
