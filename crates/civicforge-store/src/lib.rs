//! CivicForge Checkpoint Store - atomic persistence
//!
//! Persists `{version, saved_at, ledger, state, snapshots, signers}` as a
//! single JSON document via write-to-temp + atomic rename, so a crash
//! mid-write never leaves a torn checkpoint. Loading verifies the ledger
//! chain and rejects tampered files.

use chrono::{DateTime, Utc};
use civicforge_crypto::SignerRegistry;
use civicforge_kernel::{KernelSnapshot, Runtime, RuntimeConfig};
use civicforge_ledger::Ledger;
use civicforge_state::State;
use civicforge_types::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Current on-disk format version
pub const CHECKPOINT_VERSION: u32 = 1;

/// The on-disk document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub ledger: Ledger,
    pub state: State,
    pub snapshots: Vec<KernelSnapshot>,
    pub signers: SignerRegistry,
}

/// A single-file checkpoint store
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Persist the runtime atomically
    pub fn save(&self, runtime: &Runtime) -> Result<()> {
        let checkpoint = Checkpoint {
            version: CHECKPOINT_VERSION,
            saved_at: Utc::now(),
            ledger: runtime.ledger().clone(),
            state: runtime.state().clone(),
            snapshots: runtime.snapshots(),
            signers: runtime.signer_registry().clone(),
        };
        let bytes = serde_json::to_vec_pretty(&checkpoint)?;

        let tmp = self.path.with_extension("tmp");
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&tmp, &bytes)?;
        fs::rename(&tmp, &self.path)?;
        tracing::debug!(path = %self.path.display(), events = checkpoint.ledger.len(), "saved checkpoint");
        Ok(())
    }

    /// Read and validate the raw checkpoint
    pub fn read(&self) -> Result<Checkpoint> {
        let bytes = fs::read(&self.path)?;
        let checkpoint: Checkpoint = serde_json::from_slice(&bytes)?;

        if checkpoint.version != CHECKPOINT_VERSION {
            return Err(CoreError::Checkpoint(format!(
                "unsupported checkpoint version {}",
                checkpoint.version
            )));
        }

        let report = checkpoint.ledger.verify_integrity();
        if !report.ok {
            return Err(CoreError::Checkpoint(format!(
                "ledger chain broken: {}",
                report.errors.join("; ")
            )));
        }
        Ok(checkpoint)
    }

    /// Load a runtime from the checkpoint
    pub fn load(&self, config: RuntimeConfig) -> Result<Runtime> {
        let checkpoint = self.read()?;
        Ok(Runtime::from_parts(
            config,
            checkpoint.state,
            checkpoint.ledger,
            checkpoint.snapshots,
            checkpoint.signers,
        ))
    }

    /// Load from the checkpoint if present, otherwise a fresh runtime
    pub fn load_or_new(&self, config: RuntimeConfig) -> Result<Runtime> {
        if self.exists() {
            self.load(config)
        } else {
            Ok(Runtime::new(config))
        }
    }
}
