//! CivicForge Ledger - hash-chained append-only event log
//!
//! The ledger is:
//! - Append-only (events are never edited in place)
//! - Hash-chained (`prev_hash` commits to the previous `event_hash`,
//!   `GENESIS` for index 0)
//! - The single source of event ordering: executors must take
//!   `next_meta()` before deriving an event id
//!
//! # Invariants
//!
//! 1. `events[i].prev_hash == events[i-1].event_hash`
//! 2. `events[i].event_hash == H(canonical(event minus event_hash))`
//! 3. Truncation to a previous length is the only rollback operation

use chrono::{DateTime, Utc};
use civicforge_crypto::canonical_value;
use civicforge_types::{CoreError, EventMeta, LedgerEvent, Result, GENESIS_HASH};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome of an integrity walk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrityReport {
    pub ok: bool,
    pub errors: Vec<String>,
}

/// The append-only event sequence
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ledger {
    events: Vec<LedgerEvent>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_events(events: Vec<LedgerEvent>) -> Self {
        Self { events }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    pub fn find(&self, event_id: &str) -> Option<&LedgerEvent> {
        self.events.iter().find(|e| e.id == event_id)
    }

    /// Latest chain position: `{prev_hash, sequence}`
    ///
    /// The ONLY source of event ordering. Executors take this before
    /// deriving an event id.
    pub fn next_meta(&self) -> EventMeta {
        EventMeta {
            prev_hash: self
                .events
                .last()
                .map(|e| e.event_hash.clone())
                .unwrap_or_else(|| GENESIS_HASH.to_string()),
            sequence: self.events.len() as u64,
        }
    }

    /// Hash of an event's canonical encoding with `event_hash` removed
    pub fn compute_event_hash(event: &LedgerEvent) -> Result<String> {
        let mut value =
            canonical_value(event).map_err(|e| CoreError::Checkpoint(e.to_string()))?;
        if let Value::Object(obj) = &mut value {
            obj.remove("event_hash");
        }
        let bytes = serde_json::to_vec(&value)?;
        Ok(civicforge_crypto::sha256_hex(&bytes))
    }

    /// Fill in the event's hash, then append it
    pub fn seal_and_append(&mut self, mut event: LedgerEvent) -> Result<LedgerEvent> {
        event.event_hash = Self::compute_event_hash(&event)?;
        self.events.push(event.clone());
        Ok(event)
    }

    /// Drop events past `len`; the rollback primitive
    pub fn truncate(&mut self, len: usize) {
        self.events.truncate(len);
    }

    /// Walk the chain and report every prev_hash or event_hash mismatch
    pub fn verify_integrity(&self) -> IntegrityReport {
        let mut errors = Vec::new();
        let mut expected_prev = GENESIS_HASH.to_string();

        for (index, event) in self.events.iter().enumerate() {
            if event.prev_hash != expected_prev {
                errors.push(format!(
                    "event {index} ({}): prev_hash {} does not match chain head {expected_prev}",
                    event.id, event.prev_hash
                ));
            }
            match Self::compute_event_hash(event) {
                Ok(computed) if computed == event.event_hash => {}
                Ok(computed) => errors.push(format!(
                    "event {index} ({}): event_hash {} does not match computed {computed}",
                    event.id, event.event_hash
                )),
                Err(e) => errors.push(format!(
                    "event {index} ({}): canonical encoding failed: {e}",
                    event.id
                )),
            }
            expected_prev = event.event_hash.clone();
        }

        IntegrityReport {
            ok: errors.is_empty(),
            errors,
        }
    }

    /// Events whose timestamp falls in `[start, end)`
    ///
    /// The treasury budget scans the current ISO week through this.
    pub fn events_in_window(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> impl Iterator<Item = &LedgerEvent> {
        self.events
            .iter()
            .filter(move |e| e.timestamp >= start && e.timestamp < end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use civicforge_types::{Cc, CcChange, LedgerEventType};

    fn raw_event(prev_hash: &str, id: &str) -> LedgerEvent {
        LedgerEvent {
            id: id.into(),
            timestamp: "2025-06-02T10:00:00Z".parse().unwrap(),
            event_type: LedgerEventType::Mint,
            actor_id: "alice".into(),
            blueprint_id: None,
            tokens_minted: vec![],
            tokens_burned: vec![],
            tokens_transferred: vec![],
            cc_changes: vec![CcChange {
                account_id: "alice".into(),
                delta: Cc::new(5),
                reason: "SEED".into(),
            }],
            prev_hash: prev_hash.into(),
            event_hash: String::new(),
        }
    }

    fn chained_ledger(n: usize) -> Ledger {
        let mut ledger = Ledger::new();
        for i in 0..n {
            let meta = ledger.next_meta();
            ledger
                .seal_and_append(raw_event(&meta.prev_hash, &format!("e{i}")))
                .unwrap();
        }
        ledger
    }

    #[test]
    fn test_next_meta_starts_at_genesis() {
        let ledger = Ledger::new();
        let meta = ledger.next_meta();
        assert_eq!(meta.prev_hash, GENESIS_HASH);
        assert_eq!(meta.sequence, 0);
    }

    #[test]
    fn test_chain_verifies() {
        let ledger = chained_ledger(4);
        let report = ledger.verify_integrity();
        assert!(report.ok, "{:?}", report.errors);
    }

    #[test]
    fn test_any_field_mutation_breaks_the_chain() {
        let mut ledger = chained_ledger(3);
        ledger.events[1].actor_id = "mallory".into();

        let report = ledger.verify_integrity();
        assert!(!report.ok);
        assert!(!report.errors.is_empty());
    }

    #[test]
    fn test_tampered_hash_is_detected() {
        let mut ledger = chained_ledger(3);
        ledger.events[2].event_hash = "0".repeat(64);

        let report = ledger.verify_integrity();
        assert!(!report.ok);
    }

    #[test]
    fn test_truncate_restores_prefix() {
        let ledger_full = chained_ledger(5);
        let mut ledger = ledger_full.clone();
        ledger.truncate(3);

        assert_eq!(ledger.len(), 3);
        assert_eq!(ledger.events(), &ledger_full.events()[..3]);
        assert!(ledger.verify_integrity().ok);
    }

    #[test]
    fn test_window_scan() {
        let ledger = chained_ledger(3);
        let start = "2025-06-02T00:00:00Z".parse().unwrap();
        let end = "2025-06-09T00:00:00Z".parse().unwrap();
        assert_eq!(ledger.events_in_window(start, end).count(), 3);

        let later = "2025-06-09T00:00:00Z".parse().unwrap();
        let much_later = "2025-06-16T00:00:00Z".parse().unwrap();
        assert_eq!(ledger.events_in_window(later, much_later).count(), 0);
    }
}
