//! In-memory implementation of `AttestationLedger`.
//!
//! `InMemoryLedger` keeps every entry in a `Vec` behind a `Mutex`. The gate
//! calls `append()` before releasing the protected action; operators call
//! `export()` and `verify_integrity()` afterwards.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use attestor_contracts::error::{AttestError, AttestResult};
use attestor_core::{traits::AttestationLedger, AttestationRecord};

use crate::{
    chain::{hash_entry, verify_chain},
    entry::{LedgerEntry, LedgerExport},
};

// ── Internal mutable state ────────────────────────────────────────────────────

pub(crate) struct LedgerState {
    pub(crate) entries: Vec<LedgerEntry>,

    /// Record ids already on the chain.
    pub(crate) recorded: HashSet<Uuid>,

    /// `this_hash` of the last entry, or `GENESIS_HASH` before the first.
    pub(crate) last_hash: String,

    pub(crate) sealed: bool,
}

// ── Public ledger ─────────────────────────────────────────────────────────────

/// An append-only attestation ledger backed by a SHA-256 hash chain.
///
/// Each record can be appended once. After `seal()` every append fails with
/// `LedgerWriteFailed`, which keeps any further gate closed.
pub struct InMemoryLedger {
    ledger_id: String,
    pub(crate) state: Arc<Mutex<LedgerState>>,
}

impl InMemoryLedger {
    pub fn new(ledger_id: impl Into<String>) -> Self {
        Self {
            ledger_id: ledger_id.into(),
            state: Arc::new(Mutex::new(LedgerState {
                entries: Vec::new(),
                recorded: HashSet::new(),
                last_hash: LedgerEntry::GENESIS_HASH.to_string(),
                sealed: false,
            })),
        }
    }

    pub fn ledger_id(&self) -> &str {
        &self.ledger_id
    }

    fn lock(&self) -> AttestResult<MutexGuard<'_, LedgerState>> {
        self.state.lock().map_err(|e| AttestError::LedgerWriteFailed {
            reason: format!("ledger state lock poisoned: {}", e),
        })
    }

    pub fn len(&self) -> usize {
        self.lock().map(|s| s.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stop accepting records. Idempotent.
    pub fn seal(&self) -> AttestResult<()> {
        let mut state = self.lock()?;
        if !state.sealed {
            state.sealed = true;
            info!(
                ledger_id = %self.ledger_id,
                entry_count = state.entries.len(),
                terminal_hash = %state.last_hash,
                "attestation ledger sealed"
            );
        }
        Ok(())
    }

    /// Export every entry written so far.
    pub fn export(&self) -> AttestResult<LedgerExport> {
        let state = self.lock()?;
        Ok(LedgerExport {
            ledger_id: self.ledger_id.clone(),
            entries: state.entries.clone(),
            exported_at: Utc::now(),
            terminal_hash: state
                .entries
                .last()
                .map(|e| e.this_hash.clone())
                .unwrap_or_default(),
            sealed: state.sealed,
        })
    }

    /// Records attested for `document_id`, in append order.
    pub fn records_for_document(&self, document_id: &str) -> Vec<AttestationRecord> {
        self.lock()
            .map(|state| {
                state
                    .entries
                    .iter()
                    .filter(|e| e.record.document_id() == document_id)
                    .map(|e| e.record.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Re-verify the whole chain. A poisoned lock counts as a failure.
    pub fn verify_integrity(&self) -> bool {
        self.lock().map(|s| verify_chain(&s.entries)).unwrap_or(false)
    }
}

// ── AttestationLedger impl ────────────────────────────────────────────────────

impl AttestationLedger for InMemoryLedger {
    /// Append one record to the chain.
    ///
    /// Fails if the record is inconsistent, the ledger is sealed, the record
    /// is already on the chain, or the record cannot be serialized for hashing.
    fn append(&self, record: &AttestationRecord) -> AttestResult<()> {
        if let Err(e) = record.check_consistency() {
            warn!(ledger_id = %self.ledger_id, record_id = %record.record_id(), error = %e, "inconsistent record rejected");
            return Err(AttestError::LedgerWriteFailed { reason: e.to_string() });
        }

        let mut state = self.lock()?;

        if state.sealed {
            warn!(ledger_id = %self.ledger_id, record_id = %record.record_id(), "append to sealed ledger");
            return Err(AttestError::LedgerWriteFailed {
                reason: format!("ledger '{}' is sealed", self.ledger_id),
            });
        }
        if state.recorded.contains(&record.record_id()) {
            warn!(ledger_id = %self.ledger_id, record_id = %record.record_id(), "duplicate record rejected");
            return Err(AttestError::LedgerWriteFailed {
                reason: format!("record {} is already on the ledger", record.record_id()),
            });
        }

        let sequence = state.entries.len() as u64;
        let prev_hash = state.last_hash.clone();
        let this_hash = hash_entry(&self.ledger_id, sequence, record, &prev_hash).map_err(|e| {
            AttestError::LedgerWriteFailed {
                reason: format!("record could not be encoded: {}", e),
            }
        })?;

        state.entries.push(LedgerEntry {
            sequence,
            ledger_id: self.ledger_id.clone(),
            record: record.clone(),
            prev_hash,
            this_hash: this_hash.clone(),
        });
        state.recorded.insert(record.record_id());
        state.last_hash = this_hash;

        info!(
            ledger_id = %self.ledger_id,
            sequence,
            record_id = %record.record_id(),
            license = %record.license_number(),
            method = %record.method(),
            "attestation recorded"
        );
        Ok(())
    }
}
