//! # attestor-audit
//!
//! Append-only, SHA-256 hash-chained ledger of attestation records.
//!
//! ## Overview
//!
//! Every record the gate releases is wrapped in a `LedgerEntry` that links to
//! the previous entry by hash. Editing any entry, even a single byte of its
//! record, breaks the chain and is detected by `verify_chain`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use attestor_audit::InMemoryLedger;
//!
//! let ledger = Arc::new(InMemoryLedger::new("clinic-ledger"));
//! let gate = AttestationGate::open(identity, document, &services, ledger.clone());
//! // ... after release:
//! assert!(ledger.verify_integrity());
//! let export = ledger.export()?;
//! ```

pub mod chain;
pub mod entry;
pub mod memory;

pub use chain::{hash_entry, verify_chain};
pub use entry::{LedgerEntry, LedgerExport};
pub use memory::InMemoryLedger;

// ── Tests ─────────────────────────────────────────────────────────────────────
