//! Ledger entry and export types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use attestor_core::AttestationRecord;

/// One attestation record at its position in the hash chain.
///
/// Changing any field, including those of the embedded record, invalidates
/// `this_hash` and every later `prev_hash`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Position in the chain, starting at 0.
    pub sequence: u64,

    pub ledger_id: String,

    pub record: AttestationRecord,

    /// `this_hash` of the previous entry, or `GENESIS_HASH` for the first.
    pub prev_hash: String,

    /// SHA-256 (hex) over (ledger_id, sequence, prev_hash, record JSON).
    pub this_hash: String,
}

impl LedgerEntry {
    /// The `prev_hash` of the first entry in every chain: 64 hex zeros.
    pub const GENESIS_HASH: &'static str =
        "0000000000000000000000000000000000000000000000000000000000000000";
}

/// A point-in-time export of a ledger.
///
/// `terminal_hash` is the last entry's `this_hash` and commits to the whole
/// export; it is empty for an empty ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerExport {
    pub ledger_id: String,
    pub entries: Vec<LedgerEntry>,
    pub exported_at: DateTime<Utc>,
    pub terminal_hash: String,
    /// True once the ledger was sealed and accepts no further records.
    pub sealed: bool,
}
