//! Hash-chain primitives: entry hashing and chain verification.
//!
//! Hash input layout (bytes, in order):
//!   1. ledger_id as UTF-8 bytes
//!   2. sequence as 8-byte little-endian
//!   3. prev_hash as UTF-8 bytes (64 ASCII hex chars)
//!   4. canonical JSON of the attestation record (serde_json, compact)

use sha2::{Digest, Sha256};

use attestor_core::AttestationRecord;

use crate::entry::LedgerEntry;

/// Compute the SHA-256 hash of one ledger entry.
///
/// Returns a lowercase 64-character hex string, or the serialization error
/// if `record` cannot be encoded.
pub fn hash_entry(
    ledger_id: &str,
    sequence: u64,
    record: &AttestationRecord,
    prev_hash: &str,
) -> serde_json::Result<String> {
    let record_json = serde_json::to_vec(record)?;

    let mut hasher = Sha256::new();
    hasher.update(ledger_id.as_bytes());
    hasher.update(sequence.to_le_bytes());
    hasher.update(prev_hash.as_bytes());
    hasher.update(&record_json);

    Ok(hex::encode(hasher.finalize()))
}

/// Verify a hash chain.
///
/// Valid when every entry's `prev_hash` equals the preceding entry's
/// `this_hash` (or `GENESIS_HASH` for the first), every `this_hash`
/// recomputes from the entry's own fields, and sequences run 0, 1, 2, …
/// An empty chain is valid.
pub fn verify_chain(entries: &[LedgerEntry]) -> bool {
    let mut expected_prev = LedgerEntry::GENESIS_HASH.to_string();

    for (position, entry) in entries.iter().enumerate() {
        if entry.sequence != position as u64 || entry.prev_hash != expected_prev {
            return false;
        }

        match hash_entry(&entry.ledger_id, entry.sequence, &entry.record, &entry.prev_hash) {
            Ok(recomputed) if recomputed == entry.this_hash => {}
            _ => return false,
        }

        expected_prev = entry.this_hash.clone();
    }

    true
}
