//! Clinic reference scenarios.
//!
//! Each scenario builds its own `ClinicRuntime`, drives a session or gate
//! through one protocol path and prints what a user and an auditor would
//! see. A scenario returns an error if the protocol does not behave as the
//! scenario expects.

pub mod expired_code;
pub mod gate_walkthrough;
pub mod manual_approval;
pub mod mismatch_recovery;
pub mod network_timeout;
pub mod replayed_code;
pub mod unregistered_physician;

use attestor_contracts::error::AttestError;
use attestor_core::AttestationRecord;

/// The error a scenario returns when the protocol surprised it.
pub(crate) fn unexpected(step: &str, got: impl std::fmt::Debug) -> AttestError {
    println!("  UNEXPECTED at {}: {:?}", step, got);
    AttestError::InvalidTransition {
        reason: format!("scenario expectation failed at {}: {:?}", step, got),
    }
}

/// Print a record the way the document footer would show it.
pub(crate) fn print_record(record: &AttestationRecord) {
    println!("  Record:");
    println!("    method:      {} ({:?})", record.method(), record.confidence_level());
    println!("    physician:   {} / {}", record.physician_name(), record.license_number());
    println!("    document:    {}", record.document_id());
    println!("    client:      {} | {}", record.client_ip(), record.user_agent());
    println!("  Signature block:");
    for line in record.signature_block().lines() {
        println!("    | {}", line);
    }
}
