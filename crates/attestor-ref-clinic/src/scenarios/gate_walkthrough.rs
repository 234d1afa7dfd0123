//! Scenario G: Gated Prescription Submission
//!
//! The clinic's "submit prescription" action is wrapped in an
//! `AttestationGate`. A scripted user drives the session through the gate.
//!
//! Sub-case A (happy path):
//!   cancel → "Cancel anyway?" → no → companion app → pending → confirmed
//!   → record written to the ledger → prescription submitted
//!
//! Sub-case B (abandoned): cancel → yes → UserCancelled, nothing submitted.
//!
//! Sub-case C (ledger down): the physician attests but the ledger refuses
//! the record → LedgerWriteFailed, nothing submitted.

use std::cell::Cell;

use attestor_contracts::{
    error::{AttestError, AttestResult},
    identity::DocumentContext,
    method::{ApprovalStatus, AttestationMethod},
};
use attestor_core::{AttestationRecord, GateIntent, SessionCommand};

use crate::driver::ScriptedDriver;
use crate::mock_data;
use crate::runtime::ClinicRuntime;
use crate::scenarios::{print_record, unexpected};

pub const LICENSE: &str = "CRM123";

/// Intents of a physician who hesitates, then approves in the app.
pub fn app_approval_script() -> Vec<GateIntent> {
    vec![
        GateIntent::Cancel,
        GateIntent::Command(SessionCommand::Select(AttestationMethod::AppApproval)),
        GateIntent::Command(SessionCommand::PollAppApproval),
        GateIntent::Command(SessionCommand::RequestAppApproval),
        GateIntent::Command(SessionCommand::PollAppApproval),
        GateIntent::Command(SessionCommand::PollAppApproval),
    ]
}

/// The protected action: hand the prescription to the pharmacy system.
fn submit_prescription(document_id: &str, record: &AttestationRecord) -> String {
    let body = mock_data::prescription(document_id);
    format!(
        "submitted {} ({} item(s)) under record {}",
        document_id,
        body["items"].as_array().map(Vec::len).unwrap_or(0),
        record.record_id()
    )
}

pub fn run_scenario() -> AttestResult<()> {
    println!("=== Scenario G: Gated Prescription Submission ===");
    println!();

    let rt = ClinicRuntime::new()?;

    // ── Sub-case A: attest, then submit ──────────────────────────────────────

    println!("  ── Sub-case A: companion app approval ──");
    rt.approvals.push(ApprovalStatus::Pending);
    rt.approvals.push(ApprovalStatus::Confirmed {
        session_token: "app-session-7f3a9c".to_string(),
    });

    let mut gate = rt.open_gate(LICENSE, DocumentContext::new("rx-2026-0701", "prescription"));
    let mut driver = ScriptedDriver::new(app_approval_script())
        .with_confirmations([false])
        .echoing();
    let (receipt, record) = gate.guard(&mut driver, |record| submit_prescription("rx-2026-0701", record))?;

    println!("  Action:         {}", receipt);
    print_record(&record);
    let export = rt.ledger.export()?;
    println!(
        "  Ledger:         {} ({} entr(ies), terminal {})",
        if rt.ledger.verify_integrity() { "VERIFIED" } else { "FAILED" },
        export.entries.len(),
        export.terminal_hash
    );
    println!();

    // ── Sub-case B: abandon ──────────────────────────────────────────────────

    println!("  ── Sub-case B: user abandons ──");
    let submitted = Cell::new(false);
    let mut gate = rt.open_gate(LICENSE, DocumentContext::new("rx-2026-0702", "prescription"));
    let mut driver = ScriptedDriver::new([
        GateIntent::Command(SessionCommand::Select(AttestationMethod::EmailOtp)),
        GateIntent::Command(SessionCommand::RequestCode),
        GateIntent::Cancel,
    ])
    .with_confirmations([true])
    .echoing();

    match gate.guard(&mut driver, |_| submitted.set(true)) {
        Err(AttestError::UserCancelled) if !submitted.get() => {
            println!("  Result:         UserCancelled, prescription NOT submitted");
            println!("  Live challenges after abandon: {}", rt.registry.live_count());
        }
        other => return Err(unexpected("abandon", other.map(|_| submitted.get()))),
    }
    println!();

    // ── Sub-case C: ledger refuses the record ────────────────────────────────

    println!("  ── Sub-case C: ledger sealed ──");
    rt.ledger.seal()?;
    let submitted = Cell::new(false);
    let mut gate = rt.open_gate(LICENSE, DocumentContext::new("rx-2026-0703", "prescription"));
    let mut driver = ScriptedDriver::new([
        GateIntent::Command(SessionCommand::Select(AttestationMethod::ManualApproval)),
        GateIntent::Command(SessionCommand::ConfirmManualApproval),
    ]);

    match gate.guard(&mut driver, |_| submitted.set(true)) {
        Err(e @ AttestError::LedgerWriteFailed { .. }) if !submitted.get() => {
            println!("  Result:         {}", e);
            println!("  Prescription NOT submitted");
        }
        other => return Err(unexpected("sealed ledger", other.map(|_| submitted.get()))),
    }
    println!();

    Ok(())
}
