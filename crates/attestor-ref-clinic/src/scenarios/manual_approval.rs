//! Scenario E: Witnessed Manual Approval
//!
//! Dr. Rui Matos (CRM456) has no email on file and no phone signal in the
//! ward. A nurse witnesses his approval in person and the session records
//! a locally generated code.
//!
//!   Step 1: select ManualApproval → 6-character code displayed
//!   Step 2: confirm the witnessed approval → Succeeded
//!
//! The record's confidence is the lowest of the three methods.

use attestor_contracts::{
    error::AttestResult,
    identity::DocumentContext,
    method::{AttestationMethod, Proof},
};

use crate::runtime::ClinicRuntime;
use crate::scenarios::{print_record, unexpected};

pub const LICENSE: &str = "CRM456";

pub fn run_scenario() -> AttestResult<()> {
    println!("=== Scenario E: Witnessed Manual Approval ===");
    println!();

    let rt = ClinicRuntime::new()?;
    let mut session = rt.open_session(LICENSE, DocumentContext::new("rx-2026-0501", "prescription"));

    session.select(AttestationMethod::ManualApproval)?;
    let code = session
        .manual_code()
        .ok_or_else(|| unexpected("manual code", "none displayed"))?
        .to_string();
    println!("  Step 1: approval code displayed to the witness: {}", code);

    session.confirm_manual_approval()?;
    println!("  Step 2: witness confirmed → {}", session.state().name());

    let record = session.record();
    if record.confidence_level() >= AttestationMethod::EmailOtp.confidence_level() {
        return Err(unexpected("confidence", record.confidence_level()));
    }
    print_record(record);
    println!();

    match record.proof() {
        Proof::ManualCode { code: recorded } if *recorded == code => Ok(()),
        other => Err(unexpected("manual proof", other)),
    }
}
