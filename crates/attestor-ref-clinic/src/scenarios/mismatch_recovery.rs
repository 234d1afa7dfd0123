//! Scenario B: Mistyped Code
//!
//! Dr. Helena Prado mistypes the code once, then enters it correctly.
//!
//!   Step 1: submit "000000"       → ChallengeMismatch, 4 attempts left
//!   Step 2: submit the right code → Succeeded, EmailOTP record
//!
//! A second sub-case keeps guessing until the attempt limit burns the
//! challenge; from then on even the right code is refused.

use attestor_contracts::{
    error::{AttestError, AttestResult},
    identity::{DocumentContext, LicenseNumber},
    method::AttestationMethod,
};

use crate::runtime::ClinicRuntime;
use crate::scenarios::{print_record, unexpected};

pub const LICENSE: &str = "CRM123";

/// Never issued: codes have no leading zero.
pub const WRONG_CODE: &str = "000000";

pub fn run_scenario() -> AttestResult<()> {
    println!("=== Scenario B: Mistyped Code ===");
    println!();

    let rt = ClinicRuntime::new()?;
    let license = LicenseNumber::new(LICENSE);

    // ── Sub-case A: one typo, then success ───────────────────────────────────

    println!("  ── Sub-case A: one typo ──");
    let mut session = rt.open_session(LICENSE, DocumentContext::new("rx-2026-0302", "prescription"));
    session.select(AttestationMethod::EmailOtp)?;
    session.request_code()?;
    let code = rt
        .outbox
        .last_code_for(&license)
        .ok_or_else(|| unexpected("outbox", "no code delivered"))?;

    match session.submit_code(WRONG_CODE) {
        Err(e @ AttestError::ChallengeMismatch { .. }) => {
            println!("  Step 1: submit {} → {}", WRONG_CODE, e);
        }
        other => return Err(unexpected("wrong code", other)),
    }

    session.submit_code(&code)?;
    println!("  Step 2: submit correct code → {}", session.state().name());
    print_record(session.record());
    println!();

    // ── Sub-case B: attempt limit ────────────────────────────────────────────

    println!("  ── Sub-case B: attempt limit ──");
    let mut session = rt.open_session(LICENSE, DocumentContext::new("rx-2026-0303", "prescription"));
    session.select(AttestationMethod::EmailOtp)?;
    session.request_code()?;
    let code = rt
        .outbox
        .last_code_for(&license)
        .ok_or_else(|| unexpected("outbox", "no code delivered"))?;

    let mut tries = 0;
    loop {
        tries += 1;
        match session.submit_code(WRONG_CODE) {
            Err(AttestError::ChallengeMismatch { .. }) => continue,
            Err(AttestError::ChallengeAttemptsExhausted) => break,
            other => return Err(unexpected("guessing", other)),
        }
    }
    println!("  {} wrong codes → challenge burned", tries);

    match session.submit_code(&code) {
        Err(AttestError::ChallengeAlreadyUsed) => {
            println!("  Correct code afterwards → ChallengeAlreadyUsed; a new code is required");
        }
        other => return Err(unexpected("code after burn", other)),
    }
    println!("  Session state:  {}", session.state().name());
    println!();

    Ok(())
}
