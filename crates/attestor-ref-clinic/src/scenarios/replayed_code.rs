//! Scenario C: Replayed Code
//!
//! A code that already produced an attestation is submitted again, as an
//! attacker who read it over the physician's shoulder would.
//!
//!   Step 1: attest a medical certificate with the emailed code → Succeeded
//!   Step 2: replay (challenge id, code) against the issuer      → AlreadyUsed
//!   Step 3: a second session gets its own code; the old one is useless
//!
//! Consumption is single-use regardless of code correctness.

use attestor_contracts::{
    error::{AttestResult, ValidationError},
    identity::{DocumentContext, LicenseNumber},
    method::{AttestationMethod, Proof},
};
use attestor_core::traits::ChallengeService;

use crate::mock_data;
use crate::runtime::ClinicRuntime;
use crate::scenarios::unexpected;

pub const LICENSE: &str = "CRM321";

pub fn run_scenario() -> AttestResult<()> {
    println!("=== Scenario C: Replayed Code ===");
    println!();

    let rt = ClinicRuntime::new()?;
    let license = LicenseNumber::new(LICENSE);
    let certificate = mock_data::medical_certificate("cert-2026-0117");
    println!(
        "  Document: {} for {} ({} day(s) off)",
        certificate["kind"], certificate["patient"], certificate["days_off"]
    );

    let mut session = rt.open_session(LICENSE, DocumentContext::new("cert-2026-0117", "medical-certificate"));
    session.select(AttestationMethod::EmailOtp)?;
    session.request_code()?;
    let code = rt
        .outbox
        .last_code_for(&license)
        .ok_or_else(|| unexpected("outbox", "no code delivered"))?;
    session.submit_code(&code)?;
    println!("  Step 1: certificate attested ({})", session.state().name());

    let challenge_id = match session.record().proof() {
        Proof::OtpCode { challenge_id, .. } => *challenge_id,
        other => return Err(unexpected("proof kind", other)),
    };

    match rt.registry.validate(challenge_id, &code) {
        Err(ValidationError::AlreadyUsed) => {
            println!("  Step 2: replay of challenge {} → AlreadyUsed", challenge_id);
        }
        other => return Err(unexpected("replay", other)),
    }

    let mut second = rt.open_session(LICENSE, DocumentContext::new("cert-2026-0118", "medical-certificate"));
    second.select(AttestationMethod::EmailOtp)?;
    let handle = second.request_code()?;
    match second.submit_code(&code) {
        Ok(()) => {
            // Two independent six-digit draws can coincide.
            println!("  Step 3: new challenge {} happened to draw the same code", handle.id);
        }
        Err(e) => println!("  Step 3: old code against new challenge {} → {}", handle.id, e),
    }
    println!();

    Ok(())
}
