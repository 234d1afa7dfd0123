//! Scenario A: Expired Code
//!
//! Dr. Helena Prado (CRM123) requests an email code for a prescription and
//! only types it in after the challenge TTL has passed.
//!
//!   Step 1: select EmailOTP, request code  → code in the outbox
//!   Step 2: clock moves past the TTL        → correct code rejected: Expired
//!   Step 3: resend, submit the new code     → Succeeded
//!
//! The expired code is refused even though it is correct, and the session
//! stays in `Authenticating` so the physician can recover with a resend.

use chrono::Duration;

use attestor_contracts::{
    error::{AttestError, AttestResult},
    identity::{DocumentContext, LicenseNumber},
    method::AttestationMethod,
};

use crate::runtime::ClinicRuntime;
use crate::scenarios::{print_record, unexpected};

pub const LICENSE: &str = "CRM123";

pub fn run_scenario() -> AttestResult<()> {
    println!("=== Scenario A: Expired Code ===");
    println!();

    let rt = ClinicRuntime::new()?;
    let license = LicenseNumber::new(LICENSE);
    let mut session = rt.open_session(LICENSE, DocumentContext::new("rx-2026-0301", "prescription"));

    session.select(AttestationMethod::EmailOtp)?;
    let handle = session.request_code()?;
    let code = rt
        .outbox
        .last_code_for(&license)
        .ok_or_else(|| unexpected("outbox", "no code delivered"))?;
    println!("  Step 1: code sent to {} (expires {})", handle.destination_hint, handle.expires_at);

    rt.clock.advance(rt.config.challenge.ttl() + Duration::seconds(1));
    println!("  Step 2: {}s later the physician types the code", rt.config.challenge.ttl_secs + 1);

    match session.submit_code(&code) {
        Err(AttestError::ChallengeExpired) => {
            println!("  Result:         ChallengeExpired (correct code, too late)");
            println!("  Session state:  {}", session.state().name());
        }
        other => return Err(unexpected("submit after TTL", other)),
    }

    let fresh = session.resend_code()?;
    let fresh_code = rt
        .outbox
        .last_code_for(&license)
        .ok_or_else(|| unexpected("outbox", "no code re-delivered"))?;
    session.submit_code(&fresh_code)?;
    println!("  Step 3: resent to {}, new code accepted", fresh.destination_hint);
    println!("  Session state:  {}", session.state().name());
    println!();
    print_record(session.record());
    println!();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use attestor_contracts::method::Proof;
    use attestor_core::SessionState;

    #[test]
    fn test_scenario_runs() {
        run_scenario().unwrap();
    }

    #[test]
    fn test_correct_code_after_ttl_is_expired() {
        let rt = ClinicRuntime::new().unwrap();
        let license = LicenseNumber::new(LICENSE);
        let mut session = rt.open_session(LICENSE, DocumentContext::new("rx-1", "prescription"));
        session.select(AttestationMethod::EmailOtp).unwrap();
        session.request_code().unwrap();
        let code = rt.outbox.last_code_for(&license).unwrap();

        rt.clock.advance(Duration::seconds(601));

        assert_eq!(session.submit_code(&code), Err(AttestError::ChallengeExpired));
        assert!(matches!(session.state(), SessionState::Authenticating(_)));
    }

    #[test]
    fn test_resend_after_expiry_recovers() {
        let rt = ClinicRuntime::new().unwrap();
        let license = LicenseNumber::new(LICENSE);
        let mut session = rt.open_session(LICENSE, DocumentContext::new("rx-2", "prescription"));
        session.select(AttestationMethod::EmailOtp).unwrap();
        session.request_code().unwrap();
        rt.clock.advance(Duration::seconds(700));

        let handle = session.resend_code().unwrap();
        let code = rt.outbox.last_code_for(&license).unwrap();
        session.submit_code(&code).unwrap();

        match session.record().proof() {
            Proof::OtpCode { challenge_id, code: used } => {
                assert_eq!(*challenge_id, handle.id);
                assert_eq!(used, &code);
            }
            other => panic!("expected OtpCode proof, got {:?}", other),
        }
    }
}
