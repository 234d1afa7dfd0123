//! Scenario F: Slow Network
//!
//! The mail relay stops answering within the request timeout while Dr.
//! Helena Prado is asking for a code.
//!
//!   Step 1: request code with 45s relay latency → NetworkError (timed out)
//!   Step 2: session still in Authenticating; nothing was delivered
//!   Step 3: network recovers, request again     → code delivered, Succeeded
//!
//! A directory that times out on session open degrades the profile instead.

use std::time::Duration;

use attestor_contracts::{
    error::{AttestError, AttestResult},
    identity::{DocumentContext, LicenseNumber},
    method::AttestationMethod,
};
use attestor_core::SessionState;

use crate::runtime::ClinicRuntime;
use crate::scenarios::unexpected;

pub const LICENSE: &str = "CRM123";

pub fn run_scenario() -> AttestResult<()> {
    println!("=== Scenario F: Slow Network ===");
    println!();

    let rt = ClinicRuntime::new()?;
    let license = LicenseNumber::new(LICENSE);
    println!("  Request timeout: {}s", rt.network.timeout().as_secs());

    let mut session = rt.open_session(LICENSE, DocumentContext::new("rx-2026-0601", "prescription"));
    session.select(AttestationMethod::EmailOtp)?;

    rt.network.set_latency(Duration::from_secs(45));
    match session.request_code() {
        Err(e @ AttestError::NetworkError { timed_out: true, .. }) => {
            println!("  Step 1: {} (retryable: {})", e, e.is_retryable());
        }
        other => return Err(unexpected("slow relay", other)),
    }
    if !matches!(session.state(), SessionState::Authenticating(_)) || session.challenge().is_some() {
        return Err(unexpected("state after timeout", session.state().name()));
    }
    println!(
        "  Step 2: state {} | live challenges {}",
        session.state().name(),
        rt.registry.live_count()
    );

    rt.network.set_latency(Duration::from_millis(150));
    let handle = session.request_code()?;
    let code = rt
        .outbox
        .last_code_for(&license)
        .ok_or_else(|| unexpected("outbox", "no code delivered"))?;
    session.submit_code(&code)?;
    println!("  Step 3: code sent to {} and accepted → {}", handle.destination_hint, session.state().name());

    rt.network.set_latency(Duration::from_secs(45));
    let degraded = rt.open_session(LICENSE, DocumentContext::new("rx-2026-0602", "prescription"));
    println!(
        "  Directory timeout on open: profile degraded = {}, EmailOTP available = {}",
        degraded.profile().is_degraded(),
        degraded.check_available(AttestationMethod::EmailOtp).is_ok()
    );
    println!();

    Ok(())
}
