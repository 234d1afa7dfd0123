//! Scenario D: Unregistered Physician
//!
//! A locum (CRM000) is not in the physician directory. The lookup fails,
//! the profile degrades to the caller-supplied license and name, and the
//! session offers only the methods that need no resolved email.
//!
//!   EmailOTP        → unavailable (no email resolved)
//!   AppApproval     → available
//!   ManualApproval  → available
//!
//! A registered physician with a malformed email (CRM789) degrades the
//! same way for EmailOTP only.

use attestor_contracts::{
    error::{AttestError, AttestResult},
    identity::DocumentContext,
    method::AttestationMethod,
};

use crate::runtime::ClinicRuntime;
use crate::scenarios::unexpected;

pub const UNREGISTERED: &str = "CRM000";
pub const MALFORMED_EMAIL: &str = "CRM789";

pub fn run_scenario() -> AttestResult<()> {
    println!("=== Scenario D: Unregistered Physician ===");
    println!();

    let rt = ClinicRuntime::new()?;

    for license in [UNREGISTERED, MALFORMED_EMAIL] {
        let mut session = rt.open_session(license, DocumentContext::new("rx-2026-0400", "prescription"));
        let profile = session.profile();
        println!(
            "  {} ({}): email {} | phone {}",
            profile.license_number,
            profile.display_name,
            profile.email.as_deref().unwrap_or("-"),
            profile.phone.as_deref().unwrap_or("-"),
        );
        for availability in session.available_methods() {
            println!(
                "    {:<28} {}",
                availability.method.label(),
                match &availability.reason {
                    None => "available".to_string(),
                    Some(reason) => format!("UNAVAILABLE ({})", reason),
                }
            );
        }

        match session.select(AttestationMethod::EmailOtp) {
            Err(AttestError::ChannelUnavailable { .. }) => {}
            other => return Err(unexpected("select EmailOTP", other)),
        }
        session.select(AttestationMethod::ManualApproval)?;
        println!("    → fell back to {}", AttestationMethod::ManualApproval);
        println!();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use attestor_contracts::identity::LicenseNumber;

    #[test]
    fn test_scenario_runs() {
        run_scenario().unwrap();
    }

    #[test]
    fn test_unknown_license_degrades_profile() {
        let rt = ClinicRuntime::new().unwrap();
        let session = rt.open_session(UNREGISTERED, DocumentContext::new("rx-1", "prescription"));

        let profile = session.profile();
        assert!(profile.is_degraded());
        assert_eq!(profile.license_number, LicenseNumber::new(UNREGISTERED));
        assert_eq!(profile.display_name, "Dr. Unregistered Locum");
        assert_eq!(profile.email, None);
        assert_eq!(profile.phone, None);
    }

    #[test]
    fn test_only_email_otp_is_unavailable() {
        let rt = ClinicRuntime::new().unwrap();
        let session = rt.open_session(UNREGISTERED, DocumentContext::new("rx-2", "prescription"));

        let availability = session.available_methods();
        let available: Vec<_> = availability
            .iter()
            .filter(|a| a.available)
            .map(|a| a.method)
            .collect();
        assert_eq!(
            available,
            vec![AttestationMethod::AppApproval, AttestationMethod::ManualApproval]
        );
        assert!(matches!(
            session.check_available(AttestationMethod::EmailOtp),
            Err(AttestError::ChannelUnavailable { method: AttestationMethod::EmailOtp, .. })
        ));
    }

    #[test]
    fn test_malformed_email_disables_email_otp() {
        let rt = ClinicRuntime::new().unwrap();
        let session = rt.open_session(MALFORMED_EMAIL, DocumentContext::new("rx-3", "prescription"));

        assert_eq!(session.profile().display_name, "Dr. Ana Lobo");
        assert_eq!(session.profile().email, None);
        assert!(session.check_available(AttestationMethod::EmailOtp).is_err());
        assert!(session.check_available(AttestationMethod::AppApproval).is_ok());
    }

    #[test]
    fn test_phone_only_physician_has_no_email_otp() {
        let rt = ClinicRuntime::new().unwrap();
        let session = rt.open_session("CRM456", DocumentContext::new("rx-4", "prescription"));

        assert!(!session.profile().is_degraded());
        assert!(session.profile().phone.is_some());
        assert!(session.check_available(AttestationMethod::EmailOtp).is_err());
    }
}
