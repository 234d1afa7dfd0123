//! # attestor-contracts
//!
//! Shared types and error contracts for the physician attestation protocol.
//!
//! All crates in the workspace import from here. No protocol logic lives in
//! this crate: only data definitions and error types.

pub mod challenge;
pub mod client;
pub mod error;
pub mod identity;
pub mod method;

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;
    use challenge::{Challenge, ChallengeId, DeliveryChannel};
    use error::{AttestError, ValidationError};
    use identity::{LicenseNumber, PhysicianContactProfile, PhysicianIdentity};
    use method::{AttestationMethod, ConfidenceLevel, Proof};

    // ── Identity and profile ─────────────────────────────────────────────────

    #[test]
    fn license_number_is_trimmed() {
        assert_eq!(LicenseNumber::new("  CRM123 ").as_str(), "CRM123");
    }

    #[test]
    fn degraded_profile_keeps_only_caller_input() {
        let identity = PhysicianIdentity::new("CRM999", "Dr. Unknown");
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let profile = PhysicianContactProfile::degraded(&identity, at);

        assert_eq!(profile.license_number, identity.license_number);
        assert_eq!(profile.display_name, "Dr. Unknown");
        assert!(!profile.has_email());
        assert!(profile.is_degraded());
        assert_eq!(profile.resolved_at, at);
    }

    // ── Delivery channel hints ───────────────────────────────────────────────

    #[test]
    fn email_hint_masks_local_part() {
        let ch = DeliveryChannel::Email("dra.silva@clinic.example".to_string());
        assert_eq!(ch.destination_hint(), "d***@clinic.example");
    }

    #[test]
    fn malformed_email_hint_reveals_nothing() {
        let ch = DeliveryChannel::Email("not-an-address".to_string());
        assert_eq!(ch.destination_hint(), "***");
    }

    // ── Challenge liveness ───────────────────────────────────────────────────

    #[test]
    fn challenge_expires_exactly_at_deadline() {
        let issued = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let challenge = Challenge {
            id: ChallengeId::new(),
            license_number: LicenseNumber::new("CRM123"),
            code_hash: "00".to_string(),
            salt: "00".to_string(),
            channel: DeliveryChannel::Email("a@b.example".to_string()),
            issued_at: issued,
            expires_at: issued + Duration::minutes(10),
            attempts: 0,
            consumed: false,
        };

        assert!(challenge.is_live(issued + Duration::minutes(9)));
        assert!(challenge.is_expired(issued + Duration::minutes(10)));
        assert!(!challenge.is_live(issued + Duration::minutes(10)));

        let handle = challenge.handle();
        assert_eq!(handle.id, challenge.id);
        assert_eq!(handle.destination_hint, "a***@b.example");
    }

    // ── Methods and confidence ───────────────────────────────────────────────

    #[test]
    fn manual_approval_has_lowest_confidence() {
        let manual = AttestationMethod::ManualApproval.confidence_level();
        let email = AttestationMethod::EmailOtp.confidence_level();
        let app = AttestationMethod::AppApproval.confidence_level();

        assert_eq!(manual, ConfidenceLevel::Low);
        assert!(manual < email);
        assert!(email <= app);
    }

    #[test]
    fn proof_reports_its_method() {
        let proof = Proof::ManualCode { code: "AB12CD".to_string() };
        assert_eq!(proof.method(), AttestationMethod::ManualApproval);
        assert_eq!(proof.artifact(), "AB12CD");

        let proof = Proof::OtpCode {
            challenge_id: ChallengeId::new(),
            code: "123456".to_string(),
        };
        assert_eq!(proof.method(), AttestationMethod::EmailOtp);
    }

    #[test]
    fn method_serializes_kebab_case() {
        let json = serde_json::to_string(&AttestationMethod::EmailOtp).unwrap();
        assert_eq!(json, "\"email-otp\"");
    }

    // ── Errors ───────────────────────────────────────────────────────────────

    #[test]
    fn validation_errors_map_to_attest_errors() {
        assert_eq!(AttestError::from(ValidationError::NotFound), AttestError::ChallengeNotFound);
        assert_eq!(AttestError::from(ValidationError::AlreadyUsed), AttestError::ChallengeAlreadyUsed);
        assert_eq!(AttestError::from(ValidationError::Expired), AttestError::ChallengeExpired);
        assert_eq!(
            AttestError::from(ValidationError::Mismatch { attempts_remaining: 3 }),
            AttestError::ChallengeMismatch { attempts_remaining: 3 }
        );
        assert_eq!(
            AttestError::from(ValidationError::AttemptsExhausted),
            AttestError::ChallengeAttemptsExhausted
        );
    }

    #[test]
    fn retryable_classification() {
        assert!(AttestError::ChallengeExpired.is_retryable());
        assert!(AttestError::NetworkError {
            operation: "otp/send".to_string(),
            reason: "timeout".to_string(),
            timed_out: true,
        }
        .is_retryable());
        assert!(!AttestError::UserCancelled.is_retryable());
        assert!(!AttestError::ChannelUnavailable {
            method: AttestationMethod::EmailOtp,
            reason: "no email".to_string(),
        }
        .is_retryable());
    }

    #[test]
    fn error_channel_unavailable_display() {
        let err = AttestError::ChannelUnavailable {
            method: AttestationMethod::EmailOtp,
            reason: "no email on file".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("email one-time code"));
        assert!(msg.contains("no email on file"));
    }
}
