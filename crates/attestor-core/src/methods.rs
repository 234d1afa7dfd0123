//! The three attestation strategies.
//!
//! Each strategy turns user actions into a method-specific `Proof`:
//!
//! - `AppApproval`: request/poll round-trip with the companion backend;
//!   proof is the backend's session token.
//! - `EmailOtp`: issue/validate round-trip through the challenge
//!   service; proof is the validated code.
//! - `ManualApproval`: no round-trip; proof is a locally generated code
//!   shown to the witness of an in-person approval.
//!
//! Strategies hold no session state. The session owns the progress (which
//! challenge or ticket is outstanding) and passes it in.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use rand::Rng;
use tracing::{debug, info, warn};

use attestor_contracts::{
    challenge::{ChallengeHandle, ChallengeId, DeliveryChannel},
    error::{AttestError, AttestResult},
    identity::{DocumentContext, LicenseNumber, PhysicianIdentity},
    method::{ApprovalStatus, ApprovalTicket, Proof},
};

use crate::traits::{ApprovalBackend, ChallengeService};

// ── EmailOTP ─────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct EmailOtp {
    challenges: Arc<dyn ChallengeService>,
}

impl EmailOtp {
    pub fn new(challenges: Arc<dyn ChallengeService>) -> Self {
        Self { challenges }
    }

    /// Issue a code to `email` and report where it went and when it expires.
    pub fn request_code(&self, license: &LicenseNumber, email: &str) -> AttestResult<ChallengeHandle> {
        let handle = self
            .challenges
            .issue(license, DeliveryChannel::Email(email.to_string()))?;
        info!(
            license = %license,
            challenge_id = %handle.id,
            sent_to = %handle.destination_hint,
            expires_at = %handle.expires_at,
            "email code sent"
        );
        Ok(handle)
    }

    /// Discard `current` and issue a fresh code.
    pub fn resend(
        &self,
        current: Option<ChallengeId>,
        license: &LicenseNumber,
        email: &str,
    ) -> AttestResult<ChallengeHandle> {
        if let Some(id) = current {
            debug!(challenge_id = %id, "discarding current challenge before resend");
            self.challenges.invalidate(id);
        }
        self.request_code(license, email)
    }

    /// Validate a submitted code; on success the proof carries the code.
    pub fn submit_code(&self, challenge: ChallengeId, submitted: &str) -> AttestResult<Proof> {
        match self.challenges.validate(challenge, submitted) {
            Ok(validated) => Ok(Proof::OtpCode {
                challenge_id: validated.challenge_id,
                code: validated.code,
            }),
            Err(e) => {
                warn!(challenge_id = %challenge, outcome = %e, "email code rejected");
                Err(e.into())
            }
        }
    }

    /// Invalidate an outstanding challenge when the user navigates away.
    pub fn cancel(&self, challenge: ChallengeId) {
        self.challenges.invalidate(challenge);
    }
}

// ── AppApproval ──────────────────────────────────────────────────────────────

/// Result of polling the companion backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppApprovalOutcome {
    Pending,
    Confirmed(Proof),
}

#[derive(Clone)]
pub struct AppApproval {
    backend: Arc<dyn ApprovalBackend>,
}

impl AppApproval {
    pub fn new(backend: Arc<dyn ApprovalBackend>) -> Self {
        Self { backend }
    }

    /// Push a confirmation request to the physician's companion app.
    pub fn request(
        &self,
        identity: &PhysicianIdentity,
        document: &DocumentContext,
    ) -> AttestResult<ApprovalTicket> {
        let ticket = self.backend.request(identity, document)?;
        info!(
            license = %identity.license_number,
            document_id = %document.document_id,
            ticket = %ticket,
            "companion app approval requested"
        );
        Ok(ticket)
    }

    /// Check whether the physician has answered.
    ///
    /// A rejection is reported as `AttestError::ApprovalRejected`; the caller
    /// may request again.
    pub fn poll(&self, ticket: &ApprovalTicket) -> AttestResult<AppApprovalOutcome> {
        match self.backend.poll(ticket)? {
            ApprovalStatus::Pending => Ok(AppApprovalOutcome::Pending),
            ApprovalStatus::Confirmed { session_token } => {
                if session_token.trim().is_empty() {
                    return Err(AttestError::ApprovalRejected {
                        reason: "backend confirmed without a session token".to_string(),
                    });
                }
                Ok(AppApprovalOutcome::Confirmed(Proof::AppSessionToken {
                    token: session_token,
                }))
            }
            ApprovalStatus::Rejected { reason } => {
                warn!(ticket = %ticket, %reason, "companion app approval rejected");
                Err(AttestError::ApprovalRejected { reason })
            }
        }
    }

    pub fn cancel(&self, ticket: &ApprovalTicket) {
        self.backend.cancel(ticket);
    }
}

// ── ManualApproval ───────────────────────────────────────────────────────────

/// Characters a manual approval code is drawn from.
const MANUAL_CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Length of a manual approval code.
pub const MANUAL_CODE_LEN: usize = 6;

/// Remembers every manual code handed out by this process so none repeats.
#[derive(Debug, Default)]
pub struct ManualCodeRegistry {
    issued: Mutex<HashSet<String>>,
}

impl ManualCodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw a six-character uppercase alphanumeric code not issued before.
    pub fn generate(&self) -> String {
        let mut issued = self.issued.lock().unwrap_or_else(|e| e.into_inner());
        let mut rng = rand::thread_rng();
        loop {
            let code: String = (0..MANUAL_CODE_LEN)
                .map(|_| MANUAL_CODE_CHARSET[rng.gen_range(0..MANUAL_CODE_CHARSET.len())] as char)
                .collect();
            if issued.insert(code.clone()) {
                return code;
            }
        }
    }

    pub fn issued_count(&self) -> usize {
        self.issued.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[derive(Clone)]
pub struct ManualApproval {
    registry: Arc<ManualCodeRegistry>,
}

impl ManualApproval {
    pub fn new(registry: Arc<ManualCodeRegistry>) -> Self {
        Self { registry }
    }

    /// Generate the code the witness records for the in-person approval.
    pub fn issue_code(&self) -> String {
        self.registry.generate()
    }

    pub fn proof(&self, code: &str) -> Proof {
        Proof::ManualCode {
            code: code.to_string(),
        }
    }
}
