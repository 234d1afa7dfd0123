//! Attestation methods, their assurance levels, and proof artifacts.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::challenge::ChallengeId;

/// The three mutually exclusive verification strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttestationMethod {
    /// Out-of-band confirmation in the physician's companion application.
    AppApproval,
    /// A six-digit one-time code sent to the physician's resolved email.
    EmailOtp,
    /// A locally generated code for a physically witnessed approval.
    ManualApproval,
}

impl AttestationMethod {
    /// Every method, in the order they are offered to the user.
    pub const ALL: [AttestationMethod; 3] = [
        AttestationMethod::AppApproval,
        AttestationMethod::EmailOtp,
        AttestationMethod::ManualApproval,
    ];

    /// The assurance a record produced by this method carries.
    pub fn confidence_level(self) -> ConfidenceLevel {
        match self {
            Self::AppApproval => ConfidenceLevel::High,
            Self::EmailOtp => ConfidenceLevel::Substantial,
            Self::ManualApproval => ConfidenceLevel::Low,
        }
    }

    /// Human-readable label used in signature blocks and notifications.
    pub fn label(self) -> &'static str {
        match self {
            Self::AppApproval => "companion app approval",
            Self::EmailOtp => "email one-time code",
            Self::ManualApproval => "witnessed manual approval",
        }
    }
}

impl fmt::Display for AttestationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Level of assurance of an attestation. Ordered: `Low < Substantial < High`.
///
/// `Low` is reserved for in-person approvals that involve no remote channel
/// proof at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConfidenceLevel {
    Low,
    Substantial,
    High,
}

/// The method-specific artifact demonstrating successful verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Proof {
    /// Opaque session token issued by the companion backend on confirmation.
    AppSessionToken { token: String },
    /// The validated one-time code and the challenge it answered.
    OtpCode { challenge_id: ChallengeId, code: String },
    /// The locally generated approval code.
    ManualCode { code: String },
}

impl Proof {
    /// The method that produces this kind of proof.
    pub fn method(&self) -> AttestationMethod {
        match self {
            Self::AppSessionToken { .. } => AttestationMethod::AppApproval,
            Self::OtpCode { .. } => AttestationMethod::EmailOtp,
            Self::ManualCode { .. } => AttestationMethod::ManualApproval,
        }
    }

    /// The raw artifact string.
    pub fn artifact(&self) -> &str {
        match self {
            Self::AppSessionToken { token } => token,
            Self::OtpCode { code, .. } | Self::ManualCode { code } => code,
        }
    }
}

/// Handle for a pending companion-app confirmation request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApprovalTicket(pub String);

impl fmt::Display for ApprovalTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// State of a companion-app confirmation as reported by its backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum ApprovalStatus {
    /// The physician has not answered yet.
    Pending,
    /// The physician confirmed; the backend issued a session token.
    Confirmed { session_token: String },
    /// The physician declined, or the backend expired the request.
    Rejected { reason: String },
}
