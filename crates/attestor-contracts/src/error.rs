//! Error types for the attestation protocol.
//!
//! All fallible operations return `AttestResult<T>`. `ValidationError` is the
//! narrower outcome of checking a code against a challenge; it converts into
//! the matching `AttestError` variant.

use thiserror::Error;

use crate::method::AttestationMethod;

/// The unified error type for the attestation protocol.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttestError {
    /// The physician directory could not be reached or did not know the license.
    ///
    /// Non-fatal: the session degrades method availability instead.
    #[error("directory lookup failed for license '{license}': {reason}")]
    DirectoryLookupFailed { license: String, reason: String },

    /// The selected method needs a channel this physician does not have.
    #[error("{method} is unavailable: {reason}")]
    ChannelUnavailable { method: AttestationMethod, reason: String },

    #[error("challenge has expired; request a new code")]
    ChallengeExpired,

    #[error("challenge was already used")]
    ChallengeAlreadyUsed,

    #[error("code does not match ({attempts_remaining} attempt(s) remaining)")]
    ChallengeMismatch { attempts_remaining: u32 },

    #[error("no such challenge")]
    ChallengeNotFound,

    /// Too many wrong codes; the challenge was burned and must be re-issued.
    #[error("too many failed attempts; request a new code")]
    ChallengeAttemptsExhausted,

    /// Any failed round-trip to an external collaborator.
    #[error("network error during {operation}: {reason}")]
    NetworkError {
        operation: String,
        reason: String,
        /// True when the request-level timeout elapsed.
        timed_out: bool,
    },

    /// The companion app reported that the physician declined.
    #[error("approval was rejected: {reason}")]
    ApprovalRejected { reason: String },

    /// The user confirmed abandonment of a mandatory attestation.
    #[error("attestation cancelled by user")]
    UserCancelled,

    /// The protected action was attempted without a successful attestation.
    #[error("attestation required: {reason}")]
    AttestationRequired { reason: String },

    /// A command was issued that the current session state does not accept.
    #[error("invalid session transition: {reason}")]
    InvalidTransition { reason: String },

    /// The attestation ledger could not persist a record.
    ///
    /// Fatal for the gated action: an unrecorded attestation releases nothing.
    #[error("attestation ledger write failed: {reason}")]
    LedgerWriteFailed { reason: String },

    /// A record whose method, proof and confidence level disagree.
    #[error("inconsistent attestation record: {reason}")]
    InvalidRecord { reason: String },

    #[error("configuration error: {reason}")]
    ConfigError { reason: String },
}

impl AttestError {
    /// Return true if the user can retry within the same method.
    ///
    /// Retryable errors keep the session in `Authenticating`.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ChallengeExpired
                | Self::ChallengeAlreadyUsed
                | Self::ChallengeMismatch { .. }
                | Self::ChallengeNotFound
                | Self::ChallengeAttemptsExhausted
                | Self::NetworkError { .. }
                | Self::ApprovalRejected { .. }
                | Self::DirectoryLookupFailed { .. }
        )
    }
}

/// Convenience alias used throughout the attestor crates.
pub type AttestResult<T> = Result<T, AttestError>;

/// Outcome of a rejected code validation, in check order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("challenge not found")]
    NotFound,
    #[error("challenge already used")]
    AlreadyUsed,
    #[error("challenge expired")]
    Expired,
    #[error("code mismatch")]
    Mismatch { attempts_remaining: u32 },
    #[error("attempts exhausted")]
    AttemptsExhausted,
}

impl From<ValidationError> for AttestError {
    fn from(e: ValidationError) -> Self {
        match e {
            ValidationError::NotFound => Self::ChallengeNotFound,
            ValidationError::AlreadyUsed => Self::ChallengeAlreadyUsed,
            ValidationError::Expired => Self::ChallengeExpired,
            ValidationError::Mismatch { attempts_remaining } => {
                Self::ChallengeMismatch { attempts_remaining }
            }
            ValidationError::AttemptsExhausted => Self::ChallengeAttemptsExhausted,
        }
    }
}
