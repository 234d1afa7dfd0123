//! Collaborator trait definitions for the attestation protocol.
//!
//! The session and gate never talk to the network, a mail server or a
//! database directly. Every external system sits behind one of these traits:
//!
//! - `DirectoryBackend`: physician directory lookup
//! - `CodeDelivery`: out-of-band OTP delivery
//! - `ChallengeService`: one-time challenge issuance and validation
//! - `ApprovalBackend`: companion-app confirmation
//! - `ClientContextProvider`: public IP and user agent for the record
//! - `AttestationLedger`: persistence of released records
//! - `Clock`: the time every expiry decision is made against

use std::net::IpAddr;

use chrono::{DateTime, Utc};

use attestor_contracts::{
    challenge::{ChallengeHandle, ChallengeId, DeliveryChannel, ValidatedCode},
    error::{AttestResult, ValidationError},
    identity::{DocumentContext, LicenseNumber, PhysicianIdentity},
    method::{ApprovalStatus, ApprovalTicket},
};

use crate::{directory::DirectoryEntry, record::AttestationRecord};

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The physician directory service (`GET physician-directory?license=<id>`).
///
/// Implementations report any failure (unreachable service, unknown license,
/// malformed payload) as an error. The `PhysicianDirectory` resolver turns
/// those errors into a degraded profile; they never reach the session.
pub trait DirectoryBackend: Send + Sync {
    fn fetch(&self, license: &LicenseNumber) -> AttestResult<DirectoryEntry>;
}

/// Out-of-band code delivery (`POST otp/send`).
///
/// This is the only place a plaintext code leaves the challenge issuer.
pub trait CodeDelivery: Send + Sync {
    fn send(
        &self,
        license: &LicenseNumber,
        channel: &DeliveryChannel,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> AttestResult<()>;
}

/// One-time challenge issuance and validation.
///
/// Implementations must guarantee that at most one live challenge exists per
/// license, and that a challenge is consumed by at most one successful
/// validation even under concurrent submits.
pub trait ChallengeService: Send + Sync {
    /// Issue and deliver a fresh code, invalidating any prior live challenge
    /// for the same license. The returned handle never contains the code.
    fn issue(&self, license: &LicenseNumber, channel: DeliveryChannel)
        -> AttestResult<ChallengeHandle>;

    /// Check `submitted` against the challenge, consuming it on success.
    fn validate(&self, id: ChallengeId, submitted: &str) -> Result<ValidatedCode, ValidationError>;

    /// Permanently invalidate a challenge. Unknown ids are ignored.
    fn invalidate(&self, id: ChallengeId);
}

/// The companion application's confirmation backend.
pub trait ApprovalBackend: Send + Sync {
    /// Push a confirmation request to the physician's companion app.
    fn request(
        &self,
        identity: &PhysicianIdentity,
        document: &DocumentContext,
    ) -> AttestResult<ApprovalTicket>;

    /// Ask the backend whether the physician has answered yet.
    fn poll(&self, ticket: &ApprovalTicket) -> AttestResult<ApprovalStatus>;

    /// Withdraw a pending request. Best-effort; errors are swallowed.
    fn cancel(&self, ticket: &ApprovalTicket);
}

/// Client context for the audit fields of an attestation record.
pub trait ClientContextProvider: Send + Sync {
    /// Best-effort public IP lookup.
    fn public_ip(&self) -> AttestResult<IpAddr>;

    fn user_agent(&self) -> String;
}

/// Append-only store for released attestation records.
///
/// The gate writes the record here before the protected action runs. A failed
/// write blocks the action.
pub trait AttestationLedger: Send + Sync {
    fn append(&self, record: &AttestationRecord) -> AttestResult<()>;
}
