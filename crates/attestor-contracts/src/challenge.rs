//! One-time challenge types.
//!
//! A `Challenge` is the issuer's private record of an outstanding code. It
//! never holds the code itself, only a salted hash. Callers receive a
//! `ChallengeHandle`, which identifies the challenge and tells the user where
//! the code went and until when it is valid.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::LicenseNumber;

/// Unique identifier for a single issued challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChallengeId(pub uuid::Uuid);

impl ChallengeId {
    /// Create a new, unique challenge ID.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for ChallengeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ChallengeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The out-of-band channel a code is delivered through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "address", rename_all = "kebab-case")]
pub enum DeliveryChannel {
    Email(String),
}

impl DeliveryChannel {
    /// The raw destination address.
    pub fn address(&self) -> &str {
        match self {
            Self::Email(a) => a,
        }
    }

    /// A masked form of the destination, safe to show in notifications.
    ///
    /// `dra.silva@clinic.example` → `d***@clinic.example`.
    pub fn destination_hint(&self) -> String {
        match self {
            Self::Email(address) => match address.split_once('@') {
                Some((local, domain)) => {
                    let first = local.chars().next().map(String::from).unwrap_or_default();
                    format!("{first}***@{domain}")
                }
                None => "***".to_string(),
            },
        }
    }
}

/// The issuer's record of one outstanding code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Challenge {
    pub id: ChallengeId,
    pub license_number: LicenseNumber,
    /// Lowercase hex SHA-256 over (salt, license, code).
    pub code_hash: String,
    /// Per-challenge random salt, hex encoded.
    pub salt: String,
    pub channel: DeliveryChannel,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Number of failed validation attempts so far.
    pub attempts: u32,
    /// Once true, every further validation is rejected.
    pub consumed: bool,
}

impl Challenge {
    /// Return true if `now` is at or past `expires_at`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Unconsumed and unexpired.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        !self.consumed && !self.is_expired(now)
    }

    /// The caller-facing view of this challenge.
    pub fn handle(&self) -> ChallengeHandle {
        ChallengeHandle {
            id: self.id,
            license_number: self.license_number.clone(),
            destination_hint: self.channel.destination_hint(),
            expires_at: self.expires_at,
        }
    }
}

/// What the caller gets back from issuance. Never contains the code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeHandle {
    pub id: ChallengeId,
    pub license_number: LicenseNumber,
    /// Masked destination for the "code sent to …" notification.
    pub destination_hint: String,
    pub expires_at: DateTime<Utc>,
}

/// The result of a successful validation: the code, kept for audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatedCode {
    pub challenge_id: ChallengeId,
    pub license_number: LicenseNumber,
    /// The normalized six-digit code that matched.
    pub code: String,
    pub validated_at: DateTime<Utc>,
}
