//! Physician identity, contact profile, and document context types.
//!
//! A `PhysicianIdentity` is supplied by the caller and never changes during a
//! session. The `PhysicianContactProfile` is what the directory could resolve
//! for that identity, possibly nothing beyond the identity itself.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A professional medical registration number (CRM).
///
/// This is the primary key of a physician throughout the protocol: challenges,
/// directory lookups and attestation records are all keyed on it.
/// Example: LicenseNumber("CRM123")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LicenseNumber(pub String);

impl LicenseNumber {
    /// Construct a license number, trimming surrounding whitespace.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LicenseNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The physician on whose behalf an attestation is requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicianIdentity {
    /// Unique registration number.
    pub license_number: LicenseNumber,
    /// Name as printed on the attested document.
    pub display_name: String,
}

impl PhysicianIdentity {
    pub fn new(license_number: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            license_number: LicenseNumber::new(license_number),
            display_name: display_name.into(),
        }
    }
}

/// Verifiable contact channels resolved for a physician.
///
/// Fields may be absent when the directory lookup failed or the directory
/// holds no such channel. Method availability is derived from this profile:
/// EmailOTP is only selectable when `email` is present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicianContactProfile {
    pub license_number: LicenseNumber,
    /// Name from the directory, or the caller-supplied display name on degradation.
    pub display_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// When the lookup completed (or failed).
    pub resolved_at: DateTime<Utc>,
}

impl PhysicianContactProfile {
    /// A profile carrying only what the caller supplied.
    ///
    /// Used when the directory is unreachable or does not know the license.
    pub fn degraded(identity: &PhysicianIdentity, resolved_at: DateTime<Utc>) -> Self {
        Self {
            license_number: identity.license_number.clone(),
            display_name: identity.display_name.clone(),
            email: None,
            phone: None,
            resolved_at,
        }
    }

    /// Return true if an email channel was resolved.
    pub fn has_email(&self) -> bool {
        self.email.is_some()
    }

    /// Return true if no contact channel at all was resolved.
    pub fn is_degraded(&self) -> bool {
        self.email.is_none() && self.phone.is_none()
    }
}

/// The document whose authorization is being attested.
///
/// The attestation session never inspects the document; it only carries the
/// id into the final record so the two can be stored together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentContext {
    /// Identifier of the authorized document (e.g. "sadt-2026-000123").
    pub document_id: String,
    /// Free-form kind of request (e.g. "prior-authorization", "exam-request").
    pub kind: String,
}

impl DocumentContext {
    pub fn new(document_id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            kind: kind.into(),
        }
    }
}
