//! Best-effort physician directory resolution.
//!
//! `PhysicianDirectory::resolve` never fails. Whatever goes wrong in the
//! backend (unreachable service, unknown license, an entry for a different
//! license) produces a degraded profile carrying only the caller's input,
//! which in turn makes EmailOTP unavailable for the session.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use attestor_contracts::{
    error::{AttestError, AttestResult},
    identity::{PhysicianContactProfile, PhysicianIdentity},
};

use crate::traits::{Clock, DirectoryBackend};

/// Wire shape of a directory lookup response:
/// `{license, name, email?, phone?}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub license: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl DirectoryEntry {
    /// Parse a directory response body.
    pub fn from_json(body: &str) -> AttestResult<Self> {
        serde_json::from_str(body).map_err(|e| AttestError::DirectoryLookupFailed {
            license: String::new(),
            reason: format!("malformed directory response: {}", e),
        })
    }
}

/// Resolves a physician identity to a contact profile.
#[derive(Clone)]
pub struct PhysicianDirectory {
    backend: Arc<dyn DirectoryBackend>,
    clock: Arc<dyn Clock>,
}

impl PhysicianDirectory {
    pub fn new(backend: Arc<dyn DirectoryBackend>, clock: Arc<dyn Clock>) -> Self {
        Self { backend, clock }
    }

    /// Look up contact channels for `identity`.
    ///
    /// On any failure, returns `PhysicianContactProfile::degraded`.
    pub fn resolve(&self, identity: &PhysicianIdentity) -> PhysicianContactProfile {
        let now = self.clock.now();
        let license = &identity.license_number;

        let entry = match self.backend.fetch(license) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(license = %license, error = %e, "directory lookup failed; degrading profile");
                return PhysicianContactProfile::degraded(identity, now);
            }
        };

        if entry.license.trim() != license.as_str() {
            warn!(
                license = %license,
                returned = %entry.license,
                "directory returned an entry for a different license; degrading profile"
            );
            return PhysicianContactProfile::degraded(identity, now);
        }

        let email = normalize_channel(entry.email).filter(|e| looks_like_email(e));
        let phone = normalize_channel(entry.phone);

        debug!(
            license = %license,
            has_email = email.is_some(),
            has_phone = phone.is_some(),
            "directory lookup resolved"
        );

        PhysicianContactProfile {
            license_number: license.clone(),
            display_name: if entry.name.trim().is_empty() {
                identity.display_name.clone()
            } else {
                entry.name
            },
            email,
            phone,
            resolved_at: now,
        }
    }
}

fn normalize_channel(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn looks_like_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.ends_with('.'),
        None => false,
    }
}
