//! Configuration sections.
//!
//! Every section has serde defaults, so an empty TOML document yields the
//! same configuration as `AttestorConfig::default()`.
//!
//! Example:
//! ```toml
//! [challenge]
//! ttl_secs = 600
//! max_attempts = 5
//!
//! [network]
//! request_timeout_secs = 30
//!
//! [methods]
//! enabled = ["app-approval", "email-otp", "manual-approval"]
//!
//! [client]
//! fallback_ip = "127.0.0.1"
//! ```

use std::net::IpAddr;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use attestor_contracts::{client::ClientContext, method::AttestationMethod};

/// One-time challenge lifecycle settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChallengeSettings {
    /// Seconds between issuance and expiry.
    pub ttl_secs: u64,
    /// Failed validations allowed before the challenge is burned.
    pub max_attempts: u32,
}

impl ChallengeSettings {
    /// Longest TTL `validate()` accepts: one day.
    pub const MAX_TTL_SECS: u64 = 86_400;

    /// The TTL as a chrono duration, clamped to `MAX_TTL_SECS`.
    pub fn ttl(&self) -> Duration {
        Duration::seconds(self.ttl_secs.min(Self::MAX_TTL_SECS) as i64)
    }
}

impl Default for ChallengeSettings {
    fn default() -> Self {
        Self {
            ttl_secs: 600,
            max_attempts: 5,
        }
    }
}

/// Settings for round-trips to external collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    /// Request-level timeout, surfaced as a retryable `NetworkError`.
    pub request_timeout_secs: u64,
}

impl NetworkSettings {
    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
        }
    }
}

/// Which attestation methods operators allow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MethodSettings {
    pub enabled: Vec<AttestationMethod>,
}

impl MethodSettings {
    pub fn is_enabled(&self, method: AttestationMethod) -> bool {
        self.enabled.contains(&method)
    }
}

impl Default for MethodSettings {
    fn default() -> Self {
        Self {
            enabled: AttestationMethod::ALL.to_vec(),
        }
    }
}

/// Client-context capture settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// Recorded when the public IP lookup fails.
    pub fallback_ip: IpAddr,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            fallback_ip: ClientContext::FALLBACK_IP,
        }
    }
}

/// The top-level structure deserialized from a TOML configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttestorConfig {
    pub challenge: ChallengeSettings,
    pub network: NetworkSettings,
    pub methods: MethodSettings,
    pub client: ClientSettings,
}
