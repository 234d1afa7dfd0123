//! Loading and validating `AttestorConfig` from TOML.

use std::path::Path;

use tracing::{debug, warn};

use attestor_contracts::error::{AttestError, AttestResult};

use crate::settings::{AttestorConfig, ChallengeSettings};

impl AttestorConfig {
    /// Parse `s` as TOML and validate the result.
    ///
    /// Returns `AttestError::ConfigError` if the TOML is malformed, does not
    /// match the expected schema, or fails `validate()`.
    pub fn from_toml_str(s: &str) -> AttestResult<Self> {
        let config: AttestorConfig = toml::from_str(s).map_err(|e| AttestError::ConfigError {
            reason: format!("failed to parse attestor TOML: {}", e),
        })?;
        config.validate()?;
        debug!(
            ttl_secs = config.challenge.ttl_secs,
            max_attempts = config.challenge.max_attempts,
            request_timeout_secs = config.network.request_timeout_secs,
            enabled_methods = ?config.methods.enabled,
            "attestor configuration loaded"
        );
        Ok(config)
    }

    /// Read the file at `path` and parse it as attestor configuration.
    pub fn from_file(path: &Path) -> AttestResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| AttestError::ConfigError {
            reason: format!("failed to read config file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Reject settings under which no attestation could ever succeed.
    pub fn validate(&self) -> AttestResult<()> {
        let fail = |reason: String| {
            warn!(%reason, "rejecting attestor configuration");
            Err(AttestError::ConfigError { reason })
        };

        if self.challenge.ttl_secs == 0 {
            return fail("challenge.ttl_secs must be greater than zero".to_string());
        }
        if self.challenge.ttl_secs > ChallengeSettings::MAX_TTL_SECS {
            return fail(format!(
                "challenge.ttl_secs must not exceed {}",
                ChallengeSettings::MAX_TTL_SECS
            ));
        }
        if self.challenge.max_attempts == 0 {
            return fail("challenge.max_attempts must be at least 1".to_string());
        }
        if self.network.request_timeout_secs == 0 {
            return fail("network.request_timeout_secs must be greater than zero".to_string());
        }
        if self.methods.enabled.is_empty() {
            return fail("methods.enabled must name at least one method".to_string());
        }
        Ok(())
    }
}
