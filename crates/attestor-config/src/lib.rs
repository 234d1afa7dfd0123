//! # attestor-config
//!
//! Operator configuration for the attestation protocol, read from TOML.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::path::Path;
//! use attestor_config::AttestorConfig;
//!
//! let config = AttestorConfig::from_file(Path::new("attestor.toml"))?;
//! let ttl = config.challenge.ttl();
//! ```
//!
//! Missing sections and keys fall back to their defaults: a 10 minute code
//! TTL, 5 attempts, a 30 second request timeout and all three methods.

pub mod loader;
pub mod settings;

pub use settings::{AttestorConfig, ChallengeSettings, ClientSettings, MethodSettings, NetworkSettings};

// ── Tests ─────────────────────────────────────────────────────────────────────
