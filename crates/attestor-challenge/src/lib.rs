//! # attestor-challenge
//!
//! One-time code challenges for the email OTP method.
//!
//! [`ChallengeRegistry`] implements
//! [`ChallengeService`](attestor_core::traits::ChallengeService): it issues a
//! six-digit code, hands it to a [`CodeDelivery`](attestor_core::traits::CodeDelivery)
//! and keeps only a salted SHA-256 hash of it. Validation is single-use,
//! time-bounded and attempt-limited.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use attestor_challenge::ChallengeRegistry;
//! use attestor_core::clock::SystemClock;
//!
//! let registry = ChallengeRegistry::new(config.challenge.clone(), mailer, Arc::new(SystemClock));
//! // Pass `Arc::new(registry)` to `SessionServices::new(...)`.
//! ```

pub mod code;
pub mod registry;

pub use registry::ChallengeRegistry;

// ── Tests ─────────────────────────────────────────────────────────────────────
