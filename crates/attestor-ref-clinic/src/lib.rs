//! # attestor-ref-clinic
//!
//! Clinic reference runtime for the physician attestation protocol.
//!
//! Wires the real session, gate, challenge registry and ledger to in-process
//! adapters and walks through the protocol's main paths:
//!
//! - **A. Expired code**: a correct code submitted after the TTL is refused.
//! - **B. Mistyped code**: mismatch, recovery, and the attempt limit.
//! - **C. Replayed code**: a consumed challenge never validates twice.
//! - **D. Unregistered physician**: directory failure degrades availability.
//! - **E. Manual approval**: witnessed approval with a local code.
//! - **F. Slow network**: request timeouts surface as retryable errors.
//! - **G. Gated submission**: the gate, its cancel prompt and the ledger.
//!
//! All data is hardcoded and fictional. No external calls are made.

pub mod adapters;
pub mod driver;
pub mod mock_data;
pub mod runtime;
pub mod scenarios;

pub use runtime::ClinicRuntime;
