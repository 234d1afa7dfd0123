//! The attestation gate: the fail-closed wrapper around a protected action.
//!
//! The gate owns the session for its whole life and enforces:
//!
//! - the protected action runs only with a record from a `Succeeded` session,
//!   and only after that record is written to the ledger;
//! - abandonment needs two steps (`request_cancel` then `confirm_cancel`),
//!   so a single stray click cannot bypass attestation;
//! - release is single-shot: once the record is handed out the gate is closed;
//! - dropping the gate before release invalidates whatever the session had
//!   outstanding, the same as a confirmed cancel.

use std::sync::Arc;

use tracing::{debug, info, warn};

use attestor_contracts::{
    error::{AttestError, AttestResult},
    identity::{DocumentContext, PhysicianIdentity},
};

use crate::{
    record::AttestationRecord,
    session::{AttestationSession, SessionCommand, SessionServices},
    traits::AttestationLedger,
};

/// Shown to the user before an unfinished attestation is abandoned.
pub const CANCEL_PROMPT: &str =
    "Authentication is mandatory for this request to be legally valid. Cancel anyway?";

/// What a driver wants to do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateIntent {
    Command(SessionCommand),
    Cancel,
}

/// The interactive side of an attestation: a UI, a CLI prompt, a test script.
pub trait SessionDriver {
    /// Decide the next user action given the current session.
    fn next_intent(&mut self, session: &AttestationSession) -> GateIntent;

    /// Surface a retryable failure to the user. The session stays where it was.
    fn notify(&mut self, error: &AttestError);

    /// Ask the user to confirm abandonment. `true` abandons.
    fn confirm_abandon(&mut self, prompt: &str) -> bool;
}

enum GateState {
    Open(AttestationSession),
    CancelRequested(AttestationSession),
    Closed,
}

enum Step {
    Release,
    Intent(GateIntent),
    ConfirmCancel,
    Closed,
}

pub struct AttestationGate {
    state: GateState,
    ledger: Arc<dyn AttestationLedger>,
}

impl AttestationGate {
    /// Open a gate and its session for one document action.
    pub fn open(
        identity: PhysicianIdentity,
        document: DocumentContext,
        services: &SessionServices,
        ledger: Arc<dyn AttestationLedger>,
    ) -> Self {
        let session = AttestationSession::open(identity, document, services);
        Self {
            state: GateState::Open(session),
            ledger,
        }
    }

    /// The wrapped session, while the gate is open.
    pub fn session(&self) -> Option<&AttestationSession> {
        match &self.state {
            GateState::Open(s) | GateState::CancelRequested(s) => Some(s),
            GateState::Closed => None,
        }
    }

    /// Mutable access to the session. Not available while a cancel is pending.
    pub fn session_mut(&mut self) -> Option<&mut AttestationSession> {
        match &mut self.state {
            GateState::Open(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, GateState::Closed)
    }

    pub fn is_cancel_pending(&self) -> bool {
        matches!(self.state, GateState::CancelRequested(_))
    }

    // ── Cancellation ────────────────────────────────────────────────────────

    /// First step of abandonment. Returns the prompt to show.
    pub fn request_cancel(&mut self) -> AttestResult<&'static str> {
        match std::mem::replace(&mut self.state, GateState::Closed) {
            GateState::Open(session) => {
                debug!(session_id = %session.session_id(), "cancel requested; awaiting confirmation");
                self.state = GateState::CancelRequested(session);
                Ok(CANCEL_PROMPT)
            }
            other => {
                self.state = other;
                Err(AttestError::InvalidTransition {
                    reason: "cancel can only be requested on an open gate".to_string(),
                })
            }
        }
    }

    /// The user changed their mind; the session continues where it was.
    pub fn dismiss_cancel(&mut self) {
        if let GateState::CancelRequested(session) = std::mem::replace(&mut self.state, GateState::Closed) {
            self.state = GateState::Open(session);
        }
    }

    /// Second step of abandonment. Tears the session down.
    ///
    /// Returns `UserCancelled` on success. Without a prior `request_cancel`
    /// the gate stays open and `InvalidTransition` is returned.
    pub fn confirm_cancel(&mut self) -> AttestError {
        match std::mem::replace(&mut self.state, GateState::Closed) {
            GateState::CancelRequested(session) => {
                session.abandon();
                AttestError::UserCancelled
            }
            other => {
                self.state = other;
                AttestError::InvalidTransition {
                    reason: "abandonment must be confirmed after a cancel request".to_string(),
                }
            }
        }
    }

    // ── Release ─────────────────────────────────────────────────────────────

    /// Run `action` with the attestation record and close the gate.
    ///
    /// Refuses, without running `action`, unless the session has succeeded.
    /// The record is written to the ledger first; if that fails the action
    /// does not run and the gate stays open for a retry.
    pub fn release<A, T>(&mut self, action: A) -> AttestResult<(T, AttestationRecord)>
    where
        A: FnOnce(&AttestationRecord) -> T,
    {
        let session = match std::mem::replace(&mut self.state, GateState::Closed) {
            GateState::Open(session) if session.is_succeeded() => session,
            other => {
                let reason = match &other {
                    GateState::Open(s) => format!("session is in state {}", s.state().name()),
                    GateState::CancelRequested(_) => "a cancel request is pending".to_string(),
                    GateState::Closed => "gate is closed".to_string(),
                };
                self.state = other;
                warn!(%reason, "protected action blocked: attestation required");
                return Err(AttestError::AttestationRequired { reason });
            }
        };

        if let Err(e) = self.ledger.append(session.record()) {
            warn!(
                record_id = %session.record().record_id(),
                error = %e,
                "ledger write failed; protected action blocked"
            );
            self.state = GateState::Open(session);
            return Err(e);
        }

        let record = session.into_record();
        info!(
            record_id = %record.record_id(),
            document_id = %record.document_id(),
            method = ?record.method(),
            "attestation gate released"
        );
        let output = action(&record);
        Ok((output, record))
    }

    // ── Driven flow ─────────────────────────────────────────────────────────

    /// Drive the session with `driver` until it succeeds or is abandoned,
    /// then run `action` with the record.
    ///
    /// Session failures go to `driver.notify()` and never end the loop.
    /// Returns `UserCancelled` only after the driver confirmed `CANCEL_PROMPT`.
    /// A ledger failure is returned as is and leaves the succeeded session in
    /// the gate, so a later `guard` or `release` retries the write without
    /// re-attesting.
    pub fn guard<A, T>(
        &mut self,
        driver: &mut dyn SessionDriver,
        action: A,
    ) -> AttestResult<(T, AttestationRecord)>
    where
        A: FnOnce(&AttestationRecord) -> T,
    {
        loop {
            let step = match &self.state {
                GateState::Open(session) if session.is_succeeded() => Step::Release,
                GateState::Open(session) => Step::Intent(driver.next_intent(session)),
                GateState::CancelRequested(_) => Step::ConfirmCancel,
                GateState::Closed => Step::Closed,
            };

            match step {
                Step::Release => return self.release(action),
                Step::Intent(GateIntent::Cancel) => {
                    self.request_cancel()?;
                }
                Step::Intent(GateIntent::Command(command)) => {
                    if let Some(session) = self.session_mut() {
                        if let Err(e) = session.apply(command) {
                            debug!(error = %e, retryable = e.is_retryable(), "session command failed");
                            driver.notify(&e);
                        }
                    }
                }
                Step::ConfirmCancel => {
                    if driver.confirm_abandon(CANCEL_PROMPT) {
                        return Err(self.confirm_cancel());
                    }
                    self.dismiss_cancel();
                }
                Step::Closed => {
                    return Err(AttestError::AttestationRequired {
                        reason: "gate is closed".to_string(),
                    })
                }
            }
        }
    }
}
