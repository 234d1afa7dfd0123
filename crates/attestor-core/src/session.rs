//! The attestation session state machine.
//!
//! ```text
//!   MethodSelection ──MethodChosen──▶ Authenticating(method) ──Verified──▶ Succeeded(record)
//!          ▲                                   │
//!          └────────────────Back───────────────┘
//! ```
//!
//! `transition()` is a pure function of `(state, event)`. `AttestationSession`
//! performs the side effects (directory lookup, code delivery, backend polls)
//! and feeds their results into `transition()` as events. Failures inside
//! `Authenticating` are returned to the caller and leave the state unchanged,
//! so the user can retry the same method.
//!
//! No path reaches `Succeeded` without passing through `Authenticating`, and
//! `Succeeded` accepts no further events.

use std::net::IpAddr;
use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use attestor_config::{AttestorConfig, MethodSettings};
use attestor_contracts::{
    challenge::{ChallengeHandle, ChallengeId},
    error::{AttestError, AttestResult},
    identity::{DocumentContext, PhysicianContactProfile, PhysicianIdentity},
    method::{ApprovalTicket, AttestationMethod, Proof},
};

use crate::{
    client::capture_client_context,
    directory::PhysicianDirectory,
    methods::{AppApproval, AppApprovalOutcome, EmailOtp, ManualApproval, ManualCodeRegistry},
    record::AttestationRecord,
    traits::{ApprovalBackend, ChallengeService, ClientContextProvider, Clock},
};

// ── State and events ─────────────────────────────────────────────────────────

/// What the selected method has outstanding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodProgress {
    AppApproval { ticket: Option<ApprovalTicket> },
    EmailOtp { challenge: Option<ChallengeHandle> },
    ManualApproval { code: String },
}

impl MethodProgress {
    pub fn method(&self) -> AttestationMethod {
        match self {
            Self::AppApproval { .. } => AttestationMethod::AppApproval,
            Self::EmailOtp { .. } => AttestationMethod::EmailOtp,
            Self::ManualApproval { .. } => AttestationMethod::ManualApproval,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    MethodSelection,
    Authenticating(MethodProgress),
    Succeeded(AttestationRecord),
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::MethodSelection => "MethodSelection",
            Self::Authenticating(_) => "Authenticating",
            Self::Succeeded(_) => "Succeeded",
        }
    }
}

/// Inputs to `transition()`.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    MethodChosen(MethodProgress),
    ChallengeIssued(ChallengeHandle),
    ApprovalRequested(ApprovalTicket),
    Verified(AttestationRecord),
    Back,
}

impl SessionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::MethodChosen(_) => "MethodChosen",
            Self::ChallengeIssued(_) => "ChallengeIssued",
            Self::ApprovalRequested(_) => "ApprovalRequested",
            Self::Verified(_) => "Verified",
            Self::Back => "Back",
        }
    }
}

/// Compute the next state. Pure: no I/O, no clock, no logging.
pub fn transition(state: &SessionState, event: SessionEvent) -> AttestResult<SessionState> {
    use SessionState::*;

    match (state, event) {
        (Succeeded(_), event) => Err(AttestError::InvalidTransition {
            reason: format!(
                "session already succeeded and cannot accept {}",
                event.name()
            ),
        }),

        (MethodSelection, SessionEvent::MethodChosen(progress)) => Ok(Authenticating(progress)),

        (Authenticating(_), SessionEvent::Back) => Ok(MethodSelection),

        (Authenticating(MethodProgress::EmailOtp { .. }), SessionEvent::ChallengeIssued(handle)) => {
            Ok(Authenticating(MethodProgress::EmailOtp {
                challenge: Some(handle),
            }))
        }

        (
            Authenticating(MethodProgress::AppApproval { .. }),
            SessionEvent::ApprovalRequested(ticket),
        ) => Ok(Authenticating(MethodProgress::AppApproval {
            ticket: Some(ticket),
        })),

        (Authenticating(progress), SessionEvent::Verified(record))
            if record.method() == progress.method() =>
        {
            Ok(Succeeded(record))
        }

        (state, event) => Err(AttestError::InvalidTransition {
            reason: format!("{} does not accept {}", state.name(), event.name()),
        }),
    }
}

// ── Commands ─────────────────────────────────────────────────────────────────

/// A user action a driver can feed into a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Select(AttestationMethod),
    Back,
    RequestCode,
    ResendCode,
    SubmitCode(String),
    RequestAppApproval,
    PollAppApproval,
    ConfirmManualApproval,
}

/// Whether a method can be selected, and why not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodAvailability {
    pub method: AttestationMethod,
    pub available: bool,
    pub reason: Option<String>,
}

// ── Services ─────────────────────────────────────────────────────────────────

/// Everything a session needs from the outside world.
///
/// Cheap to clone; build once per process and open many sessions from it.
#[derive(Clone)]
pub struct SessionServices {
    pub directory: PhysicianDirectory,
    pub challenges: Arc<dyn ChallengeService>,
    pub approvals: Arc<dyn ApprovalBackend>,
    pub manual_codes: Arc<ManualCodeRegistry>,
    pub client: Arc<dyn ClientContextProvider>,
    pub clock: Arc<dyn Clock>,
    pub methods: MethodSettings,
    pub fallback_ip: IpAddr,
}

impl SessionServices {
    pub fn new(
        config: &AttestorConfig,
        directory: PhysicianDirectory,
        challenges: Arc<dyn ChallengeService>,
        approvals: Arc<dyn ApprovalBackend>,
        client: Arc<dyn ClientContextProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            directory,
            challenges,
            approvals,
            manual_codes: Arc::new(ManualCodeRegistry::new()),
            client,
            clock,
            methods: config.methods.clone(),
            fallback_ip: config.client.fallback_ip,
        }
    }
}

// ── Session ──────────────────────────────────────────────────────────────────

/// One attestation attempt for one document action.
pub struct AttestationSession {
    session_id: Uuid,
    identity: PhysicianIdentity,
    document: DocumentContext,
    profile: PhysicianContactProfile,
    state: SessionState,
    email_otp: EmailOtp,
    app_approval: AppApproval,
    manual_approval: ManualApproval,
    client: Arc<dyn ClientContextProvider>,
    clock: Arc<dyn Clock>,
    methods: MethodSettings,
    fallback_ip: IpAddr,
}

impl AttestationSession {
    /// Open a session and resolve the physician's contact channels.
    pub fn open(identity: PhysicianIdentity, document: DocumentContext, services: &SessionServices) -> Self {
        let profile = services.directory.resolve(&identity);
        let session_id = Uuid::new_v4();

        info!(
            session_id = %session_id,
            license = %identity.license_number,
            document_id = %document.document_id,
            degraded = profile.is_degraded(),
            "attestation session opened"
        );

        Self {
            session_id,
            identity,
            document,
            profile,
            state: SessionState::MethodSelection,
            email_otp: EmailOtp::new(Arc::clone(&services.challenges)),
            app_approval: AppApproval::new(Arc::clone(&services.approvals)),
            manual_approval: ManualApproval::new(Arc::clone(&services.manual_codes)),
            client: Arc::clone(&services.client),
            clock: Arc::clone(&services.clock),
            methods: services.methods.clone(),
            fallback_ip: services.fallback_ip,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn identity(&self) -> &PhysicianIdentity {
        &self.identity
    }

    pub fn document(&self) -> &DocumentContext {
        &self.document
    }

    pub fn profile(&self) -> &PhysicianContactProfile {
        &self.profile
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_succeeded(&self) -> bool {
        matches!(self.state, SessionState::Succeeded(_))
    }

    /// The method currently being authenticated, if any.
    pub fn current_method(&self) -> Option<AttestationMethod> {
        match &self.state {
            SessionState::Authenticating(progress) => Some(progress.method()),
            SessionState::Succeeded(record) => Some(record.method()),
            SessionState::MethodSelection => None,
        }
    }

    /// The outstanding email challenge, if one was issued.
    pub fn challenge(&self) -> Option<&ChallengeHandle> {
        match &self.state {
            SessionState::Authenticating(MethodProgress::EmailOtp { challenge }) => challenge.as_ref(),
            _ => None,
        }
    }

    /// The manual approval code to show the witness.
    pub fn manual_code(&self) -> Option<&str> {
        match &self.state {
            SessionState::Authenticating(MethodProgress::ManualApproval { code }) => Some(code),
            _ => None,
        }
    }

    /// The record of a succeeded session.
    ///
    /// # Panics
    ///
    /// Panics if the session has not reached `Succeeded`. Callers must check
    /// `is_succeeded()` first; reaching this panic means the gate's
    /// invariant was bypassed.
    pub fn record(&self) -> &AttestationRecord {
        match &self.state {
            SessionState::Succeeded(record) => record,
            other => panic!(
                "attestation record read from session {} in state {}",
                self.session_id,
                other.name()
            ),
        }
    }

    /// Consume the session and return its record.
    ///
    /// # Panics
    ///
    /// Same condition as `record()`.
    pub fn into_record(mut self) -> AttestationRecord {
        match std::mem::replace(&mut self.state, SessionState::MethodSelection) {
            SessionState::Succeeded(record) => record,
            other => panic!(
                "attestation record taken from session {} in state {}",
                self.session_id,
                other.name()
            ),
        }
    }

    // ── Method availability ─────────────────────────────────────────────────

    /// Check whether `method` can be selected for this physician.
    pub fn check_available(&self, method: AttestationMethod) -> AttestResult<()> {
        if !self.methods.is_enabled(method) {
            return Err(AttestError::ChannelUnavailable {
                method,
                reason: "disabled by operator configuration".to_string(),
            });
        }
        if method == AttestationMethod::EmailOtp && !self.profile.has_email() {
            return Err(AttestError::ChannelUnavailable {
                method,
                reason: "no email address resolved for this license".to_string(),
            });
        }
        Ok(())
    }

    /// Availability of every method, in display order.
    pub fn available_methods(&self) -> Vec<MethodAvailability> {
        AttestationMethod::ALL
            .iter()
            .map(|&method| match self.check_available(method) {
                Ok(()) => MethodAvailability {
                    method,
                    available: true,
                    reason: None,
                },
                Err(e) => MethodAvailability {
                    method,
                    available: false,
                    reason: Some(e.to_string()),
                },
            })
            .collect()
    }

    // ── Navigation ──────────────────────────────────────────────────────────

    /// Choose a method. Only valid in `MethodSelection`.
    pub fn select(&mut self, method: AttestationMethod) -> AttestResult<()> {
        if !matches!(self.state, SessionState::MethodSelection) {
            return Err(AttestError::InvalidTransition {
                reason: format!("cannot select a method in state {}", self.state.name()),
            });
        }
        self.check_available(method)?;

        let progress = match method {
            AttestationMethod::AppApproval => MethodProgress::AppApproval { ticket: None },
            AttestationMethod::EmailOtp => MethodProgress::EmailOtp { challenge: None },
            AttestationMethod::ManualApproval => MethodProgress::ManualApproval {
                code: self.manual_approval.issue_code(),
            },
        };

        self.apply_event(SessionEvent::MethodChosen(progress))?;
        debug!(session_id = %self.session_id, method = ?method, "method selected");
        Ok(())
    }

    /// Return to method selection, releasing anything outstanding.
    pub fn back(&mut self) -> AttestResult<()> {
        if !matches!(self.state, SessionState::Authenticating(_)) {
            return Err(AttestError::InvalidTransition {
                reason: format!("cannot go back from state {}", self.state.name()),
            });
        }
        self.release_outstanding();
        self.apply_event(SessionEvent::Back)?;
        debug!(session_id = %self.session_id, "returned to method selection");
        Ok(())
    }

    /// Tear the session down without a record.
    ///
    /// Invalidates an outstanding email challenge and withdraws a pending
    /// companion-app request. Dropping a session mid-authentication does the
    /// same, without the warning.
    pub fn abandon(mut self) {
        self.release_outstanding();
        self.state = SessionState::MethodSelection;
        warn!(
            session_id = %self.session_id,
            license = %self.identity.license_number,
            document_id = %self.document.document_id,
            "attestation session abandoned"
        );
    }

    // ── EmailOTP ────────────────────────────────────────────────────────────

    /// Send a code to the resolved email.
    ///
    /// If a code was already sent this behaves like `resend_code()`.
    pub fn request_code(&mut self) -> AttestResult<ChallengeHandle> {
        let current = self.email_progress()?;
        let email = self.resolved_email()?;
        let handle = match current {
            Some(id) => self.email_otp.resend(Some(id), &self.identity.license_number, &email)?,
            None => self.email_otp.request_code(&self.identity.license_number, &email)?,
        };
        self.apply_event(SessionEvent::ChallengeIssued(handle.clone()))?;
        Ok(handle)
    }

    /// Discard the current code and send a new one.
    pub fn resend_code(&mut self) -> AttestResult<ChallengeHandle> {
        let current = self.email_progress()?;
        let email = self.resolved_email()?;
        let handle = self
            .email_otp
            .resend(current, &self.identity.license_number, &email)?;
        self.apply_event(SessionEvent::ChallengeIssued(handle.clone()))?;
        Ok(handle)
    }

    /// Submit the code the physician received.
    pub fn submit_code(&mut self, code: &str) -> AttestResult<()> {
        let challenge = self.email_progress()?.ok_or(AttestError::ChallengeNotFound)?;
        let proof = self.email_otp.submit_code(challenge, code)?;
        self.succeed(proof)
    }

    // ── AppApproval ─────────────────────────────────────────────────────────

    /// Push a confirmation request to the companion app.
    ///
    /// A request already pending is withdrawn first.
    pub fn request_app_approval(&mut self) -> AttestResult<ApprovalTicket> {
        let current = self.app_progress()?;
        if let Some(ticket) = current {
            self.app_approval.cancel(&ticket);
        }
        let ticket = self.app_approval.request(&self.identity, &self.document)?;
        self.apply_event(SessionEvent::ApprovalRequested(ticket.clone()))?;
        Ok(ticket)
    }

    /// Ask the backend for an answer. Returns `true` once the session succeeded.
    pub fn poll_app_approval(&mut self) -> AttestResult<bool> {
        let ticket = self.app_progress()?.ok_or_else(|| AttestError::InvalidTransition {
            reason: "no companion app approval has been requested".to_string(),
        })?;
        match self.app_approval.poll(&ticket)? {
            AppApprovalOutcome::Pending => Ok(false),
            AppApprovalOutcome::Confirmed(proof) => {
                self.succeed(proof)?;
                Ok(true)
            }
        }
    }

    // ── ManualApproval ──────────────────────────────────────────────────────

    /// Record that the witnessed in-person approval took place.
    pub fn confirm_manual_approval(&mut self) -> AttestResult<()> {
        let code = match &self.state {
            SessionState::Authenticating(MethodProgress::ManualApproval { code }) => code.clone(),
            other => {
                return Err(AttestError::InvalidTransition {
                    reason: format!("manual approval is not in progress (state {})", other.name()),
                })
            }
        };
        let proof = self.manual_approval.proof(&code);
        self.succeed(proof)
    }

    // ── Dispatch ────────────────────────────────────────────────────────────

    /// Apply a driver command.
    pub fn apply(&mut self, command: SessionCommand) -> AttestResult<()> {
        match command {
            SessionCommand::Select(method) => self.select(method),
            SessionCommand::Back => self.back(),
            SessionCommand::RequestCode => self.request_code().map(|_| ()),
            SessionCommand::ResendCode => self.resend_code().map(|_| ()),
            SessionCommand::SubmitCode(code) => self.submit_code(&code),
            SessionCommand::RequestAppApproval => self.request_app_approval().map(|_| ()),
            SessionCommand::PollAppApproval => self.poll_app_approval().map(|_| ()),
            SessionCommand::ConfirmManualApproval => self.confirm_manual_approval(),
        }
    }

    // ── Internal helpers ────────────────────────────────────────────────────

    fn apply_event(&mut self, event: SessionEvent) -> AttestResult<()> {
        self.state = transition(&self.state, event)?;
        Ok(())
    }

    fn succeed(&mut self, proof: Proof) -> AttestResult<()> {
        let client = capture_client_context(self.client.as_ref(), self.fallback_ip);
        let record = AttestationRecord::new(&self.identity, &self.document, proof, client, self.clock.now());

        self.apply_event(SessionEvent::Verified(record.clone()))?;

        info!(
            session_id = %self.session_id,
            record_id = %record.record_id(),
            license = %record.license_number(),
            method = ?record.method(),
            confidence = ?record.confidence_level(),
            "attestation succeeded"
        );
        Ok(())
    }

    fn email_progress(&self) -> AttestResult<Option<ChallengeId>> {
        match &self.state {
            SessionState::Authenticating(MethodProgress::EmailOtp { challenge }) => {
                Ok(challenge.as_ref().map(|h| h.id))
            }
            other => Err(AttestError::InvalidTransition {
                reason: format!("email code flow is not in progress (state {})", other.name()),
            }),
        }
    }

    fn app_progress(&self) -> AttestResult<Option<ApprovalTicket>> {
        match &self.state {
            SessionState::Authenticating(MethodProgress::AppApproval { ticket }) => Ok(ticket.clone()),
            other => Err(AttestError::InvalidTransition {
                reason: format!("companion app approval is not in progress (state {})", other.name()),
            }),
        }
    }

    fn resolved_email(&self) -> AttestResult<String> {
        self.profile
            .email
            .clone()
            .ok_or_else(|| AttestError::ChannelUnavailable {
                method: AttestationMethod::EmailOtp,
                reason: "no email address resolved for this license".to_string(),
            })
    }

    fn release_outstanding(&mut self) {
        match &self.state {
            SessionState::Authenticating(MethodProgress::EmailOtp {
                challenge: Some(handle),
            }) => self.email_otp.cancel(handle.id),
            SessionState::Authenticating(MethodProgress::AppApproval {
                ticket: Some(ticket),
            }) => self.app_approval.cancel(ticket),
            _ => {}
        }
    }
}

impl Drop for AttestationSession {
    fn drop(&mut self) {
        if matches!(self.state, SessionState::Authenticating(_)) {
            debug!(session_id = %self.session_id, "session dropped mid-authentication; releasing outstanding work");
            self.release_outstanding();
        }
    }
}
