//! # attestor-core
//!
//! The attestation protocol runtime: a session state machine that drives one
//! of three verification methods to an immutable `AttestationRecord`, and a
//! fail-closed gate that only runs the protected action once that record
//! exists and has been written to the ledger.
//!
//! This crate provides:
//! - The collaborator traits (`DirectoryBackend`, `ChallengeService`,
//!   `ApprovalBackend`, `ClientContextProvider`, `AttestationLedger`, `Clock`)
//! - `AttestationSession` and its pure `transition()` function
//! - `AttestationGate` and the `SessionDriver` trait for interactive flows
//!
//! ## Usage
//!
//! ```rust,ignore
//! use attestor_core::{AttestationGate, SessionServices};
//!
//! let mut gate = AttestationGate::open(identity, document, &services, ledger);
//! let (submitted, record) = gate.guard(&mut driver, |record| submit(document, record))?;
//! ```

pub mod client;
pub mod clock;
pub mod directory;
pub mod gate;
pub mod methods;
pub mod record;
pub mod session;
pub mod traits;

pub use gate::{AttestationGate, GateIntent, SessionDriver, CANCEL_PROMPT};
pub use record::AttestationRecord;
pub use session::{AttestationSession, SessionCommand, SessionServices, SessionState};

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet, VecDeque};
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::{Arc, Mutex};

    use chrono::{DateTime, Duration, TimeZone, Utc};

    use attestor_config::AttestorConfig;
    use attestor_contracts::{
        challenge::{ChallengeHandle, ChallengeId, DeliveryChannel, ValidatedCode},
        client::ClientContext,
        error::{AttestError, AttestResult, ValidationError},
        identity::{DocumentContext, LicenseNumber, PhysicianIdentity},
        method::{ApprovalStatus, ApprovalTicket, AttestationMethod, ConfidenceLevel, Proof},
    };

    use crate::{
        clock::ManualClock,
        directory::{DirectoryEntry, PhysicianDirectory},
        gate::{AttestationGate, GateIntent, SessionDriver},
        record::AttestationRecord,
        session::{
            transition, AttestationSession, MethodProgress, SessionCommand, SessionEvent,
            SessionServices, SessionState,
        },
        traits::{
            ApprovalBackend, AttestationLedger, ChallengeService, ClientContextProvider,
            DirectoryBackend,
        },
    };

    // ── Mock helpers ─────────────────────────────────────────────────────────

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    /// Knows exactly one physician, CRM123, with an email on file.
    struct MockDirectory;

    impl DirectoryBackend for MockDirectory {
        fn fetch(&self, license: &LicenseNumber) -> AttestResult<DirectoryEntry> {
            if license.as_str() == "CRM123" {
                Ok(DirectoryEntry {
                    license: "CRM123".to_string(),
                    name: "Dra. Helena Prado".to_string(),
                    email: Some("helena.prado@clinic.example".to_string()),
                    phone: None,
                })
            } else {
                Err(AttestError::DirectoryLookupFailed {
                    license: license.to_string(),
                    reason: "unknown license".to_string(),
                })
            }
        }
    }

    /// Challenge service that records issued codes and invalidations.
    #[derive(Default)]
    struct MockChallenges {
        codes: Mutex<HashMap<ChallengeId, (String, bool)>>,
        last: Mutex<Option<ChallengeId>>,
        invalidated: Mutex<HashSet<ChallengeId>>,
    }

    impl MockChallenges {
        fn last_code(&self) -> String {
            let id = self.last.lock().unwrap().expect("no challenge issued");
            self.codes.lock().unwrap()[&id].0.clone()
        }
    }

    impl ChallengeService for MockChallenges {
        fn issue(&self, license: &LicenseNumber, channel: DeliveryChannel) -> AttestResult<ChallengeHandle> {
            let id = ChallengeId::new();
            let code = format!("{:06}", 100_000 + self.codes.lock().unwrap().len());
            self.codes.lock().unwrap().insert(id, (code, false));
            *self.last.lock().unwrap() = Some(id);
            Ok(ChallengeHandle {
                id,
                license_number: license.clone(),
                destination_hint: channel.destination_hint(),
                expires_at: start() + Duration::minutes(10),
            })
        }

        fn validate(&self, id: ChallengeId, submitted: &str) -> Result<ValidatedCode, ValidationError> {
            let mut codes = self.codes.lock().unwrap();
            let (code, consumed) = codes.get_mut(&id).ok_or(ValidationError::NotFound)?;
            if *consumed {
                return Err(ValidationError::AlreadyUsed);
            }
            if code != submitted {
                return Err(ValidationError::Mismatch { attempts_remaining: 4 });
            }
            *consumed = true;
            Ok(ValidatedCode {
                challenge_id: id,
                license_number: LicenseNumber::new("CRM123"),
                code: code.clone(),
                validated_at: start(),
            })
        }

        fn invalidate(&self, id: ChallengeId) {
            if let Some(entry) = self.codes.lock().unwrap().get_mut(&id) {
                entry.1 = true;
            }
            self.invalidated.lock().unwrap().insert(id);
        }
    }

    /// Companion backend that answers polls from a script.
    #[derive(Default)]
    struct MockApprovals {
        script: Mutex<VecDeque<ApprovalStatus>>,
        cancelled: Mutex<Vec<ApprovalTicket>>,
    }

    impl MockApprovals {
        fn scripted(statuses: Vec<ApprovalStatus>) -> Self {
            Self {
                script: Mutex::new(statuses.into()),
                cancelled: Mutex::new(vec![]),
            }
        }
    }

    impl ApprovalBackend for MockApprovals {
        fn request(&self, identity: &PhysicianIdentity, document: &DocumentContext) -> AttestResult<ApprovalTicket> {
            Ok(ApprovalTicket(format!("{}:{}", identity.license_number, document.document_id)))
        }

        fn poll(&self, _ticket: &ApprovalTicket) -> AttestResult<ApprovalStatus> {
            Ok(self.script.lock().unwrap().pop_front().unwrap_or(ApprovalStatus::Pending))
        }

        fn cancel(&self, ticket: &ApprovalTicket) {
            self.cancelled.lock().unwrap().push(ticket.clone());
        }
    }

    struct MockClient;

    impl ClientContextProvider for MockClient {
        fn public_ip(&self) -> AttestResult<IpAddr> {
            Ok(IpAddr::V4(Ipv4Addr::new(198, 51, 100, 23)))
        }

        fn user_agent(&self) -> String {
            "ClinicDesk/4.2 (test)".to_string()
        }
    }

    /// Ledger that records appends and can be told to fail.
    #[derive(Default)]
    struct MockLedger {
        records: Mutex<Vec<AttestationRecord>>,
        fail: Mutex<bool>,
    }

    impl AttestationLedger for MockLedger {
        fn append(&self, record: &AttestationRecord) -> AttestResult<()> {
            if *self.fail.lock().unwrap() {
                return Err(AttestError::LedgerWriteFailed {
                    reason: "disk full".to_string(),
                });
            }
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    struct Fixture {
        services: SessionServices,
        challenges: Arc<MockChallenges>,
        approvals: Arc<MockApprovals>,
        ledger: Arc<MockLedger>,
    }

    fn fixture_with(config: AttestorConfig, approvals: MockApprovals) -> Fixture {
        let clock = Arc::new(ManualClock::new(start()));
        let challenges = Arc::new(MockChallenges::default());
        let approvals = Arc::new(approvals);
        let services = SessionServices::new(
            &config,
            PhysicianDirectory::new(Arc::new(MockDirectory), clock.clone()),
            challenges.clone(),
            approvals.clone(),
            Arc::new(MockClient),
            clock,
        );
        Fixture {
            services,
            challenges,
            approvals,
            ledger: Arc::new(MockLedger::default()),
        }
    }

    fn fixture() -> Fixture {
        fixture_with(AttestorConfig::default(), MockApprovals::default())
    }

    fn known() -> PhysicianIdentity {
        PhysicianIdentity::new("CRM123", "Helena Prado")
    }

    fn unknown() -> PhysicianIdentity {
        PhysicianIdentity::new("CRM404", "Dr. Nobody")
    }

    fn document() -> DocumentContext {
        DocumentContext::new("sadt-2026-000123", "prior-authorization")
    }

    fn manual_record() -> AttestationRecord {
        AttestationRecord::new(
            &known(),
            &document(),
            Proof::ManualCode { code: "AB12CD".to_string() },
            ClientContext {
                ip: ClientContext::FALLBACK_IP,
                user_agent: "test".to_string(),
            },
            start(),
        )
    }

    /// A driver that replays a fixed script and records what it was told.
    struct ScriptedDriver {
        intents: VecDeque<GateIntent>,
        confirm_answers: VecDeque<bool>,
        notices: Vec<AttestError>,
        prompts: usize,
    }

    impl ScriptedDriver {
        fn new(intents: Vec<GateIntent>, confirm_answers: Vec<bool>) -> Self {
            Self {
                intents: intents.into(),
                confirm_answers: confirm_answers.into(),
                notices: vec![],
                prompts: 0,
            }
        }
    }

    impl SessionDriver for ScriptedDriver {
        fn next_intent(&mut self, _session: &AttestationSession) -> GateIntent {
            self.intents.pop_front().expect("driver script exhausted")
        }

        fn notify(&mut self, error: &AttestError) {
            self.notices.push(error.clone());
        }

        fn confirm_abandon(&mut self, _prompt: &str) -> bool {
            self.prompts += 1;
            self.confirm_answers.pop_front().unwrap_or(false)
        }
    }

    // ── Pure transitions ─────────────────────────────────────────────────────

    #[test]
    fn verified_cannot_skip_authenticating() {
        let result = transition(&SessionState::MethodSelection, SessionEvent::Verified(manual_record()));
        assert!(matches!(result, Err(AttestError::InvalidTransition { .. })));
    }

    #[test]
    fn back_only_leaves_authenticating() {
        let result = transition(&SessionState::MethodSelection, SessionEvent::Back);
        assert!(matches!(result, Err(AttestError::InvalidTransition { .. })));

        let authenticating = SessionState::Authenticating(MethodProgress::EmailOtp { challenge: None });
        assert_eq!(
            transition(&authenticating, SessionEvent::Back).unwrap(),
            SessionState::MethodSelection
        );
    }

    #[test]
    fn verified_record_must_match_selected_method() {
        let authenticating = SessionState::Authenticating(MethodProgress::EmailOtp { challenge: None });
        let result = transition(&authenticating, SessionEvent::Verified(manual_record()));
        assert!(matches!(result, Err(AttestError::InvalidTransition { .. })));

        let manual = SessionState::Authenticating(MethodProgress::ManualApproval {
            code: "AB12CD".to_string(),
        });
        let next = transition(&manual, SessionEvent::Verified(manual_record())).unwrap();
        assert!(matches!(next, SessionState::Succeeded(_)));
    }

    #[test]
    fn succeeded_is_terminal() {
        let done = SessionState::Succeeded(manual_record());
        for event in [
            SessionEvent::Back,
            SessionEvent::Verified(manual_record()),
            SessionEvent::MethodChosen(MethodProgress::AppApproval { ticket: None }),
        ] {
            assert!(matches!(
                transition(&done, event),
                Err(AttestError::InvalidTransition { .. })
            ));
        }
    }

    // ── Method availability ──────────────────────────────────────────────────

    #[test]
    fn email_otp_unselectable_without_email() {
        let fx = fixture();
        let mut session = AttestationSession::open(unknown(), document(), &fx.services);

        assert!(session.profile().is_degraded());
        let availability = session.available_methods();
        let email = availability
            .iter()
            .find(|a| a.method == AttestationMethod::EmailOtp)
            .unwrap();
        assert!(!email.available);
        assert!(email.reason.as_deref().unwrap().contains("no email"));
        assert!(availability
            .iter()
            .filter(|a| a.method != AttestationMethod::EmailOtp)
            .all(|a| a.available));

        let err = session.select(AttestationMethod::EmailOtp).unwrap_err();
        assert!(matches!(err, AttestError::ChannelUnavailable { .. }));
        assert_eq!(session.state(), &SessionState::MethodSelection);

        session.select(AttestationMethod::AppApproval).unwrap();
        session.back().unwrap();
        session.select(AttestationMethod::ManualApproval).unwrap();
    }

    #[test]
    fn operator_disabled_method_is_unavailable() {
        let config = AttestorConfig::from_toml_str("[methods]\nenabled = [\"email-otp\"]\n").unwrap();
        let fx = fixture_with(config, MockApprovals::default());
        let mut session = AttestationSession::open(known(), document(), &fx.services);

        let err = session.select(AttestationMethod::ManualApproval).unwrap_err();
        match err {
            AttestError::ChannelUnavailable { reason, .. } => assert!(reason.contains("disabled")),
            other => panic!("expected ChannelUnavailable, got {:?}", other),
        }
        session.select(AttestationMethod::EmailOtp).unwrap();
    }

    // ── EmailOTP through the session ─────────────────────────────────────────

    #[test]
    fn wrong_code_keeps_session_authenticating() {
        let fx = fixture();
        let mut session = AttestationSession::open(known(), document(), &fx.services);
        session.select(AttestationMethod::EmailOtp).unwrap();

        let handle = session.request_code().unwrap();
        assert_eq!(handle.destination_hint, "h***@clinic.example");
        assert_eq!(session.challenge(), Some(&handle));

        let err = session.submit_code("000000").unwrap_err();
        assert!(matches!(err, AttestError::ChallengeMismatch { .. }));
        assert_eq!(session.current_method(), Some(AttestationMethod::EmailOtp));
        assert!(!session.is_succeeded());

        session.submit_code(&fx.challenges.last_code()).unwrap();
        assert!(session.is_succeeded());

        let record = session.record();
        assert_eq!(record.method(), AttestationMethod::EmailOtp);
        assert_eq!(record.confidence_level(), ConfidenceLevel::Substantial);
        assert_eq!(record.proof().artifact(), fx.challenges.last_code());
        assert_eq!(record.license_number().as_str(), "CRM123");
        assert_eq!(record.document_id(), "sadt-2026-000123");
        assert_eq!(record.user_agent(), "ClinicDesk/4.2 (test)");
    }

    #[test]
    fn submit_before_request_is_not_found() {
        let fx = fixture();
        let mut session = AttestationSession::open(known(), document(), &fx.services);
        session.select(AttestationMethod::EmailOtp).unwrap();

        assert_eq!(session.submit_code("123456").unwrap_err(), AttestError::ChallengeNotFound);
    }

    #[test]
    fn resend_invalidates_previous_challenge() {
        let fx = fixture();
        let mut session = AttestationSession::open(known(), document(), &fx.services);
        session.select(AttestationMethod::EmailOtp).unwrap();

        let first = session.request_code().unwrap();
        let second = session.resend_code().unwrap();

        assert_ne!(first.id, second.id);
        assert!(fx.challenges.invalidated.lock().unwrap().contains(&first.id));
        assert_eq!(session.challenge().map(|h| h.id), Some(second.id));
    }

    #[test]
    fn back_invalidates_outstanding_challenge() {
        let fx = fixture();
        let mut session = AttestationSession::open(known(), document(), &fx.services);
        session.select(AttestationMethod::EmailOtp).unwrap();
        let handle = session.request_code().unwrap();

        session.back().unwrap();

        assert_eq!(session.state(), &SessionState::MethodSelection);
        assert!(fx.challenges.invalidated.lock().unwrap().contains(&handle.id));
    }

    // ── AppApproval through the session ──────────────────────────────────────

    #[test]
    fn app_approval_waits_for_confirmation() {
        let approvals = MockApprovals::scripted(vec![
            ApprovalStatus::Pending,
            ApprovalStatus::Confirmed {
                session_token: "app-sess-77f1".to_string(),
            },
        ]);
        let fx = fixture_with(AttestorConfig::default(), approvals);
        let mut session = AttestationSession::open(known(), document(), &fx.services);
        session.select(AttestationMethod::AppApproval).unwrap();

        // Polling before requesting is a caller error.
        assert!(matches!(
            session.poll_app_approval(),
            Err(AttestError::InvalidTransition { .. })
        ));

        session.request_app_approval().unwrap();
        assert!(!session.poll_app_approval().unwrap());
        assert!(session.poll_app_approval().unwrap());

        let record = session.record();
        assert_eq!(record.method(), AttestationMethod::AppApproval);
        assert_eq!(record.confidence_level(), ConfidenceLevel::High);
        assert_eq!(
            record.proof(),
            &Proof::AppSessionToken {
                token: "app-sess-77f1".to_string()
            }
        );
    }

    #[test]
    fn app_rejection_stays_authenticating() {
        let approvals = MockApprovals::scripted(vec![ApprovalStatus::Rejected {
            reason: "declined on device".to_string(),
        }]);
        let fx = fixture_with(AttestorConfig::default(), approvals);
        let mut session = AttestationSession::open(known(), document(), &fx.services);
        session.select(AttestationMethod::AppApproval).unwrap();
        session.request_app_approval().unwrap();

        let err = session.poll_app_approval().unwrap_err();
        assert!(matches!(err, AttestError::ApprovalRejected { .. }));
        assert_eq!(session.current_method(), Some(AttestationMethod::AppApproval));

        // Re-requesting withdraws the previous ticket.
        session.request_app_approval().unwrap();
        assert_eq!(fx.approvals.cancelled.lock().unwrap().len(), 1);
    }

    // ── ManualApproval through the session ───────────────────────────────────

    #[test]
    fn manual_approval_produces_low_confidence_record() {
        let fx = fixture();
        let mut session = AttestationSession::open(known(), document(), &fx.services);
        session.select(AttestationMethod::ManualApproval).unwrap();

        let code = session.manual_code().unwrap().to_string();
        session.confirm_manual_approval().unwrap();

        let record = session.record();
        assert_eq!(record.method(), AttestationMethod::ManualApproval);
        assert_eq!(record.proof().artifact(), code);
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        assert!(record.confidence_level() < AttestationMethod::EmailOtp.confidence_level());
        assert!(record.signature_block().contains("CRM123"));
    }

    #[test]
    fn succeeded_session_cannot_produce_second_record() {
        let fx = fixture();
        let mut session = AttestationSession::open(known(), document(), &fx.services);
        session.select(AttestationMethod::ManualApproval).unwrap();
        session.confirm_manual_approval().unwrap();
        let first = session.record().record_id();

        assert!(session.confirm_manual_approval().is_err());
        assert!(session.select(AttestationMethod::ManualApproval).is_err());
        assert!(session.back().is_err());
        assert_eq!(session.record().record_id(), first);
    }

    // ── Persisted records ────────────────────────────────────────────────────

    fn persisted(method: &str, proof: serde_json::Value, confidence: &str) -> serde_json::Value {
        serde_json::json!({
            "record_id": "3b6f0a52-9c1e-4d7a-8f25-61d0e4c9b701",
            "document_id": "sadt-2026-000123",
            "method": method,
            "timestamp": "2026-03-02T09:05:00Z",
            "license_number": "CRM123",
            "physician_name": "Helena Prado",
            "proof": proof,
            "confidence_level": confidence,
            "client_ip": "203.0.113.7",
            "user_agent": "ClinicDesk/4.2"
        })
    }

    #[test]
    fn persisted_record_reloads() {
        let record = manual_record();
        let reloaded: AttestationRecord =
            serde_json::from_value(serde_json::to_value(&record).unwrap()).unwrap();
        assert_eq!(reloaded, record);
    }

    #[test]
    fn proof_from_another_method_is_rejected() {
        let raw = persisted(
            "manual-approval",
            serde_json::json!({ "kind": "app-session-token", "token": "tok-forged" }),
            "high",
        );
        let err = serde_json::from_value::<AttestationRecord>(raw).unwrap_err();
        assert!(err.to_string().contains("inconsistent attestation record"));
    }

    #[test]
    fn inflated_confidence_is_rejected() {
        let raw = persisted(
            "manual-approval",
            serde_json::json!({ "kind": "manual-code", "code": "AB12CD" }),
            "high",
        );
        let err = serde_json::from_value::<AttestationRecord>(raw).unwrap_err();
        assert!(err.to_string().contains("confidence"));

        let honest = persisted(
            "manual-approval",
            serde_json::json!({ "kind": "manual-code", "code": "AB12CD" }),
            "low",
        );
        let record: AttestationRecord = serde_json::from_value(honest).unwrap();
        assert!(record.check_consistency().is_ok());
    }

    #[test]
    #[should_panic(expected = "attestation record read")]
    fn reading_record_before_success_panics() {
        let fx = fixture();
        let session = AttestationSession::open(known(), document(), &fx.services);
        let _ = session.record();
    }

    // ── Gate ─────────────────────────────────────────────────────────────────

    #[test]
    fn gate_refuses_action_before_success() {
        let fx = fixture();
        let mut gate = AttestationGate::open(known(), document(), &fx.services, fx.ledger.clone());
        let mut invoked = false;

        let result = gate.release(|_| invoked = true);

        assert!(matches!(result, Err(AttestError::AttestationRequired { .. })));
        assert!(!invoked, "action must not run without an attestation");
        assert!(fx.ledger.records.lock().unwrap().is_empty());
        assert!(!gate.is_closed());
    }

    #[test]
    fn gate_release_is_single_shot() {
        let fx = fixture();
        let mut gate = AttestationGate::open(known(), document(), &fx.services, fx.ledger.clone());
        {
            let session = gate.session_mut().unwrap();
            session.select(AttestationMethod::ManualApproval).unwrap();
            session.confirm_manual_approval().unwrap();
        }

        let (doc_id, record) = gate.release(|r| r.document_id().to_string()).unwrap();
        assert_eq!(doc_id, "sadt-2026-000123");
        assert_eq!(fx.ledger.records.lock().unwrap().as_slice(), &[record]);
        assert!(gate.is_closed());
        assert!(gate.session().is_none());

        let mut invoked = false;
        assert!(gate.release(|_| invoked = true).is_err());
        assert!(!invoked);
    }

    #[test]
    fn ledger_failure_blocks_action() {
        let fx = fixture();
        *fx.ledger.fail.lock().unwrap() = true;
        let mut gate = AttestationGate::open(known(), document(), &fx.services, fx.ledger.clone());
        {
            let session = gate.session_mut().unwrap();
            session.select(AttestationMethod::ManualApproval).unwrap();
            session.confirm_manual_approval().unwrap();
        }
        let mut invoked = false;

        let result = gate.release(|_| invoked = true);
        assert!(matches!(result, Err(AttestError::LedgerWriteFailed { .. })));
        assert!(!invoked);
        assert!(!gate.is_closed(), "gate stays open so the release can be retried");

        *fx.ledger.fail.lock().unwrap() = false;
        assert!(gate.release(|_| ()).is_ok());
    }

    #[test]
    fn dropped_gate_invalidates_outstanding_challenge() {
        let fx = fixture();
        let mut gate = AttestationGate::open(known(), document(), &fx.services, fx.ledger.clone());
        {
            let session = gate.session_mut().unwrap();
            session.select(AttestationMethod::EmailOtp).unwrap();
            session.request_code().unwrap();
        }
        let issued = fx.challenges.last.lock().unwrap().unwrap();

        drop(gate);

        assert!(fx.challenges.invalidated.lock().unwrap().contains(&issued));
        assert!(fx.ledger.records.lock().unwrap().is_empty());
    }

    #[test]
    fn dropped_session_withdraws_pending_app_request() {
        let fx = fixture();
        let mut session = AttestationSession::open(known(), document(), &fx.services);
        session.select(AttestationMethod::AppApproval).unwrap();
        let ticket = session.request_app_approval().unwrap();

        drop(session);

        assert_eq!(fx.approvals.cancelled.lock().unwrap().as_slice(), &[ticket]);
    }

    #[test]
    fn released_session_leaves_nothing_to_invalidate() {
        let fx = fixture();
        let mut gate = AttestationGate::open(known(), document(), &fx.services, fx.ledger.clone());
        {
            let session = gate.session_mut().unwrap();
            session.select(AttestationMethod::EmailOtp).unwrap();
            session.request_code().unwrap();
            let code = fx.challenges.last_code();
            session.submit_code(&code).unwrap();
        }

        gate.release(|_| ()).unwrap();
        drop(gate);

        assert!(fx.challenges.invalidated.lock().unwrap().is_empty());
    }

    #[test]
    fn abandonment_requires_confirmation() {
        let fx = fixture();
        let mut gate = AttestationGate::open(known(), document(), &fx.services, fx.ledger.clone());

        // Confirming without a request does nothing.
        assert!(matches!(gate.confirm_cancel(), AttestError::InvalidTransition { .. }));
        assert!(!gate.is_closed());

        gate.request_cancel().unwrap();
        assert!(gate.is_cancel_pending());
        assert!(gate.session_mut().is_none());
        gate.dismiss_cancel();
        assert!(gate.session_mut().is_some());

        gate.request_cancel().unwrap();
        assert_eq!(gate.confirm_cancel(), AttestError::UserCancelled);
        assert!(gate.is_closed());
    }

    #[test]
    fn guard_runs_action_after_driven_success() {
        let fx = fixture();
        let mut gate = AttestationGate::open(known(), document(), &fx.services, fx.ledger.clone());
        let mut driver = ScriptedDriver::new(
            vec![
                GateIntent::Command(SessionCommand::Select(AttestationMethod::EmailOtp)),
                GateIntent::Command(SessionCommand::SubmitCode("123456".to_string())),
                GateIntent::Command(SessionCommand::Back),
                GateIntent::Command(SessionCommand::Select(AttestationMethod::ManualApproval)),
                GateIntent::Command(SessionCommand::ConfirmManualApproval),
            ],
            vec![],
        );

        let (output, record) = gate.guard(&mut driver, |r| r.method()).unwrap();

        assert_eq!(output, AttestationMethod::ManualApproval);
        assert_eq!(record.method(), AttestationMethod::ManualApproval);
        // Submitting before requesting a code was surfaced, not fatal.
        assert_eq!(driver.notices, vec![AttestError::ChallengeNotFound]);
        assert_eq!(fx.ledger.records.lock().unwrap().len(), 1);
    }

    #[test]
    fn guard_retries_ledger_write_without_reattesting() {
        let fx = fixture();
        *fx.ledger.fail.lock().unwrap() = true;
        let mut gate = AttestationGate::open(known(), document(), &fx.services, fx.ledger.clone());
        let mut driver = ScriptedDriver::new(
            vec![
                GateIntent::Command(SessionCommand::Select(AttestationMethod::ManualApproval)),
                GateIntent::Command(SessionCommand::ConfirmManualApproval),
            ],
            vec![],
        );
        let mut invoked = false;

        let result = gate.guard(&mut driver, |_| invoked = true);
        assert!(matches!(result, Err(AttestError::LedgerWriteFailed { .. })));
        assert!(!invoked);
        let attested = gate.session().unwrap().record().record_id();

        // The script is spent: a second pass must release without new intents.
        *fx.ledger.fail.lock().unwrap() = false;
        let (_, record) = gate.guard(&mut driver, |_| invoked = true).unwrap();

        assert!(invoked);
        assert_eq!(record.record_id(), attested);
        assert!(gate.is_closed());
        assert_eq!(fx.ledger.records.lock().unwrap().len(), 1);
    }

    #[test]
    fn guard_cancel_needs_confirmation_and_never_runs_action() {
        let fx = fixture();
        let mut gate = AttestationGate::open(known(), document(), &fx.services, fx.ledger.clone());
        let mut driver = ScriptedDriver::new(
            vec![
                GateIntent::Command(SessionCommand::Select(AttestationMethod::EmailOtp)),
                GateIntent::Command(SessionCommand::RequestCode),
                GateIntent::Cancel,
                GateIntent::Cancel,
            ],
            vec![false, true],
        );
        let mut invoked = false;

        let result = gate.guard(&mut driver, |_| invoked = true);

        assert_eq!(result.unwrap_err(), AttestError::UserCancelled);
        assert!(!invoked);
        assert_eq!(driver.prompts, 2);
        assert!(fx.ledger.records.lock().unwrap().is_empty());

        // The in-flight challenge was invalidated on abandonment.
        let last = fx.challenges.last.lock().unwrap().unwrap();
        assert!(fx.challenges.invalidated.lock().unwrap().contains(&last));
    }
}
