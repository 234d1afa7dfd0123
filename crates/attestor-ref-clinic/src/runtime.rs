//! Wiring of real attestor components with the reference adapters.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use chrono::{TimeZone, Utc};

use attestor_audit::InMemoryLedger;
use attestor_challenge::ChallengeRegistry;
use attestor_config::AttestorConfig;
use attestor_contracts::{
    error::AttestResult,
    identity::{DocumentContext, PhysicianIdentity},
};
use attestor_core::{
    clock::ManualClock, directory::PhysicianDirectory, AttestationGate, AttestationSession,
    SessionServices,
};

use crate::{
    adapters::{InMemoryDirectory, Outbox, ScriptedApprovalBackend, SimulatedNetwork, StaticClientContext},
    mock_data,
};

/// Reference clinic configuration.
pub const CLINIC_CONFIG: &str = include_str!("../config/clinic.toml");

/// User agent recorded by the reference clinic workstation.
pub const CLINIC_USER_AGENT: &str = "clinic-desktop/2.4 (reference)";

/// One clinic deployment: configuration, collaborators and a ledger.
///
/// Handles to the adapters are kept so scenarios can read the outbox, script
/// the companion app, move the clock and disturb the network.
pub struct ClinicRuntime {
    pub config: AttestorConfig,
    pub clock: Arc<ManualClock>,
    pub network: Arc<SimulatedNetwork>,
    pub outbox: Arc<Outbox>,
    pub approvals: Arc<ScriptedApprovalBackend>,
    pub registry: Arc<ChallengeRegistry>,
    pub ledger: Arc<InMemoryLedger>,
    pub services: SessionServices,
}

impl ClinicRuntime {
    /// Build a runtime from the bundled `CLINIC_CONFIG`.
    pub fn new() -> AttestResult<Self> {
        Self::with_config(AttestorConfig::from_toml_str(CLINIC_CONFIG)?)
    }

    pub fn with_config(config: AttestorConfig) -> AttestResult<Self> {
        config.validate()?;

        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0)
                .single()
                .unwrap_or_else(Utc::now),
        ));
        let network = Arc::new(SimulatedNetwork::new(config.network.request_timeout()));
        let outbox = Arc::new(Outbox::new(Arc::clone(&network)));
        let approvals = Arc::new(ScriptedApprovalBackend::new(Arc::clone(&network)));
        let registry = Arc::new(ChallengeRegistry::new(
            config.challenge.clone(),
            outbox.clone(),
            clock.clone(),
        ));
        let ledger = Arc::new(InMemoryLedger::new("clinic-ledger"));

        let directory = PhysicianDirectory::new(
            Arc::new(InMemoryDirectory::new(Arc::clone(&network))),
            clock.clone(),
        );
        let client = Arc::new(StaticClientContext::new(
            Some(IpAddr::V4(Ipv4Addr::new(203, 0, 113, 7))),
            CLINIC_USER_AGENT,
        ));

        let services = SessionServices::new(
            &config,
            directory,
            registry.clone(),
            approvals.clone(),
            client,
            clock.clone(),
        );

        Ok(Self {
            config,
            clock,
            network,
            outbox,
            approvals,
            registry,
            ledger,
            services,
        })
    }

    /// The identity the clinic application holds for `license`.
    pub fn physician(&self, license: &str) -> PhysicianIdentity {
        PhysicianIdentity::new(license, mock_data::display_name(license))
    }

    pub fn open_session(&self, license: &str, document: DocumentContext) -> AttestationSession {
        AttestationSession::open(self.physician(license), document, &self.services)
    }

    pub fn open_gate(&self, license: &str, document: DocumentContext) -> AttestationGate {
        AttestationGate::open(
            self.physician(license),
            document,
            &self.services,
            self.ledger.clone(),
        )
    }
}
