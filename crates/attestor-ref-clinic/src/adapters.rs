//! In-process stand-ins for the clinic's external collaborators.
//!
//! Every adapter routes through a shared [`SimulatedNetwork`], so scenarios
//! can make the directory, the mail relay or the companion backend slow or
//! unreachable and watch the session surface a retryable error.

use std::collections::VecDeque;
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use attestor_contracts::{
    challenge::DeliveryChannel,
    error::{AttestError, AttestResult},
    identity::{DocumentContext, LicenseNumber, PhysicianIdentity},
    method::{ApprovalStatus, ApprovalTicket},
};
use attestor_core::{
    directory::DirectoryEntry,
    traits::{ApprovalBackend, ClientContextProvider, CodeDelivery, DirectoryBackend},
};

use crate::mock_data;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

// ── Network simulation ───────────────────────────────────────────────────────

/// Latency and reachability shared by every reference adapter.
///
/// A round-trip whose latency exceeds the request timeout fails with
/// `NetworkError { timed_out: true }`. Nothing actually sleeps.
#[derive(Debug)]
pub struct SimulatedNetwork {
    timeout: Duration,
    latency: Mutex<Duration>,
    offline: AtomicBool,
}

impl SimulatedNetwork {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            latency: Mutex::new(Duration::from_millis(120)),
            offline: AtomicBool::new(false),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn set_latency(&self, latency: Duration) {
        *lock(&self.latency) = latency;
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Simulate one request for `operation`.
    pub fn round_trip(&self, operation: &str) -> AttestResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(AttestError::NetworkError {
                operation: operation.to_string(),
                reason: "host unreachable".to_string(),
                timed_out: false,
            });
        }
        let latency = *lock(&self.latency);
        if latency > self.timeout {
            warn!(operation, latency_ms = latency.as_millis() as u64, "request timed out");
            return Err(AttestError::NetworkError {
                operation: operation.to_string(),
                reason: format!("no response within {}s", self.timeout.as_secs()),
                timed_out: true,
            });
        }
        Ok(())
    }
}

// ── Directory ────────────────────────────────────────────────────────────────

/// Serves `mock_data::directory_response` as if it came over HTTP.
pub struct InMemoryDirectory {
    network: Arc<SimulatedNetwork>,
}

impl InMemoryDirectory {
    pub fn new(network: Arc<SimulatedNetwork>) -> Self {
        Self { network }
    }
}

impl DirectoryBackend for InMemoryDirectory {
    fn fetch(&self, license: &LicenseNumber) -> AttestResult<DirectoryEntry> {
        self.network.round_trip("physician-directory")?;

        let body = mock_data::directory_response(license.as_str()).ok_or_else(|| {
            AttestError::DirectoryLookupFailed {
                license: license.to_string(),
                reason: "license not registered".to_string(),
            }
        })?;

        DirectoryEntry::from_json(&body.to_string()).map_err(|e| match e {
            AttestError::DirectoryLookupFailed { reason, .. } => AttestError::DirectoryLookupFailed {
                license: license.to_string(),
                reason,
            },
            other => other,
        })
    }
}

// ── Code delivery ────────────────────────────────────────────────────────────

/// A message the outbox accepted for delivery.
#[derive(Debug, Clone, Serialize)]
pub struct OutboxMessage {
    pub license: LicenseNumber,
    pub channel: DeliveryChannel,
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

/// Mail relay stand-in. Keeps every accepted message so the scenarios can
/// play the physician reading their inbox.
pub struct Outbox {
    network: Arc<SimulatedNetwork>,
    sent: Mutex<Vec<OutboxMessage>>,
}

impl Outbox {
    pub fn new(network: Arc<SimulatedNetwork>) -> Self {
        Self {
            network,
            sent: Mutex::new(Vec::new()),
        }
    }

    /// The most recent code delivered to `license`.
    pub fn last_code_for(&self, license: &LicenseNumber) -> Option<String> {
        lock(&self.sent)
            .iter()
            .rev()
            .find(|m| &m.license == license)
            .map(|m| m.code.clone())
    }

    pub fn messages(&self) -> Vec<OutboxMessage> {
        lock(&self.sent).clone()
    }
}

impl CodeDelivery for Outbox {
    fn send(
        &self,
        license: &LicenseNumber,
        channel: &DeliveryChannel,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> AttestResult<()> {
        self.network.round_trip("otp/send")?;
        lock(&self.sent).push(OutboxMessage {
            license: license.clone(),
            channel: channel.clone(),
            code: code.to_string(),
            expires_at,
        });
        debug!(license = %license, destination = %channel.destination_hint(), "code accepted by mail relay");
        Ok(())
    }
}

// ── Companion app ────────────────────────────────────────────────────────────

/// Companion-app backend that answers polls from a script.
///
/// Each `poll` pops the next scripted status; an empty script answers
/// `Pending`, as a physician who has not looked at their phone yet.
pub struct ScriptedApprovalBackend {
    network: Arc<SimulatedNetwork>,
    script: Mutex<VecDeque<ApprovalStatus>>,
    requested: Mutex<Vec<ApprovalTicket>>,
    cancelled: Mutex<Vec<ApprovalTicket>>,
}

impl ScriptedApprovalBackend {
    pub fn new(network: Arc<SimulatedNetwork>) -> Self {
        Self {
            network,
            script: Mutex::new(VecDeque::new()),
            requested: Mutex::new(Vec::new()),
            cancelled: Mutex::new(Vec::new()),
        }
    }

    /// Queue the physician's next answer.
    pub fn push(&self, status: ApprovalStatus) {
        lock(&self.script).push_back(status);
    }

    pub fn requested(&self) -> Vec<ApprovalTicket> {
        lock(&self.requested).clone()
    }

    pub fn cancelled(&self) -> Vec<ApprovalTicket> {
        lock(&self.cancelled).clone()
    }
}

impl ApprovalBackend for ScriptedApprovalBackend {
    fn request(&self, identity: &PhysicianIdentity, document: &DocumentContext) -> AttestResult<ApprovalTicket> {
        self.network.round_trip("app-approval/request")?;
        let ticket = ApprovalTicket(format!("APP-{}", Uuid::new_v4()));
        lock(&self.requested).push(ticket.clone());
        info!(
            license = %identity.license_number,
            document_id = %document.document_id,
            ticket = %ticket,
            "approval pushed to companion app"
        );
        Ok(ticket)
    }

    fn poll(&self, ticket: &ApprovalTicket) -> AttestResult<ApprovalStatus> {
        self.network.round_trip("app-approval/poll")?;
        if lock(&self.cancelled).contains(ticket) {
            return Ok(ApprovalStatus::Rejected {
                reason: "request was withdrawn".to_string(),
            });
        }
        Ok(lock(&self.script).pop_front().unwrap_or(ApprovalStatus::Pending))
    }

    fn cancel(&self, ticket: &ApprovalTicket) {
        debug!(ticket = %ticket, "approval request withdrawn");
        lock(&self.cancelled).push(ticket.clone());
    }
}

// ── Client context ───────────────────────────────────────────────────────────

/// Fixed client context. `ip = None` simulates a failed public IP lookup.
pub struct StaticClientContext {
    ip: Option<IpAddr>,
    user_agent: String,
}

impl StaticClientContext {
    pub fn new(ip: Option<IpAddr>, user_agent: impl Into<String>) -> Self {
        Self {
            ip,
            user_agent: user_agent.into(),
        }
    }
}

impl ClientContextProvider for StaticClientContext {
    fn public_ip(&self) -> AttestResult<IpAddr> {
        self.ip.ok_or_else(|| AttestError::NetworkError {
            operation: "public-ip".to_string(),
            reason: "echo service unavailable".to_string(),
            timed_out: false,
        })
    }

    fn user_agent(&self) -> String {
        self.user_agent.clone()
    }
}
