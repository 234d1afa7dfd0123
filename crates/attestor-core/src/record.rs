//! The attestation record: the only output of a successful session.
//!
//! Fields are private and the constructor is crate-private, so a fresh record
//! only comes out of an `AttestationSession` reaching `Succeeded`. Records
//! reloaded from persisted JSON are read-only, and deserialization rejects
//! any whose method, proof and confidence level disagree.

use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use attestor_contracts::{
    client::ClientContext,
    identity::{DocumentContext, LicenseNumber, PhysicianIdentity},
    error::{AttestError, AttestResult},
    method::{AttestationMethod, ConfidenceLevel, Proof},
};

/// Immutable, auditable proof that a physician attested a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RecordFields")]
pub struct AttestationRecord {
    record_id: Uuid,
    document_id: String,
    method: AttestationMethod,
    timestamp: DateTime<Utc>,
    license_number: LicenseNumber,
    physician_name: String,
    proof: Proof,
    confidence_level: ConfidenceLevel,
    client_ip: IpAddr,
    user_agent: String,
}

/// The persisted shape of a record, before the consistency check.
#[derive(Deserialize)]
struct RecordFields {
    record_id: Uuid,
    document_id: String,
    method: AttestationMethod,
    timestamp: DateTime<Utc>,
    license_number: LicenseNumber,
    physician_name: String,
    proof: Proof,
    confidence_level: ConfidenceLevel,
    client_ip: IpAddr,
    user_agent: String,
}

impl TryFrom<RecordFields> for AttestationRecord {
    type Error = AttestError;

    fn try_from(raw: RecordFields) -> AttestResult<Self> {
        let record = Self {
            record_id: raw.record_id,
            document_id: raw.document_id,
            method: raw.method,
            timestamp: raw.timestamp,
            license_number: raw.license_number,
            physician_name: raw.physician_name,
            proof: raw.proof,
            confidence_level: raw.confidence_level,
            client_ip: raw.client_ip,
            user_agent: raw.user_agent,
        };
        record.check_consistency()?;
        Ok(record)
    }
}

impl AttestationRecord {
    pub(crate) fn new(
        identity: &PhysicianIdentity,
        document: &DocumentContext,
        proof: Proof,
        client: ClientContext,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let method = proof.method();
        Self {
            record_id: Uuid::new_v4(),
            document_id: document.document_id.clone(),
            method,
            timestamp,
            license_number: identity.license_number.clone(),
            physician_name: identity.display_name.clone(),
            proof,
            confidence_level: method.confidence_level(),
            client_ip: client.ip,
            user_agent: client.user_agent,
        }
    }

    /// The proof must come from the recorded method, and the confidence
    /// level must be the one that method carries.
    pub fn check_consistency(&self) -> AttestResult<()> {
        if self.proof.method() != self.method {
            return Err(AttestError::InvalidRecord {
                reason: format!(
                    "record {} claims {:?} but carries a {:?} proof",
                    self.record_id,
                    self.method,
                    self.proof.method()
                ),
            });
        }
        if self.confidence_level != self.method.confidence_level() {
            return Err(AttestError::InvalidRecord {
                reason: format!(
                    "record {} claims {:?} confidence for {:?}",
                    self.record_id, self.confidence_level, self.method
                ),
            });
        }
        Ok(())
    }

    pub fn record_id(&self) -> Uuid {
        self.record_id
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    pub fn method(&self) -> AttestationMethod {
        self.method
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn license_number(&self) -> &LicenseNumber {
        &self.license_number
    }

    pub fn physician_name(&self) -> &str {
        &self.physician_name
    }

    pub fn proof(&self) -> &Proof {
        &self.proof
    }

    pub fn confidence_level(&self) -> ConfidenceLevel {
        self.confidence_level
    }

    pub fn client_ip(&self) -> IpAddr {
        self.client_ip
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Render the signature block printed on the attested document.
    pub fn signature_block(&self) -> String {
        format!(
            "Electronically attested by {name} (license {license})\n\
             Method: {method} [{confidence:?} assurance]\n\
             Verification: {artifact}\n\
             Date: {date}\n\
             Record: {record_id}",
            name = self.physician_name,
            license = self.license_number,
            method = self.method,
            confidence = self.confidence_level,
            artifact = self.proof.artifact(),
            date = self.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            record_id = self.record_id,
        )
    }
}
