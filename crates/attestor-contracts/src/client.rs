//! Client context captured into attestation records for audit.
//!
//! Both values are hints. The public IP comes from a third-party echo service
//! and is trivially spoofable; it is recorded, never checked.

use std::net::{IpAddr, Ipv4Addr};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientContext {
    pub ip: IpAddr,
    pub user_agent: String,
}

impl ClientContext {
    /// Loopback, used when the public IP lookup fails.
    pub const FALLBACK_IP: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);
}
