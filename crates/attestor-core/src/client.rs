//! Best-effort capture of client context for attestation records.

use std::net::IpAddr;

use tracing::warn;

use attestor_contracts::client::ClientContext;

use crate::traits::ClientContextProvider;

/// Capture IP and user agent, falling back to `fallback_ip` if the lookup fails.
///
/// Never fails: the values are audit hints, not security controls.
pub fn capture_client_context(provider: &dyn ClientContextProvider, fallback_ip: IpAddr) -> ClientContext {
    let ip = provider.public_ip().unwrap_or_else(|e| {
        warn!(error = %e, fallback = %fallback_ip, "public IP lookup failed; recording fallback");
        fallback_ip
    });
    ClientContext {
        ip,
        user_agent: provider.user_agent(),
    }
}
