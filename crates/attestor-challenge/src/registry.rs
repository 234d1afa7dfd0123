//! The challenge registry: issuer and validator over one shared store.
//!
//! All reads and writes of the store happen under a single `Mutex`, which
//! gives the two serialization guarantees the protocol depends on:
//!
//! - issuance is a read-modify-write of the per-license index, so two
//!   concurrent sessions for the same physician can never both hold a live
//!   challenge;
//! - consume-on-success is a compare-and-set of `consumed`, so a double
//!   submit of the right code succeeds exactly once.
//!
//! Code delivery happens outside the lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};

use attestor_config::ChallengeSettings;
use attestor_contracts::{
    challenge::{Challenge, ChallengeHandle, ChallengeId, DeliveryChannel, ValidatedCode},
    error::{AttestResult, ValidationError},
    identity::LicenseNumber,
};
use attestor_core::traits::{ChallengeService, Clock, CodeDelivery};

use crate::code::{code_matches, generate_code, generate_salt, hash_code, normalize_code};

// ── Internal mutable state ────────────────────────────────────────────────────

pub(crate) struct RegistryState {
    /// Every challenge not yet purged, live or not.
    pub(crate) challenges: HashMap<ChallengeId, Challenge>,

    /// The current challenge per license. An entry may point at a challenge
    /// that has since expired; it is never left pointing at a consumed one.
    pub(crate) live: HashMap<LicenseNumber, ChallengeId>,
}

/// Drop `license`'s index entry if it still points at `id`.
fn release_live(live: &mut HashMap<LicenseNumber, ChallengeId>, license: &LicenseNumber, id: ChallengeId) {
    if live.get(license) == Some(&id) {
        live.remove(license);
    }
}

// ── Public registry ───────────────────────────────────────────────────────────

pub struct ChallengeRegistry {
    settings: ChallengeSettings,
    delivery: Arc<dyn CodeDelivery>,
    clock: Arc<dyn Clock>,
    pub(crate) state: Arc<Mutex<RegistryState>>,
}

impl ChallengeRegistry {
    pub fn new(settings: ChallengeSettings, delivery: Arc<dyn CodeDelivery>, clock: Arc<dyn Clock>) -> Self {
        Self {
            settings,
            delivery,
            clock,
            state: Arc::new(Mutex::new(RegistryState {
                challenges: HashMap::new(),
                live: HashMap::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        // A panic while holding the lock cannot leave a half-written
        // challenge: every mutation is a single field store.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The live challenge for `license`, if any.
    pub fn live_challenge(&self, license: &LicenseNumber) -> Option<ChallengeHandle> {
        let now = self.clock.now();
        let state = self.lock();
        state
            .live
            .get(license)
            .and_then(|id| state.challenges.get(id))
            .filter(|c| c.is_live(now))
            .map(Challenge::handle)
    }

    /// Number of live challenges across all licenses.
    pub fn live_count(&self) -> usize {
        let now = self.clock.now();
        self.lock().challenges.values().filter(|c| c.is_live(now)).count()
    }

    /// Drop expired and consumed challenges. Returns how many were removed.
    ///
    /// Validating a purged challenge returns `NotFound` instead of
    /// `Expired`/`AlreadyUsed`; both reject.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut guard = self.lock();
        let RegistryState { challenges, live } = &mut *guard;

        let before = challenges.len();
        challenges.retain(|_, c| c.is_live(now));
        live.retain(|_, id| challenges.contains_key(id));
        let removed = before - challenges.len();

        if removed > 0 {
            debug!(removed, remaining = challenges.len(), "purged dead challenges");
        }
        removed
    }

    fn burn(&self, id: ChallengeId) {
        let mut guard = self.lock();
        let RegistryState { challenges, live } = &mut *guard;
        if let Some(challenge) = challenges.get_mut(&id) {
            challenge.consumed = true;
            release_live(live, &challenge.license_number, id);
        }
    }
}

impl ChallengeService for ChallengeRegistry {
    /// Issue a code for `license` and deliver it via `channel`.
    ///
    /// Any prior live challenge for the license is consumed before the new
    /// one becomes current. If delivery fails the new challenge is burned as
    /// well, so the user must resend.
    fn issue(&self, license: &LicenseNumber, channel: DeliveryChannel) -> AttestResult<ChallengeHandle> {
        let now = self.clock.now();
        let code = generate_code();
        let salt = generate_salt();

        let challenge = Challenge {
            id: ChallengeId::new(),
            license_number: license.clone(),
            code_hash: hash_code(&salt, license, &code),
            salt,
            channel,
            issued_at: now,
            expires_at: now + self.settings.ttl(),
            attempts: 0,
            consumed: false,
        };
        let handle = challenge.handle();
        let channel = challenge.channel.clone();

        {
            let mut guard = self.lock();
            let RegistryState { challenges, live } = &mut *guard;

            if let Some(previous) = live.insert(license.clone(), challenge.id) {
                if let Some(prev) = challenges.get_mut(&previous) {
                    if !prev.consumed {
                        prev.consumed = true;
                        debug!(
                            license = %license,
                            superseded = %previous,
                            "prior challenge invalidated by re-issue"
                        );
                    }
                }
            }
            challenges.insert(challenge.id, challenge);
        }

        if let Err(e) = self.delivery.send(license, &channel, &code, handle.expires_at) {
            warn!(license = %license, challenge_id = %handle.id, error = %e, "code delivery failed; burning challenge");
            self.burn(handle.id);
            return Err(e);
        }

        info!(
            license = %license,
            challenge_id = %handle.id,
            expires_at = %handle.expires_at,
            "challenge issued"
        );
        Ok(handle)
    }

    /// Validate `submitted` against challenge `id`.
    ///
    /// Checks, in order: exists, not consumed, not expired, code matches.
    /// A mismatch counts as an attempt; the attempt that reaches
    /// `max_attempts` burns the challenge.
    fn validate(&self, id: ChallengeId, submitted: &str) -> Result<ValidatedCode, ValidationError> {
        let now = self.clock.now();
        let normalized = normalize_code(submitted);

        let mut guard = self.lock();
        let RegistryState { challenges, live } = &mut *guard;

        let challenge = challenges.get_mut(&id).ok_or_else(|| {
            warn!(challenge_id = %id, "validation against unknown challenge");
            ValidationError::NotFound
        })?;

        if challenge.consumed {
            warn!(challenge_id = %id, license = %challenge.license_number, "replay of consumed challenge");
            return Err(ValidationError::AlreadyUsed);
        }

        if challenge.is_expired(now) {
            warn!(
                challenge_id = %id,
                license = %challenge.license_number,
                expired_at = %challenge.expires_at,
                "validation after expiry"
            );
            release_live(live, &challenge.license_number, id);
            return Err(ValidationError::Expired);
        }

        if !code_matches(&challenge.code_hash, &challenge.salt, &challenge.license_number, &normalized) {
            challenge.attempts += 1;
            let max = self.settings.max_attempts;
            if challenge.attempts >= max {
                challenge.consumed = true;
                release_live(live, &challenge.license_number, id);
                warn!(
                    challenge_id = %id,
                    license = %challenge.license_number,
                    attempts = challenge.attempts,
                    "attempt limit reached; challenge burned"
                );
                return Err(ValidationError::AttemptsExhausted);
            }
            warn!(
                challenge_id = %id,
                license = %challenge.license_number,
                attempts = challenge.attempts,
                "code mismatch"
            );
            return Err(ValidationError::Mismatch {
                attempts_remaining: max - challenge.attempts,
            });
        }

        challenge.consumed = true;
        release_live(live, &challenge.license_number, id);

        info!(challenge_id = %id, license = %challenge.license_number, "challenge validated and consumed");

        Ok(ValidatedCode {
            challenge_id: id,
            license_number: challenge.license_number.clone(),
            code: normalized,
            validated_at: now,
        })
    }

    fn invalidate(&self, id: ChallengeId) {
        debug!(challenge_id = %id, "challenge invalidated");
        self.burn(id);
    }
}
