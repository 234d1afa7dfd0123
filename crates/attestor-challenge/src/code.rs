//! Code generation, normalization and hashing.
//!
//! Hash input layout (bytes, in order):
//!   1. salt as UTF-8 bytes (32 ASCII hex chars)
//!   2. a single 0x00 separator
//!   3. license number as UTF-8 bytes
//!   4. a single 0x00 separator
//!   5. the six-digit code as ASCII
//!
//! Binding the license into the hash means a stored hash cannot be replayed
//! against another physician's challenge.

use rand::Rng;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use attestor_contracts::identity::LicenseNumber;

/// Number of digits in a one-time code.
pub const CODE_LEN: usize = 6;

/// Smallest code ever issued; codes never have a leading zero.
pub const CODE_MIN: u32 = 100_000;

/// Largest code ever issued.
pub const CODE_MAX: u32 = 999_999;

/// Draw a code uniformly from `[CODE_MIN, CODE_MAX]`.
pub fn generate_code() -> String {
    rand::thread_rng().gen_range(CODE_MIN..=CODE_MAX).to_string()
}

/// A fresh 128-bit salt, hex encoded.
pub fn generate_salt() -> String {
    let salt: [u8; 16] = rand::thread_rng().gen();
    hex::encode(salt)
}

/// Strip everything but ASCII digits and keep at most the first six.
///
/// `"12 34-56"` and `"123456"` normalize identically.
pub fn normalize_code(submitted: &str) -> String {
    submitted
        .chars()
        .filter(|c| c.is_ascii_digit())
        .take(CODE_LEN)
        .collect()
}

/// Lowercase hex SHA-256 of (salt, license, code).
pub fn hash_code(salt: &str, license: &LicenseNumber, code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update([0u8]);
    hasher.update(license.as_str().as_bytes());
    hasher.update([0u8]);
    hasher.update(code.as_bytes());
    hex::encode(hasher.finalize())
}

/// Compare a normalized code against a stored hash in constant time.
pub fn code_matches(expected_hash: &str, salt: &str, license: &LicenseNumber, normalized: &str) -> bool {
    if normalized.len() != CODE_LEN {
        return false;
    }
    let candidate = hash_code(salt, license, normalized);
    bool::from(candidate.as_bytes().ct_eq(expected_hash.as_bytes()))
}
