//! Binding digest over hardware identity, master secret and expiry.
//!
//! Each input is framed as `<byte length>:<value>` before hashing, so no
//! choice of values can make two different triples hash the same input
//! string, even when a hardware id itself contains separator characters.

use crate::key::MasterSecret;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Length of a hex-encoded signature.
pub const SIGNATURE_HEX_LEN: usize = 64;

/// Computes the license signature as lower-case hex SHA-256.
pub fn sign(hardware_id: &str, secret: &MasterSecret, expiry_iso: &str) -> String {
    let mut hasher = Sha256::new();
    for part in [hardware_id, secret.expose(), expiry_iso] {
        hasher.update(part.len().to_string().as_bytes());
        hasher.update(b":");
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Recomputes the signature and compares it to `signature`.
///
/// Equal-length inputs are compared in constant time; a length mismatch is
/// rejected immediately.
pub fn verify_signature(
    hardware_id: &str,
    secret: &MasterSecret,
    expiry_iso: &str,
    signature: &str,
) -> bool {
    let expected = sign(hardware_id, secret, expiry_iso);
    if expected.len() != signature.len() {
        return false;
    }
    expected.as_bytes().ct_eq(signature.as_bytes()).into()
}
