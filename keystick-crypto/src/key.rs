//! Master secret handling and key derivation.
//!
//! The encryption key is a SHA-256 digest of the shared master secret. Both
//! tools derive it independently at startup, so nothing but the secret itself
//! has to be distributed.

use crate::error::{CryptoError, CryptoResult};
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of encryption keys in bytes (256 bits for ChaCha20).
pub const KEY_SIZE: usize = 32;

/// The shared root of trust between issuer and validator.
///
/// Never written to a medium. Empty secrets are rejected at construction so
/// everything downstream can assume a usable value.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MasterSecret {
    value: String,
}

impl MasterSecret {
    /// Wraps a secret string.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::EmptySecret`] if `value` is empty.
    pub fn new(value: impl Into<String>) -> CryptoResult<Self> {
        let value = value.into();
        if value.is_empty() {
            return Err(CryptoError::EmptySecret);
        }
        Ok(Self { value })
    }

    /// Returns the secret as a string slice.
    pub fn expose(&self) -> &str {
        &self.value
    }
}

impl std::fmt::Debug for MasterSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterSecret")
            .field("value", &"[REDACTED]")
            .finish()
    }
}

/// A derived encryption key with automatic zeroization on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    bytes: [u8; KEY_SIZE],
}

impl DerivedKey {
    /// Creates a key from raw bytes.
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Creates a key from a slice, checking its length.
    pub fn from_slice(slice: &[u8]) -> CryptoResult<Self> {
        let bytes: [u8; KEY_SIZE] = slice
            .try_into()
            .map_err(|_| CryptoError::InvalidKeyLength {
                expected: KEY_SIZE,
                actual: slice.len(),
            })?;
        Ok(Self { bytes })
    }

    /// Returns the key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Derives the symmetric license key from the master secret.
///
/// Pure and deterministic: the same secret always yields the same key.
pub fn derive_key(secret: &MasterSecret) -> DerivedKey {
    let digest = Sha256::digest(secret.expose().as_bytes());
    let mut bytes = [0u8; KEY_SIZE];
    bytes.copy_from_slice(&digest);
    DerivedKey::from_bytes(bytes)
}

/// Generates a random key. Only useful for tests and tooling; license keys
/// always come from [`derive_key`].
pub fn generate_random_key() -> DerivedKey {
    let mut bytes = [0u8; KEY_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    DerivedKey::from_bytes(bytes)
}
