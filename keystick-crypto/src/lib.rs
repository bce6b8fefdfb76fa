//! Cryptographic primitives for keystick licenses.
//!
//! - [`derive_key`]: master secret to a 256-bit ChaCha20-Poly1305 key
//! - [`encrypt`] / [`decrypt`]: authenticated sealing of license payloads
//! - [`sign`] / [`verify_signature`]: SHA-256 binding digest over
//!   hardware id, master secret and expiry

mod cipher;
mod error;
mod key;
mod signature;

pub use cipher::{EncryptedData, NONCE_SIZE, TAG_SIZE, decrypt, encrypt};
pub use error::{CryptoError, CryptoResult};
pub use key::{DerivedKey, KEY_SIZE, MasterSecret, derive_key, generate_random_key};
pub use signature::{SIGNATURE_HEX_LEN, sign, verify_signature};
