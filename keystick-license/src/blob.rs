//! On-medium license file format.
//!
//! ```text
//! +--------+---------+------------+---------------------------+
//! | "KSLC" | version | nonce (12) | ciphertext + tag (16)     |
//! +--------+---------+------------+---------------------------+
//! ```
//!
//! The plaintext is the JSON-encoded [`LicenseRecord`].

use crate::error::{LicenseError, LicenseResult};
use crate::record::LicenseRecord;
use keystick_crypto::{DerivedKey, EncryptedData, decrypt, encrypt};

/// Leading bytes of every license file.
pub const BLOB_MAGIC: [u8; 4] = *b"KSLC";

/// Current format version.
pub const BLOB_VERSION: u8 = 1;

const HEADER_LEN: usize = BLOB_MAGIC.len() + 1;

/// Serializes and encrypts `record` into license file bytes.
pub fn seal_record(record: &LicenseRecord, key: &DerivedKey) -> LicenseResult<Vec<u8>> {
    let json = serde_json::to_vec_pretty(record)?;
    let encrypted = encrypt(key, &json)?;

    let mut bytes = Vec::with_capacity(HEADER_LEN + encrypted.len());
    bytes.extend_from_slice(&BLOB_MAGIC);
    bytes.push(BLOB_VERSION);
    bytes.extend_from_slice(&encrypted.to_bytes());
    Ok(bytes)
}

/// Decrypts and parses license file bytes.
///
/// Every failure here means the blob was not produced under `key` or was
/// damaged afterwards.
pub fn open_record(bytes: &[u8], key: &DerivedKey) -> LicenseResult<LicenseRecord> {
    if bytes.len() < HEADER_LEN || bytes[..BLOB_MAGIC.len()] != BLOB_MAGIC {
        return Err(LicenseError::CorruptBlob(
            "not a license file".to_string(),
        ));
    }
    let version = bytes[BLOB_MAGIC.len()];
    if version != BLOB_VERSION {
        return Err(LicenseError::CorruptBlob(format!(
            "unsupported format version {version}"
        )));
    }

    let encrypted = EncryptedData::from_bytes(&bytes[HEADER_LEN..])?;
    let json = decrypt(key, &encrypted)?;
    let record = serde_json::from_slice(&json)
        .map_err(|e| LicenseError::CorruptBlob(format!("invalid payload: {e}")))?;
    Ok(record)
}
