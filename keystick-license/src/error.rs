//! Error types for the licensing module.

use keystick_crypto::CryptoError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why an issue or validation attempt ended the way it did.
///
/// Serialized into tool output, so variant names are part of the external
/// interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    /// License verified.
    Valid,
    /// No medium carries the license file.
    MediumNotFound,
    /// Read, write or attribute I/O failed.
    IoFailure,
    /// Wrong key or corrupted blob.
    DecryptionFailure,
    /// The device identity could not be read.
    HardwareUnreadable,
    /// The license belongs to another device.
    HardwareMismatch,
    /// Signed fields were edited.
    SignatureInvalid,
    /// The license is past its expiry.
    Expired,
    /// Hidden/system attributes could not be set (warning only).
    AttributeSetFailed,
    /// Issuer arguments were rejected.
    InvalidInput,
}

/// Licensing-specific errors.
#[derive(Debug, Error)]
pub enum LicenseError {
    /// Issuer input rejected before touching the medium.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// No identity for the medium's device.
    #[error("hardware identity unreadable: {0}")]
    HardwareUnreadable(String),

    /// Filesystem error.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Cipher or key failure.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Blob did not decode to a license.
    #[error("corrupted license blob: {0}")]
    CorruptBlob(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),
}

impl LicenseError {
    /// Maps the error onto the reported reason code.
    ///
    /// `DecryptionFailure` covers the whole sealing layer: on the issue path
    /// it also reports encryption and serialization failures. The message
    /// (`Display`) names the actual step.
    #[must_use]
    pub fn reason(&self) -> ReasonCode {
        match self {
            Self::InvalidInput(_) | Self::Config(_) => ReasonCode::InvalidInput,
            Self::HardwareUnreadable(_) => ReasonCode::HardwareUnreadable,
            Self::Io(_) => ReasonCode::IoFailure,
            Self::Crypto(_) | Self::CorruptBlob(_) | Self::Serialization(_) => {
                ReasonCode::DecryptionFailure
            }
        }
    }
}

/// Result type for license operations.
pub type LicenseResult<T> = Result<T, LicenseError>;

/// Errors from a hardware identity provider.
///
/// "No identity" is not an error: providers return `Ok(None)` for that.
#[derive(Debug, Error)]
pub enum HardwareError {
    /// The provider cannot run here (platform or tooling missing).
    #[error("hardware provider unavailable: {0}")]
    Unavailable(String),

    /// Reading platform device data failed.
    #[error("hardware query failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for hardware identity lookups.
pub type HardwareResult<T> = Result<T, HardwareError>;
