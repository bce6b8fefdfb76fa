//! License validation.
//!
//! Validation walks a fixed sequence and stops at the first failing step:
//!
//! ```text
//! locate medium -> read blob -> decrypt -> resolve hardware
//!   -> match hardware -> verify signature -> check expiry -> valid
//! ```
//!
//! Every outcome is a [`Verdict`]; nothing in here returns an error or panics
//! on bad input.

use crate::blob::open_record;
use crate::clock::Clock;
use crate::config::LicenseConfig;
use crate::error::ReasonCode;
use crate::hardware::{HardwareIdentityProvider, resolve_identity};
use crate::medium::{MediumLocator, MediumRef};
use crate::record::{LicenseRecord, display_date};
use chrono::{DateTime, Utc};
use keystick_crypto::{DerivedKey, MasterSecret, derive_key};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of a validation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// True only when every check passed.
    pub valid: bool,
    /// Which step decided the outcome.
    pub reason: ReasonCode,
    /// Human-readable explanation.
    pub message: String,
    /// License expiry, once the record has been decrypted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
    /// The decrypted record; only present on a valid verdict.
    #[serde(rename = "data", skip_serializing_if = "Option::is_none")]
    pub record: Option<LicenseRecord>,
    /// The medium holding the license; only present on a valid verdict.
    #[serde(rename = "drive", skip_serializing_if = "Option::is_none")]
    pub medium: Option<MediumRef>,
}

impl Verdict {
    /// A failed verdict carrying no record, for callers that fail before
    /// validation starts.
    pub fn rejected(reason: ReasonCode, message: impl Into<String>) -> Self {
        Self::reject(reason, message)
    }

    fn reject(reason: ReasonCode, message: impl Into<String>) -> Self {
        let message = message.into();
        warn!("License rejected ({:?}): {}", reason, message);
        Self {
            valid: false,
            reason,
            message,
            expiry: None,
            record: None,
            medium: None,
        }
    }

    fn reject_record(reason: ReasonCode, message: impl Into<String>, record: &LicenseRecord) -> Self {
        Self {
            expiry: Some(record.expiry),
            ..Self::reject(reason, message)
        }
    }

    fn accept(record: LicenseRecord, medium: MediumRef) -> Self {
        Self {
            valid: true,
            reason: ReasonCode::Valid,
            message: format!("License valid until {}", display_date(record.expiry)),
            expiry: Some(record.expiry),
            record: Some(record),
            medium: Some(medium),
        }
    }
}

/// Checks the license on the attached medium against the device it sits on.
pub struct LicenseValidator {
    config: LicenseConfig,
    secret: MasterSecret,
    key: DerivedKey,
    locator: MediumLocator,
    provider: Arc<dyn HardwareIdentityProvider>,
    clock: Arc<dyn Clock>,
}

impl LicenseValidator {
    /// Creates a validator.
    pub fn new(
        config: LicenseConfig,
        secret: MasterSecret,
        locator: MediumLocator,
        provider: Arc<dyn HardwareIdentityProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let key = derive_key(&secret);
        Self {
            config,
            secret,
            key,
            locator,
            provider,
            clock,
        }
    }

    /// Locates the license medium and validates it.
    pub fn validate(&self) -> Verdict {
        match self.locator.locate() {
            Some(medium) => self.validate_medium(&medium),
            None => Verdict::reject(
                ReasonCode::MediumNotFound,
                "License medium not found. Make sure the license drive is attached.",
            ),
        }
    }

    /// Validates the license on a known medium.
    pub fn validate_medium(&self, medium: &MediumRef) -> Verdict {
        let license_path = self.config.license_path(medium);
        match fs::metadata(&license_path) {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => {
                return Verdict::reject(
                    ReasonCode::MediumNotFound,
                    format!("No license file on {medium}"),
                );
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Verdict::reject(
                    ReasonCode::MediumNotFound,
                    format!("No license file on {medium}"),
                );
            }
            Err(e) => {
                return Verdict::reject(
                    ReasonCode::IoFailure,
                    format!("Cannot inspect {}: {e}", license_path.display()),
                );
            }
        }
        debug!("Medium located: {}", medium);

        let bytes = match fs::read(&license_path) {
            Ok(bytes) => bytes,
            Err(e) => {
                return Verdict::reject(
                    ReasonCode::IoFailure,
                    format!("Cannot read {}: {e}", license_path.display()),
                );
            }
        };
        debug!("Blob read: {} bytes", bytes.len());

        let record = match open_record(&bytes, &self.key) {
            Ok(record) => record,
            Err(e) => {
                return Verdict::reject(
                    ReasonCode::DecryptionFailure,
                    format!("License file is invalid or corrupted: {e}"),
                );
            }
        };
        debug!("Blob decrypted for {}", record.customer_name);

        let identity = match resolve_identity(self.provider.as_ref(), medium) {
            Ok(identity) => identity,
            Err(e) => {
                return Verdict::reject_record(ReasonCode::HardwareUnreadable, e.to_string(), &record);
            }
        };

        if identity.id != record.hardware_id {
            return Verdict::reject_record(
                ReasonCode::HardwareMismatch,
                "License does not belong to this device; it was copied from another medium.",
                &record,
            );
        }
        debug!("Hardware matched via {}", self.provider.provider_name());

        if !record.verify_signature(&self.secret) {
            return Verdict::reject_record(
                ReasonCode::SignatureInvalid,
                "License signature is invalid.",
                &record,
            );
        }

        if record.is_expired_at(self.clock.now()) {
            let message = format!("License expired on {}", display_date(record.expiry));
            return Verdict::reject_record(ReasonCode::Expired, message, &record);
        }

        info!(
            "License valid for {} until {}",
            record.customer_name,
            record.expiry_iso()
        );
        Verdict::accept(record, medium.clone())
    }
}
