//! The license record and its signature binding.
//!
//! Only `hardware_id` and `expiry` are covered by the signature, together with
//! the master secret. `customer_name`, `serial_number` and `model` are display
//! fields: a holder who can re-seal the blob could change them without
//! invalidating it.

use crate::error::{LicenseError, LicenseResult};
use chrono::{DateTime, Duration, SecondsFormat, SubsecRound, Utc};
use keystick_crypto::{MasterSecret, sign, verify_signature};
use serde::{Deserialize, Serialize};

/// A license bound to one physical medium.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseRecord {
    /// Licensee name.
    pub customer_name: String,
    /// Identity of the issuing device.
    pub hardware_id: String,
    /// Device serial number (informational).
    #[serde(default)]
    pub serial_number: String,
    /// Device model (informational).
    #[serde(default)]
    pub model: String,
    /// When the license was issued.
    pub issue_date: DateTime<Utc>,
    /// `issue_date + duration_days`.
    pub expiry: DateTime<Utc>,
    /// Validity period in days.
    pub duration_days: u32,
    /// Hex digest over hardware id, master secret and expiry.
    pub signature: String,
}

impl LicenseRecord {
    /// Builds and signs a record issued at `issued_at`.
    ///
    /// Timestamps are truncated to microseconds so the signed expiry string
    /// survives serialization unchanged.
    pub fn issue(
        customer_name: &str,
        hardware_id: &str,
        serial_number: &str,
        model: &str,
        issued_at: DateTime<Utc>,
        duration_days: u32,
        secret: &MasterSecret,
    ) -> LicenseResult<Self> {
        let issue_date = issued_at.trunc_subsecs(6);
        let expiry = issue_date
            .checked_add_signed(Duration::days(i64::from(duration_days)))
            .ok_or_else(|| {
                LicenseError::InvalidInput(format!("duration of {duration_days} days overflows"))
            })?;

        let mut record = Self {
            customer_name: customer_name.trim().to_string(),
            hardware_id: hardware_id.to_string(),
            serial_number: serial_number.trim().to_string(),
            model: model.trim().to_string(),
            issue_date,
            expiry,
            duration_days,
            signature: String::new(),
        };
        record.validate_fields()?;
        record.signature = record.compute_signature(secret);
        Ok(record)
    }

    /// Canonical expiry string fed into the signature.
    #[must_use]
    pub fn expiry_iso(&self) -> String {
        self.expiry.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    /// Recomputes the signature from the signed fields.
    #[must_use]
    pub fn compute_signature(&self, secret: &MasterSecret) -> String {
        sign(&self.hardware_id, secret, &self.expiry_iso())
    }

    /// True if the stored signature matches a fresh recomputation.
    ///
    /// An expiry carrying sub-microsecond digits never verifies: the signed
    /// string cannot represent them, so they can only come from an edit.
    #[must_use]
    pub fn verify_signature(&self, secret: &MasterSecret) -> bool {
        self.expiry.trunc_subsecs(6) == self.expiry
            && verify_signature(&self.hardware_id, secret, &self.expiry_iso(), &self.signature)
    }

    /// True once `now` is strictly past the expiry.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expiry
    }

    /// Whole days left at `now`, zero once expired.
    #[must_use]
    pub fn days_remaining(&self, now: DateTime<Utc>) -> i64 {
        (self.expiry - now).num_days().max(0)
    }

    /// Checks the field constraints of a freshly built record.
    pub fn validate_fields(&self) -> LicenseResult<()> {
        if self.customer_name.trim().is_empty() {
            return Err(LicenseError::InvalidInput(
                "customer name must not be empty".to_string(),
            ));
        }
        if self.hardware_id.is_empty() {
            return Err(LicenseError::InvalidInput(
                "hardware id must not be empty".to_string(),
            ));
        }
        if self.duration_days == 0 {
            return Err(LicenseError::InvalidInput(
                "duration must be at least one day".to_string(),
            ));
        }
        Ok(())
    }
}

/// Formats a date the way tool messages show it, e.g. `17 November 2026`.
#[must_use]
pub fn display_date(at: DateTime<Utc>) -> String {
    at.format("%d %B %Y").to_string()
}
