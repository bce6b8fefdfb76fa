//! License issuing: bind a signed, sealed record to one medium.

use crate::attributes::{FileAttributes, PlatformAttributes};
use crate::blob::seal_record;
use crate::clock::Clock;
use crate::config::LicenseConfig;
use crate::error::{LicenseError, LicenseResult, ReasonCode};
use crate::hardware::{HardwareIdentityProvider, resolve_identity};
use crate::medium::MediumRef;
use crate::record::{LicenseRecord, display_date};
use chrono::{DateTime, Utc};
use keystick_crypto::{DerivedKey, MasterSecret, derive_key};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Non-fatal problem encountered while issuing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IssueWarning {
    /// The license file could not be marked hidden/system.
    AttributeSetFailed {
        /// File that kept its attributes.
        path: PathBuf,
        /// Underlying error.
        detail: String,
    },
}

impl IssueWarning {
    /// Reason code reported for this warning.
    #[must_use]
    pub fn reason(&self) -> ReasonCode {
        match self {
            Self::AttributeSetFailed { .. } => ReasonCode::AttributeSetFailed,
        }
    }
}

/// A license written to a medium.
#[derive(Debug, Clone)]
pub struct IssuedLicense {
    /// The record as sealed on the medium.
    pub record: LicenseRecord,
    /// Where the sealed file was written.
    pub license_path: PathBuf,
    /// Best-effort steps that failed.
    pub warnings: Vec<IssueWarning>,
}

/// Issuer tool output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueOutcome {
    /// Whether a license file was written.
    pub success: bool,
    /// Failure reason; absent on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<ReasonCode>,
    /// Human-readable summary.
    pub message: String,
    /// Path of the written license file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_path: Option<PathBuf>,
    /// The issued record, for operator backup.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_data: Option<LicenseRecord>,
    /// Non-fatal problems.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<IssueWarning>,
}

impl From<&LicenseResult<IssuedLicense>> for IssueOutcome {
    fn from(result: &LicenseResult<IssuedLicense>) -> Self {
        match result {
            Ok(issued) => Self {
                success: true,
                reason: None,
                message: format!(
                    "License created for {}, valid until {}",
                    issued.record.customer_name,
                    display_date(issued.record.expiry)
                ),
                license_path: Some(issued.license_path.clone()),
                license_data: Some(issued.record.clone()),
                warnings: issued.warnings.clone(),
            },
            Err(e) => Self {
                success: false,
                reason: Some(e.reason()),
                message: e.to_string(),
                license_path: None,
                license_data: None,
                warnings: Vec::new(),
            },
        }
    }
}

/// Creates license files bound to the hardware behind a medium.
pub struct LicenseIssuer {
    config: LicenseConfig,
    secret: MasterSecret,
    key: DerivedKey,
    provider: Arc<dyn HardwareIdentityProvider>,
    clock: Arc<dyn Clock>,
    attributes: Arc<dyn FileAttributes>,
}

impl LicenseIssuer {
    /// Creates an issuer using platform file attributes.
    pub fn new(
        config: LicenseConfig,
        secret: MasterSecret,
        provider: Arc<dyn HardwareIdentityProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let key = derive_key(&secret);
        Self {
            config,
            secret,
            key,
            provider,
            clock,
            attributes: Arc::new(PlatformAttributes),
        }
    }

    /// Replaces the attribute setter.
    #[must_use]
    pub fn with_attributes(mut self, attributes: Arc<dyn FileAttributes>) -> Self {
        self.attributes = attributes;
        self
    }

    /// Issues a license for `customer_name` on `medium`, valid for
    /// `duration_days` from now.
    ///
    /// Overwrites any license already on the medium.
    pub fn issue(
        &self,
        medium: &MediumRef,
        customer_name: &str,
        duration_days: u32,
    ) -> LicenseResult<IssuedLicense> {
        if customer_name.trim().is_empty() {
            return Err(LicenseError::InvalidInput(
                "customer name must not be empty".to_string(),
            ));
        }
        if duration_days == 0 {
            return Err(LicenseError::InvalidInput(
                "duration must be at least one day".to_string(),
            ));
        }
        if !medium.path().is_dir() {
            return Err(LicenseError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("medium root {medium} is not a directory"),
            )));
        }

        let identity = resolve_identity(self.provider.as_ref(), medium)?;
        debug!(
            "Resolved {} via {}: serial={} model={}",
            medium,
            self.provider.provider_name(),
            identity.serial_number,
            identity.model
        );

        let record = LicenseRecord::issue(
            customer_name,
            &identity.id,
            &identity.serial_number,
            &identity.model,
            self.clock.now(),
            duration_days,
            &self.secret,
        )?;
        let sealed = seal_record(&record, &self.key)?;

        let license_path = self.config.license_path(medium);
        write_atomically(medium.path(), &license_path, &sealed, self.attributes.as_ref())?;

        let mut warnings = Vec::new();
        if let Err(e) = self.attributes.hide(&license_path) {
            warn!("Could not hide {}: {}", license_path.display(), e);
            warnings.push(IssueWarning::AttributeSetFailed {
                path: license_path.clone(),
                detail: e.to_string(),
            });
        }

        info!(
            "Issued license for {} on {} (expires {})",
            record.customer_name,
            medium,
            record.expiry_iso()
        );
        Ok(IssuedLicense {
            record,
            license_path,
            warnings,
        })
    }
}

/// Writes `bytes` to a temp file in `dir` and renames it over `target`.
fn write_atomically(
    dir: &Path,
    target: &Path,
    bytes: &[u8],
    attributes: &dyn FileAttributes,
) -> LicenseResult<()> {
    let mut temp = tempfile::Builder::new()
        .prefix(".license")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    temp.as_file_mut().write_all(bytes)?;
    temp.as_file().sync_all()?;

    if target.exists() {
        // A hidden/system file refuses replacement on some platforms
        if let Err(e) = attributes.reveal(target) {
            debug!("Could not clear attributes on {}: {}", target.display(), e);
        }
    }
    temp.persist(target).map_err(|e| LicenseError::Io(e.error))?;
    Ok(())
}

/// Writes the plaintext record as JSON into `dir` for operator safekeeping.
///
/// The file name is `license_backup_<customer>_<YYYYmmdd_HHMMSS>.json`.
pub fn write_backup(
    record: &LicenseRecord,
    dir: &Path,
    now: DateTime<Utc>,
) -> LicenseResult<PathBuf> {
    let customer: String = record
        .customer_name
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    let path = dir.join(format!(
        "license_backup_{customer}_{}.json",
        now.format("%Y%m%d_%H%M%S")
    ));
    fs::write(&path, serde_json::to_string_pretty(record)?)?;
    info!("Backup written to {}", path.display());
    Ok(path)
}
