//! Runtime configuration shared by the issuer and validator tools.
//!
//! The master secret is not part of the configuration. It is injected into
//! [`LicenseIssuer`](crate::LicenseIssuer) and
//! [`LicenseValidator`](crate::LicenseValidator) so it never lands in a
//! config file next to the tools.

use crate::error::{LicenseError, LicenseResult};
use crate::medium::MediumRef;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Well-known license filename at the root of a medium.
pub const LICENSE_FILE_NAME: &str = ".license.sys";

/// Licensing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LicenseConfig {
    /// File name of the sealed license at the medium root.
    pub license_file_name: String,
    /// Directories whose children are candidate mount points (non-Windows).
    pub mount_roots: Vec<PathBuf>,
    /// Duration used by the issuer tool when none is given.
    pub default_duration_days: u32,
}

impl Default for LicenseConfig {
    fn default() -> Self {
        Self {
            license_file_name: LICENSE_FILE_NAME.to_string(),
            mount_roots: vec![
                PathBuf::from("/media"),
                PathBuf::from("/run/media"),
                PathBuf::from("/mnt"),
            ],
            default_duration_days: 365,
        }
    }
}

impl LicenseConfig {
    /// Loads configuration from a JSON file. Missing fields take defaults.
    pub fn from_json_file(path: &Path) -> LicenseResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            LicenseError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| LicenseError::Config(format!("invalid {}: {e}", path.display())))?;
        config.check()?;
        Ok(config)
    }

    /// Rejects values no tool can work with.
    pub fn check(&self) -> LicenseResult<()> {
        let name = &self.license_file_name;
        if name.is_empty() || name.contains(['/', '\\']) {
            return Err(LicenseError::Config(format!(
                "license_file_name must be a bare file name, got {name:?}"
            )));
        }
        if self.default_duration_days == 0 {
            return Err(LicenseError::Config(
                "default_duration_days must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Path of the license file on `medium`.
    #[must_use]
    pub fn license_path(&self, medium: &MediumRef) -> PathBuf {
        medium.path().join(&self.license_file_name)
    }
}
