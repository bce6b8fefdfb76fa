//! Shared test helpers: a simulated medium, device and clock.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use keystick_crypto::MasterSecret;
use keystick_license::{
    FileAttributes, FixedClock, HardwareIdentity, LicenseConfig, LicenseIssuer, LicenseValidator,
    MediumLocator, MediumRef, StaticHardwareProvider, StaticMediaEnumerator,
};
use std::io;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

pub const SECRET: &str = "rahasia-kunci-super-aman-12345";
pub const HARDWARE_ID_SERIAL: &str = "SN123";
pub const HARDWARE_ID_DESCRIPTOR: &str = "PNP456";

pub fn secret() -> MasterSecret {
    MasterSecret::new(SECRET).unwrap()
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 18, 9, 30, 0).unwrap()
}

/// `SN123_PNP456`, a USB stick.
pub fn device_identity() -> HardwareIdentity {
    HardwareIdentity::compose(HARDWARE_ID_SERIAL, HARDWARE_ID_DESCRIPTOR, "Cruzer Blade")
}

/// Attribute setter that always fails.
pub struct FailingAttributes;

impl FileAttributes for FailingAttributes {
    fn hide(&self, _path: &Path) -> io::Result<()> {
        Err(io::Error::other("attrib not permitted"))
    }

    fn reveal(&self, _path: &Path) -> io::Result<()> {
        Err(io::Error::other("attrib not permitted"))
    }
}

/// One simulated medium in a temp dir, with a device identity and a clock.
pub struct Harness {
    pub dir: TempDir,
    pub medium: MediumRef,
    pub clock: Arc<FixedClock>,
    pub config: LicenseConfig,
}

impl Harness {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let medium = MediumRef::new(dir.path());
        Self {
            dir,
            medium,
            clock: Arc::new(FixedClock::new(start_time())),
            config: LicenseConfig::default(),
        }
    }

    pub fn provider(&self) -> StaticHardwareProvider {
        StaticHardwareProvider::new().with_device(self.medium.clone(), device_identity())
    }

    pub fn issuer(&self) -> LicenseIssuer {
        self.issuer_with(self.provider(), secret())
    }

    pub fn issuer_with(&self, provider: StaticHardwareProvider, secret: MasterSecret) -> LicenseIssuer {
        LicenseIssuer::new(
            self.config.clone(),
            secret,
            Arc::new(provider),
            self.clock.clone(),
        )
    }

    pub fn validator(&self) -> LicenseValidator {
        self.validator_with(self.provider(), secret())
    }

    pub fn validator_with(
        &self,
        provider: StaticHardwareProvider,
        secret: MasterSecret,
    ) -> LicenseValidator {
        let locator = MediumLocator::new(
            Arc::new(StaticMediaEnumerator::new(vec![self.medium.clone()])),
            &self.config,
        );
        LicenseValidator::new(
            self.config.clone(),
            secret,
            locator,
            Arc::new(provider),
            self.clock.clone(),
        )
    }

    pub fn license_path(&self) -> std::path::PathBuf {
        self.config.license_path(&self.medium)
    }
}
