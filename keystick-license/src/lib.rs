//! Hardware-bound licenses on removable media.
//!
//! An issuer binds a license to one physical storage device; a validator later
//! proves that the license file is unmodified and still sits on that device.
//! The two never talk to each other. They share only the master secret and
//! the file format.
//!
//! # Protocol
//!
//! - The record is signed with SHA-256 over hardware id, master secret and
//!   expiry.
//! - The record is sealed with ChaCha20-Poly1305 under `SHA-256(secret)` and
//!   written to `<medium>/.license.sys`.
//! - Validation re-reads the device identity and rejects a license whose
//!   bound id differs, so copying the file to another drive does not work.
//!
//! # Signature coverage
//!
//! `customer_name`, `serial_number` and `model` are not signed. They are for
//! display and are never trusted for access decisions.

mod attributes;
mod blob;
mod clock;
mod config;
mod error;
mod hardware;
mod issuer;
mod medium;
mod record;
mod validator;

pub use attributes::{FileAttributes, PlatformAttributes};
pub use blob::{BLOB_MAGIC, BLOB_VERSION, open_record, seal_record};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{LICENSE_FILE_NAME, LicenseConfig};
pub use error::{HardwareError, HardwareResult, LicenseError, LicenseResult, ReasonCode};
pub use hardware::{
    HardwareIdentity, HardwareIdentityProvider, StaticHardwareProvider, SysfsHardwareProvider,
    UnsupportedHardwareProvider, WmiHardwareProvider, platform_provider,
};
pub use issuer::{IssueOutcome, IssueWarning, IssuedLicense, LicenseIssuer, write_backup};
pub use medium::{
    DriveLetterEnumerator, MediaEnumerator, MediumLocator, MediumRef, MountRootEnumerator,
    StaticMediaEnumerator, platform_enumerator,
};
pub use record::{LicenseRecord, display_date};
pub use validator::{LicenseValidator, Verdict};
