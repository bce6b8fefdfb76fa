//! Hardware identity of the physical device behind a medium.
//!
//! The identity is `<serial>_<device descriptor>` and is what a license gets
//! bound to. Platform lookups live behind [`HardwareIdentityProvider`] so the
//! issuing and validation logic stays platform-independent.

use crate::error::{HardwareError, HardwareResult, LicenseError, LicenseResult};
use crate::medium::MediumRef;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use tracing::debug;

/// Identity of one physical storage device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareIdentity {
    /// Binding string, `<serial>_<descriptor>`.
    pub id: String,
    /// Device serial number.
    pub serial_number: String,
    /// Device model name.
    pub model: String,
}

impl HardwareIdentity {
    /// Composes an identity from its parts.
    pub fn compose(serial_number: &str, descriptor: &str, model: &str) -> Self {
        Self {
            id: format!("{serial_number}_{descriptor}"),
            serial_number: serial_number.to_string(),
            model: model.to_string(),
        }
    }
}

/// Resolves the hardware identity for a medium.
pub trait HardwareIdentityProvider: Send + Sync {
    /// Short provider name for logs.
    fn provider_name(&self) -> &'static str;

    /// Returns the identity of the device behind `medium`.
    ///
    /// `Ok(None)` means the device exposes no readable identity;
    /// `Err(HardwareError::Unavailable)` means this provider cannot answer at
    /// all in the current environment.
    fn identify(&self, medium: &MediumRef) -> HardwareResult<Option<HardwareIdentity>>;
}

// ── Static ───────────────────────────────────────────────────────

/// In-memory identities keyed by medium, for simulated devices.
#[derive(Debug, Clone, Default)]
pub struct StaticHardwareProvider {
    identities: HashMap<MediumRef, HardwareIdentity>,
}

impl StaticHardwareProvider {
    /// Creates an empty provider; every medium reads as having no identity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `identity` for `medium`.
    #[must_use]
    pub fn with_device(mut self, medium: MediumRef, identity: HardwareIdentity) -> Self {
        self.identities.insert(medium, identity);
        self
    }
}

impl HardwareIdentityProvider for StaticHardwareProvider {
    fn provider_name(&self) -> &'static str {
        "static"
    }

    fn identify(&self, medium: &MediumRef) -> HardwareResult<Option<HardwareIdentity>> {
        Ok(self.identities.get(medium).cloned())
    }
}

// ── Unsupported ──────────────────────────────────────────────────

/// Provider for platforms without a device lookup.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedHardwareProvider;

impl HardwareIdentityProvider for UnsupportedHardwareProvider {
    fn provider_name(&self) -> &'static str {
        "unsupported"
    }

    fn identify(&self, _medium: &MediumRef) -> HardwareResult<Option<HardwareIdentity>> {
        Err(HardwareError::Unavailable(format!(
            "no hardware identity provider for {}",
            std::env::consts::OS
        )))
    }
}

// ── Linux sysfs ──────────────────────────────────────────────────

/// Linux provider reading the mount table and sysfs.
///
/// The mount point is mapped to its block device, partitions are walked up
/// to the whole disk, and the nearest ancestor device exposing a `serial`
/// attribute (the USB device for flash drives) supplies the serial number and
/// vendor/product ids.
#[derive(Debug, Clone)]
pub struct SysfsHardwareProvider {
    mounts_file: PathBuf,
    sys_root: PathBuf,
}

impl Default for SysfsHardwareProvider {
    fn default() -> Self {
        Self::new("/proc/self/mounts", "/sys")
    }
}

impl SysfsHardwareProvider {
    /// Creates a provider over a custom mount table and sysfs root.
    pub fn new(mounts_file: impl Into<PathBuf>, sys_root: impl Into<PathBuf>) -> Self {
        Self {
            mounts_file: mounts_file.into(),
            sys_root: sys_root.into(),
        }
    }

    fn block_device_for(&self, mount_point: &Path) -> HardwareResult<Option<String>> {
        let mounts = fs::read_to_string(&self.mounts_file)?;
        let Some(source) = find_mount_source(&mounts, mount_point) else {
            return Ok(None);
        };
        if !source.starts_with("/dev/") {
            return Ok(None);
        }
        // /dev/disk/by-uuid/... entries are symlinks to the real node
        let node = fs::canonicalize(&source).unwrap_or_else(|_| PathBuf::from(&source));
        Ok(node
            .file_name()
            .map(|name| name.to_string_lossy().into_owned()))
    }
}

impl HardwareIdentityProvider for SysfsHardwareProvider {
    fn provider_name(&self) -> &'static str {
        "sysfs"
    }

    fn identify(&self, medium: &MediumRef) -> HardwareResult<Option<HardwareIdentity>> {
        if !self.sys_root.join("class/block").is_dir() {
            return Err(HardwareError::Unavailable(format!(
                "{} has no block device class",
                self.sys_root.display()
            )));
        }
        let sys_root = fs::canonicalize(&self.sys_root)?;
        let mount_point = fs::canonicalize(medium.path())?;

        let Some(device) = self.block_device_for(&mount_point)? else {
            debug!("{} is not backed by a block device", medium);
            return Ok(None);
        };

        let class_entry = sys_root.join("class/block").join(&device);
        let Ok(block_dir) = fs::canonicalize(&class_entry) else {
            return Ok(None);
        };
        let disk_dir = if block_dir.join("partition").exists() {
            match block_dir.parent() {
                Some(parent) => parent.to_path_buf(),
                None => return Ok(None),
            }
        } else {
            block_dir
        };
        let Ok(device_dir) = fs::canonicalize(disk_dir.join("device")) else {
            return Ok(None);
        };
        let model = read_attr(&device_dir, "model").unwrap_or_default();

        let Some(serial_dir) = device_dir
            .ancestors()
            .take_while(|dir| dir.starts_with(&sys_root) && *dir != sys_root.as_path())
            .find(|dir| read_attr(dir, "serial").is_some_and(|s| !s.is_empty()))
        else {
            debug!("No serial attribute above {}", device_dir.display());
            return Ok(None);
        };
        let serial = read_attr(serial_dir, "serial").unwrap_or_default();

        let descriptor = match (
            read_attr(serial_dir, "idVendor"),
            read_attr(serial_dir, "idProduct"),
        ) {
            (Some(vendor), Some(product)) => format!(
                "USB\\VID_{}&PID_{}",
                vendor.to_uppercase(),
                product.to_uppercase()
            ),
            _ => format!("BLOCK\\{}", model.replace(' ', "_")),
        };

        Ok(Some(HardwareIdentity::compose(&serial, &descriptor, &model)))
    }
}

fn read_attr(dir: &Path, name: &str) -> Option<String> {
    fs::read_to_string(dir.join(name))
        .ok()
        .map(|s| s.trim().to_string())
}

/// Returns the device field of the mount table entry for `mount_point`.
///
/// The last matching line wins, matching how stacked mounts shadow each other.
fn find_mount_source(mounts: &str, mount_point: &Path) -> Option<String> {
    mounts
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let source = fields.next()?;
            let target = fields.next()?;
            Some((unescape_mount_field(source), unescape_mount_field(target)))
        })
        .filter(|(_, target)| Path::new(target) == mount_point)
        .map(|(source, _)| source)
        .last()
}

/// Decodes the octal escapes (`\040` for space etc.) used in the mount table.
fn unescape_mount_field(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\'
            && i + 3 < bytes.len()
            && (b'0'..=b'3').contains(&bytes[i + 1])
            && bytes[i + 2..=i + 3].iter().all(|b| (b'0'..=b'7').contains(b))
        {
            let value = (bytes[i + 1] - b'0') * 64 + (bytes[i + 2] - b'0') * 8 + (bytes[i + 3] - b'0');
            out.push(value);
            i += 4;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

// ── Windows ──────────────────────────────────────────────────────

/// Windows provider querying WMI through PowerShell.
///
/// Follows logical disk → partition → disk drive and reports the drive's
/// `SerialNumber`, `PNPDeviceID` and `Model`.
#[derive(Debug, Clone)]
pub struct WmiHardwareProvider {
    shell: String,
}

impl Default for WmiHardwareProvider {
    fn default() -> Self {
        Self {
            shell: "powershell".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WmiDiskDrive {
    serial_number: Option<String>,
    #[serde(rename = "PNPDeviceID")]
    pnp_device_id: Option<String>,
    model: Option<String>,
}

impl WmiHardwareProvider {
    fn query_script(drive: char) -> String {
        format!(
            "$p = Get-CimInstance -Query \"ASSOCIATORS OF {{Win32_LogicalDisk.DeviceID='{drive}:'}} WHERE AssocClass=Win32_LogicalDiskToPartition\"; \
             if ($p) {{ Get-CimInstance -Query \"ASSOCIATORS OF {{Win32_DiskPartition.DeviceID='$($p.DeviceID)'}} WHERE AssocClass=Win32_DiskDriveToDiskPartition\" | \
             Select-Object SerialNumber,PNPDeviceID,Model | ConvertTo-Json -Compress }}"
        )
    }
}

impl HardwareIdentityProvider for WmiHardwareProvider {
    fn provider_name(&self) -> &'static str {
        "wmi"
    }

    fn identify(&self, medium: &MediumRef) -> HardwareResult<Option<HardwareIdentity>> {
        let Some(drive) = drive_letter(medium) else {
            return Ok(None);
        };
        let output = Command::new(&self.shell)
            .args(["-NoProfile", "-NonInteractive", "-Command"])
            .arg(Self::query_script(drive))
            .output()
            .map_err(|e| HardwareError::Unavailable(format!("cannot run {}: {e}", self.shell)))?;
        if !output.status.success() {
            debug!("WMI query for {}: exited with {}", medium, output.status);
            return Ok(None);
        }
        Ok(parse_wmi_disk_json(&String::from_utf8_lossy(&output.stdout)))
    }
}

fn drive_letter(medium: &MediumRef) -> Option<char> {
    let text = medium.path().to_string_lossy();
    let mut chars = text.chars();
    let letter = chars.next()?;
    (letter.is_ascii_alphabetic() && chars.next() == Some(':'))
        .then(|| letter.to_ascii_uppercase())
}

/// Parses `ConvertTo-Json` output for one or more `Win32_DiskDrive` rows.
fn parse_wmi_disk_json(output: &str) -> Option<HardwareIdentity> {
    let output = output.trim();
    if output.is_empty() {
        return None;
    }
    let drive = match serde_json::from_str::<serde_json::Value>(output).ok()? {
        serde_json::Value::Array(rows) => rows.into_iter().next()?,
        row => row,
    };
    let drive: WmiDiskDrive = serde_json::from_value(drive).ok()?;
    let serial = drive.serial_number.map(|s| s.trim().to_string())?;
    let pnp = drive.pnp_device_id?;
    if serial.is_empty() || pnp.is_empty() {
        return None;
    }
    Some(HardwareIdentity::compose(
        &serial,
        &pnp,
        drive.model.as_deref().unwrap_or_default(),
    ))
}

/// Looks up the identity for `medium`, folding every way of not getting one
/// into [`LicenseError::HardwareUnreadable`] with a distinguishing message.
pub(crate) fn resolve_identity(
    provider: &dyn HardwareIdentityProvider,
    medium: &MediumRef,
) -> LicenseResult<HardwareIdentity> {
    match provider.identify(medium) {
        Ok(Some(identity)) if !identity.id.is_empty() => Ok(identity),
        Ok(_) => Err(LicenseError::HardwareUnreadable(format!(
            "device behind {medium} exposes no identity"
        ))),
        Err(e) => Err(LicenseError::HardwareUnreadable(format!(
            "{} provider: {e}",
            provider.provider_name()
        ))),
    }
}

/// Selects the provider for the running platform.
#[must_use]
pub fn platform_provider() -> Arc<dyn HardwareIdentityProvider> {
    if cfg!(target_os = "linux") {
        Arc::new(SysfsHardwareProvider::default())
    } else if cfg!(windows) {
        Arc::new(WmiHardwareProvider::default())
    } else {
        Arc::new(UnsupportedHardwareProvider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unescape_decodes_octal_sequences() {
        assert_eq!(unescape_mount_field(r"/media/user/MY\040USB"), "/media/user/MY USB");
        assert_eq!(unescape_mount_field(r"/a\134b"), r"/a\b");
        assert_eq!(unescape_mount_field("/plain"), "/plain");
        assert_eq!(unescape_mount_field(r"/trailing\04"), r"/trailing\04");
    }

    #[test]
    fn mount_source_last_entry_wins() {
        let table = "/dev/sdb1 /media/usb vfat rw 0 0\n\
                     tmpfs /run tmpfs rw 0 0\n\
                     /dev/sdc1 /media/usb vfat rw 0 0\n";
        assert_eq!(
            find_mount_source(table, Path::new("/media/usb")).as_deref(),
            Some("/dev/sdc1")
        );
        assert_eq!(find_mount_source(table, Path::new("/media/none")), None);
    }

    #[test]
    fn drive_letter_parsing() {
        assert_eq!(drive_letter(&MediumRef::new("e:\\")), Some('E'));
        assert_eq!(drive_letter(&MediumRef::new("F:")), Some('F'));
        assert_eq!(drive_letter(&MediumRef::new("/media/usb")), None);
    }

    #[test]
    fn wmi_json_single_row() {
        let json = r#"{"SerialNumber":" 4C530001 ","PNPDeviceID":"USBSTOR\\DISK&VEN_SANDISK\\4C530001&0","Model":"SanDisk Cruzer USB Device"}"#;
        let identity = parse_wmi_disk_json(json).unwrap();
        assert_eq!(identity.serial_number, "4C530001");
        assert_eq!(identity.id, r"4C530001_USBSTOR\DISK&VEN_SANDISK\4C530001&0");
        assert_eq!(identity.model, "SanDisk Cruzer USB Device");
    }

    #[test]
    fn wmi_json_array_takes_first() {
        let json = r#"[{"SerialNumber":"A","PNPDeviceID":"P1","Model":"M"},{"SerialNumber":"B","PNPDeviceID":"P2","Model":"M"}]"#;
        assert_eq!(parse_wmi_disk_json(json).unwrap().id, "A_P1");
    }

    #[test]
    fn wmi_json_without_serial_is_absent() {
        assert!(parse_wmi_disk_json(r#"{"SerialNumber":null,"PNPDeviceID":"P","Model":"M"}"#).is_none());
        assert!(parse_wmi_disk_json("").is_none());
        assert!(parse_wmi_disk_json("not json").is_none());
    }

    #[test]
    fn unsupported_provider_reports_unavailable() {
        let result = UnsupportedHardwareProvider.identify(&MediumRef::new("/media/usb"));
        assert!(matches!(result, Err(HardwareError::Unavailable(_))));
    }
}
