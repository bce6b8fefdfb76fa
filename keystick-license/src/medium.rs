//! Removable media enumeration and license medium lookup.

use crate::config::LicenseConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use tracing::{debug, warn};

/// Root of a mounted medium: a drive root (`E:\`) or a mount path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediumRef(PathBuf);

impl MediumRef {
    /// Wraps a medium root path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    /// Returns the root path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for MediumRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Lists currently mounted removable media in platform order.
pub trait MediaEnumerator: Send + Sync {
    /// Returns candidate medium roots, in a stable order.
    fn removable_media(&self) -> Vec<MediumRef>;
}

/// Scans mount-root directories (`/media`, `/run/media`, `/mnt`).
///
/// Both direct children (`/mnt/usb`) and per-user mounts
/// (`/media/<user>/<label>`) are reported, each level in name order.
#[derive(Debug, Clone)]
pub struct MountRootEnumerator {
    roots: Vec<PathBuf>,
}

impl MountRootEnumerator {
    /// Creates an enumerator over `roots`.
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }
}

impl MediaEnumerator for MountRootEnumerator {
    fn removable_media(&self) -> Vec<MediumRef> {
        let mut media = Vec::new();
        for root in &self.roots {
            for child in sorted_subdirs(root) {
                let grandchildren = sorted_subdirs(&child);
                media.push(MediumRef::new(child));
                media.extend(grandchildren.into_iter().map(MediumRef::new));
            }
        }
        media
    }
}

fn sorted_subdirs(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut dirs: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    dirs.sort();
    dirs
}

/// Removable drive letters on Windows.
///
/// Asks CIM for `Win32_LogicalDisk` rows with `DriveType = 2` (removable), so
/// fixed disks such as `C:\` are never reported. When PowerShell cannot run,
/// every existing letter `A:` through `Z:` is probed instead.
#[derive(Debug, Clone)]
pub struct DriveLetterEnumerator {
    shell: String,
}

impl Default for DriveLetterEnumerator {
    fn default() -> Self {
        Self {
            shell: "powershell".to_string(),
        }
    }
}

const REMOVABLE_DRIVES_QUERY: &str = "Get-CimInstance Win32_LogicalDisk -Filter 'DriveType=2' | \
     Select-Object -ExpandProperty DeviceID | ConvertTo-Json -Compress";

impl DriveLetterEnumerator {
    fn query_removable(&self) -> Option<Vec<MediumRef>> {
        let output = Command::new(&self.shell)
            .args(["-NoProfile", "-NonInteractive", "-Command", REMOVABLE_DRIVES_QUERY])
            .output();
        match output {
            Ok(output) if output.status.success() => {
                Some(parse_removable_drives(&String::from_utf8_lossy(&output.stdout)))
            }
            Ok(output) => {
                warn!("Removable drive query exited with {}", output.status);
                None
            }
            Err(e) => {
                warn!("Cannot run {}: {}", self.shell, e);
                None
            }
        }
    }
}

impl MediaEnumerator for DriveLetterEnumerator {
    fn removable_media(&self) -> Vec<MediumRef> {
        self.query_removable().unwrap_or_else(|| {
            ('A'..='Z')
                .map(|letter| PathBuf::from(format!("{letter}:\\")))
                .filter(|root| root.exists())
                .map(MediumRef::new)
                .collect()
        })
    }
}

/// Parses `ConvertTo-Json` output of removable `DeviceID`s (`"E:"` or
/// `["E:","F:"]`) into sorted drive roots.
fn parse_removable_drives(output: &str) -> Vec<MediumRef> {
    let output = output.trim();
    if output.is_empty() {
        return Vec::new();
    }
    let ids = match serde_json::from_str::<serde_json::Value>(output) {
        Ok(serde_json::Value::Array(rows)) => rows,
        Ok(row) => vec![row],
        Err(e) => {
            debug!("Unparseable drive list {:?}: {}", output, e);
            return Vec::new();
        }
    };
    let mut letters: Vec<char> = ids
        .iter()
        .filter_map(serde_json::Value::as_str)
        .filter_map(|id| {
            let mut chars = id.trim().chars();
            let letter = chars.next()?;
            (letter.is_ascii_alphabetic() && chars.next() == Some(':'))
                .then(|| letter.to_ascii_uppercase())
        })
        .collect();
    letters.sort_unstable();
    letters.dedup();
    letters
        .into_iter()
        .map(|letter| MediumRef::new(format!("{letter}:\\")))
        .collect()
}

/// Fixed list of media, for tests and simulations.
#[derive(Debug, Clone, Default)]
pub struct StaticMediaEnumerator {
    media: Vec<MediumRef>,
}

impl StaticMediaEnumerator {
    /// Creates an enumerator that always reports `media`.
    pub fn new(media: Vec<MediumRef>) -> Self {
        Self { media }
    }
}

impl MediaEnumerator for StaticMediaEnumerator {
    fn removable_media(&self) -> Vec<MediumRef> {
        self.media.clone()
    }
}

/// Selects the enumerator for the running platform.
#[must_use]
pub fn platform_enumerator(config: &LicenseConfig) -> Arc<dyn MediaEnumerator> {
    if cfg!(windows) {
        Arc::new(DriveLetterEnumerator::default())
    } else {
        Arc::new(MountRootEnumerator::new(config.mount_roots.clone()))
    }
}

/// Finds the medium that carries the license file.
pub struct MediumLocator {
    enumerator: Arc<dyn MediaEnumerator>,
    license_file_name: String,
}

impl MediumLocator {
    /// Creates a locator looking for `config.license_file_name`.
    pub fn new(enumerator: Arc<dyn MediaEnumerator>, config: &LicenseConfig) -> Self {
        Self {
            enumerator,
            license_file_name: config.license_file_name.clone(),
        }
    }

    /// Returns the first enumerated medium whose root holds the license file.
    ///
    /// With several qualifying media, enumeration order decides.
    #[must_use]
    pub fn locate(&self) -> Option<MediumRef> {
        let found = self
            .enumerator
            .removable_media()
            .into_iter()
            .find(|medium| medium.path().join(&self.license_file_name).is_file());
        match &found {
            Some(medium) => debug!("License medium found at {}", medium),
            None => debug!("No medium carries {}", self.license_file_name),
        }
        found
    }
}
