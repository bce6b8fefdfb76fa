//! Hidden/system file attributes for the license file.
//!
//! Marking the file is cosmetic. Callers record failures as warnings and
//! carry on.

use std::io;
use std::path::Path;
use std::process::Command;

/// Sets and clears the hidden/system markers on a file.
pub trait FileAttributes: Send + Sync {
    /// Marks `path` hidden and system.
    fn hide(&self, path: &Path) -> io::Result<()>;

    /// Removes the hidden and system markers so the file can be replaced.
    fn reveal(&self, path: &Path) -> io::Result<()>;
}

/// Uses `attrib` on Windows. Elsewhere the leading dot already hides the
/// file and there is no system flag, so both operations succeed untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlatformAttributes;

impl PlatformAttributes {
    fn attrib(flags: [&str; 2], path: &Path) -> io::Result<()> {
        let status = Command::new("attrib").args(flags).arg(path).status()?;
        if status.success() {
            Ok(())
        } else {
            Err(io::Error::other(format!("attrib exited with {status}")))
        }
    }
}

impl FileAttributes for PlatformAttributes {
    fn hide(&self, path: &Path) -> io::Result<()> {
        if cfg!(windows) {
            Self::attrib(["+h", "+s"], path)
        } else {
            Ok(())
        }
    }

    fn reveal(&self, path: &Path) -> io::Result<()> {
        if cfg!(windows) {
            Self::attrib(["-h", "-s"], path)
        } else {
            Ok(())
        }
    }
}
