//! Linux provider against a fake sysfs tree and mount table.

#![cfg(unix)]

use keystick_license::{HardwareError, HardwareIdentityProvider, MediumRef, SysfsHardwareProvider};
use std::fs;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const USB_DEV: &str = "devices/pci0000:00/0000:00:14.0/usb1/1-2";
const SCSI_DEV: &str = "1-2:1.0/host6/target6:0:0/6:0:0:0";

struct FakeSystem {
    _tmp: TempDir,
    sys: PathBuf,
    mounts: PathBuf,
    medium: MediumRef,
}

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Builds a USB stick `sdb` with partition `sdb1` mounted at `<tmp>/media/STICK`.
fn fake_system(with_serial: bool) -> FakeSystem {
    let tmp = TempDir::new().unwrap();
    let root = fs::canonicalize(tmp.path()).unwrap();
    let sys = root.join("sys");

    let usb = sys.join(USB_DEV);
    if with_serial {
        write(&usb.join("serial"), "4C530001250520117463\n");
    }
    write(&usb.join("idVendor"), "0781\n");
    write(&usb.join("idProduct"), "5567\n");

    let scsi = usb.join(SCSI_DEV);
    write(&scsi.join("model"), "Cruzer Blade    \n");
    let disk = scsi.join("block/sdb");
    write(&disk.join("sdb1/partition"), "1\n");
    symlink(&scsi, disk.join("device")).unwrap();

    fs::create_dir_all(sys.join("class/block")).unwrap();
    symlink(disk.join("sdb1"), sys.join("class/block/sdb1")).unwrap();
    symlink(&disk, sys.join("class/block/sdb")).unwrap();

    let mount_point = root.join("media/MY STICK");
    fs::create_dir_all(&mount_point).unwrap();
    let mounts = root.join("mounts");
    let escaped = mount_point.to_string_lossy().replace(' ', "\\040");
    write(
        &mounts,
        &format!(
            "proc /proc proc rw 0 0\n/dev/sdb1 {escaped} vfat rw,nosuid 0 0\n"
        ),
    );

    FakeSystem {
        _tmp: tmp,
        sys,
        mounts,
        medium: MediumRef::new(mount_point),
    }
}

#[test]
fn identifies_usb_stick_partition() {
    let fake = fake_system(true);
    let provider = SysfsHardwareProvider::new(&fake.mounts, &fake.sys);

    let identity = provider.identify(&fake.medium).unwrap().unwrap();
    assert_eq!(identity.serial_number, "4C530001250520117463");
    assert_eq!(identity.model, "Cruzer Blade");
    assert_eq!(identity.id, "4C530001250520117463_USB\\VID_0781&PID_5567");
}

#[test]
fn identity_is_stable_across_calls() {
    let fake = fake_system(true);
    let provider = SysfsHardwareProvider::new(&fake.mounts, &fake.sys);
    let a = provider.identify(&fake.medium).unwrap();
    let b = provider.identify(&fake.medium).unwrap();
    assert_eq!(a, b);
}

#[test]
fn device_without_serial_has_no_identity() {
    let fake = fake_system(false);
    let provider = SysfsHardwareProvider::new(&fake.mounts, &fake.sys);
    assert_eq!(provider.identify(&fake.medium).unwrap(), None);
}

#[test]
fn unmounted_directory_has_no_identity() {
    let fake = fake_system(true);
    let other = fake.sys.parent().unwrap().join("media");
    let provider = SysfsHardwareProvider::new(&fake.mounts, &fake.sys);
    assert_eq!(provider.identify(&MediumRef::new(other)).unwrap(), None);
}

#[test]
fn missing_sysfs_is_unavailable() {
    let fake = fake_system(true);
    let provider = SysfsHardwareProvider::new(&fake.mounts, fake.sys.join("absent"));
    assert!(matches!(
        provider.identify(&fake.medium),
        Err(HardwareError::Unavailable(_))
    ));
}

#[test]
fn unreadable_mount_table_is_io_error() {
    let fake = fake_system(true);
    let provider = SysfsHardwareProvider::new(fake.mounts.with_extension("gone"), &fake.sys);
    assert!(matches!(
        provider.identify(&fake.medium),
        Err(HardwareError::Io(_))
    ));
}
