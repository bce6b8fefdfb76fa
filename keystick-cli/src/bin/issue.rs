//! Keystick license issuer
//!
//! Writes a hardware-bound license onto an attached removable medium.
//!
//! Usage:
//!   keystick-issue --medium /media/STICK --customer "Acme" --days 365
//!   keystick-issue --list
//!
//! Prints one JSON document on stdout and exits non-zero when no license was
//! written.

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use keystick_cli::{CommonArgs, init_logging, list_drives, print_json};
use keystick_license::{
    IssueOutcome, LicenseIssuer, MediumRef, SystemClock, platform_enumerator, platform_provider,
    write_backup,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "keystick-issue")]
#[command(about = "Issue a hardware-bound license onto a removable medium")]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    /// Root of the medium to write the license to
    #[arg(short, long, required_unless_present = "list")]
    medium: Option<PathBuf>,

    /// Customer the license is issued to
    #[arg(long, required_unless_present = "list")]
    customer: Option<String>,

    /// License duration in days (defaults to the configured duration)
    #[arg(short, long)]
    days: Option<u32>,

    /// Also write a plaintext JSON copy of the record into this directory
    #[arg(long)]
    backup_dir: Option<PathBuf>,

    /// List attached media and their hardware identities, then exit
    #[arg(short, long)]
    list: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.common.verbose);

    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Returns whether the requested action succeeded.
fn run(args: &Args) -> Result<bool> {
    let config = args.common.load_config()?;

    if args.list {
        let enumerator = platform_enumerator(&config);
        let drives = list_drives(enumerator.as_ref(), platform_provider().as_ref());
        print_json(&drives)?;
        return Ok(true);
    }

    let secret = args.common.master_secret()?;
    let medium = MediumRef::new(args.medium.clone().unwrap_or_default());
    let customer = args.customer.clone().unwrap_or_default();
    let days = args.days.unwrap_or(config.default_duration_days);

    info!("Issuing license for {} on {}", customer.trim(), medium);
    let issuer = LicenseIssuer::new(config, secret, platform_provider(), Arc::new(SystemClock));
    let result = issuer.issue(&medium, &customer, days);

    if let (Ok(issued), Some(dir)) = (&result, &args.backup_dir) {
        if let Err(e) = write_backup(&issued.record, dir, Utc::now()) {
            warn!("Backup not written: {}", e);
        }
    }

    let outcome = IssueOutcome::from(&result);
    print_json(&outcome)?;
    Ok(outcome.success)
}
