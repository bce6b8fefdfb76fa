//! Keystick license validator
//!
//! Finds the attached license medium and checks that its license is intact,
//! unexpired and bound to the device it sits on.
//!
//! Usage:
//!   keystick-check
//!   keystick-check --medium /media/STICK
//!
//! Always prints one verdict as JSON and exits 0; callers read `valid`.

use anyhow::Result;
use clap::Parser;
use keystick_cli::{CommonArgs, init_logging, print_json};
use keystick_license::{
    LicenseValidator, MediumLocator, MediumRef, ReasonCode, SystemClock, Verdict,
    platform_enumerator, platform_provider,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::error;

#[derive(Parser, Debug)]
#[command(name = "keystick-check")]
#[command(about = "Validate the license on the attached removable medium")]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    /// Check this medium instead of scanning for one
    #[arg(short, long)]
    medium: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.common.verbose);

    let verdict = run(&args).unwrap_or_else(|e| {
        error!("{:#}", e);
        Verdict::rejected(ReasonCode::InvalidInput, format!("{:#}", e))
    });

    if let Err(e) = print_json(&verdict) {
        error!("{:#}", e);
    }
    ExitCode::SUCCESS
}

fn run(args: &Args) -> Result<Verdict> {
    let config = args.common.load_config()?;
    let secret = args.common.master_secret()?;

    let locator = MediumLocator::new(platform_enumerator(&config), &config);
    let validator = LicenseValidator::new(
        config,
        secret,
        locator,
        platform_provider(),
        Arc::new(SystemClock),
    );

    Ok(match &args.medium {
        Some(path) => validator.validate_medium(&MediumRef::new(path)),
        None => validator.validate(),
    })
}
