//! Shared plumbing for the `keystick-issue` and `keystick-check` tools.
//!
//! Both tools print exactly one JSON document on stdout. Logs go to stderr.

use anyhow::{Context, Result, bail};
use clap::Args;
use keystick_crypto::MasterSecret;
use keystick_license::{
    HardwareIdentity, HardwareIdentityProvider, LicenseConfig, MediaEnumerator, MediumRef,
};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Secret baked in at build time, used when neither flag nor env var is set.
const BUILD_SECRET: Option<&str> = option_env!("KEYSTICK_MASTER_SECRET");

/// Options accepted by both tools.
#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// JSON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Master secret shared by issuer and validator
    #[arg(long, env = "KEYSTICK_MASTER_SECRET", hide_env_values = true)]
    pub secret: Option<String>,

    /// Enable verbose debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl CommonArgs {
    /// Loads the config file, or defaults when none was given.
    pub fn load_config(&self) -> Result<LicenseConfig> {
        match &self.config {
            Some(path) => Ok(LicenseConfig::from_json_file(path)?),
            None => Ok(LicenseConfig::default()),
        }
    }

    /// Resolves the master secret: flag/env first, then the build-time value.
    pub fn master_secret(&self) -> Result<MasterSecret> {
        resolve_secret(self.secret.as_deref(), BUILD_SECRET)
    }
}

/// Picks the runtime secret over the build-time one.
pub fn resolve_secret(runtime: Option<&str>, built_in: Option<&str>) -> Result<MasterSecret> {
    let Some(secret) = runtime.filter(|s| !s.is_empty()).or(built_in) else {
        bail!("no master secret: pass --secret or set KEYSTICK_MASTER_SECRET");
    };
    MasterSecret::new(secret).context("invalid master secret")
}

/// Installs the stderr log subscriber. `RUST_LOG` overrides `verbose`.
pub fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    // A second init (tests) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
}

/// Writes `value` as one line of JSON to stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer(&mut stdout, value).context("failed to encode output")?;
    writeln!(stdout)?;
    stdout.flush()?;
    Ok(())
}

/// One attached medium as shown by `keystick-issue --list`.
#[derive(Debug, Clone, Serialize)]
pub struct DriveListing {
    /// Medium root.
    pub medium: MediumRef,
    /// Device identity, when readable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<HardwareIdentity>,
    /// Why the identity is missing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Lists attached media together with their hardware identities.
pub fn list_drives(
    enumerator: &dyn MediaEnumerator,
    provider: &dyn HardwareIdentityProvider,
) -> Vec<DriveListing> {
    enumerator
        .removable_media()
        .into_iter()
        .map(|medium| match provider.identify(&medium) {
            Ok(Some(identity)) => DriveListing {
                medium,
                identity: Some(identity),
                error: None,
            },
            Ok(None) => DriveListing {
                medium,
                identity: None,
                error: Some("no hardware identity".to_string()),
            },
            Err(e) => DriveListing {
                medium,
                identity: None,
                error: Some(e.to_string()),
            },
        })
        .collect()
}
