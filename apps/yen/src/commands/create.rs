//! Create command for the yen CLI.
//!
//! Downloads the requested Python if needed and creates an isolated
//! environment from it at the given path.
//!
//! ## Usage
//!
//! ```bash
//! yen create .venv -p 3.12
//! yen create env --python 3.11 --without-scm-ignore-files
//! ```

use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::config::Config;
use crate::errors::YenError;
use crate::python::{PlatformProfile, RuntimeStore};
use crate::venv::{EnvOptions, EnvironmentProvisioner};

use super::select_platform;

/// Arguments for the create command.
#[derive(Args)]
pub struct CreateArgs {
    /// Directory to create the environment in. Must not exist.
    pub path: PathBuf,

    /// Python version to use, e.g. "3.12" or "latest".
    #[clap(short = 'p', long = "python")]
    pub python: String,

    /// Don't write a .gitignore into the environment.
    #[clap(long)]
    pub without_scm_ignore_files: bool,

    /// Use a 32-bit Python build.
    #[clap(long = "32bit")]
    pub force_32bit: bool,
}

/// Executes the create command.
///
/// The target is checked before anything is downloaded.
///
/// # Errors
///
/// Returns [`YenError::TargetExists`] if the path exists,
/// [`YenError::VersionUnavailable`] for an unknown version, or the error of
/// the failing acquisition or provisioning step.
pub async fn execute(config: &Config, platform: PlatformProfile, args: &CreateArgs) -> Result<()> {
    if args.path.exists() {
        return Err(YenError::target_exists(&args.path).into());
    }

    let platform = select_platform(platform, args.force_32bit)?;
    let provisioner = EnvironmentProvisioner::new(config, platform)?;
    let runtime = RuntimeStore::new(config, platform)
        .ensure(Some(&args.python))
        .await?;

    let options = EnvOptions {
        with_pip: true,
        scm_ignore_files: if args.without_scm_ignore_files {
            BTreeSet::new()
        } else {
            config.scm_ignore_files.clone()
        },
        exist_ok: false,
        command: None,
    };
    tracing::debug!(strategy = provisioner.strategy_name(), "creating environment");
    provisioner.create(&runtime.python, &args.path, &options)?;

    println!(
        "Created {} with Python {}",
        args.path.display(),
        runtime.version
    );
    Ok(())
}
