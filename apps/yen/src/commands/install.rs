//! Install command for the yen CLI.
//!
//! Installs a package into its own environment and publishes a shim for it
//! in the packages directory.
//!
//! ## Usage
//!
//! ```bash
//! yen install black                  # shim runs the `black` entry point
//! yen install httpie --binary http   # entry point named differently
//! yen install calc --module          # shim runs `python -m calc`
//! yen install black --force-reinstall
//! ```

use anyhow::Result;
use clap::Args;

use crate::config::{Config, DEFAULT_PYTHON_VERSION};
use crate::packages::pathcheck::{check_shim, format_warnings};
use crate::packages::{InstallOutcome, Invocation, PackageRequest, ShimPublisher};
use crate::python::{PlatformProfile, RuntimeStore};

use super::select_platform;

/// Arguments for the install command.
#[derive(Args)]
pub struct InstallArgs {
    /// Package to install.
    pub package: String,

    /// Python version to install the package with.
    #[clap(short = 'p', long = "python", default_value = DEFAULT_PYTHON_VERSION)]
    pub python: String,

    /// Name of the entry point to expose, if it differs from the package name.
    #[clap(long, value_name = "NAME", conflicts_with = "module")]
    pub binary: Option<String>,

    /// Expose the package as `python -m NAME` (defaults to the package name).
    #[clap(long, value_name = "NAME", num_args = 0..=1)]
    pub module: Option<Option<String>>,

    /// Remove an existing install and start over.
    #[clap(long)]
    pub force_reinstall: bool,

    /// Use a 32-bit Python build.
    #[clap(long = "32bit")]
    pub force_32bit: bool,
}

impl InstallArgs {
    fn invocation(&self) -> Invocation {
        match (&self.binary, &self.module) {
            (_, Some(module)) => Invocation::Module {
                name: module.clone().unwrap_or_else(|| self.package.clone()),
            },
            (Some(binary), None) => Invocation::Binary {
                name: binary.clone(),
                inferred: false,
            },
            (None, None) => Invocation::Binary {
                name: self.package.clone(),
                inferred: true,
            },
        }
    }
}

/// Executes the install command.
///
/// # Errors
///
/// Returns an error if the runtime cannot be acquired, the environment
/// cannot be created, `pip install` fails, or the entry point is missing.
pub async fn execute(config: &Config, platform: PlatformProfile, args: &InstallArgs) -> Result<()> {
    let platform = select_platform(platform, args.force_32bit)?;
    let invocation = args.invocation();
    let outcome = install_package(
        config,
        platform,
        &args.package,
        &args.python,
        invocation,
        args.force_reinstall,
    )
    .await?;

    if outcome.already_existed {
        println!("Package {} is already installed.", args.package);
    } else {
        let version = outcome
            .python_version
            .as_ref()
            .map_or_else(|| args.python.clone(), ToString::to_string);
        println!("Installed package {} with Python {version}", args.package);
    }

    let path_var = std::env::var_os("PATH");
    let report = check_shim(&config.packages_root, &outcome.shim_path, path_var.as_deref());
    for warning in format_warnings(&report, &config.packages_root, &outcome.shim_path) {
        eprintln!("{warning}");
    }
    Ok(())
}

/// Installs `package` unless its shim already exists.
///
/// The runtime is only acquired when an install actually happens.
pub(crate) async fn install_package(
    config: &Config,
    platform: PlatformProfile,
    package: &str,
    python: &str,
    invocation: Invocation,
    force_reinstall: bool,
) -> Result<InstallOutcome> {
    let publisher = ShimPublisher::new(config, platform)?;
    if !force_reinstall && let Some(outcome) = publisher.existing(package) {
        return Ok(outcome);
    }

    let runtime = RuntimeStore::new(config, platform).ensure(Some(python)).await?;
    tracing::debug!(
        %package,
        invocation = invocation.name(),
        version = %runtime.version,
        "installing package"
    );

    let mut outcome = publisher.install(&PackageRequest {
        package,
        python: &runtime.python,
        invocation,
        force_reinstall,
    })?;
    outcome.python_version = Some(runtime.version);
    Ok(outcome)
}
