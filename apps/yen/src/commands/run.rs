//! Run command for the yen CLI.
//!
//! Installs a package on first use and runs its shim with the remaining
//! arguments. The shim's exit code becomes yen's exit code.
//!
//! ## Usage
//!
//! ```bash
//! yen run black -- --check src/
//! yen run -p 3.11 ruff check .
//! ```

use std::process::Command;

use anyhow::Result;
use clap::Args;

use crate::config::{Config, DEFAULT_PYTHON_VERSION};
use crate::packages::Invocation;
use crate::python::PlatformProfile;

use super::install::install_package;
use super::{run_inherited, select_platform};

/// Arguments for the run command.
#[derive(Args)]
pub struct RunArgs {
    /// Package whose entry point to run.
    pub package: String,

    /// Python version to install the package with on first use.
    #[clap(short = 'p', long = "python", default_value = DEFAULT_PYTHON_VERSION)]
    pub python: String,

    /// Use a 32-bit Python build.
    #[clap(long = "32bit")]
    pub force_32bit: bool,

    /// Arguments passed to the package.
    #[clap(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

/// Executes the run command.
///
/// # Errors
///
/// Returns `Err(YenError::ProcessExitCode)` if the package exits non-zero,
/// or the install error if the package could not be installed.
pub async fn execute(config: &Config, platform: PlatformProfile, args: &RunArgs) -> Result<()> {
    let platform = select_platform(platform, args.force_32bit)?;
    let invocation = Invocation::Binary {
        name: args.package.clone(),
        inferred: true,
    };
    let outcome =
        install_package(config, platform, &args.package, &args.python, invocation, false).await?;

    run_inherited(Command::new(&outcome.shim_path).args(&args.args))
}
