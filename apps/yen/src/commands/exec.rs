//! Exec command for the yen CLI.
//!
//! Runs a Python runtime directly, downloading it first if needed.
//!
//! ## Usage
//!
//! ```bash
//! yen exec                       # interactive 3.12 interpreter
//! yen exec -p 3.11 -- -c "print(1)"
//! ```

use std::process::Command;

use anyhow::Result;
use clap::Args;

use crate::config::{Config, DEFAULT_PYTHON_VERSION};
use crate::python::{PlatformProfile, RuntimeStore};

use super::{run_inherited, select_platform};

/// Arguments for the exec command.
#[derive(Args)]
pub struct ExecArgs {
    /// Python version to run.
    #[clap(short = 'p', long = "python", default_value = DEFAULT_PYTHON_VERSION)]
    pub python: String,

    /// Use a 32-bit Python build.
    #[clap(long = "32bit")]
    pub force_32bit: bool,

    /// Arguments passed to the interpreter.
    #[clap(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

/// Executes the exec command.
///
/// # Errors
///
/// Returns `Err(YenError::ProcessExitCode)` if the interpreter exits
/// non-zero, or the acquisition error if the runtime could not be installed.
pub async fn execute(config: &Config, platform: PlatformProfile, args: &ExecArgs) -> Result<()> {
    let platform = select_platform(platform, args.force_32bit)?;
    let runtime = RuntimeStore::new(config, platform)
        .ensure(Some(&args.python))
        .await?;

    run_inherited(Command::new(&runtime.python).args(&args.args))
}
