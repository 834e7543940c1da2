#![warn(clippy::pedantic)]

//! # yen
//!
//! Downloads standalone Python runtimes and installs Python command-line
//! packages into isolated environments, each exposed through one shim.
//!
//! ## Subcommands
//!
//! - `list` - List Python versions available for this platform
//! - `create` - Create an isolated environment
//! - `install` - Install a package behind a shim
//! - `run` - Install a package if needed and run it
//! - `exec` - Run a Python runtime directly
//!
//! ## Examples
//!
//! ```bash
//! yen create .venv -p 3.12
//! yen install black
//! yen run ruff -- check .
//! yen exec -p 3.11
//! ```

mod commands;
mod config;
mod errors;
mod packages;
mod python;
mod venv;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{create, exec, install, list, run, trim_release_data};
use config::Config;
use errors::YenError;
use python::PlatformProfile;
use tracing_subscriber::EnvFilter;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("YEN_GIT_COMMIT"),
    ")"
);

/// Python runtime and package manager.
#[derive(Parser)]
#[command(
    name = "yen",
    author,
    version,
    long_version = LONG_VERSION,
    about = "The last Python environment manager you'll ever need",
    after_help = "\
ENVIRONMENT VARIABLES:
    YEN_PYTHONS_PATH        Runtime directory (default: ~/.yen_pythons)
    YEN_PACKAGES_PATH       Package and shim directory (default: ~/.yen_packages)
    YEN_RELEASES_URL        Release metadata endpoint
    YEN_VENV_STRATEGY       auto, venv or microvenv (default: auto)
    YEN_SCM_IGNORE_FILES    Ignore files written into environments (default: git)
    RUST_LOG                Log filter, overrides -v"
)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace).
    #[clap(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for the yen CLI.
#[derive(Subcommand)]
pub enum Commands {
    /// List available Python versions.
    List(list::ListArgs),

    /// Create an isolated environment.
    ///
    /// Downloads the requested Python if needed, then creates the
    /// environment at PATH. Fails if PATH already exists.
    Create(create::CreateArgs),

    /// Install a package behind a shim.
    ///
    /// The package gets its own environment under the packages directory
    /// and a single shim next to it. Installing again is a no-op unless
    /// --force-reinstall is given.
    Install(install::InstallArgs),

    /// Install a package if needed, then run it.
    Run(run::RunArgs),

    /// Run a Python runtime directly.
    Exec(exec::ExecArgs),

    /// Trim a release JSON to the fields yen reads.
    #[command(hide = true)]
    TrimReleaseData(trim_release_data::TrimReleaseDataArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        let exit_code = handle_error(&e);
        std::process::exit(exit_code);
    }
}

fn init_tracing(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Prints an error and returns the exit code for it.
///
/// `ProcessExitCode` is returned silently; the child already reported.
fn handle_error(e: &anyhow::Error) -> i32 {
    match e.downcast_ref::<YenError>() {
        Some(YenError::ProcessExitCode { code }) => *code,
        Some(err) => {
            eprintln!("Error: {err}");
            if let Some(hint) = err.hint() {
                eprintln!("{hint}");
            }
            err.exit_code()
        }
        None => {
            eprintln!("Error: {e:#}");
            1
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    if let Commands::TrimReleaseData(args) = &cli.command {
        return trim_release_data::execute(args);
    }

    let config = Config::from_env()?;
    let platform = PlatformProfile::detect()?;
    tracing::debug!(?config, %platform, "starting");

    match cli.command {
        Commands::List(args) => list::execute(&config, platform, &args).await,
        Commands::Create(args) => create::execute(&config, platform, &args).await,
        Commands::Install(args) => install::execute(&config, platform, &args).await,
        Commands::Run(args) => run::execute(&config, platform, &args).await,
        Commands::Exec(args) => exec::execute(&config, platform, &args).await,
        Commands::TrimReleaseData(args) => trim_release_data::execute(&args),
    }
}
