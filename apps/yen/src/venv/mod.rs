//! Isolated environment provisioning.
//!
//! Environments are built by one of two [`EnvironmentBuilder`]s:
//!
//! - [`delegated::DelegatedBuilder`] runs the runtime's own `-m venv`
//! - [`scratch::FromScratchBuilder`] lays the directory tree out directly,
//!   writes `pyvenv.cfg` and symlinks the interpreter aliases
//!
//! [`EnvironmentProvisioner`] picks one from the configured
//! [`VenvStrategy`] and is the only place that choice is made.

pub mod delegated;
pub mod descriptor;
pub mod layout;
pub mod scratch;

use std::collections::BTreeSet;
use std::path::Path;
use std::process::{Command, Output};

use anyhow::{Context, Result};

use crate::config::{Config, VenvStrategy};
use crate::errors::YenError;
use crate::python::PlatformProfile;

use delegated::DelegatedBuilder;
use descriptor::PyvenvCfg;
use scratch::FromScratchBuilder;

/// Ignore-file conventions that can be written into an environment.
const SUPPORTED_SCM_IGNORE_FILES: &[&str] = &["git"];

/// Options for a single environment creation.
#[derive(Debug, Clone, Default)]
pub struct EnvOptions {
    /// Make sure `pip` is importable inside the environment.
    pub with_pip: bool,
    /// Ignore-file conventions to write at the environment root.
    pub scm_ignore_files: BTreeSet<String>,
    /// Treat an existing environment at the target as success.
    pub exist_ok: bool,
    /// Command line recorded in `pyvenv.cfg`. Defaults to the running
    /// process's own arguments.
    pub command: Option<String>,
}

impl EnvOptions {
    /// The command line to record for an environment built with these options.
    #[must_use]
    pub fn command_line(&self) -> String {
        self.command.clone().unwrap_or_else(|| {
            std::env::args_os()
                .map(|arg| arg.to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join(" ")
        })
    }
}

/// A way of creating an environment from a base interpreter.
pub trait EnvironmentBuilder: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Creates an environment at `target` rooted at the interpreter `python`.
    ///
    /// `target` does not exist or is an empty directory when this is called.
    ///
    /// # Errors
    ///
    /// Returns an error if any filesystem step or subprocess fails.
    fn build(&self, python: &Path, target: &Path, options: &EnvOptions) -> Result<()>;
}

/// Creates environments using the configured strategy.
pub struct EnvironmentProvisioner {
    builder: Box<dyn EnvironmentBuilder>,
}

impl EnvironmentProvisioner {
    /// Selects the builder for `config.venv_strategy` on `platform`.
    ///
    /// # Errors
    ///
    /// Returns [`YenError::InvalidConfig`] when the from-scratch strategy is
    /// forced on Windows.
    pub fn new(config: &Config, platform: PlatformProfile) -> Result<Self> {
        let builder: Box<dyn EnvironmentBuilder> = match config.venv_strategy {
            VenvStrategy::Delegated => Box::new(DelegatedBuilder::new(platform)),
            VenvStrategy::Auto if platform.is_windows() => Box::new(DelegatedBuilder::new(platform)),
            VenvStrategy::Auto => Box::new(FromScratchBuilder::new(platform)),
            VenvStrategy::FromScratch if platform.is_windows() => {
                return Err(YenError::invalid_config(
                    "the microvenv strategy is not supported on Windows",
                )
                .into());
            }
            VenvStrategy::FromScratch => Box::new(FromScratchBuilder::new(platform)),
        };
        tracing::debug!(strategy = builder.name(), "selected environment builder");
        Ok(Self { builder })
    }

    #[must_use]
    pub fn strategy_name(&self) -> &'static str {
        self.builder.name()
    }

    /// Creates an environment at `target` from the interpreter `python`.
    ///
    /// With `exist_ok`, an existing environment (a directory holding
    /// `pyvenv.cfg`) is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`YenError::TargetExists`] if `target` exists and `exist_ok`
    /// is not set, [`YenError::UnsupportedScmIgnore`] for an unknown
    /// ignore-file convention, or the builder's error.
    pub fn create(&self, python: &Path, target: &Path, options: &EnvOptions) -> Result<()> {
        validate_scm_ignore_files(&options.scm_ignore_files)?;

        if target.exists() {
            if !options.exist_ok {
                return Err(YenError::target_exists(target).into());
            }
            if target.join(descriptor::FILE_NAME).is_file() {
                tracing::debug!(target = %target.display(), "environment already exists");
                return Ok(());
            }
        }

        tracing::debug!(
            strategy = self.builder.name(),
            python = %python.display(),
            target = %target.display(),
            "creating environment"
        );
        self.builder.build(python, target, options)
    }
}

/// Warns when an environment's base interpreter has been removed.
///
/// Never fails: a missing or unreadable descriptor is only logged.
pub fn warn_if_stale(env_dir: &Path) {
    match PyvenvCfg::read(env_dir) {
        Ok(Some(cfg)) if cfg.is_stale() => {
            eprintln!(
                "Warning: the Python used by {} no longer exists at {}. \
                 Reinstall with --force-reinstall.",
                env_dir.display(),
                cfg.home.display()
            );
        }
        Ok(_) => {}
        Err(err) => tracing::debug!("cannot read environment descriptor: {err:#}"),
    }
}

fn validate_scm_ignore_files(names: &BTreeSet<String>) -> Result<(), YenError> {
    let unsupported: Vec<&str> = names
        .iter()
        .map(String::as_str)
        .filter(|name| !SUPPORTED_SCM_IGNORE_FILES.contains(name))
        .collect();
    if unsupported.is_empty() {
        Ok(())
    } else {
        Err(YenError::UnsupportedScmIgnore {
            names: unsupported.join(", "),
        })
    }
}

/// Writes the requested ignore files at the environment root.
pub(crate) fn write_scm_ignore_files(root: &Path, names: &BTreeSet<String>) -> Result<()> {
    validate_scm_ignore_files(names)?;
    if names.contains("git") {
        let path = root.join(".gitignore");
        std::fs::write(&path, "*\n")
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    Ok(())
}

/// Runs a command to completion with captured output.
///
/// A non-zero exit becomes [`YenError::SubprocessFailed`] carrying stderr.
pub(crate) fn run_checked(command: &mut Command, description: &str) -> Result<Output> {
    tracing::debug!(?command, "running subprocess");
    let output = command
        .output()
        .with_context(|| format!("Failed to start {description}"))?;
    if !output.status.success() {
        return Err(
            YenError::subprocess_failed(description, output.status, &output.stderr).into(),
        );
    }
    Ok(output)
}
