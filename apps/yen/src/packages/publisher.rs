//! Package installation and shim publishing.
//!
//! Every package gets its own environment at `<packages_root>/venv_<pkg>`
//! and exactly one shim next to it. The shim's existence alone decides
//! whether a package is installed.
//!
//! Concurrent installs of the same package are not coordinated. Each builds
//! into the same environment directory and the last one to publish its shim
//! wins.

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use semver::Version;

use crate::config::Config;
use crate::errors::YenError;
use crate::python::PlatformProfile;
use crate::venv::layout::{env_python, executable_path};
use crate::venv::{EnvOptions, EnvironmentProvisioner, run_checked, warn_if_stale};

use super::shim::{Invocation, module_launcher, shim_candidates, shim_path, write_launcher};

/// A package to install and how to expose it.
#[derive(Debug, Clone)]
pub struct PackageRequest<'a> {
    pub package: &'a str,
    /// Runtime interpreter the environment is built from.
    pub python: &'a Path,
    pub invocation: Invocation,
    pub force_reinstall: bool,
}

/// Result of [`ShimPublisher::install`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    pub shim_path: PathBuf,
    /// The shim was already there and nothing was installed.
    pub already_existed: bool,
    /// Runtime version the package was installed with, when known.
    pub python_version: Option<Version>,
}

pub struct ShimPublisher {
    packages_root: PathBuf,
    platform: PlatformProfile,
    provisioner: EnvironmentProvisioner,
}

impl ShimPublisher {
    /// Creates a publisher using the configured environment strategy.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured strategy is unusable on `platform`.
    pub fn new(config: &Config, platform: PlatformProfile) -> Result<Self> {
        Ok(Self {
            packages_root: config.packages_root.clone(),
            platform,
            provisioner: EnvironmentProvisioner::new(config, platform)?,
        })
    }

    /// Directory of the environment owned by `package`.
    #[must_use]
    pub fn env_dir(&self, package: &str) -> PathBuf {
        self.packages_root.join(format!("venv_{package}"))
    }

    /// Shims currently published for `package`, under any name it may have.
    fn published_shims(&self, package: &str) -> Vec<PathBuf> {
        shim_candidates(&self.packages_root, package, &self.platform)
            .into_iter()
            .filter(|candidate| std::fs::symlink_metadata(candidate).is_ok())
            .collect()
    }

    /// Reports an already published shim for `package`, if there is one.
    ///
    /// Any shim counts, whatever mode it was installed in. Touches neither
    /// the network nor any subprocess, so callers can skip runtime
    /// acquisition entirely for installed packages.
    #[must_use]
    pub fn existing(&self, package: &str) -> Option<InstallOutcome> {
        let shim = self.published_shims(package).into_iter().next()?;
        tracing::debug!(shim = %shim.display(), "package already installed");
        warn_if_stale(&self.env_dir(package));
        Some(InstallOutcome {
            shim_path: shim,
            already_existed: true,
            python_version: None,
        })
    }

    /// Installs a package and publishes its shim.
    ///
    /// Returns early with `already_existed` set when the shim is present and
    /// `force_reinstall` is off. With `force_reinstall`, every shim of the
    /// package is removed before the environment so no shim is visible
    /// during the rebuild.
    ///
    /// # Errors
    ///
    /// Returns [`YenError::ExecutableNotFound`] when the package has no entry
    /// point with the requested name; the new environment is removed first.
    /// Environment creation and `pip install` failures are propagated.
    pub fn install(&self, request: &PackageRequest<'_>) -> Result<InstallOutcome> {
        let package = request.package;
        let shim = shim_path(
            &self.packages_root,
            package,
            &request.invocation,
            &self.platform,
        );
        let env_dir = self.env_dir(package);

        if !request.force_reinstall
            && let Some(outcome) = self.existing(package)
        {
            return Ok(outcome);
        }

        for stale in self.published_shims(package) {
            std::fs::remove_file(&stale)
                .with_context(|| format!("Failed to remove shim: {}", stale.display()))?;
        }
        if env_dir.exists() {
            tracing::debug!(env = %env_dir.display(), "removing previous environment");
            remove_env(&env_dir)?;
        }

        std::fs::create_dir_all(&self.packages_root).with_context(|| {
            format!(
                "Failed to create directory: {}",
                self.packages_root.display()
            )
        })?;

        let options = EnvOptions {
            with_pip: true,
            ..EnvOptions::default()
        };
        self.provisioner.create(request.python, &env_dir, &options)?;

        let venv_python = env_python(&env_dir, &self.platform);
        tracing::debug!(%package, "installing package with pip");
        run_checked(
            Command::new(&venv_python).args(["-m", "pip", "install", package]),
            &format!("pip install {package}"),
        )?;

        match &request.invocation {
            Invocation::Module { name } => {
                write_launcher(&shim, &module_launcher(&venv_python, name, &self.platform))?;
            }
            Invocation::Binary { name, inferred } => {
                let executable = executable_path(&env_dir, name, &self.platform);
                if !executable.exists() {
                    remove_env(&env_dir)?;
                    return Err(YenError::ExecutableNotFound {
                        package: package.to_string(),
                        executable: name.clone(),
                        suggest_flags: *inferred,
                    }
                    .into());
                }
                std::fs::rename(&executable, &shim).with_context(|| {
                    format!(
                        "Failed to move {} to {}",
                        executable.display(),
                        shim.display()
                    )
                })?;
            }
        }

        tracing::debug!(shim = %shim.display(), "published shim");
        Ok(InstallOutcome {
            shim_path: shim,
            already_existed: false,
            python_version: None,
        })
    }
}

fn remove_env(env_dir: &Path) -> Result<()> {
    match std::fs::remove_dir_all(env_dir) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => {
            Err(err).with_context(|| format!("Failed to remove environment: {}", env_dir.display()))
        }
    }
}
