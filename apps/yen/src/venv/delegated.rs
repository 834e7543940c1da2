//! Environment creation through the runtime's own `venv` module.

use std::path::Path;
use std::process::Command;

use anyhow::Result;

use crate::python::PlatformProfile;

use super::{EnvOptions, EnvironmentBuilder, layout, run_checked, write_scm_ignore_files};

/// Runs `<python> -m venv <target>`.
///
/// `venv` bootstraps pip itself, so `with_pip` needs no extra step.
#[derive(Debug, Clone, Copy)]
pub struct DelegatedBuilder {
    platform: PlatformProfile,
}

impl DelegatedBuilder {
    #[must_use]
    pub fn new(platform: PlatformProfile) -> Self {
        Self { platform }
    }
}

impl EnvironmentBuilder for DelegatedBuilder {
    fn name(&self) -> &'static str {
        "venv"
    }

    fn build(&self, python: &Path, target: &Path, options: &EnvOptions) -> Result<()> {
        let mut command = Command::new(python);
        command.args(["-m", "venv"]);
        if !options.with_pip {
            command.arg("--without-pip");
        }
        command.arg(target);
        run_checked(&mut command, "python -m venv")?;

        // venv only writes .gitignore from 3.13 on
        if !target.join(".gitignore").exists() {
            write_scm_ignore_files(target, &options.scm_ignore_files)?;
        }

        tracing::debug!(
            python = %layout::env_python(target, &self.platform).display(),
            "environment created with venv"
        );
        Ok(())
    }
}
