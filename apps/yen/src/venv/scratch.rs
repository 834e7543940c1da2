//! Minimal environment construction without running `venv`.
//!
//! Creates the scheme directories, a `lib64 -> lib` symlink where the
//! platform expects one, `python`, `pythonX` and `pythonX.Y` symlinks to the
//! base interpreter, `pyvenv.cfg` and the requested ignore files. When pip is
//! wanted it is bootstrapped with `ensurepip` afterwards.

use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result};
use semver::Version;

use crate::python::PlatformProfile;

use super::descriptor::PyvenvCfg;
use super::layout::{EnvLayout, env_python};
use super::{EnvOptions, EnvironmentBuilder, run_checked, write_scm_ignore_files};

const VERSION_PROBE: &str = "import sys; print('%d.%d.%d' % sys.version_info[:3])";

#[derive(Debug, Clone, Copy)]
pub struct FromScratchBuilder {
    platform: PlatformProfile,
}

impl FromScratchBuilder {
    #[must_use]
    pub fn new(platform: PlatformProfile) -> Self {
        Self { platform }
    }
}

impl EnvironmentBuilder for FromScratchBuilder {
    fn name(&self) -> &'static str {
        "microvenv"
    }

    fn build(&self, python: &Path, target: &Path, options: &EnvOptions) -> Result<()> {
        let base = std::path::absolute(python)
            .with_context(|| format!("Failed to make {} absolute", python.display()))?;
        let target = std::path::absolute(target)
            .with_context(|| format!("Failed to make {} absolute", target.display()))?;
        let version = probe_version(&base)?;
        let layout = EnvLayout::new(&target, &self.platform, &version);

        for dir in [&layout.scripts, &layout.include, &layout.purelib] {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }

        if self.platform.wants_lib64_symlink() {
            let lib = target.join("lib");
            let lib64 = target.join("lib64");
            if lib.is_dir() && std::fs::symlink_metadata(&lib64).is_err() {
                symlink_dir(Path::new("lib"), &lib64)?;
            }
        }

        for alias in interpreter_aliases(&version) {
            symlink_file(&base, &layout.scripts.join(alias))?;
        }

        let executable = std::fs::canonicalize(&base)
            .with_context(|| format!("Failed to resolve {}", base.display()))?;
        let descriptor = PyvenvCfg {
            home: base.parent().map(Path::to_path_buf).unwrap_or_default(),
            include_system_site_packages: false,
            version: version.to_string(),
            executable: Some(executable),
            command: Some(options.command_line()),
        };
        descriptor.write(&target)?;

        write_scm_ignore_files(&target, &options.scm_ignore_files)?;

        if options.with_pip {
            let env_python = env_python(&target, &self.platform);
            run_checked(
                Command::new(&env_python).args(["-m", "ensurepip", "--default-pip"]),
                "python -m ensurepip",
            )?;
        }

        tracing::debug!(target = %target.display(), %version, "environment created from scratch");
        Ok(())
    }
}

/// Asks the interpreter for its `major.minor.micro` version.
fn probe_version(python: &Path) -> Result<Version> {
    let output = run_checked(
        Command::new(python).args(["-c", VERSION_PROBE]),
        "python version probe",
    )?;
    let text = String::from_utf8_lossy(&output.stdout);
    Version::parse(text.trim())
        .with_context(|| format!("Unexpected version from {}: {}", python.display(), text.trim()))
}

fn interpreter_aliases(version: &Version) -> [String; 3] {
    [
        "python".to_string(),
        format!("python{}", version.major),
        format!("python{}.{}", version.major, version.minor),
    ]
}

#[cfg(unix)]
fn symlink_file(original: &Path, link: &Path) -> Result<()> {
    std::os::unix::fs::symlink(original, link)
        .with_context(|| format!("Failed to symlink {}", link.display()))
}

#[cfg(unix)]
fn symlink_dir(original: &Path, link: &Path) -> Result<()> {
    symlink_file(original, link)
}

#[cfg(windows)]
fn symlink_file(original: &Path, link: &Path) -> Result<()> {
    std::os::windows::fs::symlink_file(original, link)
        .with_context(|| format!("Failed to symlink {}", link.display()))
}

#[cfg(windows)]
fn symlink_dir(original: &Path, link: &Path) -> Result<()> {
    std::os::windows::fs::symlink_dir(original, link)
        .with_context(|| format!("Failed to symlink {}", link.display()))
}
