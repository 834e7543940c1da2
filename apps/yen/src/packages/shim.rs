//! Shim naming and launcher scripts.
//!
//! A package is exposed through exactly one file in the packages root:
//!
//! | | POSIX | Windows |
//! |---|---|---|
//! | binary | `<pkg>` (moved entry point) | `<pkg>.exe` |
//! | module | `<pkg>` (sh launcher) | `<pkg>.bat` |

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::python::PlatformProfile;

/// How the shim starts the package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// Move the named entry point out of the environment's scripts directory.
    Binary {
        name: String,
        /// The name was defaulted from the package name.
        inferred: bool,
    },
    /// Generate a launcher running `python -m <name>`.
    Module { name: String },
}

impl Invocation {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Binary { name, .. } | Self::Module { name } => name,
        }
    }
}

/// Path of the shim for `package`.
#[must_use]
pub fn shim_path(
    packages_root: &Path,
    package: &str,
    invocation: &Invocation,
    platform: &PlatformProfile,
) -> PathBuf {
    let extension = match (invocation, platform.is_windows()) {
        (Invocation::Module { .. }, true) => ".bat",
        (Invocation::Binary { .. }, true) => ".exe",
        (_, false) => "",
    };
    packages_root.join(format!("{package}{extension}"))
}

/// Every path a shim for `package` could have been published at.
///
/// On Windows the extension depends on how the package was installed, so a
/// package installed as a module and later requested as a binary must still
/// be found under its `.bat` name.
#[must_use]
pub fn shim_candidates(packages_root: &Path, package: &str, platform: &PlatformProfile) -> Vec<PathBuf> {
    if platform.is_windows() {
        ["exe", "bat"]
            .iter()
            .map(|ext| packages_root.join(format!("{package}.{ext}")))
            .chain(std::iter::once(packages_root.join(package)))
            .collect()
    } else {
        vec![packages_root.join(package)]
    }
}

/// Launcher script body running `python -m module` with forwarded arguments.
#[must_use]
pub fn module_launcher(python: &Path, module: &str, platform: &PlatformProfile) -> String {
    if platform.is_windows() {
        format!("@echo off\r\n\"{}\" -m {module} %*\r\n", python.display())
    } else {
        format!(
            "#!/bin/sh\nexec {} -m {module} \"$@\"\n",
            sh_single_quote(&python.display().to_string())
        )
    }
}

/// Quotes `value` for a POSIX shell so nothing inside it is expanded.
fn sh_single_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Writes a launcher script to `shim`, replacing any existing file atomically.
///
/// The script is written to a temporary file in the same directory and
/// renamed into place, so a concurrent reader never sees a partial script.
///
/// # Errors
///
/// Returns an error if the file cannot be written, made executable or renamed.
pub fn write_launcher(shim: &Path, contents: &str) -> Result<()> {
    let dir = shim
        .parent()
        .with_context(|| format!("Shim path has no parent: {}", shim.display()))?;

    let mut file = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;
    file.write_all(contents.as_bytes())
        .context("Failed to write launcher script")?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(file.path(), std::fs::Permissions::from_mode(0o755))
            .context("Failed to make launcher executable")?;
    }

    file.persist(shim)
        .with_context(|| format!("Failed to publish shim: {}", shim.display()))?;
    Ok(())
}
