//! Checks whether a published shim is reachable through `PATH`.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Where a shim stands relative to the user's `PATH`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathReport {
    /// The packages root is one of the `PATH` entries.
    pub on_path: bool,
    /// Another executable with the shim's name that `PATH` finds first.
    pub shadowed_by: Option<PathBuf>,
}

/// Inspects `path_var` (the value of `PATH`) for the shim at `shim_path`.
///
/// Shadowing is only reported when the packages root is on `PATH`; otherwise
/// nothing the shell finds could be the shim in the first place.
#[must_use]
pub fn check_shim(packages_root: &Path, shim_path: &Path, path_var: Option<&OsStr>) -> PathReport {
    let Some(path_var) = path_var else {
        return PathReport {
            on_path: false,
            shadowed_by: None,
        };
    };

    let on_path = std::env::split_paths(path_var).any(|entry| same_path(&entry, packages_root));
    let shadowed_by = if on_path {
        shim_path
            .file_name()
            .and_then(|name| which::which_in(name, Some(path_var), packages_root).ok())
            .filter(|found| !same_path(found, shim_path))
    } else {
        None
    };

    PathReport {
        on_path,
        shadowed_by,
    }
}

/// Renders the warnings for a report, one line each. Empty when clean.
#[must_use]
pub fn format_warnings(report: &PathReport, packages_root: &Path, shim_path: &Path) -> Vec<String> {
    let mut lines = Vec::new();
    if !report.on_path {
        lines.push(format!(
            "Warning: {} is not on PATH. Add it to run installed packages directly.",
            packages_root.display()
        ));
    }
    if let Some(found) = &report.shadowed_by {
        lines.push(format!(
            "Warning: '{}' resolves to {} instead of {}.",
            shim_path
                .file_name()
                .map(|name| name.to_string_lossy())
                .unwrap_or_default(),
            found.display(),
            shim_path.display()
        ));
    }
    lines
}

fn same_path(a: &Path, b: &Path) -> bool {
    a == b || matches!((a.canonicalize(), b.canonicalize()), (Ok(x), Ok(y)) if x == y)
}
