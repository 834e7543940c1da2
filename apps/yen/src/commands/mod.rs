//! Subcommand implementations for the yen CLI.
//!
//! ## Runtimes
//!
//! - [`list`] - List Python versions available for this platform
//! - [`exec`] - Run a Python runtime directly
//!
//! ## Environments and packages
//!
//! - [`create`] - Create an isolated environment
//! - [`install`] - Install a package behind a shim
//! - [`run`] - Install a package if needed and run it
//!
//! ## Maintenance
//!
//! - [`trim_release_data`] - Shrink a release JSON to the fields yen reads

pub mod create;
pub mod exec;
pub mod install;
pub mod list;
pub mod run;
pub mod trim_release_data;

use std::process::Command;

use anyhow::{Context, Result};

use crate::errors::YenError;
use crate::python::PlatformProfile;

/// Applies the `--32bit` flag to the detected platform.
pub(crate) fn select_platform(detected: PlatformProfile, force_32bit: bool) -> Result<PlatformProfile> {
    if force_32bit {
        detected.to_32bit()
    } else {
        Ok(detected)
    }
}

/// Runs a child with inherited stdio and propagates a non-zero exit code.
///
/// Returns `Err(YenError::ProcessExitCode)` on failure so the caller unwinds
/// normally before `main` exits with the child's code.
pub(crate) fn run_inherited(command: &mut Command) -> Result<()> {
    let program = command.get_program().to_string_lossy().into_owned();
    tracing::debug!(?command, "running child process");
    let status = command
        .status()
        .with_context(|| format!("Failed to execute {program}"))?;
    if status.success() {
        Ok(())
    } else {
        Err(YenError::process_exit_code(status.code().unwrap_or(1)).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::python::platform::{Arch, Libc, Os};

    #[test]
    fn select_platform_keeps_native_without_flag() {
        let linux = PlatformProfile::new(Os::Linux, Arch::X86_64, Some(Libc::Glibc));
        assert_eq!(select_platform(linux, false).unwrap(), linux);
    }

    #[test]
    fn select_platform_rejects_32bit_on_macos() {
        let mac = PlatformProfile::new(Os::Macos, Arch::Aarch64, None);
        assert!(select_platform(mac, true).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn run_inherited_propagates_exit_code() {
        let err = run_inherited(Command::new("sh").args(["-c", "exit 7"])).unwrap_err();
        match err.downcast_ref::<YenError>() {
            Some(YenError::ProcessExitCode { code }) => assert_eq!(*code, 7),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
