//! Platform detection for standalone Python runtimes.
//!
//! A [`PlatformProfile`] is resolved once at startup and threaded through
//! every component. It decides which release assets are acceptable, where
//! the interpreter lives inside an extracted runtime, and which file
//! extensions shims and environment executables carry.
//!
//! ## Asset Suffixes
//!
//! Suffix lists are ordered by preference. On glibc `x86_64` the
//! microarchitecture-optimized `x86_64_v3` build is chosen over the generic
//! one whenever both exist for the same version.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;

use crate::errors::YenError;

/// Matches the banner of a glibc `ldd` script.
static GLIBC_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"GNU|GLIBC|glibc").expect("valid glibc regex"));

/// Location of the dynamic linker inspector used for libc detection.
const LDD_PATH: &str = "/usr/bin/ldd";

/// Operating system family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Os {
    Linux,
    Macos,
    Windows,
}

/// CPU architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    X86_64,
    Aarch64,
    X86,
}

/// C library flavor, meaningful on Linux only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Libc {
    Glibc,
    Musl,
}

/// The OS, architecture and libc this process installs runtimes for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlatformProfile {
    pub os: Os,
    pub arch: Arch,
    pub libc: Option<Libc>,
    forced_32bit: bool,
}

impl PlatformProfile {
    /// Creates a profile from explicit parts.
    #[must_use]
    pub fn new(os: Os, arch: Arch, libc: Option<Libc>) -> Self {
        Self {
            os,
            arch,
            libc,
            forced_32bit: false,
        }
    }

    /// Detects the current platform.
    ///
    /// On Linux the libc flavor is read from `/usr/bin/ldd`; if that cannot
    /// be read the system is assumed to be musl-based.
    ///
    /// # Errors
    ///
    /// Returns [`YenError::UnsupportedPlatform`] for an unknown OS or architecture.
    pub fn detect() -> Result<Self> {
        let unsupported = || YenError::UnsupportedPlatform {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
        };

        let os = match std::env::consts::OS {
            "linux" => Os::Linux,
            "macos" => Os::Macos,
            "windows" => Os::Windows,
            _ => return Err(unsupported().into()),
        };
        let arch = match std::env::consts::ARCH {
            "x86_64" => Arch::X86_64,
            "aarch64" => Arch::Aarch64,
            "x86" => Arch::X86,
            _ => return Err(unsupported().into()),
        };
        let libc = (os == Os::Linux).then(detect_libc);

        let profile = Self::new(os, arch, libc);
        tracing::debug!(%profile, "detected platform");
        Ok(profile)
    }

    /// Switches to the 32-bit counterpart of this profile.
    ///
    /// # Errors
    ///
    /// Returns an error when no 32-bit runtime is published for this platform.
    pub fn to_32bit(self) -> Result<Self> {
        let arch = match (self.os, self.arch, self.libc) {
            (Os::Linux, Arch::X86_64 | Arch::X86, Some(Libc::Glibc))
            | (Os::Windows, Arch::X86_64 | Arch::X86, _) => Arch::X86,
            _ => {
                return Err(YenError::invalid_config(format!(
                    "unsupported 32 bit architecture: {self}"
                ))
                .into());
            }
        };
        Ok(Self {
            arch,
            forced_32bit: true,
            ..self
        })
    }

    /// Acceptable release asset suffixes, most preferred first.
    #[must_use]
    pub fn asset_suffixes(&self) -> &'static [&'static str] {
        match (self.os, self.arch, self.libc) {
            (Os::Macos, Arch::Aarch64, _) => &["aarch64-apple-darwin-install_only.tar.gz"],
            (Os::Macos, Arch::X86_64, _) => &["x86_64-apple-darwin-install_only.tar.gz"],
            (Os::Linux, Arch::Aarch64, Some(Libc::Glibc)) => {
                &["aarch64-unknown-linux-gnu-install_only.tar.gz"]
            }
            (Os::Linux, Arch::X86_64, Some(Libc::Glibc)) => &[
                "x86_64_v3-unknown-linux-gnu-install_only.tar.gz",
                "x86_64-unknown-linux-gnu-install_only.tar.gz",
            ],
            (Os::Linux, Arch::X86_64, _) => &["x86_64_v3-unknown-linux-musl-install_only.tar.gz"],
            (Os::Linux, Arch::X86, Some(Libc::Glibc)) => {
                &["i686-unknown-linux-gnu-install_only.tar.gz"]
            }
            (Os::Windows, Arch::X86_64, _) => {
                &["x86_64-pc-windows-msvc-shared-install_only.tar.gz"]
            }
            (Os::Windows, Arch::X86, _) => &["i686-pc-windows-msvc-install_only.tar.gz"],
            _ => &[],
        }
    }

    /// Returns whether this platform is Windows.
    #[must_use]
    pub fn is_windows(&self) -> bool {
        self.os == Os::Windows
    }

    /// Returns `.exe` on Windows, empty string elsewhere.
    #[must_use]
    pub fn executable_extension(&self) -> &'static str {
        if self.is_windows() { ".exe" } else { "" }
    }

    /// Whether environments on this platform get a `lib64 -> lib` symlink.
    #[must_use]
    pub fn wants_lib64_symlink(&self) -> bool {
        self.os == Os::Linux && matches!(self.arch, Arch::X86_64 | Arch::Aarch64)
    }

    /// Directory name under the runtimes root for a given version.
    #[must_use]
    pub fn runtime_dir_name(&self, version: &semver::Version) -> String {
        if self.forced_32bit {
            format!("{version}_32bit")
        } else {
            version.to_string()
        }
    }

    /// Interpreter path inside an extracted runtime directory.
    #[must_use]
    pub fn runtime_binary(&self, runtime_dir: &Path) -> PathBuf {
        if self.is_windows() {
            runtime_dir.join("python").join("python.exe")
        } else {
            runtime_dir.join("python").join("bin").join("python3")
        }
    }
}

impl fmt::Display for PlatformProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let os = match self.os {
            Os::Linux => "linux",
            Os::Macos => "macos",
            Os::Windows => "windows",
        };
        let arch = match self.arch {
            Arch::X86_64 => "x86_64",
            Arch::Aarch64 => "aarch64",
            Arch::X86 => "x86",
        };
        write!(f, "{os}-{arch}")?;
        match self.libc {
            Some(Libc::Glibc) => write!(f, "-glibc"),
            Some(Libc::Musl) => write!(f, "-musl"),
            None => Ok(()),
        }
    }
}

fn detect_libc() -> Libc {
    match std::fs::read(LDD_PATH) {
        Ok(bytes) => libc_from_ldd(&String::from_utf8_lossy(&bytes)),
        Err(err) => {
            tracing::debug!(%err, "cannot read {LDD_PATH}, assuming musl");
            Libc::Musl
        }
    }
}

/// Classifies the libc from the contents of `ldd`.
fn libc_from_ldd(content: &str) -> Libc {
    if GLIBC_MARKER.is_match(content) {
        Libc::Glibc
    } else {
        Libc::Musl
    }
}
