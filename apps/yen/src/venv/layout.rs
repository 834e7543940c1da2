//! On-disk layout of a virtual environment.
//!
//! Mirrors the `venv` sysconfig scheme:
//!
//! | | POSIX | Windows |
//! |---|---|---|
//! | scripts | `bin` | `Scripts` |
//! | include | `include` (`include/pythonX.Y` from 3.11) | `Include` |
//! | purelib | `lib/pythonX.Y/site-packages` | `Lib/site-packages` |

use std::path::{Path, PathBuf};

use semver::Version;

use crate::python::PlatformProfile;

/// Directories that make up an environment rooted at `root`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvLayout {
    pub scripts: PathBuf,
    pub include: PathBuf,
    pub purelib: PathBuf,
}

impl EnvLayout {
    /// Computes the layout for an environment of the given interpreter version.
    #[must_use]
    pub fn new(root: &Path, platform: &PlatformProfile, version: &Version) -> Self {
        let short = format!("python{}.{}", version.major, version.minor);

        let (include, purelib) = if platform.is_windows() {
            (root.join("Include"), root.join("Lib").join("site-packages"))
        } else {
            let include = if (version.major, version.minor) >= (3, 11) {
                root.join("include").join(&short)
            } else {
                root.join("include")
            };
            (include, root.join("lib").join(&short).join("site-packages"))
        };

        Self {
            scripts: scripts_dir(root, platform),
            include,
            purelib,
        }
    }
}

/// Directory holding the environment's executables.
#[must_use]
pub fn scripts_dir(root: &Path, platform: &PlatformProfile) -> PathBuf {
    root.join(if platform.is_windows() { "Scripts" } else { "bin" })
}

/// Path of an executable inside the environment's scripts directory.
#[must_use]
pub fn executable_path(root: &Path, name: &str, platform: &PlatformProfile) -> PathBuf {
    scripts_dir(root, platform).join(format!("{name}{}", platform.executable_extension()))
}

/// The environment's own interpreter.
#[must_use]
pub fn env_python(root: &Path, platform: &PlatformProfile) -> PathBuf {
    executable_path(root, "python", platform)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::python::platform::{Arch, Libc, Os};

    fn linux() -> PlatformProfile {
        PlatformProfile::new(Os::Linux, Arch::X86_64, Some(Libc::Glibc))
    }

    fn windows() -> PlatformProfile {
        PlatformProfile::new(Os::Windows, Arch::X86_64, None)
    }

    #[test]
    fn posix_layout_for_modern_python() {
        let root = Path::new("/envs/a");
        let layout = EnvLayout::new(root, &linux(), &Version::new(3, 12, 1));
        assert_eq!(layout.scripts, root.join("bin"));
        assert_eq!(layout.include, root.join("include").join("python3.12"));
        assert_eq!(
            layout.purelib,
            root.join("lib").join("python3.12").join("site-packages")
        );
    }

    #[test]
    fn posix_layout_before_311_has_flat_include() {
        let root = Path::new("/envs/a");
        let layout = EnvLayout::new(root, &linux(), &Version::new(3, 10, 15));
        assert_eq!(layout.include, root.join("include"));
        assert_eq!(
            layout.purelib,
            root.join("lib").join("python3.10").join("site-packages")
        );
    }

    #[test]
    fn windows_layout() {
        let root = Path::new("C:/envs/a");
        let layout = EnvLayout::new(root, &windows(), &Version::new(3, 12, 1));
        assert_eq!(layout.scripts, root.join("Scripts"));
        assert_eq!(layout.include, root.join("Include"));
        assert_eq!(layout.purelib, root.join("Lib").join("site-packages"));
    }

    #[test]
    fn executables_get_platform_extension() {
        let root = Path::new("/envs/a");
        assert_eq!(env_python(root, &linux()), root.join("bin").join("python"));
        assert_eq!(
            executable_path(root, "http", &windows()),
            root.join("Scripts").join("http.exe")
        );
    }
}
