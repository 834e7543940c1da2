//! Startup configuration for yen.
//!
//! Process-level settings are resolved once in `main` into a [`Config`] and
//! handed to each component. Components never read the process environment
//! themselves.
//!
//! ## Environment Variables
//!
//! - `YEN_PYTHONS_PATH`: runtimes root (default `~/.yen_pythons`)
//! - `YEN_PACKAGES_PATH`: shims and package environments (default `~/.yen_packages`)
//! - `YEN_RELEASES_URL`: release metadata endpoint
//! - `YEN_VENV_STRATEGY`: `auto`, `venv` or `microvenv`
//! - `YEN_SCM_IGNORE_FILES`: comma-separated ignore-file conventions (default `git`)

use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::errors::YenError;

pub const PYTHONS_PATH_ENV: &str = "YEN_PYTHONS_PATH";
pub const PACKAGES_PATH_ENV: &str = "YEN_PACKAGES_PATH";
pub const RELEASES_URL_ENV: &str = "YEN_RELEASES_URL";
pub const VENV_STRATEGY_ENV: &str = "YEN_VENV_STRATEGY";
pub const SCM_IGNORE_FILES_ENV: &str = "YEN_SCM_IGNORE_FILES";

/// Latest release of the standalone CPython builds.
pub const DEFAULT_RELEASES_URL: &str =
    "https://api.github.com/repos/indygreg/python-build-standalone/releases/latest";

/// Version used by `install`, `run` and `exec` when `-p` is omitted.
pub const DEFAULT_PYTHON_VERSION: &str = "3.12";

/// Which environment builder to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VenvStrategy {
    /// From-scratch where supported, delegated otherwise.
    #[default]
    Auto,
    /// Always run `python -m venv`.
    Delegated,
    /// Always lay the environment out directly.
    FromScratch,
}

impl FromStr for VenvStrategy {
    type Err = YenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "venv" | "delegated" => Ok(Self::Delegated),
            "microvenv" | "scratch" => Ok(Self::FromScratch),
            other => Err(YenError::invalid_config(format!(
                "unknown {VENV_STRATEGY_ENV} '{other}', expected auto, venv or microvenv"
            ))),
        }
    }
}

impl fmt::Display for VenvStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Auto => "auto",
            Self::Delegated => "venv",
            Self::FromScratch => "microvenv",
        };
        f.write_str(name)
    }
}

/// Resolved configuration, built once per process.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root holding one directory per installed runtime version.
    pub pythons_root: PathBuf,
    /// Root holding published shims and `venv_<package>` environments.
    pub packages_root: PathBuf,
    /// Endpoint returning the latest release and its assets.
    pub releases_url: String,
    /// Environment-creation policy.
    pub venv_strategy: VenvStrategy,
    /// Ignore-file conventions written into from-scratch environments.
    pub scm_ignore_files: BTreeSet<String>,
}

impl Config {
    /// Builds the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined while a
    /// root is unset, or if `YEN_VENV_STRATEGY` holds an unknown value.
    pub fn from_env() -> Result<Self> {
        let home = || {
            dirs::home_dir().with_context(|| {
                format!(
                    "Cannot determine home directory. Set {PYTHONS_PATH_ENV} and {PACKAGES_PATH_ENV}."
                )
            })
        };

        let pythons_root = match env_value(PYTHONS_PATH_ENV) {
            Some(path) => PathBuf::from(path),
            None => home()?.join(".yen_pythons"),
        };
        let packages_root = match env_value(PACKAGES_PATH_ENV) {
            Some(path) => PathBuf::from(path),
            None => home()?.join(".yen_packages"),
        };

        let mut config = Self::with_roots(&pythons_root, &packages_root)?;

        if let Some(url) = env_value(RELEASES_URL_ENV) {
            config.releases_url = url;
        }
        if let Some(strategy) = env_value(VENV_STRATEGY_ENV) {
            config.venv_strategy = strategy.parse()?;
        }
        if let Ok(raw) = std::env::var(SCM_IGNORE_FILES_ENV) {
            config.scm_ignore_files = parse_scm_ignore_files(&raw);
        }

        Ok(config)
    }

    /// Builds a configuration rooted at explicit directories with defaults
    /// for everything else.
    ///
    /// # Errors
    ///
    /// Returns an error if a root cannot be made absolute.
    pub fn with_roots(pythons_root: &Path, packages_root: &Path) -> Result<Self> {
        Ok(Self {
            pythons_root: absolute(pythons_root)?,
            packages_root: absolute(packages_root)?,
            releases_url: DEFAULT_RELEASES_URL.to_string(),
            venv_strategy: VenvStrategy::Auto,
            scm_ignore_files: BTreeSet::from(["git".to_string()]),
        })
    }
}

/// Reads an environment variable, treating empty or whitespace-only values as unset.
fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path)
        .with_context(|| format!("Failed to make {} absolute", path.display()))
}

/// Parses a comma-separated list of ignore-file conventions.
fn parse_scm_ignore_files(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(|name| name.trim().to_ascii_lowercase())
        .filter(|name| !name.is_empty())
        .collect()
}
