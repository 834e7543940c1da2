//! The `pyvenv.cfg` descriptor written at the root of every environment.
//!
//! Keys and their order are read by other Python tooling and must not change:
//!
//! ```text
//! home = /home/me/.yen_pythons/3.12.1/python/bin
//! include-system-site-packages = false
//! version = 3.12.1
//! executable = /home/me/.yen_pythons/3.12.1/python/bin/python3.12
//! command = /home/me/.cargo/bin/yen create /tmp/env -p 3.12
//! ```

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

pub const FILE_NAME: &str = "pyvenv.cfg";

/// Parsed contents of a `pyvenv.cfg` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PyvenvCfg {
    /// Directory of the base interpreter.
    pub home: PathBuf,
    pub include_system_site_packages: bool,
    /// Dotted interpreter version.
    pub version: String,
    /// Fully resolved base interpreter. Older `venv` releases omit it.
    pub executable: Option<PathBuf>,
    /// Command that created the environment. Older `venv` releases omit it.
    pub command: Option<String>,
}

impl PyvenvCfg {
    /// Renders the descriptor as `key = value` lines.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "home = {}", self.home.display());
        let _ = writeln!(
            out,
            "include-system-site-packages = {}",
            self.include_system_site_packages
        );
        let _ = writeln!(out, "version = {}", self.version);
        if let Some(executable) = &self.executable {
            let _ = writeln!(out, "executable = {}", executable.display());
        }
        if let Some(command) = &self.command {
            let _ = writeln!(out, "command = {command}");
        }
        out
    }

    /// Parses descriptor text. Unknown keys are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the `home` key is missing.
    pub fn parse(text: &str) -> Result<Self> {
        let mut home = None;
        let mut include_system_site_packages = false;
        let mut version = String::new();
        let mut executable = None;
        let mut command = None;

        for line in text.lines() {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim();
            match key.trim() {
                "home" => home = Some(PathBuf::from(value)),
                "include-system-site-packages" => {
                    include_system_site_packages = value.eq_ignore_ascii_case("true");
                }
                "version" | "version_info" if version.is_empty() => version = value.to_string(),
                "executable" => executable = Some(PathBuf::from(value)),
                "command" => command = Some(value.to_string()),
                _ => {}
            }
        }

        let Some(home) = home else {
            bail!("{FILE_NAME} has no `home` key");
        };

        Ok(Self {
            home,
            include_system_site_packages,
            version,
            executable,
            command,
        })
    }

    /// Reads the descriptor of the environment at `env_dir`, if it has one.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn read(env_dir: &Path) -> Result<Option<Self>> {
        let path = env_dir.join(FILE_NAME);
        if !path.is_file() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&text)
            .with_context(|| format!("Failed to parse {}", path.display()))
            .map(Some)
    }

    /// Writes the descriptor into `env_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write(&self, env_dir: &Path) -> Result<()> {
        let path = env_dir.join(FILE_NAME);
        std::fs::write(&path, self.render())
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    /// Whether the base interpreter directory recorded in `home` is gone.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        !self.home.is_dir()
    }
}
