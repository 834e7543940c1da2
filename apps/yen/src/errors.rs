//! Error types for the yen CLI.
//!
//! Plumbing code returns `anyhow::Result` with context attached at each step.
//! Failures the caller must be able to tell apart are raised as a `YenError`
//! and recovered in `main` by downcasting, which maps each variant to its own
//! exit code and remediation hint.

use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Hint printed after errors caused by an unknown Python version.
const LIST_HINT: &str = "Use 'yen list' to see available Pythons.";

/// Distinguishable failures of the runtime and package engine.
#[derive(Debug, Error)]
pub enum YenError {
    /// The requested version prefix matched nothing in the catalog.
    #[error("requested Python version {requested} is not available")]
    VersionUnavailable {
        /// The prefix the user asked for.
        requested: String,
    },

    /// The catalog for this platform is empty.
    #[error("no Python versions available for {platform}")]
    NoVersionsAvailable {
        /// Display form of the platform profile.
        platform: String,
    },

    /// A downloaded archive did not match its published digest.
    #[error("checksum mismatch for {url}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// URL of the archive that failed verification.
        url: String,
        /// Digest published next to the archive.
        expected: String,
        /// Digest computed from the downloaded bytes.
        actual: String,
    },

    /// Extraction finished but the interpreter is not where it should be.
    #[error("archive layout changed: {} missing after extraction", .expected.display())]
    LayoutAssertion {
        /// Interpreter path that should exist after extraction.
        expected: PathBuf,
    },

    /// The installed package has no entry point with the requested name.
    #[error("package {package} doesn't contain an executable named {executable}")]
    ExecutableNotFound {
        /// Package that was installed.
        package: String,
        /// Entry point that was looked up.
        executable: String,
        /// Whether the name was inferred, so the flags are worth suggesting.
        suggest_flags: bool,
    },

    /// Refusing to create something that already exists.
    #[error("{} already exists", .path.display())]
    TargetExists {
        /// The path that already exists.
        path: PathBuf,
    },

    /// No release assets are published for this OS and architecture.
    #[error("{os}-{arch} is not supported")]
    UnsupportedPlatform {
        /// Operating system name.
        os: String,
        /// CPU architecture name.
        arch: String,
    },

    /// An ignore-file convention other than `git` was requested.
    #[error("only `git` is supported as an SCM ignore file, not {names}")]
    UnsupportedScmIgnore {
        /// Comma-separated unsupported names.
        names: String,
    },

    /// Invalid configuration value or flag combination.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// What was wrong.
        message: String,
    },

    /// A blocking subprocess exited unsuccessfully.
    #[error("{program} failed ({status}){}", format_stderr(.stderr))]
    SubprocessFailed {
        /// Short description of the command that ran.
        program: String,
        /// Exit status of the process.
        status: ExitStatus,
        /// Captured standard error, possibly empty.
        stderr: String,
    },

    /// The user interrupted a transfer.
    #[error("interrupted")]
    Interrupted,

    /// A child process exited with a non-zero code that should be propagated.
    #[error("process exited with code {code}")]
    ProcessExitCode {
        /// The exit code from the child.
        code: i32,
    },
}

fn format_stderr(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {trimmed}")
    }
}

impl YenError {
    /// Creates a new `VersionUnavailable` error.
    #[must_use]
    pub fn version_unavailable(requested: impl Into<String>) -> Self {
        Self::VersionUnavailable {
            requested: requested.into(),
        }
    }

    /// Creates a new `InvalidConfig` error.
    #[must_use]
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Creates a new `TargetExists` error.
    #[must_use]
    pub fn target_exists(path: impl Into<PathBuf>) -> Self {
        Self::TargetExists { path: path.into() }
    }

    /// Creates a new `SubprocessFailed` error from captured stderr bytes.
    #[must_use]
    pub fn subprocess_failed(program: impl Into<String>, status: ExitStatus, stderr: &[u8]) -> Self {
        Self::SubprocessFailed {
            program: program.into(),
            status,
            stderr: String::from_utf8_lossy(stderr).into_owned(),
        }
    }

    /// Creates a new `ProcessExitCode` error.
    #[must_use]
    pub const fn process_exit_code(code: i32) -> Self {
        Self::ProcessExitCode { code }
    }

    /// Process exit code for this failure.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::TargetExists { .. } => 2,
            Self::VersionUnavailable { .. } => 3,
            Self::ExecutableNotFound { .. } => 4,
            Self::ChecksumMismatch { .. } => 5,
            Self::Interrupted => 130,
            Self::ProcessExitCode { code } => *code,
            _ => 1,
        }
    }

    /// Remediation hint to print after the error, if any.
    #[must_use]
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::VersionUnavailable { .. } => Some(LIST_HINT),
            Self::ExecutableNotFound {
                suggest_flags: true,
                ..
            } => Some("Consider passing `--binary` or `--module` flags."),
            Self::NoVersionsAvailable { .. } => {
                Some("Please report this: https://github.com/tusharsadhwani/yen/issues/new")
            }
            Self::ChecksumMismatch { .. } => {
                Some("The download may be corrupted or tampered with; it was removed.")
            }
            _ => None,
        }
    }
}
