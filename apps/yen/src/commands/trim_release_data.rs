//! Hidden maintenance command that regenerates the bundled release snapshot.
//!
//! ```bash
//! curl -sL https://api.github.com/repos/indygreg/python-build-standalone/releases/latest > full.json
//! yen trim-release-data full.json > apps/yen/data/fallback_release_data.json
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use crate::python::catalog::trim_release_data;

/// Arguments for the trim-release-data command.
#[derive(Args)]
pub struct TrimReleaseDataArgs {
    /// Full release JSON as returned by the releases API.
    pub file: PathBuf,
}

/// Prints the trimmed release data to stdout.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not release JSON.
pub fn execute(args: &TrimReleaseDataArgs) -> Result<()> {
    let raw = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let trimmed = trim_release_data(&raw)
        .with_context(|| format!("Failed to parse release data in {}", args.file.display()))?;
    println!("{trimmed}");
    Ok(())
}
