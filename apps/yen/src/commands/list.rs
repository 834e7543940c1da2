//! List command for the yen CLI.
//!
//! Prints every Python version published for the current platform, newest
//! first. The header goes to stderr so stdout stays one version per line.
//!
//! ## Usage
//!
//! ```bash
//! yen list
//! yen list --32bit
//! ```

use anyhow::Result;
use clap::Args;

use crate::config::Config;
use crate::errors::YenError;
use crate::python::{PlatformProfile, RuntimeStore};

use super::select_platform;

/// Arguments for the list command.
#[derive(Args)]
pub struct ListArgs {
    /// List 32-bit builds instead of native ones.
    #[clap(long = "32bit")]
    pub force_32bit: bool,
}

/// Executes the list command.
///
/// # Errors
///
/// Returns [`YenError::NoVersionsAvailable`] when nothing is published for
/// this platform, or an error if release data cannot be fetched.
pub async fn execute(config: &Config, platform: PlatformProfile, args: &ListArgs) -> Result<()> {
    let platform = select_platform(platform, args.force_32bit)?;
    let catalog = RuntimeStore::new(config, platform).catalog().await?;

    if catalog.is_empty() {
        return Err(YenError::NoVersionsAvailable {
            platform: catalog.platform().to_string(),
        }
        .into());
    }

    eprintln!("Available Pythons:");
    for asset in catalog.iter() {
        println!("{}", asset.version);
    }
    Ok(())
}
