//! Version request resolution.
//!
//! A request is either absent, the literal `latest`, or a prefix of the
//! dotted version string. Prefixes are matched as plain strings against the
//! catalog, newest first, so `3.1` picks the newest of `3.1x.y` and `3.1.z`
//! rather than being read as a version range.

use crate::errors::YenError;

use super::catalog::{ReleaseAsset, VersionCatalog};

/// Picks the asset for a version request.
///
/// # Errors
///
/// Returns [`YenError::NoVersionsAvailable`] for an empty catalog and
/// [`YenError::VersionUnavailable`] when no version starts with the prefix.
pub fn resolve<'a>(
    catalog: &'a VersionCatalog,
    requested: Option<&str>,
) -> Result<&'a ReleaseAsset, YenError> {
    if catalog.is_empty() {
        return Err(YenError::NoVersionsAvailable {
            platform: catalog.platform().to_string(),
        });
    }

    let prefix = requested.map(str::trim).filter(|p| !p.is_empty() && *p != "latest");

    let found = match prefix {
        None => catalog.latest(),
        Some(prefix) => catalog
            .iter()
            .find(|asset| asset.version.to_string().starts_with(prefix)),
    };

    match found {
        Some(asset) => {
            tracing::debug!(
                requested = requested.unwrap_or("latest"),
                resolved = %asset.version,
                "resolved python version"
            );
            Ok(asset)
        }
        None => Err(YenError::version_unavailable(requested.unwrap_or_default())),
    }
}
