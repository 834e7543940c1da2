//! Release catalog for standalone CPython builds.
//!
//! The catalog is built from the asset list of the latest upstream release.
//! Only assets whose filename ends with one of the platform's accepted
//! suffixes are kept, one per version, and the result is ordered newest
//! first by numeric version.
//!
//! ## Release Data Format
//!
//! ```json
//! {
//!   "id": 179234316,
//!   "html_url": "https://github.com/indygreg/python-build-standalone/releases/tag/20241016",
//!   "assets": [
//!     { "browser_download_url": "https://.../cpython-3.12.7+20241016-x86_64-unknown-linux-gnu-install_only.tar.gz" }
//!   ]
//! }
//! ```
//!
//! Any other fields in the upstream response are ignored.
//!
//! ## Fallback
//!
//! When the releases endpoint cannot be reached at all (connection failure
//! or timeout), a snapshot bundled into the binary is used instead and a
//! warning is printed. An HTTP error status is not treated as unreachable.

use std::collections::BTreeMap;
use std::sync::LazyLock;
use std::time::Duration;

use anyhow::{Context, Result};
use regex::Regex;
use semver::Version;
use serde::{Deserialize, Serialize};

use super::download::http_client;
use super::platform::PlatformProfile;

/// Release snapshot used when the releases endpoint is unreachable.
const FALLBACK_RELEASE_DATA: &str = include_str!("../../data/fallback_release_data.json");

/// Printed every time the fallback snapshot is used.
pub const FALLBACK_WARNING: &str = "Warning: GitHub unreachable. Using fallback release data.";

/// Request timeout for the releases endpoint.
const REQUEST_TIMEOUT_SECS: u64 = 30;

static VERSION_IN_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"cpython-(\d+\.\d+\.\d+)").expect("valid version regex"));

/// One release as returned by the releases API, reduced to what yen reads.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReleaseData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
    #[serde(default)]
    pub assets: Vec<AssetEntry>,
}

/// A downloadable file attached to a release.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssetEntry {
    pub browser_download_url: String,
}

/// A runtime archive for one version on the current platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseAsset {
    pub version: Version,
    pub url: String,
}

impl ReleaseAsset {
    /// Last path segment of the download URL.
    #[must_use]
    pub fn filename(&self) -> &str {
        self.url.rsplit('/').next().unwrap_or(&self.url)
    }

    /// URL of the published SHA-256 digest for this archive.
    #[must_use]
    pub fn checksum_url(&self) -> String {
        format!("{}.sha256", self.url)
    }
}

/// Available runtimes for one platform, newest first.
#[derive(Debug, Clone)]
pub struct VersionCatalog {
    platform: String,
    assets: Vec<ReleaseAsset>,
}

impl VersionCatalog {
    /// Builds the catalog from release data.
    ///
    /// Suffixes are tried in order, so a version first seen with a preferred
    /// suffix is never replaced by a less preferred asset.
    #[must_use]
    pub fn from_release(release: &ReleaseData, platform: &PlatformProfile) -> Self {
        let mut by_version: BTreeMap<Version, String> = BTreeMap::new();

        for suffix in platform.asset_suffixes() {
            for asset in &release.assets {
                let url = &asset.browser_download_url;
                if !url.ends_with(suffix) {
                    continue;
                }
                let Some(version) = version_from_url(url) else {
                    tracing::debug!(%url, "skipping asset without a version");
                    continue;
                };
                by_version.entry(version).or_insert_with(|| url.clone());
            }
        }

        let assets = by_version
            .into_iter()
            .rev()
            .map(|(version, url)| ReleaseAsset { version, url })
            .collect();

        Self {
            platform: platform.to_string(),
            assets,
        }
    }

    /// Display form of the platform this catalog was filtered for.
    #[must_use]
    pub fn platform(&self) -> &str {
        &self.platform
    }

    /// Assets ordered from the newest version to the oldest.
    pub fn iter(&self) -> impl Iterator<Item = &ReleaseAsset> {
        self.assets.iter()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// The highest version in the catalog.
    #[must_use]
    pub fn latest(&self) -> Option<&ReleaseAsset> {
        self.assets.first()
    }
}

/// Fetches the latest release and filters it for `platform`.
///
/// # Errors
///
/// Returns an error if the endpoint answers with an error status or the body
/// is not valid release data.
pub async fn fetch_catalog(releases_url: &str, platform: &PlatformProfile) -> Result<VersionCatalog> {
    let release = fetch_release(releases_url).await?;
    let catalog = VersionCatalog::from_release(&release, platform);
    tracing::debug!(
        versions = catalog.len(),
        %platform,
        "built version catalog"
    );
    Ok(catalog)
}

/// Fetches release data, falling back to the bundled snapshot when the
/// endpoint is unreachable.
///
/// # Errors
///
/// Returns an error for HTTP error statuses and unparseable bodies.
pub async fn fetch_release(url: &str) -> Result<ReleaseData> {
    let client = http_client(Duration::from_secs(REQUEST_TIMEOUT_SECS))?;

    tracing::debug!(%url, "fetching release data");
    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(err) if err.is_connect() || err.is_timeout() => {
            tracing::debug!(%err, "releases endpoint unreachable");
            eprintln!("{FALLBACK_WARNING}");
            return fallback_release();
        }
        Err(err) => {
            return Err(err).with_context(|| format!("Failed to fetch release data from {url}"));
        }
    };

    let status = response.status();
    if !status.is_success() {
        anyhow::bail!("Release data request failed with HTTP {status}: {url}");
    }

    let body = response
        .text()
        .await
        .with_context(|| format!("Failed to read release data from {url}"))?;
    parse_release(&body).with_context(|| format!("Failed to parse release data from {url}"))
}

/// Parses the bundled release snapshot.
///
/// # Errors
///
/// Returns an error if the bundled snapshot is malformed.
pub fn fallback_release() -> Result<ReleaseData> {
    parse_release(FALLBACK_RELEASE_DATA).context("Bundled fallback release data is malformed")
}

/// Reduces a full release JSON document to the fields yen reads.
///
/// # Errors
///
/// Returns an error if `raw` is not a release object.
pub fn trim_release_data(raw: &str) -> Result<String> {
    let release = parse_release(raw)?;
    serde_json::to_string_pretty(&release).context("Failed to serialize trimmed release data")
}

fn parse_release(raw: &str) -> Result<ReleaseData> {
    Ok(serde_json::from_str(raw)?)
}

fn version_from_url(url: &str) -> Option<Version> {
    let captures = VERSION_IN_NAME.captures(url)?;
    Version::parse(captures.get(1)?.as_str()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::python::platform::{Arch, Libc, Os};
    use httptest::{Expectation, Server, matchers::request, responders::status_code};

    fn linux_gnu_x64() -> PlatformProfile {
        PlatformProfile::new(Os::Linux, Arch::X86_64, Some(Libc::Glibc))
    }

    fn release(urls: &[&str]) -> ReleaseData {
        ReleaseData {
            id: Some(1),
            html_url: None,
            assets: urls
                .iter()
                .map(|url| AssetEntry {
                    browser_download_url: (*url).to_string(),
                })
                .collect(),
        }
    }

    fn versions(catalog: &VersionCatalog) -> Vec<String> {
        catalog.iter().map(|a| a.version.to_string()).collect()
    }

    #[test]
    fn catalog_sorts_numerically_descending() {
        let data = release(&[
            "https://x/cpython-3.9.1+1-x86_64-unknown-linux-gnu-install_only.tar.gz",
            "https://x/cpython-3.10.0+1-x86_64-unknown-linux-gnu-install_only.tar.gz",
            "https://x/cpython-3.11.5+1-x86_64-unknown-linux-gnu-install_only.tar.gz",
        ]);
        let catalog = VersionCatalog::from_release(&data, &linux_gnu_x64());
        assert_eq!(versions(&catalog), ["3.11.5", "3.10.0", "3.9.1"]);
    }

    #[test]
    fn preferred_suffix_wins_regardless_of_asset_order() {
        let generic = "https://x/cpython-3.12.1+1-x86_64-unknown-linux-gnu-install_only.tar.gz";
        let optimized = "https://x/cpython-3.12.1+1-x86_64_v3-unknown-linux-gnu-install_only.tar.gz";
        let catalog = VersionCatalog::from_release(&release(&[generic, optimized]), &linux_gnu_x64());
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.latest().unwrap().url, optimized);
    }

    #[test]
    fn generic_suffix_used_when_no_preferred_build() {
        let generic = "https://x/cpython-3.8.20+1-x86_64-unknown-linux-gnu-install_only.tar.gz";
        let catalog = VersionCatalog::from_release(&release(&[generic]), &linux_gnu_x64());
        assert_eq!(catalog.latest().unwrap().url, generic);
    }

    #[test]
    fn other_platforms_and_checksums_are_ignored() {
        let data = release(&[
            "https://x/cpython-3.12.1+1-aarch64-apple-darwin-install_only.tar.gz",
            "https://x/cpython-3.12.1+1-x86_64-unknown-linux-gnu-install_only.tar.gz.sha256",
            "https://x/cpython-3.12.1+1-x86_64-unknown-linux-gnu-debug-full.tar.zst",
        ]);
        let catalog = VersionCatalog::from_release(&data, &linux_gnu_x64());
        assert!(catalog.is_empty());
        assert_eq!(catalog.platform(), "linux-x86_64-glibc");
    }

    #[test]
    fn bundled_fallback_has_assets_for_every_platform() {
        let data = fallback_release().expect("Should parse bundled data");
        let platforms = [
            PlatformProfile::new(Os::Macos, Arch::Aarch64, None),
            PlatformProfile::new(Os::Macos, Arch::X86_64, None),
            PlatformProfile::new(Os::Linux, Arch::Aarch64, Some(Libc::Glibc)),
            linux_gnu_x64(),
            PlatformProfile::new(Os::Linux, Arch::X86_64, Some(Libc::Musl)),
            PlatformProfile::new(Os::Windows, Arch::X86_64, None),
            linux_gnu_x64().to_32bit().unwrap(),
        ];
        for platform in platforms {
            let catalog = VersionCatalog::from_release(&data, &platform);
            assert!(!catalog.is_empty(), "no fallback assets for {platform}");
        }
    }

    #[test]
    fn release_parsing_ignores_unknown_fields() {
        let raw = r#"{
            "id": 7,
            "tag_name": "20241016",
            "html_url": "https://example.com/r",
            "assets": [{"browser_download_url": "https://x/a", "size": 10, "name": "a"}]
        }"#;
        let data = parse_release(raw).expect("Should parse");
        assert_eq!(data.id, Some(7));
        assert_eq!(data.assets.len(), 1);
    }

    #[test]
    fn trim_release_data_keeps_only_known_fields() {
        let raw = r#"{"id": 7, "author": {"login": "x"}, "html_url": "h",
                      "assets": [{"browser_download_url": "u", "uploader": {}}]}"#;
        let trimmed = trim_release_data(raw).expect("Should trim");
        let value: serde_json::Value = serde_json::from_str(&trimmed).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"id": 7, "html_url": "h", "assets": [{"browser_download_url": "u"}]})
        );
    }

    #[test]
    fn trim_release_data_rejects_non_objects() {
        assert!(trim_release_data("[1, 2]").is_err());
    }

    #[test]
    fn asset_checksum_url_appends_suffix() {
        let asset = ReleaseAsset {
            version: Version::new(3, 12, 1),
            url: "https://x/dl/cpython-3.12.1.tar.gz".to_string(),
        };
        assert_eq!(asset.filename(), "cpython-3.12.1.tar.gz");
        assert_eq!(asset.checksum_url(), "https://x/dl/cpython-3.12.1.tar.gz.sha256");
    }

    #[tokio::test]
    async fn fetch_catalog_reads_endpoint() {
        let server = Server::run();
        let body = serde_json::json!({
            "id": 1,
            "assets": [
                {"browser_download_url": "https://x/cpython-3.12.1+1-x86_64-unknown-linux-gnu-install_only.tar.gz"}
            ]
        });
        server.expect(
            Expectation::matching(request::method_path("GET", "/latest"))
                .respond_with(status_code(200).body(body.to_string())),
        );

        let catalog = fetch_catalog(&server.url_str("/latest"), &linux_gnu_x64())
            .await
            .expect("Should fetch catalog");
        assert_eq!(versions(&catalog), ["3.12.1"]);
    }

    #[tokio::test]
    async fn http_error_status_is_not_treated_as_unreachable() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("GET", "/latest"))
                .respond_with(status_code(500)),
        );

        let result = fetch_release(&server.url_str("/latest")).await;
        let message = result.unwrap_err().to_string();
        assert!(message.contains("500"), "unexpected error: {message}");
    }

    #[tokio::test]
    async fn unreachable_endpoint_uses_fallback() {
        let data = fetch_release("http://127.0.0.1:1/latest")
            .await
            .expect("Should fall back");
        assert_eq!(data, fallback_release().unwrap());
    }
}
