//! Installed runtimes on disk.
//!
//! Each runtime lives at `<pythons_root>/<version>/python/...`. The
//! interpreter path is the only completion marker: a version directory with
//! a leftover archive but no interpreter is treated as not installed and is
//! downloaded again.
//!
//! No lock guards the runtimes root. Two processes acquiring the same
//! version at once may both download it; the last extraction wins.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use semver::Version;

use crate::config::Config;
use crate::errors::YenError;

use super::archive::extract_tar_gz;
use super::catalog::{ReleaseAsset, VersionCatalog, fetch_catalog};
use super::download::{download_file, fetch_text};
use super::platform::PlatformProfile;
use super::resolver::resolve;
use super::verify::verify_checksum;

/// A runtime that is present on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledRuntime {
    pub version: Version,
    /// Path of the interpreter binary.
    pub python: PathBuf,
}

/// Resolves, downloads and extracts runtimes under the runtimes root.
#[derive(Debug, Clone)]
pub struct RuntimeStore {
    root: PathBuf,
    releases_url: String,
    platform: PlatformProfile,
}

impl RuntimeStore {
    #[must_use]
    pub fn new(config: &Config, platform: PlatformProfile) -> Self {
        Self {
            root: config.pythons_root.clone(),
            releases_url: config.releases_url.clone(),
            platform,
        }
    }

    /// Fetches the catalog for this store's platform.
    ///
    /// # Errors
    ///
    /// Returns an error if release data cannot be fetched or parsed.
    pub async fn catalog(&self) -> Result<VersionCatalog> {
        fetch_catalog(&self.releases_url, &self.platform).await
    }

    /// Makes sure a runtime matching `requested` is installed.
    ///
    /// Returns immediately without downloading when the interpreter for the
    /// resolved version already exists.
    ///
    /// # Errors
    ///
    /// Returns [`YenError::VersionUnavailable`] for an unknown version,
    /// [`YenError::ChecksumMismatch`] for a corrupt download and
    /// [`YenError::LayoutAssertion`] when the archive does not contain the
    /// interpreter where expected.
    pub async fn ensure(&self, requested: Option<&str>) -> Result<InstalledRuntime> {
        let catalog = self.catalog().await?;
        let asset = resolve(&catalog, requested)?;

        let runtime_dir = self
            .root
            .join(self.platform.runtime_dir_name(&asset.version));
        let python = self.platform.runtime_binary(&runtime_dir);

        if python.exists() {
            tracing::debug!(python = %python.display(), "runtime already installed");
        } else {
            eprintln!("Downloading Python {}...", asset.version);
            self.acquire(asset, &runtime_dir, &python).await?;
        }

        Ok(InstalledRuntime {
            version: asset.version.clone(),
            python,
        })
    }

    async fn acquire(
        &self,
        asset: &ReleaseAsset,
        runtime_dir: &Path,
        python: &Path,
    ) -> Result<()> {
        let archive = runtime_dir.join(asset.filename());
        download_file(&asset.url, &archive).await?;

        let verified = match fetch_text(&asset.checksum_url()).await {
            Ok(published) => verify_checksum(&archive, &published, &asset.url),
            Err(err) => Err(err.context("Failed to fetch published checksum")),
        };
        if let Err(err) = verified {
            let _ = std::fs::remove_file(&archive);
            return Err(err);
        }

        let extracted = extract_tar_gz(&archive, runtime_dir);
        std::fs::remove_file(&archive)
            .with_context(|| format!("Failed to remove archive: {}", archive.display()))?;
        extracted?;

        if !python.exists() {
            return Err(YenError::LayoutAssertion {
                expected: python.to_path_buf(),
            }
            .into());
        }

        tracing::debug!(version = %asset.version, dir = %runtime_dir.display(), "runtime installed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::python::platform::{Arch, Libc, Os};
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use httptest::{Expectation, Server, matchers::request, responders::status_code};
    use sha2::{Digest, Sha256};

    const ARCHIVE_PATH: &str = "/dl/cpython-3.12.1-x86_64-unknown-linux-gnu-install_only.tar.gz";
    const CHECKSUM_PATH: &str =
        "/dl/cpython-3.12.1-x86_64-unknown-linux-gnu-install_only.tar.gz.sha256";

    fn runtime_archive(entries: &[&str]) -> Vec<u8> {
        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
        for path in entries {
            let body = b"#!/bin/sh\n";
            let mut header = tar::Header::new_gnu();
            header.set_size(body.len() as u64);
            header.set_mode(0o755);
            header.set_cksum();
            builder.append_data(&mut header, path, &body[..]).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    fn serve_release(server: &Server, catalog_calls: usize) {
        let body = serde_json::json!({
            "id": 1,
            "assets": [
                {"browser_download_url": server.url_str(ARCHIVE_PATH)},
                {"browser_download_url": server.url_str(CHECKSUM_PATH)},
            ]
        });
        server.expect(
            Expectation::matching(request::method_path("GET", "/latest"))
                .times(catalog_calls)
                .respond_with(status_code(200).body(body.to_string())),
        );
    }

    fn serve_archive(server: &Server, archive: Vec<u8>, digest: String) {
        server.expect(
            Expectation::matching(request::method_path("GET", ARCHIVE_PATH))
                .times(1)
                .respond_with(status_code(200).body(archive)),
        );
        server.expect(
            Expectation::matching(request::method_path("GET", CHECKSUM_PATH))
                .times(1)
                .respond_with(status_code(200).body(digest)),
        );
    }

    fn store(server: &Server, root: &Path) -> RuntimeStore {
        let mut config = Config::with_roots(&root.join("pythons"), &root.join("packages")).unwrap();
        config.releases_url = server.url_str("/latest");
        RuntimeStore::new(
            &config,
            PlatformProfile::new(Os::Linux, Arch::X86_64, Some(Libc::Glibc)),
        )
    }

    #[tokio::test]
    async fn ensure_is_idempotent() {
        let server = Server::run();
        let archive = runtime_archive(&["python/bin/python3"]);
        let digest = format!("{}\n", hex::encode(Sha256::digest(&archive)));
        serve_release(&server, 2);
        serve_archive(&server, archive, digest);

        let temp = tempfile::tempdir().unwrap();
        let store = store(&server, temp.path());

        let first = store.ensure(Some("3.12")).await.expect("Should install");
        let second = store.ensure(Some("3.12")).await.expect("Should reuse");

        assert_eq!(first, second);
        assert_eq!(first.version, Version::new(3, 12, 1));
        assert_eq!(
            first.python,
            temp.path().join("pythons/3.12.1/python/bin/python3")
        );
        assert!(first.python.is_file());
        assert!(
            !temp
                .path()
                .join("pythons/3.12.1")
                .join("cpython-3.12.1-x86_64-unknown-linux-gnu-install_only.tar.gz")
                .exists()
        );
    }

    #[tokio::test]
    async fn checksum_mismatch_removes_archive() {
        let server = Server::run();
        let mut archive = runtime_archive(&["python/bin/python3"]);
        let digest = hex::encode(Sha256::digest(&archive));
        let last = archive.len() - 1;
        archive[last] ^= 0xff;
        serve_release(&server, 1);
        serve_archive(&server, archive, digest);

        let temp = tempfile::tempdir().unwrap();
        let err = store(&server, temp.path())
            .ensure(None)
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<YenError>(),
            Some(YenError::ChecksumMismatch { .. })
        ));
        let runtime_dir = temp.path().join("pythons/3.12.1");
        let leftovers: Vec<_> = std::fs::read_dir(&runtime_dir)
            .map(|entries| entries.filter_map(Result::ok).collect())
            .unwrap_or_default();
        assert!(leftovers.is_empty(), "archive left behind: {leftovers:?}");
    }

    #[tokio::test]
    async fn unexpected_layout_is_reported() {
        let server = Server::run();
        let archive = runtime_archive(&["cpython/bin/python3"]);
        let digest = hex::encode(Sha256::digest(&archive));
        serve_release(&server, 1);
        serve_archive(&server, archive, digest);

        let temp = tempfile::tempdir().unwrap();
        let err = store(&server, temp.path())
            .ensure(Some("3.12.1"))
            .await
            .unwrap_err();

        match err.downcast_ref::<YenError>() {
            Some(YenError::LayoutAssertion { expected }) => {
                assert!(expected.ends_with("python/bin/python3"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_version_does_not_download() {
        let server = Server::run();
        serve_release(&server, 1);

        let temp = tempfile::tempdir().unwrap();
        let err = store(&server, temp.path())
            .ensure(Some("2.7"))
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<YenError>(),
            Some(YenError::VersionUnavailable { .. })
        ));
    }
}
