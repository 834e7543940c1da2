//! Runtime archive extraction.
//!
//! Standalone CPython archives have a single `python/` top-level directory.
//! It is kept as-is, so a runtime extracted into `<root>/<version>` ends up
//! at `<root>/<version>/python/...`.

use std::path::{Component, Path};

use anyhow::{Context, Result, bail};
use flate2::read::GzDecoder;
use tar::Archive;

/// Extracts a gzip-compressed tarball into `dest_dir`.
///
/// Symlinks and permission bits stored in the archive are restored.
///
/// # Errors
///
/// Returns an error if the archive is unreadable, contains an absolute path
/// or a `..` component, or an entry cannot be written.
pub fn extract_tar_gz(archive_path: &Path, dest_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dest_dir)
        .with_context(|| format!("Failed to create directory: {}", dest_dir.display()))?;

    let file = std::fs::File::open(archive_path)
        .with_context(|| format!("Failed to open archive: {}", archive_path.display()))?;
    let mut archive = Archive::new(GzDecoder::new(file));

    let mut count = 0usize;
    for entry in archive
        .entries()
        .with_context(|| format!("Failed to read tar entries: {}", archive_path.display()))?
    {
        let mut entry = entry
            .with_context(|| format!("Failed to read tar entry: {}", archive_path.display()))?;

        let entry_path = entry
            .path()
            .context("Failed to get entry path")?
            .into_owned();
        if is_unsafe(&entry_path) {
            bail!(
                "Refusing to extract path with parent directory or absolute reference: {}",
                entry_path.display()
            );
        }

        entry
            .unpack_in(dest_dir)
            .with_context(|| format!("Failed to extract: {}", entry_path.display()))?;
        count += 1;
    }

    tracing::debug!(
        entries = count,
        archive = %archive_path.display(),
        dest = %dest_dir.display(),
        "extracted archive"
    );
    Ok(())
}

fn is_unsafe(path: &Path) -> bool {
    path.components()
        .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;

    fn append_file(builder: &mut tar::Builder<GzEncoder<std::fs::File>>, path: &str, body: &[u8]) {
        let mut header = tar::Header::new_gnu();
        header.set_size(body.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        builder
            .append_data(&mut header, path, body)
            .expect("Should append entry");
    }

    fn write_archive(path: &Path, entries: &[(&str, &[u8])]) {
        let file = std::fs::File::create(path).expect("Should create archive");
        let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
        for (name, body) in entries {
            append_file(&mut builder, name, body);
        }
        builder
            .into_inner()
            .expect("Should finish tar")
            .finish()
            .expect("Should finish gzip");
    }

    #[test]
    fn keeps_top_level_python_directory() {
        let temp = tempfile::tempdir().unwrap();
        let archive = temp.path().join("runtime.tar.gz");
        write_archive(
            &archive,
            &[
                ("python/bin/python3", b"#!/bin/sh\n"),
                ("python/lib/python3.12/os.py", b""),
            ],
        );

        let dest = temp.path().join("3.12.1");
        extract_tar_gz(&archive, &dest).expect("Should extract");

        assert!(dest.join("python/bin/python3").is_file());
        assert!(dest.join("python/lib/python3.12/os.py").is_file());
    }

    #[cfg(unix)]
    #[test]
    fn restores_executable_bits() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::tempdir().unwrap();
        let archive = temp.path().join("runtime.tar.gz");
        write_archive(&archive, &[("python/bin/python3", b"#!/bin/sh\n")]);

        let dest = temp.path().join("out");
        extract_tar_gz(&archive, &dest).unwrap();

        let mode = std::fs::metadata(dest.join("python/bin/python3"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o111, 0o111);
    }

    #[test]
    fn rejects_parent_directory_entries() {
        let temp = tempfile::tempdir().unwrap();
        let archive = temp.path().join("evil.tar.gz");

        // tar::Builder refuses `..` paths, so write the name into the header directly.
        let file = std::fs::File::create(&archive).unwrap();
        let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
        let mut header = tar::Header::new_gnu();
        header.as_gnu_mut().unwrap().name[..14].copy_from_slice(b"../escape.txt\0");
        header.set_size(1);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append(&header, &b"x"[..]).unwrap();
        builder.into_inner().unwrap().finish().unwrap();

        let dest = temp.path().join("out");
        let err = extract_tar_gz(&archive, &dest).unwrap_err();
        assert!(err.to_string().contains("Refusing to extract"));
        assert!(!temp.path().join("escape.txt").exists());
    }

    #[test]
    fn fails_on_corrupt_archive() {
        let temp = tempfile::tempdir().unwrap();
        let archive = temp.path().join("bad.tar.gz");
        std::fs::write(&archive, b"not a gzip stream").unwrap();
        assert!(extract_tar_gz(&archive, &temp.path().join("out")).is_err());
    }

    #[test]
    fn unsafe_path_detection() {
        assert!(is_unsafe(Path::new("../x")));
        assert!(is_unsafe(Path::new("python/../../x")));
        assert!(is_unsafe(Path::new("/etc/passwd")));
        assert!(!is_unsafe(Path::new("python/bin/python3")));
    }
}
