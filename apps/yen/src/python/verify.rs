//! Checksum verification for downloaded runtime archives.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

use crate::errors::YenError;

/// Verifies that a file matches a published SHA-256 digest.
///
/// `published` is the body of the `.sha256` companion file. Only its first
/// whitespace-separated token is compared, case-insensitively, so both a
/// bare digest and `<digest>  <filename>` lines are accepted.
///
/// # Errors
///
/// Returns [`YenError::ChecksumMismatch`] if the digests differ, or an I/O
/// error if the file cannot be read.
pub fn verify_checksum(file_path: &Path, published: &str, url: &str) -> Result<()> {
    let expected = normalize_digest(published);
    let actual = compute_sha256(file_path)?;

    if actual != expected {
        return Err(YenError::ChecksumMismatch {
            url: url.to_string(),
            expected,
            actual,
        }
        .into());
    }

    tracing::debug!(file = %file_path.display(), "checksum verified");
    Ok(())
}

/// Computes the SHA-256 of a file as lowercase hex.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read.
pub fn compute_sha256(file_path: &Path) -> Result<String> {
    let mut file = std::fs::File::open(file_path)
        .with_context(|| format!("Failed to open file for checksum: {}", file_path.display()))?;

    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = file.read(&mut buffer).with_context(|| {
            format!("Failed to read file for checksum: {}", file_path.display())
        })?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

fn normalize_digest(published: &str) -> String {
    published
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO_SHA256: &str = "a948904f2f0f479b8f8197694b30184b0d2ed1c1cd2a1ec0fb85d299a192a447";

    fn hello_file() -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let path = dir.path().join("hello.txt");
        std::fs::write(&path, b"hello world\n").expect("Should write test content");
        (dir, path)
    }

    #[test]
    fn compute_sha256_produces_correct_hash() {
        let (_dir, path) = hello_file();
        assert_eq!(compute_sha256(&path).unwrap(), HELLO_SHA256);
    }

    #[test]
    fn verify_accepts_trailing_newline_and_uppercase() {
        let (_dir, path) = hello_file();
        let published = format!("{}\n", HELLO_SHA256.to_uppercase());
        assert!(verify_checksum(&path, &published, "u").is_ok());
    }

    #[test]
    fn verify_accepts_sha256sum_format() {
        let (_dir, path) = hello_file();
        let published = format!("{HELLO_SHA256}  hello.txt\n");
        assert!(verify_checksum(&path, &published, "u").is_ok());
    }

    #[test]
    fn verify_reports_mismatch_as_typed_error() {
        let (_dir, path) = hello_file();
        let err = verify_checksum(&path, "deadbeef", "https://x/a.tar.gz").unwrap_err();
        let yen = err.downcast_ref::<YenError>().expect("Should be YenError");
        match yen {
            YenError::ChecksumMismatch {
                url,
                expected,
                actual,
            } => {
                assert_eq!(url, "https://x/a.tar.gz");
                assert_eq!(expected, "deadbeef");
                assert_eq!(actual, HELLO_SHA256);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_published_digest_never_matches() {
        let (_dir, path) = hello_file();
        assert!(verify_checksum(&path, "\n", "u").is_err());
    }

    #[test]
    fn compute_sha256_fails_for_nonexistent_file() {
        assert!(compute_sha256(Path::new("/nonexistent/file/path")).is_err());
    }
}
