//! HTTP transfers for runtime archives and their checksum files.
//!
//! ## Features
//!
//! - Streaming downloads with a textual progress line on stderr
//! - Automatic retry with exponential backoff (3 attempts) for transport failures
//! - Downloads to a temporary file, then renames on success
//! - Ctrl-C is observed by the transfer loop and surfaces as
//!   [`YenError::Interrupted`] without retrying
//!
//! An interrupted transfer may leave its `.tmp` file behind. Callers treat
//! the presence of the extracted interpreter, never of an archive, as the
//! sign that a runtime is installed.

use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use futures_util::StreamExt;
use rand::Rng;
use reqwest::StatusCode;
use tokio::io::AsyncWriteExt;

use crate::errors::YenError;

/// Maximum number of download attempts.
const MAX_RETRIES: u32 = 3;

/// Base delay between retries in milliseconds.
const BASE_RETRY_DELAY_MS: u64 = 1000;

/// Request timeout for archive downloads.
const DOWNLOAD_TIMEOUT_SECS: u64 = 300;

/// Request timeout for small text resources.
const TEXT_TIMEOUT_SECS: u64 = 30;

/// Minimum interval between progress updates in milliseconds.
const PROGRESS_INTERVAL_MS: u128 = 250;

/// User-Agent header for every request.
const USER_AGENT: &str = concat!("yen/", env!("CARGO_PKG_VERSION"));

/// A response with a non-success status.
#[derive(Debug, thiserror::Error)]
#[error("HTTP error {status}: {url}")]
struct HttpStatusError {
    status: StatusCode,
    url: String,
}

/// Builds the HTTP client shared by all requests.
///
/// # Errors
///
/// Returns an error if the TLS backend cannot be initialized.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .context("Failed to create HTTP client")
}

/// Downloads `url` to `dest`, printing progress to stderr.
///
/// Client errors (4xx) and interrupts are returned immediately; other
/// failures are retried with backoff.
///
/// # Errors
///
/// Returns the last error once all attempts fail, or
/// [`YenError::Interrupted`] if Ctrl-C was pressed.
pub async fn download_file(url: &str, dest: &Path) -> Result<()> {
    let temp_path = dest.with_extension("tmp");

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let mut last_error = None;

    for attempt in 0..MAX_RETRIES {
        if attempt > 0 {
            let delay = calculate_retry_delay(attempt);
            eprintln!("Retrying download (attempt {}/{MAX_RETRIES})...", attempt + 1);
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        let result = tokio::select! {
            result = download_with_progress(url, &temp_path) => result,
            _ = tokio::signal::ctrl_c() => {
                eprintln!();
                return Err(YenError::Interrupted.into());
            }
        };

        match result {
            Ok(()) => {
                tokio::fs::rename(&temp_path, dest).await.with_context(|| {
                    format!(
                        "Failed to rename {} to {}",
                        temp_path.display(),
                        dest.display()
                    )
                })?;
                tracing::debug!(%url, dest = %dest.display(), "download complete");
                return Ok(());
            }
            Err(err) => {
                let _ = tokio::fs::remove_file(&temp_path).await;
                if !is_retryable(&err) {
                    return Err(err);
                }
                tracing::warn!(%url, attempt = attempt + 1, "download failed: {err:#}");
                last_error = Some(err);
            }
        }
    }

    Err(last_error
        .unwrap_or_else(|| anyhow::anyhow!("Download failed after {MAX_RETRIES} attempts")))
}

/// Fetches a small text resource such as a `.sha256` companion file.
///
/// # Errors
///
/// Returns an error on transport failure or a non-success status.
pub async fn fetch_text(url: &str) -> Result<String> {
    let client = http_client(Duration::from_secs(TEXT_TIMEOUT_SECS))?;
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to connect to {url}"))?;

    let status = response.status();
    if !status.is_success() {
        return Err(HttpStatusError {
            status,
            url: url.to_string(),
        }
        .into());
    }

    response
        .text()
        .await
        .with_context(|| format!("Failed to read response from {url}"))
}

async fn download_with_progress(url: &str, dest: &Path) -> Result<()> {
    let client = http_client(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))?;

    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to connect to {url}"))?;

    let status = response.status();
    if !status.is_success() {
        return Err(HttpStatusError {
            status,
            url: url.to_string(),
        }
        .into());
    }

    let total_size = response.content_length().unwrap_or(0);

    let mut file = tokio::fs::File::create(dest)
        .await
        .with_context(|| format!("Failed to create file: {}", dest.display()))?;

    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;
    let start_time = Instant::now();
    let mut last_update = Instant::now();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.with_context(|| format!("Failed to read chunk from {url}"))?;
        file.write_all(&chunk)
            .await
            .with_context(|| format!("Failed to write to {}", dest.display()))?;
        downloaded += chunk.len() as u64;

        let now = Instant::now();
        if now.duration_since(last_update).as_millis() >= PROGRESS_INTERVAL_MS {
            print_progress(downloaded, total_size, start_time.elapsed().as_secs_f64());
            last_update = now;
        }
    }

    file.flush()
        .await
        .with_context(|| format!("Failed to flush {}", dest.display()))?;

    print_progress(downloaded, total_size, start_time.elapsed().as_secs_f64());
    eprintln!();

    Ok(())
}

fn is_retryable(err: &anyhow::Error) -> bool {
    if matches!(err.downcast_ref::<YenError>(), Some(YenError::Interrupted)) {
        return false;
    }
    !err.downcast_ref::<HttpStatusError>()
        .is_some_and(|e| e.status.is_client_error())
}

#[allow(clippy::cast_precision_loss)]
#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
fn print_progress(downloaded: u64, total: u64, elapsed_secs: f64) {
    let percent = if total > 0 {
        (downloaded as f64 / total as f64 * 100.0) as u8
    } else {
        0
    };
    let speed = if elapsed_secs > 0.0 {
        downloaded as f64 / elapsed_secs
    } else {
        0.0
    };

    eprint!(
        "\r{}/{} ({percent}%) {}     ",
        format_bytes(downloaded),
        format_bytes(total),
        format_speed(speed)
    );
    let _ = std::io::stderr().flush();
}

/// Formats bytes into a human-readable string (KB, MB, GB).
fn format_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    #[allow(clippy::cast_precision_loss)]
    let bytes_f = bytes as f64;

    if bytes_f >= GB {
        format!("{:.2} GB", bytes_f / GB)
    } else if bytes_f >= MB {
        format!("{:.2} MB", bytes_f / MB)
    } else if bytes_f >= KB {
        format!("{:.2} KB", bytes_f / KB)
    } else {
        format!("{bytes} B")
    }
}

fn format_speed(speed: f64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;

    if speed >= MB {
        format!("{:.2} MB/s", speed / MB)
    } else if speed >= KB {
        format!("{:.2} KB/s", speed / KB)
    } else {
        format!("{speed:.0} B/s")
    }
}

/// Exponential backoff (1s, 2s, 4s) with +/- 25% jitter.
fn calculate_retry_delay(attempt: u32) -> u64 {
    let base_delay = BASE_RETRY_DELAY_MS * 2u64.pow(attempt);
    let jitter_range = base_delay / 4;
    let jitter = rand::rng().random_range(0..=jitter_range * 2);
    base_delay - jitter_range + jitter
}

#[cfg(test)]
mod tests {
    use super::*;
    use httptest::{Expectation, Server, matchers::request, responders::status_code};

    #[test]
    fn retry_delay_increases_exponentially() {
        assert!((750..=1250).contains(&calculate_retry_delay(0)));
        assert!((1500..=2500).contains(&calculate_retry_delay(1)));
        assert!((3000..=5000).contains(&calculate_retry_delay(2)));
    }

    #[test]
    fn byte_formatting() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.00 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.00 MB");
        assert_eq!(format_speed(1536.0), "1.50 KB/s");
    }

    #[test]
    fn client_errors_are_not_retried() {
        let not_found: anyhow::Error = HttpStatusError {
            status: StatusCode::NOT_FOUND,
            url: "u".to_string(),
        }
        .into();
        let server_error: anyhow::Error = HttpStatusError {
            status: StatusCode::BAD_GATEWAY,
            url: "u".to_string(),
        }
        .into();
        assert!(!is_retryable(&not_found));
        assert!(is_retryable(&server_error));
        assert!(!is_retryable(&YenError::Interrupted.into()));
    }

    #[tokio::test]
    async fn download_writes_body_and_removes_temp_file() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("GET", "/a.tar.gz"))
                .times(1)
                .respond_with(status_code(200).body("archive bytes")),
        );

        let temp = tempfile::tempdir().unwrap();
        let dest = temp.path().join("nested").join("a.tar.gz");
        download_file(&server.url_str("/a.tar.gz"), &dest)
            .await
            .expect("Should download");

        assert_eq!(std::fs::read(&dest).unwrap(), b"archive bytes");
        assert!(!dest.with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn missing_file_fails_without_retry() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("GET", "/missing.tar.gz"))
                .times(1)
                .respond_with(status_code(404)),
        );

        let temp = tempfile::tempdir().unwrap();
        let dest = temp.path().join("missing.tar.gz");
        let err = download_file(&server.url_str("/missing.tar.gz"), &dest)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("404"));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn fetch_text_returns_body() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("GET", "/a.tar.gz.sha256"))
                .respond_with(status_code(200).body("abc123\n")),
        );

        let text = fetch_text(&server.url_str("/a.tar.gz.sha256")).await.unwrap();
        assert_eq!(text, "abc123\n");
    }
}
