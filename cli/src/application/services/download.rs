//! Application service: agent package download with source fallback.
//!
//! Sources are tried strictly in order. For each one the primary fetcher runs
//! first and the secondary fetcher retries the same URL; the file on disk is
//! what decides success, not the fetcher's return value.

use std::path::Path;

use anyhow::Result;

use crate::application::ports::{FileHasher, LocalFs, PackageFetcher, ProgressReporter};
use crate::domain::agent::MANUAL_DOWNLOAD_URL;
use crate::domain::error::DownloadError;

/// What to download and where.
pub struct DownloadRequest<'a> {
    /// Source URLs in priority order.
    pub urls: &'a [String],
    /// Destination file.
    pub dest: &'a Path,
    /// Version label used in messages.
    pub version: &'a str,
    /// Expected hex SHA-256, if pinned.
    pub expected_sha256: Option<&'a str>,
}

/// The source that produced a valid file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOutcome {
    /// URL that succeeded.
    pub url: String,
    /// Zero-based position of that URL in the request.
    pub index: usize,
    /// Fetcher method that succeeded.
    pub method: &'static str,
    /// Size of the downloaded file in bytes.
    pub size: u64,
    /// Hex SHA-256 of the downloaded file.
    pub sha256: String,
}

/// Download the first source that yields a valid file.
///
/// # Errors
///
/// Returns [`DownloadError::NoSources`] for an empty URL list and
/// [`DownloadError::AllSourcesFailed`] (naming [`MANUAL_DOWNLOAD_URL`]) when
/// every source fails with both fetchers.
pub async fn download_with_fallback(
    primary: &impl PackageFetcher,
    secondary: &impl PackageFetcher,
    fs: &(impl LocalFs + FileHasher),
    reporter: &impl ProgressReporter,
    req: &DownloadRequest<'_>,
) -> Result<DownloadOutcome> {
    if req.urls.is_empty() {
        return Err(DownloadError::NoSources {
            version: req.version.to_string(),
        }
        .into());
    }

    let total = req.urls.len();
    for (index, url) in req.urls.iter().enumerate() {
        reporter.step(&format!("downloading agent {} (source {}/{total})", req.version, index + 1));

        let result = match attempt(primary, fs, url, req).await {
            Ok(done) => Ok((done, primary.method())),
            Err(e) => {
                tracing::debug!(url = %url, method = primary.method(), error = %format!("{e:#}"), "primary download failed, retrying with secondary");
                attempt(secondary, fs, url, req)
                    .await
                    .map(|done| (done, secondary.method()))
            }
        };

        match result {
            Ok(((size, sha256), method)) => {
                reporter.success(&format!("downloaded {url} via {method} ({size} bytes)"));
                return Ok(DownloadOutcome {
                    url: url.clone(),
                    index,
                    method,
                    size,
                    sha256,
                });
            }
            Err(e) => {
                reporter.warn(&format!("source {}/{total} failed: {url}: {e:#}", index + 1));
            }
        }
    }

    Err(DownloadError::AllSourcesFailed {
        version: req.version.to_string(),
        tried: total,
        manual_url: MANUAL_DOWNLOAD_URL,
        dest: req.dest.display().to_string(),
    }
    .into())
}

/// One fetch plus verification; a failed attempt leaves no file behind.
async fn attempt(
    fetcher: &impl PackageFetcher,
    fs: &(impl LocalFs + FileHasher),
    url: &str,
    req: &DownloadRequest<'_>,
) -> Result<(u64, String)> {
    discard(fs, req.dest);
    let result = match fetcher.fetch(url, req.dest).await {
        Ok(()) => verify(fs, req),
        Err(e) => Err(e),
    };
    if result.is_err() {
        discard(fs, req.dest);
    }
    result
}

fn verify(fs: &(impl LocalFs + FileHasher), req: &DownloadRequest<'_>) -> Result<(u64, String)> {
    let size = fs
        .file_len(req.dest)
        .filter(|&len| len > 0)
        .ok_or_else(|| DownloadError::EmptyFile {
            path: req.dest.display().to_string(),
        })?;
    let sha256 = fs.sha256_file(req.dest)?;
    if let Some(expected) = req.expected_sha256 {
        if !expected.eq_ignore_ascii_case(&sha256) {
            return Err(DownloadError::ChecksumMismatch {
                expected: expected.to_string(),
                actual: sha256,
            }
            .into());
        }
    }
    Ok((size, sha256))
}

fn discard(fs: &impl LocalFs, path: &Path) {
    if let Err(e) = fs.remove_file(path) {
        tracing::debug!(path = %path.display(), error = %e, "could not remove partial download");
    }
}
