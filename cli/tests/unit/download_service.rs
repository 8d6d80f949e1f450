//! Download fallback across sources and fetchers.

use azp_cli::application::services::download::{DownloadRequest, download_with_fallback};
use azp_cli::domain::agent::MANUAL_DOWNLOAD_URL;
use azp_cli::domain::error::DownloadError;

use crate::helpers::{CapturingReporter, Fetch, ScriptedFetcher, TrackingFs, sha256_of};

const A: &str = "https://a.example/agent.tar.gz";
const B: &str = "https://b.example/agent.tar.gz";
const C: &str = "https://c.example/agent.tar.gz";

fn urls() -> Vec<String> {
    vec![A.to_string(), B.to_string(), C.to_string()]
}

fn request<'a>(
    urls: &'a [String],
    dest: &'a std::path::Path,
    expected: Option<&'a str>,
) -> DownloadRequest<'a> {
    DownloadRequest {
        urls,
        dest,
        version: "4.248.0",
        expected_sha256: expected,
    }
}

// ── Ordering ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_third_source_wins_after_two_failures() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("agent.tar.gz");
    let urls = urls();
    let primary = ScriptedFetcher::new("http").on(C, Fetch::Write(b"agent".to_vec()));
    let secondary = ScriptedFetcher::new("curl");
    let reporter = CapturingReporter::default();

    let outcome = download_with_fallback(
        &primary,
        &secondary,
        &TrackingFs::default(),
        &reporter,
        &request(&urls, &dest, None),
    )
    .await
    .unwrap();

    assert_eq!(outcome.url, C);
    assert_eq!(outcome.index, 2);
    assert_eq!(outcome.method, "http");
    assert_eq!(outcome.size, 5);
    assert_eq!(primary.attempts(), vec![A, B, C]);
    assert_eq!(secondary.attempts(), vec![A, B]);
    assert_eq!(reporter.warnings.borrow().len(), 2);
    assert_eq!(std::fs::read(&dest).unwrap(), b"agent");
}

#[tokio::test]
async fn test_first_source_success_stops_early() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("agent.tar.gz");
    let urls = urls();
    let primary = ScriptedFetcher::new("http").on(A, Fetch::Write(b"agent".to_vec()));
    let secondary = ScriptedFetcher::new("curl");

    let outcome = download_with_fallback(
        &primary,
        &secondary,
        &TrackingFs::default(),
        &CapturingReporter::default(),
        &request(&urls, &dest, None),
    )
    .await
    .unwrap();

    assert_eq!(outcome.index, 0);
    assert_eq!(primary.attempts(), vec![A]);
    assert!(secondary.attempts().is_empty());
}

#[tokio::test]
async fn test_secondary_fetcher_retries_same_url() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("agent.tar.gz");
    let urls = urls();
    let primary = ScriptedFetcher::new("http");
    let secondary = ScriptedFetcher::new("curl").on(A, Fetch::Write(b"agent".to_vec()));

    let outcome = download_with_fallback(
        &primary,
        &secondary,
        &TrackingFs::default(),
        &CapturingReporter::default(),
        &request(&urls, &dest, None),
    )
    .await
    .unwrap();

    assert_eq!(outcome.url, A);
    assert_eq!(outcome.method, "curl");
    assert_eq!(primary.attempts(), vec![A]);
}

// ── Failure modes ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_all_sources_failing_names_manual_url() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("agent.tar.gz");
    let urls = urls();

    let err = download_with_fallback(
        &ScriptedFetcher::new("http"),
        &ScriptedFetcher::new("curl"),
        &TrackingFs::default(),
        &CapturingReporter::default(),
        &request(&urls, &dest, None),
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<DownloadError>(),
        Some(DownloadError::AllSourcesFailed { tried: 3, .. })
    ));
    let message = err.to_string();
    assert!(message.contains(MANUAL_DOWNLOAD_URL), "got: {message}");
    assert!(message.contains("4.248.0"), "got: {message}");
    assert!(!dest.exists());
}

#[tokio::test]
async fn test_empty_url_list_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("agent.tar.gz");
    let primary = ScriptedFetcher::new("http");

    let err = download_with_fallback(
        &primary,
        &ScriptedFetcher::new("curl"),
        &TrackingFs::default(),
        &CapturingReporter::default(),
        &request(&[], &dest, None),
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<DownloadError>(),
        Some(DownloadError::NoSources { .. })
    ));
    assert!(primary.attempts().is_empty());
}

#[tokio::test]
async fn test_empty_file_counts_as_failure() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("agent.tar.gz");
    let urls = urls();
    let primary = ScriptedFetcher::new("http")
        .on(A, Fetch::Empty)
        .on(B, Fetch::Write(b"agent".to_vec()));
    let secondary = ScriptedFetcher::new("curl").on(A, Fetch::Empty);

    let outcome = download_with_fallback(
        &primary,
        &secondary,
        &TrackingFs::default(),
        &CapturingReporter::default(),
        &request(&urls, &dest, None),
    )
    .await
    .unwrap();

    assert_eq!(outcome.url, B);
}

#[tokio::test]
async fn test_checksum_mismatch_moves_to_next_source() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("agent.tar.gz");
    let urls = urls();
    let good = b"genuine agent".to_vec();
    let expected = sha256_of(&good);
    let primary = ScriptedFetcher::new("http")
        .on(A, Fetch::Write(b"tampered".to_vec()))
        .on(B, Fetch::Write(good.clone()));
    let secondary = ScriptedFetcher::new("curl").on(A, Fetch::Write(b"tampered".to_vec()));
    let reporter = CapturingReporter::default();

    let outcome = download_with_fallback(
        &primary,
        &secondary,
        &TrackingFs::default(),
        &reporter,
        &request(&urls, &dest, Some(&expected)),
    )
    .await
    .unwrap();

    assert_eq!(outcome.url, B);
    assert_eq!(outcome.sha256, expected);
    assert!(reporter.warned("Checksum mismatch"), "{:?}", reporter.warnings.borrow());
}

#[tokio::test]
async fn test_checksum_comparison_ignores_case() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("agent.tar.gz");
    let urls = urls();
    let expected = sha256_of(b"agent").to_ascii_uppercase();
    let primary = ScriptedFetcher::new("http").on(A, Fetch::Write(b"agent".to_vec()));

    let outcome = download_with_fallback(
        &primary,
        &ScriptedFetcher::new("curl"),
        &TrackingFs::default(),
        &CapturingReporter::default(),
        &request(&urls, &dest, Some(&expected)),
    )
    .await
    .unwrap();

    assert_eq!(outcome.index, 0);
}

#[tokio::test]
async fn test_partial_file_is_removed_before_next_attempt() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("agent.tar.gz");
    let urls = urls();
    let primary = ScriptedFetcher::new("http").on(A, Fetch::Partial(b"trunc".to_vec()));
    let secondary = ScriptedFetcher::new("curl");
    let fs = TrackingFs::default();

    let err = download_with_fallback(
        &primary,
        &secondary,
        &fs,
        &CapturingReporter::default(),
        &request(&urls[..1], &dest, None),
    )
    .await
    .unwrap_err();

    assert!(err.downcast_ref::<DownloadError>().is_some());
    assert!(!dest.exists());
    let dest_str = dest.display().to_string();
    assert!(fs.removed().iter().filter(|p| **p == dest_str).count() >= 2);
}
