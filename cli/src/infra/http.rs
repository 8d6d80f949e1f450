//! HTTP infrastructure: agent package fetchers and the GitHub release lookup.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::application::ports::{CommandRunner, PackageFetcher, ReleaseSource};
use crate::domain::step::exit_label;

const USER_AGENT: &str = concat!("azp-cli/", env!("CARGO_PKG_VERSION"));

/// Connect timeout for every HTTP request.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Release API calls are small; fail fast so the fallback version kicks in.
const API_TIMEOUT: Duration = Duration::from_secs(20);

// ── Native fetcher ───────────────────────────────────────────────────────────

/// Primary fetcher: blocking `ureq` download run on the blocking pool.
pub struct UreqFetcher {
    agent: ureq::Agent,
}

impl UreqFetcher {
    #[must_use]
    pub fn new(read_timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new()
                .timeout_connect(CONNECT_TIMEOUT)
                .timeout_read(read_timeout)
                .user_agent(USER_AGENT)
                .build(),
        }
    }
}

impl PackageFetcher for UreqFetcher {
    fn method(&self) -> &'static str {
        "http"
    }

    async fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
        let agent = self.agent.clone();
        let url = url.to_string();
        let dest = dest.to_path_buf();
        tokio::task::spawn_blocking(move || download_blocking(&agent, &url, &dest))
            .await
            .context("spawn_blocking for download")?
    }
}

fn download_blocking(agent: &ureq::Agent, url: &str, dest: &Path) -> Result<()> {
    let response = match agent.get(url).call() {
        Ok(resp) => resp,
        Err(ureq::Error::Status(code, _)) => anyhow::bail!("HTTP {code}"),
        Err(e) => return Err(anyhow::Error::new(e).context("request failed")),
    };
    let file = File::create(dest).with_context(|| format!("creating {}", dest.display()))?;
    let mut writer = BufWriter::new(file);
    let written = std::io::copy(&mut response.into_reader(), &mut writer)
        .with_context(|| format!("writing {}", dest.display()))?;
    writer.flush().context("flushing download")?;
    tracing::debug!(url, bytes = written, "http download finished");
    Ok(())
}

// ── curl fetcher ─────────────────────────────────────────────────────────────

/// Secondary fetcher: `curl -fsSL` through the command runner.
pub struct CurlFetcher<'a, R: CommandRunner> {
    runner: &'a R,
}

impl<'a, R: CommandRunner> CurlFetcher<'a, R> {
    #[must_use]
    pub fn new(runner: &'a R) -> Self {
        Self { runner }
    }
}

impl<R: CommandRunner> PackageFetcher for CurlFetcher<'_, R> {
    fn method(&self) -> &'static str {
        "curl"
    }

    async fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
        let dest = dest.display().to_string();
        let output = self
            .runner
            .run("curl", &["-fsSL", "-o", dest.as_str(), url])
            .await?;
        anyhow::ensure!(
            output.status.success(),
            "curl exited with {}: {}",
            exit_label(output.status),
            String::from_utf8_lossy(&output.stderr).trim()
        );
        Ok(())
    }
}

// ── Release lookup ───────────────────────────────────────────────────────────

/// Latest agent release from the GitHub API.
pub struct GithubReleaseSource {
    url: String,
    token: Option<String>,
}

impl GithubReleaseSource {
    /// `token` is sent as a bearer token when present (raises the rate limit).
    #[must_use]
    pub fn new(url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            url: url.into(),
            token: token.filter(|t| !t.is_empty()),
        }
    }
}

impl ReleaseSource for GithubReleaseSource {
    async fn latest_tag(&self) -> Result<Option<String>> {
        let url = self.url.clone();
        let token = self.token.clone();
        tokio::task::spawn_blocking(move || latest_tag_blocking(&url, token.as_deref()))
            .await
            .context("spawn_blocking for release lookup")?
    }
}

fn latest_tag_blocking(url: &str, token: Option<&str>) -> Result<Option<String>> {
    let agent = ureq::AgentBuilder::new()
        .timeout_connect(CONNECT_TIMEOUT)
        .timeout(API_TIMEOUT)
        .user_agent(USER_AGENT)
        .build();
    let req = agent.get(url).set("Accept", "application/vnd.github+json");
    let req = match token {
        Some(token) => req.set("Authorization", &format!("Bearer {token}")),
        None => req,
    };
    let body = match req.call() {
        Ok(resp) => resp.into_string().context("reading release response")?,
        Err(ureq::Error::Status(403, _)) => {
            anyhow::bail!("release lookup rate limited; set GITHUB_TOKEN or pin AZP_AGENT_VERSION")
        }
        Err(ureq::Error::Status(code, _)) => anyhow::bail!("release lookup failed: HTTP {code}"),
        Err(e) => return Err(anyhow::Error::new(e).context("release lookup failed")),
    };
    parse_latest_tag(&body)
}

/// `tag_name` of a GitHub release document; `None` when absent or null.
///
/// # Errors
///
/// Returns an error if the body is not JSON.
pub fn parse_latest_tag(body: &str) -> Result<Option<String>> {
    let doc: serde_json::Value = serde_json::from_str(body).context("parsing release response")?;
    Ok(doc["tag_name"]
        .as_str()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string))
}
