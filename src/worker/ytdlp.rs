//! Fetcher backed by the `yt-dlp` executable

use super::{FetchError, FetchRequest, FetchedMedia, Fetcher, Platform};
use bon::Builder;
use serde::Deserialize;
use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tokio::runtime::Handle;
use tracing::{debug, warn};

pub const DEFAULT_BINARY: &str = "yt-dlp";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1800);

#[derive(Debug, Clone, Builder)]
pub struct YtDlpOptions {
    #[builder(into, default = DEFAULT_BINARY.to_string())]
    pub binary: String,
    #[builder(default = DEFAULT_TIMEOUT)]
    pub timeout: Duration,
    #[builder(into, default = DEFAULT_USER_AGENT.to_string())]
    pub user_agent: String,
}

impl Default for YtDlpOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Subset of the info JSON printed by `--dump-json`
#[derive(Debug, Deserialize)]
struct InfoJson {
    title: Option<String>,
    duration: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct YtDlpFetcher {
    options: YtDlpOptions,
}

impl YtDlpFetcher {
    pub fn new(options: YtDlpOptions) -> Self {
        Self { options }
    }

    /// Command-line arguments for one fetch
    pub fn build_args(&self, request: &FetchRequest) -> Vec<String> {
        let height = request.max_height;
        let template = request.output_dir.join("%(title)s.%(ext)s");

        let mut args: Vec<String> = vec![
            "--no-warnings".into(),
            "--no-progress".into(),
            "--no-check-certificates".into(),
            "--dump-json".into(),
            "--no-simulate".into(),
            "-f".into(),
            format!("bestvideo[height<={height}]+bestaudio/best[height<={height}]/best"),
            "-o".into(),
            template.to_string_lossy().into_owned(),
            "--user-agent".into(),
            self.options.user_agent.clone(),
        ];

        match request.platform {
            Platform::Youtube => args.extend(
                [
                    "--referer",
                    "https://www.youtube.com/",
                    "--extractor-args",
                    "youtube:player_client=android,web",
                    "--sleep-interval",
                    "1",
                    "--max-sleep-interval",
                    "3",
                    "--sleep-requests",
                    "1",
                ]
                .map(String::from),
            ),
            Platform::Vk => args.extend(
                [
                    "--add-header",
                    "Accept:text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
                    "--add-header",
                    "Accept-Language:ru-RU,ru;q=0.9,en;q=0.8",
                ]
                .map(String::from),
            ),
            Platform::Instagram => args.extend(
                [
                    "--add-header",
                    "Accept:*/*",
                    "--add-header",
                    "Accept-Language:en-US,en;q=0.9",
                ]
                .map(String::from),
            ),
            Platform::Unknown => {}
        }

        args.push("--".into());
        args.push(request.url.clone());
        args
    }

    /// Spawn yt-dlp and collect its output. The child is killed if the
    /// timeout fires first.
    async fn run(&self, request: &FetchRequest) -> Result<FetchedMedia, FetchError> {
        let args = self.build_args(request);
        debug!(binary = %self.options.binary, ?args, "Spawning yt-dlp");

        let child = Command::new(&self.options.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(FetchError::Spawn)?;

        let output = match tokio::time::timeout(self.options.timeout, child.wait_with_output())
            .await
        {
            Ok(output) => output.map_err(FetchError::Spawn)?,
            Err(_) => {
                warn!(
                    url = %request.url,
                    timeout_secs = self.options.timeout.as_secs(),
                    "yt-dlp timed out, killed"
                );
                return Err(FetchError::Timeout(self.options.timeout.as_secs()));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FetchError::Failed(failure_message(&stderr, output.status)));
        }

        parse_info(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Blocks the calling thread on the async child-process future, so it must
/// run on tokio's blocking pool (see [`super::runner::fetch`]).
impl Fetcher for YtDlpFetcher {
    fn fetch(&self, request: &FetchRequest) -> Result<FetchedMedia, FetchError> {
        let handle = Handle::try_current().map_err(|e| FetchError::Spawn(io::Error::other(e)))?;
        handle.block_on(self.run(request))
    }
}

/// Prefer yt-dlp's own `ERROR:` lines, fall back to raw stderr or exit status
fn failure_message(stderr: &str, status: ExitStatus) -> String {
    let errors: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with("ERROR:"))
        .collect();

    if !errors.is_empty() {
        return errors.join("; ");
    }

    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        format!("yt-dlp exited with {}", status)
    } else {
        trimmed.to_string()
    }
}

/// The info JSON is the last non-empty stdout line
fn parse_info(stdout: &str) -> Result<FetchedMedia, FetchError> {
    let line = stdout
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .ok_or_else(|| FetchError::InvalidOutput("empty output".to_string()))?;

    let info: InfoJson =
        serde_json::from_str(line).map_err(|e| FetchError::InvalidOutput(e.to_string()))?;

    Ok(FetchedMedia {
        title: info.title,
        duration_secs: info
            .duration
            .filter(|d| d.is_finite() && *d > 0.0)
            .map(|d| d.round() as u64),
    })
}
