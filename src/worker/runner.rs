//! Task runner - the pieces of one fetch execution step
//!
//! The scheduler drives these in order, writing progress checkpoints between
//! them: [`plan`] → [`fetch`] → [`finalize`].

use super::{FetchRequest, FetchedMedia, Fetcher, Platform};
use crate::humanize::{ByteSize, format_duration};
use crate::ledger::TaskResult;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Title used when the fetcher reports none
pub const DEFAULT_TITLE: &str = "Video";

/// Failure of a fetch execution step. Stored on the task as its error message.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("unsupported platform: {0} (supported: YouTube, VK, Instagram)")]
    UnsupportedPlatform(String),

    #[error("fetch failed: {0}")]
    FetchFailed(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

pub type Result<T> = std::result::Result<T, TaskError>;

/// Resolved parameters for a single fetch
#[derive(Debug, Clone)]
pub struct FetchPlan {
    pub task_id: String,
    pub request: FetchRequest,
}

impl FetchPlan {
    pub fn quality_label(&self) -> String {
        format!("{}p", self.request.max_height)
    }
}

/// Directory owned exclusively by one task
pub fn task_dir(download_dir: &Path, task_id: &str) -> PathBuf {
    download_dir.join(task_id)
}

/// Requests above the ceiling are capped, never rejected
pub fn resolve_quality(requested: u32, ceiling: u32) -> u32 {
    requested.min(ceiling)
}

/// Classify the URL, cap the quality and create the task directory.
///
/// Unsupported platforms fail here, before any fetcher work. The planned
/// output directory is absolute, so is every artifact path derived from it.
pub async fn plan(
    task_id: &str,
    url: &str,
    requested_quality: u32,
    quality_ceiling: u32,
    download_dir: &Path,
) -> Result<FetchPlan> {
    let platform = Platform::detect(url);
    if !platform.is_supported() {
        return Err(TaskError::UnsupportedPlatform(url.to_string()));
    }

    let output_dir = task_dir(download_dir, task_id);
    tokio::fs::create_dir_all(&output_dir).await.map_err(|e| {
        TaskError::Filesystem(format!("cannot create {}: {}", output_dir.display(), e))
    })?;
    let output_dir = tokio::fs::canonicalize(&output_dir).await.map_err(|e| {
        TaskError::Filesystem(format!("cannot resolve {}: {}", output_dir.display(), e))
    })?;

    let max_height = resolve_quality(requested_quality, quality_ceiling);
    debug!(task_id, %platform, max_height, dir = %output_dir.display(), "Fetch planned");

    Ok(FetchPlan {
        task_id: task_id.to_string(),
        request: FetchRequest {
            url: url.to_string(),
            platform,
            max_height,
            output_dir,
        },
    })
}

/// Run the blocking fetcher on tokio's blocking pool and await it
pub async fn fetch(fetcher: Arc<dyn Fetcher>, plan: &FetchPlan) -> Result<FetchedMedia> {
    let request = plan.request.clone();

    let joined = tokio::task::spawn_blocking(move || fetcher.fetch(&request)).await;

    match joined {
        Ok(Ok(media)) => Ok(media),
        Ok(Err(e)) => Err(TaskError::FetchFailed(e.to_string())),
        Err(e) => Err(TaskError::FetchFailed(format!("fetch worker aborted: {}", e))),
    }
}

/// Locate the artifact and build the task result
pub async fn finalize(plan: &FetchPlan, media: FetchedMedia) -> Result<TaskResult> {
    let artifact = find_artifact(&plan.request.output_dir).await?;
    let size = tokio::fs::metadata(&artifact)
        .await
        .map_err(|e| TaskError::Filesystem(format!("cannot stat {}: {}", artifact.display(), e)))?
        .len();

    let result = TaskResult {
        title: media
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        duration: format_duration(media.duration_secs),
        quality: plan.quality_label(),
        size: ByteSize(size).to_human_readable(),
        file_path: artifact,
    };

    info!(
        task_id = %plan.task_id,
        title = %result.title,
        size = %result.size,
        "Artifact recorded"
    );

    Ok(result)
}

/// First regular file in the directory, in name order
async fn find_artifact(dir: &Path) -> Result<PathBuf> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| TaskError::Filesystem(format!("cannot read {}: {}", dir.display(), e)))?;

    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| TaskError::Filesystem(format!("cannot read {}: {}", dir.display(), e)))?
    {
        let is_file = entry
            .file_type()
            .await
            .map(|t| t.is_file())
            .unwrap_or(false);
        if is_file {
            files.push(entry.path());
        }
    }

    files.sort();
    files
        .into_iter()
        .next()
        .ok_or_else(|| TaskError::Filesystem(format!("no file produced in {}", dir.display())))
}
