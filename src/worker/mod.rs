//! Media fetch worker
//!
//! The [`Fetcher`] is the blocking capability that turns a URL into a file on
//! disk plus descriptive metadata. The scheduler never calls it directly on
//! its control task: [`runner`] hands the call to tokio's blocking pool and
//! awaits the result.

pub mod platform;
pub mod runner;
pub mod ytdlp;

use std::path::PathBuf;
use thiserror::Error;

pub use platform::Platform;
pub use runner::{FetchPlan, TaskError};
pub use ytdlp::{YtDlpFetcher, YtDlpOptions};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to launch fetcher: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("fetcher timed out after {0}s")]
    Timeout(u64),

    #[error("{0}")]
    Failed(String),

    #[error("invalid fetcher output: {0}")]
    InvalidOutput(String),
}

/// One fetch invocation: what to get, how good, and where to put it
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    pub platform: Platform,
    /// Effective height ceiling, already capped by the global quality ceiling
    pub max_height: u32,
    /// Exclusive directory of the task; the fetcher writes the artifact here
    pub output_dir: PathBuf,
}

/// Metadata reported by a successful fetch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchedMedia {
    pub title: Option<String>,
    pub duration_secs: Option<u64>,
}

/// Blocking media fetch capability.
///
/// Implementations may take minutes and must only be called from a blocking
/// context (see [`runner::fetch`]).
pub trait Fetcher: Send + Sync + 'static {
    fn fetch(&self, request: &FetchRequest) -> Result<FetchedMedia, FetchError>;
}
