use crate::humanize::ByteSize;
use crate::ledger::{DEFAULT_RETENTION_HOURS, DEFAULT_SWEEP_INTERVAL_SECS};
use crate::queue::{DEFAULT_QUALITY_CEILING, DEFAULT_QUEUE_CAPACITY};
use crate::worker::ytdlp::{DEFAULT_BINARY, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    /// Root directory; each task gets one subdirectory named by its id
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,
    #[serde(default)]
    pub api: ApiLimits,
}

/// API request limits
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiLimits {
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: ByteSize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            download_dir: default_download_dir(),
            api: ApiLimits::default(),
        }
    }
}

impl Default for ApiLimits {
    fn default() -> Self {
        Self {
            max_payload_bytes: default_max_payload_bytes(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8000))
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_max_payload_bytes() -> ByteSize {
    ByteSize(16 * 1024) // 16 KB
}

/// Queue admission and quality policy
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Global height ceiling; higher requests are capped to it
    #[serde(default = "default_quality_ceiling")]
    pub quality_ceiling: u32,
    /// Quality used when a request omits one
    #[serde(default = "default_quality")]
    pub default_quality: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            quality_ceiling: default_quality_ceiling(),
            default_quality: default_quality(),
        }
    }
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

fn default_quality_ceiling() -> u32 {
    DEFAULT_QUALITY_CEILING
}

fn default_quality() -> u32 {
    720
}

/// Retention configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetentionConfig {
    #[serde(default = "default_retention_hours")]
    pub retention_hours: u64,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            retention_hours: default_retention_hours(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

fn default_retention_hours() -> u64 {
    DEFAULT_RETENTION_HOURS
}

fn default_sweep_interval_secs() -> u64 {
    DEFAULT_SWEEP_INTERVAL_SECS
}

/// yt-dlp fetcher configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FetcherConfig {
    #[serde(default = "default_binary")]
    pub binary: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_binary() -> String {
    DEFAULT_BINARY.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}
