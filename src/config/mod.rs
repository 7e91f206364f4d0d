//! Configuration management for vidbox
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use vidbox::config::Config;
//!
//! let config = Config::load(None).expect("Failed to load configuration");
//! println!("Server listening on: {}", config.server.bind_addr);
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `VIDBOX__<section>__<key>`
//!
//! Examples:
//! - `VIDBOX__SERVER__BIND_ADDR=127.0.0.1:9000`
//! - `VIDBOX__SCHEDULER__QUEUE_CAPACITY=10`
//! - `VIDBOX__RETENTION__RETENTION_HOURS=6`
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/vidbox.toml`.
//! This can be overridden using the `VIDBOX_CONFIG` environment variable
//! or the `--config` flag.

mod models;
mod sources;
mod validation;

use std::path::PathBuf;
use std::time::Duration;

pub use crate::humanize::ByteSize;
pub use models::{
    ApiLimits, Config, FetcherConfig, RetentionConfig, SchedulerConfig, ServerConfig,
};
pub use validation::ValidationError;

use crate::queue::SchedulerSettings;
use crate::worker::YtDlpOptions;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables (`VIDBOX__*`)
    /// 2. TOML file (`path`, else `VIDBOX_CONFIG`, else `config/vidbox.toml`)
    /// 3. Default values
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file is malformed or a value
    /// fails validation.
    pub fn load(path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let config = sources::load(path)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    ///
    /// Useful for testing with custom configuration files.
    pub fn load_from_path(path: PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }

    pub fn scheduler_settings(&self) -> SchedulerSettings {
        SchedulerSettings::builder()
            .queue_capacity(self.scheduler.queue_capacity)
            .quality_ceiling(self.scheduler.quality_ceiling)
            .download_dir(self.server.download_dir.clone())
            .build()
    }

    pub fn ytdlp_options(&self) -> YtDlpOptions {
        YtDlpOptions::builder()
            .binary(self.fetcher.binary.clone())
            .timeout(Duration::from_secs(self.fetcher.timeout_secs))
            .user_agent(self.fetcher.user_agent.clone())
            .build()
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention.retention_hours.saturating_mul(3600))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.retention.sweep_interval_secs)
    }
}
