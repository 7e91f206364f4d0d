use super::models::Config;
use config::{ConfigError, Environment, File};
use std::env;
use std::path::PathBuf;

const CONFIG_ENV_VAR: &str = "VIDBOX_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/vidbox.toml";
const ENV_PREFIX: &str = "VIDBOX";
const ENV_SEPARATOR: &str = "__";

/// Load configuration from multiple sources with priority:
/// 1. Defaults (embedded in structs)
/// 2. TOML file (if exists)
/// 3. Environment variables from .env file (via dotenvy)
/// 4. System environment variables (highest priority)
///
/// An explicit path wins over `VIDBOX_CONFIG`, which wins over the default path.
pub fn load(explicit_path: Option<PathBuf>) -> Result<Config, ConfigError> {
    // Load .env file if it exists (ignore errors if file doesn't exist)
    let _ = dotenvy::dotenv();

    let config_path = explicit_path
        .or_else(|| env::var(CONFIG_ENV_VAR).ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    load_from_sources(config_path)
}

/// Load configuration from a specific path and environment
/// Useful for testing with custom config files
pub fn load_from_sources(config_path: PathBuf) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    if config_path.exists() {
        tracing::info!("Loading configuration from: {}", config_path.display());
        builder = builder.add_source(File::from(config_path).required(false));
    } else {
        tracing::warn!(
            "Configuration file not found at {}, using defaults and environment overrides",
            config_path.display()
        );
    }

    // VIDBOX__SCHEDULER__QUEUE_CAPACITY -> scheduler.queue_capacity
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .try_parsing(true),
    );

    let config = builder.build()?;
    config.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_defaults_only() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.toml");

        let config = load_from_sources(config_path).unwrap();
        assert_eq!(config.server.bind_addr.to_string(), "0.0.0.0:8000");
        assert_eq!(config.scheduler.queue_capacity, 5);
    }

    #[test]
    fn test_load_from_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[server]
bind_addr = "127.0.0.1:9000"
download_dir = "/var/lib/vidbox"

[server.api]
max_payload_bytes = "64KB"

[scheduler]
queue_capacity = 8
quality_ceiling = 1080

[retention]
retention_hours = 6
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let config = load_from_sources(config_path).unwrap();
        assert_eq!(config.server.bind_addr.to_string(), "127.0.0.1:9000");
        assert_eq!(config.server.download_dir, PathBuf::from("/var/lib/vidbox"));
        assert_eq!(config.server.api.max_payload_bytes.as_u64(), 64 * 1024);
        assert_eq!(config.scheduler.queue_capacity, 8);
        assert_eq!(config.scheduler.quality_ceiling, 1080);
        assert_eq!(config.scheduler.default_quality, 720);
        assert_eq!(config.retention.retention_hours, 6);
        assert_eq!(config.retention.sweep_interval_secs, 3600);
    }

    // Environment overrides are not exercised here: env::set_var is unsafe
    // under edition 2024 and races with parallel tests.

    #[test]
    fn test_fetcher_section() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[fetcher]
binary = "/opt/yt-dlp/bin/yt-dlp"
timeout_secs = 600
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let config = load_from_sources(config_path).unwrap();
        assert_eq!(config.fetcher.binary, "/opt/yt-dlp/bin/yt-dlp");
        assert_eq!(config.fetcher.timeout_secs, 600);
        assert!(config.fetcher.user_agent.starts_with("Mozilla/5.0"));
    }
}
