use super::models::Config;
use thiserror::Error;

pub const MAX_RETENTION_HOURS: u64 = 24 * 365;
pub const MAX_SWEEP_INTERVAL_SECS: u64 = 7 * 24 * 3600;
pub const MAX_FETCH_TIMEOUT_SECS: u64 = 24 * 3600;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} must be positive")]
    NotPositive { field: &'static str },

    #[error("{field} must be at most {max}")]
    TooLarge { field: &'static str, max: u64 },

    #[error("fetcher binary must not be empty")]
    EmptyFetcherBinary,
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_scheduler(config)?;
    validate_retention(config)?;
    validate_fetcher(config)?;
    Ok(())
}

fn positive(value: u64, field: &'static str) -> Result<(), ValidationError> {
    if value == 0 {
        return Err(ValidationError::NotPositive { field });
    }
    Ok(())
}

fn at_most(value: u64, max: u64, field: &'static str) -> Result<(), ValidationError> {
    if value > max {
        return Err(ValidationError::TooLarge { field, max });
    }
    Ok(())
}

fn validate_scheduler(config: &Config) -> Result<(), ValidationError> {
    let scheduler = &config.scheduler;
    positive(scheduler.queue_capacity as u64, "scheduler.queue_capacity")?;
    positive(scheduler.quality_ceiling.into(), "scheduler.quality_ceiling")?;
    positive(scheduler.default_quality.into(), "scheduler.default_quality")?;
    positive(
        config.server.api.max_payload_bytes.as_u64(),
        "server.api.max_payload_bytes",
    )?;
    Ok(())
}

fn validate_retention(config: &Config) -> Result<(), ValidationError> {
    positive(config.retention.retention_hours, "retention.retention_hours")?;
    positive(config.retention.sweep_interval_secs, "retention.sweep_interval_secs")?;
    at_most(
        config.retention.retention_hours,
        MAX_RETENTION_HOURS,
        "retention.retention_hours",
    )?;
    at_most(
        config.retention.sweep_interval_secs,
        MAX_SWEEP_INTERVAL_SECS,
        "retention.sweep_interval_secs",
    )?;
    Ok(())
}

fn validate_fetcher(config: &Config) -> Result<(), ValidationError> {
    if config.fetcher.binary.trim().is_empty() {
        return Err(ValidationError::EmptyFetcherBinary);
    }
    positive(config.fetcher.timeout_secs, "fetcher.timeout_secs")?;
    at_most(
        config.fetcher.timeout_secs,
        MAX_FETCH_TIMEOUT_SECS,
        "fetcher.timeout_secs",
    )?;
    Ok(())
}
