use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestValidationError {
    #[error("url is required")]
    MissingUrl,
    #[error("url must be an http/https link: {0}")]
    InvalidUrl(String),
    #[error("quality must be a positive integer, got {0}")]
    InvalidQuality(String),
}

/// Trimmed, non-empty http(s) URL
pub fn validate_url(url: Option<&str>) -> Result<String, RequestValidationError> {
    let url = url.map(str::trim).unwrap_or_default();
    if url.is_empty() {
        return Err(RequestValidationError::MissingUrl);
    }

    let lower = url.to_ascii_lowercase();
    if !lower.starts_with("http://") && !lower.starts_with("https://") {
        return Err(RequestValidationError::InvalidUrl(url.to_string()));
    }

    Ok(url.to_string())
}

/// Requested height: a JSON integer or a numeric string; absent or null means `default`
pub fn parse_quality(quality: Option<&Value>, default: u32) -> Result<u32, RequestValidationError> {
    let invalid = |value: &Value| RequestValidationError::InvalidQuality(value.to_string());

    let parsed = match quality {
        None | Some(Value::Null) => return Ok(default),
        Some(value @ Value::Number(number)) => match number.as_u64() {
            Some(n) => n,
            None => match number.as_f64() {
                Some(f) if f.fract() == 0.0 && f > 0.0 => f as u64,
                _ => return Err(invalid(value)),
            },
        },
        Some(value @ Value::String(text)) => {
            text.trim().parse::<u64>().map_err(|_| invalid(value))?
        }
        Some(value) => return Err(invalid(value)),
    };

    match u32::try_from(parsed) {
        Ok(q) if q > 0 => Ok(q),
        _ => Err(RequestValidationError::InvalidQuality(parsed.to_string())),
    }
}
