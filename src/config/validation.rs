use crate::config::types::{Config, OutputConfig, ScraperConfig, UserAgentConfig};
use crate::ConfigError;
use url::Url;

/// Upper bound on the per-request delay (milliseconds)
const MAX_REQUEST_DELAY_MS: u64 = 60_000;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_scraper_config(&config.scraper)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates scraper configuration
fn validate_scraper_config(config: &ScraperConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url must use http or https, got '{}'",
            config.base_url
        )));
    }

    if config.request_delay_ms > MAX_REQUEST_DELAY_MS {
        return Err(ConfigError::Validation(format!(
            "request_delay_ms must be <= {}ms, got {}ms",
            MAX_REQUEST_DELAY_MS, config.request_delay_ms
        )));
    }

    validate_timezone(&config.timezone)?;

    if config.timestamp_format.trim().is_empty() {
        return Err(ConfigError::Validation(
            "timestamp_format cannot be empty".to_string(),
        ));
    }

    // The timezone label is always part of the parsed string
    if !config.timestamp_format.contains("%z") {
        return Err(ConfigError::Validation(format!(
            "timestamp_format must contain %z, got '{}'",
            config.timestamp_format
        )));
    }

    Ok(())
}

/// Validates a fixed offset label of the form `+HHMM` / `-HHMM`
fn validate_timezone(timezone: &str) -> Result<(), ConfigError> {
    let invalid = || {
        ConfigError::Validation(format!(
            "timezone must be a fixed offset like '+0000' or '-0500', got '{}'",
            timezone
        ))
    };

    let digits = timezone
        .strip_prefix('+')
        .or_else(|| timezone.strip_prefix('-'))
        .ok_or_else(invalid)?;

    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    let hours: u32 = digits[..2].parse().map_err(|_| invalid())?;
    let minutes: u32 = digits[2..].parse().map_err(|_| invalid())?;
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_header_text("crawler_version", &config.crawler_version)?;
    validate_header_text("contact_url", &config.contact_url)?;
    validate_header_text("contact_email", &config.contact_email)?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Checks a value that is embedded in the User-Agent header
///
/// Header values must be non-empty printable ASCII.
fn validate_header_text(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{} cannot be empty", field)));
    }

    if let Some(c) = value.chars().find(|c| !(c.is_ascii_graphic() || *c == ' ')) {
        return Err(ConfigError::Validation(format!(
            "{} contains {:?}, which cannot appear in a User-Agent header",
            field, c
        )));
    }

    Ok(())
}
