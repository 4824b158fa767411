use serde::{Deserialize, Serialize};

/// Default listing URL; `?page=N` is appended per request
pub const DEFAULT_BASE_URL: &str = "https://www.vlr.gg/matches/results";

/// Default fixed timezone label appended to every listing timestamp
pub const DEFAULT_TIMEZONE: &str = "+0000";

/// Default combined format for `"{date}, {time} {timezone}"`
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%a, %B %d, %Y, %I:%M %p %z";

/// Main configuration structure for the scraper
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Scraper behavior configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Listing URL without the page query
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Fixed delay before every page request (milliseconds)
    #[serde(rename = "request-delay-ms")]
    pub request_delay_ms: u64,

    /// Fixed timezone label the listing times are expressed in (e.g. "+0000")
    pub timezone: String,

    /// chrono format for the combined date, time and timezone string
    #[serde(rename = "timestamp-format")]
    pub timestamp_format: String,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_delay_ms: 1000,
            timezone: DEFAULT_TIMEZONE.to_string(),
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "ValorantResults".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: "https://github.com/valorant-results".to_string(),
            contact_email: "admin@example.com".to_string(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database_path: "matches.db".to_string(),
        }
    }
}
