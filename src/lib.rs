//! Valorant-Results: an incremental match-results scraper
//!
//! This crate pages through a match-results listing, extracts one record per
//! listed match and appends the ones it has not seen before to a local SQLite
//! store, stopping as soon as it reaches data that is already known.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for scraper operations
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch failed for page {page}: status code was {status}")]
    Fetch { page: u32, status: u16 },

    #[error("Network error for page {page}: {message}")]
    Network { page: u32, message: String },

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Storage error on page {page}: {source}")]
    Store {
        page: u32,
        #[source]
        source: storage::StorageError,
    },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    #[error("Misuse: {0}")]
    Misuse(String),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for scraper operations
pub type Result<T> = std::result::Result<T, ScrapeError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Controller, CrawlStats};
pub use state::{GateDecision, GateState, RecencyGate};
pub use storage::{InsertOutcome, MatchRecord, SqliteStorage, Storage};
