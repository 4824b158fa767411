//! Configuration module for the scraper
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files. Every section is optional; anything left out uses its default.
//!
//! # Example
//!
//! ```no_run
//! use valorant_results::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Delay between requests: {}ms", config.scraper.request_delay_ms);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, OutputConfig, ScraperConfig, UserAgentConfig, DEFAULT_BASE_URL,
    DEFAULT_TIMESTAMP_FORMAT, DEFAULT_TIMEZONE,
};

// Re-export parser functions
pub use parser::{config_hash, load_config};
pub use validation::validate;
