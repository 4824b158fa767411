//! Storage module for persisting scraped matches
//!
//! This module handles all database operations for the scraper, including:
//! - SQLite database initialization and schema management
//! - Duplicate-safe, append-only match persistence
//! - Watermark lookup for incremental crawls
//! - Crawl run bookkeeping and table inspection

mod schema;
mod sqlite;
mod traits;

pub use sqlite::{format_timestamp, parse_timestamp, SqliteStorage};
pub use traits::{Storage, StorageError, StorageResult};

use crate::ScrapeError;
use chrono::{DateTime, FixedOffset};
use std::path::Path;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(ScrapeError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> Result<SqliteStorage, ScrapeError> {
    SqliteStorage::new(path)
}

/// A scraped match, as persisted in the `matches` table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRecord {
    /// Integer id taken from the match URL; unique across the store
    pub match_id: i64,
    /// Relative path to the match detail page
    pub url: String,
    pub timestamp: DateTime<FixedOffset>,
    /// Event series label, empty when the listing has none
    pub stakes: String,
    pub event: String,
    pub map_stats: bool,
    pub player_stats: bool,
    pub other_stats: bool,
    /// 1-indexed listing page the record was scraped from
    pub page: u32,
}

/// Result of an insert attempt that did not fail outright
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The record was committed
    Inserted,

    /// A record with the same `match_id` already exists; nothing was written
    Duplicate,
}

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub mode: CrawlMode,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub pages_fetched: u32,
    pub inserted: u64,
    pub duplicates: u64,
    pub skipped: u64,
    pub error_message: Option<String>,
}

/// Which controller entry point produced a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlMode {
    /// Catch up to live, starting at page 1
    Incremental,

    /// Bulk backfill over an explicit page range
    Range,
}

impl CrawlMode {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Incremental => "incremental",
            Self::Range => "range",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "incremental" => Some(Self::Incremental),
            "range" => Some(Self::Range),
            _ => None,
        }
    }
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
