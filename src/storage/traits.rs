//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::crawler::CrawlStats;
use crate::storage::{CrawlMode, InsertOutcome, MatchRecord, RunRecord};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during storage operations
///
/// A duplicate `match_id` is not an error; it is reported as
/// [`InsertOutcome::Duplicate`].
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Invalid stored timestamp '{value}': {message}")]
    InvalidTimestamp { value: String, message: String },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// The crawl is single-writer: the read-watermark, compare, insert sequence
/// is not guarded against concurrent writers.
pub trait Storage {
    // ===== Match Records =====

    /// Inserts a match in its own transaction
    ///
    /// # Returns
    ///
    /// * `Ok(InsertOutcome::Inserted)` - The row was committed
    /// * `Ok(InsertOutcome::Duplicate)` - `match_id` already stored; rolled back
    /// * `Err(StorageError)` - Any other failure
    fn insert_match(&mut self, record: &MatchRecord) -> StorageResult<InsertOutcome>;

    /// Gets the newest stored timestamp
    ///
    /// Returns `DateTime::<Utc>::MIN_UTC` when the store is empty.
    fn latest_timestamp(&self) -> StorageResult<DateTime<Utc>>;

    /// Gets a match by id
    fn get_match(&self, match_id: i64) -> StorageResult<Option<MatchRecord>>;

    /// Counts stored matches
    fn count_matches(&self) -> StorageResult<u64>;

    // ===== Run Management =====

    /// Creates a new crawl run in the `running` state
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, mode: CrawlMode, config_hash: &str) -> StorageResult<i64>;

    /// Marks a run as completed and stores its totals
    fn complete_run(&mut self, run_id: i64, stats: &CrawlStats) -> StorageResult<()>;

    /// Marks a run as failed and stores its totals and the error
    fn fail_run(&mut self, run_id: i64, stats: &CrawlStats, message: &str)
        -> StorageResult<()>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Counts recorded runs
    fn count_runs(&self) -> StorageResult<u64>;

    // ===== Inspection =====

    /// Lists user tables in name order
    fn list_tables(&self) -> StorageResult<Vec<String>>;

    /// Counts rows in a table
    ///
    /// Fails with `StorageError::TableNotFound` for names that are not an
    /// existing table.
    fn count_rows(&self, table: &str) -> StorageResult<u64>;
}
