//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::crawler::CrawlStats;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{CrawlMode, InsertOutcome, MatchRecord, RunRecord, RunStatus};
use crate::ScrapeError;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{ffi, params, Connection, OptionalExtension, Row};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// Opens or creates the database file and makes sure the schema exists
    /// before any read or write.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(ScrapeError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, ScrapeError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self, ScrapeError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

/// Formats a timestamp for storage
///
/// Everything is stored as UTC with second precision, so lexical order in
/// the `timestamp` column matches chronological order.
pub fn format_timestamp<Tz: chrono::TimeZone>(timestamp: &DateTime<Tz>) -> String {
    timestamp
        .with_timezone(&Utc)
        .to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parses a stored timestamp back into UTC
pub fn parse_timestamp(value: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StorageError::InvalidTimestamp {
            value: value.to_string(),
            message: e.to_string(),
        })
}

/// True for a primary-key or unique constraint violation
fn is_duplicate_key(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                || e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
        }
        _ => false,
    }
}

fn match_from_row(row: &Row<'_>) -> rusqlite::Result<MatchRecord> {
    let timestamp: String = row.get(2)?;
    let timestamp = DateTime::parse_from_rfc3339(&timestamp)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;

    Ok(MatchRecord {
        match_id: row.get(0)?,
        url: row.get(1)?,
        timestamp,
        stakes: row.get(3)?,
        event: row.get(4)?,
        map_stats: row.get(5)?,
        player_stats: row.get(6)?,
        other_stats: row.get(7)?,
        page: row.get(8)?,
    })
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        mode: CrawlMode::from_db_string(&row.get::<_, String>(1)?)
            .unwrap_or(CrawlMode::Incremental),
        started_at: row.get(2)?,
        finished_at: row.get(3)?,
        config_hash: row.get(4)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(5)?)
            .unwrap_or(RunStatus::Running),
        pages_fetched: row.get(6)?,
        inserted: row.get::<_, i64>(7)? as u64,
        duplicates: row.get::<_, i64>(8)? as u64,
        skipped: row.get::<_, i64>(9)? as u64,
        error_message: row.get(10)?,
    })
}

impl SqliteStorage {
    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        stats: &CrawlStats,
        error_message: Option<&str>,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, pages_fetched = ?3, inserted = ?4,
             duplicates = ?5, skipped = ?6, error_message = ?7 WHERE id = ?8",
            params![
                status.to_db_string(),
                now,
                stats.pages_fetched,
                stats.inserted as i64,
                stats.duplicates as i64,
                stats.skipped as i64,
                error_message,
                run_id
            ],
        )?;
        Ok(())
    }
}

impl Storage for SqliteStorage {
    // ===== Match Records =====

    fn insert_match(&mut self, record: &MatchRecord) -> StorageResult<InsertOutcome> {
        // Dropping the transaction without commit rolls it back
        let tx = self.conn.transaction()?;

        let result = tx.execute(
            "INSERT INTO matches (match_id, url, timestamp, stakes, event, map_stats,
             player_stats, other_stats, page) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                record.match_id,
                record.url,
                format_timestamp(&record.timestamp),
                record.stakes,
                record.event,
                record.map_stats,
                record.player_stats,
                record.other_stats,
                record.page
            ],
        );

        match result {
            Ok(_) => {
                tx.commit()?;
                Ok(InsertOutcome::Inserted)
            }
            Err(e) if is_duplicate_key(&e) => Ok(InsertOutcome::Duplicate),
            Err(e) => Err(e.into()),
        }
    }

    fn latest_timestamp(&self) -> StorageResult<DateTime<Utc>> {
        let tx = self.conn.unchecked_transaction()?;
        let latest: Option<String> =
            tx.query_row("SELECT MAX(timestamp) FROM matches", [], |row| row.get(0))?;
        tx.commit()?;

        match latest {
            Some(value) => parse_timestamp(&value),
            None => Ok(DateTime::<Utc>::MIN_UTC),
        }
    }

    fn get_match(&self, match_id: i64) -> StorageResult<Option<MatchRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT match_id, url, timestamp, stakes, event, map_stats, player_stats,
                 other_stats, page FROM matches WHERE match_id = ?1",
                params![match_id],
                match_from_row,
            )
            .optional()?;

        Ok(record)
    }

    fn count_matches(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM matches", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    // ===== Run Management =====

    fn create_run(&mut self, mode: CrawlMode, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (mode, started_at, config_hash, status) VALUES (?1, ?2, ?3, ?4)",
            params![
                mode.to_db_string(),
                now,
                config_hash,
                RunStatus::Running.to_db_string()
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn complete_run(&mut self, run_id: i64, stats: &CrawlStats) -> StorageResult<()> {
        self.finish_run(run_id, RunStatus::Completed, stats, None)
    }

    fn fail_run(
        &mut self,
        run_id: i64,
        stats: &CrawlStats,
        message: &str,
    ) -> StorageResult<()> {
        self.finish_run(run_id, RunStatus::Failed, stats, Some(message))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                "SELECT id, mode, started_at, finished_at, config_hash, status, pages_fetched,
                 inserted, duplicates, skipped, error_message FROM runs ORDER BY id DESC LIMIT 1",
                [],
                run_from_row,
            )
            .optional()?;

        Ok(run)
    }

    fn count_runs(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM runs", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    // ===== Inspection =====

    fn list_tables(&self) -> StorageResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM sqlite_master
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
             ORDER BY name",
        )?;

        let tables = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;

        Ok(tables)
    }

    fn count_rows(&self, table: &str) -> StorageResult<u64> {
        // Only names read back from sqlite_master ever reach the query text
        let table = self
            .list_tables()?
            .into_iter()
            .find(|name| name == table)
            .ok_or_else(|| StorageError::TableNotFound(table.to_string()))?;

        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM \"{}\"", table),
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}
