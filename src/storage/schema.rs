//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the scraper database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Scraped matches; append-only, one row per match id
CREATE TABLE IF NOT EXISTS matches (
    match_id INTEGER PRIMARY KEY,
    url TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    stakes TEXT NOT NULL DEFAULT '',
    event TEXT NOT NULL DEFAULT '',
    map_stats INTEGER NOT NULL DEFAULT 0,
    player_stats INTEGER NOT NULL DEFAULT 0,
    other_stats INTEGER NOT NULL DEFAULT 0,
    page INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_matches_timestamp ON matches(timestamp);

-- Track crawl runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    mode TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    pages_fetched INTEGER NOT NULL DEFAULT 0,
    inserted INTEGER NOT NULL DEFAULT 0,
    duplicates INTEGER NOT NULL DEFAULT 0,
    skipped INTEGER NOT NULL DEFAULT 0,
    error_message TEXT
);
"#;

/// Initializes the database schema
///
/// Safe to call on an existing database; every statement is
/// `IF NOT EXISTS`.
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
