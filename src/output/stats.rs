//! Statistics generation from the match database
//!
//! This module provides functionality for extracting and displaying
//! store statistics from the storage layer.

use crate::storage::{format_timestamp, RunRecord, Storage};
use crate::ScrapeError;
use chrono::{DateTime, Utc};

/// Store statistics summary
#[derive(Debug, Clone)]
pub struct StoreStatistics {
    /// Number of stored matches
    pub total_matches: u64,

    /// Newest stored match timestamp (None for an empty store)
    pub latest_timestamp: Option<DateTime<Utc>>,

    /// Number of recorded crawl runs
    pub total_runs: u64,

    /// Most recent crawl run
    pub last_run: Option<RunRecord>,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(StoreStatistics)` - Successfully loaded statistics
/// * `Err(ScrapeError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> Result<StoreStatistics, ScrapeError> {
    let total_matches = storage.count_matches()?;

    let latest = storage.latest_timestamp()?;
    let latest_timestamp = (latest != DateTime::<Utc>::MIN_UTC).then_some(latest);

    let total_runs = storage.count_runs()?;
    let last_run = storage.get_latest_run()?;

    Ok(StoreStatistics {
        total_matches,
        latest_timestamp,
        total_runs,
        last_run,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &StoreStatistics) {
    println!("=== Match Store Statistics ===\n");

    println!("Overview:");
    println!("  Stored matches: {}", stats.total_matches);
    match &stats.latest_timestamp {
        Some(ts) => println!("  Newest match: {}", format_timestamp(ts)),
        None => println!("  Newest match: (none)"),
    }
    println!("  Crawl runs: {}", stats.total_runs);
    println!();

    if let Some(run) = &stats.last_run {
        println!("Last Run (#{}):", run.id);
        println!("  Mode: {}", run.mode.to_db_string());
        println!("  Status: {}", run.status.to_db_string());
        println!("  Started: {}", run.started_at);
        if let Some(finished) = &run.finished_at {
            println!("  Finished: {}", finished);
        }
        println!(
            "  Pages: {}, inserted: {}, duplicates: {}, skipped: {}",
            run.pages_fetched, run.inserted, run.duplicates, run.skipped
        );
        if let Some(message) = &run.error_message {
            println!("  Error: {}", message);
        }
    }
}
