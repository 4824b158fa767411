//! Valorant-Results main entry point
//!
//! This is the command-line interface for the incremental match scraper.

use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use valorant_results::config::{config_hash, load_config, validate, Config};
use valorant_results::crawler::{crawl, crawl_range, CrawlStats};
use valorant_results::output::{
    load_statistics, load_table_counts, print_statistics, print_table_counts,
};
use valorant_results::storage::{open_storage, SqliteStorage};

/// Valorant-Results: incremental match-results scraper
///
/// Pages through the results listing from newest to oldest and appends
/// matches that are not yet in the SQLite store, stopping as soon as it
/// reaches known data.
#[derive(Parser, Debug)]
#[command(name = "valorant-results")]
#[command(version)]
#[command(about = "Incrementally scrape match results into SQLite", long_about = None)]
struct Cli {
    /// Path to the SQLite database
    #[arg(long, value_name = "PATH")]
    sqlite_path: PathBuf,

    /// Optional TOML configuration file
    #[arg(long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Seconds to wait before each page request [default: 1]
    #[arg(long, value_name = "SECONDS")]
    scrape_delay: Option<u64>,

    /// Print row counts for these tables and exit (all tables if none given)
    #[arg(long, value_name = "NAME", num_args = 0.., conflicts_with_all = ["pages", "stats"])]
    table_names: Option<Vec<String>>,

    /// Backfill an inclusive page range instead of catching up from page 1
    #[arg(long, num_args = 2, value_names = ["START", "END"], conflicts_with = "stats")]
    pages: Option<Vec<u32>>,

    /// Show statistics from the database and exit
    #[arg(long)]
    stats: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = build_config(&cli)?;
    tracing::debug!("Effective configuration hash: {}", config_hash(&config)?);

    let storage = open_storage(&cli.sqlite_path)
        .with_context(|| format!("Failed to open database {}", cli.sqlite_path.display()))?;

    if let Some(names) = &cli.table_names {
        handle_tables(&storage, names)?;
    } else if cli.stats {
        handle_stats(&storage)?;
    } else if let Some(pages) = &cli.pages {
        handle_range(&config, storage, pages[0], pages[1]).await?;
    } else {
        handle_incremental(&config, storage).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("valorant_results=info,warn"),
            1 => EnvFilter::new("valorant_results=debug,info"),
            2 => EnvFilter::new("valorant_results=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the config file (or defaults) and applies command-line overrides
fn build_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?
        }
        None => Config::default(),
    };

    if let Some(seconds) = cli.scrape_delay {
        config.scraper.request_delay_ms = seconds.saturating_mul(1000);
    }
    config.output.database_path = cli.sqlite_path.display().to_string();
    validate(&config).context("Invalid configuration")?;

    Ok(config)
}

/// Handles --table-names: prints row counts for the named tables
fn handle_tables(storage: &SqliteStorage, names: &[String]) -> anyhow::Result<()> {
    let counts = load_table_counts(storage, names)?;
    print_table_counts(&counts);
    Ok(())
}

/// Handles --stats: shows statistics from the database
fn handle_stats(storage: &SqliteStorage) -> anyhow::Result<()> {
    let stats = load_statistics(storage)?;
    print_statistics(&stats);
    Ok(())
}

/// Handles --pages: backfills an explicit page range
async fn handle_range(
    config: &Config,
    storage: SqliteStorage,
    start_page: u32,
    end_page: u32,
) -> anyhow::Result<()> {
    tracing::info!("Backfilling pages {}..={}", start_page, end_page);

    match crawl_range(config, storage, start_page, end_page).await {
        Ok(stats) => {
            report(&stats);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Range crawl failed: {}", e);
            Err(e.into())
        }
    }
}

/// Handles the default mode: catches up with the live listing
async fn handle_incremental(config: &Config, storage: SqliteStorage) -> anyhow::Result<()> {
    tracing::info!("Updating {}", Path::new(&config.output.database_path).display());

    match crawl(config, storage).await {
        Ok(stats) => {
            report(&stats);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}

fn report(stats: &CrawlStats) {
    tracing::info!(
        "Done: {} pages fetched, {} new matches, {} duplicates, {} skipped",
        stats.pages_fetched,
        stats.inserted,
        stats.duplicates,
        stats.skipped
    );
}
