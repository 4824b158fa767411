//! Crawler module for listing page fetching and ingest
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching of listing pages
//! - Selector-driven extraction of raw match records
//! - Normalization of raw fields into typed records
//! - The incremental and range crawl loops

mod controller;
mod fetcher;
mod normalizer;
mod parser;

pub use controller::{Controller, CrawlStats, FIRST_PAGE};
pub use fetcher::{build_http_client, extract_page_count, page_url, FetchResult, PageFetcher};
pub use normalizer::{NormalizeError, Normalizer};
pub use parser::{
    match_id_from_href, Extract, Field, FieldRule, PageParser, RawRecord, CARD_SELECTOR,
    FIELD_RULES, LABEL_SELECTOR, MATCH_ITEM_SELECTOR,
};

use crate::config::Config;
use crate::storage::SqliteStorage;
use crate::Result;

/// Runs an incremental crawl against a store
///
/// This is the main entry point for catching up with the live listing. It
/// will:
/// 1. Read the watermark from the store
/// 2. Build the HTTP client and parser
/// 3. Crawl from page 1 until the store's newest data is reached
///
/// # Example
///
/// ```no_run
/// use valorant_results::config::Config;
/// use valorant_results::crawler::crawl;
/// use valorant_results::storage::SqliteStorage;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let storage = SqliteStorage::new(Path::new("matches.db"))?;
/// let stats = crawl(&Config::default(), storage).await?;
/// println!("{} new matches", stats.inserted);
/// # Ok(())
/// # }
/// ```
pub async fn crawl(config: &Config, storage: SqliteStorage) -> Result<CrawlStats> {
    let mut controller = Controller::new(config, storage)?;
    controller.run_incremental().await
}

/// Runs a backfill over an inclusive page range
pub async fn crawl_range(
    config: &Config,
    storage: SqliteStorage,
    start_page: u32,
    end_page: u32,
) -> Result<CrawlStats> {
    let mut controller = Controller::new(config, storage)?;
    controller.run_range(start_page, end_page).await
}
