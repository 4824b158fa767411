//! Crawl controller - page loop and ingest orchestration
//!
//! This module contains the two crawl loops and the per-page ingest
//! pipeline:
//! - Waiting the fixed delay before each request
//! - Fetching, parsing and normalizing one page at a time
//! - Feeding records through the recency gate into storage
//! - Recording each run in the `runs` table

use crate::config::{config_hash, Config};
use crate::crawler::fetcher::{build_http_client, FetchResult, PageFetcher};
use crate::crawler::normalizer::Normalizer;
use crate::crawler::parser::PageParser;
use crate::state::{GateDecision, GateState, RecencyGate};
use crate::storage::{CrawlMode, InsertOutcome, Storage};
use crate::ScrapeError;
use scraper::Html;
use std::time::Duration;
use url::Url;

/// First page of the listing; incremental runs must start here
pub const FIRST_PAGE: u32 = 1;

/// Totals for one crawl run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStats {
    /// Pages fetched successfully
    pub pages_fetched: u32,
    /// Raw records pulled from parsed pages
    pub records_seen: u64,
    /// Records committed to the store
    pub inserted: u64,
    /// Records rejected because their match id was already stored
    pub duplicates: u64,
    /// Records dropped by normalization
    pub skipped: u64,
    /// Records older than the watermark
    pub ignored: u64,
    /// True if the recency gate ended the run
    pub stopped_by_gate: bool,
}

/// How records of a page are handled relative to the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IngestPolicy {
    /// Stop pulling records the moment the gate stops
    UntilStop,
    /// Insert every record; duplicates are skipped and the gate never ends the run
    Backfill,
}

/// Per-run crawl controller
///
/// Holds all mutable crawl state (page cursor, gate) for exactly one run.
/// Build a new controller for every run.
pub struct Controller<S: Storage> {
    fetcher: PageFetcher,
    parser: PageParser,
    normalizer: Normalizer,
    storage: S,
    gate: RecencyGate,
    current_page: u32,
    delay: Duration,
    config_hash: String,
}

impl<S: Storage> Controller<S> {
    /// Creates a new controller
    ///
    /// The watermark is read from storage here, so it reflects the store as
    /// of crawl start.
    ///
    /// # Arguments
    ///
    /// * `config` - The scraper configuration
    /// * `storage` - An opened store (schema already initialized)
    ///
    /// # Returns
    ///
    /// * `Ok(Controller)` - Successfully created controller
    /// * `Err(ScrapeError)` - Failed to build the client, selectors or watermark
    pub fn new(config: &Config, storage: S) -> Result<Self, ScrapeError> {
        let base_url = Url::parse(&config.scraper.base_url)?;
        let client = build_http_client(&config.user_agent)?;
        let watermark = storage.latest_timestamp()?;

        tracing::debug!("Watermark at crawl start: {}", watermark);

        Ok(Self {
            fetcher: PageFetcher::new(client, base_url),
            parser: PageParser::new()?,
            normalizer: Normalizer::from_config(&config.scraper),
            storage,
            gate: RecencyGate::new(watermark),
            current_page: FIRST_PAGE,
            delay: Duration::from_millis(config.scraper.request_delay_ms),
            config_hash: config_hash(config)?,
        })
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn gate_state(&self) -> GateState {
        self.gate.state()
    }

    pub fn gate(&self) -> &RecencyGate {
        &self.gate
    }

    /// Total page count cached by the fetcher, once a page has been fetched
    pub fn max_pages(&self) -> Option<u32> {
        self.fetcher.max_pages()
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    /// Bulk backfill over an inclusive page range
    ///
    /// Every page in `start_page..=end_page` is fetched in increasing order
    /// with the fixed delay before each request. Gate state never ends this
    /// mode early; duplicates are counted and skipped.
    pub async fn run_range(
        &mut self,
        start_page: u32,
        end_page: u32,
    ) -> Result<CrawlStats, ScrapeError> {
        if start_page < FIRST_PAGE || start_page > end_page {
            return Err(ScrapeError::Misuse(format!(
                "invalid page range {}..={}",
                start_page, end_page
            )));
        }

        tracing::info!("Starting range crawl of pages {}..={}", start_page, end_page);
        let run_id = self.storage.create_run(CrawlMode::Range, &self.config_hash)?;
        let mut stats = CrawlStats::default();

        let mut result = Ok(());
        for page in start_page..=end_page {
            self.current_page = page;
            result = self.crawl_page(page, IngestPolicy::Backfill, &mut stats).await;
            if result.is_err() {
                break;
            }
        }

        self.finish_run(run_id, stats, result)
    }

    /// Catch up to live, starting from page 1
    ///
    /// Pages are crawled in order until the recency gate stops, the cached
    /// page count is exceeded, or a page lists no matches.
    ///
    /// # Returns
    ///
    /// * `Err(ScrapeError::Misuse)` - The page cursor is not at page 1; no
    ///   request or store access happens
    pub async fn run_incremental(&mut self) -> Result<CrawlStats, ScrapeError> {
        if self.current_page != FIRST_PAGE {
            return Err(ScrapeError::Misuse(format!(
                "incremental crawl must start at page {}, cursor is at page {}",
                FIRST_PAGE, self.current_page
            )));
        }

        tracing::info!(
            "Starting incremental crawl (watermark {})",
            self.gate.watermark()
        );
        let run_id = self
            .storage
            .create_run(CrawlMode::Incremental, &self.config_hash)?;
        let mut stats = CrawlStats::default();

        let mut result = Ok(());
        while self.gate.state().is_continue() {
            if let Some(max_pages) = self.fetcher.max_pages() {
                if self.current_page > max_pages {
                    tracing::info!("Reached last listing page {}", max_pages);
                    break;
                }
            }

            let seen_before = stats.records_seen;
            result = self
                .crawl_page(self.current_page, IngestPolicy::UntilStop, &mut stats)
                .await;
            if result.is_err() {
                break;
            }

            if stats.records_seen == seen_before {
                tracing::info!("Page {} lists no matches, stopping", self.current_page);
                break;
            }

            self.current_page += 1;
        }

        stats.stopped_by_gate = self.gate.is_stopped();
        self.finish_run(run_id, stats, result)
    }

    /// Waits, fetches and ingests one page
    async fn crawl_page(
        &mut self,
        page: u32,
        policy: IngestPolicy,
        stats: &mut CrawlStats,
    ) -> Result<(), ScrapeError> {
        tokio::time::sleep(self.delay).await;

        let body = match self.fetcher.fetch(page).await {
            FetchResult::Success {
                final_url,
                status_code,
                body,
            } => {
                tracing::debug!("Page {} answered {} from {}", page, status_code, final_url);
                body
            }
            FetchResult::HttpError { status_code } => {
                return Err(ScrapeError::Fetch {
                    page,
                    status: status_code,
                });
            }
            FetchResult::NetworkError { error } => {
                return Err(ScrapeError::Network {
                    page,
                    message: error,
                });
            }
        };
        stats.pages_fetched += 1;

        let before = stats.clone();
        self.ingest_page(&body, page, policy, stats)?;

        tracing::info!(
            "Page {}: {} records, {} inserted, {} duplicates, {} skipped",
            page,
            stats.records_seen - before.records_seen,
            stats.inserted - before.inserted,
            stats.duplicates - before.duplicates,
            stats.skipped - before.skipped
        );

        Ok(())
    }

    /// Runs the records of one page through normalizer, gate and store
    ///
    /// Kept synchronous so the parsed document never lives across an await.
    fn ingest_page(
        &mut self,
        body: &str,
        page: u32,
        policy: IngestPolicy,
        stats: &mut CrawlStats,
    ) -> Result<(), ScrapeError> {
        let document = Html::parse_document(body);

        for raw in self.parser.parse(&document, page) {
            stats.records_seen += 1;

            let record = match self.normalizer.normalize(raw) {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!("Skipping record on page {}: {}", page, e);
                    stats.skipped += 1;
                    continue;
                }
            };

            if policy == IngestPolicy::UntilStop {
                let timestamp = record.timestamp.with_timezone(&chrono::Utc);
                if self.gate.evaluate(timestamp) == GateDecision::Stop {
                    tracing::info!(
                        "Match {} predates the watermark, crawl has caught up",
                        record.match_id
                    );
                    stats.ignored += 1;
                    break;
                }
            }

            let outcome = self
                .storage
                .insert_match(&record)
                .map_err(|source| ScrapeError::Store { page, source })?;

            match outcome {
                InsertOutcome::Inserted => {
                    tracing::debug!("Inserted match {} ({})", record.match_id, record.timestamp);
                    stats.inserted += 1;
                }
                InsertOutcome::Duplicate => {
                    stats.duplicates += 1;
                    if policy == IngestPolicy::UntilStop {
                        tracing::info!(
                            "Match {} already stored, crawl has caught up",
                            record.match_id
                        );
                        self.gate.mark_duplicate();
                        break;
                    }
                    tracing::debug!("Match {} already stored, skipping", record.match_id);
                }
            }
        }

        Ok(())
    }

    /// Records the run outcome and hands back the stats or the fatal error
    fn finish_run(
        &mut self,
        run_id: i64,
        stats: CrawlStats,
        result: Result<(), ScrapeError>,
    ) -> Result<CrawlStats, ScrapeError> {
        match result {
            Ok(()) => {
                self.storage.complete_run(run_id, &stats)?;
                tracing::info!(
                    "Crawl finished: {} pages, {} inserted, {} duplicates, {} skipped (gate: {})",
                    stats.pages_fetched,
                    stats.inserted,
                    stats.duplicates,
                    stats.skipped,
                    self.gate.state()
                );
                Ok(stats)
            }
            Err(e) => {
                if let Err(store_err) = self.storage.fail_run(run_id, &stats, &e.to_string()) {
                    tracing::error!("Failed to record run failure: {}", store_err);
                }
                Err(e)
            }
        }
    }
}
