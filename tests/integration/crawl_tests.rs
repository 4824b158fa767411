//! Integration tests for the crawler
//!
//! These tests use wiremock to serve listing pages and run the full
//! fetch, parse, normalize and store cycle end-to-end.

use std::path::Path;
use std::time::{Duration, Instant};
use valorant_results::config::Config;
use valorant_results::crawler::{crawl, crawl_range, Controller};
use valorant_results::storage::{CrawlMode, RunStatus, SqliteStorage, Storage};
use valorant_results::ScrapeError;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LISTING_PATH: &str = "/matches/results";

/// One listed match: (id, date label, time)
type Row<'a> = (i64, &'a str, &'a str);

/// Creates a test configuration pointing at the mock server
fn create_test_config(server: &MockServer, db_path: &Path, delay_ms: u64) -> Config {
    let mut config = Config::default();
    config.scraper.base_url = format!("{}{}", server.uri(), LISTING_PATH);
    config.scraper.request_delay_ms = delay_ms;
    config.user_agent.crawler_name = "TestBot".to_string();
    config.output.database_path = db_path.display().to_string();
    config
}

/// Renders a listing page, grouping consecutive rows that share a date
fn listing_page(rows: &[Row<'_>], page_count: Option<u32>) -> String {
    let mut body = String::from("<html><body><div class=\"col mod-1\">");

    let mut index = 0;
    while index < rows.len() {
        let date = rows[index].1;
        body.push_str(&format!(
            "<div class=\"wf-label mod-large\">\n  {}\n  <span class=\"wf-tag mod-today\">Today</span>\n</div>",
            date
        ));
        body.push_str("<div class=\"wf-card\">");
        while index < rows.len() && rows[index].1 == date {
            let (id, _, time) = rows[index];
            body.push_str(&format!(
                r#"<a href="/{id}/team-a-vs-team-b" class="wf-module-item match-item mod-color">
                    <div class="match-item-time">{time}</div>
                    <div class="match-item-event text-of">
                        <div class="match-item-event-series text-of">Group Stage</div>
                        Champions Tour
                    </div>
                    <div class="match-item-vod">
                        <div class="wf-tag mod-big">Map</div>
                        <div class="wf-tag mod-big">Player</div>
                    </div>
                </a>"#
            ));
            index += 1;
        }
        body.push_str("</div>");
    }

    if let Some(count) = page_count {
        body.push_str("<div class=\"action-container-pages\">");
        for page in 1..=count {
            body.push_str(&format!(
                "<a class=\"btn mod-page\" href=\"/matches/results/?page={page}\">{page}</a>"
            ));
        }
        body.push_str("</div>");
    }

    body.push_str("</div></body></html>");
    body
}

async fn mount_page(server: &MockServer, page: u32, body: String, expected_hits: u64) {
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .and(query_param("page", page.to_string()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .expect(expected_hits)
        .mount(server)
        .await;
}

/// Fails the test if any request reaches the server that no other mock took
async fn mount_no_other_requests(server: &MockServer) {
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .expect(0)
        .mount(server)
        .await;
}

const PAGE_ONE: &[Row<'static>] = &[
    (504, "Sat, March 4, 2023", "6:00 PM"),
    (503, "Sat, March 4, 2023", "3:00 PM"),
    (502, "Fri, March 3, 2023", "9:00 PM"),
];

const PAGE_TWO: &[Row<'static>] = &[
    (501, "Fri, March 3, 2023", "4:00 PM"),
    (500, "Thu, March 2, 2023", "1:00 PM"),
];

#[tokio::test]
async fn test_incremental_crawl_fills_empty_store() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("matches.db");
    let config = create_test_config(&mock_server, &db_path, 0);

    mount_page(&mock_server, 1, listing_page(PAGE_ONE, Some(2)), 1).await;
    mount_page(&mock_server, 2, listing_page(PAGE_TWO, Some(2)), 1).await;
    mount_no_other_requests(&mock_server).await;

    let storage = SqliteStorage::new(&db_path).unwrap();
    let stats = crawl(&config, storage).await.unwrap();

    assert_eq!(stats.pages_fetched, 2);
    assert_eq!(stats.inserted, 5);
    assert_eq!(stats.duplicates, 0);
    assert!(!stats.stopped_by_gate);

    let storage = SqliteStorage::new(&db_path).unwrap();
    assert_eq!(storage.count_matches().unwrap(), 5);

    let record = storage.get_match(503).unwrap().unwrap();
    assert_eq!(record.url, "/503/team-a-vs-team-b");
    assert_eq!(record.event, "Champions Tour");
    assert_eq!(record.stakes, "Group Stage");
    assert_eq!(record.page, 1);
    assert!(record.map_stats);
    assert!(record.player_stats);
    assert!(!record.other_stats);

    assert_eq!(storage.get_match(500).unwrap().unwrap().page, 2);
    assert_eq!(
        storage.latest_timestamp().unwrap().to_rfc3339(),
        "2023-03-04T18:00:00+00:00"
    );

    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.mode, CrawlMode::Incremental);
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.pages_fetched, 2);
    assert_eq!(run.inserted, 5);
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("matches.db");
    let config = create_test_config(&mock_server, &db_path, 0);

    // First run reads both pages, the second stops on page 1
    mount_page(&mock_server, 1, listing_page(PAGE_ONE, Some(2)), 2).await;
    mount_page(&mock_server, 2, listing_page(PAGE_TWO, Some(2)), 1).await;
    mount_no_other_requests(&mock_server).await;

    let first = crawl(&config, SqliteStorage::new(&db_path).unwrap())
        .await
        .unwrap();
    assert_eq!(first.inserted, 5);

    let second = crawl(&config, SqliteStorage::new(&db_path).unwrap())
        .await
        .unwrap();
    assert_eq!(second.inserted, 0);
    assert_eq!(second.pages_fetched, 1);
    assert!(second.stopped_by_gate);

    let storage = SqliteStorage::new(&db_path).unwrap();
    assert_eq!(storage.count_matches().unwrap(), 5);
    assert_eq!(storage.count_runs().unwrap(), 2);
}

#[tokio::test]
async fn test_catch_up_appends_only_new_matches() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("matches.db");

    let old_server = MockServer::start().await;
    mount_page(&old_server, 1, listing_page(PAGE_TWO, Some(1)), 1).await;
    let config = create_test_config(&old_server, &db_path, 0);
    crawl(&config, SqliteStorage::new(&db_path).unwrap())
        .await
        .unwrap();

    let before = SqliteStorage::new(&db_path)
        .unwrap()
        .latest_timestamp()
        .unwrap();

    // The listing has moved on: new matches sit on top of the known ones
    let new_server = MockServer::start().await;
    let mut rows = PAGE_ONE.to_vec();
    rows.extend_from_slice(PAGE_TWO);
    mount_page(&new_server, 1, listing_page(&rows, Some(1)), 1).await;
    mount_no_other_requests(&new_server).await;

    let config = create_test_config(&new_server, &db_path, 0);
    let stats = crawl(&config, SqliteStorage::new(&db_path).unwrap())
        .await
        .unwrap();

    assert_eq!(stats.inserted, 3);
    assert_eq!(stats.duplicates, 1);
    assert!(stats.stopped_by_gate);

    let storage = SqliteStorage::new(&db_path).unwrap();
    assert_eq!(storage.count_matches().unwrap(), 5);
    let after = storage.latest_timestamp().unwrap();
    assert!(after >= before);
    assert_eq!(after.to_rfc3339(), "2023-03-04T18:00:00+00:00");
}

#[tokio::test]
async fn test_range_fetches_exactly_the_requested_pages() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("matches.db");
    let config = create_test_config(&mock_server, &db_path, 50);

    mount_page(
        &mock_server,
        5,
        listing_page(&[(305, "Sat, March 4, 2023", "1:00 PM")], Some(9)),
        1,
    )
    .await;
    mount_page(
        &mock_server,
        6,
        listing_page(&[(304, "Fri, March 3, 2023", "1:00 PM")], Some(9)),
        1,
    )
    .await;
    mount_page(
        &mock_server,
        7,
        listing_page(&[(303, "Thu, March 2, 2023", "1:00 PM")], Some(9)),
        1,
    )
    .await;
    mount_no_other_requests(&mock_server).await;

    let started = Instant::now();
    let stats = crawl_range(&config, SqliteStorage::new(&db_path).unwrap(), 5, 7)
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert_eq!(stats.pages_fetched, 3);
    assert_eq!(stats.inserted, 3);
    assert!(elapsed >= Duration::from_millis(150));

    let storage = SqliteStorage::new(&db_path).unwrap();
    assert_eq!(storage.get_match(305).unwrap().unwrap().page, 5);
    assert_eq!(storage.get_match(303).unwrap().unwrap().page, 7);

    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.mode, CrawlMode::Range);
    assert_eq!(run.status, RunStatus::Completed);
}

#[tokio::test]
async fn test_range_ignores_watermark() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("matches.db");
    let config = create_test_config(&mock_server, &db_path, 0);

    // Page 1 establishes a recent watermark
    mount_page(&mock_server, 1, listing_page(PAGE_ONE, Some(1)), 1).await;
    crawl(&config, SqliteStorage::new(&db_path).unwrap())
        .await
        .unwrap();

    // Older matches deep in the listing, one of them already stored
    let older = [
        (502, "Fri, March 3, 2023", "9:00 PM"),
        (401, "Tue, February 28, 2023", "2:00 PM"),
        (400, "Tue, February 28, 2023", "11:00 AM"),
    ];
    mount_page(&mock_server, 3, listing_page(&older, Some(9)), 1).await;

    let stats = crawl_range(&config, SqliteStorage::new(&db_path).unwrap(), 3, 3)
        .await
        .unwrap();

    assert_eq!(stats.inserted, 2);
    assert_eq!(stats.duplicates, 1);
    assert!(!stats.stopped_by_gate);

    let storage = SqliteStorage::new(&db_path).unwrap();
    assert_eq!(storage.count_matches().unwrap(), 5);
    assert_eq!(storage.get_match(502).unwrap().unwrap().page, 1);
}

#[tokio::test]
async fn test_http_error_aborts_run() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("matches.db");
    let config = create_test_config(&mock_server, &db_path, 0);

    mount_page(&mock_server, 1, listing_page(PAGE_ONE, Some(3)), 1).await;
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_no_other_requests(&mock_server).await;

    let result = crawl(&config, SqliteStorage::new(&db_path).unwrap()).await;

    assert!(matches!(
        result,
        Err(ScrapeError::Fetch {
            page: 2,
            status: 500
        })
    ));

    // Page 1 stays committed, the run is marked failed
    let storage = SqliteStorage::new(&db_path).unwrap();
    assert_eq!(storage.count_matches().unwrap(), 3);

    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Failed);
    assert_eq!(run.pages_fetched, 1);
    assert_eq!(run.inserted, 3);
    assert!(run.error_message.unwrap().contains("500"));
}

#[tokio::test]
async fn test_unparsable_record_is_skipped() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("matches.db");
    let config = create_test_config(&mock_server, &db_path, 0);

    let rows = [
        (702, "Sat, March 4, 2023", "LIVE"),
        (701, "Sat, March 4, 2023", "5:00 PM"),
        (700, "Sat, March 4, 2023", "2:00 PM"),
    ];
    mount_page(&mock_server, 1, listing_page(&rows, Some(1)), 1).await;
    mount_no_other_requests(&mock_server).await;

    let stats = crawl(&config, SqliteStorage::new(&db_path).unwrap())
        .await
        .unwrap();

    assert_eq!(stats.records_seen, 3);
    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.inserted, 2);

    let storage = SqliteStorage::new(&db_path).unwrap();
    assert!(storage.get_match(702).unwrap().is_none());
    assert!(storage.get_match(701).unwrap().is_some());
    assert_eq!(storage.get_latest_run().unwrap().unwrap().skipped, 1);
}

#[tokio::test]
async fn test_empty_page_ends_incremental_crawl() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("matches.db");
    let config = create_test_config(&mock_server, &db_path, 0);

    // No page count on the listing, so only the empty page ends the run
    mount_page(&mock_server, 1, listing_page(PAGE_ONE, None), 1).await;
    mount_page(&mock_server, 2, listing_page(&[], None), 1).await;
    mount_no_other_requests(&mock_server).await;

    let stats = crawl(&config, SqliteStorage::new(&db_path).unwrap())
        .await
        .unwrap();

    assert_eq!(stats.pages_fetched, 2);
    assert_eq!(stats.inserted, 3);
    assert!(!stats.stopped_by_gate);
}

#[tokio::test]
async fn test_misuse_makes_no_requests() {
    let mock_server = MockServer::start().await;
    mount_page(
        &mock_server,
        2,
        listing_page(&[(600, "Sat, March 4, 2023", "1:00 PM")], Some(9)),
        1,
    )
    .await;
    mount_no_other_requests(&mock_server).await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("matches.db");
    let config = create_test_config(&mock_server, &db_path, 0);

    let mut controller = Controller::new(&config, SqliteStorage::new(&db_path).unwrap()).unwrap();

    assert!(matches!(
        controller.run_range(0, 2).await,
        Err(ScrapeError::Misuse(_))
    ));
    assert!(matches!(
        controller.run_range(4, 3).await,
        Err(ScrapeError::Misuse(_))
    ));
    assert_eq!(controller.storage().count_runs().unwrap(), 0);

    // A range run moves the cursor off page 1
    controller.run_range(2, 2).await.unwrap();
    assert_eq!(controller.current_page(), 2);

    assert!(matches!(
        controller.run_incremental().await,
        Err(ScrapeError::Misuse(_))
    ));
    assert_eq!(controller.storage().count_runs().unwrap(), 1);
    assert_eq!(controller.storage().count_matches().unwrap(), 1);
}
