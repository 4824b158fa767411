//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the scraper:
//! - Building the HTTP client with a proper user agent string
//! - One GET per listing page, no retry
//! - Caching the total page count from the first successful response
//! - Error classification

use crate::config::UserAgentConfig;
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;
use url::Url;

/// Navigation links of the listing; the last one names the final page
const PAGE_LINK_SELECTOR: &str = "a.btn.mod-page";

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// Successfully fetched the page
    Success {
        /// Final URL after redirects
        final_url: String,
        /// HTTP status code
        status_code: u16,
        /// Page body content
        body: String,
    },

    /// Server answered with a non-success status
    HttpError {
        /// The HTTP status code
        status_code: u16,
    },

    /// Network error (connection refused, timeout, body read failure, etc.)
    NetworkError {
        /// Error description
        error: String,
    },
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use valorant_results::config::UserAgentConfig;
/// use valorant_results::crawler::build_http_client;
///
/// let client = build_http_client(&UserAgentConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    // Format: CrawlerName/Version (+ContactURL; ContactEmail)
    let user_agent = format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    );

    Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Builds the URL of one listing page: `{base_url}?page={page}`
pub fn page_url(base_url: &Url, page: u32) -> Url {
    let mut url = base_url.clone();
    url.query_pairs_mut()
        .clear()
        .append_pair("page", &page.to_string());
    url
}

/// Reads the total page count from the listing's last navigation link
///
/// Returns None when the control is missing or its text is not a number.
pub fn extract_page_count(html: &str) -> Option<u32> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(PAGE_LINK_SELECTOR).ok()?;

    document
        .select(&selector)
        .last()
        .and_then(|link| link.text().collect::<String>().trim().parse().ok())
}

/// Fetches listing pages one at a time
///
/// The fetcher never advances a page cursor of its own; the caller decides
/// which page to request next.
pub struct PageFetcher {
    client: Client,
    base_url: Url,
    max_pages: Option<u32>,
    page_count_checked: bool,
}

impl PageFetcher {
    pub fn new(client: Client, base_url: Url) -> Self {
        Self {
            client,
            base_url,
            max_pages: None,
            page_count_checked: false,
        }
    }

    /// Total page count seen on the first successful response, if any
    pub fn max_pages(&self) -> Option<u32> {
        self.max_pages
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fetches one listing page
    ///
    /// # Classification
    ///
    /// | Condition | Result |
    /// |-----------|--------|
    /// | HTTP 2xx | Success |
    /// | Any other status | HttpError |
    /// | Transport or body error | NetworkError |
    ///
    /// Nothing is retried. The page count is extracted from the first
    /// successful response only; later responses never re-derive it.
    pub async fn fetch(&mut self, page: u32) -> FetchResult {
        let url = page_url(&self.base_url, page);
        tracing::debug!("Fetching {}", url);

        let response = match self.client.get(url.as_str()).send().await {
            Ok(response) => response,
            Err(e) => {
                let error = if e.is_timeout() {
                    "Request timeout".to_string()
                } else if e.is_connect() {
                    "Connection refused".to_string()
                } else {
                    e.to_string()
                };
                return FetchResult::NetworkError { error };
            }
        };

        let status = response.status();
        if !status.is_success() {
            return FetchResult::HttpError {
                status_code: status.as_u16(),
            };
        }

        let final_url = response.url().to_string();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return FetchResult::NetworkError {
                    error: e.to_string(),
                }
            }
        };

        if !self.page_count_checked {
            self.page_count_checked = true;
            self.max_pages = extract_page_count(&body);
            match self.max_pages {
                Some(count) => tracing::info!("Listing reports {} pages", count),
                None => tracing::debug!("No page count found on page {}", page),
            }
        }

        FetchResult::Success {
            final_url,
            status_code: status.as_u16(),
            body,
        }
    }
}
