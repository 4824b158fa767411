//! Record normalization
//!
//! Turns a [`RawRecord`] into a typed [`MatchRecord`]. Failures here are
//! recoverable: the caller logs them and skips the record.

use crate::config::ScraperConfig;
use crate::crawler::parser::RawRecord;
use crate::storage::MatchRecord;
use chrono::DateTime;
use thiserror::Error;

/// Reasons a raw record cannot be stored
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("Unparsable timestamp '{input}': {message}")]
    Timestamp { input: String, message: String },

    #[error("No match id in url '{url}'")]
    MissingMatchId { url: String },
}

/// Converts raw string fields into typed values
#[derive(Debug, Clone)]
pub struct Normalizer {
    timezone: String,
    format: String,
}

impl Normalizer {
    /// Creates a normalizer for one fixed timezone label and format
    pub fn new(timezone: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            timezone: timezone.into(),
            format: format.into(),
        }
    }

    pub fn from_config(config: &ScraperConfig) -> Self {
        Self::new(config.timezone.clone(), config.timestamp_format.clone())
    }

    /// The combined string handed to the timestamp parser
    pub fn timestamp_input(&self, raw: &RawRecord) -> String {
        format!("{}, {} {}", raw.date_label, raw.time, self.timezone)
    }

    /// Normalizes one raw record
    ///
    /// # Returns
    ///
    /// * `Ok(MatchRecord)` - Timestamp resolved and match id present
    /// * `Err(NormalizeError)` - Record must be skipped
    pub fn normalize(&self, raw: RawRecord) -> Result<MatchRecord, NormalizeError> {
        let match_id = raw.match_id.ok_or_else(|| NormalizeError::MissingMatchId {
            url: raw.url.clone(),
        })?;

        let input = self.timestamp_input(&raw);
        let timestamp = DateTime::parse_from_str(&input, &self.format).map_err(|e| {
            NormalizeError::Timestamp {
                input: input.clone(),
                message: e.to_string(),
            }
        })?;

        let mut record = MatchRecord {
            match_id,
            url: raw.url,
            timestamp,
            stakes: raw.stakes,
            event: raw.event,
            map_stats: false,
            player_stats: false,
            other_stats: false,
            page: raw.page,
        };

        for tag in &raw.stat_tags {
            match format!("{}_stats", tag.trim().to_lowercase()).as_str() {
                "map_stats" => record.map_stats = true,
                "player_stats" => record.player_stats = true,
                "other_stats" => record.other_stats = true,
                other => tracing::debug!("Ignoring unknown stat tag {} on {}", other, record.url),
            }
        }

        Ok(record)
    }
}
