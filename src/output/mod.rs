//! Output module for store reports
//!
//! This module handles:
//! - Summarizing the match store and its crawl runs
//! - Reporting row counts of named tables

pub mod stats;
pub mod tables;

pub use stats::{load_statistics, print_statistics, StoreStatistics};
pub use tables::{load_table_counts, print_table_counts, TableCount};
