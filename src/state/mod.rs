//! State module for tracking crawl progress
//!
//! This module holds the one piece of cross-record state a crawl keeps: the
//! recency gate that decides whether scraping should carry on.
//!
//! # Components
//!
//! - `GateState`: CONTINUE/STOP state of a single crawl run
//! - `RecencyGate`: watermark comparison driving the state transitions

mod gate;

// Re-export main types
pub use gate::{GateDecision, GateState, RecencyGate};
