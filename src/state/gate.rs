//! Recency gate deciding whether a crawl should keep going
//!
//! The listing is presented newest-first, so the first record older than the
//! newest stored one means everything after it is already known.

use chrono::{DateTime, Utc};
use std::fmt;

/// Continuation state of a single crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GateState {
    /// Keep pulling records and pages
    Continue,

    /// The crawl has caught up with the store; never left once entered
    Stop,
}

impl GateState {
    /// Returns true if the crawl may keep pulling records
    pub fn is_continue(&self) -> bool {
        matches!(self, Self::Continue)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Continue => "continue",
            Self::Stop => "stop",
        }
    }
}

impl fmt::Display for GateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of evaluating one record against the watermark
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Record is at least as recent as the watermark; attempt the insert
    Admit,

    /// Record is older than the watermark, or the gate already stopped
    Stop,
}

/// CONTINUE/STOP state machine over a single watermark timestamp
#[derive(Debug, Clone)]
pub struct RecencyGate {
    watermark: DateTime<Utc>,
    state: GateState,
}

impl RecencyGate {
    /// Creates a gate in the `Continue` state
    ///
    /// # Arguments
    ///
    /// * `watermark` - Timestamp of the most recently persisted record when the
    ///   crawl started, or `DateTime::<Utc>::MIN_UTC` for an empty store
    pub fn new(watermark: DateTime<Utc>) -> Self {
        Self {
            watermark,
            state: GateState::Continue,
        }
    }

    pub fn watermark(&self) -> DateTime<Utc> {
        self.watermark
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn is_stopped(&self) -> bool {
        !self.state.is_continue()
    }

    /// Evaluates a record timestamp against the watermark
    ///
    /// Records at or after the watermark are admitted. The first record
    /// strictly older than the watermark moves the gate to `Stop`.
    pub fn evaluate(&mut self, timestamp: DateTime<Utc>) -> GateDecision {
        if self.is_stopped() {
            return GateDecision::Stop;
        }

        if timestamp < self.watermark {
            tracing::debug!(
                "Record at {} is older than watermark {}, stopping",
                timestamp,
                self.watermark
            );
            self.state = GateState::Stop;
            return GateDecision::Stop;
        }

        GateDecision::Admit
    }

    /// Records that an admitted record was already in the store
    ///
    /// This is the steady-state signal that the crawl has caught up.
    pub fn mark_duplicate(&mut self) {
        self.state = GateState::Stop;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn watermark() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 3, 4, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_starts_in_continue() {
        let gate = RecencyGate::new(watermark());
        assert_eq!(gate.state(), GateState::Continue);
        assert!(!gate.is_stopped());
    }

    #[test]
    fn test_admits_newer_and_equal() {
        let mut gate = RecencyGate::new(watermark());
        assert_eq!(
            gate.evaluate(watermark() + Duration::hours(1)),
            GateDecision::Admit
        );
        assert_eq!(gate.evaluate(watermark()), GateDecision::Admit);
        assert_eq!(gate.state(), GateState::Continue);
    }

    #[test]
    fn test_older_record_stops() {
        let mut gate = RecencyGate::new(watermark());
        assert_eq!(
            gate.evaluate(watermark() - Duration::minutes(1)),
            GateDecision::Stop
        );
        assert!(gate.is_stopped());
    }

    #[test]
    fn test_stop_is_one_way() {
        let mut gate = RecencyGate::new(watermark());
        gate.evaluate(watermark() - Duration::hours(1));

        // A newer record after the stop does not revive the gate
        assert_eq!(
            gate.evaluate(watermark() + Duration::hours(5)),
            GateDecision::Stop
        );
        assert_eq!(gate.state(), GateState::Stop);
    }

    #[test]
    fn test_duplicate_stops() {
        let mut gate = RecencyGate::new(watermark());
        assert_eq!(gate.evaluate(watermark()), GateDecision::Admit);
        gate.mark_duplicate();
        assert!(gate.is_stopped());
        assert_eq!(
            gate.evaluate(watermark() + Duration::hours(1)),
            GateDecision::Stop
        );
    }

    #[test]
    fn test_empty_store_watermark_admits_everything() {
        let mut gate = RecencyGate::new(DateTime::<Utc>::MIN_UTC);
        let old = Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(gate.evaluate(old), GateDecision::Admit);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", GateState::Continue), "continue");
        assert_eq!(format!("{}", GateState::Stop), "stop");
    }
}
