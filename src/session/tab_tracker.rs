use std::fmt;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

pub const HISTORY_SEPARATOR: &str = " | ";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Direction {
    /// The participant left the task tab.
    Out,
    /// The participant came back.
    In,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Out => f.write_str("OUT"),
            Direction::In => f.write_str("IN"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TabSwitch {
    pub direction: Direction,
    pub at: DateTime<Utc>,
}

impl TabSwitch {
    /// `OUT: 14:03:27`, wall time in the participant's local zone.
    pub fn label(&self) -> String {
        format!(
            "{}: {}",
            self.direction,
            self.at.with_timezone(&Local).format("%H:%M:%S")
        )
    }
}

/// Visibility telemetry for the grid currently on screen.
///
/// Only records while active. The session activates it when a grid is
/// presented and deactivates it when the block ends, so surveys and intros
/// never count.
#[derive(Debug, Clone, Default)]
pub struct TabTracker {
    active: bool,
    leave_count: u32,
    history: Vec<TabSwitch>,
}

impl TabTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears telemetry for a freshly presented grid and starts recording.
    pub fn reset(&mut self) {
        self.leave_count = 0;
        self.history.clear();
        self.active = true;
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Returns false when the event was ignored.
    pub fn record(&mut self, direction: Direction, at: DateTime<Utc>) -> bool {
        if !self.active {
            return false;
        }
        if direction == Direction::Out {
            self.leave_count += 1;
        }
        self.history.push(TabSwitch { direction, at });
        true
    }

    pub fn leave_count(&self) -> u32 {
        self.leave_count
    }

    pub fn history(&self) -> &[TabSwitch] {
        &self.history
    }

    /// Chronological history as a single export cell.
    pub fn flatten(&self) -> String {
        self.history
            .iter()
            .map(TabSwitch::label)
            .collect::<Vec<_>>()
            .join(HISTORY_SEPARATOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn counts_only_departures() {
        let mut tracker = TabTracker::new();
        tracker.reset();
        let t0 = Utc::now();

        tracker.record(Direction::Out, t0);
        tracker.record(Direction::In, t0 + Duration::seconds(4));
        tracker.record(Direction::Out, t0 + Duration::seconds(9));

        assert_eq!(tracker.leave_count(), 2);
        assert_eq!(tracker.history().len(), 3);
    }

    #[test]
    fn flatten_keeps_order_and_separator() {
        let mut tracker = TabTracker::new();
        tracker.reset();
        let t0 = Utc::now();
        tracker.record(Direction::Out, t0);
        tracker.record(Direction::In, t0 + Duration::seconds(5));

        let flat = tracker.flatten();
        let parts: Vec<&str> = flat.split(HISTORY_SEPARATOR).collect();
        assert_eq!(parts.len(), 2);
        assert!(parts[0].starts_with("OUT: "));
        assert!(parts[1].starts_with("IN: "));
        assert_eq!(parts[0].len(), "OUT: 00:00:00".len());
    }

    #[test]
    fn inactive_tracker_ignores_events() {
        let mut tracker = TabTracker::new();
        assert!(!tracker.record(Direction::Out, Utc::now()));

        tracker.reset();
        tracker.deactivate();
        assert!(!tracker.record(Direction::Out, Utc::now()));
        assert_eq!(tracker.leave_count(), 0);
        assert!(tracker.flatten().is_empty());
    }

    #[test]
    fn reset_clears_previous_grid() {
        let mut tracker = TabTracker::new();
        tracker.reset();
        tracker.record(Direction::Out, Utc::now());
        tracker.reset();

        assert_eq!(tracker.leave_count(), 0);
        assert!(tracker.history().is_empty());
        assert!(tracker.is_active());
    }
}
