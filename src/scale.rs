//! Scales shared by the panels
//!
//! - `TimeScale` maps instants onto the horizontal extent of a panel
//! - `LaneScale` splits a panel height into one lane per display rank

use crate::types::StageInterval;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// First and last instant of the night
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeDomain {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeDomain {
    /// Domain spanned by an interval list, `None` when it is empty
    pub fn from_intervals(intervals: &[StageInterval]) -> Option<Self> {
        let first = intervals.first()?;
        let last = intervals.last()?;
        Some(Self {
            start: first.start_instant,
            end: last.end_instant,
        })
    }

    pub fn span_millis(&self) -> i64 {
        (self.end - self.start).num_milliseconds()
    }
}

/// Linear mapping from instants to panel-local x coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeScale {
    domain: TimeDomain,
    width: f64,
}

impl TimeScale {
    pub fn new(domain: TimeDomain, width: f64) -> Self {
        Self { domain, width }
    }

    pub fn domain(&self) -> TimeDomain {
        self.domain
    }

    /// X coordinate of an instant; a zero-length night maps everything to 0
    pub fn map(&self, instant: DateTime<Utc>) -> f64 {
        let span = self.domain.span_millis();
        if span <= 0 {
            return 0.0;
        }
        let offset = (instant - self.domain.start).num_milliseconds();
        offset as f64 * self.width / span as f64
    }
}

/// Ordinal mapping from display rank to a horizontal lane
///
/// Lane boundaries sit at `round(height * k / lanes)`, so the lanes tile
/// the panel exactly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaneScale {
    height: f64,
    lanes: usize,
}

impl LaneScale {
    pub fn new(height: f64, lanes: usize) -> Self {
        Self { height, lanes }
    }

    pub fn lanes(&self) -> usize {
        self.lanes
    }

    pub fn top(&self, rank: usize) -> f64 {
        if self.lanes == 0 {
            return 0.0;
        }
        let rank = rank.min(self.lanes) as f64;
        (self.height * rank / self.lanes as f64).round()
    }

    pub fn height(&self, rank: usize) -> f64 {
        self.top(rank + 1) - self.top(rank)
    }

    pub fn center(&self, rank: usize) -> f64 {
        self.top(rank) + self.height(rank) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn domain(start: i64, end: i64) -> TimeDomain {
        TimeDomain {
            start: Utc.timestamp_opt(start, 0).unwrap(),
            end: Utc.timestamp_opt(end, 0).unwrap(),
        }
    }

    #[test]
    fn test_time_scale_maps_linearly() {
        let scale = TimeScale::new(domain(100, 200), 500.0);

        assert_eq!(scale.map(Utc.timestamp_opt(100, 0).unwrap()), 0.0);
        assert_eq!(scale.map(Utc.timestamp_opt(150, 0).unwrap()), 250.0);
        assert_eq!(scale.map(Utc.timestamp_opt(200, 0).unwrap()), 500.0);
    }

    #[test]
    fn test_zero_span_domain() {
        let scale = TimeScale::new(domain(100, 100), 500.0);
        assert_eq!(scale.map(Utc.timestamp_opt(100, 0).unwrap()), 0.0);
    }

    #[test]
    fn test_lanes_match_ordinal_range() {
        // [0, .2h, .4h, .6h, .8h, h] with h = 60
        let lanes = LaneScale::new(60.0, 5);
        let tops: Vec<f64> = (0..=5).map(|k| lanes.top(k)).collect();
        assert_eq!(tops, vec![0.0, 12.0, 24.0, 36.0, 48.0, 60.0]);
        assert_eq!(lanes.height(2), 12.0);
        assert_eq!(lanes.center(0), 6.0);
    }

    #[test]
    fn test_lanes_tile_uneven_height() {
        let lanes = LaneScale::new(61.0, 5);
        let total: f64 = (0..5).map(|k| lanes.height(k)).sum();
        assert_eq!(total, 61.0);
    }
}
