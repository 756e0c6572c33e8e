//! Hypnogram step path
//!
//! The classic hypnogram: a step-after line through the display lanes, one
//! horizontal run per interval joined by vertical drops at stage changes.

use crate::scale::{LaneScale, TimeScale};
use crate::types::{Point, StageInterval};
use serde::{Deserialize, Serialize};

/// Vertices of a step-after polyline in panel-local coordinates
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HypnogramPath {
    pub points: Vec<Point>,
}

impl HypnogramPath {
    /// Two vertices per interval: its start and its end, both at the lane center
    pub fn from_intervals(
        intervals: &[StageInterval],
        time_scale: &TimeScale,
        lanes: &LaneScale,
    ) -> Self {
        let points = intervals
            .iter()
            .flat_map(|interval| {
                let y = lanes.center(interval.display_rank);
                [
                    Point {
                        x: time_scale.map(interval.start_instant),
                        y,
                    },
                    Point {
                        x: time_scale.map(interval.end_instant),
                        y,
                    },
                ]
            })
            .collect();

        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
