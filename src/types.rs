//! Core types for the Synheart Hypnogram pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: loader rows, normalized samples, stage intervals, aggregate totals,
//! the first-occurrence index, and the plain geometry values handed to renderers.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// One row as delivered by the loader collaborator.
///
/// Both fields are optional so that a missing column is reported by the
/// normalizer with its row number instead of failing deserialization.
/// `RowAdapter` reports wrongly typed fields against the row the same way.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RawStageRow {
    /// Epoch seconds (may carry a fractional part)
    pub timestamp: Option<f64>,
    /// Stage code, an index into the stage-code table
    pub sleep_stage: Option<i64>,
}

impl RawStageRow {
    pub fn new(timestamp: f64, sleep_stage: i64) -> Self {
        Self {
            timestamp: Some(timestamp),
            sleep_stage: Some(sleep_stage),
        }
    }
}

/// A normalized observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    /// Observation instant (UTC)
    pub instant: DateTime<Utc>,
    /// Validated stage code
    pub stage_code: usize,
}

/// A maximal contiguous run of one stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageInterval {
    /// Stage label from the stage-code table (e.g. "N2")
    pub stage_label: String,
    /// Stage code shared by every sample of the run
    pub stage_code: usize,
    /// Position of the stage in the display order
    pub display_rank: usize,
    /// Share of the night, in percent of sample transitions
    pub portion_of_night: f64,
    /// Instant of the first sample of the run
    pub start_instant: DateTime<Utc>,
    /// Instant of the first sample of the next run, or of the last sample
    /// for the final run
    pub end_instant: DateTime<Utc>,
    /// Number of samples in the run
    pub sample_count: usize,
}

impl StageInterval {
    pub fn duration(&self) -> Duration {
        self.end_instant - self.start_instant
    }
}

/// Fraction of the night spent in each stage, indexed by display rank
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageTotals {
    /// Fraction (0-1) per display rank
    pub fractions: Vec<f64>,
    /// Sample count per display rank
    pub counts: Vec<usize>,
    /// Number of samples in the night
    pub total_samples: usize,
}

impl StageTotals {
    /// Fraction for a display rank; unknown ranks have none of the night
    pub fn fraction(&self, rank: usize) -> f64 {
        self.fractions.get(rank).copied().unwrap_or(0.0)
    }

    pub fn count(&self, rank: usize) -> usize {
        self.counts.get(rank).copied().unwrap_or(0)
    }

    /// Number of ranks covered
    pub fn len(&self) -> usize {
        self.fractions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fractions.is_empty()
    }

    /// Time spent in a stage given the sampling cadence, `None` on overflow
    pub fn duration(&self, rank: usize, cadence: Duration) -> Option<Duration> {
        let count = i32::try_from(self.count(rank)).ok()?;
        cadence.checked_mul(count)
    }
}

/// Index of the first interval holding each display rank
///
/// Serialized as a list of integers with `-1` for ranks that never occur.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "Vec<i64>", try_from = "Vec<i64>")]
pub struct FirstOccurrenceIndex {
    ranks: Vec<Option<usize>>,
}

impl FirstOccurrenceIndex {
    pub fn from_ranks(ranks: Vec<Option<usize>>) -> Self {
        Self { ranks }
    }

    /// First interval index for a rank, `None` when the stage never occurs
    pub fn get(&self, rank: usize) -> Option<usize> {
        self.ranks.get(rank).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<usize>> + '_ {
        self.ranks.iter().copied()
    }
}

impl From<FirstOccurrenceIndex> for Vec<i64> {
    fn from(index: FirstOccurrenceIndex) -> Self {
        index
            .ranks
            .into_iter()
            .map(|slot| slot.map_or(-1, |i| i as i64))
            .collect()
    }
}

impl TryFrom<Vec<i64>> for FirstOccurrenceIndex {
    type Error = String;

    fn try_from(raw: Vec<i64>) -> Result<Self, Self::Error> {
        let ranks = raw
            .into_iter()
            .map(|value| match value {
                -1 => Ok(None),
                v if v >= 0 => Ok(Some(v as usize)),
                v => Err(format!("invalid first-occurrence entry {}", v)),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { ranks })
    }
}

/// A point in panel-local pixel space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// An axis-aligned rectangle in panel-local pixel space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}
