//! Stage segmentation
//!
//! This module run-length encodes a normalized sample series into stage
//! intervals. One pass, no sorting: the series is already time ordered.
//!
//! Two boundary rules apply:
//! - `portion_of_night` divides by the number of sample-to-sample
//!   transitions (`n - 1`), so the portions of a night add up to
//!   `100 * n / (n - 1)` percent rather than exactly 100.
//! - Every interval ends at the first instant of the next run, except the
//!   final one, which ends at the last sample's own instant.

use crate::config::StageTables;
use crate::error::ComputeError;
use crate::types::{Sample, StageInterval};
use chrono::{DateTime, Utc};
use tracing::debug;

/// Segmenter for collapsing samples into stage intervals
pub struct Segmenter;

/// A run being accumulated by the fold
#[derive(Debug, Clone, Copy)]
struct Run {
    stage_code: usize,
    start: DateTime<Utc>,
    /// Position of the run's first sample in the series
    first_sample: usize,
    count: usize,
}

impl Run {
    fn open(first_sample: usize, sample: &Sample) -> Self {
        Self {
            stage_code: sample.stage_code,
            start: sample.instant,
            first_sample,
            count: 1,
        }
    }

    fn extend(self) -> Self {
        Self {
            count: self.count + 1,
            ..self
        }
    }
}

impl Segmenter {
    /// Segment samples into maximal runs of identical stage codes
    pub fn segment(
        samples: &[Sample],
        tables: &StageTables,
    ) -> Result<Vec<StageInterval>, ComputeError> {
        let (first, rest) = samples.split_first().ok_or(ComputeError::EmptyInput)?;
        let last = rest.last().ok_or(ComputeError::DivisionDegenerate { samples: 1 })?;

        let transitions = (samples.len() - 1) as f64;

        let (closed, open) = rest.iter().enumerate().fold(
            (Vec::new(), Run::open(0, first)),
            |(mut closed, run), (offset, sample)| {
                if sample.stage_code == run.stage_code {
                    (closed, run.extend())
                } else {
                    closed.push((run, sample.instant));
                    (closed, Run::open(offset + 1, sample))
                }
            },
        );

        let intervals = closed
            .into_iter()
            .chain(std::iter::once((open, last.instant)))
            .map(|(run, end)| to_interval(run, end, transitions, tables))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            samples = samples.len(),
            intervals = intervals.len(),
            "segmented stage series"
        );

        Ok(intervals)
    }
}

fn to_interval(
    run: Run,
    end: DateTime<Utc>,
    transitions: f64,
    tables: &StageTables,
) -> Result<StageInterval, ComputeError> {
    let unknown = || {
        ComputeError::malformed(
            run.first_sample,
            format!("stage code {} not in stage table", run.stage_code),
        )
    };
    let stage_label = tables.label(run.stage_code).ok_or_else(unknown)?;
    let display_rank = tables.display_rank(run.stage_code).ok_or_else(unknown)?;

    Ok(StageInterval {
        stage_label: stage_label.to_string(),
        stage_code: run.stage_code,
        display_rank,
        portion_of_night: run.count as f64 / transitions * 100.0,
        start_instant: run.start,
        end_instant: end,
        sample_count: run.count,
    })
}
