//! Stage series normalization
//!
//! This module turns loader rows into canonical samples:
//! - Epoch seconds converted to UTC instants
//! - Stage codes checked against the stage table
//! - Series order checked (instants never go backwards)

use crate::config::StageTables;
use crate::error::ComputeError;
use crate::types::{RawStageRow, Sample};
use chrono::{DateTime, Utc};

/// Normalizer for converting loader rows to samples
pub struct Normalizer;

impl Normalizer {
    /// Normalize an ordered sequence of rows
    ///
    /// Fails on the first malformed row. No merging happens here.
    pub fn normalize(
        rows: &[RawStageRow],
        tables: &StageTables,
    ) -> Result<Vec<Sample>, ComputeError> {
        let mut samples: Vec<Sample> = Vec::with_capacity(rows.len());

        for (index, row) in rows.iter().enumerate() {
            let sample = Self::normalize_row(index, row, tables)?;
            Self::check_order(index, sample.instant, samples.last().map(|s| s.instant))?;
            samples.push(sample);
        }

        Ok(samples)
    }

    /// Reject an instant that precedes the previous sample
    pub fn check_order(
        index: usize,
        instant: DateTime<Utc>,
        previous: Option<DateTime<Utc>>,
    ) -> Result<(), ComputeError> {
        match previous {
            Some(previous) if instant < previous => Err(ComputeError::malformed(
                index,
                format!(
                    "timestamp {} precedes previous sample at {}",
                    instant.to_rfc3339(),
                    previous.to_rfc3339()
                ),
            )),
            _ => Ok(()),
        }
    }

    /// Normalize a single row, without the ordering check
    pub fn normalize_row(
        index: usize,
        row: &RawStageRow,
        tables: &StageTables,
    ) -> Result<Sample, ComputeError> {
        let timestamp = row
            .timestamp
            .ok_or_else(|| ComputeError::malformed(index, "missing field: timestamp"))?;
        let stage = row
            .sleep_stage
            .ok_or_else(|| ComputeError::malformed(index, "missing field: sleep_stage"))?;

        let instant = epoch_seconds_to_utc(timestamp).ok_or_else(|| {
            ComputeError::malformed(index, format!("invalid timestamp {}", timestamp))
        })?;

        let stage_count = tables.stage_count();
        let stage_code = usize::try_from(stage)
            .ok()
            .filter(|code| *code < stage_count)
            .ok_or_else(|| {
                ComputeError::malformed(
                    index,
                    format!("stage code {} outside [0, {}]", stage, stage_count - 1),
                )
            })?;

        Ok(Sample {
            instant,
            stage_code,
        })
    }
}

/// Convert (possibly fractional) epoch seconds to a UTC instant
///
/// Sub-second precision is kept down to the millisecond.
fn epoch_seconds_to_utc(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    let millis = (seconds * 1000.0).round();
    if millis < i64::MIN as f64 || millis > i64::MAX as f64 {
        return None;
    }
    DateTime::<Utc>::from_timestamp_millis(millis as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normalize_converts_epoch_seconds() {
        let tables = StageTables::standard();
        let rows = vec![
            RawStageRow::new(1_600_000_000.0, 0),
            RawStageRow::new(1_600_000_001.0, 4),
        ];

        let samples = Normalizer::normalize(&rows, &tables).unwrap();

        assert_eq!(samples.len(), 2);
        assert_eq!(
            samples[0].instant,
            Utc.timestamp_opt(1_600_000_000, 0).unwrap()
        );
        assert_eq!(samples[1].stage_code, 4);
    }

    #[test]
    fn test_normalize_is_pinned_to_utc() {
        let tables = StageTables::standard();
        // 2020-09-13T12:26:40Z
        let rows = vec![RawStageRow::new(1_600_000_000.0, 2)];
        let samples = Normalizer::normalize(&rows, &tables).unwrap();
        assert_eq!(samples[0].instant.to_rfc3339(), "2020-09-13T12:26:40+00:00");
    }

    #[test]
    fn test_fractional_seconds() {
        let tables = StageTables::standard();
        let rows = vec![RawStageRow::new(10.5, 1)];
        let samples = Normalizer::normalize(&rows, &tables).unwrap();
        assert_eq!(samples[0].instant.timestamp_millis(), 10_500);
    }

    #[test]
    fn test_missing_fields_are_malformed() {
        let tables = StageTables::standard();
        let rows = vec![
            RawStageRow::new(0.0, 0),
            RawStageRow {
                timestamp: Some(1.0),
                sleep_stage: None,
            },
        ];

        match Normalizer::normalize(&rows, &tables) {
            Err(ComputeError::MalformedInput { row, reason }) => {
                assert_eq!(row, 1);
                assert!(reason.contains("sleep_stage"));
            }
            other => panic!("expected MalformedInput, got {:?}", other),
        }

        let rows = vec![RawStageRow {
            timestamp: None,
            sleep_stage: Some(0),
        }];
        assert!(matches!(
            Normalizer::normalize(&rows, &tables),
            Err(ComputeError::MalformedInput { row: 0, .. })
        ));
    }

    #[test]
    fn test_stage_code_out_of_range() {
        let tables = StageTables::standard();
        for code in [-1, 5, 42] {
            let rows = vec![RawStageRow::new(0.0, code)];
            assert!(matches!(
                Normalizer::normalize(&rows, &tables),
                Err(ComputeError::MalformedInput { row: 0, .. })
            ));
        }
    }

    #[test]
    fn test_non_finite_timestamp() {
        let tables = StageTables::standard();
        let rows = vec![RawStageRow::new(f64::NAN, 0)];
        assert!(Normalizer::normalize(&rows, &tables).is_err());
        let rows = vec![RawStageRow::new(f64::INFINITY, 0)];
        assert!(Normalizer::normalize(&rows, &tables).is_err());
    }

    #[test]
    fn test_decreasing_timestamps_rejected() {
        let tables = StageTables::standard();
        let rows = vec![
            RawStageRow::new(10.0, 0),
            RawStageRow::new(10.0, 0),
            RawStageRow::new(9.0, 0),
        ];
        assert!(matches!(
            Normalizer::normalize(&rows, &tables),
            Err(ComputeError::MalformedInput { row: 2, .. })
        ));
    }

    #[test]
    fn test_empty_rows_normalize_to_empty_series() {
        let tables = StageTables::standard();
        assert!(Normalizer::normalize(&[], &tables).unwrap().is_empty());
    }
}
