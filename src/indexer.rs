//! Transition indexing
//!
//! Finds the first interval of each display rank. Renderers use these
//! intervals as the anchors that per-stage blocks grow out of.

use crate::types::{FirstOccurrenceIndex, StageInterval};

/// Indexer for first occurrences of each stage
pub struct TransitionIndexer;

impl TransitionIndexer {
    /// First interval index for every rank in `0..stage_count`
    ///
    /// Single pass; stops early once every rank has been seen.
    pub fn first_occurrences(
        intervals: &[StageInterval],
        stage_count: usize,
    ) -> FirstOccurrenceIndex {
        let mut ranks: Vec<Option<usize>> = vec![None; stage_count];
        let mut remaining = stage_count;

        for (index, interval) in intervals.iter().enumerate() {
            if remaining == 0 {
                break;
            }
            match ranks.get_mut(interval.display_rank) {
                Some(slot) if slot.is_none() => {
                    *slot = Some(index);
                    remaining -= 1;
                }
                _ => {}
            }
        }

        FirstOccurrenceIndex::from_ranks(ranks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StageTables;
    use crate::segmenter::Segmenter;
    use crate::types::Sample;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn intervals(codes: &[usize]) -> Vec<StageInterval> {
        let samples: Vec<Sample> = codes
            .iter()
            .enumerate()
            .map(|(i, &stage_code)| Sample {
                instant: Utc.timestamp_opt(i as i64, 0).unwrap(),
                stage_code,
            })
            .collect();
        Segmenter::segment(&samples, &StageTables::standard()).unwrap()
    }

    #[test]
    fn test_first_occurrence_per_rank() {
        // W N1 N2 W REM N2 N3
        let intervals = intervals(&[0, 1, 2, 0, 4, 2, 3]);

        let index = TransitionIndexer::first_occurrences(&intervals, 5);

        assert_eq!(index.get(0), Some(0)); // W
        assert_eq!(index.get(1), Some(4)); // REM
        assert_eq!(index.get(2), Some(1)); // N1
        assert_eq!(index.get(3), Some(2)); // N2
        assert_eq!(index.get(4), Some(6)); // N3
    }

    #[test]
    fn test_missing_stage_not_found() {
        let intervals = intervals(&[0, 0, 1, 2, 3, 0]);

        let index = TransitionIndexer::first_occurrences(&intervals, 5);

        assert_eq!(index.get(1), None);
        assert_eq!(index.len(), 5);
    }

    #[test]
    fn test_index_is_minimum() {
        let intervals = intervals(&[2, 0, 2, 0, 4, 2]);
        let index = TransitionIndexer::first_occurrences(&intervals, 5);

        for rank in 0..5 {
            let expected = intervals.iter().position(|i| i.display_rank == rank);
            assert_eq!(index.get(rank), expected);
        }
    }

    #[test]
    fn test_no_intervals() {
        let index = TransitionIndexer::first_occurrences(&[], 5);
        assert!(index.iter().all(|slot| slot.is_none()));
    }
}
