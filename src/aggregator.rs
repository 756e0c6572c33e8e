//! Stage aggregation
//!
//! Recomputes per-stage proportions straight from the samples, independently
//! of the segmenter, so the two can be cross-checked.

use crate::config::StageTables;
use crate::error::ComputeError;
use crate::types::{Sample, StageTotals};

/// Aggregator for whole-night stage proportions
pub struct Aggregator;

impl Aggregator {
    /// Fraction of all samples in each stage, indexed by display rank
    pub fn totals(samples: &[Sample], tables: &StageTables) -> Result<StageTotals, ComputeError> {
        if samples.is_empty() {
            return Err(ComputeError::EmptyInput);
        }

        let stage_count = tables.stage_count();
        let counts = samples.iter().enumerate().try_fold(
            vec![0usize; stage_count],
            |mut counts, (index, sample)| {
                let rank = tables.display_rank(sample.stage_code).ok_or_else(|| {
                    ComputeError::malformed(
                        index,
                        format!("stage code {} not in stage table", sample.stage_code),
                    )
                })?;
                counts[rank] += 1;
                Ok::<_, ComputeError>(counts)
            },
        )?;

        let total_samples = samples.len();
        let fractions = counts
            .iter()
            .map(|&count| count as f64 / total_samples as f64)
            .collect();

        Ok(StageTotals {
            fractions,
            counts,
            total_samples,
        })
    }
}
