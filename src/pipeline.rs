//! Pipeline orchestration
//!
//! This module provides the public API for Synheart Hypnogram.
//! It runs the full pipeline from loader rows to the encoded panel layout.

use crate::aggregator::Aggregator;
use crate::config::{LayoutConfig, StageTables};
use crate::encoder::LayoutEncoder;
use crate::error::ComputeError;
use crate::hypnogram::HypnogramPath;
use crate::indexer::TransitionIndexer;
use crate::normalizer::Normalizer;
use crate::scale::{LaneScale, TimeScale};
use crate::schema::RowAdapter;
use crate::segmenter::Segmenter;
use crate::transition::{TransitionOrchestrator, TransitionPlan};
use crate::types::{FirstOccurrenceIndex, RawStageRow, StageInterval, StageTotals};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Segmentation, totals and first-occurrence index of one night
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NightAnalysis {
    pub intervals: Vec<StageInterval>,
    pub totals: StageTotals,
    pub first_occurrence: FirstOccurrenceIndex,
}

/// A night analysis together with its panel geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NightLayout {
    pub analysis: NightAnalysis,
    pub plan: TransitionPlan,
    pub hypnogram: HypnogramPath,
}

/// Analyze one night of loader rows.
///
/// Pipeline stages:
/// 1. Normalizer - Rows to UTC samples
/// 2. Segmenter - Samples to stage intervals
/// 3. Aggregator - Per-stage fractions from the samples
/// 4. TransitionIndexer - First interval of each stage
///
/// Pure and deterministic: the same rows always give the same analysis.
pub fn analyze_night(
    rows: &[RawStageRow],
    tables: &StageTables,
) -> Result<NightAnalysis, ComputeError> {
    // Stage 1: Normalize rows
    let samples = Normalizer::normalize(rows, tables)?;

    // Stage 2: Segment into intervals
    let intervals = Segmenter::segment(&samples, tables)?;

    // Stage 3: Aggregate totals
    let totals = Aggregator::totals(&samples, tables)?;

    // Stage 4: Index first occurrences
    let first_occurrence = TransitionIndexer::first_occurrences(&intervals, tables.stage_count());

    debug!(
        samples = samples.len(),
        intervals = intervals.len(),
        "analyzed night"
    );

    Ok(NightAnalysis {
        intervals,
        totals,
        first_occurrence,
    })
}

/// Analyze one night and lay out its panels.
///
/// # Arguments
/// * `rows` - Loader rows in time order
/// * `config` - Stage tables, panel sizes and transition switch
pub fn hypnogram_layout(
    rows: &[RawStageRow],
    config: &LayoutConfig,
) -> Result<NightLayout, ComputeError> {
    config.validate()?;

    let analysis = analyze_night(rows, &config.stages)?;
    let budgets = config.panel_budgets();

    // Stage 5: Orchestrate the panel hand-off
    let plan = TransitionOrchestrator::new(&config.stages, budgets, config.timing).plan(
        &analysis.intervals,
        &analysis.totals,
        &analysis.first_occurrence,
    )?;

    // Stage 6: Hypnogram line over the decomposed lanes
    let hypnogram = HypnogramPath::from_intervals(
        &analysis.intervals,
        &TimeScale::new(plan.time_domain, budgets.decomposed.width),
        &LaneScale::new(budgets.decomposed.height, config.stages.stage_count()),
    );

    Ok(NightLayout {
        analysis,
        plan,
        hypnogram,
    })
}

/// Convert a JSON array of loader rows to a layout JSON payload.
///
/// # Arguments
/// * `rows_json` - JSON array of `{ "timestamp", "sleep_stage" }` rows
/// * `config` - Layout configuration
///
/// # Example
/// ```ignore
/// let payload = hypnogram_to_layout_json(rows_json, &LayoutConfig::default())?;
/// ```
pub fn hypnogram_to_layout_json(
    rows_json: String,
    config: &LayoutConfig,
) -> Result<String, ComputeError> {
    let rows = RowAdapter::parse_array(&rows_json)?;
    let layout = hypnogram_layout(&rows, config)?;
    LayoutEncoder::new().encode_to_json(&layout)
}

/// Processor holding a layout configuration and encoder.
///
/// Use this when laying out several nights with the same settings.
pub struct NightProcessor {
    config: LayoutConfig,
    encoder: LayoutEncoder,
}

impl Default for NightProcessor {
    fn default() -> Self {
        Self {
            config: LayoutConfig::default(),
            encoder: LayoutEncoder::new(),
        }
    }
}

impl NightProcessor {
    /// Create a processor with a validated configuration
    pub fn new(config: LayoutConfig) -> Result<Self, ComputeError> {
        config.validate()?;
        Ok(Self {
            config,
            encoder: LayoutEncoder::new(),
        })
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Lay out rows and encode the payload as JSON
    pub fn process_rows(&self, rows: &[RawStageRow]) -> Result<String, ComputeError> {
        let layout = hypnogram_layout(rows, &self.config)?;
        self.encoder.encode_to_json(&layout)
    }

    /// Process a JSON array of rows
    pub fn process_json(&self, rows_json: &str) -> Result<String, ComputeError> {
        let rows = RowAdapter::parse_array(rows_json)?;
        self.process_rows(&rows)
    }

    /// Process NDJSON rows
    pub fn process_ndjson(&self, ndjson: &str) -> Result<String, ComputeError> {
        let rows = RowAdapter::parse_ndjson(ndjson)?;
        self.process_rows(&rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rows(codes: &[i64]) -> Vec<RawStageRow> {
        codes
            .iter()
            .enumerate()
            .map(|(i, &code)| RawStageRow::new(1_600_000_000.0 + i as f64, code))
            .collect()
    }

    fn sample_rows_json() -> &'static str {
        r#"[
            {"timestamp": 1600000000, "sleep_stage": 0},
            {"timestamp": 1600000001, "sleep_stage": 0},
            {"timestamp": 1600000002, "sleep_stage": 1},
            {"timestamp": 1600000003, "sleep_stage": 2},
            {"timestamp": 1600000004, "sleep_stage": 2},
            {"timestamp": 1600000005, "sleep_stage": 4}
        ]"#
    }

    #[test]
    fn test_analyze_night() {
        let analysis = analyze_night(&rows(&[0, 0, 1, 2, 2, 4]), &StageTables::standard()).unwrap();

        assert_eq!(analysis.intervals.len(), 4);
        assert_eq!(analysis.totals.total_samples, 6);
        assert_eq!(analysis.first_occurrence.get(1), Some(3)); // REM
        assert_eq!(analysis.first_occurrence.get(4), None); // N3
    }

    #[test]
    fn test_hypnogram_to_layout_json() {
        let json = hypnogram_to_layout_json(
            sample_rows_json().to_string(),
            &LayoutConfig::default(),
        )
        .unwrap();

        let payload: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(payload["layout_version"], "hypnogram.layout.v1");
        assert_eq!(payload["producer"]["name"], "synheart-hypnogram");
        assert_eq!(payload["intervals"].as_array().unwrap().len(), 4);
        assert_eq!(payload["plan"]["overview"]["segments"].as_array().unwrap().len(), 4);
        assert_eq!(payload["hypnogram"]["points"].as_array().unwrap().len(), 8);
    }

    #[test]
    fn test_layout_without_transitions() {
        let config = LayoutConfig {
            use_transitions: false,
            ..Default::default()
        };
        let layout = hypnogram_layout(&rows(&[0, 1, 2, 3]), &config).unwrap();

        assert!(layout.plan.decomposed.is_none());
        assert!(layout.plan.steps.is_empty());
    }

    #[test]
    fn test_processor_formats() {
        let processor = NightProcessor::default();

        assert!(processor.process_json(sample_rows_json()).is_ok());

        let ndjson = "{\"timestamp\": 0, \"sleep_stage\": 0}\n{\"timestamp\": 1, \"sleep_stage\": 3}\n";
        assert!(processor.process_ndjson(ndjson).is_ok());
    }

    #[test]
    fn test_processor_rejects_invalid_config() {
        let config = LayoutConfig {
            width: -1.0,
            ..Default::default()
        };
        assert!(NightProcessor::new(config).is_err());
    }

    #[test]
    fn test_errors_propagate() {
        let tables = StageTables::standard();

        assert!(matches!(
            analyze_night(&[], &tables),
            Err(ComputeError::EmptyInput)
        ));
        assert!(matches!(
            analyze_night(&rows(&[2]), &tables),
            Err(ComputeError::DivisionDegenerate { samples: 1 })
        ));
        assert!(matches!(
            analyze_night(&rows(&[0, 9]), &tables),
            Err(ComputeError::MalformedInput { row: 1, .. })
        ));
        assert!(hypnogram_to_layout_json("not valid json".to_string(), &LayoutConfig::default()).is_err());
    }
}
