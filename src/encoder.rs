//! Layout encoding
//!
//! This module encodes a computed night layout into the versioned JSON payload
//! consumed by rendering collaborators.

use crate::error::ComputeError;
use crate::hypnogram::HypnogramPath;
use crate::pipeline::NightLayout;
use crate::transition::TransitionPlan;
use crate::types::{FirstOccurrenceIndex, StageInterval, StageTotals};
use crate::{HYPNOGRAM_VERSION, PRODUCER_NAME};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current layout payload schema version
pub const LAYOUT_VERSION: &str = "hypnogram.layout.v1";

/// Producer metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Complete layout payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutPayload {
    pub layout_version: String,
    pub producer: LayoutProducer,
    pub total_samples: usize,
    pub intervals: Vec<StageInterval>,
    pub totals: StageTotals,
    /// First interval per display rank, `-1` when the stage never occurs
    pub first_occurrence: FirstOccurrenceIndex,
    pub plan: TransitionPlan,
    pub hypnogram: HypnogramPath,
}

/// Layout encoder for producing versioned JSON payloads
pub struct LayoutEncoder {
    instance_id: String,
}

impl Default for LayoutEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Encode a night layout into a payload
    pub fn encode(&self, layout: &NightLayout) -> LayoutPayload {
        let analysis = &layout.analysis;

        LayoutPayload {
            layout_version: LAYOUT_VERSION.to_string(),
            producer: LayoutProducer {
                name: PRODUCER_NAME.to_string(),
                version: HYPNOGRAM_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            total_samples: analysis.totals.total_samples,
            intervals: analysis.intervals.clone(),
            totals: analysis.totals.clone(),
            first_occurrence: analysis.first_occurrence.clone(),
            plan: layout.plan.clone(),
            hypnogram: layout.hypnogram.clone(),
        }
    }

    /// Encode to JSON string
    pub fn encode_to_json(&self, layout: &NightLayout) -> Result<String, ComputeError> {
        let payload = self.encode(layout);
        serde_json::to_string(&payload).map_err(|e| ComputeError::EncodingError(e.to_string()))
    }

    /// Encode to pretty-printed JSON string
    pub fn encode_to_json_pretty(&self, layout: &NightLayout) -> Result<String, ComputeError> {
        let payload = self.encode(layout);
        serde_json::to_string_pretty(&payload).map_err(|e| ComputeError::EncodingError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::pipeline::hypnogram_layout;
    use crate::types::RawStageRow;
    use pretty_assertions::assert_eq;

    fn layout() -> NightLayout {
        let rows: Vec<RawStageRow> = [0, 0, 1, 2, 2, 3, 0]
            .iter()
            .enumerate()
            .map(|(i, &code)| RawStageRow::new(1_600_000_000.0 + i as f64, code))
            .collect();
        hypnogram_layout(&rows, &LayoutConfig::default()).unwrap()
    }

    #[test]
    fn test_payload_metadata() {
        let encoder = LayoutEncoder::with_instance_id("test-instance".to_string());
        let payload = encoder.encode(&layout());

        assert_eq!(payload.layout_version, LAYOUT_VERSION);
        assert_eq!(payload.producer.name, PRODUCER_NAME);
        assert_eq!(payload.producer.instance_id, "test-instance");
        assert_eq!(payload.total_samples, 7);
    }

    #[test]
    fn test_json_uses_sentinel_for_missing_stages() {
        let encoder = LayoutEncoder::new();
        let json = encoder.encode_to_json(&layout()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        // REM (rank 1) never occurs
        assert_eq!(value["first_occurrence"][1], -1);
        assert_eq!(value["first_occurrence"][0], 0);
        assert_eq!(value["plan"]["steps"].as_array().unwrap().len(), 2);
        assert_eq!(value["intervals"][0]["stage_label"], "W");
    }

    #[test]
    fn test_payload_round_trips() {
        let encoder = LayoutEncoder::new();
        let json = encoder.encode_to_json_pretty(&layout()).unwrap();
        let payload: LayoutPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(payload.intervals.len(), 5);
    }

    #[test]
    fn test_instance_ids_are_unique() {
        assert_ne!(
            LayoutEncoder::new().instance_id(),
            LayoutEncoder::new().instance_id()
        );
    }
}
