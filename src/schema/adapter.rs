//! Row adapter
//!
//! Parses loader rows and reports every invalid row at once, for callers that
//! want a full validation report instead of the normalizer's first failure.

use crate::config::StageTables;
use crate::error::ComputeError;
use crate::normalizer::Normalizer;
use crate::types::RawStageRow;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// Adapter for loader rows
pub struct RowAdapter;

impl RowAdapter {
    /// Parse a JSON array of rows
    ///
    /// Only the array itself must be well-formed JSON; a row with a field of
    /// the wrong type is reported as malformed at its index.
    pub fn parse_array(json: &str) -> Result<Vec<RawStageRow>, ComputeError> {
        let values: Vec<Value> = serde_json::from_str(json)?;
        values
            .iter()
            .enumerate()
            .map(|(index, value)| Self::row_from_value(index, value))
            .collect()
    }

    /// Convert one decoded JSON row; absent and null fields stay `None`
    pub fn row_from_value(index: usize, value: &Value) -> Result<RawStageRow, ComputeError> {
        let object = value.as_object().ok_or_else(|| {
            ComputeError::malformed(index, format!("row is not an object: {}", value))
        })?;

        Ok(RawStageRow {
            timestamp: field(index, object, "timestamp", "a number", Value::as_f64)?,
            sleep_stage: field(index, object, "sleep_stage", "an integer", Value::as_i64)?,
        })
    }

    /// Parse NDJSON (one row per line, blank lines skipped)
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<RawStageRow>, ComputeError> {
        let mut rows = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<Value>(trimmed) {
                Ok(value) => rows.push(Self::row_from_value(rows.len(), &value)?),
                Err(e) => {
                    return Err(ComputeError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(rows)
    }

    /// Validate every row, returning one result per invalid row
    ///
    /// Ordering is checked against the last valid row before it.
    pub fn validate_rows(rows: &[RawStageRow], tables: &StageTables) -> Vec<ValidationResult> {
        let mut previous: Option<DateTime<Utc>> = None;
        let mut results = Vec::new();

        for (index, row) in rows.iter().enumerate() {
            let checked = Normalizer::normalize_row(index, row, tables).and_then(|sample| {
                Normalizer::check_order(index, sample.instant, previous)?;
                Ok(sample.instant)
            });
            match checked {
                Ok(instant) => previous = Some(instant),
                Err(error) => results.push(ValidationResult { index, error }),
            }
        }

        results
    }
}

fn field<T>(
    index: usize,
    object: &Map<String, Value>,
    name: &str,
    expected: &str,
    convert: fn(&Value) -> Option<T>,
) -> Result<Option<T>, ComputeError> {
    match object.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => convert(value).map(Some).ok_or_else(|| {
            ComputeError::malformed(index, format!("{} must be {}, got {}", name, expected, value))
        }),
    }
}

/// Result of row validation
#[derive(Debug)]
pub struct ValidationResult {
    pub index: usize,
    pub error: ComputeError,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_array() {
        let rows = RowAdapter::parse_array(
            r#"[{"timestamp": 1600000000, "sleep_stage": 0},
                {"timestamp": 1600000001, "sleep_stage": 2}]"#,
        )
        .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], RawStageRow::new(1_600_000_001.0, 2));
    }

    #[test]
    fn test_parse_ndjson_skips_blank_lines() {
        let ndjson = "{\"timestamp\": 1, \"sleep_stage\": 0}\n\n{\"timestamp\": 2, \"sleep_stage\": 1}\n";
        let rows = RowAdapter::parse_ndjson(ndjson).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_parse_ndjson_reports_line() {
        let ndjson = "{\"timestamp\": 1, \"sleep_stage\": 0}\nnot json\n";
        match RowAdapter::parse_ndjson(ndjson) {
            Err(ComputeError::ParseError(msg)) => assert!(msg.contains("line 2")),
            other => panic!("expected ParseError, got {:?}", other),
        }
    }

    #[test]
    fn test_wrongly_typed_field_is_malformed_at_its_row() {
        let json = r#"[{"timestamp": 1, "sleep_stage": 0},
                       {"timestamp": 2, "sleep_stage": "2"}]"#;
        match RowAdapter::parse_array(json) {
            Err(ComputeError::MalformedInput { row, reason }) => {
                assert_eq!(row, 1);
                assert!(reason.contains("sleep_stage"));
            }
            other => panic!("expected MalformedInput, got {:?}", other),
        }

        let ndjson = "{\"timestamp\": 1, \"sleep_stage\": 0}\n\n{\"timestamp\": \"late\", \"sleep_stage\": 1}\n";
        assert!(matches!(
            RowAdapter::parse_ndjson(ndjson),
            Err(ComputeError::MalformedInput { row: 1, .. })
        ));

        assert!(matches!(
            RowAdapter::parse_array("[[1, 0]]"),
            Err(ComputeError::MalformedInput { row: 0, .. })
        ));
    }

    #[test]
    fn test_null_and_absent_fields_stay_missing() {
        let rows = RowAdapter::parse_array(r#"[{"timestamp": 1.5, "sleep_stage": null}]"#).unwrap();
        assert_eq!(
            rows,
            vec![RawStageRow {
                timestamp: Some(1.5),
                sleep_stage: None,
            }]
        );
    }

    #[test]
    fn test_validate_and_normalize_agree_on_ordering() {
        let tables = StageTables::standard();
        let rows = vec![RawStageRow::new(10.0, 0), RawStageRow::new(9.0, 1)];

        let results = RowAdapter::validate_rows(&rows, &tables);
        let normalized = Normalizer::normalize(&rows, &tables);

        assert_eq!(results.len(), 1);
        match normalized {
            Err(error) => assert_eq!(results[0].error.to_string(), error.to_string()),
            Ok(_) => panic!("expected decreasing timestamps to be rejected"),
        }
    }

    #[test]
    fn test_validate_reports_every_bad_row() {
        let tables = StageTables::standard();
        let rows = vec![
            RawStageRow::new(10.0, 0),
            RawStageRow::new(11.0, 7),
            RawStageRow {
                timestamp: None,
                sleep_stage: Some(1),
            },
            RawStageRow::new(9.0, 1),
            RawStageRow::new(12.0, 4),
        ];

        let results = RowAdapter::validate_rows(&rows, &tables);

        let indices: Vec<usize> = results.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
    }

    #[test]
    fn test_validate_clean_rows() {
        let tables = StageTables::standard();
        let rows = vec![RawStageRow::new(1.0, 0), RawStageRow::new(2.0, 4)];
        assert!(RowAdapter::validate_rows(&rows, &tables).is_empty());
    }
}
