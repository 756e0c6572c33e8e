//! Loader row schema
//!
//! Rows arrive already parsed by the loader collaborator, as a JSON array or
//! newline-delimited JSON, each shaped `{ "timestamp": <epoch seconds>,
//! "sleep_stage": <stage code> }`.

mod adapter;

pub use adapter::*;

/// Current input schema version
pub const SCHEMA_VERSION: &str = "hypnogram.row.v1";
