//! Synheart Hypnogram - Sleep-stage segmentation and linked hypnogram layout
//!
//! Hypnogram turns one night of per-sample sleep-stage labels into the data
//! model behind three linked chart panels through a deterministic pipeline:
//! normalization → segmentation → aggregation → first-occurrence indexing
//! → transition layout → encoding.
//!
//! ## Modules
//!
//! - **Analysis**: stage intervals, per-stage totals and first occurrences
//! - **Layout**: overview, decomposed and proportional panel geometry plus the
//!   steps that animate between them
//!
//! Drawing is left to the caller; every output is plain geometry.

pub mod aggregator;
pub mod config;
pub mod encoder;
pub mod error;
pub mod hypnogram;
pub mod indexer;
pub mod normalizer;
pub mod pipeline;
pub mod scale;
pub mod schema;
pub mod segmenter;
pub mod transition;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::{LayoutConfig, StageTables};
pub use error::ComputeError;
pub use pipeline::{analyze_night, hypnogram_layout, hypnogram_to_layout_json, NightProcessor};

// Schema exports
pub use schema::{RowAdapter, SCHEMA_VERSION};

/// Hypnogram version embedded in all layout payloads
pub const HYPNOGRAM_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for layout payloads
pub const PRODUCER_NAME: &str = "synheart-hypnogram";
