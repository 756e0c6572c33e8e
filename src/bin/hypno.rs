//! Hypno CLI - Command-line interface for Synheart Hypnogram
//!
//! Commands:
//! - layout: Lay out a night of stage rows as linked panel geometry
//! - summary: Print stage intervals and per-stage totals
//! - validate: Validate stage rows
//! - schema: Describe the input and output schemas

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use synheart_hypnogram::encoder::{LayoutEncoder, LAYOUT_VERSION};
use synheart_hypnogram::types::RawStageRow;
use synheart_hypnogram::{
    analyze_night, hypnogram_layout, ComputeError, LayoutConfig, RowAdapter, HYPNOGRAM_VERSION,
    SCHEMA_VERSION,
};

/// Hypno - Sleep-stage segmentation and linked hypnogram layout
#[derive(Parser)]
#[command(name = "hypno")]
#[command(author = "Synheart AI Inc")]
#[command(version = HYPNOGRAM_VERSION)]
#[command(about = "Turn sleep-stage rows into hypnogram panel layouts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lay out a night of stage rows
    Layout {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "json")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "json")]
        output_format: OutputFormat,

        /// Layout configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Panel width in pixels (overrides config)
        #[arg(long)]
        width: Option<f64>,

        /// Chart height in pixels (overrides config)
        #[arg(long)]
        height: Option<f64>,

        /// Lay out the overview panel only
        #[arg(long)]
        no_transitions: bool,
    },

    /// Print stage intervals and per-stage totals
    Summary {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "json")]
        input_format: InputFormat,

        /// Layout configuration file (JSON), for custom stage tables
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate stage rows
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "json")]
        input_format: InputFormat,

        /// Layout configuration file (JSON), for custom stage tables
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print schema information
    Schema {
        /// Schema to print (input or output)
        #[arg(value_enum)]
        schema_type: SchemaType,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// JSON array of rows
    Json,
    /// Newline-delimited JSON (one row per line)
    Ndjson,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, ValueEnum)]
enum SchemaType {
    /// Input rows (hypnogram.row.v1)
    Input,
    /// Output payload (hypnogram.layout.v1)
    Output,
}

fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

/// Log to stderr so stdout stays machine-readable; `HYPNO_LOG` sets the filter
fn init_tracing() {
    let filter = EnvFilter::try_from_env("HYPNO_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), HypnoCliError> {
    match cli.command {
        Commands::Layout {
            input,
            output,
            input_format,
            output_format,
            config,
            width,
            height,
            no_transitions,
        } => {
            let mut layout_config = load_config(config.as_deref())?;
            if let Some(width) = width {
                layout_config.width = width;
            }
            if let Some(height) = height {
                layout_config.height = height;
            }
            if no_transitions {
                layout_config.use_transitions = false;
            }
            layout_config.validate()?;

            cmd_layout(&input, &output, input_format, output_format, &layout_config)
        }

        Commands::Summary {
            input,
            input_format,
            config,
            json,
        } => cmd_summary(&input, input_format, &load_config(config.as_deref())?, json),

        Commands::Validate {
            input,
            input_format,
            config,
            json,
        } => cmd_validate(&input, input_format, &load_config(config.as_deref())?, json),

        Commands::Schema { schema_type } => cmd_schema(schema_type),
    }
}

fn cmd_layout(
    input: &Path,
    output: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
    config: &LayoutConfig,
) -> Result<(), HypnoCliError> {
    let rows = read_rows(input, input_format)?;
    let layout = hypnogram_layout(&rows, config)?;

    let encoder = LayoutEncoder::new();
    let output_data = match output_format {
        OutputFormat::Json => encoder.encode_to_json(&layout)?,
        OutputFormat::JsonPretty => encoder.encode_to_json_pretty(&layout)?,
    };

    if output.to_string_lossy() == "-" {
        println!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
        info!(path = %output.display(), "wrote layout");
    }

    Ok(())
}

fn cmd_summary(
    input: &Path,
    input_format: InputFormat,
    config: &LayoutConfig,
    json: bool,
) -> Result<(), HypnoCliError> {
    let rows = read_rows(input, input_format)?;
    let analysis = analyze_night(&rows, &config.stages)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
        return Ok(());
    }

    println!("Night Summary");
    println!("=============");
    println!("Samples:   {}", analysis.totals.total_samples);
    println!("Intervals: {}", analysis.intervals.len());

    println!("\nStages:");
    for (rank, label) in config.stages.display_order().iter().enumerate() {
        let first = analysis
            .first_occurrence
            .get(rank)
            .map(|i| format!("first at interval {}", i))
            .unwrap_or_else(|| "not present".to_string());
        println!(
            "  {:<4} {:>6.2}%  ({} samples, {})",
            label,
            analysis.totals.fraction(rank) * 100.0,
            analysis.totals.count(rank),
            first
        );
    }

    println!("\nIntervals:");
    for (i, interval) in analysis.intervals.iter().enumerate() {
        println!(
            "  {:>4}  {:<4} {} -> {}  {:>6.2}%",
            i,
            interval.stage_label,
            interval.start_instant.format("%H:%M:%S"),
            interval.end_instant.format("%H:%M:%S"),
            interval.portion_of_night
        );
    }

    Ok(())
}

fn cmd_validate(
    input: &Path,
    input_format: InputFormat,
    config: &LayoutConfig,
    json: bool,
) -> Result<(), HypnoCliError> {
    let rows = read_rows(input, input_format)?;
    let results = RowAdapter::validate_rows(&rows, &config.stages);

    let report = ValidationReport {
        total_rows: rows.len(),
        valid_rows: rows.len() - results.len(),
        invalid_rows: results.len(),
        errors: results
            .iter()
            .map(|r| ValidationErrorDetail {
                index: r.index,
                error: r.error.to_string(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total rows:   {}", report.total_rows);
        println!("Valid rows:   {}", report.valid_rows);
        println!("Invalid rows: {}", report.invalid_rows);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!("  - Row {}: {}", err.index, err.error);
            }
        }
    }

    if report.invalid_rows > 0 {
        Err(HypnoCliError::ValidationFailed(report.invalid_rows))
    } else {
        Ok(())
    }
}

fn cmd_schema(schema_type: SchemaType) -> Result<(), HypnoCliError> {
    match schema_type {
        SchemaType::Input => {
            println!("Input Schema: {}", SCHEMA_VERSION);
            println!();
            println!("One row per sample, in time order, as a JSON array or NDJSON:");
            println!();
            println!("- timestamp: epoch seconds (UTC, fractional allowed)");
            println!("- sleep_stage: stage code, an index into the stage table");
            println!();
            println!("Default stage table: W=0, N1=1, N2=2, N3=3, REM=4");
            println!("Default display order: W, REM, N1, N2, N3");
        }
        SchemaType::Output => {
            println!("Output Schema: {}", LAYOUT_VERSION);
            println!();
            println!("- producer: {{ name, version, instance_id }}");
            println!("- intervals: stage runs {{ stage_label, display_rank, portion_of_night, start_instant, end_instant, ... }}");
            println!("- totals: {{ fractions, counts, total_samples }} by display rank");
            println!("- first_occurrence: first interval per display rank (-1 if absent)");
            println!("- plan: panel geometry keyed by interval index");
            println!("  - overview, decomposed, proportional: {{ kind, budget, segments }}");
            println!("  - blocks: proportional stage blocks with their anchor and source rect");
            println!("  - steps: ordered transitions {{ from, to, delay_ms, duration_ms }}");
            println!("- hypnogram: step-after path points");
        }
    }
    Ok(())
}

// Helper functions

fn load_config(path: Option<&Path>) -> Result<LayoutConfig, HypnoCliError> {
    match path {
        Some(path) => {
            debug!(path = %path.display(), "loading layout config");
            Ok(LayoutConfig::from_json(&fs::read_to_string(path)?)?)
        }
        None => Ok(LayoutConfig::default()),
    }
}

fn read_rows(input: &Path, format: InputFormat) -> Result<Vec<RawStageRow>, HypnoCliError> {
    let input_data = if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(input)?
    };

    let rows = match format {
        InputFormat::Json => RowAdapter::parse_array(&input_data)?,
        InputFormat::Ndjson => RowAdapter::parse_ndjson(&input_data)?,
    };

    if rows.is_empty() {
        return Err(HypnoCliError::NoRows);
    }

    debug!(rows = rows.len(), "read stage rows");
    Ok(rows)
}

// Error types

#[derive(Debug)]
enum HypnoCliError {
    Io(io::Error),
    Compute(ComputeError),
    Json(serde_json::Error),
    NoRows,
    ValidationFailed(usize),
}

impl From<io::Error> for HypnoCliError {
    fn from(e: io::Error) -> Self {
        HypnoCliError::Io(e)
    }
}

impl From<ComputeError> for HypnoCliError {
    fn from(e: ComputeError) -> Self {
        HypnoCliError::Compute(e)
    }
}

impl From<serde_json::Error> for HypnoCliError {
    fn from(e: serde_json::Error) -> Self {
        HypnoCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<HypnoCliError> for CliError {
    fn from(e: HypnoCliError) -> Self {
        match e {
            HypnoCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            HypnoCliError::Compute(e) => {
                let (code, hint) = match &e {
                    ComputeError::MalformedInput { .. } => {
                        ("MALFORMED_INPUT", "Run 'hypno validate' for details")
                    }
                    ComputeError::EmptyInput => ("EMPTY_INPUT", "Ensure input contains rows"),
                    ComputeError::DivisionDegenerate { .. } => {
                        ("DEGENERATE_SERIES", "At least two samples are required")
                    }
                    ComputeError::InconsistentStageData { .. } => {
                        ("INCONSISTENT_STAGE_DATA", "Check stage tables against the input")
                    }
                    ComputeError::InvalidConfig(_) => ("INVALID_CONFIG", "Check the layout config"),
                    ComputeError::ParseError(_) | ComputeError::JsonError(_) => {
                        ("PARSE_ERROR", "Check input format")
                    }
                    ComputeError::EncodingError(_) => ("ENCODING_ERROR", "Report this as a bug"),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            HypnoCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            HypnoCliError::NoRows => CliError {
                code: "NO_ROWS".to_string(),
                message: "No rows found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            HypnoCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} rows failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_rows: usize,
    valid_rows: usize,
    invalid_rows: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    error: String,
}
