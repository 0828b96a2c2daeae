//! Stride CLI - Command-line interface for Stride Analytics
//!
//! Commands:
//! - analyze: Run the full pipeline and print the encoded report
//! - intervals: Print segmented intervals and the main-set summary
//! - zones: Print time-in-zone for one zone family
//! - validate: Report normalization quality flags and zone boundary issues

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use stride_analytics::encoder::ReportEncoder;
use stride_analytics::pipeline::{compute, AnalyticsRequest};
use stride_analytics::segmenter::{main_set_summary, IntervalSegmenter, MainSetSummary};
use stride_analytics::types::{Interval, QualityFlag, ZoneKind};
use stride_analytics::zones::{aggregate_zones, boundaries_for, validate_boundaries, BoundaryIssue};
use stride_analytics::{
    AnalyticsConfig, AnalyticsError, Normalizer, RawActivityPayload, STRIDE_VERSION,
};

/// Stride - Activity telemetry analytics
#[derive(Parser)]
#[command(name = "stride")]
#[command(version = STRIDE_VERSION)]
#[command(about = "Turn activity recordings into intervals, zones and chart series", long_about = None)]
struct Cli {
    /// Configuration file (.toml or .json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline and print the encoded report
    Analyze {
        /// Input payload path (use - for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Request file (JSON); defaults apply when omitted
        #[arg(long)]
        request: Option<PathBuf>,

        /// Smoothing knob in [0, 1], overrides the request
        #[arg(long)]
        smoothing: Option<f64>,

        /// Zone family, overrides the request
        #[arg(long)]
        kind: Option<ZoneKindArg>,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,
    },
    /// Print segmented intervals and the main-set summary
    Intervals {
        /// Input payload path (use - for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,
    },
    /// Print time-in-zone for one zone family
    Zones {
        /// Input payload path (use - for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Zone family
        #[arg(long, default_value = "heart-rate")]
        kind: ZoneKindArg,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,
    },
    /// Report normalization quality flags and zone boundary issues
    Validate {
        /// Input payload path (use - for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,

        /// Exit with failure when any zone boundary set has issues
        #[arg(long)]
        strict: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ZoneKindArg {
    Power,
    HeartRate,
    Pace,
}

impl From<ZoneKindArg> for ZoneKind {
    fn from(kind: ZoneKindArg) -> Self {
        match kind {
            ZoneKindArg::Power => ZoneKind::Power,
            ZoneKindArg::HeartRate => ZoneKind::HeartRate,
            ZoneKindArg::Pace => ZoneKind::Pace,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Compact JSON on one line
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    init_logging();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

/// Library diagnostics go to stderr so stdout stays machine-readable
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), StrideCliError> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Analyze {
            input,
            request,
            smoothing,
            kind,
            output_format,
        } => cmd_analyze(
            &input,
            request.as_deref(),
            smoothing,
            kind,
            &output_format,
            &config,
        ),
        Commands::Intervals {
            input,
            output_format,
        } => cmd_intervals(&input, &output_format, &config),
        Commands::Zones {
            input,
            kind,
            output_format,
        } => cmd_zones(&input, kind.into(), &output_format, &config),
        Commands::Validate {
            input,
            json,
            strict,
        } => cmd_validate(&input, json, strict, &config),
    }
}

fn load_config(path: Option<&Path>) -> Result<AnalyticsConfig, StrideCliError> {
    match path {
        Some(path) => Ok(AnalyticsConfig::load(path)?),
        None => Ok(AnalyticsConfig::default()),
    }
}

fn read_input(input: &Path) -> Result<String, StrideCliError> {
    if input.to_string_lossy() == "-" {
        if atty::is(atty::Stream::Stdin) {
            return Err(StrideCliError::NoInput);
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn read_payload(input: &Path) -> Result<RawActivityPayload, StrideCliError> {
    let data = read_input(input)?;
    if data.trim().is_empty() {
        return Err(StrideCliError::NoInput);
    }
    Ok(RawActivityPayload::from_json(&data)?)
}

fn print_json<T: Serialize>(value: &T, format: &OutputFormat) -> Result<(), StrideCliError> {
    let text = match format {
        OutputFormat::Json => serde_json::to_string(value)?,
        OutputFormat::JsonPretty => serde_json::to_string_pretty(value)?,
    };
    println!("{}", text);
    Ok(())
}

fn cmd_analyze(
    input: &Path,
    request: Option<&Path>,
    smoothing: Option<f64>,
    kind: Option<ZoneKindArg>,
    output_format: &OutputFormat,
    config: &AnalyticsConfig,
) -> Result<(), StrideCliError> {
    let payload = read_payload(input)?;

    let mut request = match request {
        Some(path) => AnalyticsRequest::from_json(&fs::read_to_string(path)?)?,
        None => AnalyticsRequest::default(),
    };
    if let Some(knob) = smoothing {
        request.smoothing_knob = knob;
    }
    if let Some(kind) = kind {
        request.zone_kind = kind.into();
    }
    request.validate()?;

    let activity = Normalizer::normalize(&payload);
    let result = compute(&request, &activity, config);
    let report = ReportEncoder::new().encode(&result);

    print_json(&report, output_format)
}

#[derive(Serialize)]
struct IntervalsOutput {
    intervals: Vec<Interval>,
    main_set: MainSetSummary,
}

fn cmd_intervals(
    input: &Path,
    output_format: &OutputFormat,
    config: &AnalyticsConfig,
) -> Result<(), StrideCliError> {
    let activity = Normalizer::normalize(&read_payload(input)?);
    let intervals = IntervalSegmenter::segment(&activity, &config.segmentation);
    let main_set = main_set_summary(&intervals);

    print_json(
        &IntervalsOutput {
            intervals,
            main_set,
        },
        output_format,
    )
}

fn cmd_zones(
    input: &Path,
    kind: ZoneKind,
    output_format: &OutputFormat,
    config: &AnalyticsConfig,
) -> Result<(), StrideCliError> {
    let activity = Normalizer::normalize(&read_payload(input)?);
    let boundaries = boundaries_for(kind, &activity.meta.sport, &config.zones);
    let summary = aggregate_zones(&activity.records, kind, &boundaries);

    print_json(&summary, output_format)
}

#[derive(Serialize)]
struct ValidationReport {
    source: String,
    sport: String,
    record_count: usize,
    has_time_series: bool,
    quality_flags: Vec<QualityFlag>,
    boundary_checks: Vec<BoundaryCheck>,
}

#[derive(Serialize)]
struct BoundaryCheck {
    kind: ZoneKind,
    issues: Vec<BoundaryIssue>,
}

fn cmd_validate(
    input: &Path,
    json: bool,
    strict: bool,
    config: &AnalyticsConfig,
) -> Result<(), StrideCliError> {
    let payload = read_payload(input)?;
    let activity = Normalizer::normalize(&payload);

    let boundary_checks: Vec<BoundaryCheck> = [ZoneKind::Power, ZoneKind::HeartRate, ZoneKind::Pace]
        .into_iter()
        .map(|kind| BoundaryCheck {
            kind,
            issues: validate_boundaries(&boundaries_for(kind, &activity.meta.sport, &config.zones)),
        })
        .collect();

    let report = ValidationReport {
        source: activity.meta.source.as_str().to_string(),
        sport: activity.meta.sport.as_str().to_string(),
        record_count: activity.records.len(),
        has_time_series: activity.has_time_series(),
        quality_flags: activity.quality_flags.clone(),
        boundary_checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Source:      {}", report.source);
        println!("Sport:       {}", report.sport);
        println!("Records:     {}", report.record_count);
        println!("Time series: {}", report.has_time_series);

        if !report.quality_flags.is_empty() {
            println!("\nQuality flags:");
            for flag in &report.quality_flags {
                println!("  - {}", serde_json::to_string(flag)?.trim_matches('"'));
            }
        }

        for check in &report.boundary_checks {
            if check.issues.is_empty() {
                continue;
            }
            println!("\n{:?} zone boundaries:", check.kind);
            for issue in &check.issues {
                println!("  - {}", issue);
            }
        }
    }

    let issue_count: usize = report.boundary_checks.iter().map(|c| c.issues.len()).sum();
    if strict && issue_count > 0 {
        Err(StrideCliError::BoundaryIssues(issue_count))
    } else {
        Ok(())
    }
}

#[derive(Debug)]
enum StrideCliError {
    Io(io::Error),
    Analytics(AnalyticsError),
    Json(serde_json::Error),
    NoInput,
    BoundaryIssues(usize),
}

impl From<io::Error> for StrideCliError {
    fn from(e: io::Error) -> Self {
        StrideCliError::Io(e)
    }
}

impl From<AnalyticsError> for StrideCliError {
    fn from(e: AnalyticsError) -> Self {
        StrideCliError::Analytics(e)
    }
}

impl From<serde_json::Error> for StrideCliError {
    fn from(e: serde_json::Error) -> Self {
        StrideCliError::Json(e)
    }
}

#[derive(Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<StrideCliError> for CliError {
    fn from(e: StrideCliError) -> Self {
        match e {
            StrideCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            StrideCliError::Analytics(e @ AnalyticsError::InvalidConfig(_))
            | StrideCliError::Analytics(e @ AnalyticsError::Toml(_)) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check the file passed to --config".to_string()),
            },
            StrideCliError::Analytics(e @ AnalyticsError::InvalidRequest(_)) => CliError {
                code: "REQUEST_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("The smoothing knob must be finite and the layout positive".to_string()),
            },
            StrideCliError::Analytics(e) => CliError {
                code: "PAYLOAD_ERROR".to_string(),
                message: e.to_string(),
                hint: Some(
                    "Ensure the payload is a JSON object tagged with kind device, cloud or manual"
                        .to_string(),
                ),
            },
            StrideCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            StrideCliError::NoInput => CliError {
                code: "NO_INPUT".to_string(),
                message: "No payload provided".to_string(),
                hint: Some("Pass --input <file> or pipe a payload on stdin".to_string()),
            },
            StrideCliError::BoundaryIssues(count) => CliError {
                code: "BOUNDARY_ISSUES".to_string(),
                message: format!("{} zone boundary issues found", count),
                hint: Some("Fix the zone profiles in your configuration".to_string()),
            },
        }
    }
}
