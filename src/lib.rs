//! Stride Analytics - Activity telemetry analytics for charting and review
//!
//! Stride turns raw activity recordings into the analytics a workout review
//! screen needs through a deterministic pipeline: source adaptation →
//! normalization → interval segmentation → zone aggregation → smoothing →
//! chart scaling.
//!
//! ## Modules
//!
//! - **Normalization**: Device recordings, cloud exports and manual logs into one record series
//! - **Analytics**: Intervals, zone time, smoothed channels and pixel-space chart series
//! - **Processor**: Memoized recomputation as the smoothing knob, zoom and hover change

pub mod adapters;
pub mod config;
pub mod encoder;
pub mod error;
pub mod normalizer;
pub mod pipeline;
pub mod scaler;
pub mod schema;
pub mod segmenter;
pub mod smoothing;
pub mod types;
pub mod zones;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::AnalyticsConfig;
pub use encoder::{AnalyticsReport, ReportEncoder};
pub use error::AnalyticsError;
pub use normalizer::Normalizer;
pub use pipeline::{
    analyze, analyze_json, compute, AnalyticsProcessor, AnalyticsRequest, AnalyticsResult,
    SnapshotReader,
};
pub use schema::RawActivityPayload;

/// Stride version embedded in all reports
pub const STRIDE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "stride-analytics";
