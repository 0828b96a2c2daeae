//! Error types for Stride Analytics
//!
//! The analytics stages themselves never fail; degenerate input produces `None`
//! or empty outputs. Errors only arise at the edges: decoding payloads, loading
//! configuration and validating requests handed in over FFI or the CLI.

use thiserror::Error;

/// Errors that can occur while decoding inputs or configuration
#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported payload: {0}")]
    UnsupportedPayload(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}
