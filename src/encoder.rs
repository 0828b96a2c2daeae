//! Report encoding
//!
//! Wraps an [`AnalyticsResult`] into a self-describing JSON report with
//! producer and provenance metadata, ready to hand to a renderer or to store
//! alongside the activity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AnalyticsError;
use crate::pipeline::AnalyticsResult;
use crate::types::{QualityFlag, Source, Sport};
use crate::{PRODUCER_NAME, STRIDE_VERSION};

/// Current report schema version
pub const REPORT_VERSION: &str = "1.0.0";

/// Optional channels counted for coverage
const OPTIONAL_CHANNELS: [QualityFlag; 4] = [
    QualityFlag::MissingHeartRate,
    QualityFlag::MissingPower,
    QualityFlag::MissingCadence,
    QualityFlag::MissingAltitude,
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportProvenance {
    pub source: Source,
    pub sport: Sport,
    pub activity_start_utc: String,
    pub computed_at_utc: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportQuality {
    /// Share of optional channels (heart rate, power, cadence, altitude) present
    pub channel_coverage: f64,
    pub has_time_series: bool,
    pub flags: Vec<QualityFlag>,
}

/// Encoded analytics report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsReport {
    pub report_version: String,
    pub producer: ReportProducer,
    pub provenance: ReportProvenance,
    pub quality: ReportQuality,
    pub result: AnalyticsResult,
}

/// Report encoder carrying a per-instance producer id
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
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

    pub fn encode(&self, result: &AnalyticsResult) -> AnalyticsReport {
        self.encode_at(result, Utc::now())
    }

    fn encode_at(&self, result: &AnalyticsResult, computed_at: DateTime<Utc>) -> AnalyticsReport {
        let meta = &result.meta;

        let channel_coverage = if meta.has_time_series {
            let present = OPTIONAL_CHANNELS
                .iter()
                .filter(|flag| !result.quality_flags.contains(*flag))
                .count();
            present as f64 / OPTIONAL_CHANNELS.len() as f64
        } else {
            0.0
        };

        AnalyticsReport {
            report_version: REPORT_VERSION.to_string(),
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: STRIDE_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            provenance: ReportProvenance {
                source: meta.source,
                sport: meta.sport.clone(),
                activity_start_utc: meta.start_time.to_rfc3339(),
                computed_at_utc: computed_at.to_rfc3339(),
            },
            quality: ReportQuality {
                channel_coverage,
                has_time_series: meta.has_time_series,
                flags: result.quality_flags.clone(),
            },
            result: result.clone(),
        }
    }

    /// Encode to a pretty-printed JSON string
    pub fn encode_to_json(&self, result: &AnalyticsResult) -> Result<String, AnalyticsError> {
        let report = self.encode(result);
        Ok(serde_json::to_string_pretty(&report)?)
    }
}
