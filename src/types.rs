//! Core types for the Stride Analytics pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: canonical records, normalized activities, intervals, zone
//! aggregates and renderer-ready chart structures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Payload source for provenance tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Device,
    Cloud,
    Manual,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Device => "device",
            Source::Cloud => "cloud",
            Source::Manual => "manual",
        }
    }
}

/// Sport classification (source-agnostic)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sport {
    Run,
    Walk,
    Hike,
    Ride,
    Swim,
    /// Anything the normalizer does not recognise, with the source label
    #[serde(untagged)]
    Other(String),
}

impl Sport {
    /// Map a loosely formatted source label ("Running", "TrailRun", "virtual_ride")
    pub fn from_label(label: &str) -> Self {
        let key: String = label
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();

        match key.as_str() {
            "run" | "running" | "trailrun" | "virtualrun" | "treadmill" | "trailrunning" => {
                Sport::Run
            }
            "walk" | "walking" => Sport::Walk,
            "hike" | "hiking" => Sport::Hike,
            "ride" | "cycling" | "biking" | "virtualride" | "ebikeride" | "mountainbikeride"
            | "gravelride" | "indoorcycling" => Sport::Ride,
            "swim" | "swimming" | "openwaterswim" | "lapswimming" => Sport::Swim,
            _ => Sport::Other(label.to_string()),
        }
    }

    /// Sports whose effort is judged by pace rather than speed or power
    pub fn is_pace_based(&self) -> bool {
        matches!(self, Sport::Run | Sport::Walk | Sport::Hike)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Sport::Run => "run",
            Sport::Walk => "walk",
            Sport::Hike => "hike",
            Sport::Ride => "ride",
            Sport::Swim => "swim",
            Sport::Other(name) => name.as_str(),
        }
    }
}

impl Default for Sport {
    fn default() -> Self {
        Sport::Other("unknown".to_string())
    }
}

/// One canonical sample. Optional channels stay `None` when the source did not
/// record them; they are never coerced to zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub timestamp: DateTime<Utc>,
    /// Seconds since the first record
    pub elapsed_seconds: f64,
    /// Cumulative distance, non-decreasing
    pub distance_meters: f64,
    pub speed_mps: f64,
    pub heart_rate_bpm: Option<f64>,
    pub power_watts: Option<f64>,
    pub cadence_rpm: Option<f64>,
    pub altitude_meters: Option<f64>,
}

/// Seconds per kilometre for a speed, `None` when standing still
pub fn pace_from_speed(speed_mps: f64) -> Option<f64> {
    if speed_mps.is_finite() && speed_mps > 0.0 {
        Some(1000.0 / speed_mps)
    } else {
        None
    }
}

/// Chartable metric channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Power,
    HeartRate,
    Speed,
    Pace,
    Cadence,
    Altitude,
}

impl Metric {
    pub const ALL: [Metric; 6] = [
        Metric::Power,
        Metric::HeartRate,
        Metric::Speed,
        Metric::Pace,
        Metric::Cadence,
        Metric::Altitude,
    ];

    /// Read this metric from a record
    pub fn value(&self, record: &Record) -> Option<f64> {
        match self {
            Metric::Power => record.power_watts,
            Metric::HeartRate => record.heart_rate_bpm,
            Metric::Speed => Some(record.speed_mps),
            Metric::Pace => pace_from_speed(record.speed_mps),
            Metric::Cadence => record.cadence_rpm,
            Metric::Altitude => record.altitude_meters,
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Metric::Power => "W",
            Metric::HeartRate => "bpm",
            Metric::Speed => "m/s",
            Metric::Pace => "s/km",
            Metric::Cadence => "rpm",
            Metric::Altitude => "m",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Power => "power",
            Metric::HeartRate => "heart_rate",
            Metric::Speed => "speed",
            Metric::Pace => "pace",
            Metric::Cadence => "cadence",
            Metric::Altitude => "altitude",
        }
    }

    /// Parse a CLI/FFI style name ("heart_rate", "hr", "watts")
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "power" | "watts" => Some(Metric::Power),
            "heart_rate" | "heartrate" | "hr" => Some(Metric::HeartRate),
            "speed" | "velocity" => Some(Metric::Speed),
            "pace" => Some(Metric::Pace),
            "cadence" => Some(Metric::Cadence),
            "altitude" | "elevation" => Some(Metric::Altitude),
            _ => None,
        }
    }

    /// Whether a larger value means a better effort. Pace is the exception:
    /// fewer seconds per kilometre is faster.
    pub fn higher_is_better(&self) -> bool {
        !matches!(self, Metric::Pace)
    }

    /// Trend judgment with the sign inverted for lower-is-better metrics
    pub fn is_improvement(&self, previous: f64, current: f64) -> bool {
        if self.higher_is_better() {
            current > previous
        } else {
            current < previous
        }
    }
}

/// Zone families supported by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneKind {
    Power,
    HeartRate,
    Pace,
}

impl ZoneKind {
    /// Channel the zone family buckets
    pub fn metric(&self) -> Metric {
        match self {
            ZoneKind::Power => Metric::Power,
            ZoneKind::HeartRate => Metric::HeartRate,
            ZoneKind::Pace => Metric::Pace,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "power" => Some(ZoneKind::Power),
            "heart_rate" | "heartrate" | "hr" => Some(ZoneKind::HeartRate),
            "pace" => Some(ZoneKind::Pace),
            _ => None,
        }
    }
}

/// Lap as reported by the source, in canonical units
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanonicalLap {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub elapsed_seconds: Option<f64>,
    pub distance_meters: Option<f64>,
    pub avg_power: Option<f64>,
    pub avg_heart_rate: Option<f64>,
    pub avg_speed_mps: Option<f64>,
}

/// One logged step of a manual workout (no time series)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManualStep {
    pub label: Option<String>,
    pub duration_seconds: Option<f64>,
    pub distance_meters: Option<f64>,
    pub avg_power: Option<f64>,
    pub avg_heart_rate: Option<f64>,
    pub avg_speed_mps: Option<f64>,
}

/// Flags for missing, repaired or estimated data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityFlag {
    NoTimeSeries,
    MissingHeartRate,
    MissingPower,
    MissingCadence,
    MissingAltitude,
    MissingStartTime,
    ReorderedSamples,
    DistanceRegression,
    DroppedSamples,
    DerivedTotals,
}

/// Top-level activity metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityMeta {
    pub source: Source,
    pub sport: Sport,
    pub name: Option<String>,
    pub start_time: DateTime<Utc>,
    pub total_distance_meters: f64,
    pub total_time_seconds: f64,
    pub has_time_series: bool,
}

/// Output of the Record Normalizer. Immutable once built; every derived
/// structure is recomputed from it rather than patched in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedActivity {
    pub meta: ActivityMeta,
    pub records: Vec<Record>,
    pub laps: Vec<CanonicalLap>,
    pub manual_steps: Vec<ManualStep>,
    pub quality_flags: Vec<QualityFlag>,
}

impl NormalizedActivity {
    pub fn has_time_series(&self) -> bool {
        self.meta.has_time_series && !self.records.is_empty()
    }

    pub fn has_flag(&self, flag: QualityFlag) -> bool {
        self.quality_flags.contains(&flag)
    }
}

/// How an interval was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalSource {
    Lap,
    DistanceSplit,
    WholeActivity,
    ManualStep,
}

/// A contiguous segment of the activity with its own aggregates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub index: usize,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Offset of the interval start from the activity start
    pub start_elapsed_seconds: f64,
    pub duration_seconds: f64,
    pub distance_meters: f64,
    pub avg_power: Option<f64>,
    pub avg_heart_rate: Option<f64>,
    pub avg_speed_mps: Option<f64>,
    pub is_pause: bool,
    pub source: IntervalSource,
    pub label: Option<String>,
}

impl Interval {
    pub fn avg_pace_seconds_per_km(&self) -> Option<f64> {
        self.avg_speed_mps.and_then(pace_from_speed)
    }
}

/// One of the ordered zone ranges; `max = None` is unbounded
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoneBoundary {
    pub zone_index: u8,
    pub min: f64,
    pub max: Option<f64>,
}

impl ZoneBoundary {
    pub fn new(zone_index: u8, min: f64, max: Option<f64>) -> Self {
        Self {
            zone_index,
            min,
            max,
        }
    }

    /// Inclusive on both ends
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && self.max.map_or(true, |max| value <= max)
    }
}

/// Time-in-zone result for one zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneAggregate {
    pub zone_index: u8,
    pub time_seconds: f64,
    pub avg_value: Option<f64>,
    pub sample_count: usize,
}

/// One renderer coordinate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub x: f64,
    pub y: f64,
}

/// Pixel-space series for one displayed metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub metric: Metric,
    pub unit: String,
    pub points: Vec<ChartPoint>,
}

/// One metric reading inside a tooltip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TooltipValue {
    pub metric: Metric,
    pub unit: String,
    pub raw: Option<f64>,
    pub smoothed: Option<f64>,
}

/// Data for the sample nearest a hover position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TooltipData {
    pub record_index: usize,
    /// Pixel x of the sample itself (snapped, not the pointer position)
    pub x_px: f64,
    pub timestamp: DateTime<Utc>,
    pub elapsed_seconds: f64,
    pub distance_meters: f64,
    pub values: Vec<TooltipValue>,
}
