//! Analytics configuration
//!
//! Every section carries `#[serde(default)]`, so a partial file only overrides
//! the values it names. Files are read as TOML or JSON depending on extension.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AnalyticsError;
use crate::scaler::YBaseline;
use crate::types::{Metric, Sport, ZoneBoundary, ZoneKind};

/// Top-level configuration for every analytics stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub segmentation: SegmentationConfig,
    pub zoom: ZoomConfig,
    pub zones: ZoneConfig,
    pub chart: ChartConfig,
}

/// Interval segmentation thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Synthesized split length for pace-based sports
    pub split_distance_meters: f64,
    /// Trailing partial splits shorter than this are discarded
    pub min_partial_split_meters: f64,
    /// Average speed at or below this marks a pause
    pub pause_speed_mps: f64,
    /// Pace above this marks a pause for pace-based sports (20:00 /km)
    pub pause_pace_seconds_per_km: f64,
    /// Display grouping tolerance as a fraction of the metric range
    pub group_tolerance_fraction: f64,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            split_distance_meters: 1000.0,
            min_partial_split_meters: 500.0,
            pause_speed_mps: 0.1,
            pause_pace_seconds_per_km: 1200.0,
            group_tolerance_fraction: 0.05,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomConfig {
    /// Drags narrower than this fraction of the chart width are ignored
    pub min_drag_fraction: f64,
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            min_drag_fraction: 0.05,
        }
    }
}

/// Athlete thresholds and explicit boundary profiles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneConfig {
    pub ftp_watts: f64,
    pub max_heart_rate_bpm: f64,
    pub threshold_pace_seconds_per_km: f64,
    pub profiles: Vec<ZoneProfile>,
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            ftp_watts: 250.0,
            max_heart_rate_bpm: 190.0,
            threshold_pace_seconds_per_km: 300.0,
            profiles: Vec::new(),
        }
    }
}

impl ZoneConfig {
    /// Explicit profile for a zone kind: exact sport match first, then a
    /// sport-agnostic profile. `None` means the built-in default applies.
    pub fn profile_for(&self, kind: ZoneKind, sport: &Sport) -> Option<&ZoneProfile> {
        let for_kind = || self.profiles.iter().filter(move |p| p.kind == kind);

        for_kind()
            .find(|p| {
                p.sport
                    .as_deref()
                    .is_some_and(|label| Sport::from_label(label) == *sport)
            })
            .or_else(|| for_kind().find(|p| p.sport.is_none()))
    }
}

/// Boundary set supplied by the athlete profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneProfile {
    pub kind: ZoneKind,
    /// Sport label; absent applies to every sport
    #[serde(default)]
    pub sport: Option<String>,
    pub boundaries: Vec<ZoneBoundary>,
}

/// Per-metric chart overrides
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    pub y_baselines: BTreeMap<Metric, YBaseline>,
}

impl ChartConfig {
    pub fn baseline_for(&self, metric: Metric) -> YBaseline {
        self.y_baselines
            .get(&metric)
            .copied()
            .unwrap_or_else(|| YBaseline::default_for(metric))
    }
}

impl AnalyticsConfig {
    pub fn from_toml_str(toml_str: &str) -> Result<Self, AnalyticsError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(json: &str) -> Result<Self, AnalyticsError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a `.toml` or `.json` configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AnalyticsError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_str(&contents),
            Some("json") => Self::from_json_str(&contents),
            _ => Err(AnalyticsError::InvalidConfig(format!(
                "unsupported config extension: {}",
                path.display()
            ))),
        }
    }

    /// Reject values that would make a stage meaningless
    pub fn validate(&self) -> Result<(), AnalyticsError> {
        let seg = &self.segmentation;
        if !(seg.split_distance_meters.is_finite() && seg.split_distance_meters > 0.0) {
            return Err(AnalyticsError::InvalidConfig(
                "segmentation.split_distance_meters must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&seg.group_tolerance_fraction) {
            return Err(AnalyticsError::InvalidConfig(
                "segmentation.group_tolerance_fraction must be within [0, 1]".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.zoom.min_drag_fraction) {
            return Err(AnalyticsError::InvalidConfig(
                "zoom.min_drag_fraction must be within [0, 1)".to_string(),
            ));
        }

        for profile in &self.zones.profiles {
            if profile.boundaries.is_empty() {
                return Err(AnalyticsError::InvalidConfig(format!(
                    "zone profile {:?} has no boundaries",
                    profile.kind
                )));
            }
        }

        for (metric, baseline) in &self.chart.y_baselines {
            if let YBaseline::FractionOfMax { fraction } = baseline {
                if !(0.0..1.0).contains(fraction) {
                    return Err(AnalyticsError::InvalidConfig(format!(
                        "chart.y_baselines.{}: fraction must be within [0, 1)",
                        metric.as_str()
                    )));
                }
            }
        }

        Ok(())
    }
}
