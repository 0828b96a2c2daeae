//! Source-tagged activity payloads
//!
//! `RawActivityPayload` is a tagged union keyed by `kind`:
//! - `device`: a head-unit recording with a sample array and native laps
//! - `cloud`: a cloud export with a detail object and per-metric parallel streams
//! - `manual`: a typed workout log with discrete steps and no time series

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::lenient;
use crate::error::AnalyticsError;
use crate::types::Source;

/// Timestamp as sent by a source: RFC 3339 text or epoch seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeValue {
    Seconds(f64),
    Text(String),
}

impl TimeValue {
    /// Resolve to UTC, `None` when the value cannot be interpreted
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            TimeValue::Seconds(secs) if secs.is_finite() => {
                Utc.timestamp_millis_opt((secs * 1000.0).round() as i64).single()
            }
            TimeValue::Seconds(_) => None,
            TimeValue::Text(text) => {
                let text = text.trim();
                DateTime::parse_from_rfc3339(text)
                    .map(|dt| dt.with_timezone(&Utc))
                    .ok()
                    .or_else(|| {
                        // Zone-less local stamps are treated as UTC
                        NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
                            .ok()
                            .map(|naive| Utc.from_utc_datetime(&naive))
                    })
            }
        }
    }
}

impl From<DateTime<Utc>> for TimeValue {
    fn from(value: DateTime<Utc>) -> Self {
        TimeValue::Text(value.to_rfc3339())
    }
}

/// The tagged input accepted by the normalizer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RawActivityPayload {
    Device(DevicePayload),
    Cloud(CloudPayload),
    Manual(ManualPayload),
}

const KNOWN_KINDS: [&str; 3] = ["device", "cloud", "manual"];

impl RawActivityPayload {
    /// Parse a payload from JSON text
    pub fn from_json(json: &str) -> Result<Self, AnalyticsError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Parse a payload from an already decoded JSON value
    pub fn from_value(value: serde_json::Value) -> Result<Self, AnalyticsError> {
        let kind = value
            .get("kind")
            .and_then(|k| k.as_str())
            .ok_or_else(|| AnalyticsError::UnsupportedPayload("missing `kind` tag".to_string()))?;

        if !KNOWN_KINDS.contains(&kind) {
            return Err(AnalyticsError::UnsupportedPayload(format!(
                "unknown kind `{kind}`"
            )));
        }

        Ok(serde_json::from_value(value)?)
    }

    pub fn source(&self) -> Source {
        match self {
            RawActivityPayload::Device(_) => Source::Device,
            RawActivityPayload::Cloud(_) => Source::Cloud,
            RawActivityPayload::Manual(_) => Source::Manual,
        }
    }
}

// Device recordings

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DevicePayload {
    #[serde(default, deserialize_with = "lenient::option_string")]
    pub sport: Option<String>,
    #[serde(default, deserialize_with = "lenient::option_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::option_time")]
    pub start_time: Option<TimeValue>,
    /// Session total distance (m)
    #[serde(default, deserialize_with = "lenient::option_f64")]
    pub total_distance: Option<f64>,
    /// Session timer time excluding auto-pause (s)
    #[serde(default, deserialize_with = "lenient::option_f64")]
    pub total_timer_time: Option<f64>,
    #[serde(default, deserialize_with = "lenient::samples")]
    pub records: Vec<DeviceSample>,
    #[serde(default, deserialize_with = "lenient::entries")]
    pub laps: Vec<DeviceLap>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceSample {
    #[serde(default, deserialize_with = "lenient::option_time")]
    pub timestamp: Option<TimeValue>,
    /// Seconds since the session start, used when `timestamp` is absent
    #[serde(default, deserialize_with = "lenient::option_f64")]
    pub elapsed_time: Option<f64>,
    #[serde(default, deserialize_with = "lenient::option_f64")]
    pub distance: Option<f64>,
    #[serde(default, deserialize_with = "lenient::option_f64")]
    pub speed: Option<f64>,
    #[serde(default, deserialize_with = "lenient::option_f64")]
    pub enhanced_speed: Option<f64>,
    #[serde(default, deserialize_with = "lenient::option_f64")]
    pub heart_rate: Option<f64>,
    #[serde(default, deserialize_with = "lenient::option_f64")]
    pub power: Option<f64>,
    #[serde(default, deserialize_with = "lenient::option_f64")]
    pub cadence: Option<f64>,
    #[serde(default, deserialize_with = "lenient::option_f64")]
    pub altitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient::option_f64")]
    pub enhanced_altitude: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceLap {
    #[serde(default, deserialize_with = "lenient::option_time")]
    pub start_time: Option<TimeValue>,
    /// Lap end (the device stamps laps when they close)
    #[serde(default, deserialize_with = "lenient::option_time")]
    pub timestamp: Option<TimeValue>,
    #[serde(default, deserialize_with = "lenient::option_f64")]
    pub total_elapsed_time: Option<f64>,
    #[serde(default, deserialize_with = "lenient::option_f64")]
    pub total_distance: Option<f64>,
    #[serde(default, deserialize_with = "lenient::option_f64")]
    pub avg_power: Option<f64>,
    #[serde(default, deserialize_with = "lenient::option_f64")]
    pub avg_heart_rate: Option<f64>,
    #[serde(default, deserialize_with = "lenient::option_f64")]
    pub avg_speed: Option<f64>,
    #[serde(default, deserialize_with = "lenient::option_f64")]
    pub enhanced_avg_speed: Option<f64>,
}

// Cloud exports

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CloudPayload {
    #[serde(default, deserialize_with = "lenient::object")]
    pub detail: CloudDetail,
    #[serde(default, deserialize_with = "lenient::object")]
    pub streams: CloudStreams,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CloudDetail {
    #[serde(default, deserialize_with = "lenient::option_string")]
    pub sport_type: Option<String>,
    /// Legacy activity type, used when `sport_type` is absent
    #[serde(default, rename = "type", deserialize_with = "lenient::option_string")]
    pub activity_type: Option<String>,
    #[serde(default, deserialize_with = "lenient::option_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::option_time")]
    pub start_date: Option<TimeValue>,
    #[serde(default, deserialize_with = "lenient::option_f64")]
    pub distance: Option<f64>,
    #[serde(default, deserialize_with = "lenient::option_f64")]
    pub moving_time: Option<f64>,
    #[serde(default, deserialize_with = "lenient::option_f64")]
    pub elapsed_time: Option<f64>,
    #[serde(default, deserialize_with = "lenient::entries")]
    pub laps: Vec<CloudLap>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CloudLap {
    #[serde(default, deserialize_with = "lenient::option_index")]
    pub start_index: Option<usize>,
    #[serde(default, deserialize_with = "lenient::option_index")]
    pub end_index: Option<usize>,
    #[serde(default, deserialize_with = "lenient::option_time")]
    pub start_date: Option<TimeValue>,
    #[serde(default, deserialize_with = "lenient::option_f64")]
    pub elapsed_time: Option<f64>,
    #[serde(default, deserialize_with = "lenient::option_f64")]
    pub distance: Option<f64>,
    #[serde(default, deserialize_with = "lenient::option_f64")]
    pub average_watts: Option<f64>,
    #[serde(default, deserialize_with = "lenient::option_f64")]
    pub average_heartrate: Option<f64>,
    #[serde(default, deserialize_with = "lenient::option_f64")]
    pub average_speed: Option<f64>,
}

/// Parallel per-metric arrays. `time` (seconds from `start_date`) drives the
/// sample count.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CloudStreams {
    #[serde(default, deserialize_with = "lenient::stream")]
    pub time: Vec<Option<f64>>,
    #[serde(default, deserialize_with = "lenient::stream")]
    pub distance: Vec<Option<f64>>,
    #[serde(default, deserialize_with = "lenient::stream")]
    pub velocity_smooth: Vec<Option<f64>>,
    #[serde(default, deserialize_with = "lenient::stream")]
    pub heartrate: Vec<Option<f64>>,
    #[serde(default, deserialize_with = "lenient::stream")]
    pub watts: Vec<Option<f64>>,
    #[serde(default, deserialize_with = "lenient::stream")]
    pub cadence: Vec<Option<f64>>,
    #[serde(default, deserialize_with = "lenient::stream")]
    pub altitude: Vec<Option<f64>>,
}

// Manual logs

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManualPayload {
    #[serde(default, deserialize_with = "lenient::option_string")]
    pub sport: Option<String>,
    #[serde(default, deserialize_with = "lenient::option_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::option_time")]
    pub start_time: Option<TimeValue>,
    #[serde(default, deserialize_with = "lenient::entries")]
    pub results: Vec<ManualResult>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManualResult {
    #[serde(default, alias = "label", deserialize_with = "lenient::option_string")]
    pub name: Option<String>,
    #[serde(default, alias = "duration", deserialize_with = "lenient::option_f64")]
    pub duration_seconds: Option<f64>,
    #[serde(default, alias = "distance", deserialize_with = "lenient::option_f64")]
    pub distance_meters: Option<f64>,
    #[serde(default, deserialize_with = "lenient::option_f64")]
    pub avg_power: Option<f64>,
    #[serde(default, deserialize_with = "lenient::option_f64")]
    pub avg_heart_rate: Option<f64>,
    #[serde(default, deserialize_with = "lenient::option_f64")]
    pub avg_speed: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_device_payload() {
        let json = r#"{
            "kind": "device",
            "sport": "running",
            "start_time": "2024-03-02T07:00:00Z",
            "records": [
                {"timestamp": "2024-03-02T07:00:00Z", "distance": 0, "speed": 0, "heart_rate": 92},
                {"timestamp": 1709362801, "distance": "3.1", "enhanced_speed": 3.1}
            ],
            "laps": [{"start_time": "2024-03-02T07:00:00Z", "total_distance": 1000}]
        }"#;

        let payload = RawActivityPayload::from_json(json).unwrap();
        assert_eq!(payload.source(), Source::Device);

        let RawActivityPayload::Device(device) = payload else {
            panic!("expected device payload");
        };
        assert_eq!(device.records.len(), 2);
        assert_eq!(device.records[1].distance, Some(3.1));
        assert_eq!(device.records[1].enhanced_speed, Some(3.1));
        assert_eq!(device.records[1].heart_rate, None);
        assert_eq!(device.laps[0].total_distance, Some(1000.0));
    }

    #[test]
    fn test_parse_cloud_payload_with_keyed_streams() {
        let json = r#"{
            "kind": "cloud",
            "detail": {"type": "Ride", "start_date": "2024-03-02T07:00:00Z", "distance": 20000},
            "streams": {
                "time": {"data": [0, 1, 2]},
                "watts": [200, null, 210]
            }
        }"#;

        let RawActivityPayload::Cloud(cloud) = RawActivityPayload::from_json(json).unwrap() else {
            panic!("expected cloud payload");
        };
        assert_eq!(cloud.detail.activity_type.as_deref(), Some("Ride"));
        assert_eq!(cloud.streams.time.len(), 3);
        assert_eq!(cloud.streams.watts, vec![Some(200.0), None, Some(210.0)]);
        assert!(cloud.streams.heartrate.is_empty());
    }

    #[test]
    fn test_parse_manual_payload_aliases() {
        let json = r#"{
            "kind": "manual",
            "results": [{"label": "Warmup", "duration": 600}, {"name": "Main", "distance": 5000}]
        }"#;

        let RawActivityPayload::Manual(manual) = RawActivityPayload::from_json(json).unwrap()
        else {
            panic!("expected manual payload");
        };
        assert_eq!(manual.results.len(), 2);
        assert_eq!(manual.results[0].name.as_deref(), Some("Warmup"));
        assert_eq!(manual.results[0].duration_seconds, Some(600.0));
        assert_eq!(manual.results[1].distance_meters, Some(5000.0));
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let result = RawActivityPayload::from_json(r#"{"kind": "fax"}"#);
        assert!(matches!(result, Err(AnalyticsError::UnsupportedPayload(_))));

        let result = RawActivityPayload::from_json(r#"{"records": []}"#);
        assert!(matches!(result, Err(AnalyticsError::UnsupportedPayload(_))));

        let result = RawActivityPayload::from_json("not json");
        assert!(matches!(result, Err(AnalyticsError::Json(_))));
    }

    #[test]
    fn test_fields_of_the_wrong_type_do_not_fail_the_parse() {
        let json = r#"{
            "kind": "cloud",
            "detail": {"sport_type": 5, "name": false, "start_date": true, "laps": "none"},
            "streams": {"time": [0, 1], "watts": "lots"}
        }"#;
        let RawActivityPayload::Cloud(cloud) = RawActivityPayload::from_json(json).unwrap() else {
            panic!("expected cloud payload");
        };
        assert_eq!(cloud.detail.sport_type, None);
        assert_eq!(cloud.detail.name, None);
        assert_eq!(cloud.detail.start_date, None);
        assert!(cloud.detail.laps.is_empty());
        assert!(cloud.streams.watts.is_empty());

        let json = r#"{"kind": "device", "records": [{"timestamp": true}, 7], "laps": 3}"#;
        let RawActivityPayload::Device(device) = RawActivityPayload::from_json(json).unwrap()
        else {
            panic!("expected device payload");
        };
        assert_eq!(device.records.len(), 2);
        assert_eq!(device.records[0].timestamp, None);
        assert!(device.laps.is_empty());

        let json = r#"{"kind": "manual", "results": [{"avg_speed": "3.5"}, "rest"]}"#;
        let RawActivityPayload::Manual(manual) = RawActivityPayload::from_json(json).unwrap()
        else {
            panic!("expected manual payload");
        };
        assert_eq!(manual.results.len(), 1);
        assert_eq!(manual.results[0].avg_speed, Some(3.5));
    }

    #[test]
    fn test_time_value_resolution() {
        let text = TimeValue::Text("2024-03-02T07:00:00Z".to_string());
        let secs = TimeValue::Seconds(1_709_362_800.0);
        assert_eq!(text.to_datetime(), secs.to_datetime());

        let naive = TimeValue::Text("2024-03-02T07:00:00".to_string());
        assert_eq!(naive.to_datetime(), text.to_datetime());

        assert_eq!(TimeValue::Text("yesterday".to_string()).to_datetime(), None);
    }
}
