//! Forgiving deserializers for payload fields
//!
//! Sources disagree on number encoding: some send strings, some send `null`
//! placeholders, some wrap streams in `{ "data": [...] }`. Anything that does
//! not decode to a finite number becomes `None` instead of failing the parse.
//! Labels and timestamps of the wrong JSON type are treated the same way, and
//! containers of the wrong shape decode as empty.

use chrono::{DateTime, TimeDelta, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::payload::TimeValue;

pub(crate) fn value_to_f64(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

/// `Option<f64>` that tolerates strings and garbage
pub(crate) fn option_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_to_f64))
}

/// `Option<String>` where anything but a string is dropped
pub(crate) fn option_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        _ => None,
    })
}

/// Timestamp as epoch seconds or text; other shapes become `None`
pub(crate) fn option_time<'de, D>(deserializer: D) -> Result<Option<TimeValue>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64().map(TimeValue::Seconds),
        Some(Value::String(s)) => Some(TimeValue::Text(s)),
        _ => None,
    })
}

/// `start` shifted by a payload-supplied offset in seconds. `None` when the
/// offset is not finite or the result leaves chrono's date range.
pub(crate) fn offset_by_seconds(start: DateTime<Utc>, seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    let delta = TimeDelta::try_milliseconds((seconds * 1000.0).round() as i64)?;
    start.checked_add_signed(delta)
}

/// Index fields that occasionally arrive as floats
pub(crate) fn option_index<'de, D>(deserializer: D) -> Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = option_f64(deserializer)?;
    Ok(value.filter(|v| *v >= 0.0).map(|v| v as usize))
}

/// A per-metric stream: a bare array, or an object carrying a `data` array
pub(crate) fn stream<'de, D>(deserializer: D) -> Result<Vec<Option<f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let items = match value {
        Some(Value::Array(items)) => items,
        Some(Value::Object(mut map)) => match map.remove("data") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };
    Ok(items.iter().map(value_to_f64).collect())
}

/// Nested object; anything but an object decodes as `T::default()`
pub(crate) fn object<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(value @ Value::Object(_)) => serde_json::from_value(value).unwrap_or_default(),
        _ => T::default(),
    })
}

/// Array of laps or steps; entries that are not objects are skipped
pub(crate) fn entries<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(array(deserializer)?
        .into_iter()
        .filter(Value::is_object)
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}

/// Array of samples; malformed entries decode as empty samples so the
/// adapter drops and counts them
pub(crate) fn samples<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    Ok(array(deserializer)?
        .into_iter()
        .map(|item| serde_json::from_value(item).unwrap_or_default())
        .collect())
}

fn array<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    })
}
