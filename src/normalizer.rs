//! Record normalization
//!
//! This module turns a source draft into the canonical, immutable record stream.
//! - Samples ordered by timestamp, elapsed time computed from the first record
//! - Distance made non-decreasing, gaps integrated from speed
//! - Speed derived from distance when the source omits it
//! - Missing channels kept as `None` and reported as quality flags
//! - Totals fall back to record-derived values
//!
//! Normalization never fails. Whatever cannot be interpreted is dropped or left
//! empty and flagged.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::adapters::{
    CloudAdapter, DeviceAdapter, DraftSample, ManualAdapter, PayloadAdapter, SourceDraft,
};
use crate::schema::{offset_by_seconds, RawActivityPayload};
use crate::types::{ActivityMeta, NormalizedActivity, QualityFlag, Record, Source, Sport};

/// Normalizer for converting raw payloads into canonical activities
pub struct Normalizer;

impl Normalizer {
    /// Normalize a source-tagged payload
    pub fn normalize(payload: &RawActivityPayload) -> NormalizedActivity {
        let draft = match payload {
            RawActivityPayload::Device(device) => DeviceAdapter.adapt(device),
            RawActivityPayload::Cloud(cloud) => CloudAdapter.adapt(cloud),
            RawActivityPayload::Manual(manual) => ManualAdapter.adapt(manual),
        };
        Self::from_draft(draft)
    }

    /// Normalize an adapter draft
    pub fn from_draft(draft: SourceDraft) -> NormalizedActivity {
        let mut quality_flags = Vec::new();
        let sport = draft
            .sport_label
            .as_deref()
            .map(Sport::from_label)
            .unwrap_or_default();

        let anchor = draft
            .start_time
            .or_else(|| draft.samples.iter().filter_map(|s| s.timestamp).min());
        let start_time = match anchor {
            Some(start) => start,
            None => {
                quality_flags.push(QualityFlag::MissingStartTime);
                DateTime::<Utc>::UNIX_EPOCH
            }
        };

        let (records, unplaced) = if draft.source == Source::Manual {
            (Vec::new(), 0)
        } else {
            build_records(&draft.samples, start_time, &mut quality_flags)
        };

        let dropped = draft.dropped_samples + unplaced;
        if dropped > 0 {
            warn!(
                source = draft.source.as_str(),
                dropped,
                "dropped samples that could not be placed on the timeline"
            );
            quality_flags.push(QualityFlag::DroppedSamples);
        }

        let has_time_series = !records.is_empty();
        if has_time_series {
            flag_missing_channels(&records, &mut quality_flags);
        } else {
            quality_flags.push(QualityFlag::NoTimeSeries);
        }

        let mut derived_totals = false;
        let total_distance_meters = match draft.total_distance_meters.filter(|d| *d >= 0.0) {
            Some(distance) => distance,
            None => {
                derived_totals |= has_time_series;
                records.last().map_or(0.0, |r| r.distance_meters)
            }
        };
        let total_time_seconds = match draft.total_time_seconds.filter(|t| *t >= 0.0) {
            Some(time) => time,
            None => {
                derived_totals |= has_time_series;
                records_duration(&records)
            }
        };
        if derived_totals {
            quality_flags.push(QualityFlag::DerivedTotals);
        }

        debug!(
            source = draft.source.as_str(),
            sport = sport.as_str(),
            records = records.len(),
            laps = draft.laps.len(),
            steps = draft.manual_steps.len(),
            "normalized activity"
        );

        NormalizedActivity {
            meta: ActivityMeta {
                source: draft.source,
                sport,
                name: draft.name,
                start_time,
                total_distance_meters,
                total_time_seconds,
                has_time_series,
            },
            records,
            laps: draft.laps,
            manual_steps: draft.manual_steps,
            quality_flags,
        }
    }
}

/// Seconds each sample is held: the gap to the next sample. The last sample
/// reuses the previous gap; a lone sample holds nothing.
pub fn sample_holds(records: &[Record]) -> Vec<f64> {
    let mut holds: Vec<f64> = records
        .windows(2)
        .map(|pair| (pair[1].elapsed_seconds - pair[0].elapsed_seconds).max(0.0))
        .collect();
    if let Some(&last_gap) = holds.last() {
        holds.push(last_gap);
    } else if !records.is_empty() {
        holds.push(0.0);
    }
    holds
}

/// Duration covered by the record stream, including the hold of the last sample
pub fn records_duration(records: &[Record]) -> f64 {
    sample_holds(records).iter().sum()
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

fn non_negative(value: Option<f64>) -> Option<f64> {
    finite(value).filter(|v| *v >= 0.0)
}

struct Placed<'a> {
    timestamp: DateTime<Utc>,
    sample: &'a DraftSample,
}

/// Canonical records plus the number of samples whose time could not be
/// resolved (offsets outside the representable date range)
fn build_records(
    samples: &[DraftSample],
    start_time: DateTime<Utc>,
    quality_flags: &mut Vec<QualityFlag>,
) -> (Vec<Record>, usize) {
    let mut placed: Vec<Placed<'_>> = samples
        .iter()
        .filter_map(|sample| {
            let timestamp = sample.timestamp.or_else(|| {
                offset_by_seconds(start_time, sample.elapsed_seconds?)
            })?;
            Some(Placed { timestamp, sample })
        })
        .collect();
    let unplaced = samples.len() - placed.len();

    if placed.windows(2).any(|p| p[1].timestamp < p[0].timestamp) {
        warn!(samples = placed.len(), "samples out of order, sorting by timestamp");
        placed.sort_by_key(|p| p.timestamp);
        quality_flags.push(QualityFlag::ReorderedSamples);
    }

    let Some(first) = placed.first().map(|p| p.timestamp) else {
        return (Vec::new(), unplaced);
    };

    let mut records: Vec<Record> = Vec::with_capacity(placed.len());
    let mut regressed = false;

    for entry in &placed {
        let sample = entry.sample;
        let elapsed_seconds = (entry.timestamp - first).num_milliseconds() as f64 / 1000.0;
        let speed = non_negative(sample.speed_mps);
        let previous = records.last();
        let dt = previous.map_or(0.0, |p| elapsed_seconds - p.elapsed_seconds);

        let mut distance_meters = match (non_negative(sample.distance_meters), previous) {
            (Some(distance), _) => distance,
            (None, Some(prev)) => prev.distance_meters + speed.unwrap_or(0.0) * dt,
            (None, None) => 0.0,
        };
        if let Some(prev) = previous {
            if distance_meters < prev.distance_meters {
                regressed = true;
                distance_meters = prev.distance_meters;
            }
        }

        let speed_mps = match (speed, previous) {
            (Some(speed), _) => speed,
            (None, Some(prev)) if dt > 0.0 => (distance_meters - prev.distance_meters) / dt,
            (None, Some(prev)) => prev.speed_mps,
            (None, None) => 0.0,
        };

        records.push(Record {
            timestamp: entry.timestamp,
            elapsed_seconds,
            distance_meters,
            speed_mps,
            heart_rate_bpm: finite(sample.heart_rate_bpm).filter(|hr| *hr > 0.0),
            power_watts: non_negative(sample.power_watts),
            cadence_rpm: non_negative(sample.cadence_rpm),
            altitude_meters: finite(sample.altitude_meters),
        });
    }

    if regressed {
        warn!("distance regressed, clamped to running maximum");
        quality_flags.push(QualityFlag::DistanceRegression);
    }

    (records, unplaced)
}

fn flag_missing_channels(records: &[Record], quality_flags: &mut Vec<QualityFlag>) {
    if records.iter().all(|r| r.heart_rate_bpm.is_none()) {
        quality_flags.push(QualityFlag::MissingHeartRate);
    }
    if records.iter().all(|r| r.power_watts.is_none()) {
        quality_flags.push(QualityFlag::MissingPower);
    }
    if records.iter().all(|r| r.cadence_rpm.is_none()) {
        quality_flags.push(QualityFlag::MissingCadence);
    }
    if records.iter().all(|r| r.altitude_meters.is_none()) {
        quality_flags.push(QualityFlag::MissingAltitude);
    }
}
