//! Device recording adapter
//!
//! Maps head-unit recordings (sample array plus native laps) to a draft.
//! Enhanced speed/altitude fields take precedence over the plain ones, which
//! older units cap at 16 bits.

use super::{DraftSample, PayloadAdapter, SourceDraft};
use crate::schema::{DeviceLap, DevicePayload, DeviceSample};
use crate::types::{CanonicalLap, Source};

/// Device payload adapter
pub struct DeviceAdapter;

impl PayloadAdapter for DeviceAdapter {
    type Payload = DevicePayload;

    fn adapt(&self, payload: &DevicePayload) -> SourceDraft {
        let mut draft = SourceDraft::empty(Source::Device);
        draft.sport_label = payload.sport.clone();
        draft.name = payload.name.clone();
        draft.total_distance_meters = payload.total_distance;
        draft.total_time_seconds = payload.total_timer_time;

        for sample in &payload.records {
            match convert_sample(sample) {
                Some(draft_sample) => draft.samples.push(draft_sample),
                None => draft.dropped_samples += 1,
            }
        }

        draft.start_time = payload
            .start_time
            .as_ref()
            .and_then(|t| t.to_datetime())
            .or_else(|| draft.samples.iter().filter_map(|s| s.timestamp).min());

        draft.laps = payload.laps.iter().map(convert_lap).collect();

        draft
    }
}

/// A sample is only usable if it can be placed on the timeline
fn convert_sample(sample: &DeviceSample) -> Option<DraftSample> {
    let timestamp = sample.timestamp.as_ref().and_then(|t| t.to_datetime());
    let elapsed_seconds = sample.elapsed_time;
    if timestamp.is_none() && elapsed_seconds.is_none() {
        return None;
    }

    Some(DraftSample {
        timestamp,
        elapsed_seconds,
        distance_meters: sample.distance,
        speed_mps: sample.enhanced_speed.or(sample.speed),
        heart_rate_bpm: sample.heart_rate,
        power_watts: sample.power,
        cadence_rpm: sample.cadence,
        altitude_meters: sample.enhanced_altitude.or(sample.altitude),
    })
}

fn convert_lap(lap: &DeviceLap) -> CanonicalLap {
    CanonicalLap {
        start_time: lap.start_time.as_ref().and_then(|t| t.to_datetime()),
        end_time: lap.timestamp.as_ref().and_then(|t| t.to_datetime()),
        elapsed_seconds: lap.total_elapsed_time,
        distance_meters: lap.total_distance,
        avg_power: lap.avg_power,
        avg_heart_rate: lap.avg_heart_rate,
        avg_speed_mps: lap.enhanced_avg_speed.or(lap.avg_speed),
    }
}
