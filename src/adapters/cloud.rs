//! Cloud export adapter
//!
//! Cloud exports deliver a detail object plus one array per metric. The
//! `time` stream (seconds from `start_date`) is authoritative for the sample
//! count; shorter channels are padded with `None` and longer ones truncated.
//! Lap boundaries are given as inclusive stream indices.

use chrono::{DateTime, Utc};

use super::{DraftSample, PayloadAdapter, SourceDraft};
use crate::schema::{offset_by_seconds, CloudLap, CloudPayload};
use crate::types::{CanonicalLap, Source};

/// Cloud payload adapter
pub struct CloudAdapter;

impl PayloadAdapter for CloudAdapter {
    type Payload = CloudPayload;

    fn adapt(&self, payload: &CloudPayload) -> SourceDraft {
        let detail = &payload.detail;
        let streams = &payload.streams;

        let mut draft = SourceDraft::empty(Source::Cloud);
        draft.sport_label = detail
            .sport_type
            .clone()
            .or_else(|| detail.activity_type.clone());
        draft.name = detail.name.clone();
        draft.start_time = detail.start_date.as_ref().and_then(|t| t.to_datetime());
        draft.total_distance_meters = detail.distance;
        draft.total_time_seconds = detail.moving_time.or(detail.elapsed_time);

        for (idx, offset) in streams.time.iter().enumerate() {
            let Some(offset) = offset else {
                draft.dropped_samples += 1;
                continue;
            };

            draft.samples.push(DraftSample {
                timestamp: None,
                elapsed_seconds: Some(*offset),
                distance_meters: at(&streams.distance, idx),
                speed_mps: at(&streams.velocity_smooth, idx),
                heart_rate_bpm: at(&streams.heartrate, idx),
                power_watts: at(&streams.watts, idx),
                cadence_rpm: at(&streams.cadence, idx),
                altitude_meters: at(&streams.altitude, idx),
            });
        }

        let longest_channel = [
            streams.distance.len(),
            streams.velocity_smooth.len(),
            streams.heartrate.len(),
            streams.watts.len(),
            streams.cadence.len(),
            streams.altitude.len(),
        ]
        .into_iter()
        .max()
        .unwrap_or(0);
        if longest_channel > streams.time.len() {
            draft.dropped_samples += longest_channel - streams.time.len();
        }

        draft.laps = detail
            .laps
            .iter()
            .map(|lap| convert_lap(lap, &streams.time, draft.start_time))
            .collect();

        draft
    }
}

fn at(channel: &[Option<f64>], idx: usize) -> Option<f64> {
    channel.get(idx).copied().flatten()
}

fn offset_time(start: Option<DateTime<Utc>>, offset_seconds: Option<f64>) -> Option<DateTime<Utc>> {
    offset_by_seconds(start?, offset_seconds?)
}

fn convert_lap(lap: &CloudLap, time: &[Option<f64>], start: Option<DateTime<Utc>>) -> CanonicalLap {
    let start_offset = lap.start_index.and_then(|idx| at(time, idx));
    // end_index is inclusive: the lap closes at that sample
    let end_offset = lap.end_index.and_then(|idx| at(time, idx));

    let start_time = offset_time(start, start_offset)
        .or_else(|| lap.start_date.as_ref().and_then(|t| t.to_datetime()));
    let end_time = offset_time(start, end_offset);

    CanonicalLap {
        start_time,
        end_time,
        elapsed_seconds: lap.elapsed_time,
        distance_meters: lap.distance,
        avg_power: lap.average_watts,
        avg_heart_rate: lap.average_heartrate,
        avg_speed_mps: lap.average_speed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::Normalizer;
    use crate::schema::RawActivityPayload;
    use crate::types::QualityFlag;
    use chrono::Duration;

    fn parse(json: &str) -> CloudPayload {
        match RawActivityPayload::from_json(json).unwrap() {
            RawActivityPayload::Cloud(cloud) => cloud,
            other => panic!("expected cloud payload, got {:?}", other.source()),
        }
    }

    #[test]
    fn test_parallel_streams_are_zipped_by_time() {
        let payload = parse(
            r#"{
                "kind": "cloud",
                "detail": {"sport_type": "Run", "start_date": "2024-03-02T07:00:00Z", "moving_time": 2},
                "streams": {
                    "time": [0, 1, 2],
                    "distance": [0, 3, 6],
                    "heartrate": [140, 141]
                }
            }"#,
        );

        let draft = CloudAdapter.adapt(&payload);
        assert_eq!(draft.sport_label.as_deref(), Some("Run"));
        assert_eq!(draft.samples.len(), 3);
        assert_eq!(draft.samples[1].distance_meters, Some(3.0));
        assert_eq!(draft.samples[2].heart_rate_bpm, None);
        assert_eq!(draft.samples[2].power_watts, None);
        assert_eq!(draft.total_time_seconds, Some(2.0));
        assert_eq!(draft.dropped_samples, 0);
    }

    #[test]
    fn test_samples_without_time_are_dropped() {
        let payload = parse(
            r#"{
                "kind": "cloud",
                "streams": {"time": [0, null, 2], "watts": [100, 110, 120, 130]}
            }"#,
        );

        let draft = CloudAdapter.adapt(&payload);
        assert_eq!(draft.samples.len(), 2);
        // one null time slot plus one watts value past the end of `time`
        assert_eq!(draft.dropped_samples, 2);
        assert_eq!(draft.samples[1].power_watts, Some(120.0));
    }

    #[test]
    fn test_lap_indices_resolve_against_time_stream() {
        let payload = parse(
            r#"{
                "kind": "cloud",
                "detail": {
                    "start_date": "2024-03-02T07:00:00Z",
                    "laps": [{"start_index": 0, "end_index": 2, "distance": 6, "average_watts": 210}]
                },
                "streams": {"time": [0, 10, 20]}
            }"#,
        );

        let draft = CloudAdapter.adapt(&payload);
        let lap = &draft.laps[0];
        let start = draft.start_time.unwrap();
        assert_eq!(lap.start_time, Some(start));
        assert_eq!(lap.end_time, Some(start + Duration::seconds(20)));
        assert_eq!(lap.avg_power, Some(210.0));
    }

    #[test]
    fn test_time_offsets_past_the_date_range_are_dropped() {
        let payload = parse(
            r#"{
                "kind": "cloud",
                "detail": {
                    "start_date": "2024-03-02T07:00:00Z",
                    "laps": [{"start_index": 0, "end_index": 2}]
                },
                "streams": {"time": [0, 5, 1e14], "distance": [0, 20, 40]}
            }"#,
        );

        let draft = CloudAdapter.adapt(&payload);
        assert_eq!(draft.laps[0].end_time, None);

        let activity = Normalizer::from_draft(draft);
        assert_eq!(activity.records.len(), 2);
        assert!(activity.has_flag(QualityFlag::DroppedSamples));
        assert_eq!(activity.records[1].elapsed_seconds, 5.0);
    }
}
