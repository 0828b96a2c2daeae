//! Manual log adapter
//!
//! Manual logs carry no time series, only discrete steps. The draft keeps the
//! steps for interval-only output and sums whatever totals the steps provide.

use super::{PayloadAdapter, SourceDraft};
use crate::schema::ManualPayload;
use crate::types::{ManualStep, Source};

/// Manual payload adapter
pub struct ManualAdapter;

impl PayloadAdapter for ManualAdapter {
    type Payload = ManualPayload;

    fn adapt(&self, payload: &ManualPayload) -> SourceDraft {
        let mut draft = SourceDraft::empty(Source::Manual);
        draft.sport_label = payload.sport.clone();
        draft.name = payload.name.clone();
        draft.start_time = payload.start_time.as_ref().and_then(|t| t.to_datetime());

        draft.manual_steps = payload
            .results
            .iter()
            .map(|result| ManualStep {
                label: result.name.clone(),
                duration_seconds: result.duration_seconds.filter(|d| *d >= 0.0),
                distance_meters: result.distance_meters.filter(|d| *d >= 0.0),
                avg_power: result.avg_power,
                avg_heart_rate: result.avg_heart_rate,
                avg_speed_mps: result.avg_speed,
            })
            .collect();

        draft.total_distance_meters = sum_present(draft.manual_steps.iter().map(|s| s.distance_meters));
        draft.total_time_seconds = sum_present(draft.manual_steps.iter().map(|s| s.duration_seconds));

        draft
    }
}

/// Sum of the present values, `None` when nothing was logged
fn sum_present(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    values.flatten().fold(None, |acc, v| Some(acc.unwrap_or(0.0) + v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ManualResult;

    #[test]
    fn test_manual_totals_sum_logged_steps() {
        let payload = ManualPayload {
            sport: Some("Run".to_string()),
            results: vec![
                ManualResult {
                    name: Some("Warmup".to_string()),
                    duration_seconds: Some(600.0),
                    distance_meters: Some(1500.0),
                    ..Default::default()
                },
                ManualResult {
                    name: Some("Strides".to_string()),
                    duration_seconds: Some(120.0),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };

        let draft = ManualAdapter.adapt(&payload);
        assert!(draft.samples.is_empty());
        assert_eq!(draft.manual_steps.len(), 2);
        assert_eq!(draft.total_time_seconds, Some(720.0));
        assert_eq!(draft.total_distance_meters, Some(1500.0));
    }

    #[test]
    fn test_empty_log_has_no_totals() {
        let draft = ManualAdapter.adapt(&ManualPayload::default());
        assert_eq!(draft.total_time_seconds, None);
        assert_eq!(draft.total_distance_meters, None);
    }
}
