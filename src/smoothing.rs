//! Moving-average smoothing for chart channels
//!
//! A normalized knob `k ∈ [0, 1]` selects a window of `round(1 + k·19)`
//! samples. Each output point is the mean of the non-null samples inside its
//! window, clipped at the array boundaries. Null samples stay null and real
//! samples always stay real.

use std::collections::BTreeMap;

use crate::types::{Metric, Record};

/// A metric read across all records; `None` marks "no data"
pub type Channel = Vec<Option<f64>>;

pub const MIN_WINDOW: usize = 1;
pub const MAX_WINDOW: usize = 20;

/// Window size for a smoothing knob position
pub fn window_from_knob(knob: f64) -> usize {
    let knob = if knob.is_finite() {
        knob.clamp(0.0, 1.0)
    } else {
        0.0
    };
    (1.0 + knob * (MAX_WINDOW - MIN_WINDOW) as f64).round() as usize
}

/// Read one metric across the record stream
pub fn extract_channel(records: &[Record], metric: Metric) -> Channel {
    records.iter().map(|r| metric.value(r)).collect()
}

/// Smooth a channel with a centered window of `window` samples
pub fn smooth_channel(channel: &[Option<f64>], window: usize) -> Channel {
    if window <= 1 {
        return channel.to_vec();
    }

    let left = (window - 1) / 2;
    let right = window - 1 - left;
    let len = channel.len();

    channel
        .iter()
        .enumerate()
        .map(|(idx, value)| {
            // the sample itself is always in its window, so count >= 1
            value.map(|_| {
                let start = idx.saturating_sub(left);
                let end = (idx + right + 1).min(len);
                let (sum, count) = channel[start..end]
                    .iter()
                    .flatten()
                    .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
                sum / count as f64
            })
        })
        .collect()
}

/// Smoothed channels for a set of metrics, keyed by metric
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SmoothedChannels {
    pub window: usize,
    channels: BTreeMap<Metric, Channel>,
}

impl SmoothedChannels {
    /// Smooth every requested metric of the record stream
    pub fn compute(records: &[Record], metrics: &[Metric], window: usize) -> Self {
        let channels = metrics
            .iter()
            .map(|&metric| {
                let raw = extract_channel(records, metric);
                (metric, smooth_channel(&raw, window))
            })
            .collect();
        Self { window, channels }
    }

    pub fn get(&self, metric: Metric) -> Option<&Channel> {
        self.channels.get(&metric)
    }

    pub fn metrics(&self) -> impl Iterator<Item = Metric> + '_ {
        self.channels.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_from_knob() {
        assert_eq!(window_from_knob(0.0), 1);
        assert_eq!(window_from_knob(1.0), 20);
        assert_eq!(window_from_knob(0.5), 11); // round(10.5)
        assert_eq!(window_from_knob(0.25), 6); // round(5.75)
        assert_eq!(window_from_knob(-3.0), 1);
        assert_eq!(window_from_knob(7.0), 20);
        assert_eq!(window_from_knob(f64::NAN), 1);
    }

    #[test]
    fn test_window_of_one_is_identity() {
        let channel = vec![Some(1.5), None, Some(-2.0), Some(300.25), None];
        assert_eq!(smooth_channel(&channel, 1), channel);
        assert_eq!(smooth_channel(&channel, 0), channel);
    }

    #[test]
    fn test_nulls_are_preserved_both_ways() {
        let channel = vec![None, Some(10.0), None, None, Some(20.0), Some(30.0), None];
        for window in 1..=MAX_WINDOW {
            let smoothed = smooth_channel(&channel, window);
            assert_eq!(smoothed.len(), channel.len());
            for (raw, out) in channel.iter().zip(&smoothed) {
                assert_eq!(raw.is_some(), out.is_some(), "window {window}");
            }
        }
    }

    #[test]
    fn test_centered_window_clips_at_edges() {
        let channel = vec![Some(0.0), Some(3.0), Some(6.0), Some(9.0), Some(12.0)];
        let smoothed = smooth_channel(&channel, 3);
        // edges average over the two available samples
        assert_eq!(smoothed[0], Some(1.5));
        assert_eq!(smoothed[2], Some(6.0));
        assert_eq!(smoothed[4], Some(10.5));
    }

    #[test]
    fn test_even_window_leans_right() {
        let channel = vec![Some(0.0), Some(10.0), Some(20.0), Some(30.0)];
        // window 4: one sample left, two right
        let smoothed = smooth_channel(&channel, 4);
        assert_eq!(smoothed[1], Some(15.0));
        assert_eq!(smoothed[0], Some(10.0));
    }

    #[test]
    fn test_null_neighbours_are_excluded_from_the_mean() {
        let channel = vec![Some(100.0), None, Some(200.0)];
        let smoothed = smooth_channel(&channel, 5);
        assert_eq!(smoothed, vec![Some(150.0), None, Some(150.0)]);
    }

    #[test]
    fn test_smoothed_channels_by_metric() {
        use chrono::{Duration, TimeZone, Utc};

        let start = Utc.with_ymd_and_hms(2024, 3, 2, 7, 0, 0).unwrap();
        let records: Vec<Record> = [Some(100.0), Some(200.0), None]
            .iter()
            .enumerate()
            .map(|(i, power)| Record {
                timestamp: start + Duration::seconds(i as i64),
                elapsed_seconds: i as f64,
                distance_meters: i as f64 * 5.0,
                speed_mps: 5.0,
                heart_rate_bpm: None,
                power_watts: *power,
                cadence_rpm: None,
                altitude_meters: None,
            })
            .collect();

        let smoothed = SmoothedChannels::compute(&records, &[Metric::Power, Metric::Speed], 3);
        assert_eq!(
            smoothed.get(Metric::Power),
            Some(&vec![Some(150.0), Some(150.0), None])
        );
        assert_eq!(smoothed.get(Metric::Speed).map(|c| c.len()), Some(3));
        assert!(smoothed.get(Metric::HeartRate).is_none());
        assert_eq!(smoothed.metrics().count(), 2);
    }
}
