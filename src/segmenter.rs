//! Interval segmentation
//!
//! Intervals come from one of four places, in order of preference:
//! - source laps, with missing aggregates averaged from the records they cover
//! - synthesized distance splits for pace-based sports without laps
//! - a single whole-activity interval for other sports without laps
//! - logged steps of a manual workout
//!
//! Intervals are contiguous and never overlap. Pause intervals stay in the
//! list for timeline display but are left out of the main-set summary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::SegmentationConfig;
use crate::schema::offset_by_seconds;
use crate::types::{
    pace_from_speed, CanonicalLap, Interval, IntervalSource, Metric, NormalizedActivity, Record,
    Sport,
};

/// Interval segmenter
pub struct IntervalSegmenter;

impl IntervalSegmenter {
    /// Derive the interval list for an activity
    pub fn segment(activity: &NormalizedActivity, config: &SegmentationConfig) -> Vec<Interval> {
        let sport = &activity.meta.sport;

        let mut intervals = if !activity.has_time_series() {
            if activity.manual_steps.is_empty() {
                Vec::new()
            } else {
                manual_intervals(activity)
            }
        } else if is_degenerate(&activity.records) {
            debug!("zero-length or zero-distance activity, no intervals");
            Vec::new()
        } else if !activity.laps.is_empty() {
            lap_intervals(&activity.records, &activity.laps)
        } else if sport.is_pace_based() {
            split_intervals(&activity.records, config)
        } else {
            whole_activity(&activity.records).into_iter().collect()
        };

        for (index, interval) in intervals.iter_mut().enumerate() {
            interval.index = index;
            interval.is_pause = is_pause_speed(interval.avg_speed_mps, sport, config);
        }

        debug!(
            sport = sport.as_str(),
            intervals = intervals.len(),
            pauses = intervals.iter().filter(|i| i.is_pause).count(),
            "segmented activity"
        );

        intervals
    }
}

/// Negligible motion: average speed at or below the pause speed, or for
/// pace-based sports a pace slower than the pause pace. Unknown speed is
/// never a pause.
pub fn is_pause_speed(speed_mps: Option<f64>, sport: &Sport, config: &SegmentationConfig) -> bool {
    let Some(speed) = speed_mps.filter(|s| s.is_finite()) else {
        return false;
    };
    if speed <= config.pause_speed_mps {
        return true;
    }
    sport.is_pace_based()
        && pace_from_speed(speed).is_some_and(|pace| pace > config.pause_pace_seconds_per_km)
}

fn is_degenerate(records: &[Record]) -> bool {
    match (records.first(), records.last()) {
        (Some(first), Some(last)) => {
            last.timestamp <= first.timestamp
                || last.distance_meters - first.distance_meters <= 0.0
        }
        _ => true,
    }
}

fn seconds_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    (end - start).num_milliseconds() as f64 / 1000.0
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Records with timestamps in `[start, end)`, as an index range
fn window(records: &[Record], start: DateTime<Utc>, end: DateTime<Utc>) -> (usize, usize) {
    let lo = records.partition_point(|r| r.timestamp < start);
    let hi = records.partition_point(|r| r.timestamp < end).max(lo);
    (lo, hi)
}

/// Distance covered from record `lo` up to the first record at or after the
/// window end (or the last record)
fn window_distance(records: &[Record], lo: usize, hi: usize) -> f64 {
    let Some(first) = records.get(lo) else {
        return 0.0;
    };
    let last = records.get(hi).or_else(|| records.last()).unwrap_or(first);
    (last.distance_meters - first.distance_meters).max(0.0)
}

fn speed_over(distance_meters: f64, duration_seconds: f64) -> Option<f64> {
    (duration_seconds > 0.0).then(|| distance_meters / duration_seconds)
}

struct Span {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

#[allow(clippy::too_many_arguments)]
fn build_interval(
    origin: DateTime<Utc>,
    span: Span,
    distance_meters: f64,
    avg_power: Option<f64>,
    avg_heart_rate: Option<f64>,
    avg_speed_mps: Option<f64>,
    source: IntervalSource,
    label: Option<String>,
) -> Interval {
    let duration_seconds = seconds_between(span.start, span.end).max(0.0);
    Interval {
        index: 0,
        start_time: span.start,
        end_time: span.end,
        start_elapsed_seconds: seconds_between(origin, span.start),
        duration_seconds,
        distance_meters,
        avg_power,
        avg_heart_rate,
        avg_speed_mps: avg_speed_mps.or_else(|| speed_over(distance_meters, duration_seconds)),
        is_pause: false,
        source,
        label,
    }
}

/// Interval over the records in `[start, end)` with record-derived aggregates
fn record_interval(records: &[Record], span: Span, source: IntervalSource) -> Interval {
    let origin = records[0].timestamp;
    let (lo, hi) = window(records, span.start, span.end);
    let covered = &records[lo..hi];
    build_interval(
        origin,
        span,
        window_distance(records, lo, hi),
        mean(covered.iter().filter_map(|r| r.power_watts)),
        mean(covered.iter().filter_map(|r| r.heart_rate_bpm)),
        None,
        source,
        None,
    )
}

fn lap_intervals(records: &[Record], laps: &[CanonicalLap]) -> Vec<Interval> {
    let origin = records[0].timestamp;
    let activity_end = records[records.len() - 1].timestamp;

    // Laps without a start continue from the previous lap
    let mut placed: Vec<(DateTime<Utc>, &CanonicalLap)> = Vec::with_capacity(laps.len());
    let mut cursor = origin;
    for lap in laps {
        let start = lap.start_time.unwrap_or(cursor);
        cursor = lap_end(lap, start).unwrap_or(start);
        placed.push((start, lap));
    }
    placed.sort_by_key(|(start, _)| *start);

    let mut intervals = Vec::with_capacity(placed.len());
    for (i, (start, lap)) in placed.iter().enumerate() {
        let start = *start;
        // The next lap start closes overlaps and gaps alike
        let end = match placed.get(i + 1) {
            Some((next_start, _)) => *next_start,
            None => lap_end(lap, start).unwrap_or(activity_end),
        }
        .max(start);

        let (lo, hi) = window(records, start, end);
        let covered = &records[lo..hi];
        let distance_meters = lap
            .distance_meters
            .filter(|d| d.is_finite() && *d >= 0.0)
            .unwrap_or_else(|| window_distance(records, lo, hi));

        intervals.push(build_interval(
            origin,
            Span { start, end },
            distance_meters,
            lap.avg_power
                .or_else(|| mean(covered.iter().filter_map(|r| r.power_watts))),
            lap.avg_heart_rate
                .or_else(|| mean(covered.iter().filter_map(|r| r.heart_rate_bpm))),
            lap.avg_speed_mps,
            IntervalSource::Lap,
            None,
        ));
    }

    intervals
}

fn lap_end(lap: &CanonicalLap, start: DateTime<Utc>) -> Option<DateTime<Utc>> {
    lap.end_time.or_else(|| {
        let elapsed = lap.elapsed_seconds.filter(|e| *e >= 0.0)?;
        offset_by_seconds(start, elapsed)
    })
}

fn split_intervals(records: &[Record], config: &SegmentationConfig) -> Vec<Interval> {
    let split = config.split_distance_meters;
    let mut intervals = Vec::new();
    let mut seg_start = 0;
    let mut next_mark = split;

    for (idx, record) in records.iter().enumerate().skip(1) {
        if record.distance_meters < next_mark {
            continue;
        }
        let span = Span {
            start: records[seg_start].timestamp,
            end: record.timestamp,
        };
        intervals.push(record_interval(records, span, IntervalSource::DistanceSplit));
        seg_start = idx;
        while next_mark <= record.distance_meters {
            next_mark += split;
        }
    }

    if intervals.is_empty() {
        // never reached a full split
        return whole_activity(records).into_iter().collect();
    }

    let last = records.len() - 1;
    let remainder = records[last].distance_meters - records[seg_start].distance_meters;
    if seg_start < last && remainder >= config.min_partial_split_meters {
        let span = Span {
            start: records[seg_start].timestamp,
            end: records[last].timestamp,
        };
        let mut trailing = record_interval(records, span, IntervalSource::DistanceSplit);
        // the closing sample belongs to the trailing split
        let closing = &records[seg_start..];
        trailing.avg_power = mean(closing.iter().filter_map(|r| r.power_watts));
        trailing.avg_heart_rate = mean(closing.iter().filter_map(|r| r.heart_rate_bpm));
        intervals.push(trailing);
    } else if seg_start < last {
        debug!(remainder, "dropped short trailing split");
    }

    intervals
}

fn whole_activity(records: &[Record]) -> Option<Interval> {
    let first = records.first()?;
    let last = records.last()?;
    Some(build_interval(
        first.timestamp,
        Span {
            start: first.timestamp,
            end: last.timestamp,
        },
        (last.distance_meters - first.distance_meters).max(0.0),
        mean(records.iter().filter_map(|r| r.power_watts)),
        mean(records.iter().filter_map(|r| r.heart_rate_bpm)),
        None,
        IntervalSource::WholeActivity,
        None,
    ))
}

fn manual_intervals(activity: &NormalizedActivity) -> Vec<Interval> {
    let origin = activity.meta.start_time;
    let mut cursor = origin;

    activity
        .manual_steps
        .iter()
        .map(|step| {
            let duration_seconds = step
                .duration_seconds
                .or_else(|| {
                    let distance = step.distance_meters?;
                    let speed = step.avg_speed_mps.filter(|s| *s > 0.0)?;
                    Some(distance / speed)
                })
                .unwrap_or(0.0);
            let distance_meters = step
                .distance_meters
                .or_else(|| step.avg_speed_mps.map(|s| s * duration_seconds))
                .unwrap_or(0.0);

            let start = cursor;
            // a duration past the date range collapses the step to zero length
            let end = offset_by_seconds(start, duration_seconds).unwrap_or(start);
            cursor = end;

            let speed = step.avg_speed_mps.or_else(|| {
                step.distance_meters
                    .and_then(|d| speed_over(d, duration_seconds))
            });
            build_interval(
                origin,
                Span { start, end },
                distance_meters,
                step.avg_power,
                step.avg_heart_rate,
                speed,
                IntervalSource::ManualStep,
                step.label.clone(),
            )
        })
        .collect()
}

/// Duration-weighted averages over the non-pause intervals
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MainSetSummary {
    pub interval_count: usize,
    pub total_seconds: f64,
    pub total_distance_meters: f64,
    pub avg_power: Option<f64>,
    pub avg_heart_rate: Option<f64>,
    pub avg_speed_mps: Option<f64>,
}

pub fn main_set_summary(intervals: &[Interval]) -> MainSetSummary {
    let main: Vec<&Interval> = intervals.iter().filter(|i| !i.is_pause).collect();

    let weighted = |value: fn(&Interval) -> Option<f64>| {
        let (sum, weight) = main
            .iter()
            .filter_map(|i| value(i).map(|v| (v, i.duration_seconds)))
            .fold((0.0, 0.0), |(sum, weight), (v, d)| (sum + v * d, weight + d));
        (weight > 0.0).then(|| sum / weight)
    };

    MainSetSummary {
        interval_count: main.len(),
        total_seconds: main.iter().map(|i| i.duration_seconds).sum(),
        total_distance_meters: main.iter().map(|i| i.distance_meters).sum(),
        avg_power: weighted(|i| i.avg_power),
        avg_heart_rate: weighted(|i| i.avg_heart_rate),
        avg_speed_mps: weighted(|i| i.avg_speed_mps),
    }
}

/// Value of a metric for an interval, if the interval carries it
pub fn interval_value(interval: &Interval, metric: Metric) -> Option<f64> {
    match metric {
        Metric::Power => interval.avg_power,
        Metric::HeartRate => interval.avg_heart_rate,
        Metric::Speed => interval.avg_speed_mps,
        Metric::Pace => interval.avg_pace_seconds_per_km(),
        Metric::Cadence | Metric::Altitude => None,
    }
    .filter(|v| v.is_finite())
}

/// Intervals of similar effort, for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalGroup {
    pub metric: Metric,
    /// Value of the interval that opened the group
    pub seed_value: f64,
    pub interval_indices: Vec<usize>,
}

/// Greedy first-match grouping in interval order. An interval joins the
/// first group whose seed lies within `tolerance × (max − min)` of its value.
/// Pauses and intervals without the metric stay ungrouped.
pub fn group_intervals(intervals: &[Interval], metric: Metric, tolerance: f64) -> Vec<IntervalGroup> {
    let candidates: Vec<(usize, f64)> = intervals
        .iter()
        .filter(|i| !i.is_pause)
        .filter_map(|i| interval_value(i, metric).map(|v| (i.index, v)))
        .collect();

    let (min, max) = candidates
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (_, v)| {
            (lo.min(*v), hi.max(*v))
        });
    let threshold = if candidates.is_empty() {
        0.0
    } else {
        tolerance * (max - min)
    };

    let mut groups: Vec<IntervalGroup> = Vec::new();
    for (index, value) in candidates {
        match groups
            .iter_mut()
            .find(|g| (g.seed_value - value).abs() <= threshold)
        {
            Some(group) => group.interval_indices.push(index),
            None => groups.push(IntervalGroup {
                metric,
                seed_value: value,
                interval_indices: vec![index],
            }),
        }
    }
    groups
}
