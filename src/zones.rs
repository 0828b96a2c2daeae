//! Zone classification and time-in-zone aggregation
//!
//! Samples are bucketed into the first boundary (in listed order) whose
//! inclusive `[min, max]` range contains them. Time in zone uses the actual gap
//! between consecutive samples, so irregular sampling rates are weighted
//! correctly. Samples below the first zone are unclassified and excluded.
//!
//! The classifier only sees numbers. Pace is measured in seconds per km, so
//! for pace zones a higher index means a slower effort; callers that judge
//! trends use [`Metric::is_improvement`](crate::types::Metric::is_improvement).
//!
//! Boundary sets are never rejected. [`validate_boundaries`] reports gaps and
//! overlaps so they can be surfaced, while classification keeps first-match
//! order.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ZoneConfig;
use crate::normalizer::sample_holds;
use crate::types::{Record, Sport, ZoneAggregate, ZoneBoundary, ZoneKind};

/// Number of zones in the built-in sets
pub const ZONE_COUNT: usize = 5;

/// Power zones as fractions of FTP
const POWER_FRACTIONS: [f64; 4] = [0.55, 0.75, 0.90, 1.05];

/// Heart rate zones as fractions of max heart rate, zone 1 starting at 50%
const HEART_RATE_FLOOR: f64 = 0.50;
const HEART_RATE_FRACTIONS: [f64; 4] = [0.60, 0.70, 0.80, 0.90];

/// Pace zones as fractions of threshold pace (seconds per km, fastest first)
const PACE_FRACTIONS: [f64; 4] = [0.90, 0.97, 1.06, 1.20];

/// Built-in boundary set derived from the athlete thresholds
pub fn default_boundaries(kind: ZoneKind, config: &ZoneConfig) -> Vec<ZoneBoundary> {
    match kind {
        ZoneKind::Power => ladder(0.0, config.ftp_watts, &POWER_FRACTIONS),
        ZoneKind::HeartRate => ladder(
            HEART_RATE_FLOOR * config.max_heart_rate_bpm,
            config.max_heart_rate_bpm,
            &HEART_RATE_FRACTIONS,
        ),
        ZoneKind::Pace => ladder(0.0, config.threshold_pace_seconds_per_km, &PACE_FRACTIONS),
    }
}

/// Boundaries for a kind and sport: explicit profile if configured,
/// otherwise the built-in set
pub fn boundaries_for(kind: ZoneKind, sport: &Sport, config: &ZoneConfig) -> Vec<ZoneBoundary> {
    match config.profile_for(kind, sport) {
        Some(profile) => profile.boundaries.clone(),
        None => default_boundaries(kind, config),
    }
}

fn ladder(floor: f64, reference: f64, fractions: &[f64; 4]) -> Vec<ZoneBoundary> {
    let mut boundaries = Vec::with_capacity(ZONE_COUNT);
    let mut min = floor;
    for (i, fraction) in fractions.iter().enumerate() {
        let max = reference * fraction;
        boundaries.push(ZoneBoundary::new(i as u8 + 1, min, Some(max)));
        min = max;
    }
    boundaries.push(ZoneBoundary::new(ZONE_COUNT as u8, min, None));
    boundaries
}

/// Zone index of the first boundary containing `value`
pub fn classify(value: f64, boundaries: &[ZoneBoundary]) -> Option<u8> {
    if !value.is_finite() {
        return None;
    }
    boundaries
        .iter()
        .find(|b| b.contains(value))
        .map(|b| b.zone_index)
}

/// Time-in-zone result for one zone kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneSummary {
    pub kind: ZoneKind,
    pub boundaries: Vec<ZoneBoundary>,
    /// One entry per boundary, in boundary order
    pub aggregates: Vec<ZoneAggregate>,
    pub classified_seconds: f64,
    /// Held time of samples with a value outside every zone
    pub unclassified_seconds: f64,
}

impl ZoneSummary {
    /// Share of classified time spent in a zone, 0-100
    pub fn percent(&self, zone_index: u8) -> f64 {
        if self.classified_seconds <= 0.0 {
            return 0.0;
        }
        self.aggregates
            .iter()
            .find(|a| a.zone_index == zone_index)
            .map_or(0.0, |a| a.time_seconds / self.classified_seconds * 100.0)
    }

    pub fn total_seconds(&self) -> f64 {
        self.aggregates.iter().map(|a| a.time_seconds).sum()
    }
}

#[derive(Default)]
struct Accumulator {
    time_seconds: f64,
    value_sum: f64,
    sample_count: usize,
}

/// Bucket the records' channel for `kind` into the given boundaries
pub fn aggregate_zones(
    records: &[Record],
    kind: ZoneKind,
    boundaries: &[ZoneBoundary],
) -> ZoneSummary {
    let metric = kind.metric();
    let holds = sample_holds(records);
    let mut accumulators: Vec<Accumulator> =
        boundaries.iter().map(|_| Accumulator::default()).collect();
    let mut unclassified_seconds = 0.0;

    for (record, hold) in records.iter().zip(&holds) {
        let Some(value) = metric.value(record) else {
            continue;
        };
        match boundaries.iter().position(|b| b.contains(value)) {
            Some(slot) => {
                let acc = &mut accumulators[slot];
                acc.time_seconds += hold;
                acc.value_sum += value;
                acc.sample_count += 1;
            }
            None => unclassified_seconds += hold,
        }
    }

    let aggregates: Vec<ZoneAggregate> = boundaries
        .iter()
        .zip(&accumulators)
        .map(|(boundary, acc)| ZoneAggregate {
            zone_index: boundary.zone_index,
            time_seconds: acc.time_seconds,
            avg_value: (acc.sample_count > 0).then(|| acc.value_sum / acc.sample_count as f64),
            sample_count: acc.sample_count,
        })
        .collect();
    let classified_seconds = aggregates.iter().map(|a| a.time_seconds).sum();

    debug!(
        kind = ?kind,
        records = records.len(),
        classified_seconds,
        unclassified_seconds,
        "aggregated zones"
    );

    ZoneSummary {
        kind,
        boundaries: boundaries.to_vec(),
        aggregates,
        classified_seconds,
        unclassified_seconds,
    }
}

/// Problems found in a boundary set. Reported, never enforced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum BoundaryIssue {
    WrongCount { expected: usize, found: usize },
    /// Zone indices or minimums are not ascending
    Unordered { zone_index: u8 },
    /// Values between two zones belong to neither
    Gap { after_zone: u8, from: f64, to: f64 },
    /// Values in the overlap go to the earlier zone
    Overlap { after_zone: u8, from: f64, to: f64 },
    /// Only the last zone may be open-ended
    UnboundedBeforeLast { zone_index: u8 },
    /// `max` below `min`
    Inverted { zone_index: u8 },
}

impl std::fmt::Display for BoundaryIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BoundaryIssue::WrongCount { expected, found } => {
                write!(f, "expected {expected} zones, found {found}")
            }
            BoundaryIssue::Unordered { zone_index } => {
                write!(f, "zone {zone_index} is out of ascending order")
            }
            BoundaryIssue::Gap {
                after_zone,
                from,
                to,
            } => write!(f, "gap after zone {after_zone}: ({from}, {to}) is unclassified"),
            BoundaryIssue::Overlap {
                after_zone,
                from,
                to,
            } => write!(
                f,
                "overlap after zone {after_zone}: [{from}, {to}] classifies as zone {after_zone}"
            ),
            BoundaryIssue::UnboundedBeforeLast { zone_index } => {
                write!(f, "zone {zone_index} has no max but is not the last zone")
            }
            BoundaryIssue::Inverted { zone_index } => {
                write!(f, "zone {zone_index} has max below min")
            }
        }
    }
}

/// Diagnose a boundary set. Adjacent zones are expected to share their edge
/// value (`prev.max == next.min`).
pub fn validate_boundaries(boundaries: &[ZoneBoundary]) -> Vec<BoundaryIssue> {
    let mut issues = Vec::new();

    if boundaries.len() != ZONE_COUNT {
        issues.push(BoundaryIssue::WrongCount {
            expected: ZONE_COUNT,
            found: boundaries.len(),
        });
    }

    for boundary in boundaries {
        if boundary.max.is_some_and(|max| max < boundary.min) {
            issues.push(BoundaryIssue::Inverted {
                zone_index: boundary.zone_index,
            });
        }
    }

    for pair in boundaries.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);

        if next.zone_index <= prev.zone_index || next.min < prev.min {
            issues.push(BoundaryIssue::Unordered {
                zone_index: next.zone_index,
            });
        }

        match prev.max {
            None => issues.push(BoundaryIssue::UnboundedBeforeLast {
                zone_index: prev.zone_index,
            }),
            Some(max) if next.min > max => issues.push(BoundaryIssue::Gap {
                after_zone: prev.zone_index,
                from: max,
                to: next.min,
            }),
            Some(max) if next.min < max => issues.push(BoundaryIssue::Overlap {
                after_zone: prev.zone_index,
                from: next.min,
                to: max,
            }),
            Some(_) => {}
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    use crate::normalizer::records_duration;

    fn power_records(samples: &[(f64, Option<f64>)]) -> Vec<Record> {
        let start = Utc.with_ymd_and_hms(2024, 3, 2, 7, 0, 0).unwrap();
        samples
            .iter()
            .map(|&(t, power)| Record {
                timestamp: start + Duration::milliseconds((t * 1000.0) as i64),
                elapsed_seconds: t,
                distance_meters: t * 8.0,
                speed_mps: 8.0,
                heart_rate_bpm: None,
                power_watts: power,
                cadence_rpm: None,
                altitude_meters: None,
            })
            .collect()
    }

    fn example_boundaries() -> Vec<ZoneBoundary> {
        vec![
            ZoneBoundary::new(1, 0.0, Some(200.0)),
            ZoneBoundary::new(2, 200.0, Some(250.0)),
            ZoneBoundary::new(3, 250.0, Some(300.0)),
            ZoneBoundary::new(4, 300.0, Some(350.0)),
            ZoneBoundary::new(5, 350.0, None),
        ]
    }

    #[test]
    fn test_power_time_in_zone_example() {
        let records = power_records(&[
            (0.0, Some(180.0)),
            (60.0, Some(220.0)),
            (120.0, Some(260.0)),
            (180.0, Some(310.0)),
            (240.0, Some(360.0)),
            (300.0, Some(400.0)),
        ]);

        let summary = aggregate_zones(&records, ZoneKind::Power, &example_boundaries());
        let times: Vec<f64> = summary.aggregates.iter().map(|a| a.time_seconds).collect();
        assert_eq!(times, vec![60.0, 60.0, 60.0, 60.0, 120.0]);

        let averages: Vec<Option<f64>> = summary.aggregates.iter().map(|a| a.avg_value).collect();
        assert_eq!(
            averages,
            vec![Some(180.0), Some(220.0), Some(260.0), Some(310.0), Some(380.0)]
        );
        assert_eq!(summary.aggregates[4].sample_count, 2);
        assert!((summary.percent(5) - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_irregular_sampling_uses_actual_gaps() {
        let records = power_records(&[(0.0, Some(150.0)), (1.0, Some(150.0)), (11.0, Some(300.0))]);
        let summary = aggregate_zones(&records, ZoneKind::Power, &example_boundaries());
        // the second sample is held for 10 s, the last reuses that gap
        assert_eq!(summary.aggregates[0].time_seconds, 11.0);
        assert_eq!(summary.aggregates[2].time_seconds, 10.0);
    }

    #[test]
    fn test_zone_time_never_exceeds_duration() {
        let records = power_records(&[
            (0.0, Some(100.0)),
            (2.0, None),
            (3.0, Some(500.0)),
            (7.5, Some(-1.0)),
            (9.0, Some(220.0)),
        ]);
        let summary = aggregate_zones(&records, ZoneKind::Power, &example_boundaries());
        assert!(summary.total_seconds() <= records_duration(&records) + 1e-9);
        // the null sample counts nowhere, the negative one is unclassified
        assert_eq!(summary.unclassified_seconds, 1.5);
    }

    #[test]
    fn test_samples_below_first_zone_are_unclassified() {
        let boundaries = default_boundaries(ZoneKind::HeartRate, &ZoneConfig::default());
        assert_eq!(classify(80.0, &boundaries), None);
        assert_eq!(classify(95.0, &boundaries), Some(1));
        assert_eq!(classify(200.0, &boundaries), Some(5));
        assert_eq!(classify(f64::NAN, &boundaries), None);
    }

    #[test]
    fn test_empty_zones_report_no_average() {
        let records = power_records(&[(0.0, Some(100.0)), (5.0, Some(120.0))]);
        let summary = aggregate_zones(&records, ZoneKind::Power, &example_boundaries());
        assert_eq!(summary.aggregates.len(), 5);
        assert_eq!(summary.aggregates[3].time_seconds, 0.0);
        assert_eq!(summary.aggregates[3].avg_value, None);
        assert_eq!(summary.aggregates[3].sample_count, 0);
    }

    #[test]
    fn test_single_sample_holds_no_time() {
        let records = power_records(&[(0.0, Some(210.0))]);
        let summary = aggregate_zones(&records, ZoneKind::Power, &example_boundaries());
        assert_eq!(summary.aggregates[1].sample_count, 1);
        assert_eq!(summary.total_seconds(), 0.0);
        assert_eq!(summary.percent(2), 0.0);
    }

    #[test]
    fn test_overlapping_boundaries_resolve_first_match() {
        let boundaries = vec![
            ZoneBoundary::new(1, 0.0, Some(220.0)),
            ZoneBoundary::new(2, 200.0, Some(260.0)),
        ];
        assert_eq!(classify(210.0, &boundaries), Some(1));
        assert_eq!(classify(240.0, &boundaries), Some(2));
    }

    #[test]
    fn test_pace_zones_ascend_with_slower_pace() {
        let boundaries = default_boundaries(ZoneKind::Pace, &ZoneConfig::default());
        // threshold 300 s/km: 4:00/km is zone 1, 7:00/km is zone 5
        assert_eq!(classify(240.0, &boundaries), Some(1));
        assert_eq!(classify(300.0, &boundaries), Some(3));
        assert_eq!(classify(420.0, &boundaries), Some(5));
    }

    #[test]
    fn test_default_sets_are_well_formed() {
        let config = ZoneConfig::default();
        for kind in [ZoneKind::Power, ZoneKind::HeartRate, ZoneKind::Pace] {
            let boundaries = default_boundaries(kind, &config);
            assert_eq!(boundaries.len(), ZONE_COUNT);
            assert!(validate_boundaries(&boundaries).is_empty(), "{kind:?}");
        }
    }

    #[test]
    fn test_validate_reports_gaps_and_overlaps() {
        let boundaries = vec![
            ZoneBoundary::new(1, 0.0, Some(200.0)),
            ZoneBoundary::new(2, 210.0, Some(250.0)),
            ZoneBoundary::new(3, 240.0, None),
            ZoneBoundary::new(4, 300.0, Some(350.0)),
        ];

        let issues = validate_boundaries(&boundaries);
        assert_eq!(
            issues,
            vec![
                BoundaryIssue::WrongCount {
                    expected: 5,
                    found: 4
                },
                BoundaryIssue::Gap {
                    after_zone: 1,
                    from: 200.0,
                    to: 210.0
                },
                BoundaryIssue::Overlap {
                    after_zone: 2,
                    from: 240.0,
                    to: 250.0
                },
                BoundaryIssue::UnboundedBeforeLast { zone_index: 3 },
            ]
        );
    }

    #[test]
    fn test_configured_profile_wins_over_defaults() {
        use crate::config::ZoneProfile;

        let config = ZoneConfig {
            profiles: vec![ZoneProfile {
                kind: ZoneKind::Power,
                sport: Some("ride".to_string()),
                boundaries: example_boundaries(),
            }],
            ..Default::default()
        };

        assert_eq!(
            boundaries_for(ZoneKind::Power, &Sport::Ride, &config),
            example_boundaries()
        );
        assert_eq!(
            boundaries_for(ZoneKind::Power, &Sport::Run, &config),
            default_boundaries(ZoneKind::Power, &config)
        );
    }
}
