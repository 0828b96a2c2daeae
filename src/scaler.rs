//! Metric scaling and chart coordinate mapping
//!
//! The x axis covers the activity's total distance (elapsed time for
//! activities that never moved) through a fractional zoom window. Each metric
//! gets its own y scale, fitted to that metric's full series, so overlaid
//! series share the chart height proportionally rather than on a common
//! absolute scale.

use serde::{Deserialize, Serialize};

use crate::config::ChartConfig;
use crate::smoothing::{extract_channel, SmoothedChannels};
use crate::types::{ChartPoint, ChartSeries, Metric, Record, TooltipData, TooltipValue};

/// Chart plot area in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartLayout {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Default for ChartLayout {
    fn default() -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            width: 800.0,
            height: 300.0,
        }
    }
}

impl ChartLayout {
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }
}

/// Visible fraction `[min_frac, max_frac]` of the x domain
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomRange {
    pub min_frac: f64,
    pub max_frac: f64,
}

impl Default for ZoomRange {
    fn default() -> Self {
        Self::full()
    }
}

impl ZoomRange {
    pub fn full() -> Self {
        Self {
            min_frac: 0.0,
            max_frac: 1.0,
        }
    }

    /// Clamped into `[0, 1]` and ordered; an empty or non-finite range resets
    /// to the full domain
    pub fn new(min_frac: f64, max_frac: f64) -> Self {
        if !(min_frac.is_finite() && max_frac.is_finite()) {
            return Self::full();
        }
        let lo = min_frac.min(max_frac).clamp(0.0, 1.0);
        let hi = min_frac.max(max_frac).clamp(0.0, 1.0);
        if hi <= lo {
            return Self::full();
        }
        Self {
            min_frac: lo,
            max_frac: hi,
        }
    }

    pub fn width(&self) -> f64 {
        self.max_frac - self.min_frac
    }

    pub fn is_full(&self) -> bool {
        *self == Self::full()
    }

    /// Zoom into a pixel drag selection inside the current window. Selections
    /// no wider than `min_drag_fraction` of the chart width are treated as
    /// clicks and return `None`.
    pub fn apply_drag(
        &self,
        start_px: f64,
        end_px: f64,
        layout: &ChartLayout,
        min_drag_fraction: f64,
    ) -> Option<ZoomRange> {
        if layout.width <= 0.0 || !start_px.is_finite() || !end_px.is_finite() {
            return None;
        }
        let a = start_px.min(end_px).clamp(layout.left, layout.right());
        let b = start_px.max(end_px).clamp(layout.left, layout.right());
        if b - a <= min_drag_fraction * layout.width {
            return None;
        }

        let span = self.width();
        let from = (a - layout.left) / layout.width;
        let to = (b - layout.left) / layout.width;
        Some(ZoomRange::new(
            self.min_frac + from * span,
            self.min_frac + to * span,
        ))
    }
}

/// What the x axis measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum XAxis {
    Distance,
    Time,
}

impl XAxis {
    pub fn value(&self, record: &Record) -> f64 {
        match self {
            XAxis::Distance => record.distance_meters,
            XAxis::Time => record.elapsed_seconds,
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            XAxis::Distance => "m",
            XAxis::Time => "s",
        }
    }
}

/// Domain → pixel mapping for the x axis under a zoom window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct XScale {
    pub axis: XAxis,
    pub domain_max: f64,
    pub zoom: ZoomRange,
    pub layout: ChartLayout,
}

impl XScale {
    pub fn new(axis: XAxis, domain_max: f64, zoom: ZoomRange, layout: ChartLayout) -> Self {
        Self {
            axis,
            domain_max,
            zoom: ZoomRange::new(zoom.min_frac, zoom.max_frac),
            layout,
        }
    }

    /// Distance axis when the activity moved, elapsed time otherwise
    pub fn for_records(records: &[Record], zoom: ZoomRange, layout: ChartLayout) -> Self {
        let distance = records.last().map_or(0.0, |r| r.distance_meters);
        if distance > 0.0 {
            Self::new(XAxis::Distance, distance, zoom, layout)
        } else {
            let elapsed = records.last().map_or(0.0, |r| r.elapsed_seconds);
            Self::new(XAxis::Time, elapsed, zoom, layout)
        }
    }

    /// Visible domain interval
    pub fn visible(&self) -> (f64, f64) {
        (
            self.zoom.min_frac * self.domain_max,
            self.zoom.max_frac * self.domain_max,
        )
    }

    /// Pixel x for a domain value, `None` when it is outside the zoom window
    pub fn scale(&self, value: f64) -> Option<f64> {
        let (lo, hi) = self.visible();
        if hi <= lo || !value.is_finite() || value < lo || value > hi {
            return None;
        }
        Some(self.layout.left + (value - lo) / (hi - lo) * self.layout.width)
    }

    /// Domain value under a pixel x, `None` outside the plot area
    pub fn invert(&self, px: f64) -> Option<f64> {
        let (lo, hi) = self.visible();
        if hi <= lo || self.layout.width <= 0.0 {
            return None;
        }
        if !px.is_finite() || px < self.layout.left || px > self.layout.right() {
            return None;
        }
        Some(lo + (px - self.layout.left) / self.layout.width * (hi - lo))
    }

    pub fn record_px(&self, record: &Record) -> Option<f64> {
        self.scale(self.axis.value(record))
    }
}

/// Lower bound of a metric's y scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum YBaseline {
    /// `[0, max]`
    Zero,
    /// `[fraction × max, max]`, values below the bound sit on the bottom edge
    FractionOfMax { fraction: f64 },
    /// `[min, max]`
    Range,
}

impl YBaseline {
    pub fn default_for(metric: Metric) -> Self {
        match metric {
            Metric::Altitude => YBaseline::Range,
            _ => YBaseline::Zero,
        }
    }
}

/// Value → pixel mapping for one metric, larger values higher
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YScale {
    pub lo: f64,
    pub hi: f64,
    pub layout: ChartLayout,
}

impl YScale {
    /// Fit a scale to a series, `None` when it has no values
    pub fn fit(
        values: impl IntoIterator<Item = f64>,
        baseline: YBaseline,
        layout: ChartLayout,
    ) -> Option<Self> {
        let (min, max) = values
            .into_iter()
            .filter(|v| v.is_finite())
            .fold(None, |acc: Option<(f64, f64)>, v| match acc {
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
                None => Some((v, v)),
            })?;

        let lo = match baseline {
            YBaseline::Zero => 0.0,
            YBaseline::FractionOfMax { fraction } => fraction * max,
            YBaseline::Range => min,
        };
        Some(Self { lo, hi: max, layout })
    }

    pub fn scale(&self, value: f64) -> f64 {
        let span = self.hi - self.lo;
        if span <= 0.0 {
            return self.layout.bottom();
        }
        let t = ((value - self.lo) / span).clamp(0.0, 1.0);
        self.layout.bottom() - t * self.layout.height
    }
}

fn channel_for(records: &[Record], smoothed: &SmoothedChannels, metric: Metric) -> Vec<Option<f64>> {
    smoothed
        .get(metric)
        .cloned()
        .unwrap_or_else(|| extract_channel(records, metric))
}

/// Pixel series for each metric; points outside the zoom window are omitted
pub fn build_series(
    records: &[Record],
    smoothed: &SmoothedChannels,
    metrics: &[Metric],
    x: &XScale,
    chart: &ChartConfig,
) -> Vec<ChartSeries> {
    metrics
        .iter()
        .map(|&metric| {
            let channel = channel_for(records, smoothed, metric);
            let points = match YScale::fit(
                channel.iter().flatten().copied(),
                chart.baseline_for(metric),
                x.layout,
            ) {
                Some(y) => records
                    .iter()
                    .zip(&channel)
                    .filter_map(|(record, value)| {
                        let value = (*value)?;
                        let px = x.record_px(record)?;
                        Some(ChartPoint {
                            x: px,
                            y: y.scale(value),
                        })
                    })
                    .collect(),
                None => Vec::new(),
            };

            ChartSeries {
                metric,
                unit: metric.unit().to_string(),
                points,
            }
        })
        .collect()
}

/// Sample nearest a hover pixel, snapped to that sample's x
pub fn tooltip_at(
    records: &[Record],
    smoothed: &SmoothedChannels,
    metrics: &[Metric],
    x: &XScale,
    hover_px: f64,
) -> Option<TooltipData> {
    let target = x.invert(hover_px)?;
    let idx = records.partition_point(|r| x.axis.value(r) < target);

    let (record_index, x_px) = [idx.checked_sub(1), Some(idx)]
        .into_iter()
        .flatten()
        .filter_map(|i| {
            let px = x.record_px(records.get(i)?)?;
            Some((i, px))
        })
        .min_by(|a, b| (a.1 - hover_px).abs().total_cmp(&(b.1 - hover_px).abs()))?;

    let record = &records[record_index];
    let values = metrics
        .iter()
        .map(|&metric| {
            let raw = metric.value(record);
            let smoothed_value = smoothed
                .get(metric)
                .and_then(|channel| channel.get(record_index).copied().flatten())
                .or(raw);
            TooltipValue {
                metric,
                unit: metric.unit().to_string(),
                raw,
                smoothed: smoothed_value,
            }
        })
        .collect();

    Some(TooltipData {
        record_index,
        x_px,
        timestamp: record.timestamp,
        elapsed_seconds: record.elapsed_seconds,
        distance_meters: record.distance_meters,
        values,
    })
}
