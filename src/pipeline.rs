//! Pipeline orchestration
//!
//! An [`AnalyticsRequest`] captures every UI-driven parameter (smoothing knob,
//! zoom window, selected metrics, zone kind, layout, hover position) as a plain
//! value. [`compute`] turns a request and a normalized activity into an
//! [`AnalyticsResult`] without side effects.
//!
//! [`AnalyticsProcessor`] is the stateful owner for interactive use. It keeps
//! the loaded activity, memoizes each stage by the inputs it depends on, and
//! publishes every result as an immutable snapshot that any number of readers
//! can pick up, plus to callbacks registered with `on_result`.

use std::sync::{Arc, RwLock};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{AnalyticsConfig, ZoomConfig};
use crate::error::AnalyticsError;
use crate::normalizer::Normalizer;
use crate::scaler::{build_series, tooltip_at, ChartLayout, XAxis, XScale, ZoomRange};
use crate::schema::RawActivityPayload;
use crate::segmenter::{
    group_intervals, main_set_summary, IntervalGroup, IntervalSegmenter, MainSetSummary,
};
use crate::smoothing::{window_from_knob, SmoothedChannels};
use crate::types::{
    ActivityMeta, ChartSeries, Interval, Metric, NormalizedActivity, QualityFlag, TooltipData,
    ZoneKind,
};
use crate::zones::{aggregate_zones, boundaries_for, validate_boundaries, ZoneSummary};

/// Everything the caller controls, as one comparable value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsRequest {
    /// Smoothing knob in `[0, 1]`
    pub smoothing_knob: f64,
    pub zoom: ZoomRange,
    pub selected_metrics: Vec<Metric>,
    pub zone_kind: ZoneKind,
    pub layout: ChartLayout,
    /// Pointer x in pixels, if hovering
    pub hover_px: Option<f64>,
}

impl Default for AnalyticsRequest {
    fn default() -> Self {
        Self {
            smoothing_knob: 0.0,
            zoom: ZoomRange::full(),
            selected_metrics: vec![Metric::Power, Metric::HeartRate, Metric::Pace],
            zone_kind: ZoneKind::HeartRate,
            layout: ChartLayout::default(),
            hover_px: None,
        }
    }
}

impl AnalyticsRequest {
    pub fn from_json(json: &str) -> Result<Self, AnalyticsError> {
        let mut request: Self = serde_json::from_str(json)?;
        request.validate()?;
        request.zoom = ZoomRange::new(request.zoom.min_frac, request.zoom.max_frac);
        Ok(request)
    }

    pub fn validate(&self) -> Result<(), AnalyticsError> {
        let layout = &self.layout;
        let finite = [layout.left, layout.top, layout.width, layout.height]
            .iter()
            .all(|v| v.is_finite());
        if !finite || layout.width <= 0.0 || layout.height <= 0.0 {
            return Err(AnalyticsError::InvalidRequest(
                "layout must have a positive, finite size".to_string(),
            ));
        }
        if !self.smoothing_knob.is_finite() {
            return Err(AnalyticsError::InvalidRequest(
                "smoothing_knob must be a finite number".to_string(),
            ));
        }
        Ok(())
    }

    /// Moving-average window selected by the knob
    pub fn smoothing_window(&self) -> usize {
        window_from_knob(self.smoothing_knob)
    }

    /// Request after a drag release; narrow drags leave it unchanged
    pub fn with_drag(&self, start_px: f64, end_px: f64, zoom_config: &ZoomConfig) -> Self {
        match self
            .zoom
            .apply_drag(start_px, end_px, &self.layout, zoom_config.min_drag_fraction)
        {
            Some(zoom) => Self {
                zoom,
                ..self.clone()
            },
            None => self.clone(),
        }
    }

    pub fn with_zoom_reset(&self) -> Self {
        Self {
            zoom: ZoomRange::full(),
            ..self.clone()
        }
    }

    pub fn with_hover(&self, hover_px: Option<f64>) -> Self {
        Self {
            hover_px,
            ..self.clone()
        }
    }
}

/// Chart output; sources without a time series have nothing to plot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ChartState {
    Series {
        x_axis: XAxis,
        x_domain_max: f64,
        series: Vec<ChartSeries>,
    },
    NoChartData,
}

impl ChartState {
    pub fn series(&self) -> &[ChartSeries] {
        match self {
            ChartState::Series { series, .. } => series,
            ChartState::NoChartData => &[],
        }
    }

    pub fn has_data(&self) -> bool {
        matches!(self, ChartState::Series { .. })
    }
}

/// Renderer-ready output for one request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsResult {
    pub meta: ActivityMeta,
    pub quality_flags: Vec<QualityFlag>,
    pub smoothing_window: usize,
    pub zoom: ZoomRange,
    pub chart: ChartState,
    pub zones: ZoneSummary,
    pub intervals: Vec<Interval>,
    pub main_set: MainSetSummary,
    /// Intervals of similar effort for the selected zone metric
    pub groups: Vec<IntervalGroup>,
    pub tooltip: Option<TooltipData>,
}

#[derive(Debug, Clone, PartialEq)]
struct IntervalStage {
    intervals: Vec<Interval>,
    main_set: MainSetSummary,
}

#[derive(Debug, Clone, PartialEq)]
struct ZoneStage {
    summary: ZoneSummary,
    groups: Vec<IntervalGroup>,
}

fn interval_stage(activity: &NormalizedActivity, config: &AnalyticsConfig) -> IntervalStage {
    let intervals = IntervalSegmenter::segment(activity, &config.segmentation);
    let main_set = main_set_summary(&intervals);
    IntervalStage {
        intervals,
        main_set,
    }
}

fn zone_stage(
    activity: &NormalizedActivity,
    kind: ZoneKind,
    intervals: &[Interval],
    config: &AnalyticsConfig,
) -> ZoneStage {
    let boundaries = boundaries_for(kind, &activity.meta.sport, &config.zones);
    for issue in validate_boundaries(&boundaries) {
        warn!(kind = ?kind, %issue, "zone boundary issue, classifying by first match");
    }

    ZoneStage {
        summary: aggregate_zones(&activity.records, kind, &boundaries),
        groups: group_intervals(
            intervals,
            kind.metric(),
            config.segmentation.group_tolerance_fraction,
        ),
    }
}

fn smoothing_stage(activity: &NormalizedActivity, window: usize) -> SmoothedChannels {
    SmoothedChannels::compute(&activity.records, &Metric::ALL, window)
}

fn chart_stage(
    activity: &NormalizedActivity,
    smoothed: &SmoothedChannels,
    request: &AnalyticsRequest,
    config: &AnalyticsConfig,
) -> ChartState {
    if !activity.has_time_series() {
        return ChartState::NoChartData;
    }
    let x = XScale::for_records(&activity.records, request.zoom, request.layout);
    ChartState::Series {
        x_axis: x.axis,
        x_domain_max: x.domain_max,
        series: build_series(
            &activity.records,
            smoothed,
            &request.selected_metrics,
            &x,
            &config.chart,
        ),
    }
}

fn tooltip_stage(
    activity: &NormalizedActivity,
    smoothed: &SmoothedChannels,
    request: &AnalyticsRequest,
) -> Option<TooltipData> {
    let hover_px = request.hover_px?;
    if !activity.has_time_series() {
        return None;
    }
    let x = XScale::for_records(&activity.records, request.zoom, request.layout);
    tooltip_at(
        &activity.records,
        smoothed,
        &request.selected_metrics,
        &x,
        hover_px,
    )
}

#[allow(clippy::too_many_arguments)]
fn assemble(
    activity: &NormalizedActivity,
    request: &AnalyticsRequest,
    window: usize,
    chart: ChartState,
    intervals: &IntervalStage,
    zones: &ZoneStage,
    tooltip: Option<TooltipData>,
) -> AnalyticsResult {
    AnalyticsResult {
        meta: activity.meta.clone(),
        quality_flags: activity.quality_flags.clone(),
        smoothing_window: window,
        zoom: ZoomRange::new(request.zoom.min_frac, request.zoom.max_frac),
        chart,
        zones: zones.summary.clone(),
        intervals: intervals.intervals.clone(),
        main_set: intervals.main_set.clone(),
        groups: zones.groups.clone(),
        tooltip,
    }
}

/// Run every stage for one request. Pure: same inputs, same result.
pub fn compute(
    request: &AnalyticsRequest,
    activity: &NormalizedActivity,
    config: &AnalyticsConfig,
) -> AnalyticsResult {
    let window = request.smoothing_window();
    let intervals = interval_stage(activity, config);
    let zones = zone_stage(activity, request.zone_kind, &intervals.intervals, config);
    let smoothed = smoothing_stage(activity, window);
    let chart = chart_stage(activity, &smoothed, request, config);
    let tooltip = tooltip_stage(activity, &smoothed, request);
    assemble(activity, request, window, chart, &intervals, &zones, tooltip)
}

/// Normalize a payload and compute one request
pub fn analyze(
    payload: &RawActivityPayload,
    request: &AnalyticsRequest,
    config: &AnalyticsConfig,
) -> AnalyticsResult {
    let activity = Normalizer::normalize(payload);
    compute(request, &activity, config)
}

/// Stateless JSON entry point. A missing request uses the defaults.
pub fn analyze_json(
    payload_json: &str,
    request_json: Option<&str>,
    config: &AnalyticsConfig,
) -> Result<AnalyticsResult, AnalyticsError> {
    let payload = RawActivityPayload::from_json(payload_json)?;
    let request = match request_json {
        Some(json) => AnalyticsRequest::from_json(json)?,
        None => AnalyticsRequest::default(),
    };
    Ok(analyze(&payload, &request, config))
}

/// Hit/miss counters for one memoized stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StageStats {
    pub hits: u64,
    pub misses: u64,
}

/// Counters for every memoized stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub intervals: StageStats,
    pub zones: StageStats,
    pub smoothing: StageStats,
    pub chart: StageStats,
}

/// Single-entry memo holding the value for the most recent key
struct Memo<K, V> {
    entry: Option<(K, Arc<V>)>,
    stats: StageStats,
}

impl<K, V> Default for Memo<K, V> {
    fn default() -> Self {
        Self {
            entry: None,
            stats: StageStats::default(),
        }
    }
}

impl<K: PartialEq, V> Memo<K, V> {
    fn get_or_compute(&mut self, key: K, compute: impl FnOnce() -> V) -> Arc<V> {
        if let Some((cached, value)) = &self.entry {
            if *cached == key {
                self.stats.hits += 1;
                return Arc::clone(value);
            }
        }
        self.stats.misses += 1;
        let value = Arc::new(compute());
        self.entry = Some((key, Arc::clone(&value)));
        value
    }

    fn clear(&mut self) {
        self.entry = None;
    }
}

type ChartKey = (u64, usize, ZoomRange, Vec<Metric>, ChartLayout);

/// Read handle for the latest published result
#[derive(Clone, Default)]
pub struct SnapshotReader {
    inner: Arc<RwLock<Option<Arc<AnalyticsResult>>>>,
}

impl SnapshotReader {
    pub fn latest(&self) -> Option<Arc<AnalyticsResult>> {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn publish(&self, result: Arc<AnalyticsResult>) {
        let mut guard = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Some(result);
    }

    fn clear(&self) {
        let mut guard = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = None;
    }
}

/// Callback invoked with every published result
pub type ResultCallback = Box<dyn Fn(&Arc<AnalyticsResult>) + Send + Sync>;

/// Stateful processor with memoized stages.
///
/// Use this for interactive charts: hover moves, knob changes and drags only
/// recompute the stages whose inputs changed.
pub struct AnalyticsProcessor {
    config: AnalyticsConfig,
    activity: Option<Arc<NormalizedActivity>>,
    version: u64,
    intervals: Memo<u64, IntervalStage>,
    zones: Memo<(u64, ZoneKind), ZoneStage>,
    smoothing: Memo<(u64, usize), SmoothedChannels>,
    chart: Memo<ChartKey, ChartState>,
    snapshot: SnapshotReader,
    callbacks: Vec<ResultCallback>,
}

impl Default for AnalyticsProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalyticsProcessor {
    /// Create a new processor with default settings
    pub fn new() -> Self {
        Self::with_config(AnalyticsConfig::default())
    }

    pub fn with_config(config: AnalyticsConfig) -> Self {
        Self {
            config,
            activity: None,
            version: 0,
            intervals: Memo::default(),
            zones: Memo::default(),
            smoothing: Memo::default(),
            chart: Memo::default(),
            snapshot: SnapshotReader::default(),
            callbacks: Vec::new(),
        }
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    /// Replace the configuration and drop every cached stage
    pub fn set_config(&mut self, config: AnalyticsConfig) {
        self.config = config;
        self.intervals.clear();
        self.zones.clear();
        self.smoothing.clear();
        self.chart.clear();
    }

    /// Version of the loaded records; bumped by every load
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn activity(&self) -> Option<&NormalizedActivity> {
        self.activity.as_deref()
    }

    pub fn load_activity(&mut self, activity: NormalizedActivity) {
        self.version += 1;
        debug!(
            version = self.version,
            records = activity.records.len(),
            "loaded activity"
        );
        self.activity = Some(Arc::new(activity));
        self.snapshot.clear();
    }

    pub fn load_payload(&mut self, payload: &RawActivityPayload) {
        self.load_activity(Normalizer::normalize(payload));
    }

    pub fn load_json(&mut self, payload_json: &str) -> Result<(), AnalyticsError> {
        let payload = RawActivityPayload::from_json(payload_json)?;
        self.load_payload(&payload);
        Ok(())
    }

    /// Register a callback for every result this processor publishes
    pub fn on_result<F>(&mut self, callback: F)
    where
        F: Fn(&Arc<AnalyticsResult>) + Send + Sync + 'static,
    {
        self.callbacks.push(Box::new(callback));
    }

    /// Reader for the latest published result, usable from other threads
    pub fn reader(&self) -> SnapshotReader {
        self.snapshot.clone()
    }

    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            intervals: self.intervals.stats,
            zones: self.zones.stats,
            smoothing: self.smoothing.stats,
            chart: self.chart.stats,
        }
    }

    /// Compute and publish the result for a request
    pub fn compute(
        &mut self,
        request: &AnalyticsRequest,
    ) -> Result<Arc<AnalyticsResult>, AnalyticsError> {
        request.validate()?;
        let activity = self
            .activity
            .clone()
            .ok_or_else(|| AnalyticsError::InvalidRequest("no activity loaded".to_string()))?;

        let started = Instant::now();
        let version = self.version;
        let window = request.smoothing_window();
        let config = &self.config;

        let intervals = self
            .intervals
            .get_or_compute(version, || interval_stage(&activity, config));
        let zones = self
            .zones
            .get_or_compute((version, request.zone_kind), || {
                zone_stage(&activity, request.zone_kind, &intervals.intervals, config)
            });
        let smoothed = self
            .smoothing
            .get_or_compute((version, window), || smoothing_stage(&activity, window));
        let chart_key = (
            version,
            window,
            request.zoom,
            request.selected_metrics.clone(),
            request.layout,
        );
        let chart = self.chart.get_or_compute(chart_key, || {
            chart_stage(&activity, &smoothed, request, config)
        });
        let tooltip = tooltip_stage(&activity, &smoothed, request);

        let result = Arc::new(assemble(
            &activity,
            request,
            window,
            (*chart).clone(),
            &intervals,
            &zones,
            tooltip,
        ));

        debug!(
            version,
            window,
            elapsed_us = started.elapsed().as_micros() as u64,
            "computed analytics"
        );

        self.snapshot.publish(Arc::clone(&result));
        for callback in &self.callbacks {
            callback(&result);
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Run at 4 m/s sampled every 5 s, `samples` records long
    fn run_json(samples: usize) -> String {
        let records: Vec<serde_json::Value> = (0..samples)
            .map(|i| {
                json!({
                    "timestamp": 1_709_362_800 + (i as i64) * 5,
                    "distance": i as f64 * 20.0,
                    "speed": 4.0,
                    "heart_rate": 140 + (i % 20),
                    "power": 250 + (i % 10) * 5,
                    "altitude": 100.0 + (i % 7) as f64
                })
            })
            .collect();
        json!({
            "kind": "device",
            "sport": "running",
            "name": "Tempo run",
            "records": records
        })
        .to_string()
    }

    fn manual_json() -> &'static str {
        r#"{
            "kind": "manual",
            "sport": "Run",
            "start_time": "2024-03-02T07:00:00Z",
            "results": [
                {"name": "Warmup", "duration_seconds": 600, "distance_meters": 1500},
                {"name": "Tempo", "duration_seconds": 1200, "distance_meters": 4000}
            ]
        }"#
    }

    fn loaded_processor() -> AnalyticsProcessor {
        let mut processor = AnalyticsProcessor::new();
        processor.load_json(&run_json(106)).unwrap();
        processor
    }

    #[test]
    fn test_analyze_device_run() {
        let request = AnalyticsRequest {
            hover_px: Some(400.0),
            ..Default::default()
        };
        let result = analyze(
            &RawActivityPayload::from_json(&run_json(106)).unwrap(),
            &request,
            &AnalyticsConfig::default(),
        );

        // 2100 m: two full splits, the 100 m remainder is dropped
        assert_eq!(result.intervals.len(), 2);
        assert_eq!(result.main_set.interval_count, 2);
        assert!(result.chart.has_data());
        assert_eq!(result.chart.series().len(), 3);
        assert_eq!(result.zones.kind, ZoneKind::HeartRate);
        assert_eq!(result.zones.aggregates.len(), 5);
        assert!(result.zones.total_seconds() <= result.meta.total_time_seconds + 1e-9);
        assert!(result.tooltip.is_some());
        assert_eq!(result.smoothing_window, 1);
    }

    #[test]
    fn test_manual_log_has_no_chart_data() {
        let result = analyze_json(manual_json(), None, &AnalyticsConfig::default()).unwrap();

        assert_eq!(result.chart, ChartState::NoChartData);
        assert!(result.chart.series().is_empty());
        assert_eq!(result.intervals.len(), 2);
        assert_eq!(result.zones.total_seconds(), 0.0);
        assert!(result.quality_flags.contains(&QualityFlag::NoTimeSeries));
        assert!(result.tooltip.is_none());
    }

    #[test]
    fn test_analyze_json_rejects_bad_input() {
        let config = AnalyticsConfig::default();
        assert!(matches!(
            analyze_json("not json", None, &config),
            Err(AnalyticsError::Json(_))
        ));
        assert!(matches!(
            analyze_json(r#"{"kind": "satellite"}"#, None, &config),
            Err(AnalyticsError::UnsupportedPayload(_))
        ));
        assert!(matches!(
            analyze_json(
                manual_json(),
                Some(r#"{"layout": {"left": 0, "top": 0, "width": 0, "height": 100}}"#),
                &config
            ),
            Err(AnalyticsError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_processor_matches_pure_compute() {
        let mut processor = loaded_processor();
        let request = AnalyticsRequest {
            smoothing_knob: 0.5,
            zoom: ZoomRange::new(0.2, 0.7),
            hover_px: Some(123.0),
            ..Default::default()
        };

        let cached = processor.compute(&request).unwrap();
        let activity = processor.activity().unwrap();
        let pure = compute(&request, activity, processor.config());
        assert_eq!(*cached, pure);
    }

    #[test]
    fn test_hover_only_change_reuses_every_stage() {
        let mut processor = loaded_processor();
        let request = AnalyticsRequest::default();
        processor.compute(&request).unwrap();
        let before = processor.cache_stats();

        for px in [100.0, 200.0, 300.0] {
            let result = processor.compute(&request.with_hover(Some(px))).unwrap();
            assert!(result.tooltip.is_some());
        }

        let after = processor.cache_stats();
        assert_eq!(after.intervals.misses, before.intervals.misses);
        assert_eq!(after.zones.misses, before.zones.misses);
        assert_eq!(after.smoothing.misses, before.smoothing.misses);
        assert_eq!(after.chart.misses, before.chart.misses);
        assert_eq!(after.chart.hits, before.chart.hits + 3);
    }

    #[test]
    fn test_knob_change_recomputes_smoothing_and_chart_only() {
        let mut processor = loaded_processor();
        let request = AnalyticsRequest::default();
        processor.compute(&request).unwrap();

        let smoother = AnalyticsRequest {
            smoothing_knob: 1.0,
            ..request.clone()
        };
        let result = processor.compute(&smoother).unwrap();
        assert_eq!(result.smoothing_window, 20);

        let stats = processor.cache_stats();
        assert_eq!(stats.intervals, StageStats { hits: 1, misses: 1 });
        assert_eq!(stats.zones, StageStats { hits: 1, misses: 1 });
        assert_eq!(stats.smoothing, StageStats { hits: 0, misses: 2 });
        assert_eq!(stats.chart, StageStats { hits: 0, misses: 2 });
    }

    #[test]
    fn test_reload_bumps_version_and_invalidates() {
        let mut processor = loaded_processor();
        let request = AnalyticsRequest::default();
        let first = processor.compute(&request).unwrap();
        assert_eq!(processor.version(), 1);

        processor.load_json(&run_json(56)).unwrap();
        assert_eq!(processor.version(), 2);
        assert!(processor.reader().latest().is_none());

        let second = processor.compute(&request).unwrap();
        assert_eq!(first.intervals.len(), 2);
        assert_eq!(second.intervals.len(), 1);
        assert_eq!(processor.cache_stats().intervals.misses, 2);
    }

    #[test]
    fn test_snapshot_reader_and_callbacks() {
        let mut processor = loaded_processor();
        let reader = processor.reader();
        assert!(reader.latest().is_none());

        let published = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&published);
        processor.on_result(move |result| {
            assert!(result.chart.has_data());
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let result = processor.compute(&AnalyticsRequest::default()).unwrap();
        processor.compute(&AnalyticsRequest::default()).unwrap();

        assert_eq!(published.load(Ordering::SeqCst), 2);
        let latest = std::thread::spawn(move || reader.latest())
            .join()
            .unwrap()
            .unwrap();
        assert_eq!(latest.intervals, result.intervals);
    }

    #[test]
    fn test_compute_without_activity_is_an_error() {
        let mut processor = AnalyticsProcessor::new();
        let err = processor.compute(&AnalyticsRequest::default()).unwrap_err();
        assert!(matches!(err, AnalyticsError::InvalidRequest(_)));
    }

    #[test]
    fn test_drag_updates_request_zoom() {
        let zoom_config = ZoomConfig::default();
        let request = AnalyticsRequest::default();

        // 5% of the default 800 px layout is 40 px
        assert_eq!(request.with_drag(100.0, 130.0, &zoom_config), request);

        let zoomed = request.with_drag(200.0, 600.0, &zoom_config);
        assert_eq!(zoomed.zoom, ZoomRange::new(0.25, 0.75));
        assert_eq!(zoomed.with_zoom_reset().zoom, ZoomRange::full());
    }

    #[test]
    fn test_inverted_zoom_is_reordered() {
        let json =
            r#"{"zoom": {"min_frac": 0.9, "max_frac": 0.1}, "selected_metrics": ["power"]}"#;
        let request = AnalyticsRequest::from_json(json).unwrap();
        assert_eq!(request.zoom, ZoomRange::new(0.1, 0.9));

        let result = analyze_json(&run_json(106), Some(json), &AnalyticsConfig::default()).unwrap();
        assert_eq!(result.zoom, ZoomRange::new(0.1, 0.9));
        assert!(!result.chart.series()[0].points.is_empty());

        // struct-built requests are sanitized at the scale
        let inverted = AnalyticsRequest {
            zoom: ZoomRange {
                min_frac: 0.9,
                max_frac: 0.1,
            },
            ..request
        };
        let payload = RawActivityPayload::from_json(&run_json(106)).unwrap();
        let activity = Normalizer::normalize(&payload);
        let direct = compute(&inverted, &activity, &AnalyticsConfig::default());
        assert_eq!(direct, result);
    }

    #[test]
    fn test_request_json_defaults() {
        let request =
            AnalyticsRequest::from_json(r#"{"smoothing_knob": 0.25, "zone_kind": "power"}"#)
                .unwrap();
        assert_eq!(request.smoothing_window(), 6);
        assert_eq!(request.zone_kind, ZoneKind::Power);
        assert_eq!(request.zoom, ZoomRange::full());
        assert_eq!(request.selected_metrics.len(), 3);
    }
}
