//! Source payload adapters
//!
//! This module provides adapters that map each raw payload kind to a
//! source-agnostic draft. Source quirks (enhanced fields, parallel streams,
//! lap index conventions) live here and nowhere else; the normalizer only ever
//! sees a `SourceDraft`.

mod cloud;
mod device;
mod manual;

pub use cloud::CloudAdapter;
pub use device::DeviceAdapter;
pub use manual::ManualAdapter;

use chrono::{DateTime, Utc};

use crate::types::{CanonicalLap, ManualStep, Source};

/// Trait for source payload adapters
pub trait PayloadAdapter {
    type Payload;

    /// Map a raw payload to a draft. Never fails: unusable pieces are left out
    /// and counted in `dropped_samples`.
    fn adapt(&self, payload: &Self::Payload) -> SourceDraft;
}

/// One sample before ordering, gap filling and derivation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DraftSample {
    pub timestamp: Option<DateTime<Utc>>,
    /// Offset from the activity start, used when `timestamp` is absent
    pub elapsed_seconds: Option<f64>,
    pub distance_meters: Option<f64>,
    pub speed_mps: Option<f64>,
    pub heart_rate_bpm: Option<f64>,
    pub power_watts: Option<f64>,
    pub cadence_rpm: Option<f64>,
    pub altitude_meters: Option<f64>,
}

/// Source-agnostic intermediate produced by every adapter
#[derive(Debug, Clone)]
pub struct SourceDraft {
    pub source: Source,
    pub sport_label: Option<String>,
    pub name: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub samples: Vec<DraftSample>,
    pub laps: Vec<CanonicalLap>,
    pub manual_steps: Vec<ManualStep>,
    pub total_distance_meters: Option<f64>,
    pub total_time_seconds: Option<f64>,
    pub dropped_samples: usize,
}

impl SourceDraft {
    pub fn empty(source: Source) -> Self {
        Self {
            source,
            sport_label: None,
            name: None,
            start_time: None,
            samples: Vec::new(),
            laps: Vec::new(),
            manual_steps: Vec::new(),
            total_distance_meters: None,
            total_time_seconds: None,
            dropped_samples: 0,
        }
    }
}
