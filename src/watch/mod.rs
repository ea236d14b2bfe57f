//! Sampling-loop controllers.
//!
//! The two flows of the client live here:
//! - `live`: fixed-interval camera sampling (Idle -> Streaming -> Idle)
//! - `scan`: seek-driven video file sampling (Idle -> Processing -> done)
//!
//! Both loops share the alert policy and cooldown gate logic but keep
//! independent gate state; an alert in one flow never suppresses the other.

pub mod live;
pub mod scan;

pub use live::{LiveWatch, WatchState};
pub use scan::{ScanConfig, ScanOutcome, ScanProgress, ScanReport, VideoScan};

use crate::service::Detection;

/// Which detections qualify for an alert, and how often alerts may fire.
#[derive(Clone, Debug)]
pub struct AlertPolicy {
    /// Class label that qualifies (exact match).
    pub label: String,
    /// Alerts require confidence strictly above this (0-100).
    pub confidence_threshold: f32,
    /// Minimum spacing between accepted alerts.
    pub cooldown_ms: u64,
}

impl Default for AlertPolicy {
    fn default() -> Self {
        Self {
            label: "Gun".to_string(),
            confidence_threshold: 40.0,
            cooldown_ms: 5000,
        }
    }
}

impl AlertPolicy {
    /// First detection in a frame that qualifies for an alert.
    pub fn first_match<'a>(&self, detections: &'a [Detection]) -> Option<&'a Detection> {
        detections
            .iter()
            .find(|d| d.label == self.label && d.confidence > self.confidence_threshold)
    }
}
