//! gunwatch
//!
//! This crate implements a headless client for a remote weapon-detection
//! service. Frames are sampled from a camera stream or a local video file,
//! encoded as base64 data URLs, and posted to the service's `/stream`
//! endpoint; the returned detections drive an alert list with a cooldown
//! gate and per-class statistics.
//!
//! # Architecture
//!
//! Two flows share one downstream collaborator:
//!
//! 1. **Live watch** (`watch::live`): fixed-interval sampling from a camera
//!    source, tagged `webcam`.
//! 2. **Video scan** (`watch::scan`): seek-driven sampling through a video
//!    file at a fixed media-time step, tagged `video`, with progress and a
//!    final per-class summary.
//!
//! All inference happens on the remote service; this crate never runs a
//! model. Per-frame failures degrade to "skip this frame" - neither flow
//! retries or aborts on a bad response.
//!
//! # Module Structure
//!
//! - `capture`: frame sources (HTTP cameras, video files, stubs)
//! - `service`: the detection HTTP client and wire types
//! - `watch`: the two sampling-loop controllers
//! - `frame`: raster frames and data-URL encoding
//! - Core types: Alert, AlertLog, AlertGate, ClassStats

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};

use crate::service::Detection;

pub mod capture;
pub mod config;
pub mod frame;
pub mod notify;
pub mod service;
pub mod ui;
pub mod watch;

pub use capture::{camera::CameraConfig, CameraSource};
pub use capture::{video::VideoConfig, VideoSource};
pub use config::WatchConfig;
pub use frame::Frame;
pub use notify::{Siren, StubSiren, TerminalBell};
pub use service::{DetectionClient, FrameSource, ProcessResponse};
pub use watch::{AlertPolicy, LiveWatch, ScanReport, VideoScan, WatchState};

// -------------------- Alert timestamps --------------------

/// When an alert was raised.
///
/// Live-watch alerts carry wall-clock time; video-scan alerts carry the
/// media offset of the sampled frame instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlertStamp {
    Wall(DateTime<Utc>),
    Media { offset_ms: u64 },
}

impl AlertStamp {
    pub fn now() -> Self {
        AlertStamp::Wall(Utc::now())
    }

    pub fn media(offset_ms: u64) -> Self {
        AlertStamp::Media { offset_ms }
    }

    /// ISO-8601 form with colons replaced by dashes, for use in filenames.
    ///
    /// Media stamps are rendered as an offset from the epoch, matching the
    /// filename shape of wall-clock stamps.
    pub fn filename_stamp(&self) -> String {
        let iso = match self {
            AlertStamp::Wall(ts) => ts.to_rfc3339_opts(SecondsFormat::Millis, true),
            AlertStamp::Media { offset_ms } => match Utc.timestamp_millis_opt(*offset_ms as i64) {
                chrono::LocalResult::Single(ts) => ts.to_rfc3339_opts(SecondsFormat::Millis, true),
                _ => format!("{}ms", offset_ms),
            },
        };
        iso.replace(':', "-")
    }

    /// Human-readable form: RFC 3339 for wall clocks, `mm:ss` for media
    /// offsets.
    pub fn display(&self) -> String {
        match self {
            AlertStamp::Wall(ts) => ts.to_rfc3339_opts(SecondsFormat::Secs, true),
            AlertStamp::Media { offset_ms } => {
                let total_secs = offset_ms / 1000;
                format!("{:02}:{:02}", total_secs / 60, total_secs % 60)
            }
        }
    }
}

// -------------------- Alerts --------------------

/// A raised weapon alert. Session lifetime only; never persisted.
#[derive(Clone, Debug)]
pub struct Alert {
    /// Time-derived identifier ("alert-<ms>").
    pub id: String,
    /// Detected class label.
    pub label: String,
    /// Confidence of the triggering detection (0-100).
    pub confidence: f32,
    /// Annotated still frame as returned by the service (data URL).
    pub image: String,
    pub stamp: AlertStamp,
}

/// Ordered alert list, strictly newest-first.
#[derive(Clone, Debug, Default)]
pub struct AlertLog {
    alerts: Vec<Alert>,
}

impl AlertLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and prepend an alert. The identifier derives from the clock
    /// value that passed the cooldown gate.
    pub fn raise(
        &mut self,
        clock_ms: u64,
        label: &str,
        confidence: f32,
        image: &str,
        stamp: AlertStamp,
    ) -> &Alert {
        let alert = Alert {
            id: format!("alert-{}", clock_ms),
            label: label.to_string(),
            confidence,
            image: image.to_string(),
            stamp,
        };
        self.alerts.insert(0, alert);
        &self.alerts[0]
    }

    /// Remove exactly the alert with the given identifier, preserving the
    /// relative order of the rest. Returns false when no alert matched.
    pub fn dismiss(&mut self, id: &str) -> bool {
        let before = self.alerts.len();
        self.alerts.retain(|alert| alert.id != id);
        self.alerts.len() != before
    }

    pub fn dismiss_all(&mut self) {
        self.alerts.clear();
    }

    /// Most recent alert, if any.
    pub fn latest(&self) -> Option<&Alert> {
        self.alerts.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Alert> {
        self.alerts.iter()
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }
}

// -------------------- Alert cooldown gate --------------------

/// Rate limit between accepted alerts.
///
/// The gate is a pure function of the clock value passed in; it reads no
/// ambient time source. Each sampling loop owns an independent gate - a
/// live-watch alert never suppresses a scan alert or vice versa.
#[derive(Clone, Debug)]
pub struct AlertGate {
    cooldown_ms: u64,
    last_alert_ms: Option<u64>,
}

impl AlertGate {
    pub fn new(cooldown_ms: u64) -> Self {
        Self {
            cooldown_ms,
            last_alert_ms: None,
        }
    }

    /// Accept iff more than the cooldown has elapsed since the last accepted
    /// alert (or none has been accepted yet). Updates the stored last-alert
    /// time on acceptance.
    ///
    /// `now_ms` must be monotonically non-decreasing across calls.
    pub fn accept(&mut self, now_ms: u64) -> bool {
        if let Some(last) = self.last_alert_ms {
            if now_ms.saturating_sub(last) <= self.cooldown_ms {
                return false;
            }
        }
        self.last_alert_ms = Some(now_ms);
        true
    }

    pub fn last_alert_ms(&self) -> Option<u64> {
        self.last_alert_ms
    }
}

// -------------------- Detection state --------------------

/// Deduplicate a frame's detections by class label for display.
///
/// The last detection per label wins, matching the replace-on-insert
/// semantics of the display view.
pub fn dedupe_by_label(detections: &[Detection]) -> Vec<Detection> {
    let mut by_label: BTreeMap<&str, &Detection> = BTreeMap::new();
    for detection in detections {
        if !detection.label.is_empty() {
            by_label.insert(detection.label.as_str(), detection);
        }
    }
    by_label.into_values().cloned().collect()
}

// -------------------- Class statistics --------------------

/// Per-class count and average confidence, derived from the accumulated
/// totals at summary time.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassSummary {
    pub label: String,
    pub count: u64,
    pub avg_confidence: f64,
}

/// Running per-class detection statistics for the scan flow.
///
/// Only accumulated counts and confidence sums are stored; averages are
/// recomputed deterministically from them, so repeated `summary()` calls on
/// the same inputs always agree.
#[derive(Clone, Debug, Default)]
pub struct ClassStats {
    totals: BTreeMap<String, ClassTotals>,
}

#[derive(Clone, Debug, Default)]
struct ClassTotals {
    count: u64,
    total_confidence: f64,
}

impl ClassStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, detection: &Detection) {
        let totals = self.totals.entry(detection.label.clone()).or_default();
        totals.count += 1;
        totals.total_confidence += f64::from(detection.confidence);
    }

    pub fn record_all(&mut self, detections: &[Detection]) {
        for detection in detections {
            self.record(detection);
        }
    }

    pub fn summary(&self) -> Vec<ClassSummary> {
        self.totals
            .iter()
            .map(|(label, totals)| ClassSummary {
                label: label.clone(),
                count: totals.count,
                avg_confidence: totals.total_confidence / totals.count as f64,
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
