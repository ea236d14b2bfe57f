//! Live camera sampling loop.
//!
//! `LiveWatch` owns the state of the live flow: the streaming state machine,
//! the current detection list, the alert log, and the cooldown gate. The
//! driving binary supplies the timer and the clock; the controller never
//! reads ambient time for gating, which keeps the cooldown testable.
//!
//! Each tick runs the full capture -> encode -> post -> apply chain
//! synchronously, so responses apply in capture order by construction; a
//! request that overruns the sampling interval delays the next tick instead
//! of overlapping it.

use anyhow::{anyhow, Result};

use crate::capture::CameraSource;
use crate::frame::Frame;
use crate::service::{Detection, DetectionClient, FrameSource, ProcessResponse};
use crate::watch::AlertPolicy;
use crate::{dedupe_by_label, Alert, AlertGate, AlertLog, AlertStamp};

/// Streaming state of the live flow.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WatchState {
    #[default]
    Idle,
    Streaming,
}

/// Controller for the live-watch flow.
pub struct LiveWatch {
    policy: AlertPolicy,
    raster_width: u32,
    raster_height: u32,
    state: WatchState,
    gate: AlertGate,
    detections: Vec<Detection>,
    alerts: AlertLog,
    ticks: u64,
}

impl LiveWatch {
    pub fn new(policy: AlertPolicy, raster_width: u32, raster_height: u32) -> Self {
        let gate = AlertGate::new(policy.cooldown_ms);
        Self {
            policy,
            raster_width,
            raster_height,
            state: WatchState::Idle,
            gate,
            detections: Vec::new(),
            alerts: AlertLog::new(),
            ticks: 0,
        }
    }

    pub fn start(&mut self) {
        self.state = WatchState::Streaming;
    }

    pub fn stop(&mut self) {
        self.state = WatchState::Idle;
    }

    pub fn state(&self) -> WatchState {
        self.state
    }

    /// Latest frame's detections, as returned by the service.
    pub fn detections(&self) -> &[Detection] {
        &self.detections
    }

    /// Latest detections deduplicated by class label, for display.
    pub fn current_detections(&self) -> Vec<Detection> {
        dedupe_by_label(&self.detections)
    }

    pub fn alerts(&self) -> &AlertLog {
        &self.alerts
    }

    pub fn alerts_mut(&mut self) -> &mut AlertLog {
        &mut self.alerts
    }

    /// Ticks attempted since start (including frames that were skipped).
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// One sampling tick: capture the current camera frame, post it, and
    /// apply the result. Returns the raised alert, if any.
    ///
    /// `now_ms` is the caller's monotonic clock; it feeds the cooldown gate
    /// and the alert identifier. Errors mean "this frame was skipped" - the
    /// caller logs and keeps ticking.
    pub fn tick(
        &mut self,
        camera: &mut CameraSource,
        client: &DetectionClient,
        siren: &mut dyn crate::notify::Siren,
        now_ms: u64,
    ) -> Result<Option<Alert>> {
        if self.state != WatchState::Streaming {
            return Ok(None);
        }
        self.ticks += 1;
        let frame = camera.next_frame()?;
        let response = self.post_frame(&frame, client)?;
        self.apply_response(response, now_ms, siren)
    }

    fn post_frame(&self, frame: &Frame, client: &DetectionClient) -> Result<ProcessResponse> {
        let raster = frame.to_raster(self.raster_width, self.raster_height);
        let image = raster.to_data_url()?;
        client.process_frame(&image, FrameSource::Webcam)
    }

    /// Apply one service response to the detection and alert state.
    ///
    /// Split out of `tick` so the state transitions are testable without a
    /// camera or a network.
    pub fn apply_response(
        &mut self,
        response: ProcessResponse,
        now_ms: u64,
        siren: &mut dyn crate::notify::Siren,
    ) -> Result<Option<Alert>> {
        if !response.success {
            return Err(anyhow!(
                "service reported failure: {}",
                response.error.as_deref().unwrap_or("unspecified")
            ));
        }

        self.detections = response.detections;

        let Some(hit) = self.policy.first_match(&self.detections) else {
            return Ok(None);
        };
        if !self.gate.accept(now_ms) {
            return Ok(None);
        }

        siren.ring();
        let alert = self
            .alerts
            .raise(
                now_ms,
                &hit.label,
                hit.confidence,
                &response.processed_image,
                AlertStamp::now(),
            )
            .clone();
        Ok(Some(alert))
    }
}
