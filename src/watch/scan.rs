//! Video file sampling loop.
//!
//! `VideoScan` walks a file's media timeline at a fixed step, posting one
//! frame per timestamp and accumulating per-class statistics. The loop is a
//! restartable, finite sequence of steps: each iteration checks the stop
//! flag, runs the full seek -> encode -> post -> apply chain, and yields
//! briefly before advancing. Cancellation is cooperative and only observed
//! at step boundaries, never mid-request.
//!
//! The media timestamp doubles as the cooldown-gate clock, so alert spacing
//! is deterministic for a given file and detection sequence regardless of
//! how fast the service responds.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{anyhow, Result};

use crate::capture::VideoSource;
use crate::notify::Siren;
use crate::service::{DetectionClient, FrameSource};
use crate::watch::AlertPolicy;
use crate::{AlertGate, AlertLog, AlertStamp, ClassStats, ClassSummary};

/// Configuration for a video scan.
#[derive(Clone, Debug)]
pub struct ScanConfig {
    /// Media-time step between sampled frames.
    pub step_ms: u64,
    /// Sources wider than this sample at twice the step.
    pub hires_width: u32,
    /// Raster surface the sampled frames are drawn onto.
    pub raster_width: u32,
    pub raster_height: u32,
    /// Pause between frames to keep the process responsive.
    pub frame_delay_ms: u64,
    pub policy: AlertPolicy,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            step_ms: 1000,
            hires_width: 1280,
            raster_width: 640,
            raster_height: 480,
            frame_delay_ms: 10,
            policy: AlertPolicy::default(),
        }
    }
}

/// Progress of a running scan.
#[derive(Clone, Copy, Debug)]
pub struct ScanProgress {
    /// Elapsed media time over duration, 0-100.
    pub percent: f64,
    /// Frames attempted so far (1-based once the first frame starts).
    pub processed: u64,
    /// Scheduled frame count for the whole file.
    pub total: u64,
}

/// How a scan ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanOutcome {
    Completed,
    Cancelled,
}

/// Final state of a scan, computed from the accumulated stats whichever way
/// the loop ended.
#[derive(Debug)]
pub struct ScanReport {
    pub outcome: ScanOutcome,
    pub summary: Vec<ClassSummary>,
    pub alerts: AlertLog,
    pub frames_processed: u64,
    pub frames_failed: u64,
    pub total_frames: u64,
    pub percent: f64,
}

/// Controller for the video-scan flow.
pub struct VideoScan {
    config: ScanConfig,
}

impl VideoScan {
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    /// Effective sampling step for a source of the given width.
    pub fn step_ms_for(&self, source_width: u32) -> u64 {
        if source_width > self.config.hires_width {
            self.config.step_ms * 2
        } else {
            self.config.step_ms
        }
    }

    /// Run the scan to completion or cancellation.
    ///
    /// Detections, alerts, stats and progress all start from zero on every
    /// run. Per-frame failures are logged, contribute nothing, and the loop
    /// proceeds to the next timestamp.
    pub fn run(
        &self,
        source: &mut VideoSource,
        client: &DetectionClient,
        siren: &mut dyn Siren,
        stop: &AtomicBool,
        on_progress: &mut dyn FnMut(&ScanProgress),
    ) -> Result<ScanReport> {
        let duration_ms = source.duration_secs() * 1000.0;
        if duration_ms <= 0.0 {
            return Err(anyhow!("video reports zero duration; nothing to scan"));
        }
        let step_ms = self.step_ms_for(source.width());
        let total_frames = (duration_ms / step_ms as f64).ceil() as u64;

        let mut stats = ClassStats::new();
        let mut alerts = AlertLog::new();
        let mut gate = AlertGate::new(self.config.policy.cooldown_ms);
        let mut processed = 0u64;
        let mut failed = 0u64;
        let mut percent = 0.0f64;
        let mut outcome = ScanOutcome::Completed;

        let mut t_ms = 0u64;
        while (t_ms as f64) < duration_ms {
            if stop.load(Ordering::Relaxed) {
                outcome = ScanOutcome::Cancelled;
                break;
            }

            processed += 1;
            percent = t_ms as f64 / duration_ms * 100.0;
            on_progress(&ScanProgress {
                percent,
                processed,
                total: total_frames,
            });

            if let Err(e) =
                self.process_one(source, client, t_ms, &mut stats, &mut gate, &mut alerts, siren)
            {
                failed += 1;
                log::warn!("frame at {}ms skipped: {:#}", t_ms, e);
            }

            if self.config.frame_delay_ms > 0 {
                std::thread::sleep(Duration::from_millis(self.config.frame_delay_ms));
            }
            t_ms += step_ms;
        }

        if outcome == ScanOutcome::Completed {
            percent = 100.0;
            on_progress(&ScanProgress {
                percent,
                processed,
                total: total_frames,
            });
        }

        Ok(ScanReport {
            outcome,
            summary: stats.summary(),
            alerts,
            frames_processed: processed,
            frames_failed: failed,
            total_frames,
            percent,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn process_one(
        &self,
        source: &mut VideoSource,
        client: &DetectionClient,
        t_ms: u64,
        stats: &mut ClassStats,
        gate: &mut AlertGate,
        alerts: &mut AlertLog,
        siren: &mut dyn Siren,
    ) -> Result<()> {
        let frame = source.seek_frame(t_ms as f64 / 1000.0)?;
        let raster = frame.to_raster(self.config.raster_width, self.config.raster_height);
        let image = raster.to_data_url()?;

        let response = client.process_frame(&image, FrameSource::Video)?;
        if !response.success {
            return Err(anyhow!(
                "service reported failure: {}",
                response.error.as_deref().unwrap_or("unspecified")
            ));
        }

        stats.record_all(&response.detections);

        if let Some(hit) = self.config.policy.first_match(&response.detections) {
            if gate.accept(t_ms) {
                siren.ring();
                alerts.raise(
                    t_ms,
                    &hit.label,
                    hit.confidence,
                    &response.processed_image,
                    AlertStamp::media(t_ms),
                );
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_doubles_above_hires_width() {
        let scan = VideoScan::new(ScanConfig::default());
        assert_eq!(scan.step_ms_for(640), 1000);
        assert_eq!(scan.step_ms_for(1280), 1000);
        assert_eq!(scan.step_ms_for(1281), 2000);
        assert_eq!(scan.step_ms_for(1920), 2000);
    }
}
