//! watchd - live weapon-watch daemon
//!
//! This daemon:
//! 1. Connects the configured camera source
//! 2. Samples one frame per interval and posts it to the detection service
//! 3. Replaces the current detection list on each successful response
//! 4. Raises cooldown-gated alerts for qualifying weapon detections
//! 5. Exports each alert's annotated still to the configured directory

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;

use gunwatch::capture::camera::CameraConfig;
use gunwatch::notify::export_alert_image;
use gunwatch::{CameraSource, DetectionClient, LiveWatch, TerminalBell, WatchConfig};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cfg = WatchConfig::load()?;
    let client = DetectionClient::new(&cfg.service.base_url, cfg.service.timeout)?;

    let camera_config = CameraConfig {
        url: cfg.camera.url.clone(),
        width: cfg.camera.width,
        height: cfg.camera.height,
        sample_interval_ms: cfg.camera.interval_ms,
    };
    let mut camera = match CameraSource::new(camera_config) {
        Ok(camera) => camera,
        Err(e) => {
            log::error!("camera setup failed: {:#}", e);
            return Ok(());
        }
    };
    // Unavailable camera: log and leave the flow idle, no retry.
    if let Err(e) = camera.connect() {
        log::error!("camera unavailable: {:#}", e);
        return Ok(());
    }

    let stop = Arc::new(AtomicBool::new(false));
    let stop_handler = stop.clone();
    ctrlc::set_handler(move || {
        stop_handler.store(true, Ordering::SeqCst);
    })?;

    let mut watch = LiveWatch::new(cfg.alert.policy(), cfg.camera.width, cfg.camera.height);
    let mut siren = TerminalBell::new(cfg.alert.muted);
    watch.start();

    log::info!("watchd streaming from {}", cfg.camera.url);
    log::info!(
        "detection service {} (alert on {} > {:.0}%, cooldown {}ms)",
        cfg.service.base_url,
        cfg.alert.label,
        cfg.alert.confidence_threshold,
        cfg.alert.cooldown_ms
    );

    let interval = Duration::from_millis(cfg.camera.interval_ms);
    let epoch = Instant::now();
    let mut last_health_log = Instant::now();

    while !stop.load(Ordering::SeqCst) {
        let tick_started = Instant::now();
        let now_ms = epoch.elapsed().as_millis() as u64;

        match watch.tick(&mut camera, &client, &mut siren, now_ms) {
            Ok(Some(alert)) => {
                log::warn!(
                    "weapon alert {}: {} at {:.0}% confidence",
                    alert.id,
                    alert.label,
                    alert.confidence
                );
                match export_alert_image(&alert, &cfg.alert.export_dir) {
                    Ok(path) => log::info!("alert image saved to {}", path.display()),
                    Err(e) => log::warn!("alert image export failed: {:#}", e),
                }
            }
            Ok(None) => {}
            Err(e) => {
                log::warn!("frame skipped: {:#}", e);
            }
        }

        if last_health_log.elapsed() >= Duration::from_secs(5) {
            let stats = camera.stats();
            log::info!(
                "camera health={} frames={} url={}",
                camera.is_healthy(),
                stats.frames_captured,
                stats.source
            );
            let current = watch.current_detections();
            if !current.is_empty() {
                let view: Vec<String> = current
                    .iter()
                    .map(|d| format!("{} {:.0}%", d.label, d.confidence))
                    .collect();
                log::info!("in view: {}", view.join(", "));
            }
            last_health_log = Instant::now();
        }

        // Fixed-period schedule: sleep out the rest of the interval. A
        // request that overruns delays the next tick instead of overlapping.
        let elapsed = tick_started.elapsed();
        if elapsed < interval {
            std::thread::sleep(interval - elapsed);
        }
    }

    watch.stop();
    log::info!(
        "watchd stopped after {} ticks, {} alert(s) raised",
        watch.ticks(),
        watch.alerts().len()
    );
    Ok(())
}
