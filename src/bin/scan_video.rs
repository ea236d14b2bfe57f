//! scan_video - scan a video file against the detection service
//!
//! Seeks through the file at the configured sampling step, posts each frame,
//! and prints a per-class summary plus any weapon alerts at the end. Alert
//! stills are exported to the configured directory. Ctrl-C cancels the scan
//! at the next frame boundary; the summary covers the frames processed so
//! far.

use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use gunwatch::capture::video::VideoConfig;
use gunwatch::notify::{contact_authorities, export_alert_image};
use gunwatch::ui::Ui;
use gunwatch::watch::{ScanConfig, ScanOutcome};
use gunwatch::{DetectionClient, TerminalBell, VideoScan, VideoSource, WatchConfig};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Scan a video file for weapons with a remote detection service"
)]
struct Args {
    /// Video file to scan (or a stub:// URL for a synthetic clip).
    video: String,

    /// Detection service base URL.
    #[arg(long, env = "GUNWATCH_SERVICE_URL")]
    service_url: Option<String>,

    /// Media-time step between sampled frames, in milliseconds.
    #[arg(long)]
    step_ms: Option<u64>,

    /// Directory for exported alert images.
    #[arg(long, env = "GUNWATCH_EXPORT_DIR")]
    export_dir: Option<PathBuf>,

    /// Silence the audio cue.
    #[arg(long)]
    mute: bool,

    /// Progress output: auto, plain or pretty.
    #[arg(long)]
    ui: Option<String>,

    /// After the scan, print the local contact-authorities confirmation.
    #[arg(long)]
    contact_authorities: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut cfg = WatchConfig::load()?;
    if let Some(url) = args.service_url {
        cfg.service.base_url = url;
    }
    if let Some(step_ms) = args.step_ms {
        cfg.scan.step_ms = step_ms;
    }
    if let Some(dir) = args.export_dir {
        cfg.alert.export_dir = dir;
    }
    if args.mute {
        cfg.alert.muted = true;
    }

    let ui = Ui::from_args(args.ui.as_deref(), std::io::stderr().is_terminal());
    let client = DetectionClient::new(&cfg.service.base_url, cfg.service.timeout)?;

    let mut source = {
        let _stage = ui.stage("Opening video");
        VideoSource::open(VideoConfig {
            path: args.video.clone(),
        })?
    };
    log::info!(
        "{}: {:.1}s at {}x{}",
        args.video,
        source.duration_secs(),
        source.width(),
        source.height()
    );

    let stop = Arc::new(AtomicBool::new(false));
    let stop_handler = stop.clone();
    ctrlc::set_handler(move || {
        stop_handler.store(true, Ordering::SeqCst);
    })?;

    let scan = VideoScan::new(ScanConfig {
        step_ms: cfg.scan.step_ms,
        hires_width: cfg.scan.hires_width,
        raster_width: cfg.camera.width,
        raster_height: cfg.camera.height,
        frame_delay_ms: cfg.scan.frame_delay_ms,
        policy: cfg.alert.policy(),
    });

    let step_ms = scan.step_ms_for(source.width());
    let total_frames = (source.duration_secs() * 1000.0 / step_ms as f64).ceil() as u64;
    let bar = ui.scan_bar(total_frames);

    let mut siren = TerminalBell::new(cfg.alert.muted);
    let report = scan.run(&mut source, &client, &mut siren, &stop, &mut |progress| {
        bar.set_position(progress.processed);
    })?;
    bar.finish_and_clear();

    if report.outcome == ScanOutcome::Cancelled {
        log::warn!(
            "scan cancelled after {} of {} frames",
            report.frames_processed,
            report.total_frames
        );
    }

    println!(
        "Scanned {} of {} frames ({} skipped), progress {:.1}%",
        report.frames_processed, report.total_frames, report.frames_failed, report.percent
    );

    if report.summary.is_empty() {
        println!("No detections.");
    } else {
        println!("Detection summary:");
        for entry in &report.summary {
            println!(
                "  {}: {} detections (avg confidence {:.1}%)",
                entry.label, entry.count, entry.avg_confidence
            );
        }
    }

    if !report.alerts.is_empty() {
        println!("Weapon alerts ({}):", report.alerts.len());
        for alert in report.alerts.iter() {
            println!(
                "  [{}] {} at {:.0}% confidence",
                alert.stamp.display(),
                alert.label,
                alert.confidence
            );
            match export_alert_image(alert, &cfg.alert.export_dir) {
                Ok(path) => println!("    saved {}", path.display()),
                Err(e) => log::warn!("alert image export failed: {:#}", e),
            }
        }
    }

    if args.contact_authorities {
        println!("{}", contact_authorities(report.alerts.len()));
    }

    Ok(())
}
