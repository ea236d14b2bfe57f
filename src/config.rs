use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use url::Url;

use crate::service::DEFAULT_SERVICE_URL;
use crate::watch::AlertPolicy;

const DEFAULT_CAMERA_URL: &str = "stub://camera";
const DEFAULT_RASTER_WIDTH: u32 = 640;
const DEFAULT_RASTER_HEIGHT: u32 = 480;
const DEFAULT_INTERVAL_MS: u64 = 1000;
const DEFAULT_STEP_MS: u64 = 1000;
const DEFAULT_HIRES_WIDTH: u32 = 1280;
const DEFAULT_FRAME_DELAY_MS: u64 = 10;
const DEFAULT_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_ALERT_LABEL: &str = "Gun";
const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 40.0;
const DEFAULT_COOLDOWN_MS: u64 = 5000;
const DEFAULT_EXPORT_DIR: &str = "alerts";

#[derive(Debug, Deserialize, Default)]
struct WatchConfigFile {
    service: Option<ServiceConfigFile>,
    camera: Option<CameraConfigFile>,
    scan: Option<ScanConfigFile>,
    alert: Option<AlertConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct ServiceConfigFile {
    base_url: Option<String>,
    timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    url: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    interval_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct ScanConfigFile {
    step_ms: Option<u64>,
    hires_width: Option<u32>,
    frame_delay_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct AlertConfigFile {
    label: Option<String>,
    confidence_threshold: Option<f32>,
    cooldown_ms: Option<u64>,
    muted: Option<bool>,
    export_dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub service: ServiceSettings,
    pub camera: CameraSettings,
    pub scan: ScanSettings,
    pub alert: AlertSettings,
}

#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub base_url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct CameraSettings {
    pub url: String,
    pub width: u32,
    pub height: u32,
    pub interval_ms: u64,
}

#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub step_ms: u64,
    pub hires_width: u32,
    pub frame_delay_ms: u64,
}

#[derive(Debug, Clone)]
pub struct AlertSettings {
    pub label: String,
    pub confidence_threshold: f32,
    pub cooldown_ms: u64,
    pub muted: bool,
    pub export_dir: PathBuf,
}

impl AlertSettings {
    pub fn policy(&self) -> AlertPolicy {
        AlertPolicy {
            label: self.label.clone(),
            confidence_threshold: self.confidence_threshold,
            cooldown_ms: self.cooldown_ms,
        }
    }
}

impl WatchConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("GUNWATCH_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: WatchConfigFile) -> Self {
        let service = ServiceSettings {
            base_url: file
                .service
                .as_ref()
                .and_then(|service| service.base_url.clone())
                .unwrap_or_else(|| DEFAULT_SERVICE_URL.to_string()),
            timeout: Duration::from_millis(
                file.service
                    .as_ref()
                    .and_then(|service| service.timeout_ms)
                    .unwrap_or(DEFAULT_TIMEOUT_MS),
            ),
        };
        let camera = CameraSettings {
            url: file
                .camera
                .as_ref()
                .and_then(|camera| camera.url.clone())
                .unwrap_or_else(|| DEFAULT_CAMERA_URL.to_string()),
            width: file
                .camera
                .as_ref()
                .and_then(|camera| camera.width)
                .unwrap_or(DEFAULT_RASTER_WIDTH),
            height: file
                .camera
                .as_ref()
                .and_then(|camera| camera.height)
                .unwrap_or(DEFAULT_RASTER_HEIGHT),
            interval_ms: file
                .camera
                .as_ref()
                .and_then(|camera| camera.interval_ms)
                .unwrap_or(DEFAULT_INTERVAL_MS),
        };
        let scan = ScanSettings {
            step_ms: file
                .scan
                .as_ref()
                .and_then(|scan| scan.step_ms)
                .unwrap_or(DEFAULT_STEP_MS),
            hires_width: file
                .scan
                .as_ref()
                .and_then(|scan| scan.hires_width)
                .unwrap_or(DEFAULT_HIRES_WIDTH),
            frame_delay_ms: file
                .scan
                .as_ref()
                .and_then(|scan| scan.frame_delay_ms)
                .unwrap_or(DEFAULT_FRAME_DELAY_MS),
        };
        let alert = AlertSettings {
            label: file
                .alert
                .as_ref()
                .and_then(|alert| alert.label.clone())
                .unwrap_or_else(|| DEFAULT_ALERT_LABEL.to_string()),
            confidence_threshold: file
                .alert
                .as_ref()
                .and_then(|alert| alert.confidence_threshold)
                .unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD),
            cooldown_ms: file
                .alert
                .as_ref()
                .and_then(|alert| alert.cooldown_ms)
                .unwrap_or(DEFAULT_COOLDOWN_MS),
            muted: file
                .alert
                .as_ref()
                .and_then(|alert| alert.muted)
                .unwrap_or(false),
            export_dir: file
                .alert
                .and_then(|alert| alert.export_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_EXPORT_DIR)),
        };
        Self {
            service,
            camera,
            scan,
            alert,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var("GUNWATCH_SERVICE_URL") {
            if !url.trim().is_empty() {
                self.service.base_url = url;
            }
        }
        if let Ok(url) = std::env::var("GUNWATCH_CAMERA_URL") {
            if !url.trim().is_empty() {
                self.camera.url = url;
            }
        }
        if let Ok(interval) = std::env::var("GUNWATCH_INTERVAL_MS") {
            let ms: u64 = interval
                .parse()
                .map_err(|_| anyhow!("GUNWATCH_INTERVAL_MS must be an integer number of ms"))?;
            self.camera.interval_ms = ms;
        }
        if let Ok(dir) = std::env::var("GUNWATCH_EXPORT_DIR") {
            if !dir.trim().is_empty() {
                self.alert.export_dir = PathBuf::from(dir);
            }
        }
        if let Ok(muted) = std::env::var("GUNWATCH_MUTED") {
            self.alert.muted = matches!(muted.trim(), "1" | "true" | "yes");
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        Url::parse(&self.service.base_url)
            .map_err(|e| anyhow!("invalid service base_url: {}", e))?;
        if self.camera.interval_ms == 0 {
            return Err(anyhow!("camera interval_ms must be greater than zero"));
        }
        if self.scan.step_ms == 0 {
            return Err(anyhow!("scan step_ms must be greater than zero"));
        }
        if !(0.0..=100.0).contains(&self.alert.confidence_threshold) {
            return Err(anyhow!("alert confidence_threshold must be within 0..=100"));
        }
        if self.alert.cooldown_ms == 0 {
            return Err(anyhow!("alert cooldown_ms must be greater than zero"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<WatchConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
