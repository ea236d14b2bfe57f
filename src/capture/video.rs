//! Seekable video file source.
//!
//! This module provides `VideoSource` for sampling frames out of a local
//! video file at arbitrary media timestamps. The scan loop drives it with
//! monotonically increasing timestamps; the source handles seeking and
//! decoding.
//!
//! The video source is responsible for:
//! - Reporting duration and resolution metadata after open
//! - Seeking to a requested timestamp and decoding that frame in-memory
//!
//! The video source MUST NOT:
//! - Fetch remote URLs
//! - Store decoded frames to disk

use anyhow::{anyhow, Context, Result};
use url::Url;

use crate::frame::Frame;

#[cfg(feature = "scan-ffmpeg")]
use super::video_ffmpeg::FfmpegVideoSource;

const DEFAULT_STUB_DURATION_SECS: f64 = 10.0;
const DEFAULT_STUB_WIDTH: u32 = 640;
const DEFAULT_STUB_HEIGHT: u32 = 480;

/// Configuration for a video file source.
#[derive(Clone, Debug)]
pub struct VideoConfig {
    /// Local file path, or a `stub://` URL for the synthetic source.
    /// Stub URLs accept `duration`, `width` and `height` query parameters,
    /// e.g. `stub://clip?duration=12&width=1920&height=1080`.
    pub path: String,
}

/// Seekable video file source.
pub struct VideoSource {
    backend: VideoBackend,
}

enum VideoBackend {
    Synthetic(SyntheticVideoSource),
    #[cfg(feature = "scan-ffmpeg")]
    Ffmpeg(FfmpegVideoSource),
}

impl VideoSource {
    pub fn open(config: VideoConfig) -> Result<Self> {
        if config.path.starts_with("stub://") {
            let source = SyntheticVideoSource::from_url(&config.path)?;
            return Ok(Self {
                backend: VideoBackend::Synthetic(source),
            });
        }
        if config.path.contains("://") {
            return Err(anyhow!(
                "video scanning only supports local paths (no URL schemes)"
            ));
        }
        #[cfg(feature = "scan-ffmpeg")]
        {
            Ok(Self {
                backend: VideoBackend::Ffmpeg(FfmpegVideoSource::open(&config.path)?),
            })
        }
        #[cfg(not(feature = "scan-ffmpeg"))]
        {
            Err(anyhow!("video file decoding requires the scan-ffmpeg feature"))
        }
    }

    /// Synthetic source with explicit metadata, for tests and demos.
    pub fn synthetic(duration_secs: f64, width: u32, height: u32) -> Self {
        Self {
            backend: VideoBackend::Synthetic(SyntheticVideoSource::new(
                "stub://clip".to_string(),
                duration_secs,
                width,
                height,
            )),
        }
    }

    /// Total duration of the file in seconds.
    pub fn duration_secs(&self) -> f64 {
        match &self.backend {
            VideoBackend::Synthetic(source) => source.duration_secs,
            #[cfg(feature = "scan-ffmpeg")]
            VideoBackend::Ffmpeg(source) => source.duration_secs(),
        }
    }

    /// Native frame width of the source material.
    pub fn width(&self) -> u32 {
        match &self.backend {
            VideoBackend::Synthetic(source) => source.width,
            #[cfg(feature = "scan-ffmpeg")]
            VideoBackend::Ffmpeg(source) => source.width(),
        }
    }

    pub fn height(&self) -> u32 {
        match &self.backend {
            VideoBackend::Synthetic(source) => source.height,
            #[cfg(feature = "scan-ffmpeg")]
            VideoBackend::Ffmpeg(source) => source.height(),
        }
    }

    /// Seek to a media timestamp and decode the frame there.
    pub fn seek_frame(&mut self, timestamp_secs: f64) -> Result<Frame> {
        match &mut self.backend {
            VideoBackend::Synthetic(source) => source.seek_frame(timestamp_secs),
            #[cfg(feature = "scan-ffmpeg")]
            VideoBackend::Ffmpeg(source) => source.seek_frame(timestamp_secs),
        }
    }

    /// Get frame statistics.
    pub fn stats(&self) -> VideoStats {
        match &self.backend {
            VideoBackend::Synthetic(source) => source.stats(),
            #[cfg(feature = "scan-ffmpeg")]
            VideoBackend::Ffmpeg(source) => source.stats(),
        }
    }
}

/// Statistics for a video source.
#[derive(Clone, Debug)]
pub struct VideoStats {
    pub frames_decoded: u64,
    pub path: String,
}

// ----------------------------------------------------------------------------
// Synthetic source (stub://) for tests
// ----------------------------------------------------------------------------

struct SyntheticVideoSource {
    path: String,
    duration_secs: f64,
    width: u32,
    height: u32,
    frame_count: u64,
}

impl SyntheticVideoSource {
    fn new(path: String, duration_secs: f64, width: u32, height: u32) -> Self {
        Self {
            path,
            duration_secs,
            width,
            height,
            frame_count: 0,
        }
    }

    fn from_url(path: &str) -> Result<Self> {
        let url = Url::parse(path).context("parse stub video url")?;
        let mut duration_secs = DEFAULT_STUB_DURATION_SECS;
        let mut width = DEFAULT_STUB_WIDTH;
        let mut height = DEFAULT_STUB_HEIGHT;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "duration" => {
                    duration_secs = value
                        .parse()
                        .map_err(|_| anyhow!("stub duration must be seconds"))?
                }
                "width" => {
                    width = value
                        .parse()
                        .map_err(|_| anyhow!("stub width must be an integer"))?
                }
                "height" => {
                    height = value
                        .parse()
                        .map_err(|_| anyhow!("stub height must be an integer"))?
                }
                other => return Err(anyhow!("unknown stub video parameter '{}'", other)),
            }
        }
        if duration_secs <= 0.0 {
            return Err(anyhow!("stub duration must be positive"));
        }
        Ok(Self::new(path.to_string(), duration_secs, width, height))
    }

    fn seek_frame(&mut self, timestamp_secs: f64) -> Result<Frame> {
        if timestamp_secs < 0.0 || timestamp_secs >= self.duration_secs {
            return Err(anyhow!(
                "seek to {:.3}s is outside the file (duration {:.3}s)",
                timestamp_secs,
                self.duration_secs
            ));
        }
        self.frame_count += 1;
        let pixels = self.generate_synthetic_pixels(timestamp_secs);
        Frame::from_rgb(pixels, self.width, self.height)
    }

    /// Deterministic content keyed to the timestamp, so two seeks to the
    /// same position decode the same frame.
    fn generate_synthetic_pixels(&self, timestamp_secs: f64) -> Vec<u8> {
        let scene = timestamp_secs as u64;
        let pixel_count = (self.width * self.height * 3) as usize;
        let mut pixels = vec![0u8; pixel_count];
        for (i, pixel) in pixels.iter_mut().enumerate() {
            *pixel = ((i as u64 + scene * 31) % 256) as u8;
        }
        pixels
    }

    fn stats(&self) -> VideoStats {
        VideoStats {
            frames_decoded: self.frame_count,
            path: self.path.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_url_parses_metadata_overrides() {
        let source = VideoSource::open(VideoConfig {
            path: "stub://clip?duration=12&width=1920&height=1080".to_string(),
        })
        .unwrap();
        assert!((source.duration_secs() - 12.0).abs() < f64::EPSILON);
        assert_eq!(source.width(), 1920);
        assert_eq!(source.height(), 1080);
    }

    #[test]
    fn stub_url_defaults_to_ten_seconds() {
        let source = VideoSource::open(VideoConfig {
            path: "stub://clip".to_string(),
        })
        .unwrap();
        assert!((source.duration_secs() - 10.0).abs() < f64::EPSILON);
        assert_eq!((source.width(), source.height()), (640, 480));
    }

    #[test]
    fn rejects_unknown_stub_parameters_and_remote_urls() {
        assert!(VideoSource::open(VideoConfig {
            path: "stub://clip?fps=30".to_string(),
        })
        .is_err());
        assert!(VideoSource::open(VideoConfig {
            path: "https://example.com/clip.mp4".to_string(),
        })
        .is_err());
    }

    #[test]
    fn seeks_are_deterministic_and_bounded() {
        let mut source = VideoSource::synthetic(10.0, 32, 24);

        let first = source.seek_frame(3.0).unwrap().to_data_url().unwrap();
        let second = source.seek_frame(3.0).unwrap().to_data_url().unwrap();
        assert_eq!(first, second);

        let other = source.seek_frame(4.0).unwrap().to_data_url().unwrap();
        assert_ne!(first, other);

        assert!(source.seek_frame(10.0).is_err());
        assert!(source.seek_frame(-1.0).is_err());
        assert_eq!(source.stats().frames_decoded, 3);
    }
}
