//! Detection service client.
//!
//! This module provides `DetectionClient`, a thin wrapper around the remote
//! detection service's `POST /stream` endpoint, plus the wire types of the
//! request and response bodies.
//!
//! The client is responsible for:
//! - Posting one encoded frame per call, tagged with its source
//! - Bounding each request with a configurable timeout
//! - Parsing the documented response schema
//!
//! The client MUST NOT:
//! - Retry failed requests (callers skip the frame and move on)
//! - Interpret detections (thresholds and cooldowns are the caller's job)

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

/// Default base URL of the detection service.
pub const DEFAULT_SERVICE_URL: &str = "http://localhost:5000";

/// Which flow produced a frame. Serialized into the request body so the
/// service can segregate saved alert stills per source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameSource {
    Webcam,
    Video,
}

#[derive(Debug, Serialize)]
struct ProcessRequest<'a> {
    image: &'a str,
    source: FrameSource,
}

/// One labeled, confidence-scored bounding box.
#[derive(Clone, Debug, Deserialize)]
pub struct Detection {
    /// Class label ("class" on the wire).
    #[serde(rename = "class")]
    pub label: String,
    /// Confidence score, 0-100.
    pub confidence: f32,
    /// Pixel coordinates [x1, y1, x2, y2].
    pub bbox: [f32; 4],
}

/// Response body of `POST /stream`.
#[derive(Clone, Debug, Deserialize)]
pub struct ProcessResponse {
    pub success: bool,
    #[serde(default)]
    pub detections: Vec<Detection>,
    /// Annotated frame re-encoded as a JPEG data URL.
    #[serde(default)]
    pub processed_image: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub processing_time_ms: Option<u64>,
    #[serde(default)]
    pub error: Option<String>,
}

/// HTTP client for the detection service.
pub struct DetectionClient {
    agent: ureq::Agent,
    stream_url: String,
}

impl DetectionClient {
    /// Build a client for the given base URL. The URL is validated here so
    /// a typo fails at startup rather than on the first frame.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let parsed = Url::parse(base_url).context("parse detection service url")?;
        match parsed.scheme() {
            "http" | "https" => {}
            other => {
                return Err(anyhow!(
                    "unsupported detection service scheme '{}'; expected http(s)",
                    other
                ))
            }
        }
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Ok(Self {
            agent,
            stream_url: format!("{}/stream", base_url.trim_end_matches('/')),
        })
    }

    /// Post one encoded frame and parse the detection result.
    ///
    /// Transport errors and non-2xx statuses return `Err`; a well-formed
    /// body with `success: false` returns `Ok` with the flag set. Callers
    /// treat both the same way - discard the frame's result and continue.
    pub fn process_frame(&self, image: &str, source: FrameSource) -> Result<ProcessResponse> {
        let body = serde_json::to_string(&ProcessRequest { image, source })?;
        let response = self
            .agent
            .post(&self.stream_url)
            .set("Content-Type", "application/json")
            .send_string(&body)
            .with_context(|| format!("post frame to {}", self.stream_url))?;
        let parsed: ProcessResponse = serde_json::from_reader(response.into_reader())
            .context("parse detection service response")?;
        Ok(parsed)
    }

    pub fn stream_url(&self) -> &str {
        &self.stream_url
    }
}
