//! Frame capture sources.
//!
//! This module provides the two frame sources of the client:
//! - Live cameras (`camera`): HTTP MJPEG/snapshot streams, plus a stub
//! - Video files (`video`): seekable local files (feature: scan-ffmpeg),
//!   plus a stub with configurable duration and resolution
//!
//! All sources produce plain `Frame` instances that the sampling loops draw
//! onto the raster surface and encode. The capture layer is responsible for:
//! - Decoding camera/file images in-memory
//! - Rate limiting live streams to the sampling interval
//! - Reporting duration and resolution metadata for files
//!
//! The capture layer MUST NOT:
//! - Talk to the detection service (that is the loops' job)
//! - Buffer frames beyond the one being handed off

pub mod camera;
pub mod video;
#[cfg(feature = "scan-ffmpeg")]
pub(crate) mod video_ffmpeg;

pub use camera::CameraSource;
pub use video::VideoSource;
