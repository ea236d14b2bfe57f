//! Seekable video source using FFmpeg.
//!
//! This module provides the FFmpeg-backed local file decoder behind
//! `VideoSource`. Seeks land on the keyframe at or before the requested
//! timestamp; decoding then advances to the first frame at or after it.

use anyhow::{anyhow, Context, Result};
use ffmpeg_next as ffmpeg;

use crate::capture::video::VideoStats;
use crate::frame::Frame;

const AV_TIME_BASE: f64 = ffmpeg::ffi::AV_TIME_BASE as f64;

pub(crate) struct FfmpegVideoSource {
    path: String,
    input: ffmpeg::format::context::Input,
    stream_index: usize,
    time_base: ffmpeg::Rational,
    decoder: ffmpeg::codec::decoder::Video,
    scaler: ffmpeg::software::scaling::Context,
    duration_secs: f64,
    width: u32,
    height: u32,
    frame_count: u64,
}

impl FfmpegVideoSource {
    pub(crate) fn open(path: &str) -> Result<Self> {
        ffmpeg::init().context("initialize ffmpeg")?;
        let input = ffmpeg::format::input(&path)
            .with_context(|| format!("failed to open video file '{}' with ffmpeg", path))?;
        let input_stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| anyhow!("file has no video track"))?;
        let stream_index = input_stream.index();
        let time_base = input_stream.time_base();
        let context = ffmpeg::codec::context::Context::from_parameters(input_stream.parameters())
            .context("load video decoder parameters")?;
        let decoder = context
            .decoder()
            .video()
            .context("open ffmpeg video decoder")?;

        let scaler = ffmpeg::software::scaling::context::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg::util::format::pixel::Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            ffmpeg::software::scaling::flag::Flags::BILINEAR,
        )
        .context("create ffmpeg scaler")?;

        let raw_duration = input.duration();
        if raw_duration <= 0 {
            return Err(anyhow!("file reports no duration; cannot schedule a scan"));
        }
        let duration_secs = raw_duration as f64 / AV_TIME_BASE;
        let width = decoder.width();
        let height = decoder.height();

        Ok(Self {
            path: path.to_string(),
            input,
            stream_index,
            time_base,
            decoder,
            scaler,
            duration_secs,
            width,
            height,
            frame_count: 0,
        })
    }

    pub(crate) fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    pub(crate) fn width(&self) -> u32 {
        self.width
    }

    pub(crate) fn height(&self) -> u32 {
        self.height
    }

    pub(crate) fn seek_frame(&mut self, timestamp_secs: f64) -> Result<Frame> {
        if timestamp_secs < 0.0 || timestamp_secs >= self.duration_secs {
            return Err(anyhow!(
                "seek to {:.3}s is outside the file (duration {:.3}s)",
                timestamp_secs,
                self.duration_secs
            ));
        }

        let target_av = (timestamp_secs * AV_TIME_BASE) as i64;
        self.input
            .seek(target_av, ..target_av)
            .with_context(|| format!("seek to {:.3}s", timestamp_secs))?;
        self.decoder.flush();

        // Seeking lands on a keyframe at or before the target; discard
        // decoded frames until the stream reaches the requested timestamp.
        let target_pts = if self.time_base.numerator() > 0 {
            (timestamp_secs * self.time_base.denominator() as f64
                / self.time_base.numerator() as f64) as i64
        } else {
            0
        };

        let mut decoded = ffmpeg::frame::Video::empty();
        let mut rgb_frame = ffmpeg::frame::Video::empty();

        for (stream, packet) in self.input.packets() {
            if stream.index() != self.stream_index {
                continue;
            }

            self.decoder
                .send_packet(&packet)
                .context("send packet to ffmpeg decoder")?;

            while self.decoder.receive_frame(&mut decoded).is_ok() {
                let pts = decoded.pts().unwrap_or(target_pts);
                if pts < target_pts {
                    continue;
                }
                self.scaler
                    .run(&decoded, &mut rgb_frame)
                    .context("scale frame to RGB")?;
                let (pixels, width, height) = frame_to_pixels(&rgb_frame)?;
                self.frame_count += 1;
                return Frame::from_rgb(pixels, width, height);
            }
        }

        Err(anyhow!("file ended before {:.3}s", timestamp_secs))
    }

    pub(crate) fn stats(&self) -> VideoStats {
        VideoStats {
            frames_decoded: self.frame_count,
            path: self.path.clone(),
        }
    }
}

fn frame_to_pixels(frame: &ffmpeg::frame::Video) -> Result<(Vec<u8>, u32, u32)> {
    let width = frame.width();
    let height = frame.height();
    let row_bytes = (width as usize) * 3;
    let stride = frame.stride(0) as usize;
    let data = frame.data(0);

    if stride == row_bytes {
        return Ok((data.to_vec(), width, height));
    }

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        let end = start + row_bytes;
        pixels.extend_from_slice(
            data.get(start..end)
                .context("ffmpeg frame row is out of bounds")?,
        );
    }

    Ok((pixels, width, height))
}
