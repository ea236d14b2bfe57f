//! Raster frames and data-URL encoding.
//!
//! Both sampling loops draw their source material onto the same kind of
//! off-screen raster surface before posting it: an RGB frame at the
//! configured raster size, encoded as a PNG data URL.
//!
//! - `Frame`: one still image (RGB8) with its dimensions.
//! - `decode_data_url`: recover the raw encoded bytes of a data URL, used
//!   when exporting an alert's annotated still to disk.

use anyhow::{anyhow, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use image::{imageops, ImageFormat, RgbImage};
use std::io::Cursor;

/// One still image extracted from a camera stream or a video file.
#[derive(Clone, Debug)]
pub struct Frame {
    image: RgbImage,
}

impl Frame {
    /// Wrap raw RGB8 pixel data. Fails when the buffer does not match the
    /// dimensions.
    pub fn from_rgb(data: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let image = RgbImage::from_raw(width, height, data)
            .ok_or_else(|| anyhow!("pixel buffer does not match {}x{} RGB frame", width, height))?;
        Ok(Self { image })
    }

    /// Decode an encoded image (JPEG/PNG bytes) into a frame.
    pub fn from_encoded(bytes: &[u8]) -> Result<Self> {
        let decoded = image::load_from_memory(bytes).context("decode frame image")?;
        Ok(Self {
            image: decoded.into_rgb8(),
        })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Draw this frame onto a raster surface of the given size.
    ///
    /// Returns `self` unchanged when the dimensions already match.
    pub fn to_raster(&self, width: u32, height: u32) -> Frame {
        if self.width() == width && self.height() == height {
            return self.clone();
        }
        Frame {
            image: imageops::resize(&self.image, width, height, imageops::FilterType::Triangle),
        }
    }

    /// Encode as a PNG data URL, the request format of the detection
    /// service.
    pub fn to_data_url(&self) -> Result<String> {
        let mut buf = Vec::new();
        self.image
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .context("encode frame as png")?;
        Ok(format!("data:image/png;base64,{}", BASE64.encode(&buf)))
    }
}

/// Recover the raw encoded bytes from an image data URL.
pub fn decode_data_url(url: &str) -> Result<Vec<u8>> {
    let (header, payload) = url
        .split_once(',')
        .ok_or_else(|| anyhow!("data url has no payload separator"))?;
    if !header.starts_with("data:image/") || !header.ends_with(";base64") {
        return Err(anyhow!("not a base64 image data url"));
    }
    BASE64
        .decode(payload.trim())
        .context("decode data url payload")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_frame(width: u32, height: u32) -> Frame {
        let data: Vec<u8> = (0..(width * height * 3)).map(|i| (i % 251) as u8).collect();
        Frame::from_rgb(data, width, height).unwrap()
    }

    #[test]
    fn rejects_mismatched_pixel_buffer() {
        assert!(Frame::from_rgb(vec![0u8; 10], 640, 480).is_err());
    }

    #[test]
    fn raster_resizes_only_when_needed() {
        let frame = test_frame(32, 24);
        let same = frame.to_raster(32, 24);
        assert_eq!((same.width(), same.height()), (32, 24));

        let scaled = frame.to_raster(16, 12);
        assert_eq!((scaled.width(), scaled.height()), (16, 12));
    }

    #[test]
    fn data_url_round_trips_through_decoder() {
        let frame = test_frame(8, 8);
        let url = frame.to_data_url().unwrap();
        assert!(url.starts_with("data:image/png;base64,"));

        let bytes = decode_data_url(&url).unwrap();
        let decoded = Frame::from_encoded(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (8, 8));
    }

    #[test]
    fn decode_rejects_non_image_payloads() {
        assert!(decode_data_url("data:text/plain;base64,aGVsbG8=").is_err());
        assert!(decode_data_url("data:image/png;base64").is_err());
        assert!(decode_data_url("data:image/png;base64,!!!").is_err());
    }
}
