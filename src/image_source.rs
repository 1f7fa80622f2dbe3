use std::path::Path;

use image::imageops::FilterType;
use image::RgbaImage;
use tracing::debug;

use crate::error::{PhotocapError, Result};

/// Longest edge allowed into a vision request. Larger images are downscaled
/// before submission to bound backend latency and memory.
pub const MAX_VISION_EDGE: u32 = 1024;

/// A decoded bitmap with random-access RGBA8 pixel reads.
///
/// This is the engine's view of the Image Source collaborator: width, height,
/// bytes-per-row metadata and checked per-pixel access. The pixel buffer is
/// always RGBA8 regardless of the source format.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pixels: RgbaImage,
}

impl DecodedImage {
    /// Decode an image file into RGBA8.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let dynamic = image::open(path).map_err(|e| {
            PhotocapError::invalid_image(format!("decode failed for {}: {}", path.display(), e))
        })?;
        Ok(Self {
            pixels: dynamic.to_rgba8(),
        })
    }

    /// Decode from an in-memory encoded buffer (JPEG, PNG, ...).
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let dynamic = image::load_from_memory(data)
            .map_err(|e| PhotocapError::invalid_image(format!("decode failed: {}", e)))?;
        Ok(Self {
            pixels: dynamic.to_rgba8(),
        })
    }

    /// Wrap a raw RGBA8 buffer. The buffer length must be exactly
    /// `width * height * 4`.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let pixels = RgbaImage::from_raw(width, height, data)
            .ok_or_else(|| PhotocapError::invalid_image("RGBA buffer size mismatch"))?;
        Ok(Self { pixels })
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Row stride in bytes (RGBA8: width * 4).
    pub fn bytes_per_row(&self) -> usize {
        self.pixels.width() as usize * 4
    }

    pub fn aspect_ratio(&self) -> f32 {
        if self.pixels.height() == 0 {
            return 1.0;
        }
        self.pixels.width() as f32 / self.pixels.height() as f32
    }

    /// Checked RGBA read. Returns None outside the image bounds.
    pub fn pixel_rgba(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.pixels.width() || y >= self.pixels.height() {
            return None;
        }
        Some(self.pixels.get_pixel(x, y).0)
    }

    /// True when the image carries no addressable pixels.
    pub fn is_degenerate(&self) -> bool {
        self.pixels.width() == 0 || self.pixels.height() == 0
    }

    /// Downscale so the longer edge is at most `max_edge`, preserving aspect
    /// ratio. Images already within the bound pass through unchanged.
    pub fn prepare_for_vision(&self, max_edge: u32) -> DecodedImage {
        let (w, h) = (self.pixels.width(), self.pixels.height());
        let longest = w.max(h);
        if longest <= max_edge || longest == 0 {
            return self.clone();
        }

        let scale = max_edge as f32 / longest as f32;
        let new_w = ((w as f32 * scale).round() as u32).max(1);
        let new_h = ((h as f32 * scale).round() as u32).max(1);

        debug!(
            "Downscaling image from {}x{} to {}x{} for vision submission",
            w, h, new_w, new_h
        );

        DecodedImage {
            pixels: image::imageops::resize(&self.pixels, new_w, new_h, FilterType::Triangle),
        }
    }
}
