//! Frame data structures for captured photos

use std::path::Path;
use std::time::Instant;

use thiserror::Error;

/// Errors raised while building a frame from raw or encoded pixels
#[derive(Debug, Error)]
pub enum FrameError {
    /// Width or height is zero
    #[error("frame dimensions must be at least 1x1, got {width}x{height}")]
    EmptyDimensions { width: u32, height: u32 },

    /// Only RGB and RGBA layouts are understood
    #[error("unsupported channel count {0} (expected 3 or 4)")]
    UnsupportedChannels(usize),

    /// Stride is smaller than one packed row
    #[error("stride {stride} is shorter than a row of {row_bytes} bytes")]
    StrideTooShort { stride: usize, row_bytes: usize },

    /// Buffer does not cover every row
    #[error("pixel buffer holds {actual} bytes, {required} required")]
    BufferTooShort { actual: usize, required: usize },

    /// The image file could not be opened or decoded
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
}

/// A captured photo as a flat pixel buffer
///
/// Pixels are stored row-major; row `y` starts at byte `y * stride` and each
/// pixel occupies `channels` bytes in R, G, B[, A] order.
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    /// Raw pixel data
    pub data: Vec<u8>,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Bytes per pixel (3 = RGB, 4 = RGBA)
    pub channels: usize,
    /// Bytes per row
    pub stride: usize,
    /// Capture path that produced this frame
    pub source: String,
    /// When the frame was loaded
    pub timestamp: Instant,
}

impl CapturedFrame {
    /// Create a frame from tightly packed RGBA data
    pub fn from_rgba(
        data: Vec<u8>,
        width: u32,
        height: u32,
        source: impl Into<String>,
    ) -> Result<Self, FrameError> {
        Self::with_layout(data, width, height, 4, width as usize * 4, source)
    }

    /// Create a frame from tightly packed RGB data
    pub fn from_rgb(
        data: Vec<u8>,
        width: u32,
        height: u32,
        source: impl Into<String>,
    ) -> Result<Self, FrameError> {
        Self::with_layout(data, width, height, 3, width as usize * 3, source)
    }

    /// Create a frame with an explicit channel count and row stride
    pub fn with_layout(
        data: Vec<u8>,
        width: u32,
        height: u32,
        channels: usize,
        stride: usize,
        source: impl Into<String>,
    ) -> Result<Self, FrameError> {
        if width == 0 || height == 0 {
            return Err(FrameError::EmptyDimensions { width, height });
        }
        if channels != 3 && channels != 4 {
            return Err(FrameError::UnsupportedChannels(channels));
        }

        let row_bytes = width as usize * channels;
        if stride < row_bytes {
            return Err(FrameError::StrideTooShort { stride, row_bytes });
        }

        // The last row only needs its packed pixels, not the full stride
        let required = stride * (height as usize - 1) + row_bytes;
        if data.len() < required {
            return Err(FrameError::BufferTooShort {
                actual: data.len(),
                required,
            });
        }

        Ok(Self {
            data,
            width,
            height,
            channels,
            stride,
            source: source.into(),
            timestamp: Instant::now(),
        })
    }

    /// Build a frame from a decoded image
    pub fn from_image(image: image::DynamicImage, source: impl Into<String>) -> Result<Self, FrameError> {
        let rgba = image.into_rgba8();
        let (width, height) = rgba.dimensions();
        Self::from_rgba(rgba.into_raw(), width, height, source)
    }

    /// Decode an image file into a frame
    pub fn open(path: &Path, source: impl Into<String>) -> Result<Self, FrameError> {
        let image = image::open(path)?;
        Self::from_image(image, source)
    }

    /// Get frame dimensions as (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Number of pixels in the frame
    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Red, green and blue channel values at (x, y)
    #[inline]
    pub fn rgb(&self, x: u32, y: u32) -> [u8; 3] {
        let idx = y as usize * self.stride + x as usize * self.channels;
        [self.data[idx], self.data[idx + 1], self.data[idx + 2]]
    }

    /// One packed row of pixels, without any stride padding
    #[inline]
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.stride;
        &self.data[start..start + self.width as usize * self.channels]
    }

    /// Copy the frame into an RGBA image for encoders
    pub fn to_rgba_image(&self) -> image::RgbaImage {
        image::RgbaImage::from_fn(self.width, self.height, |x, y| {
            let [r, g, b] = self.rgb(x, y);
            let alpha = if self.channels == 4 {
                self.data[y as usize * self.stride + x as usize * 4 + 3]
            } else {
                255
            };
            image::Rgba([r, g, b, alpha])
        })
    }
}
