use std::sync::Arc;
use std::time::Duration;

use image::DynamicImage;

use crate::error::FrameError;

/// Pixel layout of a camera frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 8-bit luminance, 1 byte per pixel
    Luma8,
    /// 8-bit RGB, 3 bytes per pixel
    Rgb8,
    /// 8-bit RGBA, 4 bytes per pixel
    Rgba8,
    /// 8-bit BGRA, 4 bytes per pixel (common camera output)
    Bgra8,
}

impl PixelFormat {
    /// Bytes per pixel
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Luma8 => 1,
            PixelFormat::Rgb8 => 3,
            PixelFormat::Rgba8 | PixelFormat::Bgra8 => 4,
        }
    }
}

/// Immutable camera frame.
///
/// Pixels are shared, so cloning a frame is cheap and never copies the buffer.
/// `timestamp` is the capture time on the source's monotonic clock.
#[derive(Debug, Clone)]
pub struct Frame {
    data: Arc<[u8]>,
    width: usize,
    height: usize,
    stride: usize,
    format: PixelFormat,
    timestamp: Duration,
    sequence: u64,
}

impl Frame {
    /// Wrap a tightly packed pixel buffer.
    ///
    /// The buffer is not validated here: a short or corrupt camera buffer is
    /// reported by the decode engine when the frame is consumed.
    pub fn new(
        data: impl Into<Arc<[u8]>>,
        width: usize,
        height: usize,
        format: PixelFormat,
        timestamp: Duration,
        sequence: u64,
    ) -> Self {
        Self {
            data: data.into(),
            width,
            height,
            stride: width.saturating_mul(format.bytes_per_pixel()),
            format,
            timestamp,
            sequence,
        }
    }

    /// Use a row stride (bytes per row) wider than the packed row size.
    pub fn with_stride(mut self, stride: usize) -> Self {
        self.stride = stride;
        self
    }

    /// Build a luminance frame from a decoded image.
    pub fn from_image(image: &DynamicImage, timestamp: Duration, sequence: u64) -> Self {
        let luma = image.to_luma8();
        let (width, height) = luma.dimensions();
        Self::new(
            luma.into_raw(),
            width as usize,
            height as usize,
            PixelFormat::Luma8,
            timestamp,
            sequence,
        )
    }

    /// Same pixels, new timing. Used by replaying sources.
    pub fn retimed(&self, timestamp: Duration, sequence: u64) -> Self {
        Self {
            timestamp,
            sequence,
            ..self.clone()
        }
    }

    /// Raw pixel bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Width in pixels
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> usize {
        self.height
    }

    /// Bytes per row
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Pixel layout
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Capture timestamp
    pub fn timestamp(&self) -> Duration {
        self.timestamp
    }

    /// Sequence number assigned by the source
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Check that the buffer can hold every row the header describes.
    pub fn validate(&self) -> Result<(), FrameError> {
        if self.width == 0 || self.height == 0 {
            return Err(FrameError::EmptyDimensions {
                width: self.width,
                height: self.height,
            });
        }
        let overflow = FrameError::Overflow {
            width: self.width,
            height: self.height,
            stride: self.stride,
        };
        let row_bytes = self
            .width
            .checked_mul(self.format.bytes_per_pixel())
            .ok_or(overflow.clone())?;
        if self.stride < row_bytes {
            return Err(FrameError::StrideTooSmall {
                stride: self.stride,
                row_bytes,
            });
        }
        let expected = self
            .stride
            .checked_mul(self.height - 1)
            .and_then(|bytes| bytes.checked_add(row_bytes))
            .ok_or(overflow)?;
        if self.data.len() < expected {
            return Err(FrameError::BufferTooShort {
                expected,
                actual: self.data.len(),
            });
        }
        Ok(())
    }
}
