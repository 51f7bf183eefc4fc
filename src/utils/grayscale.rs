//! Frame to luminance conversion
//! Y = 0.299*R + 0.587*G + 0.114*B
//! Uses fast integer arithmetic: Y = (76*R + 150*G + 29*B) >> 8
//!
//! Rows are converted in parallel with rayon; packed rows and padded strides
//! are both supported.
use rayon::prelude::*;

use crate::models::{Frame, PixelFormat};

/// Coefficients for grayscale conversion: Y = (76*R + 150*G + 29*B) >> 8
const COEF_R: u32 = 76;
const COEF_G: u32 = 150;
const COEF_B: u32 = 29;

#[inline]
fn luma(r: u8, g: u8, b: u8) -> u8 {
    let lum = (COEF_R * r as u32 + COEF_G * g as u32 + COEF_B * b as u32) >> 8;
    lum.min(255) as u8
}

/// Byte offsets of the R, G, B channels within a pixel
fn channel_offsets(format: PixelFormat) -> (usize, usize, usize) {
    match format {
        PixelFormat::Bgra8 => (2, 1, 0),
        _ => (0, 1, 2),
    }
}

/// Convert interleaved pixels (with an arbitrary row stride) to a packed
/// luminance plane of `width * height` bytes.
///
/// The caller guarantees the buffer holds `stride * (height - 1) + width * bpp` bytes.
pub fn to_luma(
    data: &[u8],
    width: usize,
    height: usize,
    stride: usize,
    format: PixelFormat,
) -> Vec<u8> {
    let mut gray = vec![0u8; width * height];
    if width == 0 {
        return gray;
    }
    let bpp = format.bytes_per_pixel();
    let (ro, go, bo) = channel_offsets(format);

    gray.par_chunks_mut(width).enumerate().for_each(|(y, row)| {
        let src = &data[y * stride..y * stride + width * bpp];
        if format == PixelFormat::Luma8 {
            row.copy_from_slice(src);
            return;
        }
        for (out, px) in row.iter_mut().zip(src.chunks_exact(bpp)) {
            *out = luma(px[ro], px[go], px[bo]);
        }
    });

    gray
}

/// Convert a validated frame to a packed luminance plane.
pub fn frame_to_luma(frame: &Frame) -> Vec<u8> {
    to_luma(
        frame.data(),
        frame.width(),
        frame.height(),
        frame.stride(),
        frame.format(),
    )
}

/// Convert packed RGB to grayscale
pub fn rgb_to_grayscale(rgb: &[u8], width: usize, height: usize) -> Vec<u8> {
    to_luma(rgb, width, height, width * 3, PixelFormat::Rgb8)
}

/// Convert packed RGBA to grayscale (ignores alpha channel)
pub fn rgba_to_grayscale(rgba: &[u8], width: usize, height: usize) -> Vec<u8> {
    to_luma(rgba, width, height, width * 4, PixelFormat::Rgba8)
}
