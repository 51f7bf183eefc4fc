//! Image processing helpers for the decode engine
//!
//! - Luminance conversion of camera frames (RGB/RGBA/BGRA to luma)
//! - Scan-line binarization (Otsu's method) and run-length encoding

/// Otsu thresholding and run-length encoding of scan lines
pub mod binarization;
/// Luminance conversion
pub mod grayscale;
