//! Image and dataset helpers shared by the CLI, benches and tests.

use crate::models::Frame;
use crate::source::FrameSequence;
use crate::utils::grayscale::frame_to_luma;
use image::{DynamicImage, GenericImageView};
use log::{debug, warn};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

fn max_dim_from_env() -> Option<u32> {
    match env::var("SCANNER_MAX_DIM") {
        Ok(value) => match value.trim().parse::<u32>() {
            Ok(0) => None,
            Ok(v) => Some(v),
            Err(_) => None,
        },
        Err(_) => None,
    }
}

/// Open an image, downscaled when `SCANNER_MAX_DIM` is set and exceeded.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<DynamicImage, image::ImageError> {
    let img = image::open(path)?;
    if let Some(max_dim) = max_dim_from_env() {
        let (w, h) = img.dimensions();
        if w.max(h) > max_dim {
            return Ok(img.resize(max_dim, max_dim, image::imageops::FilterType::Triangle));
        }
    }
    Ok(img)
}

/// Load an image file as a luminance frame.
pub fn load_frame<P: AsRef<Path>>(
    path: P,
    timestamp: Duration,
    sequence: u64,
) -> Result<Frame, image::ImageError> {
    let img = load_image(path)?;
    Ok(Frame::from_image(&img, timestamp, sequence))
}

/// Replay every image under `root` (sorted by path) at `fps`.
///
/// Unreadable files are skipped with a warning.
pub fn load_sequence<P: AsRef<Path>>(root: P, fps: f64) -> FrameSequence {
    let images: Vec<DynamicImage> = dataset_iter(root, None)
        .filter_map(|path| match load_image(&path) {
            Ok(img) => Some(img),
            Err(err) => {
                warn!("skipping {}: {err}", path.display());
                None
            }
        })
        .collect();
    debug!("loaded {} frame(s)", images.len());
    FrameSequence::from_images(&images, fps)
}

/// Summary statistics for a frame's luminance.
#[derive(Debug, Clone, Copy)]
pub struct LumaStats {
    /// Minimum luminance.
    pub min: u8,
    /// Maximum luminance.
    pub max: u8,
    /// Average luminance.
    pub avg: u8,
}

/// Compute min/max/avg luminance of a frame.
pub fn luma_stats(frame: &Frame) -> LumaStats {
    let gray = frame_to_luma(frame);
    let mut min = u8::MAX;
    let mut max = u8::MIN;
    let mut sum: u64 = 0;
    for &v in &gray {
        min = min.min(v);
        max = max.max(v);
        sum += v as u64;
    }
    let avg = if gray.is_empty() {
        0
    } else {
        (sum / gray.len() as u64) as u8
    };
    LumaStats { min, max, avg }
}

/// Default dataset root from environment variables.
pub fn dataset_root_from_env() -> PathBuf {
    env::var("SCANNER_DATASET_ROOT")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("benches/images"))
}

/// Expected payloads for a dataset image: one per line in the sibling `.txt`.
///
/// Blank lines and `#` comments are ignored. Returns an empty list when the
/// label file is missing.
pub fn expected_payloads<P: AsRef<Path>>(image_path: P) -> Vec<String> {
    let label = image_path.as_ref().with_extension("txt");
    let Ok(content) = fs::read_to_string(label) else {
        return Vec::new();
    };
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Iterate dataset image paths in sorted order, optionally limited.
pub fn dataset_iter<P: AsRef<Path>>(root: P, limit: Option<usize>) -> impl Iterator<Item = PathBuf> {
    let mut images = collect_images(root.as_ref());
    images.sort();
    if let Some(limit) = limit {
        images.truncate(limit);
    }
    images.into_iter()
}

fn collect_images(root: &Path) -> Vec<PathBuf> {
    let mut stack = vec![root.to_path_buf()];
    let mut images = Vec::new();

    while let Some(dir) = stack.pop() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(_) => continue,
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
                continue;
            }
            if let Some(ext) = path.extension() {
                let ext = ext.to_string_lossy().to_lowercase();
                if ext == "png" || ext == "jpg" || ext == "jpeg" || ext == "gif" || ext == "bmp" {
                    images.push(path);
                }
            }
        }
    }

    images
}
