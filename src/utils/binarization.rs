/// Minimum spread between darkest and lightest sample for a line to carry bars.
pub const MIN_CONTRAST: u8 = 32;

/// A maximal stretch of same-colored samples on a scan line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    /// true = dark (bar), false = light (space)
    pub dark: bool,
    /// Index of the first sample
    pub start: usize,
    /// Number of samples
    pub len: usize,
}

/// Calculate Otsu's optimal threshold over a set of samples.
///
/// Pixels strictly below the returned threshold are dark.
pub fn otsu_threshold(samples: &[u8]) -> u8 {
    let mut histogram = [0u64; 256];
    for &v in samples {
        histogram[v as usize] += 1;
    }

    let total = samples.len() as f64;
    let sum_all: f64 = histogram
        .iter()
        .enumerate()
        .map(|(i, &c)| i as f64 * c as f64)
        .sum();

    let mut class1_pixels = 0u64;
    let mut class1_sum = 0f64;
    let mut max_variance = 0.0;
    let mut optimal_threshold = 128u8;

    // threshold t splits intensities into [0, t) and [t, 255]
    for t in 1..=255usize {
        class1_pixels += histogram[t - 1];
        class1_sum += (t - 1) as f64 * histogram[t - 1] as f64;
        let class2_pixels = samples.len() as u64 - class1_pixels;
        if class1_pixels == 0 || class2_pixels == 0 {
            continue;
        }

        let class1_mean = class1_sum / class1_pixels as f64;
        let class2_mean = (sum_all - class1_sum) / class2_pixels as f64;
        let weight1 = class1_pixels as f64 / total;
        let weight2 = class2_pixels as f64 / total;
        let variance = weight1 * weight2 * (class1_mean - class2_mean).powi(2);

        if variance > max_variance {
            max_variance = variance;
            optimal_threshold = t as u8;
        }
    }

    optimal_threshold
}

/// Binarize one scan line and run-length encode it.
///
/// Returns an empty vector for flat lines (contrast below [`MIN_CONTRAST`]).
pub fn binarize_line(samples: &[u8]) -> Vec<Run> {
    let (Some(&min), Some(&max)) = (samples.iter().min(), samples.iter().max()) else {
        return Vec::new();
    };
    if max - min < MIN_CONTRAST {
        return Vec::new();
    }
    let threshold = otsu_threshold(samples);
    threshold_runs(samples, threshold)
}

/// Run-length encode a line with a global threshold.
pub fn threshold_runs(samples: &[u8], threshold: u8) -> Vec<Run> {
    let mut runs: Vec<Run> = Vec::new();
    for (i, &v) in samples.iter().enumerate() {
        let dark = v < threshold;
        match runs.last_mut() {
            Some(run) if run.dark == dark => run.len += 1,
            _ => runs.push(Run { dark, start: i, len: 1 }),
        }
    }
    runs
}
