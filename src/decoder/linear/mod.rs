//! 1D barcode decoding over binarized scan lines
//!
//! Each scan line is read in both directions. A reader receives the
//! run-length encoded line and reports every symbol it can frame between
//! quiet zones:
//! - EAN-13 / UPC-A / EAN-8 / UPC-E (`ean`)
//! - Code 128 (`code128`)
//! - Code 39 (`code39`)

/// Code 128
pub mod code128;
/// Code 39
pub mod code39;
/// EAN-13, UPC-A, EAN-8, UPC-E
pub mod ean;

use log::trace;

use super::{LumaImage, Symbol, SymbologyDecoder, merge_symbol};
use crate::models::Symbology;
use crate::utils::binarization::Run;

/// Minimum light margin on either side of a symbol, in modules
pub const QUIET_ZONE_MODULES: f32 = 5.0;

/// A symbol framed on one scan line direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineHit {
    /// Decoded text
    pub payload: String,
    /// First sample of the symbol
    pub start: usize,
    /// One past the last sample of the symbol
    pub end: usize,
}

/// Average deviation of measured run widths from a module pattern.
///
/// Widths are scaled so both sum to the same length. Returns `f32::INFINITY`
/// when any single element deviates by more than `max_individual` modules or
/// the runs are narrower than one sample per module.
pub fn pattern_variance(counters: &[usize], pattern: &[u8], max_individual: f32) -> f32 {
    let total: usize = counters.iter().sum();
    let pattern_len: usize = pattern.iter().map(|&p| p as usize).sum();
    if counters.len() != pattern.len() || total < pattern_len {
        return f32::INFINITY;
    }
    let unit = total as f32 / pattern_len as f32;
    let max_individual = max_individual * unit;

    let mut variance = 0.0;
    for (&counter, &expected) in counters.iter().zip(pattern) {
        let deviation = (counter as f32 - expected as f32 * unit).abs();
        if deviation > max_individual {
            return f32::INFINITY;
        }
        variance += deviation;
    }
    variance / total as f32
}

/// Index of the closest pattern, if it is within `max_average`.
pub fn best_match<P: AsRef<[u8]>>(
    counters: &[usize],
    patterns: &[P],
    max_average: f32,
    max_individual: f32,
) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (index, pattern) in patterns.iter().enumerate() {
        let variance = pattern_variance(counters, pattern.as_ref(), max_individual);
        if variance < max_average && best.is_none_or(|(_, v)| variance < v) {
            best = Some((index, variance));
        }
    }
    best.map(|(index, _)| index)
}

/// Widths of `count` runs starting at `from`, or `None` past the end.
pub(crate) fn counters(runs: &[Run], from: usize, count: usize) -> Option<Vec<usize>> {
    runs.get(from..from + count)
        .map(|window| window.iter().map(|r| r.len).collect())
}

/// True when the run before `first` is a light margin of at least `module * QUIET_ZONE_MODULES`.
pub(crate) fn quiet_before(runs: &[Run], first: usize, module: f32) -> bool {
    first > 0 && {
        let margin = runs[first - 1];
        !margin.dark && margin.len as f32 >= module * QUIET_ZONE_MODULES
    }
}

/// True when the run at `after` is a light margin of at least `module * QUIET_ZONE_MODULES`.
pub(crate) fn quiet_after(runs: &[Run], after: usize, module: f32) -> bool {
    runs.get(after)
        .is_some_and(|margin| !margin.dark && margin.len as f32 >= module * QUIET_ZONE_MODULES)
}

/// Sample range covered by runs `first..last` (exclusive).
pub(crate) fn span(runs: &[Run], first: usize, last: usize) -> (usize, usize) {
    let end = runs[last - 1];
    (runs[first].start, end.start + end.len)
}

/// Standard modulo-10 check digit over data digits (weight 3 on the rightmost).
pub fn mod10_check_digit(digits: &[u8]) -> u8 {
    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| if i % 2 == 0 { 3 * d as u32 } else { d as u32 })
        .sum();
    ((10 - sum % 10) % 10) as u8
}

/// Scan-line decoder for one 1D symbology.
#[derive(Debug, Clone, Copy)]
pub struct LinearDecoder {
    symbology: Symbology,
    code39_check_digit: bool,
}

impl LinearDecoder {
    /// Decoder for one linear symbology; `Qr` reads nothing from scan lines.
    pub fn new(symbology: Symbology, code39_check_digit: bool) -> Self {
        Self {
            symbology,
            code39_check_digit,
        }
    }

    /// Read every symbol on one direction of a line.
    pub fn read_runs(&self, runs: &[Run]) -> Vec<LineHit> {
        match self.symbology {
            Symbology::Ean13 => ean::read_ean13(runs),
            Symbology::UpcA => ean::read_upca(runs),
            Symbology::Ean8 => ean::read_ean8(runs),
            Symbology::UpcE => ean::read_upce(runs),
            Symbology::Code128 => code128::read(runs),
            Symbology::Code39 => code39::read(runs, self.code39_check_digit),
            Symbology::Qr => Vec::new(),
        }
    }
}

impl SymbologyDecoder for LinearDecoder {
    fn symbology(&self) -> Symbology {
        self.symbology
    }

    fn decode(&self, image: &LumaImage) -> Vec<Symbol> {
        let mut found = Vec::new();
        for line in image.scan_lines() {
            for (runs, reversed) in [(&line.forward, false), (&line.reverse, true)] {
                for hit in self.read_runs(runs) {
                    trace!(
                        "{} {:?} on {:?} (reversed: {reversed})",
                        self.symbology, hit.payload, line.axis
                    );
                    merge_symbol(
                        &mut found,
                        Symbol {
                            symbology: self.symbology,
                            payload: hit.payload,
                            bounds: Some(line.bounds(hit.start, hit.end, reversed)),
                        },
                    );
                }
            }
        }
        found
    }
}
