//! EAN/UPC family readers
//!
//! All four symbologies share the same digit patterns: each digit is 7
//! modules in 4 runs. Left-half digits carry odd (L) or even (G) parity and
//! right-half digits are the R set, which has the L widths with bars and
//! spaces swapped.

use super::{LineHit, best_match, counters, mod10_check_digit, pattern_variance, quiet_after, quiet_before, span};
use crate::utils::binarization::Run;

const MAX_AVG_VARIANCE: f32 = 0.48;
const MAX_INDIVIDUAL_VARIANCE: f32 = 0.7;

/// Odd parity (L) digit widths, space first
pub const L_PATTERNS: [[u8; 4]; 10] = [
    [3, 2, 1, 1],
    [2, 2, 2, 1],
    [2, 1, 2, 2],
    [1, 4, 1, 1],
    [1, 1, 3, 2],
    [1, 2, 3, 1],
    [1, 1, 1, 4],
    [1, 3, 1, 2],
    [1, 2, 1, 3],
    [3, 1, 1, 2],
];

/// Even parity (G) digit widths: the L widths reversed
pub const G_PATTERNS: [[u8; 4]; 10] = [
    [1, 1, 2, 3],
    [1, 2, 2, 2],
    [2, 2, 1, 2],
    [1, 1, 4, 1],
    [2, 3, 1, 1],
    [1, 3, 2, 1],
    [4, 1, 1, 1],
    [2, 1, 3, 1],
    [3, 1, 2, 1],
    [2, 1, 1, 3],
];

/// L and G patterns in one table; indices 10.. are G
const LG_PATTERNS: [[u8; 4]; 20] = {
    let mut table = [[0u8; 4]; 20];
    let mut i = 0;
    while i < 10 {
        table[i] = L_PATTERNS[i];
        table[i + 10] = G_PATTERNS[i];
        i += 1;
    }
    table
};

/// EAN-13 leading digit by left-half parity (bit set = G, first digit in bit 5)
pub const FIRST_DIGIT_PARITY: [u8; 10] = [0x00, 0x0B, 0x0D, 0x0E, 0x13, 0x19, 0x1C, 0x15, 0x16, 0x1A];

/// UPC-E parity by number system (0 or 1) and check digit
pub const UPCE_PARITY: [[u8; 10]; 2] = [
    [0x38, 0x34, 0x32, 0x31, 0x2C, 0x26, 0x23, 0x2A, 0x29, 0x25],
    [0x07, 0x0B, 0x0D, 0x0E, 0x13, 0x19, 0x1C, 0x15, 0x16, 0x1A],
];

/// Start and end guard (bar, space, bar)
pub const GUARD: [u8; 3] = [1, 1, 1];
/// Centre guard between the two halves
pub const MIDDLE_GUARD: [u8; 5] = [1, 1, 1, 1, 1];
/// UPC-E end guard
pub const UPCE_END_GUARD: [u8; 6] = [1, 1, 1, 1, 1, 1];

/// Run layout of one family member.
struct Layout {
    left_digits: usize,
    right_digits: usize,
    end_guard: &'static [u8],
}

impl Layout {
    const EAN13: Layout = Layout { left_digits: 6, right_digits: 6, end_guard: &GUARD };
    const EAN8: Layout = Layout { left_digits: 4, right_digits: 4, end_guard: &GUARD };
    const UPCE: Layout = Layout { left_digits: 6, right_digits: 0, end_guard: &UPCE_END_GUARD };

    fn runs(&self) -> usize {
        let middle = if self.right_digits > 0 { MIDDLE_GUARD.len() } else { 0 };
        GUARD.len() + 4 * (self.left_digits + self.right_digits) + middle + self.end_guard.len()
    }

    fn modules(&self) -> usize {
        let middle = if self.right_digits > 0 { MIDDLE_GUARD.len() } else { 0 };
        GUARD.len() + 7 * (self.left_digits + self.right_digits) + middle + self.end_guard.len()
    }
}

/// Digits of a framed symbol before family-specific validation.
struct Framed {
    /// (digit, even parity) per left-half digit
    left: Vec<(u8, bool)>,
    right: Vec<u8>,
    start: usize,
    end: usize,
}

impl Framed {
    fn parity_bits(&self) -> u8 {
        self.left
            .iter()
            .fold(0u8, |bits, &(_, even)| (bits << 1) | even as u8)
    }
}

/// Width is within half a nominal width of `modules` modules.
fn fits(width: usize, modules: usize, module: f32) -> bool {
    let nominal = modules as f32 * module;
    (width as f32 - nominal).abs() <= nominal * 0.5
}

fn guard_ok(widths: &[usize], pattern: &[u8], module: f32) -> bool {
    pattern_variance(widths, pattern, MAX_INDIVIDUAL_VARIANCE) < MAX_AVG_VARIANCE
        && fits(widths.iter().sum(), pattern.len(), module)
}

fn digit_at(widths: &[usize], patterns: &[[u8; 4]], module: f32) -> Option<usize> {
    if !fits(widths.iter().sum(), 7, module) {
        return None;
    }
    best_match(widths, patterns, MAX_AVG_VARIANCE, MAX_INDIVIDUAL_VARIANCE)
}

fn frame(runs: &[Run], first: usize, layout: &Layout) -> Option<Framed> {
    let run_count = layout.runs();
    if !runs.get(first)?.dark {
        return None;
    }
    let widths = counters(runs, first, run_count)?;
    let module = widths.iter().sum::<usize>() as f32 / layout.modules() as f32;
    if !quiet_before(runs, first, module) || !quiet_after(runs, first + run_count, module) {
        return None;
    }
    if !guard_ok(&widths[..3], &GUARD, module) {
        return None;
    }

    let mut at = 3;
    let mut left = Vec::with_capacity(layout.left_digits);
    for _ in 0..layout.left_digits {
        let index = digit_at(&widths[at..at + 4], &LG_PATTERNS, module)?;
        left.push(((index % 10) as u8, index >= 10));
        at += 4;
    }

    let mut right = Vec::with_capacity(layout.right_digits);
    if layout.right_digits > 0 {
        if !guard_ok(&widths[at..at + 5], &MIDDLE_GUARD, module) {
            return None;
        }
        at += 5;
        for _ in 0..layout.right_digits {
            right.push(digit_at(&widths[at..at + 4], &L_PATTERNS, module)? as u8);
            at += 4;
        }
    }

    if !guard_ok(&widths[at..], layout.end_guard, module) {
        return None;
    }
    let (start, end) = span(runs, first, first + run_count);
    Some(Framed { left, right, start, end })
}

/// Try every dark run as a symbol start, skipping past each symbol read.
fn scan(runs: &[Run], layout: &Layout, read: impl Fn(Framed) -> Option<String>) -> Vec<LineHit> {
    let run_count = layout.runs();
    let mut hits = Vec::new();
    let mut first = 1;
    while first + run_count < runs.len() {
        if let Some(hit) = frame(runs, first, layout).and_then(|f| {
            let (start, end) = (f.start, f.end);
            read(f).map(|payload| LineHit { payload, start, end })
        }) {
            hits.push(hit);
            first += run_count;
        } else {
            first += 1;
        }
    }
    hits
}

fn digits_to_string(digits: &[u8]) -> String {
    digits.iter().map(|d| char::from(b'0' + d)).collect()
}

fn check_digit_ok(digits: &[u8]) -> bool {
    match digits.split_last() {
        Some((&check, data)) => mod10_check_digit(data) == check,
        None => false,
    }
}

/// EAN-13: 13 digits, the first implied by left-half parity.
pub fn read_ean13(runs: &[Run]) -> Vec<LineHit> {
    scan(runs, &Layout::EAN13, |framed| {
        let parity = framed.parity_bits();
        let first = FIRST_DIGIT_PARITY.iter().position(|&p| p == parity)? as u8;
        let mut digits = vec![first];
        digits.extend(framed.left.iter().map(|&(d, _)| d));
        digits.extend(&framed.right);
        check_digit_ok(&digits).then(|| digits_to_string(&digits))
    })
}

/// UPC-A: an EAN-13 symbol with leading zero, reported as 12 digits.
pub fn read_upca(runs: &[Run]) -> Vec<LineHit> {
    read_ean13(runs)
        .into_iter()
        .filter_map(|hit| {
            let payload = hit.payload.strip_prefix('0')?.to_string();
            Some(LineHit { payload, ..hit })
        })
        .collect()
}

/// EAN-8: 8 digits, all left-half digits odd parity.
pub fn read_ean8(runs: &[Run]) -> Vec<LineHit> {
    scan(runs, &Layout::EAN8, |framed| {
        if framed.parity_bits() != 0 {
            return None;
        }
        let mut digits: Vec<u8> = framed.left.iter().map(|&(d, _)| d).collect();
        digits.extend(&framed.right);
        check_digit_ok(&digits).then(|| digits_to_string(&digits))
    })
}

/// UPC-E: number system and check digit are implied by parity.
///
/// Reported as 8 digits: number system, the 6 encoded digits, check digit.
pub fn read_upce(runs: &[Run]) -> Vec<LineHit> {
    scan(runs, &Layout::UPCE, |framed| {
        let parity = framed.parity_bits();
        let (number_system, check) = UPCE_PARITY.iter().enumerate().find_map(|(ns, table)| {
            table
                .iter()
                .position(|&p| p == parity)
                .map(|check| (ns as u8, check as u8))
        })?;
        let data: Vec<u8> = framed.left.iter().map(|&(d, _)| d).collect();
        let expanded = expand_upce(number_system, &data)?;
        if mod10_check_digit(&expanded) != check {
            return None;
        }
        let mut digits = vec![number_system];
        digits.extend(&data);
        digits.push(check);
        Some(digits_to_string(&digits))
    })
}

/// Expand a zero-suppressed UPC-E body to the 11 UPC-A data digits.
pub fn expand_upce(number_system: u8, data: &[u8]) -> Option<Vec<u8>> {
    let &[d0, d1, d2, d3, d4, d5] = data else {
        return None;
    };
    let body: [u8; 10] = match d5 {
        0..=2 => [d0, d1, d5, 0, 0, 0, 0, d2, d3, d4],
        3 => [d0, d1, d2, 0, 0, 0, 0, 0, d3, d4],
        4 => [d0, d1, d2, d3, 0, 0, 0, 0, 0, d4],
        _ => [d0, d1, d2, d3, d4, 0, 0, 0, 0, d5],
    };
    let mut expanded = vec![number_system];
    expanded.extend(body);
    Some(expanded)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Runs for a module-width sequence, starting light, at `px` samples per module.
    fn runs_from_widths(widths: &[u8], px: usize) -> Vec<Run> {
        let mut runs = Vec::new();
        let mut start = 0;
        for (i, &w) in widths.iter().enumerate() {
            let len = w as usize * px;
            runs.push(Run { dark: i % 2 == 1, start, len });
            start += len;
        }
        runs
    }

    fn ean8_widths(digits: &[u8; 8]) -> Vec<u8> {
        let mut w = vec![10];
        w.extend(GUARD);
        for &d in &digits[..4] {
            w.extend(L_PATTERNS[d as usize]);
        }
        w.extend(MIDDLE_GUARD);
        for &d in &digits[4..] {
            w.extend(L_PATTERNS[d as usize]);
        }
        w.extend(GUARD);
        w.push(10);
        w
    }

    #[test]
    fn test_layout_sizes() {
        assert_eq!((Layout::EAN13.runs(), Layout::EAN13.modules()), (59, 95));
        assert_eq!((Layout::EAN8.runs(), Layout::EAN8.modules()), (43, 67));
        assert_eq!((Layout::UPCE.runs(), Layout::UPCE.modules()), (33, 51));
    }

    #[test]
    fn test_patterns_are_seven_modules() {
        for p in L_PATTERNS.iter().chain(G_PATTERNS.iter()) {
            assert_eq!(p.iter().map(|&x| x as u32).sum::<u32>(), 7);
        }
    }

    #[test]
    fn test_read_ean8_runs() {
        let runs = runs_from_widths(&ean8_widths(&[9, 6, 3, 8, 5, 0, 7, 4]), 2);
        let hits = read_ean8(&runs);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].payload, "96385074");
        assert_eq!(hits[0].start, 20);
        assert_eq!(hits[0].end, 20 + 67 * 2);
    }

    #[test]
    fn test_bad_check_digit_rejected() {
        let runs = runs_from_widths(&ean8_widths(&[9, 6, 3, 8, 5, 0, 7, 5]), 2);
        assert!(read_ean8(&runs).is_empty());
    }

    #[test]
    fn test_missing_quiet_zone_rejected() {
        let mut widths = ean8_widths(&[9, 6, 3, 8, 5, 0, 7, 4]);
        widths[0] = 2;
        let runs = runs_from_widths(&widths, 2);
        assert!(read_ean8(&runs).is_empty());
    }

    #[test]
    fn test_expand_upce() {
        assert_eq!(
            expand_upce(0, &[1, 2, 3, 4, 5, 6]).unwrap(),
            vec![0, 1, 2, 3, 4, 5, 0, 0, 0, 0, 6]
        );
        assert_eq!(
            expand_upce(0, &[4, 2, 5, 2, 6, 1]).unwrap(),
            vec![0, 4, 2, 1, 0, 0, 0, 0, 5, 2, 6]
        );
        assert_eq!(
            expand_upce(1, &[6, 3, 9, 3, 8, 3]).unwrap(),
            vec![1, 6, 3, 9, 0, 0, 0, 0, 0, 3, 8]
        );
        assert!(expand_upce(0, &[1, 2, 3]).is_none());
    }
}
