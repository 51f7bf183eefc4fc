//! Code 128 reader
//!
//! Symbol layout: quiet zone, start character, data characters, check
//! character, stop pattern, quiet zone. Every character is 11 modules in
//! 6 runs; the stop pattern is 13 modules in 7 runs.

use super::{LineHit, best_match, counters, pattern_variance, quiet_after, quiet_before, span};
use crate::utils::binarization::Run;

const MAX_AVG_VARIANCE: f32 = 0.25;
const MAX_INDIVIDUAL_VARIANCE: f32 = 0.7;

/// Start character selecting code set A
pub const START_A: u8 = 103;
/// Start character selecting code set B
pub const START_B: u8 = 104;
/// Start character selecting code set C
pub const START_C: u8 = 105;

const SHIFT: u8 = 98;
const CODE_C: u8 = 99;
const CODE_B: u8 = 100;
const CODE_A: u8 = 101;
const FNC_1: u8 = 102;
const FNC_2: u8 = 97;
const FNC_3: u8 = 96;

/// Group separator emitted for FNC1 in data position
const GS: char = '\u{1d}';

/// Stop pattern including the terminating 2-module bar
pub const STOP_PATTERN: [u8; 7] = [2, 3, 3, 1, 1, 1, 2];

/// Bar/space widths of code values 0..=105
pub const CODE_PATTERNS: [[u8; 6]; 106] = [
    [2, 1, 2, 2, 2, 2],
    [2, 2, 2, 1, 2, 2],
    [2, 2, 2, 2, 2, 1],
    [1, 2, 1, 2, 2, 3],
    [1, 2, 1, 3, 2, 2],
    [1, 3, 1, 2, 2, 2],
    [1, 2, 2, 2, 1, 3],
    [1, 2, 2, 3, 1, 2],
    [1, 3, 2, 2, 1, 2],
    [2, 2, 1, 2, 1, 3],
    [2, 2, 1, 3, 1, 2],
    [2, 3, 1, 2, 1, 2],
    [1, 1, 2, 2, 3, 2],
    [1, 2, 2, 1, 3, 2],
    [1, 2, 2, 2, 3, 1],
    [1, 1, 3, 2, 2, 2],
    [1, 2, 3, 1, 2, 2],
    [1, 2, 3, 2, 2, 1],
    [2, 2, 3, 2, 1, 1],
    [2, 2, 1, 1, 3, 2],
    [2, 2, 1, 2, 3, 1],
    [2, 1, 3, 2, 1, 2],
    [2, 2, 3, 1, 1, 2],
    [3, 1, 2, 1, 3, 1],
    [3, 1, 1, 2, 2, 2],
    [3, 2, 1, 1, 2, 2],
    [3, 2, 1, 2, 2, 1],
    [3, 1, 2, 2, 1, 2],
    [3, 2, 2, 1, 1, 2],
    [3, 2, 2, 2, 1, 1],
    [2, 1, 2, 1, 2, 3],
    [2, 1, 2, 3, 2, 1],
    [2, 3, 2, 1, 2, 1],
    [1, 1, 1, 3, 2, 3],
    [1, 3, 1, 1, 2, 3],
    [1, 3, 1, 3, 2, 1],
    [1, 1, 2, 3, 1, 3],
    [1, 3, 2, 1, 1, 3],
    [1, 3, 2, 3, 1, 1],
    [2, 1, 1, 3, 1, 3],
    [2, 3, 1, 1, 1, 3],
    [2, 3, 1, 3, 1, 1],
    [1, 1, 2, 1, 3, 3],
    [1, 1, 2, 3, 3, 1],
    [1, 3, 2, 1, 3, 1],
    [1, 1, 3, 1, 2, 3],
    [1, 1, 3, 3, 2, 1],
    [1, 3, 3, 1, 2, 1],
    [3, 1, 3, 1, 2, 1],
    [2, 1, 1, 3, 3, 1],
    [2, 3, 1, 1, 3, 1],
    [2, 1, 3, 1, 1, 3],
    [2, 1, 3, 3, 1, 1],
    [2, 1, 3, 1, 3, 1],
    [3, 1, 1, 1, 2, 3],
    [3, 1, 1, 3, 2, 1],
    [3, 3, 1, 1, 2, 1],
    [3, 1, 2, 1, 1, 3],
    [3, 1, 2, 3, 1, 1],
    [3, 3, 2, 1, 1, 1],
    [3, 1, 4, 1, 1, 1],
    [2, 2, 1, 4, 1, 1],
    [4, 3, 1, 1, 1, 1],
    [1, 1, 1, 2, 2, 4],
    [1, 1, 1, 4, 2, 2],
    [1, 2, 1, 1, 2, 4],
    [1, 2, 1, 4, 2, 1],
    [1, 4, 1, 1, 2, 2],
    [1, 4, 1, 2, 2, 1],
    [1, 1, 2, 2, 1, 4],
    [1, 1, 2, 4, 1, 2],
    [1, 2, 2, 1, 1, 4],
    [1, 2, 2, 4, 1, 1],
    [1, 4, 2, 1, 1, 2],
    [1, 4, 2, 2, 1, 1],
    [2, 4, 1, 2, 1, 1],
    [2, 2, 1, 1, 1, 4],
    [4, 1, 3, 1, 1, 1],
    [2, 4, 1, 1, 1, 2],
    [1, 3, 4, 1, 1, 1],
    [1, 1, 1, 2, 4, 2],
    [1, 2, 1, 1, 4, 2],
    [1, 2, 1, 2, 4, 1],
    [1, 1, 4, 2, 1, 2],
    [1, 2, 4, 1, 1, 2],
    [1, 2, 4, 2, 1, 1],
    [4, 1, 1, 2, 1, 2],
    [4, 2, 1, 1, 1, 2],
    [4, 2, 1, 2, 1, 1],
    [2, 1, 2, 1, 4, 1],
    [2, 1, 4, 1, 2, 1],
    [4, 1, 2, 1, 2, 1],
    [1, 1, 1, 1, 4, 3],
    [1, 1, 1, 3, 4, 1],
    [1, 3, 1, 1, 4, 1],
    [1, 1, 4, 1, 1, 3],
    [1, 1, 4, 3, 1, 1],
    [4, 1, 1, 1, 1, 3],
    [4, 1, 1, 3, 1, 1],
    [1, 1, 3, 1, 4, 1],
    [1, 1, 4, 1, 3, 1],
    [3, 1, 1, 1, 4, 1],
    [4, 1, 1, 1, 3, 1],
    [2, 1, 1, 4, 1, 2],
    [2, 1, 1, 2, 1, 4],
    [2, 1, 1, 2, 3, 2],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CodeSet {
    A,
    B,
    C,
}

impl CodeSet {
    fn from_start(code: u8) -> Option<Self> {
        match code {
            START_A => Some(CodeSet::A),
            START_B => Some(CodeSet::B),
            START_C => Some(CodeSet::C),
            _ => None,
        }
    }

    fn other(self) -> Self {
        match self {
            CodeSet::A => CodeSet::B,
            CodeSet::B => CodeSet::A,
            CodeSet::C => CodeSet::C,
        }
    }
}

/// Read every Code 128 symbol on one line direction.
pub fn read(runs: &[Run]) -> Vec<LineHit> {
    let mut hits = Vec::new();
    let mut first = 1;
    while first < runs.len() {
        match read_symbol(runs, first) {
            Some((hit, next)) => {
                hits.push(hit);
                first = next;
            }
            None => first += 1,
        }
    }
    hits
}

/// Frame and decode one symbol starting at run `first`.
///
/// Returns the hit and the index of the run after the trailing quiet zone.
fn read_symbol(runs: &[Run], first: usize) -> Option<(LineHit, usize)> {
    if !runs.get(first)?.dark {
        return None;
    }
    let start_widths = counters(runs, first, 6)?;
    let start = best_match(&start_widths, &CODE_PATTERNS, MAX_AVG_VARIANCE, MAX_INDIVIDUAL_VARIANCE)? as u8;
    CodeSet::from_start(start)?;
    let module = start_widths.iter().sum::<usize>() as f32 / 11.0;
    if !quiet_before(runs, first, module) {
        return None;
    }

    let mut codes = vec![start];
    let mut at = first + 6;
    loop {
        if let Some(stop_widths) = counters(runs, at, STOP_PATTERN.len()) {
            if pattern_variance(&stop_widths, &STOP_PATTERN, MAX_INDIVIDUAL_VARIANCE) < MAX_AVG_VARIANCE {
                let stop_module = stop_widths.iter().sum::<usize>() as f32 / 13.0;
                if quiet_after(runs, at + STOP_PATTERN.len(), stop_module) {
                    break;
                }
                return None;
            }
        }
        let widths = counters(runs, at, 6)?;
        let code = best_match(&widths, &CODE_PATTERNS, MAX_AVG_VARIANCE, MAX_INDIVIDUAL_VARIANCE)?;
        codes.push(code as u8);
        at += 6;
    }

    // start, at least one data character, check character
    if codes.len() < 3 {
        return None;
    }
    let (&check, body) = codes.split_last()?;
    if checksum(body) != check {
        return None;
    }
    let payload = translate(body)?;
    let end = at + STOP_PATTERN.len();
    let (start_px, end_px) = span(runs, first, end);
    Some((LineHit { payload, start: start_px, end: end_px }, end))
}

/// Weighted modulo-103 checksum over the start code and data codes.
pub fn checksum(codes: &[u8]) -> u8 {
    let sum: u32 = codes
        .iter()
        .enumerate()
        .map(|(i, &code)| i.max(1) as u32 * code as u32)
        .sum();
    (sum % 103) as u8
}

/// Translate start code plus data codes into text.
fn translate(codes: &[u8]) -> Option<String> {
    let (&start, data) = codes.split_first()?;
    let mut set = CodeSet::from_start(start)?;
    let mut text = String::new();
    let mut shifted = false;
    let mut upper = false;

    for (position, &code) in data.iter().enumerate() {
        let active = if shifted {
            if set == CodeSet::C {
                return None;
            }
            set.other()
        } else {
            set
        };
        let was_shifted = shifted;
        shifted = false;

        match (active, code) {
            (_, START_A..) => return None,
            (_, FNC_1) => {
                // A leading FNC1 marks GS1 data and carries no text.
                if position > 0 {
                    text.push(GS);
                }
            }
            (CodeSet::C, 0..=99) => text.push_str(&format!("{code:02}")),
            (CodeSet::C, CODE_B) => set = CodeSet::B,
            (CodeSet::C, CODE_A) => set = CodeSet::A,
            (_, FNC_2 | FNC_3) => {}
            (CodeSet::A | CodeSet::B, SHIFT) if !was_shifted => shifted = true,
            (CodeSet::A | CodeSet::B, CODE_C) => set = CodeSet::C,
            (CodeSet::A, CODE_B) | (CodeSet::B, CODE_A) => set = active.other(),
            (CodeSet::A, CODE_A) | (CodeSet::B, CODE_B) => upper = true,
            (CodeSet::A, 0..=63) | (CodeSet::B, 0..=95) => {
                let offset = if upper { 128 } else { 0 };
                upper = false;
                text.push(char::from(code + 32 + offset));
            }
            (CodeSet::A, 64..=95) => {
                let offset = if upper { 128 } else { 0 };
                upper = false;
                text.push(char::from(code - 64 + offset));
            }
            _ => return None,
        }
    }
    Some(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patterns_are_eleven_modules() {
        for p in CODE_PATTERNS.iter() {
            assert_eq!(p.iter().map(|&x| x as u32).sum::<u32>(), 11);
        }
        assert_eq!(STOP_PATTERN.iter().map(|&x| x as u32).sum::<u32>(), 13);
    }

    #[test]
    fn test_checksum() {
        // "PJJ123C" in set B
        let codes = [104, 48, 42, 42, 17, 18, 19, 35];
        assert_eq!(checksum(&codes), 55);
    }

    #[test]
    fn test_translate_sets() {
        assert_eq!(translate(&[START_B, 33, 34, 35]).unwrap(), "ABC");
        assert_eq!(translate(&[START_C, 12, 34, 5]).unwrap(), "123405");
        assert_eq!(translate(&[START_A, 33, 77]).unwrap(), "A\r");
        assert_eq!(translate(&[START_C, 12, CODE_B, 65]).unwrap(), "12a");
    }

    #[test]
    fn test_translate_shift_and_fnc1() {
        // Set A, shift one character into B for lowercase
        assert_eq!(translate(&[START_A, 33, SHIFT, 65, 33]).unwrap(), "AaA");
        assert_eq!(translate(&[START_C, FNC_1, 1, FNC_1, 10]).unwrap(), "01\u{1d}10");
    }

    #[test]
    fn test_translate_rejects_start_in_data() {
        assert!(translate(&[START_B, 33, START_C]).is_none());
    }
}
