//! Code 39 reader
//!
//! Each character is 9 elements (5 bars, 4 spaces), 3 of them wide,
//! followed by a narrow inter-character gap. Symbols are framed by `*`.

use super::{LineHit, counters, quiet_after, quiet_before, span};
use crate::utils::binarization::Run;

/// Characters in value order (value = mod-43 weight)
pub const ALPHABET: &[u8; 43] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ-. $/+%";

/// Wide-element bitmaps in alphabet order, first element in bit 8
pub const CHARACTER_ENCODINGS: [u16; 43] = [
    0x034, 0x121, 0x061, 0x160, 0x031, 0x130, 0x070, 0x025, 0x124, 0x064, // 0-9
    0x109, 0x049, 0x148, 0x019, 0x118, 0x058, 0x00D, 0x10C, 0x04C, 0x01C, // A-J
    0x103, 0x043, 0x142, 0x013, 0x112, 0x052, 0x007, 0x106, 0x046, 0x016, // K-T
    0x181, 0x0C1, 0x1C0, 0x091, 0x190, 0x0D0, 0x085, 0x184, 0x0C4, 0x0A8, // U-*
    0x0A2, 0x08A, 0x02A, // /+%
];

/// Wide-element bitmap of the `*` start/stop character
pub const ASTERISK_ENCODING: u16 = 0x094;

/// Smallest accepted ratio between the narrowest wide and widest narrow element
const MIN_WIDE_RATIO: f32 = 1.5;

/// A decoded character: `None` for the `*` delimiter.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Character {
    value: Option<u8>,
    narrow: f32,
}

fn decode_character(widths: &[usize]) -> Option<Character> {
    let mut order: Vec<usize> = (0..widths.len()).collect();
    order.sort_by(|&a, &b| widths[b].cmp(&widths[a]));
    let (wide, narrow) = order.split_at(3);

    let min_wide = wide.iter().map(|&i| widths[i]).min()?;
    let max_narrow = narrow.iter().map(|&i| widths[i]).max()?;
    if (min_wide as f32) < max_narrow as f32 * MIN_WIDE_RATIO {
        return None;
    }

    let pattern = wide
        .iter()
        .fold(0u16, |bits, &i| bits | 1 << (widths.len() - 1 - i));
    let narrow_width =
        narrow.iter().map(|&i| widths[i]).sum::<usize>() as f32 / narrow.len() as f32;
    let value = if pattern == ASTERISK_ENCODING {
        None
    } else {
        Some(CHARACTER_ENCODINGS.iter().position(|&p| p == pattern)? as u8)
    };
    Some(Character {
        value,
        narrow: narrow_width,
    })
}

/// Read every Code 39 symbol on one line direction.
///
/// With `check_digit`, the last data character must be the modulo-43 sum of
/// the others and is removed from the payload.
pub fn read(runs: &[Run], check_digit: bool) -> Vec<LineHit> {
    let mut hits = Vec::new();
    let mut first = 1;
    while first < runs.len() {
        match read_symbol(runs, first, check_digit) {
            Some((hit, next)) => {
                hits.push(hit);
                first = next;
            }
            None => first += 1,
        }
    }
    hits
}

fn read_symbol(runs: &[Run], first: usize, check_digit: bool) -> Option<(LineHit, usize)> {
    if !runs.get(first)?.dark {
        return None;
    }
    let start = decode_character(&counters(runs, first, 9)?)?;
    if start.value.is_some() || !quiet_before(runs, first, start.narrow) {
        return None;
    }

    let mut values = Vec::new();
    let mut at = first + 9;
    loop {
        // inter-character gap
        let gap = runs.get(at)?;
        if gap.dark || gap.len as f32 > start.narrow * 3.0 {
            return None;
        }
        at += 1;
        let character = decode_character(&counters(runs, at, 9)?)?;
        at += 9;
        match character.value {
            Some(value) => values.push(value),
            None => {
                if !quiet_after(runs, at, character.narrow) {
                    return None;
                }
                break;
            }
        }
    }

    if check_digit {
        let (&check, data) = values.split_last()?;
        let sum: u32 = data.iter().map(|&v| v as u32).sum();
        if sum % 43 != check as u32 {
            return None;
        }
        values.pop();
    }
    if values.is_empty() {
        return None;
    }

    let payload = values.iter().map(|&v| char::from(ALPHABET[v as usize])).collect();
    let (start_px, end_px) = span(runs, first, at);
    Some((LineHit { payload, start: start_px, end: end_px }, at))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widths_for(pattern: u16, narrow: usize, wide: usize) -> Vec<usize> {
        (0..9)
            .map(|i| if pattern & (1 << (8 - i)) != 0 { wide } else { narrow })
            .collect()
    }

    #[test]
    fn test_encodings_have_three_wide() {
        for &p in CHARACTER_ENCODINGS.iter().chain([ASTERISK_ENCODING].iter()) {
            assert_eq!(p.count_ones(), 3, "{p:#x}");
        }
    }

    #[test]
    fn test_decode_character() {
        let a = decode_character(&widths_for(0x109, 2, 5)).unwrap();
        assert_eq!(a.value, Some(10));
        assert_eq!(a.narrow, 2.0);
        let star = decode_character(&widths_for(ASTERISK_ENCODING, 3, 7)).unwrap();
        assert_eq!(star, Character { value: None, narrow: 3.0 });
    }

    #[test]
    fn test_ambiguous_widths_rejected() {
        assert!(decode_character(&widths_for(0x109, 4, 5)).is_none());
    }
}
