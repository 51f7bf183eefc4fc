//! Shared helpers: synthetic code rendering and a recording event sink.
#![allow(dead_code)]

use std::sync::Mutex;
use std::time::Duration;

use simple_scanner::bridge::HostEvent;
use simple_scanner::decoder::linear::code128::{self, CODE_PATTERNS, STOP_PATTERN};
use simple_scanner::decoder::linear::code39::{ALPHABET, ASTERISK_ENCODING, CHARACTER_ENCODINGS};
use simple_scanner::decoder::linear::ean::{
    FIRST_DIGIT_PARITY, G_PATTERNS, GUARD, L_PATTERNS, MIDDLE_GUARD, UPCE_END_GUARD, UPCE_PARITY,
};
use simple_scanner::{Frame, PixelFormat, ScanEventSink, ScanResult, ScannerError, ScannerStatus};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// QR version 1-M encoding "X123" (`#` = dark module)
pub const QR_X123: [&str; 21] = [
    "#######...#...#######",
    "#.....#.#..##.#.....#",
    "#.###.#.....#.#.###.#",
    "#.###.#.......#.###.#",
    "#.###.#.#.###.#.###.#",
    "#.....#....#..#.....#",
    "#######.#.#.#.#######",
    ".....................",
    "#.#.#.#..#..#...#..#.",
    "#....#..#.##.#.#.#..#",
    "#..######.##.###.##.#",
    "...#....##.###.###.#.",
    "##..###.##.#.###.#...",
    "........###...#..#...",
    "#######..##.#...#..##",
    "#.....#.......#..#.#.",
    "#.###.#.###.#.#.##.##",
    "#.###.#...##.#.#.#.#.",
    "#.###.#.##.#.###.#..#",
    "#.....#..#.###.###.#.",
    "#######.#.##.###..###",
];

/// QR version 1-M encoding "BOX-42"
pub const QR_BOX42: [&str; 21] = [
    "#######..#.#..#######",
    "#.....#.#.##..#.....#",
    "#.###.#..##...#.###.#",
    "#.###.#..#..#.#.###.#",
    "#.###.#.##.##.#.###.#",
    "#.....#..###..#.....#",
    "#######.#.#.#.#######",
    ".........#...........",
    "#.#.#.#..#..#...#..#.",
    ".#..#.....##.#.#..##.",
    ".########..#.###.#.##",
    ".##..#.##..###.##..##",
    "#.##.##..#.#.###.##.#",
    "........##....##.###.",
    "#######..#..#...#.###",
    "#.....#.......####.##",
    "#.###.#.#...#.#.#..##",
    "#.###.#..#.#.#..#.##.",
    "#.###.#.#..#.##.###.#",
    "#.....#...####.#.#.#.",
    "#######.#..#.#####.##",
];

/// White luminance canvas that codes are drawn onto.
pub struct Canvas {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl Canvas {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![255; width * height],
        }
    }

    pub fn fill(&mut self, x: usize, y: usize, w: usize, h: usize) {
        for row in y..(y + h).min(self.height) {
            for col in x..(x + w).min(self.width) {
                self.pixels[row * self.width + col] = 0;
            }
        }
    }

    /// Draw alternating bar/space widths (bar first), `px` pixels per module.
    pub fn draw_linear(&mut self, x: usize, y: usize, widths: &[u8], px: usize, height: usize) {
        let mut at = x;
        for (i, &w) in widths.iter().enumerate() {
            let len = w as usize * px;
            if i % 2 == 0 {
                self.fill(at, y, len, height);
            }
            at += len;
        }
    }

    /// Draw a module matrix, `px` pixels per module.
    pub fn draw_matrix(&mut self, x: usize, y: usize, rows: &[&str], px: usize) {
        for (r, row) in rows.iter().enumerate() {
            for (c, module) in row.chars().enumerate() {
                if module == '#' {
                    self.fill(x + c * px, y + r * px, px, px);
                }
            }
        }
    }

    pub fn into_frame(self, timestamp: Duration, sequence: u64) -> Frame {
        Frame::new(
            self.pixels,
            self.width,
            self.height,
            PixelFormat::Luma8,
            timestamp,
            sequence,
        )
    }
}

/// Total modules of a width sequence
pub fn module_count(widths: &[u8]) -> usize {
    widths.iter().map(|&w| w as usize).sum()
}

/// A single linear symbol with 10-module quiet zones.
pub fn linear_frame(widths: &[u8], px: usize) -> Frame {
    let quiet = 10 * px;
    let width = module_count(widths) * px + 2 * quiet;
    let mut canvas = Canvas::new(width, 60);
    canvas.draw_linear(quiet, 5, widths, px, 50);
    canvas.into_frame(Duration::ZERO, 0)
}

/// A single QR symbol with a 4-module quiet zone.
pub fn qr_frame(rows: &[&str], timestamp: Duration) -> Frame {
    let px = 8;
    let side = (rows.len() + 8) * px;
    let mut canvas = Canvas::new(side, side);
    canvas.draw_matrix(4 * px, 4 * px, rows, px);
    canvas.into_frame(timestamp, 0)
}

fn digits(text: &str) -> Vec<u8> {
    text.bytes().map(|b| b - b'0').collect()
}

/// Widths for an EAN-13 payload (13 digits including the check digit).
pub fn ean13_widths(payload: &str) -> Vec<u8> {
    let d = digits(payload);
    let parity = FIRST_DIGIT_PARITY[d[0] as usize];
    let mut w = GUARD.to_vec();
    for (i, &digit) in d[1..7].iter().enumerate() {
        let even = parity & (1 << (5 - i)) != 0;
        let table = if even { &G_PATTERNS } else { &L_PATTERNS };
        w.extend(table[digit as usize]);
    }
    w.extend(MIDDLE_GUARD);
    for &digit in &d[7..] {
        w.extend(L_PATTERNS[digit as usize]);
    }
    w.extend(GUARD);
    w
}

/// Widths for an EAN-8 payload (8 digits including the check digit).
pub fn ean8_widths(payload: &str) -> Vec<u8> {
    let d = digits(payload);
    let mut w = GUARD.to_vec();
    for &digit in &d[..4] {
        w.extend(L_PATTERNS[digit as usize]);
    }
    w.extend(MIDDLE_GUARD);
    for &digit in &d[4..] {
        w.extend(L_PATTERNS[digit as usize]);
    }
    w.extend(GUARD);
    w
}

/// Widths for a UPC-E payload (number system, 6 digits, check digit).
pub fn upce_widths(payload: &str) -> Vec<u8> {
    let d = digits(payload);
    let parity = UPCE_PARITY[d[0] as usize][d[7] as usize];
    let mut w = GUARD.to_vec();
    for (i, &digit) in d[1..7].iter().enumerate() {
        let even = parity & (1 << (5 - i)) != 0;
        let table = if even { &G_PATTERNS } else { &L_PATTERNS };
        w.extend(table[digit as usize]);
    }
    w.extend(UPCE_END_GUARD);
    w
}

/// Widths for Code 128 codes (start code first); appends check and stop.
pub fn code128_widths(codes: &[u8]) -> Vec<u8> {
    let check = code128::checksum(codes);
    let mut w = Vec::new();
    for &code in codes.iter().chain(std::iter::once(&check)) {
        w.extend(CODE_PATTERNS[code as usize]);
    }
    w.extend(STOP_PATTERN);
    w
}

/// Code 128 set B codes for printable ASCII text.
pub fn code128_b(text: &str) -> Vec<u8> {
    let mut codes = vec![code128::START_B];
    codes.extend(text.bytes().map(|b| b - 32));
    codes
}

/// Widths for Code 39 text, optionally with a mod-43 check character.
pub fn code39_widths(text: &str, with_check: bool) -> Vec<u8> {
    let mut values: Vec<usize> = text
        .bytes()
        .map(|b| ALPHABET.iter().position(|&a| a == b).expect("character not in Code 39"))
        .collect();
    if with_check {
        values.push(values.iter().sum::<usize>() % 43);
    }

    let char_widths = |pattern: u16| -> Vec<u8> {
        (0..9)
            .map(|i| if pattern & (1 << (8 - i)) != 0 { 3 } else { 1 })
            .collect()
    };
    let mut w = char_widths(ASTERISK_ENCODING);
    for v in values {
        w.push(1);
        w.extend(char_widths(CHARACTER_ENCODINGS[v]));
    }
    w.push(1);
    w.extend(char_widths(ASTERISK_ENCODING));
    w
}

/// Same symbol read right-to-left.
pub fn mirrored(widths: &[u8]) -> Vec<u8> {
    widths.iter().rev().copied().collect()
}

/// Sink recording every event in host form.
#[derive(Default)]
pub struct EventLog {
    events: Mutex<Vec<HostEvent>>,
}

impl EventLog {
    pub fn events(&self) -> Vec<HostEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Payloads of `onBarcodeScanned` events, in order.
    pub fn payloads(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                HostEvent::BarcodeScanned(s) => Some(s.payload),
                _ => None,
            })
            .collect()
    }

    /// Codes of `onScannerError` events, in order.
    pub fn error_codes(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                HostEvent::ScannerError(err) => Some(err.code),
                _ => None,
            })
            .collect()
    }

    /// Statuses of `onStatusChanged` events, in order.
    pub fn statuses(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                HostEvent::StatusChanged(s) => Some(s.status),
                _ => None,
            })
            .collect()
    }
}

impl ScanEventSink for EventLog {
    fn on_scan_result(&self, result: &ScanResult) {
        self.events
            .lock()
            .unwrap()
            .push(HostEvent::BarcodeScanned(result.into()));
    }

    fn on_error(&self, error: &ScannerError) {
        self.events
            .lock()
            .unwrap()
            .push(HostEvent::ScannerError(error.into()));
    }

    fn on_status(&self, status: ScannerStatus) {
        self.events.lock().unwrap().push(status.into());
    }
}
