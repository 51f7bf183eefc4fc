//! Decode engine
//!
//! Runs one decoder per enabled symbology over a sampled frame:
//! - Frame validation and luminance conversion (once per frame)
//! - QR codes through `rqrr` grid detection
//! - 1D symbologies (EAN/UPC, Code 128, Code 39) over shared scan lines
//!
//! Decoders run in parallel on the rayon pool; results keep configuration order.

/// 1D symbologies read from scan lines
pub mod linear;
/// QR codes
pub mod qr;

use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::OnceLock;

use log::{debug, warn};
use rayon::prelude::*;

use crate::config::ScannerSettings;
use crate::error::{ErrorKind, ScannerError};
use crate::models::{Bounds, Detection, Frame, Symbology};
use crate::utils::binarization::{Run, binarize_line};
use crate::utils::grayscale::frame_to_luma;

pub use linear::LinearDecoder;
pub use qr::QrDecoder;

/// A decoded symbol before it is stamped with the frame timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    /// Symbology the decoder reads
    pub symbology: Symbology,
    /// Decoded text
    pub payload: String,
    /// Location in frame pixels
    pub bounds: Option<Bounds>,
}

/// One symbology-specific decoder.
///
/// An unreadable or absent symbol is not an error: return an empty vector.
/// Panics are caught by the engine and reported as a decode engine fault.
pub trait SymbologyDecoder: Send + Sync {
    /// The symbology this decoder produces
    fn symbology(&self) -> Symbology;

    /// Find every symbol of this symbology in the image
    fn decode(&self, image: &LumaImage) -> Vec<Symbol>;
}

/// Orientation of a scan line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Horizontal line at this y
    Row(usize),
    /// Vertical line at this x
    Column(usize),
}

/// A binarized, run-length encoded line through the image.
#[derive(Debug, Clone)]
pub struct ScanLine {
    /// Where the line lies
    pub axis: Axis,
    /// Number of samples on the line
    pub len: usize,
    /// Runs read left-to-right (or top-to-bottom)
    pub forward: Vec<Run>,
    /// Runs read in the opposite direction, positions in that direction
    pub reverse: Vec<Run>,
}

impl ScanLine {
    fn new(axis: Axis, samples: &[u8]) -> Self {
        let forward = binarize_line(samples);
        let len = samples.len();
        let reverse = forward
            .iter()
            .rev()
            .map(|r| Run {
                dark: r.dark,
                start: len - r.start - r.len,
                len: r.len,
            })
            .collect();
        Self {
            axis,
            len,
            forward,
            reverse,
        }
    }

    /// Bounds of the sample range `[start, end)` on this line.
    pub fn bounds(&self, start: usize, end: usize, reversed: bool) -> Bounds {
        let (start, end) = if reversed {
            (self.len - end, self.len - start)
        } else {
            (start, end)
        };
        let extent = (end - start) as f32;
        match self.axis {
            Axis::Row(y) => Bounds {
                x: start as f32,
                y: y as f32,
                width: extent,
                height: 1.0,
            },
            Axis::Column(x) => Bounds {
                x: x as f32,
                y: start as f32,
                width: 1.0,
                height: extent,
            },
        }
    }
}

/// Packed luminance plane of one frame, with lazily built scan lines.
pub struct LumaImage {
    pixels: Vec<u8>,
    width: usize,
    height: usize,
    line_count: usize,
    lines: OnceLock<Vec<ScanLine>>,
}

impl LumaImage {
    /// Wrap a packed luminance plane.
    pub fn new(pixels: Vec<u8>, width: usize, height: usize, line_count: usize) -> Self {
        Self {
            pixels,
            width,
            height,
            line_count: line_count.max(1),
            lines: OnceLock::new(),
        }
    }

    /// Convert a validated frame.
    pub fn from_frame(frame: &Frame, line_count: usize) -> Self {
        Self::new(frame_to_luma(frame), frame.width(), frame.height(), line_count)
    }

    /// Packed luminance, `width * height` bytes
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Width in pixels
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> usize {
        self.height
    }

    /// Evenly spaced rows followed by evenly spaced columns.
    pub fn scan_lines(&self) -> &[ScanLine] {
        self.lines.get_or_init(|| self.build_scan_lines())
    }

    fn build_scan_lines(&self) -> Vec<ScanLine> {
        let rows = line_positions(self.height, self.line_count)
            .into_iter()
            .map(Axis::Row);
        let cols = line_positions(self.width, self.line_count)
            .into_iter()
            .map(Axis::Column);
        let axes: Vec<Axis> = rows.chain(cols).collect();

        axes.into_par_iter()
            .map(|axis| match axis {
                Axis::Row(y) => {
                    let row = &self.pixels[y * self.width..(y + 1) * self.width];
                    ScanLine::new(axis, row)
                }
                Axis::Column(x) => {
                    let column: Vec<u8> = (0..self.height)
                        .map(|y| self.pixels[y * self.width + x])
                        .collect();
                    ScanLine::new(axis, &column)
                }
            })
            .collect()
    }
}

/// `count` distinct positions spread over `extent`, away from the edges.
fn line_positions(extent: usize, count: usize) -> Vec<usize> {
    let mut positions: Vec<usize> = (1..=count)
        .map(|k| k * extent / (count + 1))
        .filter(|&p| p < extent)
        .collect();
    positions.dedup();
    positions
}

/// Add a symbol, merging it into an earlier one with the same payload.
pub(crate) fn merge_symbol(found: &mut Vec<Symbol>, symbol: Symbol) {
    if let Some(existing) = found.iter_mut().find(|s| s.payload == symbol.payload) {
        existing.bounds = match (existing.bounds, symbol.bounds) {
            (Some(a), Some(b)) => Some(a.union(&b)),
            (a, b) => a.or(b),
        };
    } else {
        found.push(symbol);
    }
}

/// Runs the enabled symbology decoders over frames.
pub struct DecodeEngine {
    decoders: HashMap<Symbology, Box<dyn SymbologyDecoder>>,
    scan_lines: usize,
}

impl DecodeEngine {
    /// Engine with the built-in decoder for every symbology.
    pub fn new(settings: &ScannerSettings) -> Self {
        let mut engine = Self {
            decoders: HashMap::new(),
            scan_lines: settings.scan_lines(),
        };
        engine.register(Box::new(QrDecoder));
        for symbology in Symbology::ALL.into_iter().filter(|s| s.is_linear()) {
            engine.register(Box::new(LinearDecoder::new(
                symbology,
                settings.code39_check_digit(),
            )));
        }
        engine
    }

    /// Engine with no decoders registered.
    pub fn empty(settings: &ScannerSettings) -> Self {
        Self {
            decoders: HashMap::new(),
            scan_lines: settings.scan_lines(),
        }
    }

    /// Install a decoder, replacing any existing one for the same symbology.
    pub fn register(&mut self, decoder: Box<dyn SymbologyDecoder>) {
        self.decoders.insert(decoder.symbology(), decoder);
    }

    /// Builder form of [`DecodeEngine::register`].
    pub fn with_decoder(mut self, decoder: Box<dyn SymbologyDecoder>) -> Self {
        self.register(decoder);
        self
    }

    /// True when a decoder is installed for the symbology
    pub fn supports(&self, symbology: Symbology) -> bool {
        self.decoders.contains_key(&symbology)
    }

    /// Decode every enabled symbology in the frame.
    ///
    /// Detections are ordered by the position of their symbology in
    /// `symbologies`, then by the decoder's own order. An empty list returns
    /// immediately without touching the frame.
    pub fn decode(
        &self,
        frame: &Frame,
        symbologies: &[Symbology],
    ) -> Result<Vec<Detection>, ScannerError> {
        if symbologies.is_empty() {
            return Ok(Vec::new());
        }
        frame.validate()?;

        let image = LumaImage::from_frame(frame, self.scan_lines);
        let per_symbology: Vec<Result<Vec<Symbol>, ScannerError>> = symbologies
            .par_iter()
            .map(|&symbology| self.run_decoder(symbology, &image))
            .collect();

        let mut detections = Vec::new();
        for symbols in per_symbology {
            detections.extend(symbols?.into_iter().map(|s| Detection {
                payload: s.payload,
                symbology: s.symbology,
                timestamp: frame.timestamp(),
                bounds: s.bounds,
            }));
        }
        if symbologies.contains(&Symbology::UpcA) {
            drop_upca_duplicates(&mut detections);
        }
        debug!(
            "frame {}: {} detection(s) across {} symbolog(ies)",
            frame.sequence(),
            detections.len(),
            symbologies.len()
        );
        Ok(detections)
    }

    fn run_decoder(
        &self,
        symbology: Symbology,
        image: &LumaImage,
    ) -> Result<Vec<Symbol>, ScannerError> {
        let Some(decoder) = self.decoders.get(&symbology) else {
            debug!("no decoder registered for {symbology}");
            return Ok(Vec::new());
        };
        panic::catch_unwind(AssertUnwindSafe(|| decoder.decode(image))).map_err(|payload| {
            let reason = panic_message(payload.as_ref());
            warn!("{symbology} decoder failed: {reason}");
            ScannerError::new(
                ErrorKind::DecodeEngineFault,
                format!("{symbology} decoder failed: {reason}"),
            )
        })
    }
}

/// A UPC-A symbol also reads as EAN-13 with a leading zero; report it once, as UPC-A.
fn drop_upca_duplicates(detections: &mut Vec<Detection>) {
    let upca: Vec<String> = detections
        .iter()
        .filter(|d| d.symbology == Symbology::UpcA)
        .map(|d| format!("0{}", d.payload))
        .collect();
    detections.retain(|d| d.symbology != Symbology::Ean13 || !upca.contains(&d.payload));
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
