//! simple_scanner - real-time barcode and QR scanning for live camera feeds
//!
//! The pipeline polls a [`FrameSource`], throttles frames with a
//! [`FrameSampler`], decodes the enabled symbologies with the
//! [`DecodeEngine`], filters repeats through the [`Debouncer`] and reports new
//! codes to a host [`ScanEventSink`]. [`ScannerController`] ties it together.
//!
//! ```no_run
//! use std::sync::Arc;
//! use simple_scanner::{
//!     FrameSequence, HostProps, JsonLinesSink, ScannerController, TickOutcome,
//! };
//!
//! let images = vec![image::open("shelf.png").unwrap()];
//! let sink = Arc::new(JsonLinesSink::new(std::io::stdout()));
//! let controller = ScannerController::new(FrameSequence::from_images(&images, 30.0), &sink);
//! controller.update_configuration(
//!     HostProps::from_json(r#"{"barcodeTypes":["qr","ean13"]}"#).unwrap().to_configuration(),
//! );
//! controller.start().unwrap();
//! while controller.tick() != TickOutcome::NoFrame {}
//! controller.stop();
//! ```

#![warn(missing_docs)]
#![allow(clippy::missing_docs_in_private_items)]

/// Host-facing props and event payloads (JSON)
pub mod bridge;
/// Scan configuration and tunable settings
pub mod config;
/// Pipeline controller and host event sink
pub mod controller;
/// Duplicate suppression
pub mod debounce;
/// Symbology decoders (QR, EAN/UPC, Code 128, Code 39)
pub mod decoder;
/// Error taxonomy
pub mod error;
/// Core data structures (Frame, Symbology, Detection, etc.)
pub mod models;
/// Frame throttling
pub mod sampler;
/// Frame sources
pub mod source;
/// Image and dataset helpers
pub mod tools;
/// Utility functions (luminance conversion, scan-line binarization)
pub mod utils;

pub use bridge::{HostEvent, HostProps, JsonLinesSink};
pub use config::{DebounceKey, DecodeMode, ScanConfiguration, ScannerSettings};
pub use controller::{ScanEventSink, ScannerController, ScannerStatus, TickOutcome};
pub use debounce::{Debouncer, Verdict};
pub use decoder::{DecodeEngine, SymbologyDecoder};
pub use error::{ErrorKind, ScannerError, SourceError};
pub use models::{Bounds, Detection, Frame, PixelFormat, Point, ScanResult, Symbology};
pub use sampler::FrameSampler;
pub use source::{FrameSequence, FrameSource};

/// Decode every code of the given symbologies in a single image.
///
/// Convenience for one-shot use: no sampling or debouncing.
pub fn decode_image(
    image: &image::DynamicImage,
    symbologies: &[Symbology],
) -> Result<Vec<Detection>, ScannerError> {
    let settings = ScannerSettings::default();
    let frame = Frame::from_image(image, std::time::Duration::ZERO, 0);
    DecodeEngine::new(&settings).decode(&frame, symbologies)
}
