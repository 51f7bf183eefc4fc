use std::time::Duration;

use super::{Bounds, Symbology};

/// Raw decode result, before debounce filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Decoded payload
    pub payload: String,
    /// Symbology the payload was decoded as
    pub symbology: Symbology,
    /// Capture timestamp of the originating frame
    pub timestamp: Duration,
    /// Location in the frame, when the decoder reports one
    pub bounds: Option<Bounds>,
}

impl Detection {
    /// Create a detection without location information
    pub fn new(payload: impl Into<String>, symbology: Symbology, timestamp: Duration) -> Self {
        Self {
            payload: payload.into(),
            symbology,
            timestamp,
            bounds: None,
        }
    }
}

/// Result delivered to the host for a detection classified as new.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanResult {
    /// Decoded payload
    pub payload: String,
    /// Symbology of the code
    pub symbology: Symbology,
    /// Detection timestamp
    pub timestamp: Duration,
    /// Location in the frame
    pub bounds: Option<Bounds>,
}

impl From<Detection> for ScanResult {
    fn from(d: Detection) -> Self {
        Self {
            payload: d.payload,
            symbology: d.symbology,
            timestamp: d.timestamp,
            bounds: d.bounds,
        }
    }
}
