//! Host-facing payloads
//!
//! The host configures the scanner with [`HostProps`] and receives
//! [`HostEvent`]s. Both use the camelCase JSON shapes of the embedding
//! component, so any transport that moves JSON can carry them.

use std::io::Write;
use std::sync::Mutex;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::config::ScanConfiguration;
use crate::controller::{ScanEventSink, ScannerStatus};
use crate::error::ScannerError;
use crate::models::{Bounds, ScanResult, Symbology};

fn default_barcode_types() -> Vec<String> {
    vec![Symbology::Qr.identifier().to_string()]
}

/// Configuration props set by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostProps {
    /// Symbology identifiers, in priority order. Empty detects nothing.
    #[serde(default = "default_barcode_types")]
    pub barcode_types: Vec<String>,
    /// Torch on/off
    #[serde(default)]
    pub flash_enabled: bool,
}

impl Default for HostProps {
    fn default() -> Self {
        Self {
            barcode_types: default_barcode_types(),
            flash_enabled: false,
        }
    }
}

impl HostProps {
    /// Parse props from a JSON object.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Resolve identifiers; unknown ones are dropped with a warning.
    pub fn to_configuration(&self) -> ScanConfiguration {
        ScanConfiguration::from_identifiers(&self.barcode_types, self.flash_enabled)
    }
}

impl From<&ScanConfiguration> for HostProps {
    fn from(config: &ScanConfiguration) -> Self {
        Self {
            barcode_types: config
                .symbologies()
                .iter()
                .map(|s| s.identifier().to_string())
                .collect(),
            flash_enabled: config.illumination(),
        }
    }
}

/// `onBarcodeScanned` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarcodeScannedEvent {
    /// Decoded text
    pub payload: String,
    /// Symbology identifier
    pub symbology: Symbology,
    /// Capture time in seconds on the source clock
    pub timestamp: f64,
    /// Location in the frame
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Bounds>,
}

impl From<&ScanResult> for BarcodeScannedEvent {
    fn from(result: &ScanResult) -> Self {
        Self {
            payload: result.payload.clone(),
            symbology: result.symbology,
            timestamp: result.timestamp.as_secs_f64(),
            bounds: result.bounds,
        }
    }
}

/// `onScannerError` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannerErrorEvent {
    /// Stable error code, e.g. `"CameraUnavailable"`
    pub code: String,
    /// Human-readable detail
    pub message: String,
}

impl From<&ScannerError> for ScannerErrorEvent {
    fn from(error: &ScannerError) -> Self {
        Self {
            code: error.code().to_string(),
            message: error.message().to_string(),
        }
    }
}

/// `onStatusChanged` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChangedEvent {
    /// `"idle"`, `"running"` or `"error"`
    pub status: String,
}

/// Any event sent to the host, tagged with its event name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum HostEvent {
    /// A new code was scanned
    #[serde(rename = "onBarcodeScanned")]
    BarcodeScanned(BarcodeScannedEvent),
    /// A fault was raised
    #[serde(rename = "onScannerError")]
    ScannerError(ScannerErrorEvent),
    /// The controller changed state
    #[serde(rename = "onStatusChanged")]
    StatusChanged(StatusChangedEvent),
}

impl HostEvent {
    /// Event name as seen by the host
    pub fn name(&self) -> &'static str {
        match self {
            HostEvent::BarcodeScanned(_) => "onBarcodeScanned",
            HostEvent::ScannerError(_) => "onScannerError",
            HostEvent::StatusChanged(_) => "onStatusChanged",
        }
    }
}

impl From<ScannerStatus> for HostEvent {
    fn from(status: ScannerStatus) -> Self {
        HostEvent::StatusChanged(StatusChangedEvent {
            status: status.as_str().to_string(),
        })
    }
}

/// Sink writing one JSON object per event and line.
pub struct JsonLinesSink<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    /// Write events to `out`.
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    /// Recover the writer.
    pub fn into_inner(self) -> W {
        self.out
            .into_inner()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write_event(&self, event: &HostEvent) {
        let mut out = self
            .out
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let written = serde_json::to_writer(&mut *out, event)
            .map_err(std::io::Error::from)
            .and_then(|()| writeln!(out))
            .and_then(|()| out.flush());
        if let Err(e) = written {
            warn!("failed to write {} event: {e}", event.name());
        }
    }
}

impl<W: Write + Send> ScanEventSink for JsonLinesSink<W> {
    fn on_scan_result(&self, result: &ScanResult) {
        self.write_event(&HostEvent::BarcodeScanned(result.into()));
    }

    fn on_error(&self, error: &ScannerError) {
        self.write_event(&HostEvent::ScannerError(error.into()));
    }

    fn on_status(&self, status: ScannerStatus) {
        self.write_event(&status.into());
    }
}
