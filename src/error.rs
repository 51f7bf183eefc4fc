//! Error types for the scanning pipeline

use std::fmt;

use thiserror::Error;

/// Stable error codes reported to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The frame source cannot supply frames
    CameraUnavailable,
    /// The frame source refused access
    PermissionDenied,
    /// Torch/flash could not be toggled; scanning continues without it
    IlluminationUnavailable,
    /// The decode machinery failed (not a frame without a code)
    DecodeEngineFault,
    /// Empty or unusable symbology set; informational
    InvalidConfiguration,
    /// The frame source failed to initialise
    ConfigurationFailed,
}

impl ErrorKind {
    /// Code string sent in `onScannerError`
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::CameraUnavailable => "CameraUnavailable",
            ErrorKind::PermissionDenied => "PermissionDenied",
            ErrorKind::IlluminationUnavailable => "IlluminationUnavailable",
            ErrorKind::DecodeEngineFault => "DecodeEngineFault",
            ErrorKind::InvalidConfiguration => "InvalidConfiguration",
            ErrorKind::ConfigurationFailed => "ConfigurationFailed",
        }
    }

    /// Informational kinds are reported but never move the controller into `Error`.
    pub fn is_informational(self) -> bool {
        matches!(self, ErrorKind::InvalidConfiguration)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Pipeline-level failure delivered through `onScannerError`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ScannerError {
    kind: ErrorKind,
    message: String,
}

impl ScannerError {
    /// Create an error of the given kind
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Error kind
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Stable code string
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Human-readable detail
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Failure reported by a frame source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// No device, or the stream stopped delivering
    #[error("camera unavailable: {0}")]
    Unavailable(String),
    /// The user or platform refused access
    #[error("camera permission not granted")]
    PermissionDenied,
    /// The capture session could not be set up
    #[error("failed to configure camera session: {0}")]
    Configuration(String),
}

impl From<SourceError> for ScannerError {
    fn from(err: SourceError) -> Self {
        let kind = match err {
            SourceError::Unavailable(_) => ErrorKind::CameraUnavailable,
            SourceError::PermissionDenied => ErrorKind::PermissionDenied,
            SourceError::Configuration(_) => ErrorKind::ConfigurationFailed,
        };
        ScannerError::new(kind, err.to_string())
    }
}

/// The illumination source could not be switched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("illumination unavailable: {0}")]
pub struct IlluminationUnavailable(pub String);

impl From<IlluminationUnavailable> for ScannerError {
    fn from(err: IlluminationUnavailable) -> Self {
        ScannerError::new(ErrorKind::IlluminationUnavailable, err.to_string())
    }
}

/// Frame header and buffer disagree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Width or height is zero
    #[error("frame has empty dimensions {width}x{height}")]
    EmptyDimensions {
        /// Pixels per row
        width: usize,
        /// Rows
        height: usize,
    },
    /// A row does not fit in the stride
    #[error("row stride {stride} is smaller than a row ({row_bytes} bytes)")]
    StrideTooSmall {
        /// Bytes per row in the buffer
        stride: usize,
        /// Bytes one row of pixels needs
        row_bytes: usize,
    },
    /// The buffer ends before the last row
    #[error("frame buffer too short: expected {expected} bytes, got {actual}")]
    BufferTooShort {
        /// Bytes the header describes
        expected: usize,
        /// Bytes present
        actual: usize,
    },
    /// The header describes more bytes than can be addressed
    #[error("frame header {width}x{height} (stride {stride}) overflows the address space")]
    Overflow {
        /// Pixels per row
        width: usize,
        /// Rows
        height: usize,
        /// Bytes per row
        stride: usize,
    },
}

impl From<FrameError> for ScannerError {
    fn from(err: FrameError) -> Self {
        ScannerError::new(ErrorKind::DecodeEngineFault, err.to_string())
    }
}
