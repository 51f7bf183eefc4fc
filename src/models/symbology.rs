use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Barcode encoding standard the engine can look for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Symbology {
    /// QR Code (2D matrix)
    Qr,
    /// EAN-13 / JAN
    Ean13,
    /// EAN-8
    Ean8,
    /// Code 128 (sets A/B/C)
    Code128,
    /// UPC-A (EAN-13 with a leading zero)
    UpcA,
    /// UPC-E (zero-suppressed UPC)
    UpcE,
    /// Code 39
    Code39,
}

impl Symbology {
    /// Every symbology in canonical order.
    pub const ALL: [Symbology; 7] = [
        Symbology::Qr,
        Symbology::Ean13,
        Symbology::Ean8,
        Symbology::Code128,
        Symbology::UpcA,
        Symbology::UpcE,
        Symbology::Code39,
    ];

    /// Host-facing identifier, e.g. `"upc-a"`.
    pub fn identifier(self) -> &'static str {
        match self {
            Symbology::Qr => "qr",
            Symbology::Ean13 => "ean13",
            Symbology::Ean8 => "ean8",
            Symbology::Code128 => "code128",
            Symbology::UpcA => "upc-a",
            Symbology::UpcE => "upc-e",
            Symbology::Code39 => "code-39",
        }
    }

    /// Parse a host identifier (case-insensitive). Returns `None` for unknown names.
    pub fn from_identifier(id: &str) -> Option<Self> {
        let id = id.trim();
        Symbology::ALL
            .into_iter()
            .find(|s| s.identifier().eq_ignore_ascii_case(id))
    }

    /// True for one-dimensional (scan-line) symbologies.
    pub fn is_linear(self) -> bool {
        !matches!(self, Symbology::Qr)
    }
}

impl fmt::Display for Symbology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

/// Unknown symbology identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown barcode type: {0}")]
pub struct UnknownSymbology(pub String);

impl FromStr for Symbology {
    type Err = UnknownSymbology;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Symbology::from_identifier(s).ok_or_else(|| UnknownSymbology(s.to_string()))
    }
}

impl TryFrom<String> for Symbology {
    type Error = UnknownSymbology;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Symbology> for String {
    fn from(value: Symbology) -> Self {
        value.identifier().to_string()
    }
}
