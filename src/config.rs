//! Scan configuration owned by the controller and tunable pipeline settings

use std::time::Duration;

use log::warn;

use crate::models::Symbology;

/// Which symbologies to detect and whether the illumination source is on.
///
/// Replaced wholesale on every update; there is no partial merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfiguration {
    symbologies: Vec<Symbology>,
    illumination: bool,
}

impl ScanConfiguration {
    /// Build a configuration. Order is preserved; repeated symbologies are dropped.
    pub fn new(symbologies: impl IntoIterator<Item = Symbology>, illumination: bool) -> Self {
        let mut ordered = Vec::new();
        for s in symbologies {
            if !ordered.contains(&s) {
                ordered.push(s);
            }
        }
        Self {
            symbologies: ordered,
            illumination,
        }
    }

    /// Build from host identifiers (`"qr"`, `"ean13"`, ...).
    ///
    /// Unknown identifiers are skipped with a warning. An empty result means
    /// "scan nothing".
    pub fn from_identifiers<I, T>(identifiers: I, illumination: bool) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let symbologies = identifiers.into_iter().filter_map(|id| {
            let id = id.as_ref();
            let parsed = Symbology::from_identifier(id);
            if parsed.is_none() {
                warn!("ignoring unknown barcode type {id:?}");
            }
            parsed
        });
        Self::new(symbologies, illumination)
    }

    /// Enabled symbologies in decode order
    pub fn symbologies(&self) -> &[Symbology] {
        &self.symbologies
    }

    /// Illumination requested
    pub fn illumination(&self) -> bool {
        self.illumination
    }

    /// True when nothing would be decoded
    pub fn is_empty(&self) -> bool {
        self.symbologies.is_empty()
    }
}

impl Default for ScanConfiguration {
    fn default() -> Self {
        Self::new([Symbology::Qr], false)
    }
}

/// Where the decode step runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodeMode {
    /// On the thread calling `tick()`
    #[default]
    Inline,
    /// On the rayon pool; `tick()` returns as soon as the work is dispatched
    Background,
}

/// How detections are grouped for debounce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DebounceKey {
    /// Same payload under two symbologies counts as two codes
    #[default]
    SymbologyAndPayload,
    /// Payload alone
    Payload,
}

/// Tunable pipeline timings and decoder options.
#[derive(Debug, Clone, PartialEq)]
pub struct ScannerSettings {
    min_decode_interval: Duration,
    max_decode_interval: Duration,
    cooldown: Duration,
    retention: Duration,
    debounce_key: DebounceKey,
    decode_mode: DecodeMode,
    scan_lines: usize,
    code39_check_digit: bool,
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self {
            min_decode_interval: Duration::from_millis(80),
            max_decode_interval: Duration::from_millis(500),
            cooldown: Duration::from_millis(1500),
            retention: Duration::from_secs(10),
            debounce_key: DebounceKey::SymbologyAndPayload,
            decode_mode: DecodeMode::Inline,
            scan_lines: 16,
            code39_check_digit: false,
        }
    }
}

fn parse_env_u64(name: &str) -> Option<u64> {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
}

fn parse_env_bool_u8(name: &str) -> Option<bool> {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u8>().ok())
        .map(|v| v != 0)
}

impl ScannerSettings {
    /// Defaults overridden by `SCANNER_*` environment variables.
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        if let Some(ms) = parse_env_u64("SCANNER_MIN_DECODE_INTERVAL_MS") {
            settings = settings.with_min_decode_interval(Duration::from_millis(ms));
        }
        if let Some(ms) = parse_env_u64("SCANNER_MAX_DECODE_INTERVAL_MS") {
            settings = settings.with_max_decode_interval(Duration::from_millis(ms));
        }
        if let Some(ms) = parse_env_u64("SCANNER_COOLDOWN_MS") {
            settings = settings.with_cooldown(Duration::from_millis(ms));
        }
        if let Some(ms) = parse_env_u64("SCANNER_RETENTION_MS") {
            settings = settings.with_retention(Duration::from_millis(ms));
        }
        if let Some(lines) = parse_env_u64("SCANNER_SCAN_LINES") {
            settings = settings.with_scan_lines(lines as usize);
        }
        if let Some(true) = parse_env_bool_u8("SCANNER_BACKGROUND_DECODE") {
            settings = settings.with_decode_mode(DecodeMode::Background);
        }
        if let Some(check) = parse_env_bool_u8("SCANNER_CODE39_CHECK_DIGIT") {
            settings = settings.with_code39_check_digit(check);
        }
        if let Some(true) = parse_env_bool_u8("SCANNER_DEBOUNCE_BY_PAYLOAD") {
            settings = settings.with_debounce_key(DebounceKey::Payload);
        }
        settings
    }

    /// Minimum time between two accepted frames.
    pub fn with_min_decode_interval(mut self, interval: Duration) -> Self {
        self.min_decode_interval = interval;
        self.max_decode_interval = self.max_decode_interval.max(interval);
        self
    }

    /// Ceiling for the adaptive sampler interval.
    pub fn with_max_decode_interval(mut self, interval: Duration) -> Self {
        self.max_decode_interval = interval.max(self.min_decode_interval);
        self
    }

    /// Debounce cooldown window.
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self.retention = self.retention.max(cooldown);
        self
    }

    /// How long idle debounce entries are kept. Never shorter than the cooldown.
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention.max(self.cooldown);
        self
    }

    /// Debounce key policy.
    pub fn with_debounce_key(mut self, key: DebounceKey) -> Self {
        self.debounce_key = key;
        self
    }

    /// Inline or background decoding.
    pub fn with_decode_mode(mut self, mode: DecodeMode) -> Self {
        self.decode_mode = mode;
        self
    }

    /// Rows (and columns) sampled by the 1D decoders. At least one.
    pub fn with_scan_lines(mut self, lines: usize) -> Self {
        self.scan_lines = lines.max(1);
        self
    }

    /// Require a valid mod-43 check character on Code 39 symbols.
    pub fn with_code39_check_digit(mut self, enabled: bool) -> Self {
        self.code39_check_digit = enabled;
        self
    }

    /// Base sampler interval
    pub fn min_decode_interval(&self) -> Duration {
        self.min_decode_interval
    }

    /// Ceiling for the adaptive sampler interval
    pub fn max_decode_interval(&self) -> Duration {
        self.max_decode_interval
    }

    /// Debounce cooldown
    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Debounce entry retention
    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Debounce key policy
    pub fn debounce_key(&self) -> DebounceKey {
        self.debounce_key
    }

    /// Where decodes run
    pub fn decode_mode(&self) -> DecodeMode {
        self.decode_mode
    }

    /// Scan lines per axis for 1D decoding
    pub fn scan_lines(&self) -> usize {
        self.scan_lines
    }

    /// Whether Code 39 check characters are verified
    pub fn code39_check_digit(&self) -> bool {
        self.code39_check_digit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_configuration_is_qr() {
        let config = ScanConfiguration::default();
        assert_eq!(config.symbologies(), &[Symbology::Qr]);
        assert!(!config.illumination());
    }

    #[test]
    fn test_configuration_dedups_in_order() {
        let config = ScanConfiguration::new(
            [Symbology::Code128, Symbology::Qr, Symbology::Code128],
            true,
        );
        assert_eq!(config.symbologies(), &[Symbology::Code128, Symbology::Qr]);
        assert!(config.illumination());
    }

    #[test]
    fn test_from_identifiers_skips_unknown() {
        let config = ScanConfiguration::from_identifiers(["EAN13", "aztec", "upc-e"], false);
        assert_eq!(config.symbologies(), &[Symbology::Ean13, Symbology::UpcE]);

        let empty = ScanConfiguration::from_identifiers(Vec::<String>::new(), false);
        assert!(empty.is_empty());
    }

    #[test]
    fn test_retention_never_below_cooldown() {
        let settings = ScannerSettings::default()
            .with_retention(Duration::from_millis(100))
            .with_cooldown(Duration::from_secs(3));
        assert_eq!(settings.retention(), Duration::from_secs(3));
    }

    #[test]
    fn test_interval_bounds_stay_ordered() {
        let settings = ScannerSettings::default()
            .with_min_decode_interval(Duration::from_millis(900));
        assert!(settings.max_decode_interval() >= settings.min_decode_interval());
        let settings = settings.with_max_decode_interval(Duration::from_millis(10));
        assert_eq!(settings.max_decode_interval(), Duration::from_millis(900));
    }

    #[test]
    fn test_scan_lines_at_least_one() {
        assert_eq!(ScannerSettings::default().with_scan_lines(0).scan_lines(), 1);
    }
}
