mod common;

use common::*;
use simple_scanner::{DecodeEngine, ScannerSettings, Symbology};

fn decode(frame: &simple_scanner::Frame, symbology: Symbology) -> Vec<String> {
    let engine = DecodeEngine::new(&ScannerSettings::default());
    engine
        .decode(frame, &[symbology])
        .unwrap()
        .into_iter()
        .map(|d| {
            assert_eq!(d.symbology, symbology);
            d.payload
        })
        .collect()
}

#[test]
fn test_ean13_both_directions() {
    init_logging();
    let widths = ean13_widths("4006381333931");
    assert_eq!(module_count(&widths), 95);
    assert_eq!(decode(&linear_frame(&widths, 3), Symbology::Ean13), vec!["4006381333931"]);
    assert_eq!(
        decode(&linear_frame(&mirrored(&widths), 3), Symbology::Ean13),
        vec!["4006381333931"]
    );
}

#[test]
fn test_ean13_bad_check_digit() {
    let widths = ean13_widths("4006381333932");
    assert!(decode(&linear_frame(&widths, 3), Symbology::Ean13).is_empty());
}

#[test]
fn test_ean13_bounds_cover_symbol() {
    let widths = ean13_widths("5012345678900");
    let frame = linear_frame(&widths, 2);
    let engine = DecodeEngine::new(&ScannerSettings::default());
    let found = engine.decode(&frame, &[Symbology::Ean13]).unwrap();
    assert_eq!(found.len(), 1);
    let bounds = found[0].bounds.expect("linear detections carry bounds");
    assert_eq!(bounds.x, 20.0);
    assert_eq!(bounds.width, 190.0);
    // merged over every scan row that crosses the bars
    assert!(bounds.height > 30.0, "height {}", bounds.height);
}

#[test]
fn test_upca_reported_without_leading_zero() {
    let frame = linear_frame(&ean13_widths("0036000291452"), 3);
    assert_eq!(decode(&frame, Symbology::UpcA), vec!["036000291452"]);
    assert_eq!(decode(&frame, Symbology::Ean13), vec!["0036000291452"]);

    let engine = DecodeEngine::new(&ScannerSettings::default());
    let both = engine
        .decode(&frame, &[Symbology::Ean13, Symbology::UpcA])
        .unwrap();
    assert_eq!(both.len(), 1);
    assert_eq!(both[0].symbology, Symbology::UpcA);
}

#[test]
fn test_upca_ignores_other_ean13() {
    let frame = linear_frame(&ean13_widths("4006381333931"), 3);
    assert!(decode(&frame, Symbology::UpcA).is_empty());
}

#[test]
fn test_ean8_both_directions() {
    let widths = ean8_widths("96385074");
    assert_eq!(module_count(&widths), 67);
    assert_eq!(decode(&linear_frame(&widths, 3), Symbology::Ean8), vec!["96385074"]);
    assert_eq!(decode(&linear_frame(&mirrored(&widths), 3), Symbology::Ean8), vec!["96385074"]);
    assert!(decode(&linear_frame(&ean8_widths("96385075"), 3), Symbology::Ean8).is_empty());
}

#[test]
fn test_upce_both_directions() {
    let widths = upce_widths("01234565");
    assert_eq!(module_count(&widths), 51);
    assert_eq!(decode(&linear_frame(&widths, 3), Symbology::UpcE), vec!["01234565"]);
    assert_eq!(decode(&linear_frame(&mirrored(&widths), 3), Symbology::UpcE), vec!["01234565"]);
}

#[test]
fn test_upce_wrong_check_digit() {
    // Parity claims check digit 4, expansion computes 5.
    let widths = upce_widths("01234564");
    assert!(decode(&linear_frame(&widths, 3), Symbology::UpcE).is_empty());
}

#[test]
fn test_symbologies_do_not_cross_read() {
    let ean13 = linear_frame(&ean13_widths("4006381333931"), 3);
    assert!(decode(&ean13, Symbology::Ean8).is_empty());
    assert!(decode(&ean13, Symbology::UpcE).is_empty());
    assert!(decode(&ean13, Symbology::Code128).is_empty());
    assert!(decode(&ean13, Symbology::Code39).is_empty());
}

#[test]
fn test_code128_set_b_both_directions() {
    let widths = code128_widths(&code128_b("Hello-128"));
    assert_eq!(decode(&linear_frame(&widths, 2), Symbology::Code128), vec!["Hello-128"]);
    assert_eq!(
        decode(&linear_frame(&mirrored(&widths), 2), Symbology::Code128),
        vec!["Hello-128"]
    );
}

#[test]
fn test_code128_set_c_and_switch() {
    // START C, "12" "34", CODE B, "x"
    let widths = code128_widths(&[105, 12, 34, 100, b'x' - 32]);
    assert_eq!(decode(&linear_frame(&widths, 2), Symbology::Code128), vec!["1234x"]);
}

#[test]
fn test_code128_bad_checksum() {
    let mut widths = code128_widths(&code128_b("ABC"));
    // start, A, B, C, then the check character: replace it with value 0.
    let check_at = 4 * 6;
    widths[check_at..check_at + 6].copy_from_slice(&[2, 1, 2, 2, 2, 2]);
    assert!(decode(&linear_frame(&widths, 2), Symbology::Code128).is_empty());
}

#[test]
fn test_code39_both_directions() {
    let widths = code39_widths("CODE-39", false);
    assert_eq!(decode(&linear_frame(&widths, 2), Symbology::Code39), vec!["CODE-39"]);
    assert_eq!(
        decode(&linear_frame(&mirrored(&widths), 2), Symbology::Code39),
        vec!["CODE-39"]
    );
}

#[test]
fn test_code39_check_digit_setting() {
    let engine = DecodeEngine::new(&ScannerSettings::default().with_code39_check_digit(true));

    let with_check = linear_frame(&code39_widths("CODE-39", true), 2);
    let found = engine.decode(&with_check, &[Symbology::Code39]).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].payload, "CODE-39");

    let without_check = linear_frame(&code39_widths("CODE-39", false), 2);
    assert!(engine.decode(&without_check, &[Symbology::Code39]).unwrap().is_empty());

    // Check verification is off by default: the check character is data.
    assert_eq!(decode(&with_check, Symbology::Code39), vec!["CODE-39P"]);
}

#[test]
fn test_scaled_symbol_still_reads() {
    let widths = ean8_widths("96385074");
    assert_eq!(decode(&linear_frame(&widths, 5), Symbology::Ean8), vec!["96385074"]);
}
