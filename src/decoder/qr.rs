//! QR code decoding via `rqrr`.

use log::debug;

use super::{LumaImage, Symbol, SymbologyDecoder, merge_symbol};
use crate::models::{Bounds, Point, Symbology};

/// QR decoder: finder-pattern grid detection followed by grid decoding.
#[derive(Debug, Default, Clone, Copy)]
pub struct QrDecoder;

impl SymbologyDecoder for QrDecoder {
    fn symbology(&self) -> Symbology {
        Symbology::Qr
    }

    fn decode(&self, image: &LumaImage) -> Vec<Symbol> {
        let width = image.width();
        let pixels = image.pixels();
        let mut prepared =
            rqrr::PreparedImage::prepare_from_greyscale(width, image.height(), |x, y| {
                pixels[y * width + x]
            });

        let grids = prepared.detect_grids();
        let mut found = Vec::new();
        for grid in grids {
            let corners: Vec<Point> = grid
                .bounds
                .iter()
                .map(|p| Point::new(p.x as f32, p.y as f32))
                .collect();
            match grid.decode() {
                Ok((meta, content)) => {
                    debug!(
                        "qr v{} decoded {} byte(s)",
                        meta.version.0,
                        content.len()
                    );
                    merge_symbol(
                        &mut found,
                        Symbol {
                            symbology: Symbology::Qr,
                            payload: content,
                            bounds: Bounds::from_points(&corners),
                        },
                    );
                }
                Err(e) => debug!("qr grid rejected: {e:?}"),
            }
        }
        found
    }
}
