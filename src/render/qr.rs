//! QR code patches.
//!
//! Codes are drawn with 3px modules and a one-module quiet zone, then
//! resized with nearest-neighbour sampling to the square size the layout
//! reserved for them.

use image::{RgbImage, imageops::FilterType};
use qrcode::{EcLevel, QrCode};

use super::canvas::{BLACK, WHITE};

/// Pixels per QR module before resizing
const MODULE_PX: u32 = 3;

/// Quiet zone, in modules
const BORDER_MODULES: u32 = 1;

/// Encode `text` as a `size_px`×`size_px` black-on-white patch.
///
/// Returns `None` when the text cannot be encoded (empty or too long).
/// Callers log the failure and lay out without the code.
pub fn encode(text: &str, size_px: u32) -> Option<RgbImage> {
    if text.is_empty() || size_px == 0 {
        return None;
    }
    let code = QrCode::with_error_correction_level(text.as_bytes(), EcLevel::M).ok()?;

    let modules = code.width() as u32;
    let side = (modules + 2 * BORDER_MODULES) * MODULE_PX;
    let mut image = RgbImage::from_pixel(side, side, WHITE);

    for my in 0..modules {
        for mx in 0..modules {
            if code[(mx as usize, my as usize)] != qrcode::Color::Dark {
                continue;
            }
            let x0 = (mx + BORDER_MODULES) * MODULE_PX;
            let y0 = (my + BORDER_MODULES) * MODULE_PX;
            for dy in 0..MODULE_PX {
                for dx in 0..MODULE_PX {
                    image.put_pixel(x0 + dx, y0 + dy, BLACK);
                }
            }
        }
    }

    Some(image::imageops::resize(
        &image,
        size_px,
        size_px,
        FilterType::Nearest,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_size() {
        let patch = encode("https://example.com/M123", 70).unwrap();
        assert_eq!(patch.dimensions(), (70, 70));
        assert!(patch.pixels().any(|p| *p == BLACK));
        assert!(patch.pixels().any(|p| *p == WHITE));
    }

    #[test]
    fn test_quiet_zone_is_white() {
        let patch = encode("tel:+15551234567", 100).unwrap();
        assert_eq!(*patch.get_pixel(0, 0), WHITE);
        assert_eq!(*patch.get_pixel(99, 99), WHITE);
    }

    #[test]
    fn test_empty_text_fails() {
        assert!(encode("", 100).is_none());
    }

    #[test]
    fn test_oversized_text_fails() {
        let huge = "x".repeat(5000);
        assert!(encode(&huge, 100).is_none());
    }
}
