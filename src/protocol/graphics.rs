//! # ESC/POS Image Encodings
//!
//! Printers disagree about which image command they support, so a bitmap
//! can be sent three ways. Delivery tries them in a configured order until
//! one is accepted.
//!
//! | Name | Command | Layout |
//! |------|---------|--------|
//! | `bitImageRaster` | `GS v 0` | row-major, fragments of ≤256 rows |
//! | `bitImageColumn` | `ESC * 33` | 24-dot column stripes |
//! | `graphics` | `GS ( L` store + print | row-major, one block |
//!
//! ## Raster Format (GS v 0)
//!
//! ```text
//! 1D 76 30 m xL xH yL yH [data...]
//!
//! m:      0 = normal density
//! xL xH:  width in bytes (little-endian)
//! yL yH:  height in rows (little-endian)
//! data:   height × width_bytes, MSB = leftmost dot, 1 = black
//! ```
//!
//! ## Column Format (ESC * 33)
//!
//! Each stripe covers 24 rows. For every column, three bytes hold the 24
//! vertical dots, top dot in the MSB of the first byte.
//!
//! ## Graphics Format (GS ( L)
//!
//! The whole image is stored in the print buffer with function 112 and
//! printed with function 50. The block length is a 16-bit field, which
//! caps how large an image this encoding can carry.

use std::fmt;
use std::str::FromStr;

use super::commands::{ESC, GS, LF, default_line_spacing, line_spacing};
use crate::error::{ReceiptError, Result};
use crate::raster::Bitmap;

/// Rows per `GS v 0` fragment
pub const RASTER_FRAGMENT_ROWS: usize = 256;

/// Dots per column stripe
pub const COLUMN_STRIPE_ROWS: usize = 24;

/// Largest `GS ( L` parameter block
const GRAPHICS_MAX_BLOCK: usize = u16::MAX as usize;

/// Header bytes counted in the `GS ( L` block length
const GRAPHICS_HEADER: usize = 10;

/// A device image command family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageEncoding {
    BitImageRaster,
    BitImageColumn,
    Graphics,
}

impl ImageEncoding {
    pub fn name(self) -> &'static str {
        match self {
            Self::BitImageRaster => "bitImageRaster",
            Self::BitImageColumn => "bitImageColumn",
            Self::Graphics => "graphics",
        }
    }

    /// Encode `bitmap` into the command bytes for this family.
    pub fn encode(self, bitmap: &Bitmap) -> Result<Vec<u8>> {
        if bitmap.width == 0 || bitmap.height == 0 {
            return Err(ReceiptError::Encoding("bitmap is empty".to_string()));
        }
        match self {
            Self::BitImageRaster => raster(bitmap),
            Self::BitImageColumn => column(bitmap),
            Self::Graphics => graphics(bitmap),
        }
    }

    /// Parse a comma-separated list, skipping blanks.
    pub fn parse_list(list: &str) -> std::result::Result<Vec<Self>, String> {
        list.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse)
            .collect()
    }
}

impl fmt::Display for ImageEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ImageEncoding {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "bitImageRaster" | "raster" => Ok(Self::BitImageRaster),
            "bitImageColumn" | "column" => Ok(Self::BitImageColumn),
            "graphics" => Ok(Self::Graphics),
            other => Err(format!(
                "Unknown image implementation '{}'. Use bitImageRaster, bitImageColumn or graphics",
                other
            )),
        }
    }
}

fn u16_le(value: usize, what: &str) -> Result<[u8; 2]> {
    u16::try_from(value)
        .map(u16::to_le_bytes)
        .map_err(|_| ReceiptError::Encoding(format!("{} {} exceeds 65535", what, value)))
}

/// `GS v 0` in fragments of at most [`RASTER_FRAGMENT_ROWS`] rows.
fn raster(bitmap: &Bitmap) -> Result<Vec<u8>> {
    let width_bytes = bitmap.width_bytes();
    let [xl, xh] = u16_le(width_bytes, "raster width")?;
    let mut out = Vec::with_capacity(bitmap.data.len() + 8 * bitmap.height.div_ceil(RASTER_FRAGMENT_ROWS));

    let mut y = 0;
    while y < bitmap.height {
        let rows = (bitmap.height - y).min(RASTER_FRAGMENT_ROWS);
        let [yl, yh] = u16_le(rows, "raster height")?;
        out.extend([GS, b'v', b'0', 0, xl, xh, yl, yh]);
        for row in y..y + rows {
            out.extend_from_slice(bitmap.row(row));
        }
        y += rows;
    }

    Ok(out)
}

/// `ESC * 33` 24-dot double-density stripes.
fn column(bitmap: &Bitmap) -> Result<Vec<u8>> {
    let [nl, nh] = u16_le(bitmap.width, "column width")?;
    let stripes = bitmap.height.div_ceil(COLUMN_STRIPE_ROWS);
    let mut out = Vec::with_capacity(stripes * (5 + bitmap.width * 3 + 1) + 5);

    out.extend(line_spacing(COLUMN_STRIPE_ROWS as u8));
    for stripe in 0..stripes {
        let top = stripe * COLUMN_STRIPE_ROWS;
        out.extend([ESC, b'*', 33, nl, nh]);
        for x in 0..bitmap.width {
            for byte in 0..3 {
                let mut packed = 0u8;
                for bit in 0..8 {
                    if bitmap.get(x, top + byte * 8 + bit) {
                        packed |= 0x80 >> bit;
                    }
                }
                out.push(packed);
            }
        }
        out.push(LF);
    }
    out.extend(default_line_spacing());

    Ok(out)
}

/// `GS ( L` store (fn 112) followed by print (fn 50).
fn graphics(bitmap: &Bitmap) -> Result<Vec<u8>> {
    let block = GRAPHICS_HEADER + bitmap.data.len();
    if block > GRAPHICS_MAX_BLOCK {
        return Err(ReceiptError::Encoding(format!(
            "graphics block of {} bytes exceeds {}",
            block, GRAPHICS_MAX_BLOCK
        )));
    }
    let [pl, ph] = u16_le(block, "graphics block")?;
    let [xl, xh] = u16_le(bitmap.width, "graphics width")?;
    let [yl, yh] = u16_le(bitmap.height, "graphics height")?;

    let mut out = Vec::with_capacity(block + 12);
    // m=48 fn=112 a=48 (monochrome) bx=1 by=1 c=49 (color 1)
    out.extend([GS, b'(', b'L', pl, ph, 48, 112, 48, 1, 1, 49, xl, xh, yl, yh]);
    out.extend_from_slice(&bitmap.data);
    out.extend([GS, b'(', b'L', 2, 0, 48, 50]);
    Ok(out)
}
