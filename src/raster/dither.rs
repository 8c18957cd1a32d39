//! # 1-Bit Conversion
//!
//! Grayscale to black/white, plus row packing for the device encodings.
//!
//! ## Error Diffusion
//!
//! [`floyd_steinberg`] reproduces the integer error diffusion of the imaging
//! library the legacy deployments used, so bitmaps stay byte-identical:
//!
//! ```text
//!            X    7/16
//!   3/16   5/16   1/16
//! ```
//!
//! The error carried into a pixel is accumulated in sixteenths and divided
//! once, truncating toward zero. A pixel prints white only when the adjusted
//! value is strictly greater than 128.
//!
//! ## Bit Packing
//!
//! Pixels are packed MSB-first, 8 per byte, with 1 meaning a black dot:
//!
//! ```
//! use ntfy_receipt::raster::dither::pack_row;
//!
//! let row = [true, true, false, false, true, false, true, false];
//! assert_eq!(pack_row(&row), vec![0b11001010]);
//! ```

/// How grayscale becomes black and white.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Binarize {
    /// Integer Floyd–Steinberg error diffusion
    #[default]
    FloydSteinberg,
    /// Fixed threshold: values below 128 print
    Threshold,
}

impl std::str::FromStr for Binarize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "floyd-steinberg" | "floyd_steinberg" | "dither" => Ok(Self::FloydSteinberg),
            "threshold" | "none" => Ok(Self::Threshold),
            other => Err(format!(
                "Unknown binarization '{}'. Use 'floyd-steinberg' or 'threshold'",
                other
            )),
        }
    }
}

/// Convert a grayscale buffer to dots (`true` = black).
pub fn binarize(gray: &[u8], width: usize, height: usize, mode: Binarize) -> Vec<bool> {
    match mode {
        Binarize::FloydSteinberg => floyd_steinberg(gray, width, height),
        Binarize::Threshold => gray.iter().map(|&v| v < 128).collect(),
    }
}

#[inline]
fn clip8(v: i32) -> i32 {
    v.clamp(0, 255)
}

/// Integer Floyd–Steinberg diffusion over a row-major grayscale buffer.
pub fn floyd_steinberg(gray: &[u8], width: usize, height: usize) -> Vec<bool> {
    let mut dots = vec![false; width * height];
    // errors[x + 1] holds the error pushed down into column x of the next row
    let mut errors = vec![0i32; width + 1];

    for y in 0..height {
        let row = &gray[y * width..(y + 1) * width];
        let out = &mut dots[y * width..(y + 1) * width];

        let (mut l, mut l0, mut l1) = (0i32, 0i32, 0i32);

        for x in 0..width {
            l = clip8(row[x] as i32 + (l + errors[x + 1]) / 16);
            let white = l > 128;
            out[x] = !white;

            l -= if white { 255 } else { 0 };
            let l2 = l;
            let d2 = l + l;
            l += d2;
            errors[x] = l + l0;
            l += d2;
            l0 = l + l1;
            l1 = l2;
            l += d2;
        }

        errors[width] = l0;
    }

    dots
}

/// Pack a row of dots into bytes, MSB first. Trailing bits are zero.
///
/// ```
/// use ntfy_receipt::raster::dither::pack_row;
///
/// let row = vec![true; 12];
/// assert_eq!(pack_row(&row), vec![0xFF, 0xF0]);
/// ```
pub fn pack_row(pixels: &[bool]) -> Vec<u8> {
    let num_bytes = pixels.len().div_ceil(8);
    let mut bytes = vec![0u8; num_bytes];

    for (i, &pixel) in pixels.iter().enumerate() {
        if pixel {
            let byte_idx = i / 8;
            let bit_idx = 7 - (i % 8); // MSB first
            bytes[byte_idx] |= 1 << bit_idx;
        }
    }

    bytes
}
