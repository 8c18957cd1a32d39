//! # Device Bitstream Conversion
//!
//! Converts a rendered RGB canvas into the 1-bit bitmap the printer prints.
//!
//! ## Pipeline
//!
//! ```text
//! RGB canvas
//!   │  1. nearest-neighbour upscale by an integer factor
//!   │  2. grayscale   L = (R·19595 + G·38470 + B·7471 + 0x8000) >> 16
//!   │  3. auto-contrast: stretch [min, max] to [0, 255]
//!   │  4. contrast: blend away from the mean by a factor
//!   │  5. 1-bit via error diffusion (or a fixed threshold)
//!   ▼
//! Bitmap (rows packed MSB-first, 1 = black)
//! ```
//!
//! Every step uses fixed integer and truncation rules, so a given canvas
//! always produces the same bytes as earlier deployments.
//!
//! The scale factor is clamped so the scaled width never exceeds the
//! device's maximum width, but never below 1.

pub mod dither;

use image::RgbImage;
use rayon::prelude::*;

pub use dither::{Binarize, pack_row};

/// Conversion settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvertOptions {
    /// Integer upscale factor (values below 1 act as 1)
    pub scale: u32,
    /// Contrast factor; 1.0 leaves the image unchanged
    pub contrast: f32,
    /// Widest bitmap the device accepts; `None` disables the clamp
    pub max_width: Option<u32>,
    pub binarize: Binarize,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            scale: 2,
            contrast: 2.0,
            max_width: None,
            binarize: Binarize::FloydSteinberg,
        }
    }
}

/// A packed 1-bit image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    pub width: usize,
    pub height: usize,
    /// `height` rows of `width_bytes()` bytes, MSB-first, 1 = black
    pub data: Vec<u8>,
}

impl Bitmap {
    /// Pack row-major dots (`true` = black).
    pub fn from_dots(width: usize, height: usize, dots: &[bool]) -> Self {
        let mut data = Vec::with_capacity(width.div_ceil(8) * height);
        for row in dots.chunks(width.max(1)).take(height) {
            data.extend(pack_row(row));
        }
        Self {
            width,
            height,
            data,
        }
    }

    #[inline]
    pub fn width_bytes(&self) -> usize {
        self.width.div_ceil(8)
    }

    /// Whether the dot at `(x, y)` is black. Out of range reads are white.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let byte = self.data[y * self.width_bytes() + x / 8];
        (byte >> (7 - (x % 8))) & 1 == 1
    }

    /// Packed bytes of row `y`.
    pub fn row(&self, y: usize) -> &[u8] {
        let wb = self.width_bytes();
        &self.data[y * wb..(y + 1) * wb]
    }

    pub fn count_black(&self) -> usize {
        (0..self.height)
            .flat_map(|y| (0..self.width).map(move |x| (x, y)))
            .filter(|&(x, y)| self.get(x, y))
            .count()
    }
}

/// Integer scale after applying the device width clamp.
pub fn effective_scale(canvas_width: u32, options: &ConvertOptions) -> u32 {
    let requested = options.scale.max(1);
    match options.max_width {
        Some(max) if canvas_width > 0 => requested.min((max / canvas_width).max(1)),
        _ => requested,
    }
}

/// Run the full conversion pipeline.
pub fn convert(canvas: &RgbImage, options: &ConvertOptions) -> Bitmap {
    let scale = effective_scale(canvas.width(), options) as usize;
    let src_width = canvas.width() as usize;
    let width = src_width * scale;
    let height = canvas.height() as usize * scale;

    let mut gray = vec![0u8; width * height];
    gray.par_chunks_mut(width.max(1))
        .enumerate()
        .for_each(|(y, out)| {
            let src_y = (y / scale) as u32;
            for (x, value) in out.iter_mut().enumerate() {
                let px = canvas.get_pixel((x / scale) as u32, src_y);
                *value = luma(px.0);
            }
        });

    autocontrast(&mut gray);
    enhance_contrast(&mut gray, options.contrast);

    let dots = dither::binarize(&gray, width, height, options.binarize);
    Bitmap::from_dots(width, height, &dots)
}

/// ITU-R 601-2 luma with the rounding used by the legacy pipeline.
#[inline]
pub fn luma(rgb: [u8; 3]) -> u8 {
    let [r, g, b] = rgb.map(u32::from);
    ((r * 19595 + g * 38470 + b * 7471 + 0x8000) >> 16) as u8
}

/// Stretch the occupied range of the histogram to the full 0–255 range.
///
/// A single-valued image is left untouched.
pub fn autocontrast(gray: &mut [u8]) {
    let mut histogram = [0usize; 256];
    for &v in gray.iter() {
        histogram[v as usize] += 1;
    }

    let Some(lo) = histogram.iter().position(|&n| n > 0) else {
        return;
    };
    let hi = histogram.iter().rposition(|&n| n > 0).unwrap_or(lo);
    if hi <= lo {
        return;
    }

    let scale = 255.0 / (hi - lo) as f64;
    let offset = -(lo as f64) * scale;
    let mut lut = [0u8; 256];
    for (ix, entry) in lut.iter_mut().enumerate() {
        let v = (ix as f64 * scale + offset) as i32;
        *entry = v.clamp(0, 255) as u8;
    }

    for v in gray.iter_mut() {
        *v = lut[*v as usize];
    }
}

/// Blend each value away from the rounded image mean by `factor`.
pub fn enhance_contrast(gray: &mut [u8], factor: f32) {
    if gray.is_empty() {
        return;
    }
    let sum: u64 = gray.iter().map(|&v| v as u64).sum();
    let mean = (sum as f64 / gray.len() as f64 + 0.5) as i32;

    let mut lut = [0u8; 256];
    for (ix, entry) in lut.iter_mut().enumerate() {
        let temp = mean as f32 + factor * (ix as i32 - mean) as f32;
        *entry = if temp <= 0.0 {
            0
        } else if temp >= 255.0 {
            255
        } else {
            temp as u8
        };
    }

    for v in gray.iter_mut() {
        *v = lut[*v as usize];
    }
}
