//! Drawing surface for receipt layouts.
//!
//! A [`Canvas`] is an RGB image the width of the paper plus a running y
//! cursor. All primitives clip silently at the image edges, so content that
//! overflows a clamped height is simply cropped.

use image::{Rgb, RgbImage};

use super::font::Face;

pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

/// RGB drawing surface with a vertical cursor.
#[derive(Debug, Clone)]
pub struct Canvas {
    image: RgbImage,
    /// Next free row, advanced by the layout as it draws
    pub cursor: i32,
}

impl Canvas {
    /// Create a white canvas.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbImage::from_pixel(width.max(1), height.max(1), WHITE),
            cursor: 0,
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Read a pixel; out-of-bounds reads return white.
    pub fn pixel(&self, x: i32, y: i32) -> Rgb<u8> {
        if self.contains(x, y) {
            *self.image.get_pixel(x as u32, y as u32)
        } else {
            WHITE
        }
    }

    #[inline]
    fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.image.width() && (y as u32) < self.image.height()
    }

    /// Set a single pixel, ignoring coordinates outside the canvas.
    #[inline]
    pub fn put(&mut self, x: i32, y: i32, color: Rgb<u8>) {
        if self.contains(x, y) {
            self.image.put_pixel(x as u32, y as u32, color);
        }
    }

    /// Fill the rectangle spanning `[x0, x1) × [y0, y1)`.
    pub fn fill_rect(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Rgb<u8>) {
        let x_start = x0.max(0);
        let y_start = y0.max(0);
        let x_end = x1.min(self.image.width() as i32);
        let y_end = y1.min(self.image.height() as i32);
        for y in y_start..y_end {
            for x in x_start..x_end {
                self.image.put_pixel(x as u32, y as u32, color);
            }
        }
    }

    /// Draw a rectangle outline of `thickness` pixels, growing inward from
    /// the inclusive corners `(x0, y0)` and `(x1, y1)`.
    pub fn outline_rect(
        &mut self,
        x0: i32,
        y0: i32,
        x1: i32,
        y1: i32,
        thickness: i32,
        color: Rgb<u8>,
    ) {
        let t = thickness.max(1);
        self.fill_rect(x0, y0, x1 + 1, y0 + t, color);
        self.fill_rect(x0, y1 - t + 1, x1 + 1, y1 + 1, color);
        self.fill_rect(x0, y0, x0 + t, y1 + 1, color);
        self.fill_rect(x1 - t + 1, y0, x1 + 1, y1 + 1, color);
    }

    /// Horizontal line from `x0` to `x1` inclusive, `thickness` rows
    /// centered on `y`.
    pub fn hline(&mut self, x0: i32, x1: i32, y: i32, thickness: i32, color: Rgb<u8>) {
        let t = thickness.max(1);
        let top = y - (t - 1) / 2;
        self.fill_rect(x0, top, x1 + 1, top + t, color);
    }

    /// Vertical line from `y0` to `y1` inclusive, `thickness` columns
    /// centered on `x`.
    pub fn vline(&mut self, x: i32, y0: i32, y1: i32, thickness: i32, color: Rgb<u8>) {
        let t = thickness.max(1);
        let left = x - (t - 1) / 2;
        self.fill_rect(left, y0, left + t, y1 + 1, color);
    }

    /// Draw text with its ascender line at `y`.
    pub fn draw_text(&mut self, x: i32, y: i32, text: &str, face: &Face, color: Rgb<u8>) {
        face.draw(&mut self.image, x, y, text, color);
    }

    /// Draw text horizontally centered inside `[left, left + width)`.
    pub fn draw_text_centered(
        &mut self,
        left: i32,
        width: i32,
        y: i32,
        text: &str,
        face: &Face,
        color: Rgb<u8>,
    ) {
        let text_width = face.bbox(text).width();
        let x = left + (width - text_width).div_euclid(2);
        self.draw_text(x, y, text, face, color);
    }

    /// Copy `patch` with its top-left corner at `(x, y)`.
    pub fn paste(&mut self, patch: &RgbImage, x: i32, y: i32) {
        for (px, py, color) in patch.enumerate_pixels() {
            self.put(x + px as i32, y + py as i32, *color);
        }
    }
}
