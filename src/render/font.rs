//! Font faces for receipt layouts.
//!
//! Layouts ask a [`FontSet`] for a face by weight and pixel size. When the
//! TrueType files are available the face is an anti-aliased outline font
//! rendered with `ab_glyph`; otherwise every request degrades to the
//! built-in Spleen 12×24 bitmap font, scaled by an integer factor.
//!
//! ## Coordinates
//!
//! Text is positioned by its ascender line: drawing at `(x, y)` puts the
//! baseline at `y + ascent`. [`Face::bbox`] reports the inked area relative
//! to that origin, so `bbox("Ag").height()` is the line height every layout
//! measures with.

use std::path::Path;

use ab_glyph::{Font, FontArc, ScaleFont, point};
use image::{Rgb, RgbImage};
use spleen_font::{FONT_12X24, PSF2Font};
use tracing::{debug, warn};

/// Regular face file name inside the font directory
pub const REGULAR_FILE: &str = "DejaVuSans.ttf";

/// Bold face file name inside the font directory
pub const BOLD_FILE: &str = "DejaVuSans-Bold.ttf";

/// Default font directory on Debian-based systems
pub const DEFAULT_FONT_DIR: &str = "/usr/share/fonts/truetype/dejavu";

const BITMAP_WIDTH: usize = 12;
const BITMAP_HEIGHT: usize = 24;

/// Sample used to measure line height
const LINE_SAMPLE: &str = "Ag";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Weight {
    Regular,
    Bold,
}

/// Inked area of a string, relative to the drawing origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextBox {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl TextBox {
    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }
}

/// The regular and bold outline fonts, when they could be loaded.
#[derive(Clone, Default)]
pub struct FontSet {
    regular: Option<FontArc>,
    bold: Option<FontArc>,
}

impl std::fmt::Debug for FontSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontSet")
            .field("regular", &self.regular.is_some())
            .field("bold", &self.bold.is_some())
            .finish()
    }
}

impl FontSet {
    /// Load DejaVu Sans regular and bold from `dir`.
    ///
    /// A missing or unreadable file is logged and that weight falls back to
    /// the built-in bitmap face. This never fails.
    pub fn load(dir: &Path) -> Self {
        let regular = load_font(&dir.join(REGULAR_FILE));
        let bold = load_font(&dir.join(BOLD_FILE)).or_else(|| regular.clone());
        if regular.is_none() && bold.is_none() {
            warn!(dir = %dir.display(), "Could not load TTF fonts; using built-in bitmap font");
        }
        Self { regular, bold }
    }

    /// Font set that only uses the built-in bitmap face.
    pub fn builtin() -> Self {
        Self::default()
    }

    /// Whether any outline font is loaded.
    pub fn has_outline(&self) -> bool {
        self.regular.is_some() || self.bold.is_some()
    }

    pub fn face(&self, weight: Weight, px: f32) -> Face {
        let font = match weight {
            Weight::Regular => self.regular.as_ref(),
            Weight::Bold => self.bold.as_ref(),
        };
        match font {
            Some(font) => Face::Outline {
                font: font.clone(),
                px,
            },
            None => Face::Bitmap {
                scale: bitmap_scale(px),
            },
        }
    }

    pub fn regular(&self, px: f32) -> Face {
        self.face(Weight::Regular, px)
    }

    pub fn bold(&self, px: f32) -> Face {
        self.face(Weight::Bold, px)
    }
}

fn load_font(path: &Path) -> Option<FontArc> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Font file unavailable");
            return None;
        }
    };
    match FontArc::try_from_vec(bytes) {
        Ok(font) => Some(font),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Font file is not a valid TrueType font");
            None
        }
    }
}

/// Integer scale that brings the 24px bitmap cell closest to `px`.
fn bitmap_scale(px: f32) -> u32 {
    ((px / BITMAP_HEIGHT as f32).round() as u32).max(1)
}

/// A sized font face.
#[derive(Clone)]
pub enum Face {
    Outline { font: FontArc, px: f32 },
    Bitmap { scale: u32 },
}

impl std::fmt::Debug for Face {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Outline { px, .. } => f.debug_struct("Outline").field("px", px).finish(),
            Self::Bitmap { scale } => f.debug_struct("Bitmap").field("scale", scale).finish(),
        }
    }
}

impl Face {
    /// Inked bounding box of `text` drawn at the origin.
    pub fn bbox(&self, text: &str) -> TextBox {
        match self {
            Self::Outline { font, px } => outline_bbox(font, *px, text),
            Self::Bitmap { scale } => {
                let chars = text.chars().count() as i32;
                if chars == 0 {
                    return TextBox::default();
                }
                let s = *scale as i32;
                TextBox {
                    left: 0,
                    top: 0,
                    right: chars * BITMAP_WIDTH as i32 * s,
                    bottom: BITMAP_HEIGHT as i32 * s,
                }
            }
        }
    }

    /// Height of one line of text in this face.
    pub fn line_height(&self) -> i32 {
        self.bbox(LINE_SAMPLE).height()
    }

    /// Draw `text` with its ascender line at `y`.
    pub fn draw(&self, image: &mut RgbImage, x: i32, y: i32, text: &str, color: Rgb<u8>) {
        match self {
            Self::Outline { font, px } => draw_outline(image, font, *px, x, y, text, color),
            Self::Bitmap { scale } => draw_bitmap(image, *scale, x, y, text, color),
        }
    }
}

// ============================================================================
// OUTLINE FACES
// ============================================================================

/// Lay out glyphs left to right from `x`, with the baseline at `y + ascent`.
fn layout_glyphs(font: &FontArc, px: f32, x: f32, y: f32, text: &str) -> Vec<ab_glyph::Glyph> {
    let scaled = font.as_scaled(px);
    let baseline = y + scaled.ascent();
    let mut caret = x;
    let mut previous = None;
    let mut glyphs = Vec::with_capacity(text.len());

    for ch in text.chars() {
        let glyph_id = font.glyph_id(ch);
        if let Some(prev) = previous {
            caret += scaled.kern(prev, glyph_id);
        }
        glyphs.push(glyph_id.with_scale_and_position(px, point(caret, baseline)));
        caret += scaled.h_advance(glyph_id);
        previous = Some(glyph_id);
    }
    glyphs
}

fn outline_bbox(font: &FontArc, px: f32, text: &str) -> TextBox {
    let mut bounds: Option<TextBox> = None;
    for glyph in layout_glyphs(font, px, 0.0, 0.0, text) {
        if let Some(outlined) = font.outline_glyph(glyph) {
            let r = outlined.px_bounds();
            let b = TextBox {
                left: r.min.x.floor() as i32,
                top: r.min.y.floor() as i32,
                right: r.max.x.ceil() as i32,
                bottom: r.max.y.ceil() as i32,
            };
            bounds = Some(match bounds {
                Some(acc) => TextBox {
                    left: acc.left.min(b.left),
                    top: acc.top.min(b.top),
                    right: acc.right.max(b.right),
                    bottom: acc.bottom.max(b.bottom),
                },
                None => b,
            });
        }
    }
    bounds.unwrap_or_default()
}

fn draw_outline(
    image: &mut RgbImage,
    font: &FontArc,
    px: f32,
    x: i32,
    y: i32,
    text: &str,
    color: Rgb<u8>,
) {
    let (width, height) = (image.width() as i32, image.height() as i32);
    for glyph in layout_glyphs(font, px, x as f32, y as f32, text) {
        let Some(outlined) = font.outline_glyph(glyph) else {
            continue;
        };
        let bounds = outlined.px_bounds();
        outlined.draw(|gx, gy, coverage| {
            let ix = gx as i32 + bounds.min.x as i32;
            let iy = gy as i32 + bounds.min.y as i32;
            if ix < 0 || iy < 0 || ix >= width || iy >= height {
                return;
            }
            let c = coverage.clamp(0.0, 1.0);
            let dst = image.get_pixel_mut(ix as u32, iy as u32);
            for i in 0..3 {
                let blended = dst[i] as f32 * (1.0 - c) + color[i] as f32 * c;
                dst[i] = blended.round() as u8;
            }
        });
    }
}

// ============================================================================
// BUILT-IN BITMAP FACE
// ============================================================================

/// 12×24 Spleen glyph as row-major on/off cells.
fn bitmap_glyph(ch: char) -> Option<Vec<bool>> {
    let mut spleen = PSF2Font::new(FONT_12X24).ok()?;
    let utf8_bytes = ch.to_string();
    let rows = spleen.glyph_for_utf8(utf8_bytes.as_bytes())?;

    let mut cells = vec![false; BITMAP_WIDTH * BITMAP_HEIGHT];
    for (row_y, row) in rows.enumerate() {
        for (col_x, on) in row.enumerate() {
            if row_y < BITMAP_HEIGHT && col_x < BITMAP_WIDTH {
                cells[row_y * BITMAP_WIDTH + col_x] = on;
            }
        }
    }
    Some(cells)
}

/// Hollow box drawn for characters the bitmap font lacks.
fn missing_glyph() -> Vec<bool> {
    let mut cells = vec![false; BITMAP_WIDTH * BITMAP_HEIGHT];
    for row in 4..BITMAP_HEIGHT - 4 {
        for col in 2..BITMAP_WIDTH - 2 {
            let edge = row == 4 || row == BITMAP_HEIGHT - 5 || col == 2 || col == BITMAP_WIDTH - 3;
            cells[row * BITMAP_WIDTH + col] = edge;
        }
    }
    cells
}

fn draw_bitmap(image: &mut RgbImage, scale: u32, x: i32, y: i32, text: &str, color: Rgb<u8>) {
    let s = scale.max(1) as i32;
    let (width, height) = (image.width() as i32, image.height() as i32);

    for (i, ch) in text.chars().enumerate() {
        if ch == ' ' {
            continue;
        }
        let cells = bitmap_glyph(ch).unwrap_or_else(missing_glyph);
        let origin_x = x + i as i32 * BITMAP_WIDTH as i32 * s;

        for (idx, on) in cells.iter().enumerate() {
            if !on {
                continue;
            }
            let cx = origin_x + (idx % BITMAP_WIDTH) as i32 * s;
            let cy = y + (idx / BITMAP_WIDTH) as i32 * s;
            for dy in 0..s {
                for dx in 0..s {
                    let (px, py) = (cx + dx, cy + dy);
                    if px >= 0 && py >= 0 && px < width && py < height {
                        image.put_pixel(px as u32, py as u32, color);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bitmap_scale() {
        assert_eq!(bitmap_scale(24.0), 1);
        assert_eq!(bitmap_scale(13.0), 1);
        assert_eq!(bitmap_scale(40.0), 2);
        assert_eq!(bitmap_scale(70.0), 3);
    }

    #[test]
    fn test_builtin_face_metrics() {
        let fonts = FontSet::builtin();
        assert!(!fonts.has_outline());

        let face = fonts.bold(40.0);
        assert_eq!(face.line_height(), 48);
        assert_eq!(face.bbox("Lunch").width(), 5 * 24);
        assert_eq!(face.bbox(""), TextBox::default());
    }

    #[test]
    fn test_missing_font_dir_falls_back() {
        let fonts = FontSet::load(Path::new("/nonexistent/fonts"));
        assert!(!fonts.has_outline());
        assert!(matches!(fonts.regular(35.0), Face::Bitmap { scale: 1 }));
    }

    #[test]
    fn test_bitmap_draw_inks_pixels() {
        let mut image = RgbImage::from_pixel(100, 40, Rgb([255, 255, 255]));
        let face = FontSet::builtin().regular(24.0);
        face.draw(&mut image, 2, 2, "Hi", Rgb([0, 0, 0]));
        assert!(image.pixels().any(|p| p[0] == 0));
    }

    #[test]
    fn test_bitmap_draw_clips_outside() {
        let mut image = RgbImage::from_pixel(10, 10, Rgb([255, 255, 255]));
        let face = FontSet::builtin().regular(24.0);
        face.draw(&mut image, -500, -500, "clipped", Rgb([0, 0, 0]));
        assert!(image.pixels().all(|p| p[0] == 255));
    }

    #[test]
    fn test_missing_glyph_is_box() {
        let cells = missing_glyph();
        assert!(cells[4 * BITMAP_WIDTH + 2]);
        assert!(!cells[10 * BITMAP_WIDTH + 5]);
    }
}
