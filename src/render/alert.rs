//! # Priority Alert Layout
//!
//! A single banner across the printable width whose fill and hatching get
//! denser with severity, plus optional gray subtext underneath.
//!
//! | Level | Label | Fill | Hatch spacing |
//! |-------|-------|------|---------------|
//! | critical | `⚠ CRITICAL ⚠` | (255, 100, 100) | 2px |
//! | high | `● HIGH ●` | (255, 180, 100) | 3px |
//! | medium | `○ MEDIUM ○` | (255, 255, 100) | 5px |
//! | low | `- LOW -` | (200, 255, 200) | none |

use image::Rgb;

use super::RenderContext;
use super::canvas::{BLACK, Canvas};
use crate::content::AlertLevel;

const BANNER_PX: f32 = 28.0;
const SUBTEXT_PX: f32 = 20.0;

pub const BANNER_HEIGHT: i32 = 80;
const PADDING: i32 = 15;
const BORDER: i32 = 2;
/// Hatch lines stay this far inside the banner edges
const HATCH_INSET: i32 = 5;

const SUBTEXT_COLOR: Rgb<u8> = Rgb([80, 80, 80]);

/// Visual style of a banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BannerStyle {
    pub label: &'static str,
    pub fill: Rgb<u8>,
    /// Row spacing and color of the hatch lines
    pub hatch: Option<(usize, Rgb<u8>)>,
}

impl BannerStyle {
    pub fn for_level(level: AlertLevel) -> Self {
        match level {
            AlertLevel::Critical => Self {
                label: "⚠ CRITICAL ⚠",
                fill: Rgb([255, 100, 100]),
                hatch: Some((2, Rgb([100, 0, 0]))),
            },
            AlertLevel::High => Self {
                label: "● HIGH ●",
                fill: Rgb([255, 180, 100]),
                hatch: Some((3, Rgb([150, 80, 0]))),
            },
            AlertLevel::Medium => Self {
                label: "○ MEDIUM ○",
                fill: Rgb([255, 255, 100]),
                hatch: Some((5, Rgb([150, 150, 0]))),
            },
            AlertLevel::Low => Self {
                label: "- LOW -",
                fill: Rgb([200, 255, 200]),
                hatch: None,
            },
        }
    }
}

/// Height of an alert receipt, with or without subtext.
pub fn alert_height(ctx: &RenderContext, has_subtext: bool) -> u32 {
    let mut height = BANNER_HEIGHT + 2 * PADDING;
    if has_subtext {
        height += ctx.fonts.regular(SUBTEXT_PX).line_height() + PADDING;
    }
    height as u32
}

/// Render the banner receipt.
pub fn render_alert(level: AlertLevel, subtext: Option<&str>, ctx: &RenderContext) -> Canvas {
    let geometry = &ctx.geometry;
    let subtext = subtext.filter(|s| !s.trim().is_empty());
    let height = geometry.clamp_height(alert_height(ctx, subtext.is_some()));
    let mut canvas = Canvas::new(geometry.full_width, height);

    let x = geometry.left_margin;
    let y = PADDING + geometry.y_offset;
    let width = geometry.printable_width as i32;

    draw_banner(&mut canvas, x, y, width, BANNER_HEIGHT, BannerStyle::for_level(level), ctx);
    canvas.cursor = y + BANNER_HEIGHT + PADDING;

    if let Some(text) = subtext {
        let face = ctx.fonts.regular(SUBTEXT_PX);
        canvas.draw_text_centered(x, width, canvas.cursor, text, &face, SUBTEXT_COLOR);
        canvas.cursor += face.line_height();
    }

    canvas
}

fn draw_banner(
    canvas: &mut Canvas,
    x: i32,
    y: i32,
    width: i32,
    height: i32,
    style: BannerStyle,
    ctx: &RenderContext,
) {
    canvas.fill_rect(x, y, x + width, y + height, style.fill);
    canvas.outline_rect(x, y, x + width - 1, y + height - 1, BORDER, BLACK);

    if let Some((spacing, color)) = style.hatch {
        for line_y in (y + HATCH_INSET..y + height - HATCH_INSET).step_by(spacing) {
            canvas.hline(x + HATCH_INSET, x + width - HATCH_INSET, line_y, 1, color);
        }
    }

    let face = ctx.fonts.bold(BANNER_PX);
    let text_box = face.bbox(style.label);
    let text_x = x + (width - text_box.width()) / 2 - text_box.left;
    let text_y = y + (height - text_box.height()) / 2 - text_box.top;
    canvas.draw_text(text_x, text_y, style.label, &face, BLACK);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{ClickRules, Limits};
    use crate::printer::{Geometry, PaperConfig};
    use crate::render::font::FontSet;

    fn ctx() -> RenderContext {
        RenderContext {
            geometry: Geometry::resolve(&PaperConfig::default()).unwrap(),
            fonts: FontSet::builtin(),
            limits: Limits::default(),
            click: ClickRules::default(),
        }
    }

    fn count_color(canvas: &Canvas, color: Rgb<u8>) -> usize {
        canvas.image().pixels().filter(|p| **p == color).count()
    }

    #[test]
    fn test_heights() {
        let ctx = ctx();
        assert_eq!(alert_height(&ctx, false), 110);
        assert_eq!(alert_height(&ctx, true), 110 + 24 + 15);
    }

    #[test]
    fn test_hatch_density_scales_with_level() {
        let ctx = ctx();
        let critical = render_alert(AlertLevel::Critical, None, &ctx);
        let medium = render_alert(AlertLevel::Medium, None, &ctx);
        let low = render_alert(AlertLevel::Low, None, &ctx);

        let critical_hatch = count_color(&critical, Rgb([100, 0, 0]));
        let medium_hatch = count_color(&medium, Rgb([150, 150, 0]));
        assert!(critical_hatch > medium_hatch);
        assert!(medium_hatch > 0);
        assert_eq!(count_color(&low, Rgb([150, 150, 0])), 0);
    }

    #[test]
    fn test_banner_fill_and_border() {
        let ctx = ctx();
        let canvas = render_alert(AlertLevel::Low, Some("fyi"), &ctx);
        let x = ctx.geometry.left_margin;
        assert_eq!(canvas.pixel(x, PADDING), BLACK);
        assert_eq!(canvas.pixel(x + 3, PADDING + 3), Rgb([200, 255, 200]));
        assert!(count_color(&canvas, SUBTEXT_COLOR) > 0);
    }

    #[test]
    fn test_blank_subtext_ignored() {
        let ctx = ctx();
        let canvas = render_alert(AlertLevel::High, Some("   "), &ctx);
        assert_eq!(canvas.height(), 110);
    }
}
