//! Alignment test page.
//!
//! A full-paper frame with a center line and 10mm ticks along the top and
//! bottom edges. Printing it shows how far the paper sits off-center, which
//! is what the x offset setting corrects.

use super::RenderContext;
use super::canvas::{BLACK, Canvas};
use crate::printer::{PaperConfig, geometry::dots_per_mm};

const LABEL_PX: f32 = 20.0;
const FRAME: i32 = 2;
const CENTER_LINE: i32 = 3;
const TICK_LENGTH: i32 = 15;
const TICK_SPACING_MM: usize = 10;

pub fn render_alignment_test(paper: &PaperConfig, ctx: &RenderContext) -> Canvas {
    let geometry = &ctx.geometry;
    let width = geometry.full_width as i32;
    let height = (width as f32 * 1.2).round() as i32;
    let mut canvas = Canvas::new(width as u32, height as u32);

    canvas.outline_rect(0, 0, width - 1, height - 1, FRAME, BLACK);

    let center_x = width / 2 + geometry.x_offset;
    canvas.vline(center_x, 0, height, CENTER_LINE, BLACK);

    let per_mm = dots_per_mm(geometry.dpi);
    for mm in (0..=paper.paper_width_mm as usize).step_by(TICK_SPACING_MM) {
        let x = (mm as f32 * per_mm).round() as i32 + geometry.x_offset;
        canvas.vline(x, 0, TICK_LENGTH, 1, BLACK);
        canvas.vline(x, height - TICK_LENGTH, height, 1, BLACK);
    }

    let face = ctx.fonts.regular(LABEL_PX);
    let offset_label = format!("X_OFFSET_MM={:.1}", paper.x_offset_mm);
    let center_label = format!("Center at {:.1}mm", paper.paper_width_mm / 2.0);
    canvas.draw_text_centered(0, width, height / 2 - 30, &offset_label, &face, BLACK);
    canvas.draw_text_centered(0, width, height / 2 + 10, &center_label, &face, BLACK);

    canvas.cursor = height;
    canvas
}
