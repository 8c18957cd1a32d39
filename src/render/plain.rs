//! # Plain-Text Receipt Layout
//!
//! The default "whiteboard" layout used for ordinary notifications.
//!
//! ```text
//! ┌──────────────────────────────┐
//! │         [warn] | door        │  header: tags, or priority glyphs
//! │                              │
//! │          FRONT DOOR          │  title (optional, 12 columns)
//! │      ──────────────────      │
//! │           Someone            │  body (large face, 10 columns)
//! │           is at              │
//! │          the door            │
//! │          fine print          │  subtext (optional, 30 columns)
//! │      ──────────────────      │
//! │         Feb 15, 2026         │  footer date and time
//! │           14:03:22           │
//! │            ▓▓▓▓▓             │  QR of the click target (optional)
//! └──────────────────────────────┘
//! ```
//!
//! The body line height is measured on the 70px bold face even though the
//! body is drawn with the 40px face, which gives the receipt its airy
//! spacing. Height is the sum of every block below, clamped to the
//! configured maximum.

use chrono::NaiveDateTime;
use image::RgbImage;
use tracing::warn;

use super::RenderContext;
use super::canvas::{BLACK, Canvas};
use super::font::{Face, FontSet};
use super::qr;
use crate::content::{ELLIPSIS, NormalizedMessage};

pub const HEADER_PX: f32 = 70.0;
pub const TITLE_PX: f32 = 70.0;
pub const BODY_PX: f32 = 40.0;
pub const FOOTER_PX: f32 = 35.0;
pub const SUBTEXT_PX: f32 = 24.0;

pub const BODY_COLUMNS: usize = 10;
pub const TITLE_COLUMNS: usize = 12;
pub const SUBTEXT_COLUMNS: usize = 30;

pub const TOP_PAD: i32 = 20;
pub const HEADER_GAP: i32 = 80;
pub const TITLE_GAP: i32 = 15;
pub const LINE_GAP: i32 = 10;
pub const DIVIDER_GAP: i32 = 15;
pub const DIVIDER_THICKNESS: i32 = 3;
pub const DATE_GAP: i32 = 25;
pub const FOOTER_LINE_GAP: i32 = 5;
pub const SUBTEXT_GAP: i32 = 10;
pub const BOTTOM_PAD: i32 = 20;

/// Side of the click-target QR code
pub const QR_SIZE: u32 = 100;

/// Divider inset from each edge of the printable area
const DIVIDER_INSET: i32 = 20;

/// Faces used by the plain layout.
#[derive(Debug, Clone)]
pub struct PlainFaces {
    pub header: Face,
    pub title: Face,
    pub body: Face,
    pub footer: Face,
    pub subtext: Face,
}

impl PlainFaces {
    pub fn new(fonts: &FontSet) -> Self {
        Self {
            header: fonts.bold(HEADER_PX),
            title: fonts.bold(TITLE_PX),
            body: fonts.bold(BODY_PX),
            footer: fonts.regular(FOOTER_PX),
            subtext: fonts.regular(SUBTEXT_PX),
        }
    }

    /// Row pitch of body lines, measured on the header face.
    pub fn body_line_height(&self) -> i32 {
        self.header.line_height()
    }
}

/// Wrapped content of a plain-text receipt.
#[derive(Debug, Clone)]
pub struct PlainLayout {
    pub header: String,
    pub title_lines: Vec<String>,
    pub body_lines: Vec<String>,
    pub subtext_lines: Vec<String>,
    pub qr: Option<RgbImage>,
}

impl PlainLayout {
    /// Wrap a normalized message into layout blocks.
    pub fn build(message: &NormalizedMessage, max_lines: Option<usize>) -> Self {
        let header = if message.tags.is_empty() {
            message.priority.header()
        } else {
            message.tags.join(" | ")
        };

        let title_lines = message
            .title
            .as_deref()
            .map(|t| wrap(t, TITLE_COLUMNS))
            .unwrap_or_default();

        let mut body_lines = wrap(&message.text, BODY_COLUMNS);
        if let Some(cap) = max_lines {
            cap_lines(&mut body_lines, cap);
        }

        let subtext_lines = message
            .subtext
            .as_deref()
            .map(|s| wrap(s, SUBTEXT_COLUMNS))
            .unwrap_or_default();

        let qr = message.click.as_deref().and_then(|target| {
            let patch = qr::encode(target, QR_SIZE);
            if patch.is_none() {
                warn!(target, "QR generation failed; printing without it");
            }
            patch
        });

        Self {
            header,
            title_lines,
            body_lines,
            subtext_lines,
            qr,
        }
    }

    /// Canvas height before the max-height clamp.
    pub fn natural_height(&self, faces: &PlainFaces) -> u32 {
        let footer_h = faces.footer.line_height();

        let mut height = TOP_PAD + faces.header.bbox(&self.header).height() + HEADER_GAP;

        if !self.title_lines.is_empty() {
            height += block_height(self.title_lines.len(), faces.title.line_height())
                + TITLE_GAP
                + DIVIDER_THICKNESS
                + DIVIDER_GAP;
        }

        height += block_height(self.body_lines.len(), faces.body_line_height());

        if !self.subtext_lines.is_empty() {
            height += SUBTEXT_GAP
                + block_height(self.subtext_lines.len(), faces.subtext.line_height());
        }

        height += DIVIDER_GAP + DIVIDER_THICKNESS + DATE_GAP;
        height += footer_h + FOOTER_LINE_GAP + footer_h;

        if self.qr.is_some() {
            height += SUBTEXT_GAP + QR_SIZE as i32;
        }

        (height + BOTTOM_PAD).max(1) as u32
    }

    /// Draw the receipt. `now` supplies the footer timestamp.
    pub fn render(&self, ctx: &RenderContext, now: NaiveDateTime) -> Canvas {
        let faces = PlainFaces::new(&ctx.fonts);
        let geometry = &ctx.geometry;
        let height = geometry.clamp_height(self.natural_height(&faces));
        let mut canvas = Canvas::new(geometry.full_width, height);

        let left = geometry.left_margin;
        let width = geometry.printable_width as i32;

        canvas.cursor = TOP_PAD + geometry.y_offset;

        canvas.draw_text_centered(left, width, canvas.cursor, &self.header, &faces.header, BLACK);
        canvas.cursor += faces.header.bbox(&self.header).height() + HEADER_GAP;

        if !self.title_lines.is_empty() {
            draw_block(&mut canvas, left, width, &self.title_lines, &faces.title, faces.title.line_height());
            canvas.cursor += TITLE_GAP;
            draw_divider(&mut canvas, left, width);
            canvas.cursor += DIVIDER_GAP;
        }

        draw_block(&mut canvas, left, width, &self.body_lines, &faces.body, faces.body_line_height());

        if !self.subtext_lines.is_empty() {
            canvas.cursor += SUBTEXT_GAP;
            draw_block(&mut canvas, left, width, &self.subtext_lines, &faces.subtext, faces.subtext.line_height());
        }

        canvas.cursor += DIVIDER_GAP;
        draw_divider(&mut canvas, left, width);
        canvas.cursor += DATE_GAP;

        let footer_h = faces.footer.line_height();
        let date = now.format("%b %d, %Y").to_string();
        let time = now.format("%H:%M:%S").to_string();
        canvas.draw_text_centered(left, width, canvas.cursor, &date, &faces.footer, BLACK);
        canvas.cursor += footer_h + FOOTER_LINE_GAP;
        canvas.draw_text_centered(left, width, canvas.cursor, &time, &faces.footer, BLACK);
        canvas.cursor += footer_h;

        if let Some(qr) = &self.qr {
            canvas.cursor += SUBTEXT_GAP;
            let x = left + (width - qr.width() as i32) / 2;
            canvas.paste(qr, x, canvas.cursor);
            canvas.cursor += qr.height() as i32;
        }

        canvas.cursor += BOTTOM_PAD;
        canvas
    }
}

/// `n` lines of height `line_h` separated by [`LINE_GAP`].
fn block_height(n: usize, line_h: i32) -> i32 {
    if n == 0 {
        return 0;
    }
    n as i32 * line_h + (n as i32 - 1) * LINE_GAP
}

fn draw_block(canvas: &mut Canvas, left: i32, width: i32, lines: &[String], face: &Face, line_h: i32) {
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            canvas.cursor += LINE_GAP;
        }
        canvas.draw_text_centered(left, width, canvas.cursor, line, face, BLACK);
        canvas.cursor += line_h;
    }
}

/// Rule occupying the [`DIVIDER_THICKNESS`] rows starting at the cursor.
fn draw_divider(canvas: &mut Canvas, left: i32, width: i32) {
    let y = canvas.cursor;
    canvas.fill_rect(
        left + DIVIDER_INSET,
        y,
        left + width - DIVIDER_INSET + 1,
        y + DIVIDER_THICKNESS,
        BLACK,
    );
    canvas.cursor += DIVIDER_THICKNESS;
}

/// Wrap to `columns`, breaking long words.
pub fn wrap(text: &str, columns: usize) -> Vec<String> {
    textwrap::wrap(text, columns)
        .into_iter()
        .map(|line| line.trim_end().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

/// Keep `cap` lines; the last kept line ends in `...` when lines were dropped.
fn cap_lines(lines: &mut Vec<String>, cap: usize) {
    if lines.len() <= cap || cap == 0 {
        lines.truncate(cap);
        return;
    }
    lines.truncate(cap);
    if let Some(last) = lines.last_mut() {
        let keep = last.chars().count().saturating_sub(ELLIPSIS.len());
        *last = last.chars().take(keep).chain(ELLIPSIS.chars()).collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::canvas::WHITE;
    use crate::content::{ClickRules, Limits, Priority};
    use crate::printer::{Geometry, PaperConfig};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn ctx() -> RenderContext {
        RenderContext {
            geometry: Geometry::resolve(&PaperConfig::default()).unwrap(),
            fonts: FontSet::builtin(),
            limits: Limits::default(),
            click: ClickRules::default(),
        }
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 2, 15)
            .unwrap()
            .and_hms_opt(14, 3, 22)
            .unwrap()
    }

    fn plain(text: &str) -> NormalizedMessage {
        NormalizedMessage::plain(text, None, None, &Limits::default(), &ClickRules::default())
    }

    #[test]
    fn test_wrap_ten_columns() {
        assert_eq!(wrap("Lunch Time!", 10), vec!["Lunch", "Time!"]);
        assert_eq!(wrap("", 10), Vec::<String>::new());
        assert_eq!(wrap("abcdefghijklmno", 10), vec!["abcdefghij", "klmno"]);
    }

    #[test]
    fn test_cap_lines_adds_ellipsis() {
        let mut lines = vec!["alpha".to_string(), "beta".to_string(), "gamma".to_string()];
        cap_lines(&mut lines, 2);
        assert_eq!(lines, vec!["alpha".to_string(), "b...".to_string()]);

        let mut short = vec!["one".to_string()];
        cap_lines(&mut short, 3);
        assert_eq!(short, vec!["one".to_string()]);
    }

    #[test]
    fn test_header_from_priority_or_tags() {
        let layout = PlainLayout::build(&plain("x"), None);
        assert_eq!(layout.header, Priority::Default.header());

        let mut msg = plain("x");
        msg.tags = vec!["[warn]".into(), "door".into()];
        assert_eq!(PlainLayout::build(&msg, None).header, "[warn] | door");
    }

    #[test]
    fn test_body_wraps_to_completion_without_cap() {
        let msg = plain("one two three four five six seven eight nine ten");
        let layout = PlainLayout::build(&msg, None);
        assert!(layout.body_lines.len() > 3);

        let capped = PlainLayout::build(&msg, Some(3));
        assert_eq!(capped.body_lines.len(), 3);
        assert!(capped.body_lines[2].ends_with("..."));
    }

    #[test]
    fn test_height_grows_with_content() {
        let faces = PlainFaces::new(&FontSet::builtin());
        let short = PlainLayout::build(&plain("Hi"), None).natural_height(&faces);
        let long = PlainLayout::build(&plain("Hi there, this is longer"), None).natural_height(&faces);
        assert!(long > short);
    }

    #[test]
    fn test_title_and_qr_add_height() {
        let faces = PlainFaces::new(&FontSet::builtin());
        let base = PlainLayout::build(&plain("Hi"), None);
        let base_h = base.natural_height(&faces);

        let mut msg = plain("Hi");
        msg.title = Some("Door".into());
        msg.click = Some("https://example.com".into());
        let rich = PlainLayout::build(&msg, None);
        assert!(rich.qr.is_some());

        let expected = base_h as i32
            + faces.title.line_height()
            + TITLE_GAP
            + DIVIDER_THICKNESS
            + DIVIDER_GAP
            + SUBTEXT_GAP
            + QR_SIZE as i32;
        assert_eq!(rich.natural_height(&faces) as i32, expected);
    }

    #[test]
    fn test_render_matches_natural_height() {
        let ctx = ctx();
        let layout = PlainLayout::build(&plain("Lunch Time!"), None);
        let canvas = layout.render(&ctx, now());
        assert_eq!(canvas.width(), 639);
        assert_eq!(canvas.height(), layout.natural_height(&PlainFaces::new(&ctx.fonts)));
        assert_eq!(canvas.cursor as u32, canvas.height());
    }

    #[test]
    fn test_render_clamps_to_max_height() {
        let mut ctx = ctx();
        ctx.geometry = Geometry::resolve(&PaperConfig {
            max_height_mm: Some(20.0),
            ..PaperConfig::default()
        })
        .unwrap();
        let layout = PlainLayout::build(&plain("a long message that wraps a lot"), None);
        let canvas = layout.render(&ctx, now());
        assert_eq!(canvas.height(), 160);
    }

    #[test]
    fn test_divider_starts_at_cursor() {
        let mut canvas = Canvas::new(100, 20);
        canvas.cursor = 10;
        draw_divider(&mut canvas, 0, 100);

        assert_eq!(canvas.cursor, 10 + DIVIDER_THICKNESS);
        assert_eq!(canvas.pixel(50, 9), WHITE);
        for y in 10..10 + DIVIDER_THICKNESS {
            assert_eq!(canvas.pixel(DIVIDER_INSET, y), BLACK);
            assert_eq!(canvas.pixel(100 - DIVIDER_INSET, y), BLACK);
        }
        assert_eq!(canvas.pixel(50, 10 + DIVIDER_THICKNESS), WHITE);
        assert_eq!(canvas.pixel(DIVIDER_INSET - 1, 11), WHITE);
    }
}
