//! # Task Card Layout
//!
//! Kanban-style card for `monday_task` payloads. The card has a fixed height;
//! long titles are cut at two lines instead of growing the receipt.
//!
//! ```text
//! ┏━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━┓
//! ┃█ Fix login bug               ┃
//! ┃█ on Safari                   ┃
//! ┃█ [WIP] [!!]                  ┃
//! ┃█ @JD | 2026-02-15            ┃
//! ┃█ #M123              ▓▓▓▓     ┃
//! ┃█                    ▓▓▓▓     ┃
//! ┗━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━┛
//! ```
//!
//! The solid bar on the left widens with the task's priority.

use tracing::warn;

use super::RenderContext;
use super::canvas::{BLACK, Canvas};
use super::plain::wrap;
use super::qr;
use crate::content::{AlertLevel, TaskFields};

const TITLE_PX: f32 = 28.0;
const META_PX: f32 = 16.0;
const SMALL_PX: f32 = 13.0;

const TITLE_COLUMNS: usize = 18;
const TITLE_MAX_LINES: usize = 2;

const BASE_HEIGHT: u32 = 220;
/// Extra card height reserved when a QR code is printed
const QR_ALLOWANCE: u32 = 80;
const CARD_TOP: i32 = 10;
const PADDING: i32 = 15;
/// Gap between the card bottom and the canvas bottom
const BOTTOM_INSET: i32 = 15;
const BORDER: i32 = 2;

/// Content starts past the bar and the padding
const CONTENT_INDENT: i32 = PADDING + 10;

const TITLE_STEP: i32 = 32;
const TITLE_GAP: i32 = 8;
const ICON_STEP: i32 = 24;
const META_STEP: i32 = 20;
const REFERENCE_STEP: i32 = 18;

pub const QR_SIZE: u32 = 70;
/// QR offset from the card's right edge and bottom
const QR_RIGHT: i32 = 75;
const QR_BOTTOM: i32 = 85;

/// Width of the priority bar for a task level.
pub fn bar_width(level: Option<AlertLevel>) -> i32 {
    match level {
        Some(AlertLevel::Critical) => 8,
        Some(AlertLevel::High) => 6,
        Some(AlertLevel::Medium) => 4,
        Some(AlertLevel::Low) => 2,
        None => 3,
    }
}

/// Text rows and decorations of one task card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskCard {
    pub title_lines: Vec<String>,
    /// `<status icon> <priority icon>`
    pub icons: String,
    /// `@ASSIGNEE | due date`, when either is present
    pub meta: Option<String>,
    /// `#<reference>`
    pub reference: Option<String>,
    pub bar_width: i32,
    pub qr_target: Option<String>,
}

impl TaskCard {
    pub fn build(task: &TaskFields) -> Self {
        let mut title_lines = wrap(&task.name, TITLE_COLUMNS);
        title_lines.truncate(TITLE_MAX_LINES);

        let mut meta_parts = Vec::new();
        if !task.assignee.is_empty() {
            meta_parts.push(format!("@{}", task.assignee));
        }
        if !task.due_date.is_empty() {
            meta_parts.push(task.due_date.clone());
        }

        Self {
            title_lines,
            icons: format!("{} {}", task.status_icon(), task.priority_icon()),
            meta: (!meta_parts.is_empty()).then(|| meta_parts.join(" | ")),
            reference: (!task.reference.is_empty()).then(|| format!("#{}", task.reference)),
            bar_width: bar_width(task.level),
            qr_target: task.qr_target.clone(),
        }
    }

    pub fn card_height(&self) -> u32 {
        if self.qr_target.is_some() {
            BASE_HEIGHT + QR_ALLOWANCE
        } else {
            BASE_HEIGHT
        }
    }

    /// Top-left corner of the QR patch, relative to the canvas.
    pub fn qr_origin(&self, ctx: &RenderContext) -> (i32, i32) {
        let card_x = ctx.geometry.left_margin;
        let card_y = CARD_TOP + ctx.geometry.y_offset;
        let card_width = ctx.geometry.printable_width as i32;
        (
            card_x + card_width - QR_RIGHT,
            card_y + self.card_height() as i32 - QR_BOTTOM,
        )
    }

    pub fn render(&self, ctx: &RenderContext) -> Canvas {
        let geometry = &ctx.geometry;
        let card_height = self.card_height() as i32;
        let mut canvas = Canvas::new(geometry.full_width, geometry.clamp_height(card_height as u32));

        let card_x = geometry.left_margin;
        let card_y = CARD_TOP + geometry.y_offset;
        let card_width = geometry.printable_width as i32;
        let card_bottom = card_y + card_height - BOTTOM_INSET;

        canvas.outline_rect(card_x, card_y, card_x + card_width, card_bottom, BORDER, BLACK);
        canvas.fill_rect(card_x, card_y, card_x + self.bar_width, card_bottom + 1, BLACK);

        let title_face = ctx.fonts.bold(TITLE_PX);
        let meta_face = ctx.fonts.regular(META_PX);
        let small_face = ctx.fonts.regular(SMALL_PX);
        let content_x = card_x + CONTENT_INDENT;

        canvas.cursor = card_y + PADDING;
        for line in &self.title_lines {
            canvas.draw_text(content_x, canvas.cursor, line, &title_face, BLACK);
            canvas.cursor += TITLE_STEP;
        }
        canvas.cursor += TITLE_GAP;

        canvas.draw_text(content_x, canvas.cursor, &self.icons, &meta_face, BLACK);
        canvas.cursor += ICON_STEP;

        if let Some(meta) = &self.meta {
            canvas.draw_text(content_x, canvas.cursor, meta, &small_face, BLACK);
            canvas.cursor += META_STEP;
        }

        if let Some(reference) = &self.reference {
            canvas.draw_text(content_x, canvas.cursor, reference, &small_face, BLACK);
            canvas.cursor += REFERENCE_STEP;
        }

        if let Some(target) = &self.qr_target {
            match qr::encode(target, QR_SIZE) {
                Some(patch) => {
                    let (qr_x, qr_y) = self.qr_origin(ctx);
                    canvas.paste(&patch, qr_x, qr_y);
                }
                None => warn!(target = %target, "QR generation failed; printing card without it"),
            }
        }

        canvas
    }
}
