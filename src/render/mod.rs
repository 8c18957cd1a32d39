//! # Receipt Rendering
//!
//! Turns normalized messages into paper-width RGB canvases.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`dispatch`] | Picks a layout from the message shape |
//! | [`plain`] | Header, title, body, footer and click QR |
//! | [`task`] | Fixed-height kanban task card |
//! | [`alert`] | Severity banner |
//! | [`align`] | Alignment test page |
//! | [`canvas`] | Drawing surface |
//! | [`font`] | Outline and built-in bitmap faces |
//! | [`qr`] | QR code patches |
//!
//! Every layout is a pure function of the message, the [`RenderContext`] and
//! (for the plain footer) the current time.

pub mod align;
pub mod alert;
pub mod canvas;
pub mod dispatch;
pub mod font;
pub mod plain;
pub mod qr;
pub mod task;

pub use canvas::Canvas;
pub use dispatch::{ParsedMessage, RenderVariant, RenderedMessage, dispatch, parse_message};
pub use font::FontSet;

use crate::content::{ClickRules, Limits};
use crate::printer::Geometry;

/// Everything a layout needs besides the message itself.
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub geometry: Geometry,
    pub fonts: FontSet,
    pub limits: Limits,
    pub click: ClickRules,
}
