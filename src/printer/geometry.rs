//! # Paper Geometry
//!
//! Converts the physical paper configuration into the pixel measurements
//! every layout uses.
//!
//! ## Conversion
//!
//! ```text
//! px = round(mm / 25.4 * dpi)
//!
//! For 80mm paper at 203 DPI with a 4mm safe margin:
//!   full width      = round(80 / 25.4 * 203) = 639 px
//!   safe margin     = round( 4 / 25.4 * 203) =  32 px
//!   printable width = 639 - 2 * 32           = 575 px
//! ```
//!
//! ## Print Area
//!
//! ```text
//! ├─ margin ─┼──────── printable width ────────┼─ margin ─┤
//! │  32 px   │             575 px              │  32 px   │
//! ```
//!
//! The x offset shifts the printable area sideways to compensate for paper
//! that sits off-center in the printer; the y offset pushes content down.

use crate::error::{ReceiptError, Result};

/// Physical paper configuration, in millimeters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaperConfig {
    pub paper_width_mm: f32,
    pub dpi: u32,
    pub safe_margin_mm: f32,
    pub x_offset_mm: f32,
    pub y_offset_mm: f32,
    /// Clamp for canvas height; `None` lets layouts grow freely.
    pub max_height_mm: Option<f32>,
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            paper_width_mm: 80.0,
            dpi: 203,
            safe_margin_mm: 4.0,
            x_offset_mm: 0.0,
            y_offset_mm: 0.0,
            max_height_mm: None,
        }
    }
}

/// Pixel measurements derived from a [`PaperConfig`].
///
/// Built once at startup and never mutated afterward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub dpi: u32,
    /// Canvas width, covering the whole paper
    pub full_width: u32,
    pub safe_margin: u32,
    pub printable_width: u32,
    pub x_offset: i32,
    pub y_offset: i32,
    /// Left edge of the printable area, including the x offset
    pub left_margin: i32,
    pub max_height: Option<u32>,
}

impl Geometry {
    /// Resolve pixel geometry, rejecting configurations with no printable area.
    pub fn resolve(config: &PaperConfig) -> Result<Self> {
        if !(config.paper_width_mm > 0.0) {
            return Err(ReceiptError::Config(format!(
                "paper width must be positive, got {}mm",
                config.paper_width_mm
            )));
        }
        if config.dpi == 0 {
            return Err(ReceiptError::Config("DPI must be positive".to_string()));
        }
        if config.safe_margin_mm < 0.0 {
            return Err(ReceiptError::Config(format!(
                "safe margin cannot be negative, got {}mm",
                config.safe_margin_mm
            )));
        }

        let dpi = config.dpi;
        let full_width = mm_to_px(config.paper_width_mm, dpi);
        let safe_margin = mm_to_px(config.safe_margin_mm, dpi);

        if full_width <= safe_margin.saturating_mul(2) {
            return Err(ReceiptError::Config(format!(
                "safe margin {}mm leaves no printable width on {}mm paper",
                config.safe_margin_mm, config.paper_width_mm
            )));
        }

        let x_offset = mm_to_px_signed(config.x_offset_mm, dpi);
        let y_offset = mm_to_px_signed(config.y_offset_mm, dpi);

        let max_height = match config.max_height_mm {
            Some(mm) if mm > 0.0 => Some(mm_to_px(mm, dpi)),
            Some(mm) => {
                return Err(ReceiptError::Config(format!(
                    "max height must be positive, got {}mm",
                    mm
                )));
            }
            None => None,
        };

        Ok(Self {
            dpi,
            full_width,
            safe_margin,
            printable_width: full_width - 2 * safe_margin,
            x_offset,
            y_offset,
            left_margin: safe_margin as i32 + x_offset,
            max_height,
        })
    }

    /// Apply the optional height clamp.
    pub fn clamp_height(&self, height: u32) -> u32 {
        match self.max_height {
            Some(max) => height.min(max),
            None => height,
        }
    }
}

/// Calculate dots per millimeter
#[inline]
pub fn dots_per_mm(dpi: u32) -> f32 {
    dpi as f32 / 25.4
}

#[inline]
fn mm_to_px(mm: f32, dpi: u32) -> u32 {
    (mm * dots_per_mm(dpi)).round().max(0.0) as u32
}

#[inline]
fn mm_to_px_signed(mm: f32, dpi: u32) -> i32 {
    (mm * dots_per_mm(dpi)).round() as i32
}
