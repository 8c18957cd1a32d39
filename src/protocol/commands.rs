//! # ESC/POS Protocol Commands
//!
//! Basic control sequences for ESC/POS thermal receipt printers.
//!
//! ## Escape Sequence Structure
//!
//! - Single byte: `LF`
//! - Two bytes: `ESC @`
//! - Multi-byte with parameters: `ESC d n`, `GS V m`
//!
//! Multi-byte integers are **little-endian**: `u16` 0x1234 is sent as
//! `[0x34, 0x12]`.

// ============================================================================
// ESCAPE SEQUENCE CONSTANTS
// ============================================================================

/// ESC (Escape) - Command prefix byte
pub const ESC: u8 = 0x1B;

/// GS (Group Separator) - Extended command prefix
///
/// Graphics, cutter and status commands start with GS (0x1D).
pub const GS: u8 = 0x1D;

/// LF (Line Feed) - Print the line buffer and advance one line
pub const LF: u8 = 0x0A;

// ============================================================================
// INITIALIZATION
// ============================================================================

/// # Initialize Printer (ESC @)
///
/// Clears the print buffer and resets modes to power-on defaults. Sent at
/// the start of every job.
///
/// | Format | Hex |
/// |--------|-----|
/// | ESC @ | 1B 40 |
#[inline]
pub fn init() -> Vec<u8> {
    vec![ESC, b'@']
}

// ============================================================================
// PAPER CONTROL
// ============================================================================

/// # Full Cut (GS V 0)
///
/// Cuts at the current position. Feed past the cutter first, or the last
/// printed lines end up on the next receipt.
#[inline]
pub fn cut_full() -> Vec<u8> {
    vec![GS, b'V', 0]
}

// ============================================================================
// TEXT
// ============================================================================

/// Encode text for the printer's default code page.
///
/// Non-ASCII characters become `?`; newlines pass through as `LF`.
pub fn text(s: &str) -> Vec<u8> {
    s.chars()
        .filter(|&c| c != '\r')
        .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
        .collect()
}

// ============================================================================
// LINE SPACING
// ============================================================================

/// # Set Line Spacing (ESC 3 n)
///
/// Used around column-format images so 24-dot stripes butt together.
#[inline]
pub fn line_spacing(n: u8) -> Vec<u8> {
    vec![ESC, b'3', n]
}

/// # Default Line Spacing (ESC 2)
#[inline]
pub fn default_line_spacing() -> Vec<u8> {
    vec![ESC, b'2']
}
