//! # ESC/POS Protocol
//!
//! Byte-level command builders for ESC/POS thermal receipt printers.
//!
//! ## Module Structure
//!
//! - [`commands`]: Init, feed, cut, plain text and line spacing
//! - [`graphics`]: The three image encodings tried during delivery
//!
//! ## Usage Example
//!
//! ```
//! use ntfy_receipt::protocol::{commands, graphics::ImageEncoding};
//! use ntfy_receipt::raster::Bitmap;
//!
//! let bitmap = Bitmap::from_dots(8, 1, &[true; 8]);
//!
//! let mut data = Vec::new();
//! data.extend(commands::init());
//! data.extend(ImageEncoding::BitImageRaster.encode(&bitmap)?);
//! data.extend(commands::text("\n\n\n\n"));
//! data.extend(commands::cut_full());
//!
//! // Send `data` to the printer via a transport link...
//! # Ok::<(), ntfy_receipt::error::ReceiptError>(())
//! ```

pub mod commands;
pub mod graphics;

pub use graphics::ImageEncoding;
