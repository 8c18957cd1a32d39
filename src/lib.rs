//! # ntfy-receipt - Notifications on Thermal Paper
//!
//! Turns ntfy notifications into receipts on an ESC/POS thermal printer:
//!
//! - **Rendering**: plain messages, kanban task cards and priority banners
//!   laid out for the configured paper width
//! - **Conversion**: RGB canvas to the printer's 1-bit bitstream
//! - **Delivery**: retries, reconnects and image encoding fallback over a
//!   USB link that can vanish at any time
//! - **Backpressure**: printing pauses while system memory is tight
//!
//! ## Quick Start
//!
//! ```no_run
//! use chrono::Local;
//! use ntfy_receipt::{
//!     pipeline::{DeliveryOptions, PauseFlag, Pipeline, PrintJob},
//!     printer::{Geometry, PaperConfig},
//!     render::{FontSet, RenderContext, dispatch},
//!     transport::UsbConnector,
//! };
//!
//! let ctx = RenderContext {
//!     geometry: Geometry::resolve(&PaperConfig::default())?,
//!     fonts: FontSet::load("/usr/share/fonts/truetype/dejavu".as_ref()),
//!     limits: Default::default(),
//!     click: Default::default(),
//! };
//!
//! let message = "Lunch Time!";
//! let rendered = dispatch(message, None, &ctx, Local::now().naive_local());
//!
//! let mut pipeline = Pipeline::new(
//!     UsbConnector::new("/dev/usb/lp0"),
//!     PauseFlag::new(),
//!     DeliveryOptions::default(),
//! );
//! let outcome = pipeline.deliver(&PrintJob::new(rendered.canvas, message));
//! println!("{:?}", outcome);
//!
//! # Ok::<(), ntfy_receipt::error::ReceiptError>(())
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`printer`] | Paper geometry in pixels |
//! | [`content`] | Message normalization |
//! | [`render`] | Layouts, fonts, QR codes |
//! | [`raster`] | Canvas to 1-bit bitmap |
//! | [`protocol`] | ESC/POS command builders |
//! | [`transport`] | USB and preview links |
//! | [`pipeline`] | Retrying delivery and the print worker |
//! | [`monitor`] | Memory backpressure |
//! | [`source`] | ntfy stream consumer |
//! | [`notify`] | Error reports |
//! | [`config`] | Flags and environment |
//! | [`logging`] | Subscriber setup |
//! | [`error`] | Error types |

pub mod config;
pub mod content;
pub mod error;
pub mod logging;
pub mod monitor;
pub mod notify;
pub mod pipeline;
pub mod printer;
pub mod protocol;
pub mod raster;
pub mod render;
pub mod source;
pub mod transport;

// Re-exports for convenience
pub use error::{ReceiptError, Result};
pub use pipeline::{PauseFlag, Pipeline, PrintJob, PrintOutcome};
pub use printer::{Geometry, PaperConfig};
pub use render::{RenderContext, RenderVariant};
