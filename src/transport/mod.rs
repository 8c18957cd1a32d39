//! # Printer Transport Layer
//!
//! Hardware links the delivery pipeline talks to.
//!
//! ## Available Transports
//!
//! - [`usb`]: Kernel usblp character device (`/dev/usb/lp0`)
//! - [`preview`]: Writes each image as a PNG file instead of printing
//!
//! A [`Connector`] knows how to (re)open a link; a [`Link`] is one open
//! connection. The pipeline owns both and drops the link whenever it decides
//! to reconnect.

pub mod preview;
pub mod usb;

pub use preview::{PreviewConnector, PreviewLink};
pub use usb::{UsbConnector, UsbLink};

use crate::error::Result;
use crate::protocol::ImageEncoding;
use crate::raster::Bitmap;

/// Connection state as seen by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    #[default]
    Disconnected,
    Connected,
    /// Connected, but new jobs are refused under memory pressure
    Paused,
}

/// Opens links to a printer.
pub trait Connector: Send {
    type Link: Link;

    fn connect(&mut self) -> Result<Self::Link>;
}

/// One open connection to a printer.
pub trait Link: Send {
    /// Whether the device still looks present.
    fn is_ready(&self) -> bool;

    /// Reset the printer to its power-on state.
    fn initialize(&mut self) -> Result<()>;

    /// Send `bitmap` using one image command family.
    fn send_image(&mut self, bitmap: &Bitmap, encoding: ImageEncoding) -> Result<()>;

    fn send_text(&mut self, text: &str) -> Result<()>;

    fn cut(&mut self) -> Result<()>;
}
