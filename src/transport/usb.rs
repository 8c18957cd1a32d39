//! # USB Printer Transport
//!
//! Talks to the printer through the kernel `usblp` driver, which exposes
//! each attached printer as a write-only character device.
//!
//! ## Setup (Linux)
//!
//! ```bash
//! # Plug the printer in, then check the node exists
//! $ ls -l /dev/usb/lp0
//! crw-rw---- 1 root lp 180, 0 ... /dev/usb/lp0
//!
//! # Allow the service user to write to it
//! $ sudo usermod -aG lp $USER
//! ```
//!
//! ## Failure Modes
//!
//! Unplugging or power cycling the printer removes the device node. Writes
//! on a stale handle then fail with `ENODEV`, and reopening fails with
//! `ENOENT` until the printer comes back. Both surface as
//! [`ReceiptError::DeviceUnavailable`] so the pipeline retries them.
//!
//! ## Chunked Writes
//!
//! Large images are written in 4096-byte chunks so the driver's buffer never
//! has to take a whole receipt at once.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use tracing::{debug, info};

use super::{Connector, Link};
use crate::error::{ReceiptError, Result};
use crate::protocol::{ImageEncoding, commands};
use crate::raster::Bitmap;

/// Default usblp device path
pub const DEFAULT_DEVICE: &str = "/dev/usb/lp0";

/// Default chunk size for writes (bytes)
const CHUNK_SIZE: usize = 4096;

/// Pause after opening so the printer finishes enumerating
const SETTLE_DELAY: Duration = Duration::from_millis(500);

/// # USB Printer Link
///
/// ## Example
///
/// ```no_run
/// use ntfy_receipt::transport::{Link, UsbLink};
///
/// let mut link = UsbLink::open("/dev/usb/lp0")?;
/// link.initialize()?;
/// link.send_text("hello\n\n\n\n")?;
/// link.cut()?;
/// # Ok::<(), ntfy_receipt::error::ReceiptError>(())
/// ```
pub struct UsbLink {
    path: PathBuf,
    file: File,
    chunk_size: usize,
}

impl UsbLink {
    /// Open the device node for writing.
    ///
    /// ## Errors
    ///
    /// - `DeviceUnavailable` if the node doesn't exist (printer unplugged)
    /// - `Transport` for anything else, e.g. permission denied
    pub fn open<P: AsRef<Path>>(device: P) -> Result<Self> {
        let path = device.as_ref();

        let file = OpenOptions::new()
            .write(true)
            .open(path)
            .map_err(|e| ReceiptError::from_device_io(&format!("Failed to open {}", path.display()), e))?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            chunk_size: CHUNK_SIZE,
        })
    }

    /// Set the chunk size for large writes.
    pub fn set_chunk_size(&mut self, size: usize) {
        self.chunk_size = size.max(1);
    }

    /// Write data to the printer in chunks, then flush.
    pub fn write_all(&mut self, data: &[u8]) -> Result<()> {
        for chunk in data.chunks(self.chunk_size) {
            self.file
                .write_all(chunk)
                .map_err(|e| ReceiptError::from_device_io("Write failed", e))?;
        }

        self.file
            .flush()
            .map_err(|e| ReceiptError::from_device_io("Flush failed", e))?;

        Ok(())
    }
}

impl Link for UsbLink {
    fn is_ready(&self) -> bool {
        self.path.exists()
    }

    fn initialize(&mut self) -> Result<()> {
        self.write_all(&commands::init())
    }

    fn send_image(&mut self, bitmap: &Bitmap, encoding: ImageEncoding) -> Result<()> {
        let data = encoding.encode(bitmap)?;
        debug!(%encoding, bytes = data.len(), "Sending image");
        self.write_all(&data)
    }

    fn send_text(&mut self, text: &str) -> Result<()> {
        self.write_all(&commands::text(text))
    }

    fn cut(&mut self) -> Result<()> {
        self.write_all(&commands::cut_full())
    }
}

/// Opens [`UsbLink`]s on a fixed device path.
#[derive(Debug, Clone)]
pub struct UsbConnector {
    device: PathBuf,
}

impl UsbConnector {
    pub fn new(device: impl Into<PathBuf>) -> Self {
        Self {
            device: device.into(),
        }
    }
}

impl Default for UsbConnector {
    fn default() -> Self {
        Self::new(DEFAULT_DEVICE)
    }
}

impl Connector for UsbConnector {
    type Link = UsbLink;

    fn connect(&mut self) -> Result<UsbLink> {
        let link = UsbLink::open(&self.device)?;
        thread::sleep(SETTLE_DELAY);
        info!(device = %self.device.display(), "Printer connected");
        Ok(link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_device_is_transient() {
        let err = UsbLink::open("/dev/usb/definitely-not-a-printer").err().unwrap();
        assert!(matches!(err, ReceiptError::DeviceUnavailable(_)));
        assert!(err.is_transient());
    }

    #[test]
    fn test_writes_are_chunked_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lp0");
        File::create(&path).unwrap();

        let mut link = UsbLink::open(&path).unwrap();
        link.set_chunk_size(3);
        assert!(link.is_ready());
        link.initialize().unwrap();
        link.send_text("abcdefg").unwrap();
        link.cut().unwrap();

        let written = std::fs::read(&path).unwrap();
        assert_eq!(written, b"\x1b@abcdefg\x1dV\x00".to_vec());
    }

    #[test]
    fn test_send_image_writes_encoded_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lp0");
        File::create(&path).unwrap();

        let bitmap = Bitmap::from_dots(8, 1, &[true; 8]);
        let mut link = UsbLink::open(&path).unwrap();
        link.send_image(&bitmap, ImageEncoding::BitImageRaster).unwrap();

        let written = std::fs::read(&path).unwrap();
        assert_eq!(written, vec![0x1D, 0x76, 0x30, 0x00, 1, 0, 1, 0, 0xFF]);
    }

    #[test]
    fn test_is_ready_tracks_device_node() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lp0");
        File::create(&path).unwrap();

        let link = UsbLink::open(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert!(!link.is_ready());
    }
}
