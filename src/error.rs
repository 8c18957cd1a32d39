//! # Error Types
//!
//! This module defines the error type shared by rendering, conversion and
//! delivery.
//!
//! Delivery code needs to know whether a hardware failure is worth retrying,
//! so [`ReceiptError::is_transient`] classifies errors by what the device
//! layer reported:
//!
//! | Variant | Transient |
//! |---------|-----------|
//! | `DeviceUnavailable` | always |
//! | `Io` | `ENODEV`, `ENXIO`, `ENOENT` |
//! | `Transport` | message mentions a vanished device |
//! | everything else | never |

use std::io;

use thiserror::Error;

/// Main error type for receipt operations
#[derive(Debug, Error)]
pub enum ReceiptError {
    /// Invalid or inconsistent configuration, fatal at startup
    #[error("Configuration error: {0}")]
    Config(String),

    /// The device node went away (unplugged, power cycled)
    #[error("Device unavailable: {0}")]
    DeviceUnavailable(String),

    /// Transport-level errors (write, flush)
    #[error("Transport error: {0}")]
    Transport(String),

    /// A device image encoding could not represent the bitmap
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Image processing error
    #[error("Image error: {0}")]
    Image(String),

    /// Notification stream error
    #[error("Stream error: {0}")]
    Stream(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Messages the kernel and USB stacks use when a device disappears.
const VANISHED_DEVICE_MARKERS: &[&str] = &["no such device", "entity not found"];

impl ReceiptError {
    /// Whether a retry after reconnecting has a chance of succeeding.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::DeviceUnavailable(_) => true,
            Self::Io(err) => is_transient_io(err),
            Self::Transport(msg) => {
                let msg = msg.to_lowercase();
                VANISHED_DEVICE_MARKERS.iter().any(|m| msg.contains(m))
            }
            _ => false,
        }
    }

    /// Wrap an I/O error raised while talking to the device.
    ///
    /// Errors that mean the device is gone become `DeviceUnavailable`.
    pub fn from_device_io(context: &str, err: io::Error) -> Self {
        if is_transient_io(&err) {
            Self::DeviceUnavailable(format!("{}: {}", context, err))
        } else {
            Self::Transport(format!("{}: {}", context, err))
        }
    }
}

fn is_transient_io(err: &io::Error) -> bool {
    if err.kind() == io::ErrorKind::NotFound {
        return true;
    }
    matches!(
        err.raw_os_error(),
        Some(libc::ENODEV) | Some(libc::ENXIO) | Some(libc::ENOENT)
    )
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, ReceiptError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_unavailable_is_transient() {
        assert!(ReceiptError::DeviceUnavailable("lp0".into()).is_transient());
    }

    #[test]
    fn test_transport_message_classification() {
        assert!(ReceiptError::Transport("[Errno 19] No such device".into()).is_transient());
        assert!(ReceiptError::Transport("Entity not found".into()).is_transient());
        assert!(!ReceiptError::Transport("Broken pipe".into()).is_transient());
    }

    #[test]
    fn test_io_errno_classification() {
        let gone = io::Error::from_raw_os_error(libc::ENODEV);
        assert!(ReceiptError::Io(gone).is_transient());

        let denied = io::Error::from_raw_os_error(libc::EACCES);
        assert!(!ReceiptError::Io(denied).is_transient());
    }

    #[test]
    fn test_from_device_io_maps_variant() {
        let err = ReceiptError::from_device_io(
            "Write failed",
            io::Error::from_raw_os_error(libc::ENXIO),
        );
        assert!(matches!(err, ReceiptError::DeviceUnavailable(_)));

        let err = ReceiptError::from_device_io(
            "Write failed",
            io::Error::from_raw_os_error(libc::EPIPE),
        );
        assert!(matches!(err, ReceiptError::Transport(_)));
    }

    #[test]
    fn test_non_device_errors_are_permanent() {
        assert!(!ReceiptError::Config("bad".into()).is_transient());
        assert!(!ReceiptError::Encoding("too big".into()).is_transient());
    }
}
