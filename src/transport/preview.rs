//! # Preview Transport
//!
//! Stands in for a printer: every image becomes `preview_<n>.png` in an
//! output directory, numbered across reconnects. Text and cuts are only
//! logged.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use image::{GrayImage, Luma};
use tracing::{debug, info};

use super::{Connector, Link};
use crate::error::{ReceiptError, Result};
use crate::protocol::ImageEncoding;
use crate::raster::Bitmap;

/// Save a 1-bit bitmap as a black and white PNG.
pub fn save_png(path: &Path, bitmap: &Bitmap) -> Result<()> {
    let mut img = GrayImage::new(bitmap.width as u32, bitmap.height as u32);

    for y in 0..bitmap.height {
        for x in 0..bitmap.width {
            let color = if bitmap.get(x, y) { 0u8 } else { 255u8 };
            img.put_pixel(x as u32, y as u32, Luma([color]));
        }
    }

    img.save(path)
        .map_err(|e| ReceiptError::Image(format!("Failed to save PNG: {}", e)))?;

    Ok(())
}

pub struct PreviewLink {
    dir: PathBuf,
    counter: Arc<AtomicUsize>,
}

impl PreviewLink {
    fn next_path(&self) -> PathBuf {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        self.dir.join(format!("preview_{}.png", n))
    }
}

impl Link for PreviewLink {
    fn is_ready(&self) -> bool {
        self.dir.is_dir()
    }

    fn initialize(&mut self) -> Result<()> {
        Ok(())
    }

    fn send_image(&mut self, bitmap: &Bitmap, encoding: ImageEncoding) -> Result<()> {
        let path = self.next_path();
        save_png(&path, bitmap)?;
        info!(path = %path.display(), %encoding, "Preview saved");
        Ok(())
    }

    fn send_text(&mut self, text: &str) -> Result<()> {
        debug!(len = text.len(), "Preview text");
        Ok(())
    }

    fn cut(&mut self) -> Result<()> {
        debug!("Preview cut");
        Ok(())
    }
}

/// Opens [`PreviewLink`]s writing into one directory.
#[derive(Debug, Clone)]
pub struct PreviewConnector {
    dir: PathBuf,
    counter: Arc<AtomicUsize>,
}

impl PreviewConnector {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            counter: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of images written so far.
    pub fn saved(&self) -> usize {
        self.counter.load(Ordering::SeqCst)
    }
}

impl Connector for PreviewConnector {
    type Link = PreviewLink;

    fn connect(&mut self) -> Result<PreviewLink> {
        std::fs::create_dir_all(&self.dir)?;
        Ok(PreviewLink {
            dir: self.dir.clone(),
            counter: Arc::clone(&self.counter),
        })
    }
}
