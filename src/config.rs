//! # Settings
//!
//! Every option can be given as a flag or through the environment (a `.env`
//! file in the working directory is loaded first by the binary).
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `PAPER_WIDTH_MM` | 80 | Paper roll width |
//! | `PRINTER_DPI` | 203 | Print head resolution |
//! | `SAFE_MARGIN_MM` | 4 | Unprintable strip on each side |
//! | `X_OFFSET_MM` / `Y_OFFSET_MM` | 0 | Content shift |
//! | `MAX_HEIGHT_MM` | unset | Receipt length clamp |
//! | `MAX_MESSAGE_LENGTH` | 300 | Character cap per text field |
//! | `MAX_LINES` | unset | Body line cap |
//! | `IMAGE_SCALE` / `IMAGE_CONTRAST` | 2 / 2.0 | Conversion |
//! | `IMAGE_IMPLS` | unset | Encodings to try, comma separated |
//! | `IMAGE_IMPL` | bitImageRaster | Single encoding when `IMAGE_IMPLS` is unset |
//! | `MEM_THRESHOLD_PERCENT` / `MEM_RESUME_PERCENT` | 80 / 70 | Backpressure |
//! | `PRINTER_DEVICE` | /dev/usb/lp0 | usblp node |
//! | `ERROR_NTFY_TOPIC` | unset | Full URL for error reports |
//!
//! Settings are checked when converted into the domain types, so a bad
//! value fails at startup rather than on the first message.

use std::path::PathBuf;

use clap::Args;

use crate::content::{ClickRules, Limits};
use crate::error::{ReceiptError, Result};
use crate::monitor::Watermarks;
use crate::pipeline::DeliveryOptions;
use crate::printer::{Geometry, PaperConfig};
use crate::protocol::ImageEncoding;
use crate::raster::{Binarize, ConvertOptions};
use crate::render::font::DEFAULT_FONT_DIR;
use crate::render::{FontSet, RenderContext};
use crate::transport::usb::DEFAULT_DEVICE;

#[derive(Args, Debug, Clone)]
pub struct Settings {
    /// Paper width in millimeters
    #[arg(long, env = "PAPER_WIDTH_MM", default_value_t = 80.0)]
    pub paper_width_mm: f32,

    /// Printer resolution in dots per inch
    #[arg(long, env = "PRINTER_DPI", default_value_t = 203)]
    pub printer_dpi: u32,

    /// Unprintable margin on each side, in millimeters
    #[arg(long, env = "SAFE_MARGIN_MM", default_value_t = 4.0)]
    pub safe_margin_mm: f32,

    /// Horizontal content shift in millimeters (negative = left)
    #[arg(long, env = "X_OFFSET_MM", default_value_t = 0.0, allow_negative_numbers = true)]
    pub x_offset_mm: f32,

    /// Vertical content shift in millimeters
    #[arg(long, env = "Y_OFFSET_MM", default_value_t = 0.0, allow_negative_numbers = true)]
    pub y_offset_mm: f32,

    /// Maximum receipt height in millimeters
    #[arg(long, env = "MAX_HEIGHT_MM")]
    pub max_height_mm: Option<f32>,

    /// Character cap for message text
    #[arg(long, env = "MAX_MESSAGE_LENGTH", default_value_t = 300)]
    pub max_message_length: usize,

    /// Cap on wrapped body lines
    #[arg(long, env = "MAX_LINES")]
    pub max_lines: Option<usize>,

    /// Integer upscale applied before conversion
    #[arg(long, env = "IMAGE_SCALE", default_value_t = 2)]
    pub image_scale: u32,

    /// Contrast factor applied before conversion
    #[arg(long, env = "IMAGE_CONTRAST", default_value_t = 2.0)]
    pub image_contrast: f32,

    /// Image encodings to try in order (bitImageRaster, bitImageColumn, graphics)
    #[arg(long, env = "IMAGE_IMPLS")]
    pub image_impls: Option<String>,

    /// Image encoding used when no list is given
    #[arg(long, env = "IMAGE_IMPL", default_value = "bitImageRaster")]
    pub image_impl: String,

    /// 1-bit conversion (floyd-steinberg, threshold)
    #[arg(long, env = "BINARIZE", default_value = "floyd-steinberg")]
    pub binarize: Binarize,

    /// Widest bitmap the printer accepts, in dots
    #[arg(long, env = "DEVICE_MAX_WIDTH")]
    pub device_max_width: Option<u32>,

    /// Memory use (percent) that pauses printing
    #[arg(long, env = "MEM_THRESHOLD_PERCENT", default_value_t = 80.0)]
    pub mem_threshold_percent: f32,

    /// Memory use (percent) that resumes printing
    #[arg(long, env = "MEM_RESUME_PERCENT", default_value_t = 70.0)]
    pub mem_resume_percent: f32,

    /// Printer device node
    #[arg(long, env = "PRINTER_DEVICE", default_value = DEFAULT_DEVICE)]
    pub printer_device: PathBuf,

    /// Directory holding DejaVuSans.ttf and DejaVuSans-Bold.ttf
    #[arg(long, env = "FONT_DIR", default_value = DEFAULT_FONT_DIR)]
    pub font_dir: PathBuf,

    /// Country dialing code for tel:/sms: click targets
    #[arg(long, env = "PHONE_COUNTRY_CODE", default_value = "1")]
    pub phone_country_code: String,

    /// Words that turn a phone number click target into tel:
    #[arg(long, env = "CALL_KEYWORDS", value_delimiter = ',', default_value = "call,phone,dial")]
    pub call_keywords: Vec<String>,

    /// Words that turn a phone number click target into sms:
    #[arg(long, env = "TEXT_KEYWORDS", value_delimiter = ',', default_value = "text,sms,message")]
    pub text_keywords: Vec<String>,

    /// ntfy URL that receives error reports
    #[arg(long, env = "ERROR_NTFY_TOPIC")]
    pub error_ntfy_topic: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log file used in server mode
    #[arg(long, env = "LOG_FILE", default_value = "/var/log/receipt-printer.log")]
    pub log_file: PathBuf,
}

impl Settings {
    pub fn paper(&self) -> PaperConfig {
        PaperConfig {
            paper_width_mm: self.paper_width_mm,
            dpi: self.printer_dpi,
            safe_margin_mm: self.safe_margin_mm,
            x_offset_mm: self.x_offset_mm,
            y_offset_mm: self.y_offset_mm,
            max_height_mm: self.max_height_mm,
        }
    }

    pub fn limits(&self) -> Result<Limits> {
        if self.max_message_length < 4 {
            return Err(ReceiptError::Config(format!(
                "MAX_MESSAGE_LENGTH must be at least 4, got {}",
                self.max_message_length
            )));
        }
        if self.max_lines == Some(0) {
            return Err(ReceiptError::Config("MAX_LINES must be at least 1".to_string()));
        }
        Ok(Limits {
            max_message_len: self.max_message_length,
            max_lines: self.max_lines,
        })
    }

    pub fn click_rules(&self) -> ClickRules {
        let clean = |words: &[String]| -> Vec<String> {
            words
                .iter()
                .map(|w| w.trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect()
        };
        ClickRules {
            country_code: self.phone_country_code.trim().trim_start_matches('+').to_string(),
            call_keywords: clean(&self.call_keywords),
            text_keywords: clean(&self.text_keywords),
        }
    }

    /// `IMAGE_IMPLS` when it names anything, otherwise `IMAGE_IMPL`.
    pub fn encodings(&self) -> Result<Vec<ImageEncoding>> {
        let list = self
            .image_impls
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(self.image_impl.as_str());
        let encodings = ImageEncoding::parse_list(list).map_err(ReceiptError::Config)?;
        if encodings.is_empty() {
            return Err(ReceiptError::Config("no image encoding configured".to_string()));
        }
        Ok(encodings)
    }

    pub fn convert_options(&self) -> Result<ConvertOptions> {
        if !(self.image_contrast >= 0.0) {
            return Err(ReceiptError::Config(format!(
                "IMAGE_CONTRAST must not be negative, got {}",
                self.image_contrast
            )));
        }
        Ok(ConvertOptions {
            scale: self.image_scale.max(1),
            contrast: self.image_contrast,
            max_width: self.device_max_width,
            binarize: self.binarize,
        })
    }

    pub fn delivery(&self) -> Result<DeliveryOptions> {
        Ok(DeliveryOptions {
            encodings: self.encodings()?,
            convert: self.convert_options()?,
            ..DeliveryOptions::default()
        })
    }

    pub fn watermarks(&self) -> Result<Watermarks> {
        Watermarks::new(self.mem_threshold_percent, self.mem_resume_percent)
    }

    /// Resolve geometry and load fonts.
    pub fn render_context(&self) -> Result<RenderContext> {
        Ok(RenderContext {
            geometry: Geometry::resolve(&self.paper())?,
            fonts: FontSet::load(&self.font_dir),
            limits: self.limits()?,
            click: self.click_rules(),
        })
    }
}
