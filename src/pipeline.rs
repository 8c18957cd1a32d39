//! # Print Delivery
//!
//! Moves a rendered canvas onto paper over a link that may vanish at any
//! moment (USB unplug, printer power cycle).
//!
//! ## Stages
//!
//! ```text
//! CheckPaused ──paused──► Dropped(Paused)
//!     │
//! EnsureConnected ──no link──► Dropped(NoLink)
//!     │                ▲
//! Convert (once)       │ transient, attempts left:
//!     │                │ sleep, double delay, reconnect
//! Transmit ───error────┤
//!     │                │ otherwise: reconnect, Failed
//! Finalize ───error────┘
//!     │
//! Printed
//! ```
//!
//! Transmit tries each configured [`ImageEncoding`] in order. An encoding
//! the printer rejects moves on to the next one; a vanished device aborts
//! the attempt. When every encoding fails the feed and cut still run.
//!
//! Backoff starts at `base_delay` and doubles. Sleeps happen only between
//! attempts, so three failed attempts sleep twice.

use std::sync::{Arc, Mutex, PoisonError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Local;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{ReceiptError, Result};
use crate::notify::ErrorNotifier;
use crate::protocol::ImageEncoding;
use crate::raster::{self, Bitmap, ConvertOptions};
use crate::render::{Canvas, RenderContext, dispatch};
use crate::transport::{Connector, Link, LinkState};

/// Lines fed before the cut so the last row clears the cutter
const FEED_BEFORE_CUT: &str = "\n\n\n\n";

/// Characters of the source message kept for log lines
const EXCERPT_CHARS: usize = 50;

/// Shared "stop accepting jobs" switch flipped by the memory monitor.
#[derive(Debug, Clone, Default)]
pub struct PauseFlag(Arc<AtomicBool>);

impl PauseFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_paused(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn set(&self, paused: bool) {
        self.0.store(paused, Ordering::SeqCst);
    }
}

/// A rendered canvas waiting to be printed.
#[derive(Debug, Clone)]
pub struct PrintJob {
    pub canvas: Canvas,
    /// Start of the source message, for logs
    pub excerpt: String,
}

impl PrintJob {
    pub fn new(canvas: Canvas, source: &str) -> Self {
        Self {
            canvas,
            excerpt: source.chars().take(EXCERPT_CHARS).collect(),
        }
    }
}

/// Retry and encoding settings.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryOptions {
    pub max_attempts: u32,
    /// First backoff sleep; doubles after every transient failure
    pub base_delay: Duration,
    /// Image encodings in the order they are tried
    pub encodings: Vec<ImageEncoding>,
    pub convert: ConvertOptions,
}

impl Default for DeliveryOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            encodings: vec![ImageEncoding::BitImageRaster],
            convert: ConvertOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Memory pressure paused printing
    Paused,
    /// No printer could be opened
    NoLink,
}

/// How a job ended.
#[derive(Debug, Clone, PartialEq)]
pub enum PrintOutcome {
    /// Fed and cut. `encoding` is `None` when every image encoding failed.
    Printed {
        encoding: Option<ImageEncoding>,
        attempts: u32,
    },
    Dropped(DropReason),
    Failed { attempts: u32, error: String },
}

impl PrintOutcome {
    pub fn is_printed(&self) -> bool {
        matches!(self, Self::Printed { .. })
    }
}

/// Blocking sleep used for backoff. Tests swap in a recorder.
pub type Sleeper = Box<dyn FnMut(Duration) + Send>;

enum Stage {
    CheckPaused,
    EnsureConnected,
    Convert,
    Transmit,
    Finalize(Option<ImageEncoding>),
    Retry(ReceiptError),
}

/// Owns the hardware link and runs jobs through the delivery stages.
pub struct Pipeline<C: Connector> {
    connector: C,
    link: Option<C::Link>,
    pause: PauseFlag,
    options: DeliveryOptions,
    sleeper: Sleeper,
}

impl<C: Connector> Pipeline<C> {
    pub fn new(connector: C, pause: PauseFlag, options: DeliveryOptions) -> Self {
        Self {
            connector,
            link: None,
            pause,
            options,
            sleeper: Box::new(std::thread::sleep),
        }
    }

    /// Replace the backoff sleep.
    pub fn with_sleeper(mut self, sleeper: Sleeper) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// The flag `deliver` consults before touching the printer.
    pub fn pause_flag(&self) -> &PauseFlag {
        &self.pause
    }

    pub fn state(&self) -> LinkState {
        match (&self.link, self.pause.is_paused()) {
            (None, _) => LinkState::Disconnected,
            (Some(_), true) => LinkState::Paused,
            (Some(_), false) => LinkState::Connected,
        }
    }

    /// Open the link ahead of the first job. Failure is only logged.
    pub fn connect(&mut self) {
        self.reconnect();
    }

    /// Print one job.
    #[instrument(skip_all, fields(job = %job.excerpt))]
    pub fn deliver(&mut self, job: &PrintJob) -> PrintOutcome {
        let max_attempts = self.options.max_attempts.max(1);
        let mut attempt = 1;
        let mut delay = self.options.base_delay;
        let mut bitmap: Option<Bitmap> = None;
        let mut stage = Stage::CheckPaused;

        loop {
            stage = match stage {
                Stage::CheckPaused => {
                    if self.pause.is_paused() {
                        warn!("Printer paused due to high memory, dropping message");
                        return PrintOutcome::Dropped(DropReason::Paused);
                    }
                    Stage::EnsureConnected
                }
                Stage::EnsureConnected => {
                    if !self.link.as_ref().is_some_and(|l| l.is_ready()) {
                        self.reconnect();
                    }
                    if self.link.is_none() {
                        warn!("No printer connected, skipping print");
                        return PrintOutcome::Dropped(DropReason::NoLink);
                    }
                    Stage::Convert
                }
                Stage::Convert => {
                    if bitmap.is_none() {
                        let converted = raster::convert(job.canvas.image(), &self.options.convert);
                        debug!(width = converted.width, height = converted.height, "Converted canvas");
                        bitmap = Some(converted);
                    }
                    Stage::Transmit
                }
                Stage::Transmit => match bitmap.as_ref() {
                    Some(bitmap) => match self.transmit(bitmap) {
                        Ok(encoding) => Stage::Finalize(encoding),
                        Err(e) => Stage::Retry(e),
                    },
                    None => Stage::Convert,
                },
                Stage::Finalize(encoding) => match self.finalize() {
                    Ok(()) => {
                        info!(attempts = attempt, "Printed");
                        return PrintOutcome::Printed {
                            encoding,
                            attempts: attempt,
                        };
                    }
                    Err(e) => Stage::Retry(e),
                },
                Stage::Retry(err) => {
                    if err.is_transient() && attempt < max_attempts {
                        warn!(
                            "USB error on attempt {}/{}: {} - retrying after {:.1}s",
                            attempt,
                            max_attempts,
                            err,
                            delay.as_secs_f32()
                        );
                        (self.sleeper)(delay);
                        delay *= 2;
                        attempt += 1;
                        self.reconnect();
                        Stage::EnsureConnected
                    } else {
                        error!("Printing error (attempt {}/{}): {}", attempt, max_attempts, err);
                        self.reconnect();
                        return PrintOutcome::Failed {
                            attempts: attempt,
                            error: err.to_string(),
                        };
                    }
                }
            };
        }
    }

    /// Initialize, then try each encoding until one is accepted.
    fn transmit(&mut self, bitmap: &Bitmap) -> Result<Option<ImageEncoding>> {
        let link = self
            .link
            .as_mut()
            .ok_or_else(|| ReceiptError::DeviceUnavailable("link closed".to_string()))?;

        link.initialize()?;

        for &encoding in &self.options.encodings {
            match link.send_image(bitmap, encoding) {
                Ok(()) => return Ok(Some(encoding)),
                Err(e) if e.is_transient() => return Err(e),
                Err(e) => warn!(%encoding, error = %e, "Image print failed"),
            }
        }

        error!("All image implementations failed. Try IMAGE_IMPLS=bitImageColumn,bitImageRaster,graphics");
        Ok(None)
    }

    fn finalize(&mut self) -> Result<()> {
        let link = self
            .link
            .as_mut()
            .ok_or_else(|| ReceiptError::DeviceUnavailable("link closed".to_string()))?;
        link.send_text(FEED_BEFORE_CUT)?;
        link.cut()
    }

    /// Drop the current link and try to open a fresh one.
    fn reconnect(&mut self) {
        self.link = None;
        match self.connector.connect() {
            Ok(link) => self.link = Some(link),
            Err(e) => warn!(error = %e, "Printer connection failed"),
        }
    }
}

/// One message from the notification stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Incoming {
    pub message: String,
    /// Transport envelope (title, tags, priority, click)
    pub metadata: Option<Map<String, Value>>,
}

/// Render and print messages one at a time, in arrival order.
///
/// Each job runs on the blocking pool while the async side waits for it, so
/// jobs never overlap. Messages arriving while printing is paused are dropped
/// before they are rendered. Stops when the channel closes or `cancel` fires;
/// the job in flight always completes first. Failed jobs are reported through
/// `notifier` when one is configured.
pub async fn run_worker<C>(
    pipeline: Pipeline<C>,
    ctx: Arc<RenderContext>,
    mut rx: mpsc::Receiver<Incoming>,
    notifier: Option<Arc<ErrorNotifier>>,
    cancel: CancellationToken,
) where
    C: Connector + 'static,
    C::Link: 'static,
{
    let pause = pipeline.pause_flag().clone();
    let pipeline = Arc::new(Mutex::new(pipeline));

    loop {
        let incoming = tokio::select! {
            _ = cancel.cancelled() => break,
            next = rx.recv() => match next {
                Some(incoming) => incoming,
                None => break,
            },
        };

        if pause.is_paused() {
            warn!("Printer paused due to high memory, dropping message");
            continue;
        }

        let ctx = Arc::clone(&ctx);
        let pipeline = Arc::clone(&pipeline);
        let handle = tokio::task::spawn_blocking(move || {
            let now = Local::now().naive_local();
            let rendered = dispatch(&incoming.message, incoming.metadata.as_ref(), &ctx, now);
            debug!(variant = rendered.variant.as_str(), "Rendered message");
            let job = PrintJob::new(rendered.canvas, &incoming.message);
            let mut pipeline = pipeline.lock().unwrap_or_else(PoisonError::into_inner);
            pipeline.deliver(&job)
        });

        let failure = match handle.await {
            Ok(PrintOutcome::Failed { error, .. }) => Some(error),
            Ok(outcome) => {
                debug!(?outcome, "Job finished");
                None
            }
            Err(e) => {
                error!(error = %e, "Print job panicked");
                Some(e.to_string())
            }
        };

        if let (Some(error), Some(notifier)) = (failure, &notifier) {
            notifier
                .notify("Printer Error", &format!("Failed to print message: {}", error))
                .await;
        }
    }

    info!("Print worker stopped");
}
