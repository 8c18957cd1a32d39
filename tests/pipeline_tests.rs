//! # Delivery Pipeline Tests
//!
//! Drives the retry state machine against a scripted link: each test queues
//! the errors the fake hardware should raise and checks what the pipeline
//! did about them.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ntfy_receipt::error::{ReceiptError, Result};
use ntfy_receipt::pipeline::{
    self, DeliveryOptions, DropReason, Incoming, PauseFlag, Pipeline, PrintJob, PrintOutcome,
};
use ntfy_receipt::printer::{Geometry, PaperConfig};
use ntfy_receipt::protocol::ImageEncoding;
use ntfy_receipt::raster::Bitmap;
use ntfy_receipt::render::canvas::BLACK;
use ntfy_receipt::render::{Canvas, FontSet, RenderContext};
use ntfy_receipt::transport::{Connector, Link, LinkState, PreviewConnector};
use pretty_assertions::assert_eq;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

// ============================================================================
// SCRIPTED HARDWARE
// ============================================================================

#[derive(Default)]
struct Script {
    connects: usize,
    refuse_connect: bool,
    /// Popped per `send_image`; empty means success
    image_results: VecDeque<Result<()>>,
    cut_results: VecDeque<Result<()>>,
    /// Every call the pipeline made, in order
    calls: Vec<String>,
}

type Shared = Arc<Mutex<Script>>;

struct FakeConnector(Shared);

struct FakeLink(Shared);

impl Connector for FakeConnector {
    type Link = FakeLink;

    fn connect(&mut self) -> Result<FakeLink> {
        let mut script = self.0.lock().unwrap();
        script.connects += 1;
        if script.refuse_connect {
            return Err(ReceiptError::DeviceUnavailable("/dev/usb/lp0: No such device".to_string()));
        }
        Ok(FakeLink(Arc::clone(&self.0)))
    }
}

impl Link for FakeLink {
    fn is_ready(&self) -> bool {
        true
    }

    fn initialize(&mut self) -> Result<()> {
        self.0.lock().unwrap().calls.push("init".to_string());
        Ok(())
    }

    fn send_image(&mut self, _bitmap: &Bitmap, encoding: ImageEncoding) -> Result<()> {
        let mut script = self.0.lock().unwrap();
        script.calls.push(format!("image:{}", encoding));
        script.image_results.pop_front().unwrap_or(Ok(()))
    }

    fn send_text(&mut self, text: &str) -> Result<()> {
        self.0.lock().unwrap().calls.push(format!("text:{:?}", text));
        Ok(())
    }

    fn cut(&mut self) -> Result<()> {
        let mut script = self.0.lock().unwrap();
        script.calls.push("cut".to_string());
        script.cut_results.pop_front().unwrap_or(Ok(()))
    }
}

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn gone() -> Result<()> {
    Err(ReceiptError::DeviceUnavailable("write: No such device".to_string()))
}

fn rejected() -> Result<()> {
    Err(ReceiptError::Encoding("image too large".to_string()))
}

fn job() -> PrintJob {
    let mut canvas = Canvas::new(64, 16);
    canvas.fill_rect(8, 4, 24, 12, BLACK);
    PrintJob::new(canvas, "Lunch Time!")
}

fn pipeline_with(
    script: Script,
    options: DeliveryOptions,
) -> (Pipeline<FakeConnector>, Shared, Arc<Mutex<Vec<Duration>>>, PauseFlag) {
    let shared = Arc::new(Mutex::new(script));
    let sleeps = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&sleeps);
    let pause = PauseFlag::new();
    let pipeline = Pipeline::new(FakeConnector(Arc::clone(&shared)), pause.clone(), options)
        .with_sleeper(Box::new(move |d| recorder.lock().unwrap().push(d)));
    (pipeline, shared, sleeps, pause)
}

fn scripted(script: Script) -> (Pipeline<FakeConnector>, Shared, Arc<Mutex<Vec<Duration>>>, PauseFlag) {
    pipeline_with(script, DeliveryOptions::default())
}

// ========== Happy Path ==========

#[test]
fn test_prints_then_feeds_and_cuts() {
    let (mut pipeline, shared, sleeps, _) = scripted(Script::default());

    let outcome = pipeline.deliver(&job());

    assert_eq!(
        outcome,
        PrintOutcome::Printed {
            encoding: Some(ImageEncoding::BitImageRaster),
            attempts: 1
        }
    );
    let script = shared.lock().unwrap();
    assert_eq!(script.connects, 1);
    assert_eq!(
        script.calls,
        vec!["init", "image:bitImageRaster", "text:\"\\n\\n\\n\\n\"", "cut"]
    );
    assert!(sleeps.lock().unwrap().is_empty());
    assert_eq!(pipeline.state(), LinkState::Connected);
}

#[test]
fn test_link_reused_between_jobs() {
    let (mut pipeline, shared, _, _) = scripted(Script::default());

    assert!(pipeline.deliver(&job()).is_printed());
    assert!(pipeline.deliver(&job()).is_printed());

    assert_eq!(shared.lock().unwrap().connects, 1);
}

// ========== Retry And Backoff ==========

#[test]
fn test_three_transient_failures_exhaust_attempts() {
    let script = Script {
        image_results: VecDeque::from(vec![gone(), gone(), gone()]),
        ..Script::default()
    };
    let (mut pipeline, shared, sleeps, _) = scripted(script);

    let outcome = pipeline.deliver(&job());

    match outcome {
        PrintOutcome::Failed { attempts, error } => {
            assert_eq!(attempts, 3);
            assert!(error.contains("No such device"));
        }
        other => panic!("expected failure, got {:?}", other),
    }
    assert_eq!(
        *sleeps.lock().unwrap(),
        vec![Duration::from_secs(1), Duration::from_secs(2)]
    );
    // initial open, two retries, one reset after giving up
    assert_eq!(shared.lock().unwrap().connects, 4);
}

#[test]
fn test_transient_failure_then_success() {
    let script = Script {
        image_results: VecDeque::from(vec![gone()]),
        ..Script::default()
    };
    let (mut pipeline, shared, sleeps, _) = scripted(script);

    let outcome = pipeline.deliver(&job());

    assert_eq!(
        outcome,
        PrintOutcome::Printed {
            encoding: Some(ImageEncoding::BitImageRaster),
            attempts: 2
        }
    );
    assert_eq!(*sleeps.lock().unwrap(), vec![Duration::from_secs(1)]);
    let script = shared.lock().unwrap();
    assert_eq!(script.connects, 2);
    // printer re-initialized on the second attempt
    assert_eq!(script.calls.iter().filter(|c| *c == "init").count(), 2);
}

#[test]
fn test_cut_failure_is_retried() {
    let script = Script {
        cut_results: VecDeque::from(vec![gone()]),
        ..Script::default()
    };
    let (mut pipeline, _, sleeps, _) = scripted(script);

    let outcome = pipeline.deliver(&job());

    assert!(matches!(outcome, PrintOutcome::Printed { attempts: 2, .. }));
    assert_eq!(sleeps.lock().unwrap().len(), 1);
}

#[test]
fn test_non_transient_failure_is_not_retried() {
    let script = Script {
        cut_results: VecDeque::from(vec![Err(ReceiptError::Transport("paper jam".to_string()))]),
        ..Script::default()
    };
    let (mut pipeline, shared, sleeps, _) = scripted(script);

    let outcome = pipeline.deliver(&job());

    assert!(matches!(outcome, PrintOutcome::Failed { attempts: 1, .. }));
    assert!(sleeps.lock().unwrap().is_empty());
    assert_eq!(shared.lock().unwrap().connects, 2);
}

#[test]
fn test_custom_attempts_and_delay() {
    let script = Script {
        image_results: VecDeque::from(vec![gone(), gone(), gone(), gone(), gone()]),
        ..Script::default()
    };
    let options = DeliveryOptions {
        max_attempts: 5,
        base_delay: Duration::from_millis(100),
        ..DeliveryOptions::default()
    };
    let (mut pipeline, _, sleeps, _) = pipeline_with(script, options);

    let outcome = pipeline.deliver(&job());

    assert!(matches!(outcome, PrintOutcome::Failed { attempts: 5, .. }));
    assert_eq!(
        *sleeps.lock().unwrap(),
        vec![
            Duration::from_millis(100),
            Duration::from_millis(200),
            Duration::from_millis(400),
            Duration::from_millis(800),
        ]
    );
}

// ========== Encoding Fallback ==========

#[test]
fn test_rejected_encoding_falls_back_to_next() {
    let script = Script {
        image_results: VecDeque::from(vec![rejected()]),
        ..Script::default()
    };
    let options = DeliveryOptions {
        encodings: vec![ImageEncoding::Graphics, ImageEncoding::BitImageColumn],
        ..DeliveryOptions::default()
    };
    let (mut pipeline, shared, sleeps, _) = pipeline_with(script, options);

    let outcome = pipeline.deliver(&job());

    assert_eq!(
        outcome,
        PrintOutcome::Printed {
            encoding: Some(ImageEncoding::BitImageColumn),
            attempts: 1
        }
    );
    assert!(sleeps.lock().unwrap().is_empty());
    let calls = shared.lock().unwrap().calls.clone();
    assert_eq!(&calls[1..3], &["image:graphics", "image:bitImageColumn"]);
}

#[test]
fn test_all_encodings_rejected_still_feeds_and_cuts() {
    let script = Script {
        image_results: VecDeque::from(vec![rejected(), rejected()]),
        ..Script::default()
    };
    let options = DeliveryOptions {
        encodings: vec![ImageEncoding::BitImageRaster, ImageEncoding::Graphics],
        ..DeliveryOptions::default()
    };
    let (mut pipeline, shared, _, _) = pipeline_with(script, options);

    let outcome = pipeline.deliver(&job());

    assert_eq!(
        outcome,
        PrintOutcome::Printed {
            encoding: None,
            attempts: 1
        }
    );
    let script = shared.lock().unwrap();
    assert_eq!(script.calls.last().map(String::as_str), Some("cut"));
}

#[test]
fn test_vanished_device_mid_fallback_aborts_attempt() {
    let script = Script {
        image_results: VecDeque::from(vec![rejected(), gone()]),
        ..Script::default()
    };
    let options = DeliveryOptions {
        encodings: vec![ImageEncoding::BitImageRaster, ImageEncoding::Graphics],
        ..DeliveryOptions::default()
    };
    let (mut pipeline, _, sleeps, _) = pipeline_with(script, options);

    let outcome = pipeline.deliver(&job());

    // second attempt starts over from the first encoding
    assert_eq!(
        outcome,
        PrintOutcome::Printed {
            encoding: Some(ImageEncoding::BitImageRaster),
            attempts: 2
        }
    );
    assert_eq!(sleeps.lock().unwrap().len(), 1);
}

// ========== Dropped Jobs ==========

#[test]
fn test_paused_job_is_dropped() {
    let (mut pipeline, shared, _, pause) = scripted(Script::default());
    pause.set(true);

    assert_eq!(pipeline.deliver(&job()), PrintOutcome::Dropped(DropReason::Paused));
    let script = shared.lock().unwrap();
    assert_eq!(script.connects, 0);
    assert!(script.calls.is_empty());
}

#[test]
fn test_paused_state_reported_while_connected() {
    let (mut pipeline, _, _, pause) = scripted(Script::default());
    assert_eq!(pipeline.state(), LinkState::Disconnected);

    pipeline.connect();
    pause.set(true);
    assert_eq!(pipeline.state(), LinkState::Paused);

    pause.set(false);
    assert_eq!(pipeline.state(), LinkState::Connected);
}

#[test]
fn test_unreachable_printer_drops_job() {
    let script = Script {
        refuse_connect: true,
        ..Script::default()
    };
    let (mut pipeline, shared, sleeps, _) = scripted(script);

    assert_eq!(pipeline.deliver(&job()), PrintOutcome::Dropped(DropReason::NoLink));
    assert_eq!(shared.lock().unwrap().connects, 1);
    assert!(sleeps.lock().unwrap().is_empty());
}

// ========== Print Worker ==========

#[tokio::test]
async fn test_worker_prints_queued_messages_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let connector = PreviewConnector::new(dir.path().join("previews"));
    let observer = connector.clone();

    let ctx = Arc::new(RenderContext {
        geometry: Geometry::resolve(&PaperConfig::default()).unwrap(),
        fonts: FontSet::builtin(),
        limits: Default::default(),
        click: Default::default(),
    });
    let pipeline = Pipeline::new(connector, PauseFlag::new(), DeliveryOptions::default());
    let (tx, rx) = mpsc::channel(8);

    for text in ["Lunch Time!", "Meeting in 5"] {
        tx.send(Incoming {
            message: text.to_string(),
            metadata: None,
        })
        .await
        .unwrap();
    }
    drop(tx);

    pipeline::run_worker(pipeline, ctx, rx, None, CancellationToken::new()).await;

    assert_eq!(observer.saved(), 2);
    assert!(dir.path().join("previews/preview_1.png").exists());
    assert!(dir.path().join("previews/preview_2.png").exists());
}

#[tokio::test]
async fn test_worker_stops_on_cancel() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = Arc::new(RenderContext {
        geometry: Geometry::resolve(&PaperConfig::default()).unwrap(),
        fonts: FontSet::builtin(),
        limits: Default::default(),
        click: Default::default(),
    });
    let pipeline = Pipeline::new(
        PreviewConnector::new(dir.path()),
        PauseFlag::new(),
        DeliveryOptions::default(),
    );
    let (_tx, rx) = mpsc::channel::<Incoming>(1);
    let cancel = CancellationToken::new();
    cancel.cancel();

    tokio::time::timeout(
        Duration::from_secs(5),
        pipeline::run_worker(pipeline, ctx, rx, None, cancel),
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn test_worker_drops_messages_while_paused() {
    let shared = Arc::new(Mutex::new(Script::default()));
    let pause = PauseFlag::new();
    pause.set(true);
    let pipeline = Pipeline::new(
        FakeConnector(Arc::clone(&shared)),
        pause.clone(),
        DeliveryOptions::default(),
    );
    let ctx = Arc::new(RenderContext {
        geometry: Geometry::resolve(&PaperConfig::default()).unwrap(),
        fonts: FontSet::builtin(),
        limits: Default::default(),
        click: Default::default(),
    });
    let (tx, rx) = mpsc::channel(8);

    for text in ["Lunch Time!", "Meeting in 5"] {
        tx.send(Incoming {
            message: text.to_string(),
            metadata: None,
        })
        .await
        .unwrap();
    }
    drop(tx);

    pipeline::run_worker(pipeline, ctx, rx, None, CancellationToken::new()).await;

    let script = shared.lock().unwrap();
    assert_eq!(script.connects, 0);
    assert!(script.calls.is_empty());
    assert!(pause.is_paused());
}
