//! # ntfy-receipt CLI
//!
//! Prints ntfy notifications on a thermal receipt printer.
//!
//! ## Usage
//!
//! ```bash
//! # Listen to a topic and print every message
//! ntfy-receipt listen --host https://ntfy.sh --topic office-printer
//!
//! # Run as a service: also log to LOG_FILE
//! ntfy-receipt listen --server
//!
//! # Listen without hardware, writing preview_<n>.png files
//! ntfy-receipt listen --preview-dir ./previews
//!
//! # Render one message to a PNG
//! ntfy-receipt preview "Lunch Time!" --file lunch.png
//!
//! # Render a built-in sample
//! ntfy-receipt example kanban
//!
//! # Print the alignment test page
//! ntfy-receipt test-align
//! ```
//!
//! All settings also come from the environment; see [`ntfy_receipt::config`].

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use chrono::Local;
use clap::{Parser, Subcommand, ValueEnum};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use ntfy_receipt::{
    ReceiptError,
    config::Settings,
    logging,
    monitor::{MemoryMonitor, SystemMemory},
    notify::ErrorNotifier,
    pipeline::{self, PauseFlag, Pipeline, PrintJob},
    raster,
    render::{RenderContext, align::render_alignment_test, dispatch},
    source::{self, NtfySource},
    transport::{Connector, PreviewConnector, UsbConnector, preview::save_png},
};

/// Messages waiting for the print worker
const QUEUE_DEPTH: usize = 64;

/// ntfy-receipt - Print ntfy notifications on thermal paper
#[derive(Parser, Debug)]
#[command(name = "ntfy-receipt")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Subscribe to an ntfy topic and print incoming messages
    Listen {
        /// ntfy host, including scheme
        #[arg(long, env = "NTFY_HOST")]
        host: Option<String>,

        /// ntfy topic name
        #[arg(long, env = "NTFY_TOPIC")]
        topic: Option<String>,

        /// Service mode: also write logs to LOG_FILE
        #[arg(long)]
        server: bool,

        /// Write previews into this directory instead of printing
        #[arg(long, value_name = "DIR")]
        preview_dir: Option<PathBuf>,
    },

    /// Render one message to a PNG file
    Preview {
        /// Message text or JSON payload
        message: String,

        /// Output file
        #[arg(long, default_value = "preview.png")]
        file: PathBuf,
    },

    /// Render a built-in sample message to a PNG file
    Example {
        kind: ExampleKind,

        /// Output file
        #[arg(long, default_value = "example.png")]
        file: PathBuf,
    },

    /// Print the alignment test page
    TestAlign {
        /// Save to a PNG file instead of printing
        #[arg(long, value_name = "FILE")]
        file: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ExampleKind {
    Text,
    Kanban,
}

impl ExampleKind {
    fn message(self) -> String {
        match self {
            Self::Text => "Lunch Time! 🍕🍔".to_string(),
            Self::Kanban => serde_json::json!({
                "type": "monday_task",
                "task": "Design Homepage",
                "priority": "high",
                "status": "in_progress",
                "assignee": "JD",
                "due_date": "2026-02-15",
                "id": "M123",
                "qr_url": "https://monday.com/boards/123"
            })
            .to_string(),
        }
    }
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Returns the exit code; the log guard is dropped before the process exits.
fn run() -> Result<ExitCode, ReceiptError> {
    let cli = Cli::parse();
    let settings = cli.settings;

    let server = matches!(cli.command, Commands::Listen { server: true, .. });
    let log_file = server.then_some(settings.log_file.as_path());
    let _guard = logging::init(&settings.log_level, log_file)?;

    match cli.command {
        Commands::Listen {
            host,
            topic,
            server: _,
            preview_dir,
        } => {
            let (Some(host), Some(topic)) = (host, topic) else {
                error!("NTFY host/topic not provided. Set NTFY_HOST and NTFY_TOPIC in environment or pass --host/--topic.");
                return Ok(ExitCode::from(2));
            };
            let url = source::stream_url(&host, &topic);

            let runtime = tokio::runtime::Runtime::new()?;
            match preview_dir {
                Some(dir) => runtime.block_on(listen(&settings, url, PreviewConnector::new(dir), false))?,
                None => {
                    let connector = UsbConnector::new(&settings.printer_device);
                    runtime.block_on(listen(&settings, url, connector, true))?
                }
            }
        }
        Commands::Preview { message, file } => render_to_png(&settings, &message, &file)?,
        Commands::Example { kind, file } => {
            let message = kind.message();
            println!("Example {:?} message:\n{}", kind, message);
            render_to_png(&settings, &message, &file)?
        }
        Commands::TestAlign { file } => test_align(&settings, file.as_deref())?,
    }

    Ok(ExitCode::SUCCESS)
}

/// Run the stream consumer, print worker and memory monitor until Ctrl+C.
async fn listen<C>(settings: &Settings, url: String, connector: C, monitor: bool) -> Result<(), ReceiptError>
where
    C: Connector + 'static,
    C::Link: 'static,
{
    let ctx = Arc::new(settings.render_context()?);
    if !ctx.fonts.has_outline() {
        warn!(dir = %settings.font_dir.display(), "TTF fonts not found, using built-in bitmap font");
    }

    let notifier = match &settings.error_ntfy_topic {
        Some(url) => {
            let notifier = ErrorNotifier::new(url.as_str())?;
            info!("Error notifications enabled: {}", notifier.url());
            Some(Arc::new(notifier))
        }
        None => None,
    };

    let pause = PauseFlag::new();
    let mut pipeline = Pipeline::new(connector, pause.clone(), settings.delivery()?);
    let watermarks = settings.watermarks()?;
    pipeline = tokio::task::spawn_blocking(move || {
        pipeline.connect();
        pipeline
    })
    .await
    .map_err(|e| ReceiptError::Transport(format!("Connect task failed: {}", e)))?;

    let cancel = CancellationToken::new();
    let (tx, rx) = mpsc::channel(QUEUE_DEPTH);

    let worker = tokio::spawn(pipeline::run_worker(
        pipeline,
        ctx,
        rx,
        notifier.clone(),
        cancel.clone(),
    ));

    if monitor {
        let monitor = MemoryMonitor::new(SystemMemory::new(), pause, watermarks);
        tokio::spawn(monitor.run(cancel.clone()));
    }

    let stream = NtfySource::new(url, notifier)?;
    let consumer = tokio::spawn(stream.run(tx, cancel.clone()));

    shutdown_signal().await;
    info!("Shutdown signal received");
    cancel.cancel();

    if let Err(e) = consumer.await {
        error!(error = %e, "Stream consumer task failed");
    }
    if let Err(e) = worker.await {
        error!(error = %e, "Print worker task failed");
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Render and convert one message, then save it as a PNG.
fn render_to_png(settings: &Settings, message: &str, file: &Path) -> Result<(), ReceiptError> {
    let ctx = settings.render_context()?;
    let rendered = dispatch(message, None, &ctx, Local::now().naive_local());
    let bitmap = raster::convert(rendered.canvas.image(), &settings.convert_options()?);
    save_png(file, &bitmap)?;

    let geometry = &ctx.geometry;
    println!("Rendered {} layout", rendered.variant.as_str());
    println!("   Resolution: {}x{}px", bitmap.width, bitmap.height);
    println!(
        "   Paper: {}mm ({}px @ {} DPI)",
        settings.paper_width_mm, geometry.full_width, geometry.dpi
    );
    println!(
        "   Printable: {}mm ({}px)",
        settings.paper_width_mm - 2.0 * settings.safe_margin_mm,
        geometry.printable_width
    );
    println!("Saved to {}", file.display());
    Ok(())
}

fn test_align(settings: &Settings, file: Option<&Path>) -> Result<(), ReceiptError> {
    let ctx: RenderContext = settings.render_context()?;
    let canvas = render_alignment_test(&settings.paper(), &ctx);

    if let Some(path) = file {
        let bitmap = raster::convert(canvas.image(), &settings.convert_options()?);
        save_png(path, &bitmap)?;
        println!("Saved to {}", path.display());
        return Ok(());
    }

    let mut pipeline = Pipeline::new(
        UsbConnector::new(&settings.printer_device),
        PauseFlag::new(),
        settings.delivery()?,
    );
    let outcome = pipeline.deliver(&PrintJob::new(canvas, "ALIGNMENT TEST"));
    if !outcome.is_printed() {
        return Err(ReceiptError::Transport(format!("Alignment test not printed: {:?}", outcome)));
    }

    println!("Alignment test printed!");
    println!("- If the center line is off, adjust X_OFFSET_MM (negative=left, positive=right)");
    println!("- If the right edge is cut off, increase SAFE_MARGIN_MM");
    Ok(())
}
