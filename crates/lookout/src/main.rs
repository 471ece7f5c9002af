//! Lookout - Real-Time Detection Overlay Client
//!
//! Streams video frames to a remote detector over gRPC and renders the
//! returned bounding boxes in a window (or headless).
//!
//! Usage:
//!     lookout video.mp4
//!     lookout rtsp://camera/stream --endpoint http://detector:50051

use std::path::PathBuf;

use clap::Parser;
use lookout::{
    Annotator, ClientConfig, ColorMap, DisplaySink, HeadlessDisplay, InferenceClient, JpegEncoder,
    LabelTable, RetryPolicy, Session, SessionConfig, VideoFileSource, DEFAULT_ENDPOINT,
};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// System font locations tried when no `--font` is given.
const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/System/Library/Fonts/Helvetica.ttc",
];

#[derive(Parser, Debug)]
#[command(name = "lookout")]
#[command(about = "Real-time detection overlay client")]
#[command(version)]
struct Args {
    /// Video source: file path or stream URI
    source: String,

    /// Detector gRPC endpoint
    #[arg(long, env = "LOOKOUT_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Class-name file (newline-separated or JSON array); defaults to the
    /// built-in COCO names
    #[arg(long)]
    labels: Option<PathBuf>,

    /// TTF/OTF font for overlay labels; falls back to common system fonts
    #[arg(long)]
    font: Option<PathBuf>,

    /// Run without a window; frames are processed but not presented
    #[arg(long)]
    headless: bool,

    /// JPEG quality for frame transmission (1-100)
    #[arg(long, default_value = "90")]
    jpeg_quality: u8,

    /// Display poll duration per frame, in milliseconds
    #[arg(long, default_value = "30")]
    poll_timeout_ms: u64,

    /// Inference attempts per frame, including the first
    #[arg(long, default_value = "3")]
    max_retries: u32,

    /// Deadline for a single inference call, in seconds
    #[arg(long, default_value = "30")]
    request_timeout_secs: u64,

    /// Log level (debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn load_font(explicit: Option<&PathBuf>) -> Option<ab_glyph::FontVec> {
    let try_load = |path: &std::path::Path| {
        std::fs::read(path)
            .ok()
            .and_then(|bytes| ab_glyph::FontVec::try_from_vec(bytes).ok())
    };

    if let Some(path) = explicit {
        let font = try_load(path);
        if font.is_none() {
            warn!("Could not load font '{}'", path.display());
        }
        return font;
    }

    FONT_CANDIDATES
        .iter()
        .find_map(|candidate| try_load(std::path::Path::new(candidate)))
}

fn open_display(headless: bool) -> Result<Box<dyn DisplaySink>, Box<dyn std::error::Error>> {
    if !headless {
        #[cfg(feature = "display")]
        return Ok(Box::new(lookout::WindowDisplay::open("lookout", 1280, 720)?));

        #[cfg(not(feature = "display"))]
        warn!("Built without the 'display' feature, running headless");
    }

    Ok(Box::new(HeadlessDisplay))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("PANIC: lookout panicked");
        eprintln!(
            "  Location: {}",
            panic_info
                .location()
                .map(|l| l.to_string())
                .unwrap_or_else(|| "unknown".to_string())
        );
        eprintln!(
            "  Message: {}",
            panic_info
                .payload()
                .downcast_ref::<&str>()
                .unwrap_or(&"<no message>")
        );
    }));

    let args = Args::parse();

    let log_level = match args.log_level.as_str() {
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    info!("Starting lookout v{}", env!("CARGO_PKG_VERSION"));
    info!("  Source:   {}", args.source);
    info!("  Detector: {}", args.endpoint);

    let labels = match &args.labels {
        Some(path) => LabelTable::from_file(path)?,
        None => LabelTable::coco(),
    };

    let font = load_font(args.font.as_ref());
    if font.is_none() {
        warn!("No usable font found, drawing box outlines without labels");
    }

    let source = VideoFileSource::open(&args.source)?;
    let display = open_display(args.headless)?;

    let client_config = ClientConfig {
        endpoint: args.endpoint,
        request_timeout: std::time::Duration::from_secs(args.request_timeout_secs),
        retry: RetryPolicy {
            max_attempts: args.max_retries.max(1),
            ..RetryPolicy::default()
        },
    };
    let client = InferenceClient::connect(client_config).await?;

    let session_config = SessionConfig {
        poll_timeout: std::time::Duration::from_millis(args.poll_timeout_ms),
        jpeg_quality: args.jpeg_quality,
    };
    let encoder = JpegEncoder::new(session_config.jpeg_quality);

    let mut session = Session::new(
        source,
        encoder,
        client,
        display,
        Annotator::new(font, labels),
        ColorMap::new(),
        session_config,
    );

    let summary = session.run().await?;

    info!(
        "Session finished ({:?}): {} frames, {} rendered, {} skipped, {} boxes over {} identities",
        summary.exit,
        summary.frames_seen,
        summary.frames_rendered,
        summary.frames_skipped,
        summary.boxes_drawn,
        summary.identities
    );

    Ok(())
}
