//! Camera Session Demo CLI
//!
//! Drives a capture session against the mock camera backend: opens the
//! camera, attaches a virtual surface, takes a series of pictures and writes
//! the finished stills to disk.

use camera_session::{
    device::{MockBackend, MockSurface},
    geometry::{AspectMode, Rotation},
    metrics::MetricsRegistry,
    session::{CameraSession, FileConfig},
};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Virtual surface size: a portrait phone screen.
const SURFACE_WIDTH: u32 = 1080;
const SURFACE_HEIGHT: u32 = 1920;

/// Failed or ignored captures in a row before the demo gives up.
const MAX_CONSECUTIVE_FAILURES: u32 = 5;

/// Tracks progress towards the requested number of pictures.
#[derive(Debug, Default)]
struct CaptureBudget {
    /// Pictures to save, 0 for no limit.
    target: u32,
    saved: u32,
    attempts: u32,
    consecutive_failures: u32,
}

impl CaptureBudget {
    fn new(target: u32) -> Self {
        Self {
            target,
            ..Self::default()
        }
    }

    /// Starts an attempt and returns its number.
    fn begin(&mut self) -> u32 {
        self.attempts += 1;
        self.attempts
    }

    /// Records a saved picture and returns its sequence number.
    fn saved(&mut self) -> u32 {
        self.saved += 1;
        self.consecutive_failures = 0;
        self.saved
    }

    fn failed(&mut self) {
        self.consecutive_failures += 1;
    }

    fn target_reached(&self) -> bool {
        self.target != 0 && self.saved >= self.target
    }

    fn gave_up(&self) -> bool {
        self.consecutive_failures >= MAX_CONSECUTIVE_FAILURES
    }

    fn is_done(&self) -> bool {
        self.target_reached() || self.gave_up()
    }
}

#[derive(Parser, Debug)]
#[command(name = "camera-session", version, about = "Capture session demo on a mock camera")]
struct Args {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Aspect ratio to request ("auto", "4:3", "16:9", ...). Repeat for fallbacks.
    #[arg(short, long = "aspect", value_name = "RATIO")]
    aspects: Vec<AspectMode>,

    /// Use the front camera.
    #[arg(long)]
    front: bool,

    /// Number of pictures to take, 0 to run until Ctrl-C.
    #[arg(short = 'n', long)]
    count: Option<u32>,

    /// Delay between pictures in milliseconds.
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Directory finished pictures are written to.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Simulated screen rotation in degrees.
    #[arg(long, default_value = "0", value_parser = parse_rotation)]
    display_rotation: Rotation,
}

fn parse_rotation(value: &str) -> Result<Rotation, String> {
    let degrees: u32 = value.parse().map_err(|e| format!("{e}"))?;
    Rotation::try_from(degrees)
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Camera Session v{}", camera_session::VERSION);

    let args = Args::parse();
    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => FileConfig::from_file(path)?,
        None => FileConfig::default(),
    };
    if !args.aspects.is_empty() {
        config.session.aspect_ratios = args.aspects.clone();
    }
    if args.front {
        config.session.use_front_camera = true;
    }
    if let Some(count) = args.count {
        config.output.count = count;
    }
    if let Some(interval_ms) = args.interval_ms {
        config.output.interval_ms = interval_ms;
    }
    if let Some(output) = &args.output {
        config.output.directory = output.clone();
    }
    config.session.validate()?;

    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    ctrlc::set_handler(move || {
        flag.store(false, Ordering::SeqCst);
    })?;

    // The current-thread runtime is the session's control context.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(capture_loop(config, &args, running))
}

async fn capture_loop(
    config: FileConfig,
    args: &Args,
    running: Arc<AtomicBool>,
) -> Result<(), Box<dyn std::error::Error>> {
    let backend = MockBackend::new();
    backend.probe().set_display_rotation(args.display_rotation);

    let executor = Arc::new(tokio::runtime::Handle::current());
    let mut session = CameraSession::new(backend, config.session.clone(), executor)?;

    let settings = *session.open()?;
    info!(
        camera = settings.identity.index,
        facing = %settings.identity.facing,
        aspect = %settings.aspect,
        preview = %settings.sizes.preview,
        picture = %settings.sizes.picture,
        "Camera configured"
    );

    session.attach_surface(&MockSurface { id: 1 }, SURFACE_WIDTH, SURFACE_HEIGHT)?;
    let (width, height) = session.measure(SURFACE_WIDTH, SURFACE_HEIGHT);
    info!(width, height, "Preview laid out");

    std::fs::create_dir_all(&config.output.directory)?;
    let (results_tx, mut results_rx) = tokio::sync::mpsc::unbounded_channel();
    let mut budget = CaptureBudget::new(config.output.count);

    while running.load(Ordering::SeqCst) && !budget.is_done() {
        let attempt = budget.begin();
        let tx = results_tx.clone();
        if !session.take_picture(move |result| {
            let _ = tx.send(result);
        }) {
            warn!(attempt, "Capture request ignored");
        }
        while session.is_picture_taking() {
            session.dispatch_next().await;
        }

        match results_rx.try_recv() {
            Ok(Ok(jpeg)) => {
                let sequence = budget.saved();
                let path = save_picture(&config.output.directory, sequence, &jpeg)?;
                info!(path = %path.display(), bytes = jpeg.len(), "Picture saved");
            }
            Ok(Err(e)) => {
                warn!(attempt, error = %e, "Capture failed");
                budget.failed();
            }
            Err(_) => budget.failed(),
        }

        if budget.gave_up() {
            warn!(
                failures = budget.consecutive_failures,
                "Too many failed captures in a row, stopping"
            );
            break;
        }
        tokio::time::sleep(Duration::from_millis(config.output.interval_ms)).await;
    }

    session.close();
    let stats = session.stats();
    info!(
        saved = budget.saved,
        attempts = budget.attempts,
        failed = stats.captures_failed,
        "Done"
    );

    let registry = MetricsRegistry::new()?;
    registry.update(&stats);
    print!("{}", registry.encode()?);
    Ok(())
}

fn save_picture(directory: &Path, sequence: u32, jpeg: &[u8]) -> std::io::Result<PathBuf> {
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let path = directory.join(format!("IMG_{}_{:03}.jpg", timestamp, sequence));
    std::fs::write(&path, jpeg)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_stops_at_target() {
        let mut budget = CaptureBudget::new(2);
        budget.begin();
        assert_eq!(budget.saved(), 1);
        assert!(!budget.is_done());
        budget.begin();
        assert_eq!(budget.saved(), 2);
        assert!(budget.is_done());
    }

    #[test]
    fn test_budget_gives_up_on_repeated_failures() {
        let mut budget = CaptureBudget::new(3);
        for _ in 0..MAX_CONSECUTIVE_FAILURES {
            assert!(!budget.is_done());
            budget.begin();
            budget.failed();
        }
        assert!(budget.gave_up());
        assert!(budget.is_done());
        assert_eq!(budget.saved, 0);
    }

    #[test]
    fn test_budget_success_resets_failure_streak() {
        let mut budget = CaptureBudget::new(0);
        for _ in 1..MAX_CONSECUTIVE_FAILURES {
            budget.failed();
        }
        budget.saved();
        budget.failed();
        assert!(!budget.is_done());
        assert_eq!(budget.consecutive_failures, 1);
    }

    #[test]
    fn test_unlimited_budget_only_ends_on_failures() {
        let mut budget = CaptureBudget::new(0);
        for _ in 0..100 {
            budget.saved();
        }
        assert!(!budget.target_reached());
        assert!(!budget.is_done());
    }
}
