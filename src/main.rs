//! Pet Monitor CLI
//!
//! Camera-based pet activity monitoring.

use anyhow::Context;
use clap::{Parser, Subcommand};
use crossbeam_channel::RecvTimeoutError;
use pet_monitor::{
    capture::{CaptureFeed, FrameSource, ImageSequenceSource, SyntheticSource},
    config::{CaptureSource, Config, SensorMode},
    core::{
        BehaviorAnalyzer, DetectionBackend, FrameDifferencer, LiveFrame, PetClassifier,
        PipelineContext, SharedStatus,
    },
    detector::{build_backend, NoopDetector},
    eventlog::{self, create_shared_stats, EventLog},
    sensors::{DisconnectedSensors, SensorBoard, SensorPoller, SensorState, SimulatedSensors},
    VERSION,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "pet-monitor")]
#[command(version = VERSION)]
#[command(about = "Camera-based pet activity monitor", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start monitoring
    Start {
        /// Replay still images from this directory instead of the configured source
        #[arg(long)]
        frames: Option<PathBuf>,

        /// Add a moving subject to the synthetic scene
        #[arg(long)]
        moving_subject: bool,

        /// Dashboard port (overrides the configuration)
        #[arg(long)]
        port: Option<u16>,

        /// Do not start the HTTP dashboard
        #[arg(long)]
        no_server: bool,

        /// Stop after processing this many frames
        #[arg(long)]
        max_frames: Option<u64>,
    },

    /// Show configuration and recent activity
    Status,

    /// Show the most recent event log lines
    Logs {
        /// Number of lines to show
        #[arg(long, short, default_value = "20")]
        limit: usize,
    },

    /// Show events per minute
    Stats,

    /// Delete the event log
    ClearLogs,

    /// Show configuration
    Config {
        /// Write the effective configuration to the config file
        #[arg(long)]
        write_default: bool,
    },
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Start {
            frames,
            moving_subject,
            port,
            no_server,
            max_frames,
        } => cmd_start(frames, moving_subject, port, no_server, max_frames),
        Commands::Status => cmd_status(),
        Commands::Logs { limit } => cmd_logs(limit),
        Commands::Stats => cmd_stats(),
        Commands::ClearLogs => cmd_clear_logs(),
        Commands::Config { write_default } => cmd_config(write_default),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pet_monitor=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_config() -> Config {
    Config::load().unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config ({e}), using defaults");
        Config::default()
    })
}

fn cmd_start(
    frames: Option<PathBuf>,
    moving_subject: bool,
    port: Option<u16>,
    no_server: bool,
    max_frames: Option<u64>,
) -> anyhow::Result<()> {
    println!("Pet Monitor v{VERSION}");
    println!();

    let mut config = load_config();
    if let Some(path) = frames {
        config.capture.source = CaptureSource::Directory { path };
    } else if moving_subject {
        config.capture.source = CaptureSource::Synthetic {
            moving_subject: true,
        };
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    config.validate()?;
    if let Err(e) = config.ensure_directories() {
        eprintln!("Warning: Could not create directories: {e}");
    }

    let instance_id = Uuid::new_v4();
    let hostname = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    let camera_id = format!("camera-{hostname}");

    let backend: Box<dyn DetectionBackend> = match build_backend(&config.detector.backend) {
        Ok(backend) => backend,
        Err(e) => {
            warn!("{}; continuing without pet detection", e);
            Box::new(NoopDetector)
        }
    };

    let source: Box<dyn FrameSource> = match &config.capture.source {
        CaptureSource::Synthetic { moving_subject } => {
            let source = SyntheticSource::new(config.capture.width, config.capture.height);
            if *moving_subject {
                Box::new(source.with_moving_subject(6))
            } else {
                Box::new(source)
            }
        }
        CaptureSource::Directory { path } => Box::new(
            ImageSequenceSource::open(path)
                .with_context(|| format!("cannot replay frames from {}", path.display()))?,
        ),
    };

    // Pushed readings arrive over HTTP, so there is no board to poll.
    let board: Option<Box<dyn SensorBoard>> = match config.sensors.mode {
        SensorMode::Simulated => Some(Box::new(SimulatedSensors::new())),
        SensorMode::Disconnected => Some(Box::new(DisconnectedSensors)),
        SensorMode::Pushed => None,
    };

    println!("Starting monitor...");
    println!("  Instance ID: {instance_id}");
    println!("  Camera: {camera_id} ({})", source.name());
    println!("  Detector: {}", backend.name());
    println!(
        "  Frame interval: {}ms",
        config.capture.frame_interval.as_millis()
    );
    println!("  Sensors: {}", config.sensors.mode);
    println!("  Event log: {}", config.log_path.display());

    let timezone = config.timezone().unwrap_or_else(|e| {
        warn!("{}; using local time", e);
        None
    });

    let stats = create_shared_stats();
    let status = SharedStatus::new(instance_id, camera_id);
    let live_frame = LiveFrame::new();
    let sensor_state = SensorState::new();

    let mut pipeline = PipelineContext::new(
        FrameDifferencer::new(config.motion.clone()),
        PetClassifier::new(backend, config.detector.classifier()),
        BehaviorAnalyzer::new(config.behavior.clone()),
        status.clone(),
    )
    .with_stats(stats.clone())
    .with_sensors(sensor_state.clone())
    .with_live_frame(live_frame.clone(), config.server.jpeg_quality)
    .with_event_log(
        EventLog::new(config.log_path.clone())
            .with_timezone(timezone)
            .with_cooldowns(config.log_cooldowns.clone()),
    );

    // HTTP dashboard on its own runtime beside the synchronous loop
    #[cfg(feature = "server")]
    let server = if no_server {
        println!("  Dashboard: disabled");
        None
    } else {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("failed to create server runtime")?;
        let state = pet_monitor::server::ServerState::new(
            status.clone(),
            sensor_state.clone(),
            live_frame.clone(),
            stats.clone(),
            config.log_path.clone(),
        );
        let (addr, shutdown_tx) = runtime.block_on(pet_monitor::server::run(&config.server, state))?;
        println!("  Dashboard: http://{addr}");
        Some((runtime, shutdown_tx))
    };
    #[cfg(not(feature = "server"))]
    if !no_server {
        eprintln!("Warning: dashboard disabled (server feature not enabled at compile time)");
    }

    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(running.clone())?;

    let mut poller =
        board.map(|board| SensorPoller::start(board, config.sensors.poll_interval, sensor_state));
    let mut feed = CaptureFeed::new();
    feed.start(source, config.capture.frame_interval, stats.clone())?;

    let receiver = feed.receiver().clone();
    let mut processed: u64 = 0;
    let mut last_alert = None;

    while running.load(Ordering::SeqCst) {
        match receiver.recv_timeout(Duration::from_millis(100)) {
            Ok(frame) => {
                let snapshot = pipeline.process_frame(&frame);
                processed += 1;

                if snapshot.behavior.alert != last_alert {
                    if let Some(alert) = snapshot.behavior.alert {
                        println!(
                            "[{}] Alert: {} (score {}, idle {}s)",
                            frame.captured_at().format("%H:%M:%S"),
                            alert,
                            snapshot.behavior.score,
                            snapshot.behavior.idle_seconds
                        );
                    }
                    last_alert = snapshot.behavior.alert;
                }

                if max_frames.is_some_and(|max| processed >= max) {
                    info!(frames = processed, "Frame limit reached");
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) if feed.is_running() => continue,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                eprintln!("Capture feed stopped unexpectedly");
                break;
            }
        }
    }

    println!();
    println!("Stopping monitor...");
    feed.stop();
    if let Some(poller) = poller.as_mut() {
        poller.stop();
    }

    #[cfg(feature = "server")]
    if let Some((runtime, shutdown_tx)) = server {
        let _ = shutdown_tx.send(());
        runtime.shutdown_timeout(Duration::from_secs(2));
    }

    let last = status.current();
    println!();
    println!(
        "Last status: {} (score {}), pet: {}",
        last.behavior.status,
        last.behavior.score,
        last.pet.label().unwrap_or("none")
    );
    println!("{}", stats.summary());
    Ok(())
}

fn cmd_status() -> anyhow::Result<()> {
    let config = load_config();

    println!("Pet Monitor Status");
    println!("==================");
    println!();

    println!("Configuration:");
    match &config.capture.source {
        CaptureSource::Synthetic { moving_subject } => println!(
            "  Capture: synthetic {}x{}{}",
            config.capture.width,
            config.capture.height,
            if *moving_subject {
                " with moving subject"
            } else {
                ""
            }
        ),
        CaptureSource::Directory { path } => println!("  Capture: directory {}", path.display()),
    }
    println!(
        "  Accepted pets: {} (min confidence {:.2})",
        config.detector.accepted_labels.join(", "),
        config.detector.min_confidence
    );
    println!(
        "  Behavior window: {} samples",
        config.behavior.window_size
    );
    println!(
        "  Dashboard: {}:{}",
        config.server.host, config.server.port
    );
    println!();

    let lines = eventlog::read_lines(&config.log_path)
        .with_context(|| format!("cannot read {}", config.log_path.display()))?;
    if lines.is_empty() {
        println!("No events logged yet.");
    } else {
        println!("Event log: {} lines", lines.len());
        if let Some(last) = lines.last() {
            println!("  Last event: {last}");
        }
    }
    Ok(())
}

fn cmd_logs(limit: usize) -> anyhow::Result<()> {
    let config = load_config();
    let lines = eventlog::read_lines(&config.log_path)
        .with_context(|| format!("cannot read {}", config.log_path.display()))?;

    if lines.is_empty() {
        println!("No events logged yet.");
        return Ok(());
    }
    for line in lines.iter().rev().take(limit) {
        println!("{line}");
    }
    Ok(())
}

fn cmd_stats() -> anyhow::Result<()> {
    let config = load_config();
    let lines = eventlog::read_lines(&config.log_path)
        .with_context(|| format!("cannot read {}", config.log_path.display()))?;

    let stats = eventlog::minute_stats(&lines);
    if stats.is_empty() {
        println!("No events logged yet.");
        return Ok(());
    }

    println!("Events per minute:");
    for minute in stats {
        println!("  {}  {}", minute.time, minute.count);
    }
    Ok(())
}

fn cmd_clear_logs() -> anyhow::Result<()> {
    let config = load_config();
    eventlog::clear(&config.log_path)
        .with_context(|| format!("cannot remove {}", config.log_path.display()))?;
    println!("Event log cleared.");
    Ok(())
}

fn cmd_config(write_default: bool) -> anyhow::Result<()> {
    let config = load_config();

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);

    if write_default {
        config.save()?;
        println!();
        println!("Configuration written.");
    }
    Ok(())
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(running: Arc<AtomicBool>) -> anyhow::Result<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .context("Error setting Ctrl+C handler")
}
