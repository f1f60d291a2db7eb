//! Pet Monitor - camera-based pet activity monitoring.
//!
//! This library turns a stream of camera frames into a live picture of what a
//! pet is doing: whether something moved, whether a cat or dog is in view, and
//! how active the animal has been over the last few seconds.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                           Pet Monitor                            │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐            │
//! │  │   Capture   │──▶│   Motion    │──▶│  Behavior   │──┐         │
//! │  │   (feed)    │   │(differencer)│   │ (analyzer)  │  │         │
//! │  └─────────────┘   └─────────────┘   └─────────────┘  ▼         │
//! │         │          ┌─────────────┐            ┌─────────────┐   │
//! │         └─────────▶│ Classifier  │───────────▶│  Pipeline   │   │
//! │                    │ (detector)  │            │  Context    │   │
//! │                    └─────────────┘            └─────────────┘   │
//! │  ┌─────────────┐                                 │      │       │
//! │  │ PIR / RFID  │────────────────────────────────▶│      ▼       │
//! │  │  (poller)   │                        ┌────────┘  Event log   │
//! │  └─────────────┘                        ▼                       │
//! │                                  Status / MJPEG (server)        │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use pet_monitor::capture::{FrameSource, SyntheticSource};
//! use pet_monitor::core::*;
//! use pet_monitor::detector::NoopDetector;
//!
//! let mut pipeline = PipelineContext::new(
//!     FrameDifferencer::new(MotionConfig::default()),
//!     PetClassifier::new(Box::new(NoopDetector), ClassifierConfig::default()),
//!     BehaviorAnalyzer::new(BehaviorConfig::default()),
//!     SharedStatus::default(),
//! );
//!
//! let mut source = SyntheticSource::new(320, 240).with_moving_subject(6);
//! let frame = source.next_frame().expect("synthetic frames never fail");
//! let snapshot = pipeline.process_frame(&frame);
//! println!("score = {}", snapshot.behavior.score);
//! ```

pub mod capture;
pub mod config;
pub mod core;
pub mod detector;
pub mod eventlog;
pub mod sensors;

#[cfg(feature = "server")]
pub mod server;

// Re-export key types at crate root for convenience
pub use capture::{CaptureError, CaptureFeed, Frame, FrameSource};
pub use config::{Config, ConfigError};
pub use core::{
    BehaviorAnalyzer, BehaviorReport, BehaviorStatus, DetectionResult, FrameDifferencer,
    PetClassifier, PipelineContext, SharedStatus, StatusSnapshot,
};
pub use eventlog::{EventLog, RunStats, SharedRunStats};
pub use sensors::{SensorPoller, SensorReadings, SensorState};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
