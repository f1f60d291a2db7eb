//! Run counters for the monitoring loop.
//!
//! Counters are updated from the capture and processing threads and read by
//! the HTTP layer, so every field is an atomic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug)]
pub struct RunStats {
    /// Frames that went through the pipeline
    frames_processed: AtomicU64,
    /// Frames discarded because the pipeline was still busy
    frames_dropped: AtomicU64,
    /// Capture cycles that produced no frame
    capture_failures: AtomicU64,
    /// Frames with at least one motion region
    motion_frames: AtomicU64,
    /// Frames with an accepted pet detection
    pet_detections: AtomicU64,
    /// Detector calls that failed and were treated as no detection
    detector_failures: AtomicU64,
    /// Lines written to the event log
    events_logged: AtomicU64,
    started_at: DateTime<Utc>,
}

impl RunStats {
    pub fn new() -> Self {
        Self {
            frames_processed: AtomicU64::new(0),
            frames_dropped: AtomicU64::new(0),
            capture_failures: AtomicU64::new(0),
            motion_frames: AtomicU64::new(0),
            pet_detections: AtomicU64::new(0),
            detector_failures: AtomicU64::new(0),
            events_logged: AtomicU64::new(0),
            started_at: Utc::now(),
        }
    }

    pub fn record_frame_processed(&self) {
        self.frames_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_frame_dropped(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_capture_failure(&self) {
        self.capture_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_motion_frame(&self) {
        self.motion_frames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_pet_detection(&self) {
        self.pet_detections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_detector_failures(&self, count: u64) {
        self.detector_failures.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_event_logged(&self) {
        self.events_logged.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RunStatsSnapshot {
        RunStatsSnapshot {
            frames_processed: self.frames_processed.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            capture_failures: self.capture_failures.load(Ordering::Relaxed),
            motion_frames: self.motion_frames.load(Ordering::Relaxed),
            pet_detections: self.pet_detections.load(Ordering::Relaxed),
            detector_failures: self.detector_failures.load(Ordering::Relaxed),
            events_logged: self.events_logged.load(Ordering::Relaxed),
            started_at: self.started_at,
            uptime_secs: (Utc::now() - self.started_at).num_seconds().max(0) as u64,
        }
    }

    /// Multi-line summary printed when the monitor stops.
    pub fn summary(&self) -> String {
        let stats = self.snapshot();
        format!(
            "Run Statistics:\n\
             - Frames processed: {}\n\
             - Frames dropped: {}\n\
             - Capture failures: {}\n\
             - Frames with motion: {}\n\
             - Pet detections: {}\n\
             - Detector failures: {}\n\
             - Events logged: {}\n\
             - Uptime: {} seconds",
            stats.frames_processed,
            stats.frames_dropped,
            stats.capture_failures,
            stats.motion_frames,
            stats.pet_detections,
            stats.detector_failures,
            stats.events_logged,
            stats.uptime_secs
        )
    }
}

impl Default for RunStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStatsSnapshot {
    pub frames_processed: u64,
    pub frames_dropped: u64,
    pub capture_failures: u64,
    pub motion_frames: u64,
    pub pet_detections: u64,
    pub detector_failures: u64,
    pub events_logged: u64,
    pub started_at: DateTime<Utc>,
    pub uptime_secs: u64,
}

/// Thread-safe shared counters.
pub type SharedRunStats = Arc<RunStats>;

pub fn create_shared_stats() -> SharedRunStats {
    Arc::new(RunStats::new())
}
