//! Core analysis for the pet monitor.
//!
//! This module contains:
//! - Frame differencing motion detection
//! - Pet classification over a pluggable detector
//! - Rolling behavior scoring
//! - The per-frame pipeline tying them together

pub mod behavior;
pub mod classifier;
pub mod motion;
pub mod pipeline;

// Re-export commonly used types
pub use behavior::{BehaviorAlert, BehaviorAnalyzer, BehaviorConfig, BehaviorReport, BehaviorStatus};
pub use classifier::{
    BoundingBox, Candidate, ClassifierConfig, DetectionBackend, DetectionResult, DetectorError,
    PetClassifier,
};
pub use motion::{FrameDifferencer, MotionConfig, MotionLevel, MotionReading, MotionRegion};
pub use pipeline::{
    annotate, EncodedFrame, LiveFrame, PipelineContext, SharedStatus, StatusSnapshot,
};
