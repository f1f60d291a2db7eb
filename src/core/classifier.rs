//! Pet classification on top of a pluggable object detector.
//!
//! The detector returns raw candidates from its own label space. The
//! classifier keeps only accepted species above the confidence floor and
//! reports the single best one. Detector failures never escape this module.

use crate::capture::Frame;
use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, warn};

/// Axis-aligned box in frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// One raw detection as reported by a backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub label: String,
    pub confidence: f32,
    #[serde(default, rename = "box", skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BoundingBox>,
}

impl Candidate {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
            bbox: None,
        }
    }

    pub fn with_box(mut self, bbox: BoundingBox) -> Self {
        self.bbox = Some(bbox);
        self
    }
}

/// Per-frame pet presence answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DetectionResult {
    #[default]
    NoDetection,
    Detection {
        label: String,
        confidence: f32,
        #[serde(default, rename = "box", skip_serializing_if = "Option::is_none")]
        bbox: Option<BoundingBox>,
    },
}

impl DetectionResult {
    pub fn is_detection(&self) -> bool {
        matches!(self, DetectionResult::Detection { .. })
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            DetectionResult::Detection { label, .. } => Some(label),
            DetectionResult::NoDetection => None,
        }
    }

    /// Confidence of the winning detection, 0.0 when nothing was found.
    pub fn confidence(&self) -> f32 {
        match self {
            DetectionResult::Detection { confidence, .. } => *confidence,
            DetectionResult::NoDetection => 0.0,
        }
    }

    pub fn bbox(&self) -> Option<BoundingBox> {
        match self {
            DetectionResult::Detection { bbox, .. } => *bbox,
            DetectionResult::NoDetection => None,
        }
    }
}

/// Errors a detection backend may report.
#[derive(Debug)]
pub enum DetectorError {
    /// Backend is not available in this build or environment
    Unavailable(String),
    /// Model inference failed
    Inference(String),
    /// Transport to a remote backend failed
    Network(String),
    /// Backend answered with something that could not be understood
    InvalidResponse(String),
}

impl std::fmt::Display for DetectorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectorError::Unavailable(e) => write!(f, "Detector unavailable: {e}"),
            DetectorError::Inference(e) => write!(f, "Inference error: {e}"),
            DetectorError::Network(e) => write!(f, "Detector network error: {e}"),
            DetectorError::InvalidResponse(e) => write!(f, "Invalid detector response: {e}"),
        }
    }
}

impl std::error::Error for DetectorError {}

/// Capability interface for object detectors.
///
/// Implementations are chosen when the pipeline is built; the classifier never
/// inspects which backend it holds.
pub trait DetectionBackend: Send {
    /// Short backend name for diagnostics.
    fn name(&self) -> &'static str;

    /// Run detection on one frame.
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Candidate>, DetectorError>;
}

/// Acceptance rules for pet detections.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Detector labels treated as pets (matched case-insensitively)
    pub accepted_labels: Vec<String>,
    /// Candidates below this confidence are discarded
    pub min_confidence: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            accepted_labels: vec!["cat".to_string(), "dog".to_string()],
            min_confidence: 0.5,
        }
    }
}

impl ClassifierConfig {
    /// Return the canonical accepted label matching `label`, if any.
    fn accepted(&self, label: &str) -> Option<&str> {
        self.accepted_labels
            .iter()
            .find(|accepted| accepted.eq_ignore_ascii_case(label.trim()))
            .map(String::as_str)
    }

    /// Reduce raw candidates to the best accepted detection.
    ///
    /// Ties keep the first candidate seen.
    pub fn select(&self, candidates: &[Candidate]) -> DetectionResult {
        let mut best: Option<(&str, &Candidate)> = None;

        for candidate in candidates {
            if !candidate.confidence.is_finite() || candidate.confidence < self.min_confidence {
                continue;
            }
            let Some(label) = self.accepted(&candidate.label) else {
                continue;
            };
            match best {
                Some((_, current)) if candidate.confidence <= current.confidence => {}
                _ => best = Some((label, candidate)),
            }
        }

        match best {
            Some((label, candidate)) => DetectionResult::Detection {
                label: label.to_string(),
                confidence: candidate.confidence.clamp(0.0, 1.0),
                bbox: candidate.bbox,
            },
            None => DetectionResult::NoDetection,
        }
    }
}

/// Fail-open adapter around a detection backend.
pub struct PetClassifier {
    backend: Box<dyn DetectionBackend>,
    config: ClassifierConfig,
    failures: u64,
}

impl PetClassifier {
    pub fn new(backend: Box<dyn DetectionBackend>, config: ClassifierConfig) -> Self {
        Self {
            backend,
            config,
            failures: 0,
        }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Number of backend calls that returned an error or panicked.
    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// Classify one frame. Backend errors and panics are reported as
    /// `NoDetection`.
    pub fn classify(&mut self, frame: &Frame) -> DetectionResult {
        let backend = &mut self.backend;
        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| backend.detect(frame))) {
            Ok(outcome) => outcome,
            Err(payload) => {
                self.failures += 1;
                warn!(
                    backend = self.backend.name(),
                    "Detection panicked: {}",
                    panic_message(payload.as_ref())
                );
                return DetectionResult::NoDetection;
            }
        };

        match outcome {
            Ok(candidates) => {
                let result = self.config.select(&candidates);
                debug!(
                    backend = self.backend.name(),
                    candidates = candidates.len(),
                    pet = result.label().unwrap_or("none"),
                    "Detection finished"
                );
                result
            }
            Err(e) => {
                self.failures += 1;
                warn!(backend = self.backend.name(), "Detection failed: {}", e);
                DetectionResult::NoDetection
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}
