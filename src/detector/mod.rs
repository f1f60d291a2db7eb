//! Detection backends for the pet classifier.
//!
//! The classifier only sees [`DetectionBackend`]; which implementation runs
//! is decided here from configuration.

#[cfg(feature = "remote-detector")]
pub mod remote;

use crate::capture::Frame;
use crate::core::classifier::{Candidate, DetectionBackend, DetectorError};
use serde::{Deserialize, Serialize};

#[cfg(feature = "remote-detector")]
pub use remote::RemoteDetector;

/// Which backend to build.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DetectorBackendConfig {
    /// Never reports anything
    #[default]
    None,
    /// Returns the same candidates for every frame
    Fixed { candidates: Vec<Candidate> },
    /// HTTP inference service receiving JPEG frames
    Remote {
        url: String,
        #[serde(default = "default_remote_timeout")]
        timeout_secs: u64,
    },
}

fn default_remote_timeout() -> u64 {
    5
}

/// Build the configured backend.
///
/// A remote backend in a build without the `remote-detector` feature is
/// reported as unavailable; callers decide whether to fall back.
pub fn build_backend(
    config: &DetectorBackendConfig,
) -> Result<Box<dyn DetectionBackend>, DetectorError> {
    match config {
        DetectorBackendConfig::None => Ok(Box::new(NoopDetector)),
        DetectorBackendConfig::Fixed { candidates } => {
            Ok(Box::new(FixedDetector::new(candidates.clone())))
        }
        #[cfg(feature = "remote-detector")]
        DetectorBackendConfig::Remote { url, timeout_secs } => Ok(Box::new(RemoteDetector::new(
            url.clone(),
            std::time::Duration::from_secs(*timeout_secs),
        )?)),
        #[cfg(not(feature = "remote-detector"))]
        DetectorBackendConfig::Remote { url, .. } => Err(DetectorError::Unavailable(format!(
            "remote detector at {url} requires the remote-detector feature"
        ))),
    }
}

/// Backend used when no model is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDetector;

impl DetectionBackend for NoopDetector {
    fn name(&self) -> &'static str {
        "none"
    }

    fn detect(&mut self, _frame: &Frame) -> Result<Vec<Candidate>, DetectorError> {
        Ok(Vec::new())
    }
}

/// Replays a fixed answer, or a fixed failure, for every frame.
#[derive(Debug, Clone)]
pub struct FixedDetector {
    answer: Result<Vec<Candidate>, String>,
    calls: u64,
}

impl FixedDetector {
    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self {
            answer: Ok(candidates),
            calls: 0,
        }
    }

    /// A detector whose every call fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            answer: Err(message.into()),
            calls: 0,
        }
    }

    pub fn calls(&self) -> u64 {
        self.calls
    }
}

impl DetectionBackend for FixedDetector {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn detect(&mut self, _frame: &Frame) -> Result<Vec<Candidate>, DetectorError> {
        self.calls += 1;
        match &self.answer {
            Ok(candidates) => Ok(candidates.clone()),
            Err(message) => Err(DetectorError::Inference(message.clone())),
        }
    }
}
