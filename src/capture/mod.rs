//! Frame acquisition.
//!
//! A [`FrameSource`] produces frames on demand. [`CaptureFeed`] runs a source
//! on its own thread and hands frames to the processing loop through a
//! single-slot channel, dropping frames while the pipeline is busy.

pub mod feed;
pub mod image_dir;
pub mod synthetic;
pub mod types;

pub use feed::CaptureFeed;
pub use image_dir::ImageSequenceSource;
pub use synthetic::SyntheticSource;
pub use types::Frame;

/// Capability interface for anything that yields camera frames.
pub trait FrameSource: Send {
    /// Short source name for diagnostics.
    fn name(&self) -> &str;

    /// Produce the next frame. Errors are treated as a skipped cycle.
    fn next_frame(&mut self) -> Result<Frame, CaptureError>;
}

/// Errors that can occur while acquiring frames.
#[derive(Debug)]
pub enum CaptureError {
    /// The feed thread is already running
    AlreadyRunning,
    /// The device or directory cannot be opened
    Unavailable(String),
    /// A frame could not be decoded
    Decode(String),
    /// The source has no frames to offer
    Empty,
}

impl std::fmt::Display for CaptureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureError::AlreadyRunning => write!(f, "Capture is already running"),
            CaptureError::Unavailable(e) => write!(f, "Capture source unavailable: {e}"),
            CaptureError::Decode(e) => write!(f, "Frame decode error: {e}"),
            CaptureError::Empty => write!(f, "Capture source has no frames"),
        }
    }
}

impl std::error::Error for CaptureError {}
