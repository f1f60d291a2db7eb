//! Frame type handed to the analysis pipeline by the capture layer.

use chrono::{DateTime, Utc};
use image::{DynamicImage, GrayImage, RgbImage};

/// An immutable image captured from the camera.
///
/// The pipeline only reads frames. Overlays for the live stream are drawn on
/// a copy, never on the frame itself.
#[derive(Debug, Clone)]
pub struct Frame {
    image: DynamicImage,
    captured_at: DateTime<Utc>,
    sequence: u64,
}

impl Frame {
    /// Create a frame captured at the given time.
    pub fn new(image: DynamicImage, captured_at: DateTime<Utc>, sequence: u64) -> Self {
        Self {
            image,
            captured_at,
            sequence,
        }
    }

    /// Create a frame stamped with the current time.
    pub fn now(image: DynamicImage, sequence: u64) -> Self {
        Self::new(image, Utc::now(), sequence)
    }

    /// Wrap an RGB buffer.
    pub fn from_rgb(image: RgbImage, captured_at: DateTime<Utc>, sequence: u64) -> Self {
        Self::new(DynamicImage::ImageRgb8(image), captured_at, sequence)
    }

    /// Wrap a single-channel buffer.
    pub fn from_gray(image: GrayImage, captured_at: DateTime<Utc>, sequence: u64) -> Self {
        Self::new(DynamicImage::ImageLuma8(image), captured_at, sequence)
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// Monotonic counter assigned by the frame source.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// True when the frame has no pixels at all.
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}
