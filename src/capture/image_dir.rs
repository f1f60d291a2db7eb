//! Replay a directory of still images as a camera feed.

use crate::capture::{CaptureError, Frame, FrameSource};
use std::path::{Path, PathBuf};
use tracing::debug;

const EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "bmp"];

/// Cycles through the images of a directory in file name order.
pub struct ImageSequenceSource {
    files: Vec<PathBuf>,
    position: usize,
    sequence: u64,
}

impl ImageSequenceSource {
    /// Collect the images in `dir`. Fails if the directory cannot be read or
    /// holds no supported images.
    pub fn open(dir: &Path) -> Result<Self, CaptureError> {
        let entries = std::fs::read_dir(dir)
            .map_err(|e| CaptureError::Unavailable(format!("{}: {e}", dir.display())))?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && is_supported(path))
            .collect();
        files.sort();

        if files.is_empty() {
            return Err(CaptureError::Empty);
        }

        debug!(dir = %dir.display(), count = files.len(), "Loaded image sequence");

        Ok(Self {
            files,
            position: 0,
            sequence: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| EXTENSIONS.iter().any(|known| known.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

impl FrameSource for ImageSequenceSource {
    fn name(&self) -> &str {
        "directory"
    }

    fn next_frame(&mut self) -> Result<Frame, CaptureError> {
        let path = &self.files[self.position];
        self.position = (self.position + 1) % self.files.len();

        let sequence = self.sequence;
        self.sequence += 1;

        let image = image::open(path)
            .map_err(|e| CaptureError::Decode(format!("{}: {e}", path.display())))?;
        Ok(Frame::now(image, sequence))
    }
}
