//! Generated frames for running without a camera.

use crate::capture::{CaptureError, Frame, FrameSource};
use chrono::{DateTime, Duration, Utc};
use image::{Rgb, RgbImage};

const BACKGROUND: [u8; 3] = [96, 104, 88];
const SUBJECT: [u8; 3] = [230, 180, 120];

/// A square "pet" crossing the scene back and forth.
#[derive(Debug, Clone, Copy)]
struct MovingSubject {
    size: u32,
    /// Horizontal pixels moved per frame
    speed: u32,
}

/// Produces a static scene, optionally with a moving subject.
pub struct SyntheticSource {
    width: u32,
    height: u32,
    sequence: u64,
    subject: Option<MovingSubject>,
    /// Fixed start time and step; wall-clock time when unset
    clock: Option<(DateTime<Utc>, Duration)>,
}

impl SyntheticSource {
    /// A still scene of the given size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            sequence: 0,
            subject: None,
            clock: None,
        }
    }

    /// Add a subject that moves `speed` pixels per frame.
    pub fn with_moving_subject(mut self, speed: u32) -> Self {
        let size = (self.width.min(self.height) / 4).max(1);
        self.subject = Some(MovingSubject { size, speed });
        self
    }

    /// Stamp frames from `start` in steps of `step` instead of wall-clock time.
    pub fn with_clock(mut self, start: DateTime<Utc>, step: Duration) -> Self {
        self.clock = Some((start, step));
        self
    }

    /// Render the frame for a given sequence number.
    pub fn render(&self, sequence: u64) -> RgbImage {
        let mut image = RgbImage::from_pixel(self.width, self.height, Rgb(BACKGROUND));

        if let Some(subject) = self.subject {
            let travel = self.width.saturating_sub(subject.size).max(1) as u64;
            // Bounce: 0 -> travel -> 0
            let offset = (sequence * subject.speed as u64) % (travel * 2);
            let x0 = offset.min(travel * 2 - offset) as u32;
            let y0 = (self.height.saturating_sub(subject.size)) / 2;

            for y in y0..(y0 + subject.size).min(self.height) {
                for x in x0..(x0 + subject.size).min(self.width) {
                    image.put_pixel(x, y, Rgb(SUBJECT));
                }
            }
        }

        image
    }

    fn timestamp(&self, sequence: u64) -> DateTime<Utc> {
        match self.clock {
            Some((start, step)) => start + step * sequence as i32,
            None => Utc::now(),
        }
    }
}

impl FrameSource for SyntheticSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn next_frame(&mut self) -> Result<Frame, CaptureError> {
        if self.width == 0 || self.height == 0 {
            return Err(CaptureError::Empty);
        }
        let sequence = self.sequence;
        self.sequence += 1;
        Ok(Frame::from_rgb(
            self.render(sequence),
            self.timestamp(sequence),
            sequence,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_still_scene_repeats() {
        let mut source = SyntheticSource::new(64, 48);
        let a = source.next_frame().unwrap();
        let b = source.next_frame().unwrap();
        assert_eq!(a.image().to_rgb8(), b.image().to_rgb8());
        assert_eq!(b.sequence(), 1);
    }

    #[test]
    fn test_moving_subject_changes_frames() {
        let mut source = SyntheticSource::new(160, 120).with_moving_subject(8);
        let a = source.next_frame().unwrap();
        let b = source.next_frame().unwrap();
        assert_ne!(a.image().to_rgb8(), b.image().to_rgb8());
    }

    #[test]
    fn test_fixed_clock() {
        let start = Utc::now();
        let mut source = SyntheticSource::new(8, 8).with_clock(start, Duration::seconds(2));
        source.next_frame().unwrap();
        let second = source.next_frame().unwrap();
        assert_eq!(second.captured_at(), start + Duration::seconds(2));
    }

    #[test]
    fn test_zero_size_is_empty() {
        let mut source = SyntheticSource::new(0, 10);
        assert!(matches!(source.next_frame(), Err(CaptureError::Empty)));
    }
}
