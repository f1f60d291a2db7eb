//! Frame differencing motion detection.
//!
//! Each frame is reduced to a blurred grayscale image and compared against
//! the previous one. Changed pixels are binarized, dilated so nearby
//! fragments merge, and grouped into connected regions. Regions smaller than
//! the minimum area are treated as sensor noise.

use crate::capture::Frame;
use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::filter::gaussian_blur_f32;
use imageproc::morphology::dilate;
use imageproc::region_labelling::{connected_components, Connectivity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::trace;

/// Tunables for the frame differencer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Gaussian sigma applied before differencing (3.5 matches a 21x21 kernel)
    pub blur_sigma: f32,
    /// Per-pixel intensity change (0-255) above which a pixel counts as changed
    pub diff_threshold: u8,
    /// Number of 3x3 dilation passes applied to the change mask
    pub dilate_iterations: u8,
    /// Regions with fewer pixels than this are discarded as noise
    pub min_region_area: u64,
    /// Magnitude at or above which motion is classed as strong
    pub strong_motion_area: u64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            blur_sigma: 3.5,
            diff_threshold: 25,
            dilate_iterations: 2,
            min_region_area: 500,
            strong_motion_area: 5000,
        }
    }
}

/// A connected region of change that survived the area filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotionRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Pixel count of the region
    pub area: u64,
}

/// Result of comparing one frame against the previous one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MotionReading {
    /// Sum of the areas of all surviving regions
    pub magnitude: u64,
    /// Surviving regions, ordered by label
    pub regions: Vec<MotionRegion>,
}

impl MotionReading {
    /// Boolean view of the reading: at least one region survived filtering.
    pub fn detected(&self) -> bool {
        !self.regions.is_empty()
    }

    /// Map the magnitude onto the behavior analyzer's unit range.
    pub fn level(&self, strong_motion_area: u64) -> MotionLevel {
        MotionLevel::from_magnitude(self.magnitude, strong_motion_area)
    }
}

/// Bucketed motion intensity fed to the behavior analyzer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionLevel {
    #[default]
    Still,
    Light,
    Strong,
}

impl MotionLevel {
    pub fn from_magnitude(magnitude: u64, strong_motion_area: u64) -> Self {
        if magnitude == 0 {
            MotionLevel::Still
        } else if magnitude < strong_motion_area {
            MotionLevel::Light
        } else {
            MotionLevel::Strong
        }
    }

    /// Numeric value in the analyzer's 0-2 range.
    pub fn units(self) -> f64 {
        match self {
            MotionLevel::Still => 0.0,
            MotionLevel::Light => 1.0,
            MotionLevel::Strong => 2.0,
        }
    }
}

/// Stateful differencer holding the previous normalized frame.
pub struct FrameDifferencer {
    config: MotionConfig,
    previous: Option<GrayImage>,
}

impl FrameDifferencer {
    pub fn new(config: MotionConfig) -> Self {
        Self {
            config,
            previous: None,
        }
    }

    pub fn config(&self) -> &MotionConfig {
        &self.config
    }

    /// True once a baseline frame has been stored.
    pub fn has_baseline(&self) -> bool {
        self.previous.is_some()
    }

    /// Drop the stored baseline; the next frame only re-initializes it.
    pub fn reset(&mut self) {
        self.previous = None;
    }

    /// Compare `frame` against the previous frame and advance the baseline.
    ///
    /// The first frame, and any frame whose size differs from the baseline,
    /// only becomes the new baseline and reports no motion. Empty and
    /// single-pixel frames report no motion and leave the baseline untouched.
    pub fn process(&mut self, frame: &Frame) -> MotionReading {
        let Some(current) = self.normalize(frame) else {
            return MotionReading::default();
        };

        let reading = match &self.previous {
            Some(previous) if previous.dimensions() == current.dimensions() => {
                self.compare(previous, &current)
            }
            _ => MotionReading::default(),
        };

        self.previous = Some(current);
        reading
    }

    fn normalize(&self, frame: &Frame) -> Option<GrayImage> {
        // A single pixel carries no spatial change to measure.
        if frame.is_empty() || (frame.width() as u64) * (frame.height() as u64) < 2 {
            return None;
        }
        let gray = frame.image().to_luma8();
        if self.config.blur_sigma > 0.0 && self.config.blur_sigma.is_finite() {
            Some(gaussian_blur_f32(&gray, self.config.blur_sigma))
        } else {
            Some(gray)
        }
    }

    fn compare(&self, previous: &GrayImage, current: &GrayImage) -> MotionReading {
        let threshold = self.config.diff_threshold;
        let (width, height) = current.dimensions();

        let mut mask = GrayImage::from_fn(width, height, |x, y| {
            let before = previous.get_pixel(x, y)[0];
            let after = current.get_pixel(x, y)[0];
            if before.abs_diff(after) > threshold {
                Luma([255u8])
            } else {
                Luma([0u8])
            }
        });

        if self.config.dilate_iterations > 0 {
            mask = dilate(&mask, Norm::LInf, self.config.dilate_iterations);
        }

        let regions = self.surviving_regions(&mask);
        let magnitude = regions.iter().map(|r| r.area).sum();

        trace!(
            regions = regions.len(),
            magnitude,
            "Frame difference computed"
        );

        MotionReading { magnitude, regions }
    }

    /// Label 8-connected regions of the mask and keep those above the area floor.
    fn surviving_regions(&self, mask: &GrayImage) -> Vec<MotionRegion> {
        let changed = mask.pixels().filter(|p| p[0] != 0).count() as u64;
        if changed == 0 || changed < self.config.min_region_area {
            return Vec::new();
        }

        let labels = connected_components(mask, Connectivity::Eight, Luma([0u8]));

        // label -> (min_x, min_y, max_x, max_y, area)
        let mut extents: BTreeMap<u32, (u32, u32, u32, u32, u64)> = BTreeMap::new();
        for (x, y, pixel) in labels.enumerate_pixels() {
            let label = pixel[0];
            if label == 0 {
                continue;
            }
            let entry = extents.entry(label).or_insert((x, y, x, y, 0));
            entry.0 = entry.0.min(x);
            entry.1 = entry.1.min(y);
            entry.2 = entry.2.max(x);
            entry.3 = entry.3.max(y);
            entry.4 += 1;
        }

        extents
            .into_values()
            .filter(|&(_, _, _, _, area)| area >= self.config.min_region_area)
            .map(|(min_x, min_y, max_x, max_y, area)| MotionRegion {
                x: min_x,
                y: min_y,
                width: max_x - min_x + 1,
                height: max_y - min_y + 1,
                area,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn gray_frame(width: u32, height: u32, square: Option<(u32, u32, u32)>, seq: u64) -> Frame {
        let image = GrayImage::from_fn(width, height, |x, y| match square {
            Some((sx, sy, size)) if x >= sx && x < sx + size && y >= sy && y < sy + size => {
                Luma([255])
            }
            _ => Luma([20]),
        });
        Frame::from_gray(image, Utc::now(), seq)
    }

    #[test]
    fn test_first_frame_reports_no_motion() {
        let mut differencer = FrameDifferencer::new(MotionConfig::default());
        let reading = differencer.process(&gray_frame(120, 90, Some((10, 10, 40)), 0));

        assert_eq!(reading.magnitude, 0);
        assert!(!reading.detected());
        assert!(differencer.has_baseline());
    }

    #[test]
    fn test_identical_frames_have_zero_magnitude() {
        let mut differencer = FrameDifferencer::new(MotionConfig::default());
        differencer.process(&gray_frame(120, 90, Some((30, 20, 30)), 0));
        let reading = differencer.process(&gray_frame(120, 90, Some((30, 20, 30)), 1));

        assert_eq!(reading.magnitude, 0);
        assert!(!reading.detected());
    }

    #[test]
    fn test_large_change_is_detected() {
        let mut differencer = FrameDifferencer::new(MotionConfig::default());
        differencer.process(&gray_frame(160, 120, None, 0));
        let reading = differencer.process(&gray_frame(160, 120, Some((50, 30, 40)), 1));

        assert!(reading.detected());
        assert!(reading.magnitude >= 40 * 40);
        assert_eq!(reading.regions.len(), 1);

        let region = reading.regions[0];
        assert!(region.x <= 50 && region.y <= 30);
        assert!(region.x + region.width >= 90);
    }

    #[test]
    fn test_small_speck_is_filtered_as_noise() {
        let mut differencer = FrameDifferencer::new(MotionConfig::default());
        differencer.process(&gray_frame(100, 100, None, 0));
        let reading = differencer.process(&gray_frame(100, 100, Some((50, 50, 3)), 1));

        assert_eq!(reading.magnitude, 0);
        assert!(!reading.detected());
    }

    #[test]
    fn test_baseline_advances_after_motion() {
        let mut differencer = FrameDifferencer::new(MotionConfig::default());
        differencer.process(&gray_frame(160, 120, None, 0));
        let moved = differencer.process(&gray_frame(160, 120, Some((50, 30, 40)), 1));
        let held = differencer.process(&gray_frame(160, 120, Some((50, 30, 40)), 2));

        assert!(moved.detected());
        assert_eq!(held.magnitude, 0);
    }

    #[test]
    fn test_empty_frame_is_not_an_error() {
        let mut differencer = FrameDifferencer::new(MotionConfig::default());
        differencer.process(&gray_frame(40, 40, None, 0));
        let reading = differencer.process(&Frame::from_gray(GrayImage::new(0, 0), Utc::now(), 1));

        assert_eq!(reading, MotionReading::default());
        assert!(differencer.has_baseline());
    }

    #[test]
    fn test_single_pixel_frames_report_no_motion() {
        let mut differencer = FrameDifferencer::new(MotionConfig::default());
        let dark = Frame::from_gray(GrayImage::from_pixel(1, 1, Luma([0])), Utc::now(), 0);
        let bright = Frame::from_gray(GrayImage::from_pixel(1, 1, Luma([255])), Utc::now(), 1);

        assert_eq!(differencer.process(&dark), MotionReading::default());
        assert_eq!(differencer.process(&bright), MotionReading::default());
        assert!(!differencer.has_baseline());
    }

    #[test]
    fn test_tiny_frames_with_full_change_report_no_motion() {
        let mut differencer = FrameDifferencer::new(MotionConfig::default());
        for (width, height) in [(2, 1), (1, 2), (3, 3), (1, 40)] {
            differencer.reset();
            differencer.process(&Frame::from_gray(
                GrayImage::from_pixel(width, height, Luma([0])),
                Utc::now(),
                0,
            ));
            let reading = differencer.process(&Frame::from_gray(
                GrayImage::from_pixel(width, height, Luma([255])),
                Utc::now(),
                1,
            ));
            assert_eq!(reading.magnitude, 0);
        }
    }

    #[test]
    fn test_change_below_min_area_skips_labelling() {
        let config = MotionConfig {
            blur_sigma: 0.0,
            dilate_iterations: 0,
            min_region_area: 50,
            ..MotionConfig::default()
        };
        let mut differencer = FrameDifferencer::new(config);
        differencer.process(&gray_frame(30, 30, None, 0));
        let reading = differencer.process(&gray_frame(30, 30, Some((5, 5, 7)), 1));
        assert_eq!(reading.magnitude, 0);

        let reading = differencer.process(&gray_frame(30, 30, Some((5, 5, 7)), 2));
        assert!(!reading.detected());
    }

    #[test]
    fn test_resolution_change_rebaselines() {
        let mut differencer = FrameDifferencer::new(MotionConfig::default());
        differencer.process(&gray_frame(80, 60, None, 0));
        let reading = differencer.process(&gray_frame(160, 120, Some((10, 10, 60)), 1));

        assert_eq!(reading.magnitude, 0);
    }

    #[test]
    fn test_motion_level_buckets() {
        assert_eq!(MotionLevel::from_magnitude(0, 5000), MotionLevel::Still);
        assert_eq!(MotionLevel::from_magnitude(800, 5000), MotionLevel::Light);
        assert_eq!(MotionLevel::from_magnitude(5000, 5000), MotionLevel::Strong);
        assert_eq!(MotionLevel::Strong.units(), 2.0);
        assert_eq!(MotionLevel::Still.units(), 0.0);
    }
}
