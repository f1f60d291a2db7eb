//! Per-frame orchestration.
//!
//! [`PipelineContext`] owns one differencer, one classifier and one behavior
//! analyzer and is driven by a single processing loop. After every frame it
//! replaces the shared [`StatusSnapshot`] wholesale, appends throttled events
//! to the log, and optionally publishes an annotated JPEG for the live feed.

use crate::capture::Frame;
use crate::core::behavior::{BehaviorAnalyzer, BehaviorReport};
use crate::core::classifier::{BoundingBox, DetectionResult, PetClassifier};
use crate::core::motion::{FrameDifferencer, MotionLevel, MotionReading};
use crate::eventlog::{create_shared_stats, EventKind, EventLog, SharedRunStats};
use crate::sensors::{SensorReadings, SensorState};
use chrono::{DateTime, Utc};
use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

const REGION_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const PET_COLOR: Rgb<u8> = Rgb([255, 64, 0]);

/// Point-in-time view of the monitor, as served to the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub instance_id: Uuid,
    pub camera_id: String,
    /// Capture time of the frame this snapshot describes
    pub updated_at: Option<DateTime<Utc>>,
    pub frame_sequence: u64,
    pub motion_detected: bool,
    pub motion_magnitude: u64,
    pub motion_level: MotionLevel,
    pub motion_regions: usize,
    pub pet: DetectionResult,
    pub behavior: BehaviorReport,
    pub pir: bool,
    pub rfid: Option<String>,
}

/// Latest completed snapshot, shared with the HTTP layer.
#[derive(Debug, Clone, Default)]
pub struct SharedStatus {
    inner: Arc<RwLock<StatusSnapshot>>,
}

impl SharedStatus {
    /// Create a slot holding an empty snapshot for this instance.
    pub fn new(instance_id: Uuid, camera_id: impl Into<String>) -> Self {
        let initial = StatusSnapshot {
            instance_id,
            camera_id: camera_id.into(),
            ..StatusSnapshot::default()
        };
        Self {
            inner: Arc::new(RwLock::new(initial)),
        }
    }

    pub fn publish(&self, snapshot: StatusSnapshot) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *guard = snapshot;
    }

    pub fn current(&self) -> StatusSnapshot {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

/// An encoded frame ready to stream.
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    pub sequence: u64,
    pub jpeg: Arc<Vec<u8>>,
}

/// Slot holding the most recent annotated JPEG.
#[derive(Debug, Clone, Default)]
pub struct LiveFrame {
    inner: Arc<RwLock<Option<EncodedFrame>>>,
}

impl LiveFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, frame: EncodedFrame) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *guard = Some(frame);
    }

    pub fn latest(&self) -> Option<EncodedFrame> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

/// Owned state of the processing loop.
pub struct PipelineContext {
    differencer: FrameDifferencer,
    classifier: PetClassifier,
    analyzer: BehaviorAnalyzer,
    status: SharedStatus,
    stats: SharedRunStats,
    event_log: Option<EventLog>,
    live_frame: Option<(LiveFrame, u8)>,
    sensors: Option<SensorState>,
    last_pir: bool,
    last_rfid: Option<String>,
    reported_failures: u64,
}

impl PipelineContext {
    pub fn new(
        differencer: FrameDifferencer,
        classifier: PetClassifier,
        analyzer: BehaviorAnalyzer,
        status: SharedStatus,
    ) -> Self {
        Self {
            differencer,
            classifier,
            analyzer,
            status,
            stats: create_shared_stats(),
            event_log: None,
            live_frame: None,
            sensors: None,
            last_pir: false,
            last_rfid: None,
            reported_failures: 0,
        }
    }

    /// Append events to `log`.
    pub fn with_event_log(mut self, log: EventLog) -> Self {
        self.event_log = Some(log);
        self
    }

    /// Publish annotated JPEGs at the given quality (1-100).
    pub fn with_live_frame(mut self, live_frame: LiveFrame, quality: u8) -> Self {
        self.live_frame = Some((live_frame, quality.clamp(1, 100)));
        self
    }

    /// Merge PIR and RFID readings into each snapshot.
    pub fn with_sensors(mut self, sensors: SensorState) -> Self {
        self.sensors = Some(sensors);
        self
    }

    pub fn with_stats(mut self, stats: SharedRunStats) -> Self {
        self.stats = stats;
        self
    }

    pub fn status(&self) -> &SharedStatus {
        &self.status
    }

    pub fn stats(&self) -> &SharedRunStats {
        &self.stats
    }

    pub fn analyzer(&self) -> &BehaviorAnalyzer {
        &self.analyzer
    }

    pub fn classifier(&self) -> &PetClassifier {
        &self.classifier
    }

    /// Run one frame through motion, classification and scoring.
    ///
    /// The frame's capture time is used as the clock, so replayed sequences
    /// score the same way they did live.
    pub fn process_frame(&mut self, frame: &Frame) -> StatusSnapshot {
        let now = frame.captured_at();

        let reading = self.differencer.process(frame);
        let level = reading.level(self.differencer.config().strong_motion_area);
        let behavior = self.analyzer.update(level.units(), now);

        let pet = self.classifier.classify(frame);
        let failures = self.classifier.failures();
        if failures > self.reported_failures {
            self.stats
                .record_detector_failures(failures - self.reported_failures);
            self.reported_failures = failures;
        }

        let sensors = self
            .sensors
            .as_ref()
            .map(SensorState::current)
            .unwrap_or_default();

        self.log_events(&reading, &pet, &behavior, &sensors, now);

        self.stats.record_frame_processed();
        if reading.detected() {
            self.stats.record_motion_frame();
        }
        if pet.is_detection() {
            self.stats.record_pet_detection();
        }

        let previous = self.status.current();
        let snapshot = StatusSnapshot {
            instance_id: previous.instance_id,
            camera_id: previous.camera_id,
            updated_at: Some(now),
            frame_sequence: frame.sequence(),
            motion_detected: reading.detected(),
            motion_magnitude: reading.magnitude,
            motion_level: level,
            motion_regions: reading.regions.len(),
            pet,
            behavior,
            pir: sensors.pir,
            rfid: sensors.rfid,
        };

        if previous.behavior.status != snapshot.behavior.status {
            info!(
                from = %previous.behavior.status,
                to = %snapshot.behavior.status,
                score = snapshot.behavior.score,
                "Behavior status changed"
            );
        }

        self.status.publish(snapshot.clone());
        self.publish_live_frame(frame, &reading, snapshot.pet.bbox());

        snapshot
    }

    fn log_events(
        &mut self,
        reading: &MotionReading,
        pet: &DetectionResult,
        behavior: &BehaviorReport,
        sensors: &SensorReadings,
        now: DateTime<Utc>,
    ) {
        let mut events: Vec<(EventKind, String)> = Vec::new();

        if reading.detected() {
            events.push((EventKind::Motion, "Motion detected".to_string()));
        }
        match pet {
            DetectionResult::Detection {
                label, confidence, ..
            } => events.push((
                EventKind::Pet,
                format!("Pet detected: {label} ({confidence:.2})"),
            )),
            DetectionResult::NoDetection if reading.detected() => {
                events.push((EventKind::NoPet, "No pet detected".to_string()))
            }
            DetectionResult::NoDetection => {}
        }

        // PIR logs on the rising edge, RFID when a new tag appears.
        if sensors.pir && !self.last_pir {
            events.push((EventKind::Pir, "PIR: motion detected".to_string()));
        }
        self.last_pir = sensors.pir;
        if sensors.rfid != self.last_rfid {
            if let Some(tag) = &sensors.rfid {
                events.push((EventKind::Rfid, format!("RFID: tag {tag}")));
            }
            self.last_rfid = sensors.rfid.clone();
        }

        if let Some(alert) = behavior.alert {
            events.push((EventKind::Alert, format!("Alert: {}", alert.message())));
        }

        let Some(log) = self.event_log.as_mut() else {
            return;
        };
        for (kind, message) in events {
            match log.record(kind, &message, now) {
                Ok(true) => self.stats.record_event_logged(),
                Ok(false) => {}
                Err(e) => warn!(path = %log.path().display(), "Failed to write event log: {}", e),
            }
        }
    }

    fn publish_live_frame(
        &self,
        frame: &Frame,
        reading: &MotionReading,
        pet_box: Option<BoundingBox>,
    ) {
        let Some((live_frame, quality)) = &self.live_frame else {
            return;
        };
        if frame.is_empty() {
            return;
        }

        let annotated = annotate(frame, reading, pet_box);
        let mut jpeg = Vec::new();
        match JpegEncoder::new_with_quality(&mut jpeg, *quality).encode_image(&annotated) {
            Ok(()) => live_frame.publish(EncodedFrame {
                sequence: frame.sequence(),
                jpeg: Arc::new(jpeg),
            }),
            Err(e) => debug!("Failed to encode live frame: {}", e),
        }
    }
}

/// Copy of the frame with motion regions and the pet box outlined.
pub fn annotate(frame: &Frame, reading: &MotionReading, pet_box: Option<BoundingBox>) -> RgbImage {
    let mut canvas = frame.image().to_rgb8();

    for region in &reading.regions {
        draw_box(&mut canvas, region.x, region.y, region.width, region.height, REGION_COLOR);
    }
    if let Some(bbox) = pet_box {
        draw_box(&mut canvas, bbox.x, bbox.y, bbox.width, bbox.height, PET_COLOR);
    }

    canvas
}

fn draw_box(canvas: &mut RgbImage, x: u32, y: u32, width: u32, height: u32, color: Rgb<u8>) {
    if width == 0 || height == 0 || x >= canvas.width() || y >= canvas.height() {
        return;
    }
    let rect = Rect::at(x as i32, y as i32).of_size(width, height);
    draw_hollow_rect_mut(canvas, rect, color);
}
