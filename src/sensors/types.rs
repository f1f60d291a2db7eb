//! Sensor capability and shared readings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

/// A board exposing a PIR motion input and an RFID reader.
pub trait SensorBoard: Send {
    /// Whether the PIR sensor currently reports motion.
    fn read_pir(&mut self) -> Result<bool, SensorError>;

    /// The tag currently in range of the RFID reader, if any.
    fn read_rfid(&mut self) -> Result<Option<String>, SensorError>;
}

/// Errors reported by a sensor board.
#[derive(Debug)]
pub enum SensorError {
    Disconnected,
    Read(String),
}

impl std::fmt::Display for SensorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SensorError::Disconnected => write!(f, "Sensor board is disconnected"),
            SensorError::Read(e) => write!(f, "Sensor read error: {e}"),
        }
    }
}

impl std::error::Error for SensorError {}

/// Latest sampled sensor values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorReadings {
    pub pir: bool,
    pub rfid: Option<String>,
    /// When the readings were last sampled successfully
    pub sampled_at: Option<DateTime<Utc>>,
}

/// Shared slot holding the latest readings.
///
/// The poller replaces the whole value and pushed updates change one field
/// under the same lock, so readers always see a complete sample.
#[derive(Debug, Clone, Default)]
pub struct SensorState {
    inner: Arc<RwLock<SensorReadings>>,
}

impl SensorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, readings: SensorReadings) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *guard = readings;
    }

    /// Replace only the PIR value, as pushed by an external bridge.
    pub fn set_pir(&self, pir: bool) {
        self.update(|readings| readings.pir = pir);
    }

    /// Replace only the RFID tag, as pushed by an external bridge.
    pub fn set_rfid(&self, rfid: Option<String>) {
        self.update(|readings| readings.rfid = rfid);
    }

    fn update(&self, apply: impl FnOnce(&mut SensorReadings)) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        apply(&mut *guard);
        guard.sampled_at = Some(Utc::now());
    }

    pub fn current(&self) -> SensorReadings {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}
