//! Sensor boards without real hardware behind them.

use crate::sensors::types::{SensorBoard, SensorError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Default tags a simulated RFID reader can report.
pub const SIMULATED_TAGS: [&str; 3] = ["PET123", "DOG887", "CAT552"];

/// Randomized PIR/RFID readings for running without an Arduino attached.
pub struct SimulatedSensors {
    rng: StdRng,
    /// Probability that a PIR read reports motion
    pir_probability: f64,
    /// Probability that an RFID read finds a tag
    tag_probability: f64,
    tags: Vec<String>,
}

impl SimulatedSensors {
    /// Create a simulator seeded from the OS.
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Create a reproducible simulator.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            rng,
            pir_probability: 0.25,
            tag_probability: 0.6,
            tags: SIMULATED_TAGS.iter().map(|t| t.to_string()).collect(),
        }
    }

    pub fn with_probabilities(mut self, pir: f64, tag: f64) -> Self {
        self.pir_probability = pir.clamp(0.0, 1.0);
        self.tag_probability = tag.clamp(0.0, 1.0);
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }
}

impl Default for SimulatedSensors {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorBoard for SimulatedSensors {
    fn read_pir(&mut self) -> Result<bool, SensorError> {
        Ok(self.rng.gen_bool(self.pir_probability))
    }

    fn read_rfid(&mut self) -> Result<Option<String>, SensorError> {
        if self.tags.is_empty() || !self.rng.gen_bool(self.tag_probability) {
            return Ok(None);
        }
        let index = self.rng.gen_range(0..self.tags.len());
        Ok(Some(self.tags[index].clone()))
    }
}

/// Board used when no sensor hardware is configured; every read fails.
#[derive(Debug, Default)]
pub struct DisconnectedSensors;

impl SensorBoard for DisconnectedSensors {
    fn read_pir(&mut self) -> Result<bool, SensorError> {
        Err(SensorError::Disconnected)
    }

    fn read_rfid(&mut self) -> Result<Option<String>, SensorError> {
        Err(SensorError::Disconnected)
    }
}
