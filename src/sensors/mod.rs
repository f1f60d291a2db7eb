//! PIR and RFID inputs.
//!
//! Sensors are sampled on their own cadence by a [`SensorPoller`], or pushed
//! over HTTP by an external bridge, and the latest readings are published
//! for the pipeline and the HTTP layer. The frame analysis never reads
//! sensors directly.

pub mod poller;
pub mod pushed;
pub mod simulated;
pub mod types;

pub use poller::SensorPoller;
pub use pushed::{parse_pir, parse_rfid};
pub use simulated::{DisconnectedSensors, SimulatedSensors};
pub use types::{SensorBoard, SensorError, SensorReadings, SensorState};
