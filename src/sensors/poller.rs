//! Background sampling of a sensor board.

use crate::sensors::types::{SensorBoard, SensorReadings, SensorState};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Samples a [`SensorBoard`] at a fixed interval on its own thread.
pub struct SensorPoller {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl SensorPoller {
    /// Start polling `board` every `interval`, publishing into `state`.
    pub fn start(mut board: Box<dyn SensorBoard>, interval: Duration, state: SensorState) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let flag = running.clone();

        let handle = thread::spawn(move || {
            let mut failing = false;
            while flag.load(Ordering::SeqCst) {
                match sample(board.as_mut()) {
                    Ok(readings) => {
                        if failing {
                            debug!("Sensor board recovered");
                            failing = false;
                        }
                        state.publish(readings);
                    }
                    Err(e) => {
                        // Keep the last good sample; only the first failure is loud.
                        if !failing {
                            warn!("Sensor read failed: {}", e);
                            failing = true;
                        } else {
                            debug!("Sensor read failed: {}", e);
                        }
                    }
                }
                sleep_while_running(&flag, interval);
            }
        });

        Self {
            running,
            handle: Some(handle),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stop polling and wait for the thread to exit.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for SensorPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

fn sample(board: &mut dyn SensorBoard) -> Result<SensorReadings, crate::sensors::SensorError> {
    let pir = board.read_pir()?;
    let rfid = board.read_rfid()?;
    Ok(SensorReadings {
        pir,
        rfid,
        sampled_at: Some(Utc::now()),
    })
}

/// Sleep for `interval` in short steps so `stop` is not held up.
fn sleep_while_running(flag: &AtomicBool, interval: Duration) {
    let deadline = Instant::now() + interval;
    while flag.load(Ordering::SeqCst) {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        thread::sleep((deadline - now).min(Duration::from_millis(50)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::{DisconnectedSensors, SimulatedSensors};

    #[test]
    fn test_poller_publishes_readings() {
        let state = SensorState::new();
        let board = SimulatedSensors::seeded(7).with_probabilities(1.0, 0.0);
        let mut poller = SensorPoller::start(Box::new(board), Duration::from_millis(10), state.clone());

        let deadline = Instant::now() + Duration::from_secs(2);
        while state.current().sampled_at.is_none() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        poller.stop();

        let readings = state.current();
        assert!(readings.pir);
        assert_eq!(readings.rfid, None);
        assert!(readings.sampled_at.is_some());
        assert!(!poller.is_running());
    }

    #[test]
    fn test_failing_board_keeps_defaults() {
        let state = SensorState::new();
        let mut poller =
            SensorPoller::start(Box::new(DisconnectedSensors), Duration::from_millis(10), state.clone());
        thread::sleep(Duration::from_millis(50));
        poller.stop();

        assert_eq!(state.current(), SensorReadings::default());
    }
}
