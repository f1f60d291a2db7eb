//! Threaded frame acquisition with a single-slot hand-off.

use crate::capture::{CaptureError, Frame, FrameSource};
use crate::eventlog::SharedRunStats;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Runs a [`FrameSource`] on a background thread.
///
/// The channel holds at most one frame. When the processing loop has not
/// taken the previous frame yet, the new one is dropped and counted, so the
/// consumer always works on a recent frame and never builds a backlog.
///
/// Only the capture thread holds the sending half. Once it exits, for any
/// reason, the receiver reports `Disconnected` after the last frame is taken.
pub struct CaptureFeed {
    receiver: Receiver<Frame>,
    running: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
}

/// Clears the running flag when the capture thread ends, including by panic.
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl CaptureFeed {
    pub fn new() -> Self {
        let (_, receiver) = bounded(1);
        Self {
            receiver,
            running: Arc::new(AtomicBool::new(false)),
            thread_handle: None,
        }
    }

    /// Start pulling frames from `source` every `interval`.
    ///
    /// Each start opens a fresh channel, so take [`receiver`](Self::receiver)
    /// after this returns.
    pub fn start(
        &mut self,
        mut source: Box<dyn FrameSource>,
        interval: Duration,
        stats: SharedRunStats,
    ) -> Result<(), CaptureError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(CaptureError::AlreadyRunning);
        }

        // Reap a thread that already ended on its own.
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }

        self.running.store(true, Ordering::SeqCst);

        let (sender, receiver) = bounded(1);
        self.receiver = receiver;
        let running = self.running.clone();

        let handle = thread::spawn(move || {
            let _guard = RunningGuard(running.clone());
            send_frames(source.as_mut(), &sender, &running, interval, &stats);
            debug!("Capture thread exited");
        });

        self.thread_handle = Some(handle);
        Ok(())
    }

    /// Stop capturing and wait for the thread to exit.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Receiver the processing loop reads frames from.
    pub fn receiver(&self) -> &Receiver<Frame> {
        &self.receiver
    }

    /// Take the pending frame, if any, without blocking.
    pub fn try_recv(&self) -> Option<Frame> {
        self.receiver.try_recv().ok()
    }
}

/// Capture loop body. Returns when `running` clears or the receiver is gone;
/// dropping `sender` afterwards disconnects the consumer.
fn send_frames(
    source: &mut dyn FrameSource,
    sender: &Sender<Frame>,
    running: &AtomicBool,
    interval: Duration,
    stats: &SharedRunStats,
) {
    info!(source = source.name(), "Capture started");
    let mut failing = false;

    while running.load(Ordering::SeqCst) {
        let cycle_start = Instant::now();

        match source.next_frame() {
            Ok(frame) => {
                failing = false;
                match sender.try_send(frame) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => stats.record_frame_dropped(),
                    Err(TrySendError::Disconnected(_)) => break,
                }
            }
            Err(e) => {
                stats.record_capture_failure();
                if !failing {
                    warn!(source = source.name(), "Frame capture failed: {}", e);
                    failing = true;
                } else {
                    debug!(source = source.name(), "Frame capture failed: {}", e);
                }
            }
        }

        let elapsed = cycle_start.elapsed();
        if elapsed < interval {
            thread::sleep(interval - elapsed);
        }
    }
}

impl Default for CaptureFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CaptureFeed {
    fn drop(&mut self) {
        self.stop();
    }
}
