//! Bounded frame queue between the acquisition and processing threads.
//!
//! Uses std::sync::mpsc::sync_channel: the acquisition thread blocks when the
//! queue is full, the processing thread drains it until the sender is dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use super::source::Frame;

/// Creates a new frame queue holding at most `capacity` frames.
///
/// Returns a tuple of (sender, receiver):
/// - The sender is used by the acquisition thread to queue changed frames
/// - The receiver is used by the processing thread
pub fn create_frame_queue(capacity: usize) -> (SyncSender<Frame>, Receiver<Frame>) {
    sync_channel(capacity.max(1))
}

/// Shared stop request. Cloning shares the same flag.
#[derive(Clone, Debug, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Sleeps up to `duration`, waking early on a stop request.
    ///
    /// Returns true if a stop was requested.
    pub fn wait(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_requested() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            thread::sleep((deadline - now).min(Duration::from_millis(50)));
        }
    }
}

/// Shared pause flag. Acquisition skips polling while it is set; both
/// threads keep running.
#[derive(Clone, Debug, Default)]
pub struct PauseSignal(Arc<AtomicBool>);

impl PauseSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pause(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
