//! Cooperative shutdown signal checked by the workers every poll cycle.
//!
//! The signal only ever moves forward: running, then draining, then aborted.

use std::sync::atomic::{AtomicU8, Ordering};

const RUNNING: u8 = 0;
const DRAINING: u8 = 1;
const ABORTED: u8 = 2;

/// Shared flag telling the transformer and packetizer when to stop.
///
/// - `finish`: the producer is done and the buffer has drained; workers
///   exit the next time they observe an empty buffer.
/// - `abort`: stop as soon as possible, whatever is left in the buffer.
#[derive(Debug, Default)]
pub struct ShutdownSignal {
    state: AtomicU8,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(RUNNING),
        }
    }

    /// Request a graceful stop once the buffer is empty.
    pub fn finish(&self) {
        self.state.fetch_max(DRAINING, Ordering::AcqRel);
    }

    /// Request an immediate stop.
    pub fn abort(&self) {
        self.state.fetch_max(ABORTED, Ordering::AcqRel);
    }

    /// Whether any kind of stop has been requested.
    pub fn is_requested(&self) -> bool {
        self.state.load(Ordering::Acquire) >= DRAINING
    }

    pub fn is_aborted(&self) -> bool {
        self.state.load(Ordering::Acquire) == ABORTED
    }
}
