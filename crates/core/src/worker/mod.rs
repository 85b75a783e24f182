//! The three pipeline workers.
//!
//! Each worker borrows the shared buffer, shutdown signal and metrics, and
//! is driven to completion by [`Pipeline`](crate::pipeline::Pipeline) on its
//! own thread. None of them sleeps while holding the buffer lock.

mod packetizer;
mod producer;
mod transformer;

pub use packetizer::Packetizer;
pub use producer::Producer;
pub use transformer::{uppercase, Transformer};

use std::thread;
use std::time::Duration;

/// Sleep for one backoff interval; with a zero interval just yield.
fn backoff(interval: Duration) {
    if interval.is_zero() {
        thread::yield_now();
    } else {
        thread::sleep(interval);
    }
}
