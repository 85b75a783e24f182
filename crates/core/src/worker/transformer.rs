use std::time::Duration;

use tracing::{debug, trace};

use super::backoff;
use crate::buffer::BoundedBuffer;
use crate::metrics::PipelineMetrics;
use crate::shutdown::ShutdownSignal;

/// Uppercase form of `ch` when it is a single character.
///
/// Characters whose uppercase expands to several characters (`ß` → `SS`)
/// are left unchanged, so a buffer slot always maps to exactly one slot.
pub fn uppercase(ch: char) -> char {
    let mut upper = ch.to_uppercase();
    match (upper.next(), upper.next()) {
        (Some(single), None) => single,
        _ => ch,
    }
}

/// Repeatedly uppercases whatever is in the buffer, in place.
///
/// A character may be seen by any number of passes before the packetizer
/// removes it; [`uppercase`] is idempotent so extra passes are no-ops.
pub struct Transformer<'a> {
    buffer: &'a BoundedBuffer,
    shutdown: &'a ShutdownSignal,
    metrics: &'a PipelineMetrics,
    poll_interval: Duration,
}

impl<'a> Transformer<'a> {
    pub fn new(
        buffer: &'a BoundedBuffer,
        shutdown: &'a ShutdownSignal,
        metrics: &'a PipelineMetrics,
    ) -> Self {
        Self {
            buffer,
            shutdown,
            metrics,
            poll_interval: Duration::ZERO,
        }
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Run passes until shutdown is requested and the buffer is empty, or
    /// until an abort. Returns the number of passes made.
    pub fn run(self) -> u64 {
        let mut passes = 0;

        loop {
            let pass = {
                let mut guard = self.buffer.lock();
                if guard.is_empty() {
                    None
                } else {
                    let changed = guard.transform_in_place(uppercase);
                    Some((changed, guard.contents()))
                }
            };

            match pass {
                Some((changed, contents)) => {
                    passes += 1;
                    self.metrics.record_transform_pass(changed);
                    trace!(changed, buffer = %contents, "transformer pass");
                }
                None => {
                    self.metrics.record_transformer_idle();
                    if self.shutdown.is_requested() {
                        break;
                    }
                    trace!("buffer empty, transformer backing off");
                }
            }

            if self.shutdown.is_aborted() {
                break;
            }
            backoff(self.poll_interval);
        }

        debug!(passes, "transformer finished");
        passes
    }
}
