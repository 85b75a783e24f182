use std::time::Duration;

use tracing::{debug, info, trace};

use super::backoff;
use crate::buffer::{BoundedBuffer, DrainPolicy};
use crate::error::Result;
use crate::metrics::PipelineMetrics;
use crate::packet::Packet;
use crate::shutdown::ShutdownSignal;
use crate::sink::PacketSink;

/// Drains the buffer into fixed-size chunks and emits one packet per chunk.
///
/// Characters are removed under the lock; packets are built and handed to
/// the sink after the lock is released. Only this worker emits, so sink
/// order is packet-number order.
pub struct Packetizer<'a, S> {
    buffer: &'a BoundedBuffer,
    shutdown: &'a ShutdownSignal,
    metrics: &'a PipelineMetrics,
    sink: S,
    chunk_size: usize,
    policy: DrainPolicy,
    poll_interval: Duration,

    accumulator: String,
    accumulated: usize,
    next_number: usize,
}

impl<'a, S: PacketSink> Packetizer<'a, S> {
    /// `chunk_size` must be non-zero; [`PipelineConfig::validate`] checks it.
    ///
    /// [`PipelineConfig::validate`]: crate::config::PipelineConfig::validate
    pub fn new(
        buffer: &'a BoundedBuffer,
        shutdown: &'a ShutdownSignal,
        metrics: &'a PipelineMetrics,
        sink: S,
        chunk_size: usize,
    ) -> Self {
        Self {
            buffer,
            shutdown,
            metrics,
            sink,
            chunk_size,
            policy: DrainPolicy::default(),
            poll_interval: Duration::ZERO,
            accumulator: String::new(),
            accumulated: 0,
            next_number: 0,
        }
    }

    pub fn drain_policy(mut self, policy: DrainPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Packetize until shutdown is requested and the buffer is empty (or an
    /// abort), then flush. Returns the number of packets emitted.
    ///
    /// # Errors
    /// A packet whose number or length would not fit two digits. Startup
    /// validation makes this unreachable for validated configurations.
    pub fn run(mut self) -> Result<usize> {
        loop {
            let drained = {
                let mut guard = self.buffer.lock();
                if guard.is_empty() {
                    None
                } else {
                    Some(guard.drain(self.policy))
                }
            };

            match drained {
                Some(chars) => {
                    self.metrics.record_drained(chars.len());
                    for ch in chars {
                        self.push(ch)?;
                    }
                }
                None => {
                    self.metrics.record_packetizer_idle();
                    if self.shutdown.is_requested() {
                        break;
                    }
                    trace!("buffer empty, packetizer backing off");
                }
            }

            if self.shutdown.is_aborted() {
                break;
            }
            backoff(self.poll_interval);
        }

        self.flush()?;
        debug!(packets = self.next_number, "packetizer finished");
        Ok(self.next_number)
    }

    fn push(&mut self, ch: char) -> Result<()> {
        self.accumulator.push(ch);
        self.accumulated += 1;
        if self.accumulated == self.chunk_size {
            self.emit(false)?;
        }
        Ok(())
    }

    /// Emit the partial chunk, if any, as a final short packet.
    fn flush(&mut self) -> Result<()> {
        if self.accumulated > 0 {
            self.emit(true)?;
        }
        Ok(())
    }

    fn emit(&mut self, flushed: bool) -> Result<()> {
        let message = std::mem::take(&mut self.accumulator);
        self.accumulated = 0;

        let packet = Packet::new(self.next_number, message)?;
        self.next_number += 1;

        info!(packet = %packet, flushed, "packet emitted");
        self.metrics.record_packet(flushed);
        self.sink.emit(packet);
        Ok(())
    }
}
