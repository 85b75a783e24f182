use std::time::Duration;

use tracing::{debug, trace, warn};

use super::backoff;
use crate::buffer::BoundedBuffer;
use crate::metrics::PipelineMetrics;
use crate::shutdown::ShutdownSignal;

/// Moves the message into the buffer one character at a time.
///
/// A full buffer is handled by releasing the lock, sleeping one poll
/// interval and retrying; the character is held by the producer meanwhile,
/// so nothing is ever dropped.
pub struct Producer<'a> {
    buffer: &'a BoundedBuffer,
    shutdown: &'a ShutdownSignal,
    metrics: &'a PipelineMetrics,
    message: &'a str,
    poll_interval: Duration,
    produce_interval: Duration,
}

impl<'a> Producer<'a> {
    pub fn new(
        buffer: &'a BoundedBuffer,
        shutdown: &'a ShutdownSignal,
        metrics: &'a PipelineMetrics,
        message: &'a str,
    ) -> Self {
        Self {
            buffer,
            shutdown,
            metrics,
            message,
            poll_interval: Duration::ZERO,
            produce_interval: Duration::ZERO,
        }
    }

    /// Backoff after finding the buffer full.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Pause after each character added.
    pub fn produce_interval(mut self, interval: Duration) -> Self {
        self.produce_interval = interval;
        self
    }

    /// Push every character, in order. Returns how many made it into the
    /// buffer, which is less than the message length only after an abort.
    pub fn run(self) -> usize {
        let mut produced = 0;

        'message: for ch in self.message.chars() {
            let mut pending = ch;
            loop {
                let added = {
                    let mut guard = self.buffer.lock();
                    match guard.add(pending) {
                        Ok(()) => Some(guard.len()),
                        Err(rejected) => {
                            pending = rejected;
                            None
                        }
                    }
                };

                if let Some(len) = added {
                    self.metrics.record_produced(len);
                    trace!(%ch, len, "producer added char");
                    break;
                }

                self.metrics.record_full_wait();
                debug!("buffer full, producer backing off");
                if self.shutdown.is_aborted() {
                    warn!(produced, "producer aborted with message partially produced");
                    break 'message;
                }
                backoff(self.poll_interval);
            }

            produced += 1;
            if !self.produce_interval.is_zero() {
                std::thread::sleep(self.produce_interval);
            }
        }

        debug!(produced, "producer finished");
        produced
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_produces_whole_message_when_room() {
        let buffer = BoundedBuffer::new(12);
        let shutdown = ShutdownSignal::new();
        let metrics = PipelineMetrics::new();

        let produced = Producer::new(&buffer, &shutdown, &metrics, "hello").run();

        assert_eq!(produced, 5);
        assert_eq!(buffer.lock().contents(), "hello");
        assert_eq!(metrics.snapshot().buffer_high_water, 5);
    }

    #[test]
    fn test_waits_for_room_without_dropping() {
        let buffer = BoundedBuffer::new(3);
        let shutdown = ShutdownSignal::new();
        let metrics = PipelineMetrics::new();

        let drained = thread::scope(|scope| {
            let consumer = scope.spawn(|| {
                let mut seen = String::new();
                while seen.len() < 8 {
                    if let Some(ch) = buffer.lock().remove_front() {
                        seen.push(ch);
                    }
                    thread::sleep(Duration::from_millis(1));
                }
                seen
            });

            let produced = Producer::new(&buffer, &shutdown, &metrics, "abcdefgh")
                .poll_interval(Duration::from_millis(1))
                .run();
            assert_eq!(produced, 8);

            consumer.join().unwrap()
        });

        assert_eq!(drained, "abcdefgh");
        let snapshot = metrics.snapshot();
        assert!(snapshot.buffer_high_water <= 3);
    }

    #[test]
    fn test_abort_while_full_leaves_prefix() {
        let buffer = BoundedBuffer::new(2);
        let shutdown = ShutdownSignal::new();
        let metrics = PipelineMetrics::new();
        shutdown.abort();

        let produced = Producer::new(&buffer, &shutdown, &metrics, "abcd").run();

        assert_eq!(produced, 2);
        assert_eq!(buffer.lock().contents(), "ab");
        assert_eq!(metrics.snapshot().producer_full_waits, 1);
    }

    #[test]
    fn test_empty_message() {
        let buffer = BoundedBuffer::new(2);
        let shutdown = ShutdownSignal::new();
        let metrics = PipelineMetrics::new();

        assert_eq!(Producer::new(&buffer, &shutdown, &metrics, "").run(), 0);
        assert!(buffer.is_empty());
    }
}
