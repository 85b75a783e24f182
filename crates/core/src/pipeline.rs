//! Orchestration of one pipeline run.
//!
//! # Lifecycle
//!
//! 1. Validate the configuration against the message (no thread starts on
//!    invalid input)
//! 2. Start transformer, packetizer and producer on scoped threads sharing
//!    one [`BoundedBuffer`]
//! 3. Join the producer
//! 4. Poll until the buffer has been seen empty on two consecutive poll
//!    cycles, bounded by the drain timeout
//! 5. Signal shutdown and join the transformer and the packetizer, which
//!    flushes its partial chunk on the way out
//!
//! A worker panic or a drain timeout aborts the remaining workers; every
//! thread is joined before `run` returns.

use std::thread::{self, ScopedJoinHandle};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::buffer::BoundedBuffer;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::metrics::{MetricsSnapshot, PipelineMetrics};
use crate::packet::Packet;
use crate::shutdown::ShutdownSignal;
use crate::sink::PacketSink;
use crate::worker::{Packetizer, Producer, Transformer};

/// Consecutive empty observations needed before shutdown is signalled.
const EMPTY_CYCLES_BEFORE_SHUTDOWN: u32 = 2;

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Characters the producer moved into the buffer
    pub chars_produced: usize,

    /// Packets handed to the sink
    pub packets_emitted: usize,

    /// Transformer passes over a non-empty buffer
    pub transformer_passes: u64,

    /// Counters collected during the run
    pub metrics: MetricsSnapshot,
}

/// How waiting for the buffer to drain ended.
enum Drain {
    Drained,
    TimedOut { remaining: usize },
    WorkerExited,
}

/// A validated pipeline configuration, ready to run messages.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// # Errors
    /// Any [`ConfigError`](crate::error::ConfigError) from
    /// [`PipelineConfig::validate`].
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run `message` through the pipeline, emitting packets into `sink`.
    ///
    /// # Errors
    /// - `InputError::TooLong` / `ConfigError::TooManyPackets` before any
    ///   worker starts
    /// - `PipelineError::WorkerPanicked` if a worker panicked
    /// - `PipelineError::DrainTimeout` if the buffer never drained
    pub fn run<S>(&self, message: &str, sink: S) -> Result<RunReport>
    where
        S: PacketSink + Send,
    {
        self.config.validate_for(message)?;

        let buffer = BoundedBuffer::new(self.config.buffer_capacity);
        let shutdown = ShutdownSignal::new();
        let metrics = PipelineMetrics::new();

        info!(
            chars = message.chars().count(),
            capacity = self.config.buffer_capacity,
            chunk_size = self.config.chunk_size,
            policy = %self.config.drain_policy,
            "pipeline starting"
        );

        let outcome = thread::scope(|scope| -> Result<(usize, u64, usize)> {
            let transformer = Transformer::new(&buffer, &shutdown, &metrics)
                .poll_interval(self.config.poll_interval);
            let transformer = spawn(scope, "transformer", move || transformer.run())
                .inspect_err(|_| shutdown.abort())?;

            let packetizer =
                Packetizer::new(&buffer, &shutdown, &metrics, sink, self.config.chunk_size)
                    .drain_policy(self.config.drain_policy)
                    .poll_interval(self.config.poll_interval);
            let packetizer = spawn(scope, "packetizer", move || packetizer.run())
                .inspect_err(|_| shutdown.abort())?;

            let producer = Producer::new(&buffer, &shutdown, &metrics, message)
                .poll_interval(self.config.poll_interval)
                .produce_interval(self.config.produce_interval);
            let producer = spawn(scope, "producer", move || producer.run())
                .inspect_err(|_| shutdown.abort())?;

            let worker_exited = || transformer.is_finished() || packetizer.is_finished();
            self.await_producer(&producer, &shutdown, worker_exited);

            let produced = match join(producer, "producer") {
                Ok(produced) => produced,
                Err(err) => {
                    shutdown.abort();
                    let _ = join(transformer, "transformer");
                    let _ = join(packetizer, "packetizer");
                    return Err(err.into());
                }
            };

            let drain = if shutdown.is_aborted() {
                Drain::WorkerExited
            } else {
                self.await_drain(&buffer, worker_exited)
            };
            match drain {
                Drain::Drained => shutdown.finish(),
                Drain::TimedOut { .. } | Drain::WorkerExited => shutdown.abort(),
            }

            let passes = join(transformer, "transformer");
            let packets = join(packetizer, "packetizer");
            let passes = passes?;
            let packets = packets??;

            if let Drain::TimedOut { remaining } = drain {
                return Err(PipelineError::DrainTimeout {
                    timeout: self.config.drain_timeout,
                    remaining,
                }
                .into());
            }

            Ok((produced, passes, packets))
        });

        metrics.complete();
        let (chars_produced, transformer_passes, packets_emitted) = outcome?;

        info!(chars_produced, packets_emitted, "pipeline finished");

        Ok(RunReport {
            chars_produced,
            packets_emitted,
            transformer_passes,
            metrics: metrics.snapshot(),
        })
    }

    /// Run `message` and collect the emitted packets.
    pub fn collect(&self, message: &str) -> Result<Vec<Packet>> {
        let mut packets = Vec::new();
        self.run(message, &mut packets)?;
        Ok(packets)
    }

    /// Wait for the producer to finish, aborting the run if a downstream
    /// worker dies first (the producer could otherwise wait on a full
    /// buffer forever).
    fn await_producer<T, F>(
        &self,
        producer: &ScopedJoinHandle<'_, T>,
        shutdown: &ShutdownSignal,
        worker_exited: F,
    ) where
        F: Fn() -> bool,
    {
        while !producer.is_finished() {
            if worker_exited() && !shutdown.is_aborted() {
                warn!("worker exited while the producer was running");
                shutdown.abort();
            }
            thread::sleep(self.config.poll_cycle());
        }
    }

    /// Wait until the buffer is observed empty on consecutive poll cycles.
    ///
    /// Reaching the deadline with an empty buffer still counts as drained;
    /// only characters left behind make it a timeout.
    fn await_drain<F>(&self, buffer: &BoundedBuffer, worker_exited: F) -> Drain
    where
        F: Fn() -> bool,
    {
        let deadline = Instant::now() + self.config.drain_timeout;
        let cycle = self.config.poll_cycle();
        let mut empty_cycles = 0;

        loop {
            let remaining = buffer.len();
            if remaining == 0 {
                empty_cycles += 1;
                if empty_cycles >= EMPTY_CYCLES_BEFORE_SHUTDOWN {
                    debug!("buffer drained, signalling shutdown");
                    return Drain::Drained;
                }
            } else {
                empty_cycles = 0;
            }

            if worker_exited() {
                warn!("worker exited before shutdown was requested");
                return Drain::WorkerExited;
            }

            if Instant::now() >= deadline {
                if remaining == 0 {
                    debug!("buffer empty at drain deadline, signalling shutdown");
                    return Drain::Drained;
                }
                warn!(remaining, "buffer did not drain before timeout");
                return Drain::TimedOut { remaining };
            }

            thread::sleep(cycle);
        }
    }
}

fn spawn<'scope, 'env, T, F>(
    scope: &'scope thread::Scope<'scope, 'env>,
    worker: &'static str,
    f: F,
) -> std::result::Result<ScopedJoinHandle<'scope, T>, PipelineError>
where
    F: FnOnce() -> T + Send + 'scope,
    T: Send + 'scope,
{
    thread::Builder::new()
        .name(worker.to_string())
        .spawn_scoped(scope, f)
        .map_err(|e| PipelineError::Spawn {
            worker,
            reason: e.to_string(),
        })
}

fn join<T>(
    handle: ScopedJoinHandle<'_, T>,
    worker: &'static str,
) -> std::result::Result<T, PipelineError> {
    handle
        .join()
        .map_err(|_| PipelineError::WorkerPanicked(worker))
}
