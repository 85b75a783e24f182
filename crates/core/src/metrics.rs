//! Metrics collection and reporting for a pipeline run.
//!
//! This module provides observable insights into worker behavior:
//! - Characters moved through the buffer
//! - How often each worker found the buffer unusable and backed off
//! - Transformer passes and characters actually changed
//! - Packets emitted, including the flushed partial packet
//! - The buffer's high-water mark
//!
//! # Thread Safety
//!
//! `PipelineMetrics` is updated concurrently by all three workers through
//! relaxed atomics. Counters are only read as a whole through [`snapshot`],
//! after the workers have been joined.
//!
//! [`snapshot`]: PipelineMetrics::snapshot

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

/// Live counters shared by the workers of one run.
#[derive(Debug)]
pub struct PipelineMetrics {
    start_time: Instant,
    elapsed: OnceLock<Duration>,

    chars_produced: AtomicU64,
    producer_full_waits: AtomicU64,
    transformer_passes: AtomicU64,
    chars_changed: AtomicU64,
    transformer_empty_polls: AtomicU64,
    packetizer_empty_polls: AtomicU64,
    chars_drained: AtomicU64,
    packets_emitted: AtomicU64,
    packets_flushed: AtomicU64,
    buffer_high_water: AtomicUsize,
}

impl PipelineMetrics {
    /// Create new metrics with start time set to now.
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            elapsed: OnceLock::new(),
            chars_produced: AtomicU64::new(0),
            producer_full_waits: AtomicU64::new(0),
            transformer_passes: AtomicU64::new(0),
            chars_changed: AtomicU64::new(0),
            transformer_empty_polls: AtomicU64::new(0),
            packetizer_empty_polls: AtomicU64::new(0),
            chars_drained: AtomicU64::new(0),
            packets_emitted: AtomicU64::new(0),
            packets_flushed: AtomicU64::new(0),
            buffer_high_water: AtomicUsize::new(0),
        }
    }

    /// Freeze the run duration. Later calls are ignored.
    pub fn complete(&self) {
        let _ = self.elapsed.set(self.start_time.elapsed());
    }

    /// Record one character added; `buffer_len` is the length right after.
    pub fn record_produced(&self, buffer_len: usize) {
        self.chars_produced.fetch_add(1, Ordering::Relaxed);
        self.buffer_high_water.fetch_max(buffer_len, Ordering::Relaxed);
    }

    pub fn record_full_wait(&self) {
        self.producer_full_waits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_transform_pass(&self, changed: usize) {
        self.transformer_passes.fetch_add(1, Ordering::Relaxed);
        self.chars_changed.fetch_add(changed as u64, Ordering::Relaxed);
    }

    pub fn record_transformer_idle(&self) {
        self.transformer_empty_polls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_packetizer_idle(&self) {
        self.packetizer_empty_polls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_drained(&self, count: usize) {
        self.chars_drained.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Record an emitted packet; `flushed` marks the short packet from a flush.
    pub fn record_packet(&self, flushed: bool) {
        self.packets_emitted.fetch_add(1, Ordering::Relaxed);
        if flushed {
            self.packets_flushed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Point-in-time copy of every counter.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            duration: self
                .elapsed
                .get()
                .copied()
                .unwrap_or_else(|| self.start_time.elapsed()),
            chars_produced: self.chars_produced.load(Ordering::Relaxed),
            producer_full_waits: self.producer_full_waits.load(Ordering::Relaxed),
            transformer_passes: self.transformer_passes.load(Ordering::Relaxed),
            chars_changed: self.chars_changed.load(Ordering::Relaxed),
            transformer_empty_polls: self.transformer_empty_polls.load(Ordering::Relaxed),
            packetizer_empty_polls: self.packetizer_empty_polls.load(Ordering::Relaxed),
            chars_drained: self.chars_drained.load(Ordering::Relaxed),
            packets_emitted: self.packets_emitted.load(Ordering::Relaxed),
            packets_flushed: self.packets_flushed.load(Ordering::Relaxed),
            buffer_high_water: self.buffer_high_water.load(Ordering::Relaxed),
        }
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Frozen copy of [`PipelineMetrics`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Wall time of the run (or elapsed so far if not complete)
    pub duration: Duration,

    /// Characters the producer added to the buffer
    pub chars_produced: u64,

    /// Times the producer found the buffer full and backed off
    pub producer_full_waits: u64,

    /// Transformer passes over a non-empty buffer
    pub transformer_passes: u64,

    /// Characters whose value a transformer pass changed
    pub chars_changed: u64,

    /// Transformer polls that found the buffer empty
    pub transformer_empty_polls: u64,

    /// Packetizer polls that found the buffer empty
    pub packetizer_empty_polls: u64,

    /// Characters the packetizer removed from the buffer
    pub chars_drained: u64,

    /// Packets emitted, including the flushed one
    pub packets_emitted: u64,

    /// Short packets emitted by a flush (0 or 1)
    pub packets_flushed: u64,

    /// Largest buffer length observed after an add
    pub buffer_high_water: usize,
}

impl MetricsSnapshot {
    /// Characters still unaccounted for (produced but never drained).
    pub fn chars_in_flight(&self) -> u64 {
        self.chars_produced.saturating_sub(self.chars_drained)
    }

    /// Print a human-readable summary to stdout.
    pub fn print_summary(&self) {
        println!("\n=== Pipeline Summary ===");
        println!("Duration: {} ms", self.duration.as_millis());
        println!();

        println!("=== Producer ===");
        println!("Characters produced: {}", self.chars_produced);
        println!("Full-buffer waits: {}", self.producer_full_waits);
        println!("Buffer high-water mark: {}", self.buffer_high_water);
        println!();

        println!("=== Transformer ===");
        println!("Passes: {}", self.transformer_passes);
        println!("Characters changed: {}", self.chars_changed);
        println!("Empty polls: {}", self.transformer_empty_polls);
        println!();

        println!("=== Packetizer ===");
        println!("Characters drained: {}", self.chars_drained);
        println!("Packets emitted: {}", self.packets_emitted);
        println!("Flushed packets: {}", self.packets_flushed);
        println!("Empty polls: {}", self.packetizer_empty_polls);
        println!();
    }

    /// Export metrics as a simple `key=value` text format (for parsing/testing).
    pub fn export_text(&self) -> String {
        format!(
            "duration_ms={}\n\
             chars_produced={}\n\
             producer_full_waits={}\n\
             buffer_high_water={}\n\
             transformer_passes={}\n\
             chars_changed={}\n\
             chars_drained={}\n\
             packets_emitted={}\n\
             packets_flushed={}\n",
            self.duration.as_millis(),
            self.chars_produced,
            self.producer_full_waits,
            self.buffer_high_water,
            self.transformer_passes,
            self.chars_changed,
            self.chars_drained,
            self.packets_emitted,
            self.packets_flushed,
        )
    }
}
