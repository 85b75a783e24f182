//! Configuration for the packet-pipeline application.
//!
//! Handles parsing command-line arguments and resolving sensible defaults
//! (including a generation seed that is reproducible once printed).
//!
//! # Philosophy
//!
//! The tool should work with nothing but a message on stdin. Every timing and
//! sizing default matches the library defaults, and `--print-config` shows
//! the resolved values so runs can be repeated.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use clap::{Parser, ValueEnum};
use packet_pipeline_core::buffer::DEFAULT_CAPACITY;
use packet_pipeline_core::config::DEFAULT_CHUNK_SIZE;
use packet_pipeline_core::{DrainPolicy, PipelineConfig};

/// Command-line form of [`DrainPolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PolicyArg {
    /// Emit only characters the transformer has already uppercased
    Normalized,
    /// Emit whatever is in the buffer
    Immediate,
}

impl From<PolicyArg> for DrainPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Normalized => DrainPolicy::Normalized,
            PolicyArg::Immediate => DrainPolicy::Immediate,
        }
    }
}

/// Where the message to packetize comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    /// Given literally on the command line
    Message(String),
    /// Generated from a seed
    Generate { len: usize, seed: u64 },
    /// First line of standard input
    Stdin,
}

/// Complete configuration for one run.
#[derive(Debug, Clone, Parser)]
#[command(name = "packet-pipeline")]
#[command(about = "Uppercase a message and split it into PP:LL:message packets")]
pub struct Config {
    // === Input ===
    /// Message to send (default: first line of stdin)
    #[arg(long, short, conflicts_with = "generate")]
    pub message: Option<String>,

    /// Generate a random mixed-case message of this many characters
    #[arg(long, value_name = "LEN")]
    pub generate: Option<usize>,

    /// Seed for --generate (default: time-based)
    #[arg(long)]
    pub seed: Option<u64>,

    // === Buffer ===
    /// Buffer capacity in characters
    #[arg(long, default_value_t = DEFAULT_CAPACITY)]
    pub capacity: usize,

    /// Characters per full packet
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    // === Timing ===
    /// Backoff when the buffer is full or empty, in milliseconds
    #[arg(long, default_value_t = 100)]
    pub poll_ms: u64,

    /// Delay between produced characters, in milliseconds
    #[arg(long, default_value_t = 100)]
    pub produce_ms: u64,

    /// Which characters the packetizer may take
    #[arg(long, value_enum, default_value_t = PolicyArg::Normalized)]
    pub drain_policy: PolicyArg,

    /// Give up if the buffer has not drained this long after production ends
    #[arg(long, default_value_t = 30_000)]
    pub drain_timeout_ms: u64,

    // === Behavior ===
    /// Print the resolved configuration
    #[arg(long)]
    pub print_config: bool,

    /// Don't print the metrics summary
    #[arg(long)]
    pub no_metrics: bool,
}

impl Config {
    /// Fill in the generation seed when `--generate` was given without one.
    pub fn resolve(mut self) -> Self {
        if self.generate.is_some() && self.seed.is_none() {
            let seed = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or_default();
            self.seed = Some(seed);
        }
        self
    }

    pub fn input_source(&self) -> InputSource {
        match (&self.message, self.generate) {
            (Some(message), _) => InputSource::Message(message.clone()),
            (None, Some(len)) => InputSource::Generate {
                len,
                seed: self.seed.unwrap_or_default(),
            },
            (None, None) => InputSource::Stdin,
        }
    }

    /// Library configuration for these arguments. Validation happens when
    /// the pipeline is built.
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig::default()
            .with_capacity(self.capacity)
            .with_chunk_size(self.chunk_size)
            .with_poll_interval(Duration::from_millis(self.poll_ms))
            .with_produce_interval(Duration::from_millis(self.produce_ms))
            .with_drain_policy(self.drain_policy.into())
            .with_drain_timeout(Duration::from_millis(self.drain_timeout_ms))
    }

    /// Print the configuration in human-readable form.
    pub fn print(&self) {
        let pipeline = self.pipeline_config();

        println!("=== Configuration ===");
        match self.input_source() {
            InputSource::Message(message) => println!("Input: {:?}", message),
            InputSource::Generate { len, seed } => {
                println!("Input: generated, {} chars (seed {})", len, seed)
            }
            InputSource::Stdin => println!("Input: (first line of stdin)"),
        }
        println!();
        println!("=== Pipeline ===");
        println!("Buffer capacity: {} chars", pipeline.buffer_capacity);
        println!("Chunk size: {} chars", pipeline.chunk_size);
        println!("Poll interval: {} ms", pipeline.poll_interval.as_millis());
        println!("Produce interval: {} ms", pipeline.produce_interval.as_millis());
        println!("Drain policy: {}", pipeline.drain_policy);
        println!("Drain timeout: {} ms", pipeline.drain_timeout.as_millis());
        println!();
    }
}
