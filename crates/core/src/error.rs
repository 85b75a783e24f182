//! Error types for the packet pipeline.
//!
//! Everything that can go wrong is detected either before the workers start
//! (configuration, input) or reported when the run is joined (pipeline).
//! Buffer overflow is not an error: `add` hands the character back instead.

use std::time::Duration;

use thiserror::Error;

/// Top-level error type for all operations in the pipeline.
///
/// Each variant corresponds to a specific failure domain:
/// - Config: parameters that would break the two-digit wire framing
/// - Input: messages the producer must never see
/// - Packet: wire-form construction or parsing failures
/// - Pipeline: worker lifecycle failures (panics, drain timeout)
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid pipeline configuration
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Input message rejected before the run
    #[error("input error: {0}")]
    Input(#[from] InputError),

    /// Packet framing error
    #[error("packet error: {0}")]
    Packet(#[from] PacketError),

    /// Worker lifecycle error
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
}

/// Configuration errors, detected at startup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Buffer must hold at least one character
    #[error("buffer capacity must be at least 1")]
    ZeroCapacity,

    /// Chunk size must be in 1..=99 to fit the two-digit length field
    #[error("chunk size {chunk_size} outside 1..={max}")]
    ChunkSizeOutOfRange { chunk_size: usize, max: usize },

    /// The message would produce more packets than two digits can number
    #[error("message of {message_len} chars at chunk size {chunk_size} needs {packets} packets, max {max}")]
    TooManyPackets {
        message_len: usize,
        chunk_size: usize,
        packets: usize,
        max: usize,
    },

    /// Draining must be allowed at least two poll cycles
    #[error("drain timeout {timeout:?} is shorter than two poll cycles ({min:?})")]
    DrainTimeoutTooShort { timeout: Duration, min: Duration },
}

/// Input message errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    /// Message exceeds the maximum accepted length
    #[error("message is {len} chars, max {max}")]
    TooLong { len: usize, max: usize },
}

/// Packet framing errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PacketError {
    /// Packet number does not fit in two decimal digits
    #[error("packet number {0} exceeds 99")]
    NumberOutOfRange(usize),

    /// Message length does not fit in two decimal digits
    #[error("message length {0} exceeds 99")]
    LengthOutOfRange(usize),

    /// Wire form is missing a separator or a field
    #[error("malformed packet: {0:?}")]
    Malformed(String),

    /// A header field is not a two-digit decimal number
    #[error("invalid {field} field: {value:?}")]
    InvalidField { field: &'static str, value: String },

    /// Length field disagrees with the message payload
    #[error("length mismatch: header says {expected}, message has {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// Packet numbers are not contiguous from zero
    #[error("out of sequence: expected packet {expected}, got {actual}")]
    OutOfSequence { expected: usize, actual: usize },
}

/// Worker lifecycle errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PipelineError {
    /// A worker thread could not be spawned
    #[error("failed to spawn {worker} worker: {reason}")]
    Spawn { worker: &'static str, reason: String },

    /// A worker thread panicked
    #[error("{0} worker panicked")]
    WorkerPanicked(&'static str),

    /// The buffer did not drain within the configured timeout
    #[error("buffer did not drain within {timeout:?} ({remaining} chars left)")]
    DrainTimeout { timeout: Duration, remaining: usize },
}

/// Type alias for Result with our Error type
pub type Result<T> = std::result::Result<T, Error>;
