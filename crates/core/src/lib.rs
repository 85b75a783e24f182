//! packet-pipeline-core: a three-stage concurrent pipeline turning a message
//! into numbered, length-prefixed packets.
//!
//! This library provides the core components:
//! - A producer feeding message characters into a small shared buffer
//! - A transformer uppercasing buffer contents in place
//! - A packetizer draining the buffer into fixed-size packets
//!
//! # Architecture
//!
//! The system is designed around clear module boundaries:
//! - `buffer`: fixed-capacity, lock-guarded character FIFO
//! - `worker`: producer, transformer and packetizer loops
//! - `packet`: `PP:LL:message` wire format and reassembly
//! - `sink`: where emitted packets go
//! - `pipeline`: thread orchestration and cooperative shutdown
//! - `config`: tunables and startup validation
//! - `metrics`: observable worker behavior
//!
//! # Design Principles
//!
//! - **One lock**: the buffer's mutex is the only synchronization between
//!   workers; nobody sleeps while holding it
//! - **Polling, not signalling**: workers back off for a fixed interval when
//!   the buffer is unusable, so there is no wakeup to miss
//! - **Nothing dropped**: a full buffer hands characters back to the producer
//! - **Validated up front**: limits of the two-digit header are checked
//!   before any thread starts

pub mod buffer;
pub mod config;
pub mod error;
pub mod metrics;
pub mod packet;
pub mod pipeline;
pub mod shutdown;
pub mod sink;
pub mod worker;

// Re-export commonly used types
pub use buffer::{BoundedBuffer, DrainPolicy};
pub use config::PipelineConfig;
pub use error::{Error, Result};
pub use packet::{reassemble, Packet};
pub use pipeline::{Pipeline, RunReport};
pub use sink::PacketSink;
