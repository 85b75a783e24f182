//! Pipeline configuration and startup validation.
//!
//! Every limit imposed by the two-digit `PP:LL:` packet header is checked
//! here, before any worker starts. Nothing is truncated at emission time.

use std::time::Duration;

use crate::buffer::{DrainPolicy, DEFAULT_CAPACITY};
use crate::error::{ConfigError, InputError, Result};

/// Default number of characters per full packet.
pub const DEFAULT_CHUNK_SIZE: usize = 5;

/// Longest message the producer accepts, in characters.
pub const MAX_MESSAGE_LEN: usize = 255;

/// Largest value a two-digit header field can carry.
pub const MAX_FIELD_VALUE: usize = 99;

/// Tunable parameters for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Buffer capacity in characters
    pub buffer_capacity: usize,

    /// Characters per full packet
    pub chunk_size: usize,

    /// Backoff after finding the buffer full (producer) or empty (others),
    /// and between transformer/packetizer passes
    pub poll_interval: Duration,

    /// Producer pacing between consecutive characters
    pub produce_interval: Duration,

    /// Which characters the packetizer may take
    pub drain_policy: DrainPolicy,

    /// Upper bound on waiting for the buffer to drain once the producer is done
    pub drain_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_CAPACITY,
            chunk_size: DEFAULT_CHUNK_SIZE,
            poll_interval: Duration::from_millis(100),
            produce_interval: Duration::from_millis(100),
            drain_policy: DrainPolicy::Normalized,
            drain_timeout: Duration::from_secs(30),
        }
    }
}

impl PipelineConfig {
    /// Near-zero delays, for tests and batch use.
    pub fn fast() -> Self {
        Self {
            poll_interval: Duration::from_millis(1),
            produce_interval: Duration::ZERO,
            drain_timeout: Duration::from_secs(10),
            ..Self::default()
        }
    }

    pub fn with_capacity(mut self, buffer_capacity: usize) -> Self {
        self.buffer_capacity = buffer_capacity;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_produce_interval(mut self, produce_interval: Duration) -> Self {
        self.produce_interval = produce_interval;
        self
    }

    pub fn with_drain_policy(mut self, drain_policy: DrainPolicy) -> Self {
        self.drain_policy = drain_policy;
        self
    }

    pub fn with_drain_timeout(mut self, drain_timeout: Duration) -> Self {
        self.drain_timeout = drain_timeout;
        self
    }

    /// Check the message-independent parameters.
    ///
    /// # Errors
    /// - `ConfigError::ZeroCapacity` if the buffer could never accept a character
    /// - `ConfigError::ChunkSizeOutOfRange` if the chunk size is 0 or above 99
    /// - `ConfigError::DrainTimeoutTooShort` if the drain timeout cannot span
    ///   the two empty poll cycles that end a run
    pub fn validate(&self) -> Result<()> {
        if self.buffer_capacity == 0 {
            return Err(ConfigError::ZeroCapacity.into());
        }
        if self.chunk_size == 0 || self.chunk_size > MAX_FIELD_VALUE {
            return Err(ConfigError::ChunkSizeOutOfRange {
                chunk_size: self.chunk_size,
                max: MAX_FIELD_VALUE,
            }
            .into());
        }
        let min = self.poll_cycle() * 2;
        if self.drain_timeout < min {
            return Err(ConfigError::DrainTimeoutTooShort {
                timeout: self.drain_timeout,
                min,
            }
            .into());
        }
        Ok(())
    }

    /// Orchestrator poll period: the poll interval, but at least 1ms so a
    /// zero interval still spans a real cycle.
    pub fn poll_cycle(&self) -> Duration {
        self.poll_interval.max(Duration::from_millis(1))
    }

    /// Check that `message` can run through this configuration.
    ///
    /// # Errors
    /// - `InputError::TooLong` if the message exceeds 255 characters
    /// - any error from [`validate`](Self::validate)
    /// - `ConfigError::TooManyPackets` if numbering would pass 99
    pub fn validate_for(&self, message: &str) -> Result<()> {
        let message_len = message.chars().count();
        if message_len > MAX_MESSAGE_LEN {
            return Err(InputError::TooLong {
                len: message_len,
                max: MAX_MESSAGE_LEN,
            }
            .into());
        }

        self.validate()?;

        let packets = self.expected_packets(message_len);
        if packets > MAX_FIELD_VALUE + 1 {
            return Err(ConfigError::TooManyPackets {
                message_len,
                chunk_size: self.chunk_size,
                packets,
                max: MAX_FIELD_VALUE + 1,
            }
            .into());
        }
        Ok(())
    }

    /// Packets a message of `message_len` characters produces, counting the
    /// flushed partial chunk.
    pub fn expected_packets(&self, message_len: usize) -> usize {
        if self.chunk_size == 0 {
            return 0;
        }
        message_len.div_ceil(self.chunk_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.buffer_capacity, 12);
        assert_eq!(config.chunk_size, 5);
        assert_eq!(config.drain_policy, DrainPolicy::Normalized);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let config = PipelineConfig::fast().with_capacity(0);
        assert!(matches!(
            config.validate(),
            Err(Error::Config(ConfigError::ZeroCapacity))
        ));
    }

    #[test]
    fn test_chunk_size_bounds() {
        assert!(PipelineConfig::fast().with_chunk_size(1).validate().is_ok());
        assert!(PipelineConfig::fast().with_chunk_size(99).validate().is_ok());

        for chunk_size in [0, 100] {
            let result = PipelineConfig::fast().with_chunk_size(chunk_size).validate();
            assert!(matches!(
                result,
                Err(Error::Config(ConfigError::ChunkSizeOutOfRange { .. }))
            ));
        }
    }

    #[test]
    fn test_drain_timeout_must_span_two_cycles() {
        let result = PipelineConfig::fast()
            .with_drain_timeout(Duration::ZERO)
            .validate();
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::DrainTimeoutTooShort { .. }))
        ));

        // 1ms poll interval: 2ms is the shortest accepted timeout
        let config = PipelineConfig::fast();
        assert!(config.clone().with_drain_timeout(Duration::from_millis(2)).validate().is_ok());

        // a zero poll interval still counts as a 1ms cycle
        let config = config.with_poll_interval(Duration::ZERO);
        assert_eq!(config.poll_cycle(), Duration::from_millis(1));
        assert!(config.with_drain_timeout(Duration::from_micros(1500)).validate().is_err());

        let config = PipelineConfig::default().with_drain_timeout(Duration::from_millis(150));
        assert!(matches!(
            config.validate(),
            Err(Error::Config(ConfigError::DrainTimeoutTooShort { min, .. }))
                if min == Duration::from_millis(200)
        ));
    }

    #[test]
    fn test_message_too_long() {
        let message = "a".repeat(256);
        let result = PipelineConfig::fast().validate_for(&message);
        assert!(matches!(
            result,
            Err(Error::Input(InputError::TooLong { len: 256, max: 255 }))
        ));

        let message = "a".repeat(255);
        assert!(PipelineConfig::fast().validate_for(&message).is_ok());
    }

    #[test]
    fn test_length_counts_chars_not_bytes() {
        let message = "é".repeat(200);
        assert!(PipelineConfig::fast().validate_for(&message).is_ok());
    }

    #[test]
    fn test_too_many_packets() {
        // 255 chars at 2 per packet would need numbers up to 127
        let message = "a".repeat(255);
        let result = PipelineConfig::fast().with_chunk_size(2).validate_for(&message);
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::TooManyPackets { packets: 128, .. }))
        ));

        // exactly 100 packets numbered 00..=99 is fine
        let message = "a".repeat(200);
        assert!(PipelineConfig::fast().with_chunk_size(2).validate_for(&message).is_ok());
    }

    #[test]
    fn test_expected_packets() {
        let config = PipelineConfig::fast();
        assert_eq!(config.expected_packets(0), 0);
        assert_eq!(config.expected_packets(10), 2);
        assert_eq!(config.expected_packets(17), 4);
    }
}
