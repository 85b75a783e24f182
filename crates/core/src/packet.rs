//! Packet format, parsing, and reassembly.
//!
//! The packetizer groups characters drained from the buffer into packets.
//! Each packet carries:
//! - A sequence number identifying its position in the run
//! - A slice of the original message
//!
//! # Wire Format
//!
//! ```text
//! PP:LL:message
//! ```
//!
//! - `PP`: packet number, two-digit zero-padded decimal (first packet is `00`)
//! - `LL`: character count of `message`, two-digit zero-padded decimal
//! - `message`: the payload characters, which may themselves contain `:`
//!
//! # Reassembly
//!
//! Concatenating the messages of all packets in number order reproduces the
//! (transformed) input, so [`reassemble`] validates numbering is contiguous
//! from zero before joining.

use std::fmt;
use std::str::FromStr;

use crate::config::MAX_FIELD_VALUE;
use crate::error::{Error, PacketError, Result};

/// Width of each numeric header field.
const FIELD_WIDTH: usize = 2;

/// Header separator.
const SEPARATOR: char = ':';

/// A numbered fragment of the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    packet_number: usize,
    message: String,
    message_length: usize,
}

impl Packet {
    /// Create a packet, checking both header fields fit in two digits.
    ///
    /// # Errors
    /// - `PacketError::NumberOutOfRange` if `packet_number > 99`
    /// - `PacketError::LengthOutOfRange` if the message has more than 99 chars
    pub fn new(packet_number: usize, message: impl Into<String>) -> Result<Self> {
        let message = message.into();
        let message_length = message.chars().count();

        if packet_number > MAX_FIELD_VALUE {
            return Err(PacketError::NumberOutOfRange(packet_number).into());
        }
        if message_length > MAX_FIELD_VALUE {
            return Err(PacketError::LengthOutOfRange(message_length).into());
        }

        Ok(Self {
            packet_number,
            message,
            message_length,
        })
    }

    pub fn packet_number(&self) -> usize {
        self.packet_number
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Number of characters in the message.
    pub fn message_length(&self) -> usize {
        self.message_length
    }

    /// Wire form: `PP:LL:message`.
    pub fn serialize(&self) -> String {
        self.to_string()
    }

    /// Parse a packet from its wire form.
    ///
    /// # Errors
    /// - `PacketError::Malformed` if a separator is missing
    /// - `PacketError::InvalidField` if a header field is not two decimal digits
    /// - `PacketError::LengthMismatch` if `LL` disagrees with the message
    pub fn parse(wire: &str) -> Result<Self> {
        let mut parts = wire.splitn(3, SEPARATOR);
        let (Some(number), Some(length), Some(message)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(PacketError::Malformed(wire.to_string()).into());
        };

        let packet_number = parse_field("packet number", number)?;
        let expected = parse_field("length", length)?;

        let actual = message.chars().count();
        if expected != actual {
            return Err(PacketError::LengthMismatch { expected, actual }.into());
        }

        Self::new(packet_number, message)
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:0width$}{sep}{:0width$}{sep}{}",
            self.packet_number,
            self.message_length,
            self.message,
            width = FIELD_WIDTH,
            sep = SEPARATOR,
        )
    }
}

impl FromStr for Packet {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn parse_field(field: &'static str, value: &str) -> Result<usize> {
    let valid = value.len() == FIELD_WIDTH && value.bytes().all(|b| b.is_ascii_digit());
    if !valid {
        return Err(PacketError::InvalidField {
            field,
            value: value.to_string(),
        }
        .into());
    }
    value.parse::<usize>().map_err(|_| {
        Error::from(PacketError::InvalidField {
            field,
            value: value.to_string(),
        })
    })
}

/// Join packet messages back into the message they were cut from.
///
/// # Errors
/// `PacketError::OutOfSequence` if numbers are not exactly 0, 1, 2, … in order.
pub fn reassemble(packets: &[Packet]) -> Result<String> {
    let mut message = String::with_capacity(packets.iter().map(|p| p.message.len()).sum());

    for (expected, packet) in packets.iter().enumerate() {
        if packet.packet_number != expected {
            return Err(PacketError::OutOfSequence {
                expected,
                actual: packet.packet_number,
            }
            .into());
        }
        message.push_str(&packet.message);
    }

    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_form() {
        let packet = Packet::new(0, "HELLO").unwrap();
        assert_eq!(packet.serialize(), "00:05:HELLO");

        let packet = Packet::new(3, "AM").unwrap();
        assert_eq!(packet.to_string(), "03:02:AM");
        assert_eq!(packet.message_length(), 2);
    }

    #[test]
    fn test_parse() {
        let packet = Packet::parse("12:03:ABC").unwrap();
        assert_eq!(packet.packet_number(), 12);
        assert_eq!(packet.message(), "ABC");
        assert_eq!(packet.message_length(), 3);
    }

    #[test]
    fn test_parse_message_with_separator() {
        let packet: Packet = "01:03:A:B".parse().unwrap();
        assert_eq!(packet.message(), "A:B");
    }

    #[test]
    fn test_parse_empty_message() {
        let packet = Packet::parse("00:00:").unwrap();
        assert_eq!(packet.message(), "");
    }

    #[test]
    fn test_number_out_of_range() {
        let result = Packet::new(100, "X");
        assert!(matches!(
            result,
            Err(Error::Packet(PacketError::NumberOutOfRange(100)))
        ));
    }

    #[test]
    fn test_length_out_of_range() {
        let result = Packet::new(0, "x".repeat(100));
        assert!(matches!(
            result,
            Err(Error::Packet(PacketError::LengthOutOfRange(100)))
        ));
    }

    #[test]
    fn test_parse_malformed() {
        assert!(matches!(
            Packet::parse("00:05"),
            Err(Error::Packet(PacketError::Malformed(_)))
        ));
    }

    #[test]
    fn test_parse_invalid_fields() {
        for wire in ["0:01:A", "000:01:A", "ab:01:A", "00:+1:A", "00: 1:A"] {
            assert!(
                matches!(
                    Packet::parse(wire),
                    Err(Error::Packet(PacketError::InvalidField { .. }))
                ),
                "expected invalid field for {wire:?}"
            );
        }
    }

    #[test]
    fn test_parse_length_mismatch() {
        assert!(matches!(
            Packet::parse("00:04:ABC"),
            Err(Error::Packet(PacketError::LengthMismatch {
                expected: 4,
                actual: 3
            }))
        ));
    }

    #[test]
    fn test_reassemble() {
        let packets = vec![
            Packet::new(0, "HELLO").unwrap(),
            Packet::new(1, "WORLD").unwrap(),
            Packet::new(2, "!").unwrap(),
        ];
        assert_eq!(reassemble(&packets).unwrap(), "HELLOWORLD!");
    }

    #[test]
    fn test_reassemble_empty() {
        assert_eq!(reassemble(&[]).unwrap(), "");
    }

    #[test]
    fn test_reassemble_gap() {
        let packets = vec![
            Packet::new(0, "AB").unwrap(),
            Packet::new(2, "CD").unwrap(), // Missing packet 1
        ];
        assert!(matches!(
            reassemble(&packets),
            Err(Error::Packet(PacketError::OutOfSequence {
                expected: 1,
                actual: 2
            }))
        ));
    }
}
