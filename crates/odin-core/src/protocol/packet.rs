//! Packet codec for Odin control frames.
//!
//! Outbound commands are encoded into fixed-size frames; inbound frames are
//! decoded against a [`ResponseShape`] chosen by the caller, so the expected
//! reply type is always known at the call site.

use byteorder::{ByteOrder, LittleEndian};
use std::fmt;
use thiserror::Error;

use super::constants::{CHUNK_SIZE, CMD_PACKET_SIZE, MAX_PKT_SIZE, PacketType};

/// Most arguments that fit in a control frame after the two header words.
pub const MAX_ARGS: usize = (CMD_PACKET_SIZE - 8) / 4;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Empty response frame")]
    Empty,

    #[error("Frame too short: expected {expected}, got {actual}")]
    TooShort { expected: usize, actual: usize },

    #[error("Packet type mismatch: expected 0x{expected:02X}, got 0x{actual:02X}")]
    PacketTypeMismatch { expected: u8, actual: i32 },

    #[error("Handshake mismatch: expected '{expected}', got '{actual}'")]
    MagicMismatch { expected: String, actual: String },

    #[error("Invalid transfer size: {0}")]
    InvalidSize(i32),
}

/// Outbound command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Raw magic bytes sent before any control packet.
    Handshake(&'static [u8; 4]),
    /// Typed control packet.
    Control {
        packet_type: PacketType,
        subcommand: u32,
        args: Vec<i32>,
    },
}

impl Command {
    /// Control packet without arguments.
    pub fn control(packet_type: PacketType, subcommand: u32) -> Self {
        Self::with_args(packet_type, subcommand, &[])
    }

    /// Control packet carrying integer arguments.
    pub fn with_args(packet_type: PacketType, subcommand: u32, args: &[i32]) -> Self {
        debug_assert!(args.len() <= MAX_ARGS, "too many control arguments");
        Self::Control {
            packet_type,
            subcommand,
            args: args.iter().take(MAX_ARGS).copied().collect(),
        }
    }

    /// Serialize into transport bytes.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Command::Handshake(magic) => magic.to_vec(),
            Command::Control {
                packet_type,
                subcommand,
                args,
            } => {
                let mut frame = vec![0u8; CMD_PACKET_SIZE];
                LittleEndian::write_i32(&mut frame[0..4], packet_type.code() as i32);
                LittleEndian::write_u32(&mut frame[4..8], *subcommand);
                for (slot, &arg) in frame[8..].chunks_exact_mut(4).zip(args) {
                    LittleEndian::write_i32(slot, arg);
                }
                frame
            }
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Handshake(magic) => write!(f, "{}", printable(&magic[..])),
            Command::Control {
                packet_type,
                subcommand,
                ..
            } => write!(f, "{}/0x{:02X}", packet_type, subcommand),
        }
    }
}

/// Describes the reply expected for an exchange and how to decode it.
pub trait ResponseShape {
    type Output;

    /// Maximum number of bytes to request from the transport.
    fn max_len(&self) -> usize {
        MAX_PKT_SIZE
    }

    /// Validate and decode one received frame.
    fn decode(&self, frame: &[u8]) -> Result<Self::Output, DecodeError>;
}

/// Handshake reply: the frame must start with the given magic.
#[derive(Debug, Clone, Copy)]
pub struct MagicAck(pub &'static [u8; 4]);

impl ResponseShape for MagicAck {
    type Output = ();

    fn decode(&self, frame: &[u8]) -> Result<(), DecodeError> {
        if frame.starts_with(self.0) {
            Ok(())
        } else {
            Err(DecodeError::MagicMismatch {
                expected: printable(self.0),
                actual: printable(&frame[..frame.len().min(8)]),
            })
        }
    }
}

/// Single status byte equal to a packet-type code.
#[derive(Debug, Clone, Copy)]
pub struct ByteAck(pub PacketType);

impl ResponseShape for ByteAck {
    type Output = ();

    fn decode(&self, frame: &[u8]) -> Result<(), DecodeError> {
        let status = *frame.first().ok_or(DecodeError::Empty)?;
        if status == self.0.code() {
            Ok(())
        } else {
            Err(DecodeError::PacketTypeMismatch {
                expected: self.0.code(),
                actual: status as i32,
            })
        }
    }
}

/// Packet type word followed by integer arguments.
#[derive(Debug, Clone, Copy)]
pub struct ArgResponse(pub PacketType);

/// Decoded argument response. Frames shorter than the packet type word plus
/// one argument are rejected, so `first` is always present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgFrame {
    pub packet_type: PacketType,
    /// First argument; the transfer size for query replies.
    pub first: i32,
    /// Remaining arguments, in wire order.
    pub rest: Vec<i32>,
}

impl ResponseShape for ArgResponse {
    type Output = ArgFrame;

    fn decode(&self, frame: &[u8]) -> Result<ArgFrame, DecodeError> {
        if frame.is_empty() {
            return Err(DecodeError::Empty);
        }
        if frame.len() < 8 {
            return Err(DecodeError::TooShort {
                expected: 8,
                actual: frame.len(),
            });
        }
        let packet_type = LittleEndian::read_i32(&frame[0..4]);
        if packet_type != self.0.code() as i32 {
            return Err(DecodeError::PacketTypeMismatch {
                expected: self.0.code(),
                actual: packet_type,
            });
        }
        Ok(ArgFrame {
            packet_type: self.0,
            first: LittleEndian::read_i32(&frame[4..8]),
            rest: frame[8..]
                .chunks_exact(4)
                .map(LittleEndian::read_i32)
                .collect(),
        })
    }
}

/// Raw chunk payload, returned verbatim.
#[derive(Debug, Clone, Copy)]
pub struct RawBuffer;

impl ResponseShape for RawBuffer {
    type Output = Vec<u8>;

    fn max_len(&self) -> usize {
        CHUNK_SIZE
    }

    fn decode(&self, frame: &[u8]) -> Result<Vec<u8>, DecodeError> {
        if frame.is_empty() {
            return Err(DecodeError::Empty);
        }
        Ok(frame.to_vec())
    }
}

/// ASCII rendering with non-printable bytes replaced by '.'.
pub(crate) fn printable(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| {
            if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '.'
            }
        })
        .collect()
}
