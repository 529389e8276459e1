//! Protocol module - Odin protocol definitions and packet codec.

pub mod constants;
pub mod packet;

pub use constants::*;
pub use packet::{
    ArgFrame, ArgResponse, ByteAck, Command, DecodeError, MagicAck, RawBuffer, ResponseShape,
};
