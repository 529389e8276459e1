//! Protocol constants for the Odin/Loke download-mode protocol.

use std::fmt;

// ============================================================================
// Device Identification
// ============================================================================

/// Samsung Electronics Vendor ID
pub const SAMSUNG_VENDOR_ID: u16 = 0x04E8;

/// Download mode Product ID (most devices)
pub const DOWNLOAD_MODE_PID: u16 = 0x6601;
/// Download mode Product ID (older Galaxy S / Tab devices)
pub const DOWNLOAD_MODE_ALT_PID: u16 = 0x685D;
/// Download mode Product ID (some Galaxy S2 variants)
pub const DOWNLOAD_MODE_S2_PID: u16 = 0x68C3;

/// All supported PIDs for device binding
pub const SUPPORTED_PIDS: &[u16] = &[
    DOWNLOAD_MODE_PID,
    DOWNLOAD_MODE_ALT_PID,
    DOWNLOAD_MODE_S2_PID,
];

// ============================================================================
// Size Constants
// ============================================================================

/// Control commands are always sent as a zero-padded 1 KiB frame.
pub const CMD_PACKET_SIZE: usize = 1024;
/// Read length for acknowledgments and argument responses (one HS bulk packet).
pub const MAX_PKT_SIZE: usize = 0x200;
/// Payload size of a single raw chunk during a chunked transfer.
pub const CHUNK_SIZE: usize = 500;

// ============================================================================
// Handshake
// ============================================================================

/// Sent by the host before any control packet.
pub const HANDSHAKE_REQUEST: &[u8; 4] = b"ODIN";
/// Expected reply from the bootloader.
pub const HANDSHAKE_RESPONSE: &[u8; 4] = b"LOKE";

// ============================================================================
// Packet families
// ============================================================================

/// Command family, sent as the first little-endian word of every control packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketType {
    SessionStart = 0x64,
    PitXmit = 0x65,
    SessionEnd = 0x67,
    DeviceInfo = 0x69,
}

impl PacketType {
    /// Wire code of this family.
    pub const fn code(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacketType::SessionStart => write!(f, "SessionStart"),
            PacketType::PitXmit => write!(f, "PitXmit"),
            PacketType::SessionEnd => write!(f, "SessionEnd"),
            PacketType::DeviceInfo => write!(f, "DeviceInfo"),
        }
    }
}

// ============================================================================
// Sub-opcodes
// ============================================================================

/// SessionStart subcommands.
pub mod session_start {
    pub const BEGIN_SESSION: u32 = 0x00;
}

/// SessionEnd subcommands.
pub mod session_end {
    pub const END_SESSION: u32 = 0x00;
    pub const REBOOT: u32 = 0x01;
    pub const ODIN_REBOOT: u32 = 0x02;
    pub const SHUTDOWN: u32 = 0x03;
}

/// DeviceInfo transfer subcommands.
pub mod device_info {
    pub const REQUEST_SIZE: u32 = 0x00;
    pub const NEXT: u32 = 0x01;
    pub const FINISH: u32 = 0x02;
}

/// PitXmit subcommands.
pub mod pit_xmit {
    pub const REQUEST_DUMP: u32 = 0x01;
    pub const BEGIN: u32 = 0x02;
    pub const END: u32 = 0x03;
}

/// Opcode triple driving one chunked transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferFamily {
    pub packet_type: PacketType,
    /// Asks the peer for the total payload size.
    pub query: u32,
    /// Requests the next raw chunk.
    pub chunk: u32,
    /// Releases the peer from transfer mode.
    pub finish: u32,
}

/// Device information block transfer.
pub const DEVICE_INFO_TRANSFER: TransferFamily = TransferFamily {
    packet_type: PacketType::DeviceInfo,
    query: device_info::REQUEST_SIZE,
    chunk: device_info::NEXT,
    finish: device_info::FINISH,
};

/// Partition information table dump.
pub const PIT_TRANSFER: TransferFamily = TransferFamily {
    packet_type: PacketType::PitXmit,
    query: pit_xmit::REQUEST_DUMP,
    chunk: pit_xmit::BEGIN,
    finish: pit_xmit::END,
};
