//! Event system for UI decoupling.
//!
//! Allows CLI/TUI front ends to follow protocol progress without
//! tight coupling to the client.

use std::fmt;

use crate::protocol::PacketType;

/// Session lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No session; handshake not attempted or session ended.
    #[default]
    Idle,
    /// Magic exchange / session start in progress.
    Handshaking,
    /// Session started; operations allowed.
    Active,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "Idle"),
            SessionState::Handshaking => write!(f, "Handshaking"),
            SessionState::Active => write!(f, "Active"),
        }
    }
}

/// Events emitted by the Odin client.
#[derive(Debug, Clone)]
pub enum OdinEvent {
    /// Session state changed.
    StateChanged {
        from: SessionState,
        to: SessionState,
    },
    /// Chunked transfer about to pull `chunks` packets.
    TransferStarted {
        packet_type: PacketType,
        total_size: usize,
        chunks: usize,
    },
    /// One chunk received.
    Progress {
        packet_type: PacketType,
        current: usize,
        total: usize,
    },
    /// Chunked transfer completed.
    TransferFinished {
        packet_type: PacketType,
        bytes: usize,
    },
    /// USB packet sent/received.
    Packet {
        direction: PacketDirection,
        length: usize,
        data: Option<Vec<u8>>,
    },
}

/// USB packet direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketDirection {
    Tx, // Transmit (Host -> Device)
    Rx, // Receive (Device -> Host)
}

impl fmt::Display for PacketDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacketDirection::Tx => write!(f, "TX"),
            PacketDirection::Rx => write!(f, "RX"),
        }
    }
}

/// Observer trait for receiving client events.
///
/// Implement this trait in your UI layer to receive updates.
pub trait OdinObserver: Send + Sync {
    /// Called when an event occurs.
    fn on_event(&self, event: &OdinEvent);
}

/// No-op observer that discards all events.
pub struct NullObserver;

impl OdinObserver for NullObserver {
    fn on_event(&self, _event: &OdinEvent) {}
}

/// Observer that logs events using tracing.
pub struct TracingObserver;

impl OdinObserver for TracingObserver {
    fn on_event(&self, event: &OdinEvent) {
        match event {
            OdinEvent::StateChanged { from, to } => {
                tracing::info!(from = %from, to = %to, "Session state changed");
            }
            OdinEvent::TransferStarted {
                packet_type,
                total_size,
                chunks,
            } => {
                tracing::info!(family = %packet_type, total_size, chunks, "Transfer started");
            }
            OdinEvent::Progress {
                packet_type,
                current,
                total,
            } => {
                let pct = if *total > 0 {
                    (*current * 100) / *total
                } else {
                    0
                };
                tracing::debug!(family = %packet_type, progress = %format!("{}%", pct), "Progress");
            }
            OdinEvent::TransferFinished { packet_type, bytes } => {
                tracing::info!(family = %packet_type, bytes, "Transfer finished");
            }
            OdinEvent::Packet {
                direction, length, ..
            } => {
                tracing::trace!(dir = %direction, len = length, "USB Packet");
            }
        }
    }
}
