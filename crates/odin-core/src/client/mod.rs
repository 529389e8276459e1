//! Odin client - exchange primitive and session ownership.
//!
//! Every protocol interaction is one [`OdinClient::exchange`]: encode a
//! command, write it, read one frame and decode it against the expected
//! [`ResponseShape`]. Session control, chunked transfers and the device
//! operations are built on top of it in the submodules:
//!
//! - `session`: handshake, session start and teardown
//! - `transfer`: size query / chunk loop / end-transfer engine
//! - `operations`: device info, PIT dump, reboot and shutdown

mod operations;
mod session;
mod transfer;

pub use transfer::chunk_count;

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::config::ClientConfig;
use crate::events::{
    NullObserver, OdinEvent, OdinObserver, PacketDirection, SessionState, TracingObserver,
};
use crate::protocol::{Command, DecodeError, PacketType, ResponseShape};
use crate::transport::{TransportError, UsbTransport};

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Protocol mismatch: {0}")]
    Mismatch(#[from] DecodeError),

    #[error("Handshake failed: device did not answer the ODIN magic")]
    HandshakeFailed,

    #[error("Session is not active (state: {state})")]
    SessionInactive { state: SessionState },

    #[error("{packet_type} transfer terminated after {received} of {expected} chunks: {source}")]
    UnexpectedTermination {
        packet_type: PacketType,
        received: usize,
        expected: usize,
        #[source]
        source: Box<ProtocolError>,
    },

    #[error("Failed to write transfer output: {0}")]
    Sink(#[source] std::io::Error),
}

/// Odin protocol client bound to one transport.
///
/// The client owns its transport exclusively; all operations take
/// `&mut self` and run strictly one after another. Dropping an active
/// client ends the session on a best-effort basis.
pub struct OdinClient<T: UsbTransport, O: OdinObserver = TracingObserver> {
    transport: T,
    observer: Arc<O>,
    state: SessionState,
    end_transfer_on_abort: bool,
}

impl<T: UsbTransport> OdinClient<T, TracingObserver> {
    /// Create a new client with default tracing observer.
    pub fn new(transport: T) -> Self {
        Self::with_observer(transport, Arc::new(TracingObserver))
    }
}

impl<T: UsbTransport> OdinClient<T, NullObserver> {
    /// Create a client that emits no events.
    pub fn silent(transport: T) -> Self {
        Self::with_observer(transport, Arc::new(NullObserver))
    }
}

impl<T: UsbTransport, O: OdinObserver> OdinClient<T, O> {
    /// Create a new client with a custom observer.
    pub fn with_observer(transport: T, observer: Arc<O>) -> Self {
        Self {
            transport,
            observer,
            state: SessionState::Idle,
            end_transfer_on_abort: false,
        }
    }

    /// Send a best-effort end-transfer when a chunked transfer aborts.
    pub fn end_transfer_on_abort(mut self, enabled: bool) -> Self {
        self.end_transfer_on_abort = enabled;
        self
    }

    /// Apply the client-side options of a configuration.
    pub fn configure(self, config: &ClientConfig) -> Self {
        self.end_transfer_on_abort(config.end_transfer_on_abort)
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether a session has been started and not yet ended.
    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    /// Mandatory exchange: any transport or decode failure is returned.
    #[instrument(level = "debug", skip(self, command, shape), fields(command = %command))]
    pub fn exchange<S: ResponseShape>(
        &mut self,
        command: &Command,
        shape: S,
    ) -> Result<S::Output, ProtocolError> {
        let frame = command.encode();
        self.transport.write(&frame)?;
        self.emit_packet(PacketDirection::Tx, &frame);

        let reply = self.transport.read(shape.max_len())?;
        self.emit_packet(PacketDirection::Rx, &reply);

        Ok(shape.decode(&reply)?)
    }

    /// Non-mandatory exchange: failures degrade to `None`.
    pub fn try_exchange<S: ResponseShape>(
        &mut self,
        command: &Command,
        shape: S,
    ) -> Option<S::Output> {
        match self.exchange(command, shape) {
            Ok(output) => Some(output),
            Err(e) => {
                debug!(command = %command, error = %e, "Optional exchange failed");
                None
            }
        }
    }

    pub(crate) fn emit(&self, event: OdinEvent) {
        self.observer.on_event(&event);
    }

    fn emit_packet(&self, direction: PacketDirection, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        self.emit(OdinEvent::Packet {
            direction,
            length: data.len(),
            data: Some(data.iter().take(32).cloned().collect()),
        });
    }

    pub(crate) fn set_state(&mut self, to: SessionState) {
        let from = self.state;
        if from != to {
            self.state = to;
            self.emit(OdinEvent::StateChanged { from, to });
        }
    }

    pub(crate) fn require_active(&self) -> Result<(), ProtocolError> {
        if self.is_active() {
            Ok(())
        } else {
            Err(ProtocolError::SessionInactive { state: self.state })
        }
    }
}

impl<T: UsbTransport, O: OdinObserver> Drop for OdinClient<T, O> {
    fn drop(&mut self) {
        if let Err(e) = self.end_session() {
            warn!(error = %e, "Failed to end session cleanly");
        }
    }
}
