//! Handshake and session lifecycle.

use tracing::{debug, info, instrument, warn};

use super::{OdinClient, ProtocolError};
use crate::events::{OdinObserver, SessionState};
use crate::protocol::constants::{
    HANDSHAKE_REQUEST, HANDSHAKE_RESPONSE, PacketType, session_end, session_start,
};
use crate::protocol::{ByteAck, Command, MagicAck};
use crate::transport::UsbTransport;

impl<T: UsbTransport, O: OdinObserver> OdinClient<T, O> {
    /// Exchange the handshake magic with the bootloader and start a session.
    ///
    /// Returns `Ok(false)` when the device does not answer the magic; no
    /// session-start is attempted then and the client stays idle. A failed
    /// session-start after a good magic reply is returned as an error.
    #[instrument(skip(self))]
    pub fn handshake(&mut self) -> Result<bool, ProtocolError> {
        if self.is_active() {
            debug!("Session already active");
            return Ok(true);
        }

        self.set_state(SessionState::Handshaking);

        let greeting = self.try_exchange(
            &Command::Handshake(HANDSHAKE_REQUEST),
            MagicAck(HANDSHAKE_RESPONSE),
        );
        if greeting.is_none() {
            warn!("Device did not answer the handshake");
            self.set_state(SessionState::Idle);
            return Ok(false);
        }

        let begin = Command::control(PacketType::SessionStart, session_start::BEGIN_SESSION);
        if let Err(e) = self.exchange(&begin, ByteAck(PacketType::SessionStart)) {
            self.set_state(SessionState::Idle);
            return Err(e);
        }

        self.set_state(SessionState::Active);
        info!("Session started");
        Ok(true)
    }

    /// Handshake, treating an unanswered magic as an error.
    pub fn connect(&mut self) -> Result<(), ProtocolError> {
        if self.handshake()? {
            Ok(())
        } else {
            Err(ProtocolError::HandshakeFailed)
        }
    }

    /// End the session if one is active.
    ///
    /// The client is idle afterwards whatever the outcome, so only the
    /// first call after a successful handshake reaches the device.
    #[instrument(skip(self))]
    pub fn end_session(&mut self) -> Result<(), ProtocolError> {
        if !self.is_active() {
            return Ok(());
        }
        self.set_state(SessionState::Idle);

        self.exchange(
            &Command::control(PacketType::SessionEnd, session_end::END_SESSION),
            ByteAck(PacketType::SessionEnd),
        )?;
        info!("Session ended");
        Ok(())
    }

    /// Mark the session ended without telling the device.
    ///
    /// For use after an acknowledged reboot or shutdown: the device is
    /// already leaving download mode and would not answer a session-end, so
    /// neither [`end_session`](Self::end_session) nor `Drop` sends one
    /// afterwards.
    pub fn release_session(&mut self) {
        if self.is_active() {
            debug!("Session released without session-end");
            self.set_state(SessionState::Idle);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::super::test_support::*;
    use super::*;
    use crate::events::OdinEvent;
    use crate::events::tests::RecordingObserver;
    use crate::protocol::DecodeError;
    use crate::transport::MockTransport;

    #[test]
    fn test_handshake_success() {
        let (mut client, mock) = idle_client();
        mock.queue_response(b"LOKE");
        mock.queue_ack(PacketType::SessionStart);

        assert!(client.handshake().unwrap());
        assert_eq!(client.state(), SessionState::Active);

        let writes = mock.get_writes();
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[0], b"ODIN");
        assert_eq!(decode_command(&writes[1]), (0x64, 0x00));
    }

    #[test]
    fn test_handshake_magic_mismatch_skips_session_start() {
        for reply in [&b"NOPE"[..], &b"LOK"[..], &b"loke"[..]] {
            let (mut client, mock) = idle_client();
            mock.queue_response(reply);
            mock.queue_ack(PacketType::SessionStart);

            assert!(!client.handshake().unwrap());
            assert_eq!(client.state(), SessionState::Idle);
            assert_eq!(mock.get_writes(), vec![b"ODIN".to_vec()]);
            assert_eq!(mock.pending_responses(), 1);
        }
    }

    #[test]
    fn test_handshake_no_reply_then_retry() {
        let (mut client, mock) = idle_client();
        assert!(!client.handshake().unwrap());
        assert_eq!(client.state(), SessionState::Idle);

        mock.queue_response(b"LOKE");
        mock.queue_ack(PacketType::SessionStart);
        assert!(client.handshake().unwrap());
        assert!(client.is_active());
    }

    #[test]
    fn test_session_start_failure_is_fatal() {
        let (mut client, mock) = idle_client();
        mock.queue_response(b"LOKE");
        mock.queue_ack(PacketType::SessionEnd);

        let err = client.handshake().unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::Mismatch(DecodeError::PacketTypeMismatch { .. })
        ));
        assert_eq!(client.state(), SessionState::Idle);
    }

    #[test]
    fn test_connect_reports_handshake_failure() {
        let (mut client, mock) = idle_client();
        mock.queue_response(b"ERR!");
        assert!(matches!(
            client.connect(),
            Err(ProtocolError::HandshakeFailed)
        ));
    }

    #[test]
    fn test_handshake_when_active_is_noop() {
        let (mut client, mock) = active_client();
        assert!(client.handshake().unwrap());
        assert!(mock.get_writes().is_empty());
    }

    #[test]
    fn test_end_session_sent_once() {
        let (mut client, mock) = active_client();
        mock.queue_ack(PacketType::SessionEnd);

        client.end_session().unwrap();
        client.end_session().unwrap();

        let writes = mock.get_writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(decode_command(&writes[0]), (0x67, 0x00));
        assert_eq!(client.state(), SessionState::Idle);
    }

    #[test]
    fn test_end_session_failure_still_idles() {
        let (mut client, mock) = active_client();
        // No acknowledgment queued.
        assert!(client.end_session().is_err());
        assert_eq!(client.state(), SessionState::Idle);
        assert!(client.end_session().is_ok());
        assert_eq!(mock.get_writes().len(), 1);
    }

    #[test]
    fn test_end_session_without_handshake() {
        let (mut client, mock) = idle_client();
        client.end_session().unwrap();
        assert!(mock.get_writes().is_empty());
    }

    #[test]
    fn test_drop_ends_active_session() {
        let (client, mock) = active_client();
        mock.queue_ack(PacketType::SessionEnd);
        drop(client);

        let writes = mock.get_writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(decode_command(&writes[0]), (0x67, 0x00));
        assert_eq!(mock.pending_responses(), 0);
    }

    #[test]
    fn test_drop_swallows_teardown_error() {
        let (client, mock) = active_client();
        mock.disconnect();
        drop(client);
        assert!(mock.get_writes().is_empty());
    }

    #[test]
    fn test_release_after_reboot_skips_teardown() {
        let (mut client, mock) = active_client();
        mock.queue_ack(PacketType::SessionEnd);
        client.reboot().unwrap();
        client.release_session();
        assert_eq!(client.state(), SessionState::Idle);

        client.end_session().unwrap();
        drop(client);

        let commands: Vec<_> = mock.get_writes().iter().map(|w| decode_command(w)).collect();
        assert_eq!(commands, vec![(0x67, 0x01)]);
    }

    #[test]
    fn test_release_when_idle_is_noop() {
        let observer = Arc::new(RecordingObserver::default());
        let mut client = OdinClient::with_observer(MockTransport::new(), observer.clone());
        client.release_session();
        assert_eq!(client.state(), SessionState::Idle);
        assert!(observer.events.lock().unwrap().is_empty());
    }

    #[test]
    fn test_state_events() {
        let mock = MockTransport::new();
        let observer = Arc::new(RecordingObserver::default());
        let mut client = OdinClient::with_observer(mock.clone(), observer.clone());
        mock.queue_response(b"LOKE");
        mock.queue_ack(PacketType::SessionStart);
        client.handshake().unwrap();

        let transitions: Vec<_> = observer
            .events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                OdinEvent::StateChanged { from, to } => Some((*from, *to)),
                _ => None,
            })
            .collect();
        assert_eq!(
            transitions,
            vec![
                (SessionState::Idle, SessionState::Handshaking),
                (SessionState::Handshaking, SessionState::Active),
            ]
        );
    }
}
