//! Device operations built from exchanges.

use std::io::Write;

use tracing::{info, instrument};

use super::{OdinClient, ProtocolError};
use crate::device_info::DeviceInfo;
use crate::events::OdinObserver;
use crate::protocol::constants::{DEVICE_INFO_TRANSFER, PIT_TRANSFER, PacketType, session_end};
use crate::protocol::{ByteAck, Command};
use crate::transport::UsbTransport;

impl<T: UsbTransport, O: OdinObserver> OdinClient<T, O> {
    /// Retrieve the device information block.
    #[instrument(skip(self))]
    pub fn get_device_info(&mut self) -> Result<DeviceInfo, ProtocolError> {
        self.require_active()?;
        let mut data: Vec<u8> = Vec::new();
        self.pull_chunked(DEVICE_INFO_TRANSFER, &mut data)?;
        info!(bytes = data.len(), "Device info received");
        Ok(DeviceInfo::from_bytes(data))
    }

    /// Dump the partition information table into `sink`.
    ///
    /// Returns the number of bytes written.
    #[instrument(skip(self, sink))]
    pub fn dump_partition_table<W: Write + ?Sized>(
        &mut self,
        sink: &mut W,
    ) -> Result<usize, ProtocolError> {
        self.require_active()?;
        let written = self.pull_chunked(PIT_TRANSFER, sink)?;
        sink.flush().map_err(ProtocolError::Sink)?;
        info!(bytes = written, "PIT dumped");
        Ok(written)
    }

    /// Reboot the device.
    pub fn reboot(&mut self) -> Result<(), ProtocolError> {
        self.lifecycle(session_end::REBOOT)
    }

    /// Power off the device.
    pub fn shutdown(&mut self) -> Result<(), ProtocolError> {
        self.lifecycle(session_end::SHUTDOWN)
    }

    /// Reboot back into download mode.
    pub fn reboot_to_download_mode(&mut self) -> Result<(), ProtocolError> {
        self.lifecycle(session_end::ODIN_REBOOT)
    }

    #[instrument(skip(self))]
    fn lifecycle(&mut self, subcommand: u32) -> Result<(), ProtocolError> {
        self.require_active()?;
        self.exchange(
            &Command::control(PacketType::SessionEnd, subcommand),
            ByteAck(PacketType::SessionEnd),
        )?;
        info!(subcommand, "Lifecycle command acknowledged");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::events::SessionState;
    use crate::protocol::DecodeError;
    use crate::protocol::constants::CHUNK_SIZE;

    #[test]
    fn test_get_device_info() {
        let (mut client, mock) = active_client();
        mock.queue_args(PacketType::DeviceInfo, &[1000]);
        mock.queue_response(&[0x11; CHUNK_SIZE]);
        mock.queue_response(&[0x22; CHUNK_SIZE]);
        mock.queue_args(PacketType::DeviceInfo, &[0]);

        let info = client.get_device_info().unwrap();

        assert_eq!(info.len(), 1000);
        assert_eq!(info.as_bytes()[0], 0x11);
        assert_eq!(info.as_bytes()[999], 0x22);
        assert_eq!(mock.get_writes().len(), 4);
    }

    #[test]
    fn test_dump_partition_table_to_sink() {
        let (mut client, mock) = active_client();
        mock.queue_args(PacketType::PitXmit, &[1250]);
        mock.queue_response(&[0xAB; CHUNK_SIZE]);
        mock.queue_response(&[0xCD; CHUNK_SIZE]);
        mock.queue_args(PacketType::PitXmit, &[0]);

        let mut sink = std::io::Cursor::new(Vec::<u8>::new());
        let written = client.dump_partition_table(&mut sink).unwrap();

        assert_eq!(written, 1000);
        assert_eq!(sink.into_inner().len(), 1000);
        let commands: Vec<_> = mock.get_writes().iter().map(|w| decode_command(w)).collect();
        assert_eq!(
            commands,
            vec![(0x65, 0x01), (0x65, 0x02), (0x65, 0x02), (0x65, 0x03)]
        );
    }

    #[test]
    fn test_lifecycle_subcommands() {
        let cases: [(fn(&mut MockClient) -> Result<(), ProtocolError>, u32); 3] = [
            (|c| c.reboot(), 0x01),
            (|c| c.reboot_to_download_mode(), 0x02),
            (|c| c.shutdown(), 0x03),
        ];
        for (op, subcommand) in cases {
            let (mut client, mock) = active_client();
            mock.queue_ack(PacketType::SessionEnd);

            op(&mut client).unwrap();

            let writes = mock.get_writes();
            assert_eq!(writes.len(), 1);
            assert_eq!(decode_command(&writes[0]), (0x67, subcommand));
            assert_eq!(client.state(), SessionState::Active);
        }
    }

    #[test]
    fn test_reboot_wrong_ack_is_mismatch() {
        let (mut client, mock) = active_client();
        mock.queue_ack(PacketType::SessionStart);

        let err = client.reboot().unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::Mismatch(DecodeError::PacketTypeMismatch {
                expected: 0x67,
                actual: 0x64
            })
        ));
        assert_eq!(mock.get_writes().len(), 1);
    }

    #[test]
    fn test_device_info_mismatch_stops_operation() {
        let (mut client, mock) = active_client();
        mock.queue_args(PacketType::SessionEnd, &[1000]);
        mock.queue_response(&[0u8; CHUNK_SIZE]);

        let err = client.get_device_info().unwrap_err();
        assert!(matches!(err, ProtocolError::Mismatch(_)));
        assert_eq!(mock.get_writes().len(), 1);
        assert_eq!(mock.pending_responses(), 1);
    }

    #[test]
    fn test_operations_require_active_session() {
        let (mut client, mock) = idle_client();

        assert!(matches!(
            client.get_device_info(),
            Err(ProtocolError::SessionInactive {
                state: SessionState::Idle
            })
        ));
        assert!(client.dump_partition_table(&mut Vec::<u8>::new()).is_err());
        assert!(client.reboot().is_err());
        assert!(client.shutdown().is_err());
        assert!(client.reboot_to_download_mode().is_err());
        assert!(mock.get_writes().is_empty());
    }
}
