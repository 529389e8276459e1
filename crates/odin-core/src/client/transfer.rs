//! Chunked transfer engine.
//!
//! Payloads larger than one packet are pulled in three phases: a size
//! query answered with an argument response, `total / CHUNK_SIZE` raw chunk
//! requests, and a closing end-transfer exchange.

use std::io::Write;

use tracing::{debug, instrument, warn};

use super::{OdinClient, ProtocolError};
use crate::events::{OdinEvent, OdinObserver};
use crate::protocol::constants::{CHUNK_SIZE, TransferFamily};
use crate::protocol::{ArgResponse, Command, DecodeError, RawBuffer};
use crate::transport::UsbTransport;

/// Number of chunk requests issued for a payload of `total_size` bytes.
///
/// Truncates: a trailing partial chunk is never requested. Peers that pad
/// the final chunk report a size that is already a multiple of the chunk
/// size.
pub fn chunk_count(total_size: usize) -> usize {
    total_size / CHUNK_SIZE
}

impl<T: UsbTransport, O: OdinObserver> OdinClient<T, O> {
    /// Run one chunked transfer, writing every chunk payload to `sink` in
    /// arrival order. Returns the number of bytes written.
    #[instrument(skip(self, family, sink), fields(family = %family.packet_type))]
    pub(crate) fn pull_chunked<W: Write + ?Sized>(
        &mut self,
        family: TransferFamily,
        sink: &mut W,
    ) -> Result<usize, ProtocolError> {
        let packet_type = family.packet_type;

        let reply = self.exchange(
            &Command::control(packet_type, family.query),
            ArgResponse(packet_type),
        )?;
        let size = reply.first;
        let total_size = usize::try_from(size).map_err(|_| DecodeError::InvalidSize(size))?;

        let chunks = chunk_count(total_size);
        let skipped = total_size % CHUNK_SIZE;
        if skipped != 0 {
            warn!(
                total_size,
                skipped,
                "Size is not a multiple of the chunk size; trailing bytes are not requested"
            );
        }
        self.emit(OdinEvent::TransferStarted {
            packet_type,
            total_size,
            chunks,
        });

        let mut written = 0usize;
        for index in 0..chunks {
            let request = Command::control(packet_type, family.chunk);
            let chunk = match self.exchange(&request, RawBuffer) {
                Ok(chunk) => chunk,
                Err(e) => return Err(self.abort_transfer(family, index, chunks, e)),
            };
            sink.write_all(&chunk).map_err(ProtocolError::Sink)?;
            written += chunk.len();
            self.emit(OdinEvent::Progress {
                packet_type,
                current: index + 1,
                total: chunks,
            });
        }

        self.exchange(
            &Command::control(packet_type, family.finish),
            ArgResponse(packet_type),
        )?;

        debug!(bytes = written, "Transfer complete");
        self.emit(OdinEvent::TransferFinished {
            packet_type,
            bytes: written,
        });
        Ok(written)
    }

    fn abort_transfer(
        &mut self,
        family: TransferFamily,
        received: usize,
        expected: usize,
        cause: ProtocolError,
    ) -> ProtocolError {
        warn!(received, expected, error = %cause, "Chunked transfer aborted");

        if self.end_transfer_on_abort {
            let finish = Command::control(family.packet_type, family.finish);
            if self
                .try_exchange(&finish, ArgResponse(family.packet_type))
                .is_none()
            {
                debug!("End-transfer after abort was not acknowledged");
            }
        }

        ProtocolError::UnexpectedTermination {
            packet_type: family.packet_type,
            received,
            expected,
            source: Box::new(cause),
        }
    }
}
