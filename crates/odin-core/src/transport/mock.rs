//! Mock USB transport for testing.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::traits::{TransportError, UsbTransport};
use crate::protocol::constants::{DOWNLOAD_MODE_PID, PacketType, SAMSUNG_VENDOR_ID};

/// Mock transport for unit testing protocol exchanges.
///
/// Clones share the same queues, so a test can keep a handle after moving
/// the transport into a client.
#[derive(Clone)]
pub struct MockTransport {
    /// Queued frames to return on read.
    response_queue: Arc<Mutex<VecDeque<Vec<u8>>>>,
    /// Captured writes.
    write_log: Arc<Mutex<Vec<Vec<u8>>>>,
    /// Simulated VID/PID.
    vid: u16,
    pid: u16,
    /// Whether device is "connected".
    connected: Arc<Mutex<bool>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            response_queue: Arc::new(Mutex::new(VecDeque::new())),
            write_log: Arc::new(Mutex::new(Vec::new())),
            vid: SAMSUNG_VENDOR_ID,
            pid: DOWNLOAD_MODE_PID,
            connected: Arc::new(Mutex::new(true)),
        }
    }

    /// Queue a raw frame to be returned on next read.
    pub fn queue_response(&self, frame: &[u8]) {
        self.response_queue
            .lock()
            .unwrap()
            .push_back(frame.to_vec());
    }

    /// Queue the 8-byte acknowledgment the bootloader sends for a packet type.
    pub fn queue_ack(&self, packet_type: PacketType) {
        self.queue_args(packet_type, &[0]);
    }

    /// Queue an argument response: packet type word followed by arguments.
    pub fn queue_args(&self, packet_type: PacketType, args: &[i32]) {
        let mut frame = (packet_type.code() as i32).to_le_bytes().to_vec();
        for arg in args {
            frame.extend_from_slice(&arg.to_le_bytes());
        }
        self.queue_response(&frame);
    }

    /// Number of frames still waiting to be read.
    pub fn pending_responses(&self) -> usize {
        self.response_queue.lock().unwrap().len()
    }

    /// Get all captured writes.
    pub fn get_writes(&self) -> Vec<Vec<u8>> {
        self.write_log.lock().unwrap().clone()
    }

    /// Clear captured writes.
    pub fn clear_writes(&self) {
        self.write_log.lock().unwrap().clear();
    }

    /// Simulate device disconnect.
    pub fn disconnect(&self) {
        *self.connected.lock().unwrap() = false;
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl UsbTransport for MockTransport {
    fn write(&self, data: &[u8]) -> Result<usize, TransportError> {
        if !*self.connected.lock().unwrap() {
            return Err(TransportError::Disconnected);
        }
        self.write_log.lock().unwrap().push(data.to_vec());
        Ok(data.len())
    }

    fn read(&self, max_len: usize) -> Result<Vec<u8>, TransportError> {
        if !*self.connected.lock().unwrap() {
            return Err(TransportError::Disconnected);
        }
        let mut frame = self
            .response_queue
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(TransportError::Timeout { timeout_ms: 5000 })?;
        frame.truncate(max_len);
        Ok(frame)
    }

    fn vendor_id(&self) -> u16 {
        self.vid
    }

    fn product_id(&self) -> u16 {
        self.pid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_response_queue() {
        let mock = MockTransport::new();
        mock.queue_response(b"LOKE");
        mock.queue_args(PacketType::PitXmit, &[1000]);

        assert_eq!(mock.read(512).unwrap(), b"LOKE");
        let frame = mock.read(512).unwrap();
        assert_eq!(frame, vec![0x65, 0, 0, 0, 0xE8, 0x03, 0, 0]);

        // Queue is empty now
        assert!(matches!(
            mock.read(512),
            Err(TransportError::Timeout { .. })
        ));
    }

    #[test]
    fn test_mock_read_truncates() {
        let mock = MockTransport::new();
        mock.queue_response(&[0xAA; 600]);
        mock.queue_response(&[0xBB; 8]);
        assert_eq!(mock.read(500).unwrap(), vec![0xAA; 500]);
        // The cut-off tail is gone; the next read sees the next frame.
        assert_eq!(mock.read(512).unwrap(), vec![0xBB; 8]);
    }

    #[test]
    fn test_mock_write_capture() {
        let mock = MockTransport::new();
        let handle = mock.clone();
        mock.write(b"Hello").unwrap();
        mock.write(b"World").unwrap();

        let writes = handle.get_writes();
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[0], b"Hello");
        assert_eq!(writes[1], b"World");
    }

    #[test]
    fn test_mock_disconnect() {
        let mock = MockTransport::new();
        mock.queue_response(b"LOKE");
        mock.write(b"ODIN").unwrap();

        mock.disconnect();
        assert!(matches!(
            mock.write(b"test"),
            Err(TransportError::Disconnected)
        ));
        assert!(matches!(mock.read(512), Err(TransportError::Disconnected)));
        // Nothing is captured or consumed while disconnected.
        assert_eq!(mock.get_writes().len(), 1);
        assert_eq!(mock.pending_responses(), 1);
    }
}
