//! USB Transport layer abstraction.
//!
//! Defines the `UsbTransport` trait for the bulk endpoint pair the
//! bootloader talks over, allowing different implementations (nusb, mock).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Device not found: VID={vid:04X} PID={pid:04X}")]
    DeviceNotFound { vid: u16, pid: u16 },

    #[error("Failed to open device: {0}")]
    OpenFailed(String),

    #[error("Failed to claim interface {interface}: {message}")]
    ClaimInterfaceFailed { interface: u8, message: String },

    #[error("Endpoint not found: type={ep_type}, direction={direction}")]
    EndpointNotFound { ep_type: String, direction: String },

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Device disconnected")]
    Disconnected,

    #[error("Timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Abstract USB transport interface.
///
/// Both calls block until the transfer completes or the implementation's
/// own deadline expires.
pub trait UsbTransport: Send + Sync {
    /// Write raw bytes to the OUT endpoint.
    fn write(&self, data: &[u8]) -> Result<usize, TransportError>;

    /// Read one frame from the IN endpoint, keeping at most `max_len` bytes.
    ///
    /// Bytes of the frame past `max_len` are discarded, not held back for
    /// the following read.
    fn read(&self, max_len: usize) -> Result<Vec<u8>, TransportError>;

    /// Get the current VID.
    fn vendor_id(&self) -> u16;

    /// Get the current PID.
    fn product_id(&self) -> u16;
}
