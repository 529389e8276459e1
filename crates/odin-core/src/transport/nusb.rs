//! nusb-based USB transport implementation.

use nusb::io::{EndpointRead, EndpointWrite};
use nusb::transfer::{Bulk, In, Out};
use nusb::{MaybeFuture, list_devices};
use std::io::{ErrorKind, Read, Write};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use super::traits::{TransportError, UsbTransport};
use crate::config::ClientConfig;
use crate::protocol::constants::SUPPORTED_PIDS;

const TRANSFER_SIZE: usize = 4096;

/// nusb-based USB transport.
///
/// Holds one reader and one writer on the claimed interface for its whole
/// lifetime. Each read consumes one whole IN transfer; bytes beyond the
/// caller's `max_len` are dropped so they never surface as the next reply.
pub struct NusbTransport {
    reader: Mutex<EndpointRead<Bulk>>,
    writer: Mutex<EndpointWrite<Bulk>>,
    read_timeout_ms: u64,
    vid: u16,
    pid: u16,
}

impl NusbTransport {
    /// Open the first device matching the configured IDs.
    #[instrument(level = "info", skip(config), fields(vid = format!("{:04X}", config.vendor_id)))]
    pub fn open(config: &ClientConfig) -> Result<Self, TransportError> {
        let device_info = list_devices()
            .wait()
            .map_err(|e| TransportError::OpenFailed(e.to_string()))?
            .find(|d| {
                d.vendor_id() == config.vendor_id
                    && match config.product_id {
                        Some(pid) => d.product_id() == pid,
                        None => SUPPORTED_PIDS.contains(&d.product_id()),
                    }
            })
            .ok_or(TransportError::DeviceNotFound {
                vid: config.vendor_id,
                pid: config.product_id.unwrap_or(0),
            })?;

        Self::open_device_info(device_info, config)
    }

    fn open_device_info(
        device_info: nusb::DeviceInfo,
        config: &ClientConfig,
    ) -> Result<Self, TransportError> {
        let vid = device_info.vendor_id();
        let pid = device_info.product_id();

        info!(
            vendor_id = %format!("{:04X}", vid),
            product_id = %format!("{:04X}", pid),
            "Found device"
        );

        let device = device_info
            .open()
            .wait()
            .map_err(|e| TransportError::OpenFailed(e.to_string()))?;

        let interface = device
            .claim_interface(config.interface)
            .wait()
            .map_err(|e| TransportError::ClaimInterfaceFailed {
                interface: config.interface,
                message: e.to_string(),
            })?;

        // Find BULK endpoints
        let mut in_endpoint: u8 = 0;
        let mut out_endpoint: u8 = 0;

        for usb_config in device.configurations() {
            for iface in usb_config.interfaces() {
                if iface.interface_number() != config.interface {
                    continue;
                }
                for alt in iface.alt_settings() {
                    for ep in alt.endpoints() {
                        if ep.transfer_type() == nusb::descriptors::TransferType::Bulk {
                            if ep.direction() == nusb::transfer::Direction::In {
                                in_endpoint = ep.address();
                            } else {
                                out_endpoint = ep.address();
                            }
                        }
                    }
                }
            }
        }

        if in_endpoint == 0 {
            return Err(TransportError::EndpointNotFound {
                ep_type: "Bulk".into(),
                direction: "In".into(),
            });
        }
        if out_endpoint == 0 {
            return Err(TransportError::EndpointNotFound {
                ep_type: "Bulk".into(),
                direction: "Out".into(),
            });
        }

        let mut reader = interface
            .endpoint::<Bulk, In>(in_endpoint)
            .map_err(|e| TransportError::OpenFailed(e.to_string()))?
            .reader(TRANSFER_SIZE);
        if config.read_timeout_ms > 0 {
            reader.set_read_timeout(Duration::from_millis(config.read_timeout_ms));
        }

        let mut writer = interface
            .endpoint::<Bulk, Out>(out_endpoint)
            .map_err(|e| TransportError::OpenFailed(e.to_string()))?
            .writer(TRANSFER_SIZE);
        if config.write_timeout_ms > 0 {
            writer.set_write_timeout(Duration::from_millis(config.write_timeout_ms));
        }

        info!(
            in_ep = %format!("0x{:02X}", in_endpoint),
            out_ep = %format!("0x{:02X}", out_endpoint),
            "Device opened successfully"
        );

        Ok(Self {
            reader: Mutex::new(reader),
            writer: Mutex::new(writer),
            read_timeout_ms: config.read_timeout_ms,
            vid,
            pid,
        })
    }
}

impl UsbTransport for NusbTransport {
    #[instrument(skip(self, data), fields(len = data.len()))]
    fn write(&self, data: &[u8]) -> Result<usize, TransportError> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| TransportError::WriteFailed("writer lock poisoned".into()))?;
        writer
            .write_all(data)
            .map_err(|e| TransportError::WriteFailed(e.to_string()))?;
        writer
            .flush()
            .map_err(|e| TransportError::WriteFailed(e.to_string()))?;

        debug!(bytes_written = data.len(), "Write complete");
        Ok(data.len())
    }

    #[instrument(skip(self), fields(max_len))]
    fn read(&self, max_len: usize) -> Result<Vec<u8>, TransportError> {
        let mut reader = self
            .reader
            .lock()
            .map_err(|_| TransportError::ReadFailed("reader lock poisoned".into()))?;
        // Peer frames are at most one bulk packet (512 bytes, 500 for raw
        // chunks) and always fit in one transfer buffer.
        let mut buf = vec![0u8; max_len.max(TRANSFER_SIZE)];

        let n = reader.read(&mut buf).map_err(|e| match e.kind() {
            ErrorKind::TimedOut => TransportError::Timeout {
                timeout_ms: self.read_timeout_ms,
            },
            ErrorKind::BrokenPipe | ErrorKind::NotConnected => TransportError::Disconnected,
            _ => TransportError::ReadFailed(e.to_string()),
        })?;

        if n > max_len {
            warn!(received = n, max_len, "Discarding bytes past the expected frame length");
        }
        buf.truncate(n.min(max_len));
        debug!(bytes_read = buf.len(), "Read complete");
        Ok(buf)
    }

    fn vendor_id(&self) -> u16 {
        self.vid
    }

    fn product_id(&self) -> u16 {
        self.pid
    }
}
