//! Odin-Core: Samsung Odin download-mode protocol client in Rust.
//!
//! This crate talks to the download-mode bootloader ("Loke") over a USB
//! bulk endpoint pair: handshake and session control, device information
//! and PIT retrieval, and reboot/shutdown commands.
//!
//! # Architecture
//!
//! The crate is organized into layers:
//!
//! - **Protocol**: Packet families, sub-opcodes and the packet codec
//! - **Transport**: USB communication abstraction (nusb, mock)
//! - **Client**: Exchange primitive, session lifecycle, chunked transfers
//!   and device operations
//! - **Events**: Observer pattern for UI decoupling
//! - **Config**: TOML-backed client configuration
//!
//! # Example
//!
//! ```no_run
//! use odin_core::{ClientConfig, NusbTransport, OdinClient};
//!
//! let config = ClientConfig::default();
//! let transport = NusbTransport::open(&config).expect("no device");
//! let mut client = OdinClient::new(transport).configure(&config);
//!
//! client.connect().expect("handshake failed");
//! let info = client.get_device_info().expect("device info failed");
//! println!("{:?}", info.strings(4));
//! client.end_session().expect("end session failed");
//! ```

pub mod client;
pub mod config;
pub mod device_info;
pub mod events;
pub mod protocol;
pub mod transport;

// Re-exports for convenience
pub use client::{OdinClient, ProtocolError, chunk_count};
pub use config::ClientConfig;
pub use device_info::DeviceInfo;
pub use events::{
    NullObserver, OdinEvent, OdinObserver, PacketDirection, SessionState, TracingObserver,
};
pub use protocol::{Command, DecodeError, PacketType};
pub use transport::{MockTransport, NusbTransport, TransportError, UsbTransport};
