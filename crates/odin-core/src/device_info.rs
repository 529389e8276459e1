//! Device information block returned by the bootloader.
//!
//! The block layout is not interpreted here; callers get the raw bytes and
//! a helper to pull out printable strings for display.

use std::fmt;

/// Raw device information as assembled from the chunked transfer.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct DeviceInfo {
    data: Vec<u8>,
}

impl DeviceInfo {
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Runs of at least `min_len` printable ASCII characters, in order.
    pub fn strings(&self, min_len: usize) -> Vec<String> {
        self.data
            .split(|b| !(b.is_ascii_graphic() || *b == b' '))
            .filter(|run| run.len() >= min_len.max(1))
            .map(|run| String::from_utf8_lossy(run).trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

impl fmt::Debug for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeviceInfo({} bytes)", self.data.len())
    }
}
