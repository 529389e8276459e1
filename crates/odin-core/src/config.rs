//! Client configuration, loadable from TOML.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::protocol::constants::SAMSUNG_VENDOR_ID;

/// USB binding and client behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Vendor ID to bind to.
    pub vendor_id: u16,
    /// Product ID to bind to; any supported download-mode PID when unset.
    pub product_id: Option<u16>,
    /// Interface number holding the bulk endpoint pair.
    pub interface: u8,
    /// Bulk IN timeout in milliseconds (0 waits forever).
    pub read_timeout_ms: u64,
    /// Bulk OUT timeout in milliseconds (0 waits forever).
    pub write_timeout_ms: u64,
    /// Send a best-effort end-transfer when a chunked transfer aborts.
    pub end_transfer_on_abort: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            vendor_id: SAMSUNG_VENDOR_ID,
            product_id: None,
            interface: 0,
            read_timeout_ms: 10_000,
            write_timeout_ms: 10_000,
            end_transfer_on_abort: false,
        }
    }
}

impl ClientConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ClientConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: ClientConfig = toml::from_str("product_id = 0x685D\n").unwrap();
        assert_eq!(config.product_id, Some(0x685D));
        assert_eq!(config.vendor_id, SAMSUNG_VENDOR_ID);
        assert!(!config.end_transfer_on_abort);
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("odin-config-{}.toml", std::process::id()));
        let config = ClientConfig {
            product_id: Some(0x6601),
            read_timeout_ms: 0,
            end_transfer_on_abort: true,
            ..Default::default()
        };
        config.save_to_file(&path).unwrap();
        let loaded = ClientConfig::load_from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, config);
    }
}
