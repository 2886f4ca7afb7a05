//! Transport configuration.

use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Settings applied to the USB transport when a device is bound.
///
/// A missing timeout means the transfer blocks until the device answers.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Read timeout in milliseconds.
    pub read_timeout_ms: Option<u64>,
    /// Write timeout in milliseconds.
    pub write_timeout_ms: Option<u64>,
}

impl TransportConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: TransportConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_ms.map(Duration::from_millis)
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        self.write_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_blocks() {
        let config = TransportConfig::default();
        assert_eq!(config.read_timeout(), None);
        assert_eq!(config.write_timeout(), None);
    }

    #[test]
    fn test_parse_toml() {
        let config: TransportConfig = toml::from_str("read_timeout_ms = 2500\n").unwrap();
        assert_eq!(config.read_timeout(), Some(Duration::from_millis(2500)));
        assert_eq!(config.write_timeout(), None);
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("transport.toml");
        let config = TransportConfig {
            read_timeout_ms: Some(1000),
            write_timeout_ms: Some(5000),
        };

        config.save_to_file(&path).unwrap();
        let loaded = TransportConfig::load_from_file(&path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        assert!(TransportConfig::load_from_file(dir.path().join("absent.toml")).is_err());
    }
}
