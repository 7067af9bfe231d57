//! Configuration type definitions.

use serde::Deserialize;

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub concentratord: ConcentratordConfig,
}

/// Connection settings for the concentrator daemon.
#[derive(Debug, Clone, Deserialize)]
pub struct ConcentratordConfig {
    /// Event socket address, e.g. `ipc:///tmp/concentratord_event`.
    pub event_url: String,

    /// Command socket address, e.g. `ipc:///tmp/concentratord_command`.
    pub command_url: String,

    /// Drop uplinks whose CRC the concentrator flagged as failed or absent.
    pub crc_check: Option<bool>,
}

impl ConcentratordConfig {
    /// CRC filtering defaults to on.
    pub fn crc_check(&self) -> bool {
        self.crc_check.unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc_check_defaults_to_enabled() {
        let config = ConcentratordConfig {
            event_url: "ipc:///tmp/concentratord_event".to_string(),
            command_url: "ipc:///tmp/concentratord_command".to_string(),
            crc_check: None,
        };
        assert!(config.crc_check());

        let config = ConcentratordConfig {
            crc_check: Some(false),
            ..config
        };
        assert!(!config.crc_check());
    }
}
