//! Environment variable overrides for configuration.
//!
//! Supports overriding config values with environment variables:
//! - `LORABRIDGE_EVENT_URL` - event socket address
//! - `LORABRIDGE_COMMAND_URL` - command socket address
//! - `LORABRIDGE_CRC_CHECK` - "true" or "false"

use std::env;

use crate::config::types::Config;

/// Environment variable prefix for all config overrides.
const ENV_PREFIX: &str = "LORABRIDGE";

/// Apply environment variable overrides to a config.
///
/// This allows deployments to point the bridge at a different daemon
/// without editing the config file.
pub fn apply_env_overrides(mut config: Config) -> Config {
    if let Ok(url) = env::var(format!("{}_EVENT_URL", ENV_PREFIX)) {
        config.concentratord.event_url = url;
    }
    if let Ok(url) = env::var(format!("{}_COMMAND_URL", ENV_PREFIX)) {
        config.concentratord.command_url = url;
    }
    if let Ok(crc) = env::var(format!("{}_CRC_CHECK", ENV_PREFIX)) {
        if let Ok(crc) = crc.parse() {
            config.concentratord.crc_check = Some(crc);
        }
    }

    config
}

/// Get the config file path from environment or use default.
///
/// Checks `LORABRIDGE_CONFIG`, otherwise returns "lorabridge.conf".
pub fn get_config_path() -> String {
    env::var(format!("{}_CONFIG", ENV_PREFIX)).unwrap_or_else(|_| "lorabridge.conf".to_string())
}
