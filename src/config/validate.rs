//! Configuration validation.
//!
//! Validates configuration values and provides helpful error messages.

use crate::common::error::ConfigError;
use crate::config::types::Config;
use crate::protocol::Endpoint;

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    if config.concentratord.event_url.is_empty() {
        errors.push("concentratord.event_url is required".to_string());
    } else if let Err(e) = config.concentratord.event_url.parse::<Endpoint>() {
        errors.push(format!("concentratord.event_url: {}", e));
    }

    if config.concentratord.command_url.is_empty() {
        errors.push("concentratord.command_url is required".to_string());
    } else if let Err(e) = config.concentratord.command_url.parse::<Endpoint>() {
        errors.push(format!("concentratord.command_url: {}", e));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError {
            message: errors.join("\n"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::ConcentratordConfig;

    fn make_valid_config() -> Config {
        Config {
            concentratord: ConcentratordConfig {
                event_url: "ipc:///tmp/concentratord_event".to_string(),
                command_url: "tcp://127.0.0.1:3001".to_string(),
                crc_check: Some(true),
            },
        }
    }

    #[test]
    fn test_valid_config_passes() {
        let config = make_valid_config();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_empty_event_url_fails() {
        let mut config = make_valid_config();
        config.concentratord.event_url = String::new();

        let result = validate_config(&config);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("concentratord.event_url"));
    }

    #[test]
    fn test_unknown_scheme_fails() {
        let mut config = make_valid_config();
        config.concentratord.command_url = "inproc://commands".to_string();

        let result = validate_config(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Unsupported scheme"));
    }

    #[test]
    fn test_both_urls_reported_together() {
        let mut config = make_valid_config();
        config.concentratord.event_url = String::new();
        config.concentratord.command_url = String::new();

        let message = validate_config(&config).unwrap_err().to_string();
        assert!(message.contains("event_url"));
        assert!(message.contains("command_url"));
    }
}
