//! Error types for the application.

use thiserror::Error;

/// Errors raised while bringing the backend up.
///
/// None of these are recoverable: if setup fails there is no backend and
/// the process should report and exit.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("Invalid endpoint: {0}")]
    Endpoint(#[from] EndpointError),

    #[error("Failed to connect event socket at {endpoint}: {source}")]
    EventConnect {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to connect command socket at {endpoint}: {source}")]
    CommandConnect {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Gateway identifier request failed: {0}")]
    IdentifierQuery(#[source] TransportError),

    #[error("Gateway identifier malformed: {0}")]
    Identifier(#[from] InvalidGatewayId),
}

/// Faults on an established channel to the concentrator daemon.
///
/// These indicate a broken socket, not a malformed message. A channel
/// that raised one is not usable afterwards.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Send failed: {0}")]
    Send(#[source] std::io::Error),

    #[error("Receive failed: {0}")]
    Recv(#[source] std::io::Error),

    #[error("Channel closed")]
    Closed,
}

/// Errors returned by a downlink transmission request.
#[derive(Debug, Error)]
pub enum DownlinkError {
    #[error("Command channel error: {0}")]
    Transport(#[from] TransportError),

    #[error("No reply received, check the concentratord logs for errors")]
    EmptyReply,

    #[error("Failed to decode downlink ack: {0}")]
    Decode(#[from] prost::DecodeError),
}

/// Endpoint address parse errors.
#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("Unsupported scheme in '{url}', expected tcp:// or ipc://")]
    UnsupportedScheme { url: String },

    #[error("Endpoint '{url}' has no address")]
    MissingAddress { url: String },
}

/// Raised when a gateway identifier is not exactly eight bytes.
#[derive(Debug, Error)]
#[error("Gateway identifier must be 8 bytes, got {len}")]
pub struct InvalidGatewayId {
    pub len: usize,
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {message}")]
    ParseError { message: String },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

/// Result type alias for setup operations.
pub type SetupResult<T> = std::result::Result<T, SetupError>;

/// Result type alias for channel operations.
pub type TransportResult<T> = std::result::Result<T, TransportError>;
