//! Concentrator daemon socket addresses.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::str::FromStr;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
#[cfg(unix)]
use tokio::net::UnixStream;

use crate::common::error::EndpointError;

/// A byte stream the daemon channels can run over.
///
/// `Sync` is required so futures holding a channel across an await point
/// stay `Send` and can run on a spawned task.
pub trait Transport: AsyncRead + AsyncWrite + Send + Sync + Unpin {}

impl<S: AsyncRead + AsyncWrite + Send + Sync + Unpin> Transport for S {}

/// Address of one concentrator daemon socket.
///
/// Two schemes are supported: `tcp://host:port` and `ipc:///path/to.sock`
/// (a unix domain socket, the concentratord default).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Tcp(String),
    Ipc(PathBuf),
}

impl Endpoint {
    /// Open a stream to this endpoint.
    pub async fn connect(&self) -> io::Result<Box<dyn Transport>> {
        match self {
            Endpoint::Tcp(address) => Ok(Box::new(TcpStream::connect(address.as_str()).await?)),
            #[cfg(unix)]
            Endpoint::Ipc(path) => Ok(Box::new(UnixStream::connect(path).await?)),
            #[cfg(not(unix))]
            Endpoint::Ipc(_) => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "ipc endpoints require a unix platform",
            )),
        }
    }
}

impl FromStr for Endpoint {
    type Err = EndpointError;

    fn from_str(url: &str) -> Result<Self, Self::Err> {
        if let Some(address) = url.strip_prefix("tcp://") {
            if address.is_empty() {
                return Err(EndpointError::MissingAddress {
                    url: url.to_string(),
                });
            }
            Ok(Endpoint::Tcp(address.to_string()))
        } else if let Some(path) = url.strip_prefix("ipc://") {
            if path.is_empty() {
                return Err(EndpointError::MissingAddress {
                    url: url.to_string(),
                });
            }
            Ok(Endpoint::Ipc(PathBuf::from(path)))
        } else {
            Err(EndpointError::UnsupportedScheme {
                url: url.to_string(),
            })
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Tcp(address) => write!(f, "tcp://{}", address),
            Endpoint::Ipc(path) => write!(f, "ipc://{}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tcp_endpoint() {
        let endpoint: Endpoint = "tcp://127.0.0.1:3001".parse().unwrap();
        assert_eq!(endpoint, Endpoint::Tcp("127.0.0.1:3001".to_string()));
        assert_eq!(endpoint.to_string(), "tcp://127.0.0.1:3001");
    }

    #[test]
    fn test_parse_ipc_endpoint() {
        let endpoint: Endpoint = "ipc:///tmp/concentratord_event".parse().unwrap();
        assert_eq!(
            endpoint,
            Endpoint::Ipc(PathBuf::from("/tmp/concentratord_event"))
        );
        assert_eq!(endpoint.to_string(), "ipc:///tmp/concentratord_event");
    }

    #[test]
    fn test_parse_rejects_unknown_scheme() {
        let err = "inproc://events".parse::<Endpoint>().unwrap_err();
        assert!(matches!(err, EndpointError::UnsupportedScheme { .. }));
    }

    #[test]
    fn test_parse_rejects_empty_address() {
        let err = "tcp://".parse::<Endpoint>().unwrap_err();
        assert!(matches!(err, EndpointError::MissingAddress { .. }));

        let err = "ipc://".parse::<Endpoint>().unwrap_err();
        assert!(matches!(err, EndpointError::MissingAddress { .. }));
    }
}
