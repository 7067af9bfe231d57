//! Receive-only channel from the daemon event socket.

use futures::StreamExt;
use tokio_util::codec::Framed;
use tracing::debug;

use crate::common::error::{SetupError, TransportError};
use crate::protocol::endpoint::{Endpoint, Transport};
use crate::protocol::multipart::{Multipart, MultipartCodec};

/// Channel for the event stream published by the concentrator daemon.
///
/// Connecting is the subscription: the daemon pushes every event to every
/// connected client and topic filtering happens in the receive loop.
pub struct EventChannel {
    framed: Framed<Box<dyn Transport>, MultipartCodec>,
}

impl EventChannel {
    /// Connect to the daemon event endpoint.
    pub async fn connect(endpoint: &Endpoint) -> Result<Self, SetupError> {
        debug!("Connecting event socket at {}...", endpoint);
        let stream = endpoint
            .connect()
            .await
            .map_err(|source| SetupError::EventConnect {
                endpoint: endpoint.to_string(),
                source,
            })?;
        Ok(Self {
            framed: Framed::new(stream, MultipartCodec),
        })
    }

    /// Wrap an already connected stream.
    pub fn from_stream<S: Transport + 'static>(stream: S) -> Self {
        Self {
            framed: Framed::new(Box::new(stream), MultipartCodec),
        }
    }

    /// Receive the next event message.
    pub async fn recv(&mut self) -> Result<Multipart, TransportError> {
        match self.framed.next().await {
            Some(Ok(message)) => Ok(message),
            Some(Err(e)) => Err(TransportError::Recv(e)),
            None => Err(TransportError::Closed),
        }
    }
}
