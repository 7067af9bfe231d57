//! Request/reply channel to the daemon command socket.

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio_util::codec::Framed;
use tracing::debug;

use crate::common::error::{SetupError, TransportError};
use crate::protocol::endpoint::{Endpoint, Transport};
use crate::protocol::multipart::{Multipart, MultipartCodec};

/// Channel for issuing commands to the concentrator daemon.
///
/// The protocol carries no request identifiers: one request goes out and
/// the next inbound message is its reply, so ordering is the only
/// correlation. Callers must not interleave requests; the backend holds
/// this channel behind a mutex for exactly that reason.
pub struct CommandChannel {
    framed: Framed<Box<dyn Transport>, MultipartCodec>,
}

impl CommandChannel {
    /// Connect to the daemon command endpoint.
    pub async fn connect(endpoint: &Endpoint) -> Result<Self, SetupError> {
        debug!("Connecting command socket at {}...", endpoint);
        let stream = endpoint
            .connect()
            .await
            .map_err(|source| SetupError::CommandConnect {
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

    /// Issue one request and wait for its reply frame.
    ///
    /// There is no timeout: a daemon that never answers blocks the caller
    /// indefinitely, matching the lockstep request/reply socket contract.
    pub async fn request(&mut self, topic: &str, payload: Bytes) -> Result<Bytes, TransportError> {
        debug!(topic, payload_len = payload.len(), "Sending command request");

        self.framed
            .send(Multipart::tagged(topic, payload))
            .await
            .map_err(TransportError::Send)?;

        match self.framed.next().await {
            Some(Ok(reply)) => Ok(reply.into_first()),
            Some(Err(e)) => Err(TransportError::Recv(e)),
            None => Err(TransportError::Closed),
        }
    }
}
