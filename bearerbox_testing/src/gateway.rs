//! Gateway side of an in-memory connection.

use std::sync::Arc;

use bearerbox::{
    Session,
    SessionConfig,
    SessionHandler,
    codec::MessageCodec,
    message::Message,
    transport::FramedTransport,
};
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, DuplexStream, duplex};
use tokio_util::codec::Framed;

/// Boxed error returned by gateway helpers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

const DUPLEX_CAPACITY: usize = 64 * 1024;

/// Framed peer speaking the gateway protocol.
#[derive(Debug)]
pub struct Gateway<S> {
    framed: Framed<S, MessageCodec>,
}

impl<S: AsyncRead + AsyncWrite + Unpin> Gateway<S> {
    #[must_use]
    pub fn new(stream: S) -> Self {
        Self {
            framed: Framed::new(stream, MessageCodec::default()),
        }
    }

    /// Encode and send `message` to the client.
    ///
    /// # Errors
    ///
    /// Returns the codec error if the message cannot be written.
    pub async fn send(&mut self, message: impl Into<Message>) -> Result<(), BoxError> {
        self.framed.send(message.into()).await?;
        Ok(())
    }

    /// Write raw bytes, bypassing the codec.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the write fails.
    pub async fn send_raw(&mut self, bytes: &[u8]) -> Result<(), BoxError> {
        let stream = self.framed.get_mut();
        stream.write_all(bytes).await?;
        stream.flush().await?;
        Ok(())
    }

    /// Receive the next message from the client.
    ///
    /// # Errors
    ///
    /// Fails if the client closed the connection or sent something that
    /// does not decode.
    pub async fn recv(&mut self) -> Result<Message, BoxError> {
        match self.framed.next().await {
            Some(Ok(Ok(message))) => Ok(message),
            Some(Ok(Err(malformed))) => Err(malformed.into()),
            Some(Err(error)) => Err(error.into()),
            None => Err("client closed the connection".into()),
        }
    }

    /// Whether the client has closed its side.
    pub async fn is_closed(&mut self) -> bool { self.framed.next().await.is_none() }
}

/// Connect a session to an in-memory [`Gateway`].
///
/// The session's transport is a [`FramedTransport`] whose reader is already
/// running.
#[must_use]
pub fn connect_duplex(
    config: &SessionConfig,
    handler: Arc<dyn SessionHandler>,
) -> (Session, Gateway<DuplexStream>) {
    let (client, server) = duplex(DUPLEX_CAPACITY);
    let (transport, driver) = FramedTransport::new(client, config);
    let session = Session::new(config.clone(), Arc::new(transport), handler);
    driver.spawn(session.transport_events());
    (session, Gateway::new(server))
}
