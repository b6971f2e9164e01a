//! Boundary between a session and the connection it runs over.
//!
//! A [`Transport`] accepts outbound messages and reports when each write
//! finished. Inbound traffic flows the other way, into a
//! [`TransportEvents`] sink that the session implements.

use std::{io, net::SocketAddr, time::Duration};

use async_trait::async_trait;
use futures::future::BoxFuture;
use thiserror::Error;

use crate::{
    codec::{CodecError, DecodeError},
    message::Message,
};

mod framed;

pub use framed::{FramedTransport, InboundDriver};

/// Completion of a single write.
pub type WriteCompletion = BoxFuture<'static, Result<(), TransportError>>;

/// Errors reported by a transport.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum TransportError {
    /// A frame arrived intact but its body was malformed.
    #[error("malformed message: {0}")]
    Malformed(#[from] DecodeError),
    /// The byte stream could not be framed or encoded.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
    /// Socket-level failure.
    #[error("transport I/O error: {0}")]
    Io(#[from] io::Error),
    /// The transport is closed.
    #[error("transport closed")]
    Closed,
    /// The write did not finish within the configured write timeout.
    #[error("write timed out after {0:?}")]
    WriteTimeout(Duration),
    /// The write was abandoned before it ran.
    #[error("write cancelled")]
    Cancelled,
    /// Too many writes are already waiting for the connection.
    #[error("write queue full")]
    QueueFull,
}

impl TransportError {
    /// Whether the error concerns one malformed message rather than the
    /// connection.
    ///
    /// # Examples
    ///
    /// ```
    /// use bearerbox::{codec::DecodeError, transport::TransportError};
    ///
    /// assert!(TransportError::from(DecodeError::UndefinedAckType).is_malformed());
    /// assert!(!TransportError::Closed.is_malformed());
    /// ```
    #[must_use]
    pub fn is_malformed(&self) -> bool { matches!(self, Self::Malformed(_)) }
}

/// Outbound half of a connection.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Queue `message` for writing.
    ///
    /// The returned future resolves once the write finished, failed, or was
    /// cancelled. Dropping it does not cancel the write.
    fn send(&self, message: Message) -> WriteCompletion;

    /// Shut the connection down, waiting at most `timeout` for pending
    /// writes to flush.
    async fn close(&self, timeout: Duration) -> Result<(), TransportError>;

    /// Whether the connection is still usable.
    fn is_active(&self) -> bool;

    fn local_addr(&self) -> Option<SocketAddr> { None }

    fn peer_addr(&self) -> Option<SocketAddr> { None }
}

/// Sink for inbound traffic and connection lifecycle.
#[async_trait]
pub trait TransportEvents: Send + Sync + 'static {
    /// A message was decoded.
    async fn on_inbound_message(&self, message: Message);

    /// Reading failed. Malformed messages are reported here and reading
    /// continues; any other error is followed by
    /// [`on_transport_closed`](Self::on_transport_closed).
    async fn on_transport_exception(&self, error: TransportError);

    /// The connection closed. Called once.
    async fn on_transport_closed(&self);
}
