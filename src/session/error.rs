//! Errors returned by [`Session`](super::Session) operations.

use thiserror::Error;

use crate::{transport::TransportError, window::RequestError};

/// Errors raised by session operations.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SessionError {
    /// `identify` was called with an admin command other than identify.
    #[error("identify requires an identify admin command")]
    NotIdentifyCommand,
    /// Writing to the transport failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    /// The request failed before a response arrived.
    #[error("request failed: {0}")]
    Request(#[from] RequestError),
    /// The request was cancelled.
    #[error("request cancelled")]
    Cancelled,
    /// No response arrived within the caller's timeout.
    #[error("timed out waiting for a response")]
    ResponseTimeout,
    /// The session is closed.
    #[error("session closed")]
    Closed,
}
