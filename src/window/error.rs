//! Failure causes recorded on a [`RequestPromise`](super::RequestPromise).

use std::sync::Arc;

use thiserror::Error;

/// Source error carried by [`RequestError::Write`].
pub type WriteErrorSource = Arc<dyn std::error::Error + Send + Sync>;

/// Why a request did not complete with a response.
///
/// Cloneable so every observer of a promise can hold the cause.
#[non_exhaustive]
#[derive(Debug, Error, Clone)]
pub enum RequestError {
    /// No slot became free within the admission timeout.
    #[error("no free window slot within the admission timeout")]
    AdmissionTimeout,
    /// A request with the same key is still in flight.
    #[error("a request with the same key is already in flight")]
    DuplicateKey,
    /// Admitted, but no response arrived before the deadline.
    #[error("request expired before a response arrived")]
    Expired,
    /// The transport failed to write the admitted request.
    #[error("failed to write request: {0}")]
    Write(#[source] WriteErrorSource),
    /// The connection closed while the request was in flight.
    #[error("connection closed")]
    ConnectionClosed,
    /// The window was destroyed before the request could be admitted.
    #[error("window destroyed")]
    Interrupted,
}

impl RequestError {
    /// Wrap a transport failure.
    pub fn write(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Write(Arc::new(source))
    }
}
