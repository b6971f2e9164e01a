//! Canonical error and result types for the crate.
//!
//! Each layer has its own error enum; [`Error`] gathers them for callers,
//! such as the `bearerbox` binary, that drive several layers at once.

use crate::{
    client::ClientError,
    session::{ConfigError, SessionError},
    transport::TransportError,
};

/// Top-level error type exposed by `bearerbox`.
#[non_exhaustive]
#[derive(Debug)]
pub enum Error {
    /// The configuration could not be loaded.
    Config(ConfigError),
    /// No session could be established.
    Client(ClientError),
    /// A session operation failed.
    Session(SessionError),
    /// The connection failed outside a session operation.
    Transport(TransportError),
}

impl From<ConfigError> for Error {
    fn from(error: ConfigError) -> Self { Self::Config(error) }
}

impl From<ClientError> for Error {
    fn from(error: ClientError) -> Self { Self::Client(error) }
}

impl From<SessionError> for Error {
    fn from(error: SessionError) -> Self { Self::Session(error) }
}

impl From<TransportError> for Error {
    fn from(error: TransportError) -> Self { Self::Transport(error) }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(error) => write!(f, "configuration error: {error}"),
            Self::Client(error) => write!(f, "client error: {error}"),
            Self::Session(error) => write!(f, "session error: {error}"),
            Self::Transport(error) => write!(f, "transport error: {error}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(error) => Some(error),
            Self::Client(error) => Some(error),
            Self::Session(error) => Some(error),
            Self::Transport(error) => Some(error),
        }
    }
}

/// Result type alias using the crate's [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use rstest::rstest;

    use super::Error;
    use crate::{session::SessionError, transport::TransportError};

    #[rstest]
    #[case(Error::from(SessionError::ResponseTimeout), "session error: timed out waiting for a response")]
    #[case(Error::from(TransportError::Closed), "transport error: transport closed")]
    fn display_names_the_layer(#[case] error: Error, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
        assert!(error.source().is_some());
    }
}
