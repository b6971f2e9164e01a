//! Utilities for exercising `bearerbox` sessions without a real gateway.
//!
//! - [`MockTransport`] records outbound messages and lets a test script the
//!   outcome of each write;
//! - [`RecordingHandler`] turns every handler callback into a
//!   [`HandlerEvent`] a test can await;
//! - [`Gateway`] plays the gateway side of a [`FramedTransport`] over an
//!   in-memory duplex stream.
//!
//! ```rust
//! use bearerbox::{SessionConfig, message::Admin};
//! use bearerbox_testing::{RecordingHandler, mock_session};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let (handler, _events) = RecordingHandler::new();
//! let mut mock = mock_session(SessionConfig::default(), handler);
//! mock.session.identify(Admin::identify("box")).await.unwrap();
//! assert!(matches!(mock.outbox.recv().await, Some(_)));
//! # }
//! ```
//!
//! [`FramedTransport`]: bearerbox::transport::FramedTransport

pub mod gateway;
pub mod handler;
pub mod logging;
pub mod transport;

pub use gateway::{BoxError, Gateway, connect_duplex};
pub use handler::{HandlerEvent, HandlerEvents, RecordingHandler};
pub use logging::{LoggerHandle, logger};
pub use transport::{MockSession, MockTransport, WriteBehaviour, mock_session};
