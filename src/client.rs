//! TCP connector for gateway sessions.
//!
//! [`Client`] resolves the configured gateway address, connects within the
//! connect timeout and wires a [`FramedTransport`] to a new [`Session`].

use std::{io, net::SocketAddr, sync::Arc, time::Duration};

use log::{debug, info};
use thiserror::Error;
use tokio::{
    net::{TcpSocket, TcpStream, lookup_host},
    time::timeout,
};

use crate::{
    message::Admin,
    session::{Session, SessionConfig, SessionError, SessionHandler},
    transport::FramedTransport,
};

/// Errors emitted while establishing a session.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ClientError {
    /// Address resolution or socket setup failed.
    #[error("connection error: {0}")]
    Io(#[from] io::Error),
    /// No connection was established within the connect timeout.
    #[error("connect timed out after {0:?}")]
    ConnectTimeout(Duration),
    /// The session could not be identified.
    #[error("session error: {0}")]
    Session(#[from] SessionError),
}

/// Opens sessions to the gateway described by a [`SessionConfig`].
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
///
/// use bearerbox::{
///     client::Client,
///     message::Sms,
///     session::{DefaultSessionHandler, SessionConfig},
/// };
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = SessionConfig::default().host("10.0.0.5").client_id("sms-box");
/// let session = Client::new(config)
///     .identify(Arc::new(DefaultSessionHandler))
///     .await?;
/// let ack = session
///     .send_request_and_wait(
///         Sms::new("1234", "5678", "hello"),
///         std::time::Duration::from_secs(5),
///     )
///     .await?;
/// println!("{:?}", ack.response);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Client {
    config: SessionConfig,
}

impl Client {
    #[must_use]
    pub fn new(config: SessionConfig) -> Self { Self { config } }

    #[must_use]
    pub fn config(&self) -> &SessionConfig { &self.config }

    /// Connect and start reading, without identifying.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Io`] if the host cannot be resolved or no
    /// address accepts the connection, and [`ClientError::ConnectTimeout`]
    /// if connecting takes longer than the connect timeout.
    pub async fn connect(&self, handler: Arc<dyn SessionHandler>) -> Result<Session, ClientError> {
        let stream = self.open_stream().await?;
        let (transport, driver) = FramedTransport::from_tcp(stream, &self.config);
        let session = Session::new(self.config.clone(), Arc::new(transport), handler);
        driver.spawn(session.transport_events());
        info!("connected to gateway at {:?}", session.peer_addr());
        Ok(session)
    }

    /// Connect and identify as the configured client id.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`connect`](Self::connect), or
    /// [`ClientError::Session`] if the identify command could not be
    /// delivered. The session is closed in that case.
    pub async fn identify(&self, handler: Arc<dyn SessionHandler>) -> Result<Session, ClientError> {
        let session = self.connect(handler).await?;
        session
            .identify(Admin::identify(self.config.client_id_value()))
            .await?;
        Ok(session)
    }

    async fn open_stream(&self) -> Result<TcpStream, ClientError> {
        let limit = self.config.connect_timeout_value();
        timeout(limit, self.dial())
            .await
            .unwrap_or(Err(ClientError::ConnectTimeout(limit)))
    }

    async fn dial(&self) -> Result<TcpStream, ClientError> {
        let target = (self.config.host_value(), self.config.port_value());
        let mut last_error = None;
        for addr in lookup_host(target).await? {
            match connect_to(addr).await {
                Ok(stream) => return Ok(stream),
                Err(error) => {
                    debug!("failed to connect to {addr}: {error}");
                    last_error = Some(error);
                }
            }
        }
        let error = last_error.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "gateway host resolved to no addresses")
        });
        Err(error.into())
    }
}

async fn connect_to(addr: SocketAddr) -> io::Result<TcpStream> {
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    socket.set_nodelay(true)?;
    socket.set_keepalive(true)?;
    socket.connect(addr).await
}
