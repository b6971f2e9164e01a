//! Length-delimited transport over any async byte stream.
//!
//! Outbound messages are queued to a writer task that owns the sink half of
//! the [`Framed`] stream; each write reports back through a oneshot channel.
//! The queue is bounded: a write offered while it is full fails at once with
//! [`TransportError::QueueFull`].
//! The read half is driven separately by an [`InboundDriver`] once the
//! session that consumes it exists.

use std::{io, net::SocketAddr, sync::Arc, time::Duration};

use async_trait::async_trait;
use futures::{
    SinkExt,
    StreamExt,
    TryFutureExt,
    stream::{SplitSink, SplitStream},
};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpStream,
    sync::{
        mpsc::{self, error::TrySendError},
        oneshot,
    },
    task::JoinHandle,
    time::timeout,
};
use tokio_util::{codec::Framed, sync::CancellationToken};
use tracing::{debug, trace, warn};

use super::{Transport, TransportError, TransportEvents, WriteCompletion};
use crate::{
    codec::{CodecError, MessageCodec},
    message::Message,
    metrics::{self, Direction},
    session::SessionConfig,
};

/// Trait alias for byte streams a [`FramedTransport`] can run over.
pub trait ConnectionStream: AsyncRead + AsyncWrite + Unpin + Send + 'static {}
impl<T> ConnectionStream for T where T: AsyncRead + AsyncWrite + Unpin + Send + 'static {}

const INITIAL_READ_BUFFER_CAPACITY: usize = 64 * 1024;

type MessageSink<S> = SplitSink<Framed<S, MessageCodec>, Message>;
type WriteResult = Result<(), TransportError>;

enum WriterCommand {
    Write {
        message: Message,
        done: oneshot::Sender<WriteResult>,
    },
    Close {
        done: oneshot::Sender<WriteResult>,
    },
}

/// [`Transport`] backed by writer and reader tasks over a framed stream.
///
/// Dropping the transport shuts both tasks down.
#[derive(Debug)]
pub struct FramedTransport {
    commands: mpsc::Sender<WriterCommand>,
    shutdown: CancellationToken,
    local_addr: Option<SocketAddr>,
    peer_addr: Option<SocketAddr>,
}

impl FramedTransport {
    /// Wrap `stream` and spawn its writer task.
    ///
    /// Must be called from within a Tokio runtime. Inbound traffic is not
    /// read until the returned [`InboundDriver`] is spawned.
    pub fn new<S: ConnectionStream>(stream: S, config: &SessionConfig) -> (Self, InboundDriver<S>) {
        let max_frame_length = config.max_frame_length_value();
        let mut framed = Framed::new(stream, MessageCodec::new(max_frame_length));
        framed
            .read_buffer_mut()
            .reserve(INITIAL_READ_BUFFER_CAPACITY.min(max_frame_length));
        let (sink, stream) = framed.split();
        let (commands, queue) = mpsc::channel(config.write_queue_capacity_value());
        let shutdown = CancellationToken::new();
        tokio::spawn(write_loop(
            sink,
            queue,
            config.write_timeout_value(),
            shutdown.clone(),
        ));
        let transport = Self {
            commands,
            shutdown: shutdown.clone(),
            local_addr: None,
            peer_addr: None,
        };
        (transport, InboundDriver { stream, shutdown })
    }

    /// Wrap a connected TCP stream, recording its addresses.
    pub fn from_tcp(stream: TcpStream, config: &SessionConfig) -> (Self, InboundDriver<TcpStream>) {
        let local_addr = stream.local_addr().ok();
        let peer_addr = stream.peer_addr().ok();
        let (mut transport, driver) = Self::new(stream, config);
        transport.local_addr = local_addr;
        transport.peer_addr = peer_addr;
        (transport, driver)
    }
}

impl Drop for FramedTransport {
    fn drop(&mut self) { self.shutdown.cancel(); }
}

#[async_trait]
impl Transport for FramedTransport {
    fn send(&self, message: Message) -> WriteCompletion {
        let (done, completion) = oneshot::channel();
        let queued = self.commands.try_send(WriterCommand::Write { message, done });
        Box::pin(async move {
            match queued {
                Ok(()) => completion.await.unwrap_or(Err(TransportError::Cancelled)),
                Err(TrySendError::Full(_)) => Err(TransportError::QueueFull),
                Err(TrySendError::Closed(_)) => Err(TransportError::Closed),
            }
        })
    }

    async fn close(&self, limit: Duration) -> Result<(), TransportError> {
        if self.shutdown.is_cancelled() {
            return Ok(());
        }
        let (done, closed) = oneshot::channel();
        let commands = self.commands.clone();
        let flushed = async move {
            commands.send(WriterCommand::Close { done }).await.ok()?;
            closed.await.ok()
        };
        let outcome = timeout(limit, flushed).await;
        self.shutdown.cancel();
        match outcome {
            Ok(Some(result)) => result,
            Ok(None) => Ok(()),
            Err(_) => Err(io::Error::new(io::ErrorKind::TimedOut, "close timed out").into()),
        }
    }

    fn is_active(&self) -> bool { !self.shutdown.is_cancelled() }

    fn local_addr(&self) -> Option<SocketAddr> { self.local_addr }

    fn peer_addr(&self) -> Option<SocketAddr> { self.peer_addr }
}

/// Oversized or unencodable messages leave the stream intact.
fn is_fatal(error: &TransportError) -> bool {
    !matches!(
        error,
        TransportError::Codec(CodecError::Framing(_) | CodecError::UnsupportedCharset { .. })
    )
}

async fn write_one<S: ConnectionStream>(
    sink: &mut MessageSink<S>,
    message: Message,
    write_timeout: Option<Duration>,
) -> WriteResult {
    let write = sink.send(message).map_err(TransportError::from);
    match write_timeout {
        Some(limit) => timeout(limit, write)
            .await
            .unwrap_or(Err(TransportError::WriteTimeout(limit))),
        None => write.await,
    }
}

async fn write_loop<S: ConnectionStream>(
    mut sink: MessageSink<S>,
    mut queue: mpsc::Receiver<WriterCommand>,
    write_timeout: Option<Duration>,
    shutdown: CancellationToken,
) {
    loop {
        let command = tokio::select! {
            () = shutdown.cancelled() => break,
            command = queue.recv() => command,
        };
        match command {
            Some(WriterCommand::Write { message, done }) => {
                debug!(kind = ?message.message_type(), "sending message");
                trace!(?message, "outbound message");
                let result = write_one(&mut sink, message, write_timeout).await;
                let fatal = match &result {
                    Ok(()) => {
                        metrics::inc_frames(Direction::Outbound);
                        false
                    }
                    Err(error) => {
                        warn!(%error, "failed to write message");
                        metrics::inc_errors();
                        is_fatal(error)
                    }
                };
                let _ = done.send(result);
                if fatal {
                    break;
                }
            }
            Some(WriterCommand::Close { done }) => {
                let result = sink.close().await.map_err(TransportError::from);
                let _ = done.send(result);
                break;
            }
            None => break,
        }
    }
    // queued writes still in the channel resolve as cancelled once it drops
    shutdown.cancel();
}

/// Read half of a [`FramedTransport`].
pub struct InboundDriver<S> {
    stream: SplitStream<Framed<S, MessageCodec>>,
    shutdown: CancellationToken,
}

impl<S: ConnectionStream> InboundDriver<S> {
    /// Spawn the reader task delivering inbound traffic to `events`.
    pub fn spawn(self, events: Arc<dyn TransportEvents>) -> JoinHandle<()> {
        tokio::spawn(self.run(events))
    }

    async fn run(mut self, events: Arc<dyn TransportEvents>) {
        loop {
            let next = tokio::select! {
                () = self.shutdown.cancelled() => break,
                next = self.stream.next() => next,
            };
            match next {
                Some(Ok(Ok(message))) => {
                    debug!(kind = ?message.message_type(), "received message");
                    trace!(?message, "inbound message");
                    metrics::inc_frames(Direction::Inbound);
                    events.on_inbound_message(message).await;
                }
                Some(Ok(Err(malformed))) => {
                    debug!(error = %malformed, "received malformed message");
                    metrics::inc_errors();
                    events.on_transport_exception(malformed.into()).await;
                }
                Some(Err(error)) => {
                    debug!(%error, kind = error.error_type(), "inbound stream failed");
                    metrics::inc_errors();
                    events.on_transport_exception(error.into()).await;
                    break;
                }
                None => break,
            }
        }
        self.shutdown.cancel();
        events.on_transport_closed().await;
    }
}
