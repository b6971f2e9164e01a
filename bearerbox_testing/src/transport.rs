//! In-memory [`Transport`] with scripted write outcomes.

use std::{
    collections::VecDeque,
    io,
    sync::{
        Arc,
        Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use bearerbox::{
    Session,
    SessionConfig,
    SessionHandler,
    message::Message,
    transport::{Transport, TransportError, WriteCompletion},
};
use futures::future;
use tokio::sync::mpsc;

/// Outcome of a single scripted write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteBehaviour {
    /// The message is recorded and the write succeeds.
    Deliver,
    /// The write fails with a broken pipe.
    Fail,
    /// The write is reported as cancelled.
    Cancel,
}

/// Transport recording every delivered message in an outbox channel.
///
/// Writes succeed unless a [`WriteBehaviour`] was scripted for them.
#[derive(Debug)]
pub struct MockTransport {
    outbox: mpsc::UnboundedSender<Message>,
    script: Mutex<VecDeque<WriteBehaviour>>,
    active: AtomicBool,
    closes: AtomicUsize,
}

impl MockTransport {
    /// Create a transport and the receiver of its delivered messages.
    #[must_use]
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Message>) {
        let (outbox, delivered) = mpsc::unbounded_channel();
        let transport = Arc::new(Self {
            outbox,
            script: Mutex::new(VecDeque::new()),
            active: AtomicBool::new(true),
            closes: AtomicUsize::new(0),
        });
        (transport, delivered)
    }

    /// Queue the outcome of the next unscripted write.
    pub fn script(&self, behaviour: WriteBehaviour) {
        self.script
            .lock()
            .expect("script poisoned")
            .push_back(behaviour);
    }

    /// Number of times [`Transport::close`] was called.
    #[must_use]
    pub fn close_count(&self) -> usize { self.closes.load(Ordering::SeqCst) }

    /// Mark the transport inactive without a close request.
    pub fn disconnect(&self) { self.active.store(false, Ordering::SeqCst); }
}

#[async_trait]
impl Transport for MockTransport {
    fn send(&self, message: Message) -> WriteCompletion {
        if !self.is_active() {
            return Box::pin(future::ready(Err(TransportError::Closed)));
        }
        let behaviour = self
            .script
            .lock()
            .expect("script poisoned")
            .pop_front()
            .unwrap_or(WriteBehaviour::Deliver);
        let result = match behaviour {
            WriteBehaviour::Deliver => self
                .outbox
                .send(message)
                .map_err(|_| TransportError::Closed),
            WriteBehaviour::Fail => Err(TransportError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "scripted write failure",
            ))),
            WriteBehaviour::Cancel => Err(TransportError::Cancelled),
        };
        Box::pin(future::ready(result))
    }

    async fn close(&self, _timeout: Duration) -> Result<(), TransportError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.active.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_active(&self) -> bool { self.active.load(Ordering::SeqCst) }
}

/// A session wired to a [`MockTransport`].
pub struct MockSession {
    pub session: Session,
    pub transport: Arc<MockTransport>,
    /// Messages the session wrote, in order.
    pub outbox: mpsc::UnboundedReceiver<Message>,
}

/// Build a session over a fresh [`MockTransport`].
///
/// Inbound traffic is simulated by calling the session's
/// [`TransportEvents`](bearerbox::transport::TransportEvents) methods.
#[must_use]
pub fn mock_session(config: SessionConfig, handler: Arc<dyn SessionHandler>) -> MockSession {
    let (transport, outbox) = MockTransport::new();
    let session = Session::new(config, transport.clone(), handler);
    MockSession {
        session,
        transport,
        outbox,
    }
}
