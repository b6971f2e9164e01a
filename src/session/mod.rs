//! Client session over a gateway connection.
//!
//! A [`Session`] owns the correlation window for outbound sms requests and
//! routes inbound traffic: acks resolve window entries, everything else goes
//! to the [`SessionHandler`]. It moves `Open → Identified → Closed` and never
//! back.
//!
//! The transport reports inbound traffic through
//! [`Session::transport_events`], a sink holding only a weak reference, so a
//! transport can outlive the session without keeping it alive.

use std::{
    fmt,
    net::SocketAddr,
    sync::{
        Arc,
        PoisonError,
        RwLock,
        Weak,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::{
    message::{Ack, Admin, AdminCommand, HeartBeat, Message, Sms},
    metrics,
    transport::{Transport, TransportError, TransportEvents, WriteCompletion},
    window::{CallerHint, ExpiryListener, Outcome, RequestError, RequestPromise, Window},
};

mod config;
mod error;
mod handler;
mod state;

pub use config::{ConfigError, DEFAULT_CLIENT_ID, DEFAULT_PORT, SessionConfig};
pub use error::SessionError;
pub use handler::{DefaultSessionHandler, SessionHandler};
pub use state::SessionState;
use state::StateCell;

/// Window correlating sms requests with their acks by sms id.
pub type SmsWindow = Window<Uuid, Sms, Ack>;
/// Promise for an sms request awaiting its ack.
pub type SmsPromise = RequestPromise<Uuid, Sms, Ack>;

/// RAII guard tracking live sessions in the metrics gauge.
struct ActiveSession;

impl ActiveSession {
    fn new() -> Self {
        metrics::inc_sessions();
        Self
    }
}

impl Drop for ActiveSession {
    fn drop(&mut self) { metrics::dec_sessions(); }
}

struct SessionInner {
    window: SmsWindow,
    config: SessionConfig,
    transport: Arc<dyn Transport>,
    handler: RwLock<Option<Arc<dyn SessionHandler>>>,
    state: StateCell,
    connection_lost: AtomicBool,
    monitor: CancellationToken,
    _active: ActiveSession,
}

impl Drop for SessionInner {
    fn drop(&mut self) { self.monitor.cancel(); }
}

/// Handle on a gateway session. Clones share the same session.
#[derive(Clone)]
pub struct Session(Arc<SessionInner>);

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state())
            .field("window", &self.0.window)
            .field("peer_addr", &self.peer_addr())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Create a session over `transport`.
    ///
    /// Inbound traffic reaches the session only once the transport is wired
    /// to [`transport_events`](Self::transport_events). Must be called from
    /// within a Tokio runtime when the window monitor is enabled.
    #[must_use]
    pub fn new(
        config: SessionConfig,
        transport: Arc<dyn Transport>,
        handler: Arc<dyn SessionHandler>,
    ) -> Self {
        let inner = Arc::new_cyclic(|session: &Weak<SessionInner>| {
            let listener: Arc<dyn ExpiryListener<Uuid, Sms, Ack>> =
                Arc::new(ExpiryForwarder(session.clone()));
            SessionInner {
                window: Window::with_listener(config.window_size_value(), listener),
                config,
                transport,
                handler: RwLock::new(Some(handler)),
                state: StateCell::new(),
                connection_lost: AtomicBool::new(false),
                monitor: CancellationToken::new(),
                _active: ActiveSession::new(),
            }
        });
        let session = Self(inner);
        if let Some(interval) = session.0.config.window_monitor_interval_value() {
            session.spawn_window_monitor(interval);
        }
        session
    }

    /// Sink the transport reports inbound traffic to.
    #[must_use]
    pub fn transport_events(&self) -> Arc<dyn TransportEvents> {
        Arc::new(SessionEvents(Arc::downgrade(&self.0)))
    }

    /// Identify this box to the gateway.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotIdentifyCommand`] without touching the
    /// session if `command` is not an identify command. If the write fails
    /// the session is closed and the transport error is returned.
    pub async fn identify(&self, command: Admin) -> Result<(), SessionError> {
        if command.command != AdminCommand::Identify {
            return Err(SessionError::NotIdentifyCommand);
        }
        let box_id = command.box_id.clone();
        if let Err(error) = self.0.transport.send(Message::from(command)).await {
            warn!(%error, "identify failed; closing session");
            self.close().await;
            return Err(error.into());
        }
        if self.0.state.advance(SessionState::Identified).is_none() {
            debug!(?box_id, state = %self.state(), "identify sent to a session past identification");
            return Ok(());
        }
        info!(?box_id, "session identified");
        if let Some(handler) = self.handler() {
            handler.on_session_ready(self).await;
        }
        Ok(())
    }

    /// Send an sms request using the configured request expiry.
    ///
    /// Waits up to `admission_timeout` for a window slot. Failures to admit
    /// or write the request are reported through the returned promise.
    pub async fn send_request(&self, sms: Sms, admission_timeout: Duration) -> SmsPromise {
        let expiry = self.0.config.request_expiry_timeout_value();
        self.submit(sms, admission_timeout, expiry, false).await
    }

    /// Send an sms request that expires after `expiry` without an ack.
    pub async fn send_request_with_expiry(
        &self,
        sms: Sms,
        admission_timeout: Duration,
        expiry: Option<Duration>,
    ) -> SmsPromise {
        self.submit(sms, admission_timeout, expiry, false).await
    }

    /// Send an sms request and wait up to `timeout` for its ack.
    ///
    /// The timeout covers both admission and the wait for a response.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ResponseTimeout`] if no ack arrived in time;
    /// the request is cancelled and its slot released. Failed and cancelled
    /// requests map to [`SessionError::Request`] and
    /// [`SessionError::Cancelled`].
    pub async fn send_request_and_wait(
        &self,
        sms: Sms,
        timeout: Duration,
    ) -> Result<Ack, SessionError> {
        // a deadline past the clock's range waits indefinitely
        let deadline = Instant::now().checked_add(timeout);
        let expiry = self.0.config.request_expiry_timeout_value();
        let promise = self.submit(sms, timeout, expiry, true).await;
        let remaining = deadline.map(|deadline| deadline.saturating_duration_since(Instant::now()));
        if !promise.wait(remaining).await && promise.cancel() {
            debug!(id = %promise.key(), "no response in time; request cancelled");
            return Err(SessionError::ResponseTimeout);
        }
        match promise.outcome() {
            Some(Outcome::Completed(ack)) => Ok(*ack),
            Some(Outcome::Failed(error)) => Err(SessionError::Request(error.clone())),
            Some(Outcome::Cancelled) => Err(SessionError::Cancelled),
            None => Err(SessionError::ResponseTimeout),
        }
    }

    async fn submit(
        &self,
        mut sms: Sms,
        admission_timeout: Duration,
        expiry: Option<Duration>,
        waiting: bool,
    ) -> SmsPromise {
        let id = *sms.id.get_or_insert_with(Uuid::new_v4);
        if sms.box_id.is_none() {
            sms.box_id = Some(self.0.config.client_id_value().to_owned());
        }
        let promise = self
            .0
            .window
            .offer(id, sms.clone(), admission_timeout, expiry)
            .await;
        if promise.is_done() {
            debug!(%id, cause = ?promise.cause(), "request not admitted");
            return promise;
        }
        if waiting {
            promise.set_hint(CallerHint::Waiting);
        }

        let written = self.0.transport.send(Message::from(sms));
        let window = self.0.window.clone();
        let tracked = promise.clone();
        tokio::spawn(async move {
            match written.await {
                Ok(()) => trace!(id = %tracked.key(), "request written"),
                Err(TransportError::Cancelled) => {
                    tracked.cancel();
                }
                Err(error) => {
                    debug!(%error, id = %tracked.key(), "request write failed");
                    window.fail_exact(&tracked, RequestError::write(error));
                }
            }
        });
        promise
    }

    /// Write `message` directly, bypassing the window.
    ///
    /// The write proceeds even if the returned completion is dropped.
    pub fn send_fire_and_forget(&self, message: impl Into<Message>) -> WriteCompletion {
        self.0.transport.send(message.into())
    }

    pub fn send_heartbeat(&self, heartbeat: HeartBeat) -> WriteCompletion {
        self.send_fire_and_forget(heartbeat)
    }

    /// Acknowledge an sms delivered by the gateway.
    pub fn send_ack(&self, ack: Ack) -> WriteCompletion { self.send_fire_and_forget(ack) }

    /// Close the session using the configured close timeout.
    pub async fn close(&self) { self.close_with_timeout(self.0.config.close_timeout_value()).await; }

    /// Close the transport, waiting at most `timeout`.
    ///
    /// The session is marked closed before the transport shuts down, so the
    /// resulting connection closure is not reported as a loss.
    pub async fn close_with_timeout(&self, timeout: Duration) {
        if let Some(previous) = self.0.state.advance(SessionState::Closed) {
            info!(%previous, "closing session");
        }
        if self.0.transport.is_active()
            && let Err(error) = self.0.transport.close(timeout).await
        {
            warn!(%error, "transport did not close cleanly");
        }
    }

    /// Close the session, cancel every request and detach the handler.
    pub async fn destroy(&self) {
        self.close().await;
        let cancelled = self.0.window.destroy();
        if !cancelled.is_empty() {
            debug!(count = cancelled.len(), "cancelled in-flight requests");
        }
        self.0.monitor.cancel();
        self.0
            .handler
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    /// Handler receiving this session's events, until the session is
    /// destroyed.
    #[must_use]
    pub fn handler(&self) -> Option<Arc<dyn SessionHandler>> {
        self.0
            .handler
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn state(&self) -> SessionState { self.0.state.get() }

    #[must_use]
    pub fn is_identified(&self) -> bool { self.state() == SessionState::Identified }

    #[must_use]
    pub fn is_closed(&self) -> bool { self.state() == SessionState::Closed }

    /// Requests currently in flight.
    #[must_use]
    pub fn window_size(&self) -> usize { self.0.window.size() }

    #[must_use]
    pub fn max_window_size(&self) -> usize { self.0.window.max_size() }

    #[must_use]
    pub fn window(&self) -> &SmsWindow { &self.0.window }

    #[must_use]
    pub fn config(&self) -> &SessionConfig { &self.0.config }

    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> { self.0.transport.local_addr() }

    #[must_use]
    pub fn peer_addr(&self) -> Option<SocketAddr> { self.0.transport.peer_addr() }

    async fn dispatch_ack(&self, handler: &dyn SessionHandler, ack: Ack) {
        let Some(promise) = self.0.window.complete(&ack.id, ack) else {
            handler.on_unexpected_response(ack).await;
            return;
        };
        match promise.caller_hint() {
            CallerHint::Waiting => trace!(id = %ack.id, "waiting caller takes the response"),
            CallerHint::NotWaiting => handler.on_response_received(promise).await,
            CallerHint::GaveUp => handler.on_unexpected_response(ack).await,
        }
    }

    fn spawn_window_monitor(&self, interval: Duration) {
        let window = self.0.window.clone();
        let stop = self.0.monitor.clone();
        tokio::spawn(async move {
            let mut ticks = tokio::time::interval(interval);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    () = stop.cancelled() => break,
                    _ = ticks.tick() => debug!(
                        size = window.size(),
                        max_size = window.max_size(),
                        free = window.free_size(),
                        pending_offers = window.pending_offer_count(),
                        "window occupancy"
                    ),
                }
            }
        });
    }
}

#[async_trait]
impl TransportEvents for Session {
    async fn on_inbound_message(&self, message: Message) {
        let Some(handler) = self.handler() else {
            debug!(kind = ?message.message_type(), "dropping message for destroyed session");
            return;
        };
        match message {
            Message::Ack(ack) => self.dispatch_ack(handler.as_ref(), ack).await,
            Message::Sms(sms) => handler.on_sms_received(self, *sms).await,
            Message::Admin(admin) => handler.on_admin_received(self, admin).await,
            Message::HeartBeat(heartbeat) => handler.on_heartbeat_received(self, heartbeat).await,
            Message::Datagram(datagram) => handler.on_datagram_received(self, datagram).await,
        }
    }

    async fn on_transport_exception(&self, error: TransportError) {
        if self.is_closed() {
            debug!(%error, "ignoring transport error on closed session");
            return;
        }
        let Some(handler) = self.handler() else {
            return;
        };
        if error.is_malformed() {
            handler.on_malformed_message(error).await;
        } else {
            handler.on_unknown_error(error).await;
        }
    }

    async fn on_transport_closed(&self) {
        let failed = self.0.window.fail_all(&RequestError::ConnectionClosed);
        if !failed.is_empty() {
            debug!(count = failed.len(), "failed in-flight requests on connection close");
        }
        if self.is_closed() {
            debug!("connection closed");
            return;
        }
        if self.0.connection_lost.swap(true, Ordering::AcqRel) {
            return;
        }
        warn!(peer = ?self.peer_addr(), "connection lost");
        if let Some(handler) = self.handler() {
            handler.on_connection_lost().await;
        }
    }
}

/// Weak bridge from a transport to its session.
struct SessionEvents(Weak<SessionInner>);

impl SessionEvents {
    fn session(&self) -> Option<Session> { self.0.upgrade().map(Session) }
}

#[async_trait]
impl TransportEvents for SessionEvents {
    async fn on_inbound_message(&self, message: Message) {
        if let Some(session) = self.session() {
            session.on_inbound_message(message).await;
        }
    }

    async fn on_transport_exception(&self, error: TransportError) {
        if let Some(session) = self.session() {
            session.on_transport_exception(error).await;
        }
    }

    async fn on_transport_closed(&self) {
        if let Some(session) = self.session() {
            session.on_transport_closed().await;
        }
    }
}

struct ExpiryForwarder(Weak<SessionInner>);

#[async_trait]
impl ExpiryListener<Uuid, Sms, Ack> for ExpiryForwarder {
    async fn on_expired(&self, promise: SmsPromise) {
        let Some(handler) = self.0.upgrade().map(Session).and_then(|session| session.handler()) else {
            return;
        };
        handler.on_request_expired(promise.request().clone()).await;
    }
}

#[cfg(test)]
mod tests;
