//! Session handler that records every callback.

use std::sync::Arc;

use async_trait::async_trait;
use bearerbox::{
    Session,
    SessionHandler,
    message::{Ack, Admin, Datagram, HeartBeat, Sms},
    session::SmsPromise,
    transport::TransportError,
};
use tokio::sync::mpsc;

/// One handler callback, with its argument.
#[derive(Debug)]
pub enum HandlerEvent {
    SessionReady,
    RequestExpired(Sms),
    MalformedMessage(TransportError),
    UnknownError(TransportError),
    ConnectionLost,
    UnexpectedResponse(Ack),
    ResponseReceived(SmsPromise),
    SmsReceived(Sms),
    AdminReceived(Admin),
    HeartBeatReceived(HeartBeat),
    DatagramReceived(Datagram),
}

/// [`SessionHandler`] forwarding every callback as a [`HandlerEvent`].
///
/// Unlike the default handler it does not acknowledge inbound sms.
#[derive(Debug)]
pub struct RecordingHandler {
    events: mpsc::UnboundedSender<HandlerEvent>,
}

impl RecordingHandler {
    /// Create a handler and the stream of its events.
    #[must_use]
    pub fn new() -> (Arc<Self>, HandlerEvents) {
        let (events, received) = mpsc::unbounded_channel();
        (Arc::new(Self { events }), HandlerEvents(received))
    }

    fn record(&self, event: HandlerEvent) { let _ = self.events.send(event); }
}

#[async_trait]
impl SessionHandler for RecordingHandler {
    async fn on_session_ready(&self, _session: &Session) { self.record(HandlerEvent::SessionReady); }

    async fn on_request_expired(&self, request: Sms) {
        self.record(HandlerEvent::RequestExpired(request));
    }

    async fn on_malformed_message(&self, error: TransportError) {
        self.record(HandlerEvent::MalformedMessage(error));
    }

    async fn on_unknown_error(&self, error: TransportError) {
        self.record(HandlerEvent::UnknownError(error));
    }

    async fn on_connection_lost(&self) { self.record(HandlerEvent::ConnectionLost); }

    async fn on_unexpected_response(&self, ack: Ack) {
        self.record(HandlerEvent::UnexpectedResponse(ack));
    }

    async fn on_response_received(&self, promise: SmsPromise) {
        self.record(HandlerEvent::ResponseReceived(promise));
    }

    async fn on_sms_received(&self, _session: &Session, sms: Sms) {
        self.record(HandlerEvent::SmsReceived(sms));
    }

    async fn on_admin_received(&self, _session: &Session, admin: Admin) {
        self.record(HandlerEvent::AdminReceived(admin));
    }

    async fn on_heartbeat_received(&self, _session: &Session, heartbeat: HeartBeat) {
        self.record(HandlerEvent::HeartBeatReceived(heartbeat));
    }

    async fn on_datagram_received(&self, _session: &Session, datagram: Datagram) {
        self.record(HandlerEvent::DatagramReceived(datagram));
    }
}

/// Events recorded by a [`RecordingHandler`].
#[derive(Debug)]
pub struct HandlerEvents(mpsc::UnboundedReceiver<HandlerEvent>);

impl HandlerEvents {
    /// Wait for the next event. `None` once the handler is dropped.
    pub async fn next(&mut self) -> Option<HandlerEvent> { self.0.recv().await }

    /// Events recorded so far, without waiting.
    pub fn drain(&mut self) -> Vec<HandlerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.0.try_recv() {
            events.push(event);
        }
        events
    }
}
