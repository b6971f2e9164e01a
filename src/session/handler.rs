//! Callbacks through which a [`Session`] reports traffic and failures.

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{Session, SmsPromise};
use crate::{
    message::{Ack, AckType, Admin, Datagram, HeartBeat, Sms},
    transport::TransportError,
};

/// Receives session events.
///
/// Every method has a default that logs the event and otherwise ignores it,
/// so implementors override only what they care about. Callbacks run on the
/// task that observed the event; long-running work should be spawned.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use bearerbox::{
///     message::{Ack, AckType, Sms},
///     session::{Session, SessionHandler},
/// };
///
/// struct Inbox;
///
/// #[async_trait]
/// impl SessionHandler for Inbox {
///     async fn on_sms_received(&self, session: &Session, sms: Sms) {
///         println!("{:?}: {:?}", sms.sender, sms.msg_data);
///         if let Some(id) = sms.id {
///             let _ = session.send_ack(Ack::new(id, AckType::Failed)).await;
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait SessionHandler: Send + Sync + 'static {
    /// The identify handshake was delivered.
    async fn on_session_ready(&self, session: &Session) {
        debug!(state = %session.state(), "session ready");
    }

    /// A request expired before its ack arrived.
    async fn on_request_expired(&self, request: Sms) {
        warn!(id = ?request.id, "ignoring request that expired unanswered");
    }

    /// An inbound frame could not be decoded. The session keeps running.
    async fn on_malformed_message(&self, error: TransportError) {
        warn!(%error, "ignoring malformed message");
    }

    /// The transport reported a failure that is not a malformed message.
    async fn on_unknown_error(&self, error: TransportError) {
        warn!(%error, "ignoring transport error");
    }

    /// The connection closed without the session being closed first.
    async fn on_connection_lost(&self) {
        warn!("ignoring unexpected connection loss");
    }

    /// An ack arrived for no request, or for one whose caller gave up.
    async fn on_unexpected_response(&self, ack: Ack) {
        warn!(id = %ack.id, response = ?ack.response, "ignoring unexpected ack");
    }

    /// An ack completed a request nobody is waiting on.
    async fn on_response_received(&self, promise: SmsPromise) {
        debug!(id = %promise.key(), response = ?promise.response(), "response received");
    }

    /// The gateway delivered an sms.
    ///
    /// The default acknowledges it as successfully handled.
    async fn on_sms_received(&self, session: &Session, sms: Sms) {
        let Some(id) = sms.id else {
            warn!("cannot acknowledge an sms without an id");
            return;
        };
        warn!(%id, "acknowledging unhandled sms as successful");
        if let Err(error) = session.send_ack(Ack::new(id, AckType::Success)).await {
            warn!(%error, %id, "failed to acknowledge sms");
        }
    }

    async fn on_admin_received(&self, _session: &Session, admin: Admin) {
        warn!(command = ?admin.command, "ignoring admin command");
    }

    async fn on_heartbeat_received(&self, _session: &Session, heartbeat: HeartBeat) {
        debug!(load = heartbeat.load, "ignoring heartbeat");
    }

    async fn on_datagram_received(&self, _session: &Session, datagram: Datagram) {
        warn!(source = ?datagram.source_address, "ignoring datagram");
    }
}

/// Handler relying entirely on the default behaviour.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultSessionHandler;

#[async_trait]
impl SessionHandler for DefaultSessionHandler {}
