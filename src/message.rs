//! Message model for the bearer box protocol.
//!
//! The gateway speaks five message kinds. [`Message`] is the closed set the
//! codec decodes into and the session dispatches on; the individual structs
//! carry the fields in wire order.

use bytes::Bytes;
use uuid::Uuid;

pub mod dlr;
pub mod enums;

pub use dlr::DlrMask;
pub use enums::{
    AckType,
    AdminCommand,
    Compress,
    DataCoding,
    MessageClass,
    MessageWaitingIndicator,
    ReturnPathIndicator,
    SmsType,
};

/// Integer value the gateway uses for "parameter not set".
pub const PARAM_UNDEFINED: i32 = -1;

/// Wire tag identifying the kind of a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// Keep-alive carrying the sender's load.
    HeartBeat,
    /// Administrative command.
    Admin,
    /// Short message.
    Sms,
    /// Acknowledgement of a previously sent short message.
    Ack,
    /// WDP datagram.
    Datagram,
}

impl MessageType {
    /// Return the on-wire tag for this message type.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::HeartBeat => 0,
            Self::Admin => 1,
            Self::Sms => 2,
            Self::Ack => 3,
            Self::Datagram => 4,
        }
    }

    /// Map an on-wire tag to a message type.
    ///
    /// Returns `None` for tags the protocol does not define.
    #[must_use]
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::HeartBeat),
            1 => Some(Self::Admin),
            2 => Some(Self::Sms),
            3 => Some(Self::Ack),
            4 => Some(Self::Datagram),
            _ => None,
        }
    }
}

/// Any message exchanged with the gateway.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Message {
    /// See [`HeartBeat`].
    HeartBeat(HeartBeat),
    /// See [`Admin`].
    Admin(Admin),
    /// See [`Sms`].
    Sms(Box<Sms>),
    /// See [`Ack`].
    Ack(Ack),
    /// See [`Datagram`].
    Datagram(Datagram),
}

impl Message {
    /// Return the wire tag of this message.
    #[must_use]
    pub const fn message_type(&self) -> MessageType {
        match self {
            Self::HeartBeat(_) => MessageType::HeartBeat,
            Self::Admin(_) => MessageType::Admin,
            Self::Sms(_) => MessageType::Sms,
            Self::Ack(_) => MessageType::Ack,
            Self::Datagram(_) => MessageType::Datagram,
        }
    }
}

impl From<HeartBeat> for Message {
    fn from(value: HeartBeat) -> Self { Self::HeartBeat(value) }
}

impl From<Admin> for Message {
    fn from(value: Admin) -> Self { Self::Admin(value) }
}

impl From<Sms> for Message {
    fn from(value: Sms) -> Self { Self::Sms(Box::new(value)) }
}

impl From<Ack> for Message {
    fn from(value: Ack) -> Self { Self::Ack(value) }
}

impl From<Datagram> for Message {
    fn from(value: Datagram) -> Self { Self::Datagram(value) }
}

/// Keep-alive message reporting the sender's current load.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HeartBeat {
    /// Load reported by the sender.
    pub load: i32,
}

impl HeartBeat {
    #[must_use]
    pub const fn new(load: i32) -> Self { Self { load } }
}

/// Administrative command exchanged between a box and the gateway.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Admin {
    pub command: AdminCommand,
    pub box_id: Option<String>,
}

impl Admin {
    /// Build an admin message.
    #[must_use]
    pub fn new(command: AdminCommand, box_id: impl Into<Option<String>>) -> Self {
        Self {
            command,
            box_id: box_id.into(),
        }
    }

    /// Build the handshake command that identifies a box to the gateway.
    ///
    /// # Examples
    ///
    /// ```
    /// use bearerbox::message::{Admin, AdminCommand};
    ///
    /// let admin = Admin::identify("sms-box");
    /// assert_eq!(admin.command, AdminCommand::Identify);
    /// assert_eq!(admin.box_id.as_deref(), Some("sms-box"));
    /// ```
    #[must_use]
    pub fn identify(box_id: impl Into<String>) -> Self {
        Self::new(AdminCommand::Identify, Some(box_id.into()))
    }
}

/// Acknowledgement the gateway sends for every short message it accepted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ack {
    /// Identifier of the acknowledged short message.
    pub id: Uuid,
    /// Outcome reported by the gateway.
    pub response: AckType,
    /// Gateway timestamp, or [`PARAM_UNDEFINED`].
    pub time: i32,
}

impl Ack {
    /// Build an acknowledgement without a timestamp.
    ///
    /// # Examples
    ///
    /// ```
    /// use bearerbox::message::{Ack, AckType, PARAM_UNDEFINED};
    /// use uuid::Uuid;
    ///
    /// let ack = Ack::new(Uuid::nil(), AckType::Success);
    /// assert_eq!(ack.time, PARAM_UNDEFINED);
    /// ```
    #[must_use]
    pub const fn new(id: Uuid, response: AckType) -> Self {
        Self {
            id,
            response,
            time: PARAM_UNDEFINED,
        }
    }
}

/// WDP datagram relayed through the gateway.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Datagram {
    pub source_address: Option<String>,
    pub source_port: i32,
    pub destination_address: Option<String>,
    pub destination_port: i32,
    pub user_data: Option<Bytes>,
}

impl Default for Datagram {
    fn default() -> Self {
        Self {
            source_address: None,
            source_port: PARAM_UNDEFINED,
            destination_address: None,
            destination_port: PARAM_UNDEFINED,
            user_data: None,
        }
    }
}

/// Short message, the request type correlated through the window.
///
/// Integer parameters left at [`PARAM_UNDEFINED`] are filled in by the
/// gateway from its own configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sms {
    pub sender: Option<String>,
    pub receiver: Option<String>,
    /// User data header octets.
    pub udh_data: Option<Bytes>,
    pub msg_data: Option<String>,
    pub time: i32,
    pub smsc_id: Option<String>,
    pub smsc_number: Option<String>,
    pub foreign_id: Option<String>,
    pub service: Option<String>,
    pub account: Option<String>,
    /// Correlation key. The session assigns one when absent.
    pub id: Option<Uuid>,
    pub sms_type: SmsType,
    pub message_class: MessageClass,
    pub mwi: MessageWaitingIndicator,
    pub coding: DataCoding,
    pub compress: Compress,
    pub validity: i32,
    pub deferred: i32,
    pub dlr_mask: DlrMask,
    pub dlr_url: Option<String>,
    pub pid: i32,
    pub alt_dcs: i32,
    pub rpi: ReturnPathIndicator,
    /// Character set `msg_data` travels in; see [`TextCharset`](crate::codec::charset::TextCharset).
    pub charset: Option<String>,
    /// Box that owns the message. The session stamps its client id when absent.
    pub box_id: Option<String>,
    pub billing_info: Option<String>,
    pub msg_left: i32,
    pub priority: i32,
    pub resend_try: i32,
    pub resend_time: i32,
    pub meta_data: Option<String>,
}

impl Default for Sms {
    fn default() -> Self {
        Self {
            sender: None,
            receiver: None,
            udh_data: None,
            msg_data: None,
            time: PARAM_UNDEFINED,
            smsc_id: None,
            smsc_number: None,
            foreign_id: None,
            service: None,
            account: None,
            id: None,
            sms_type: SmsType::Undefined,
            message_class: MessageClass::Undefined,
            mwi: MessageWaitingIndicator::Undefined,
            coding: DataCoding::Undefined,
            compress: Compress::Undefined,
            validity: PARAM_UNDEFINED,
            deferred: PARAM_UNDEFINED,
            dlr_mask: DlrMask::UNDEFINED,
            dlr_url: None,
            pid: PARAM_UNDEFINED,
            alt_dcs: PARAM_UNDEFINED,
            rpi: ReturnPathIndicator::Undefined,
            charset: None,
            box_id: None,
            billing_info: None,
            msg_left: PARAM_UNDEFINED,
            priority: PARAM_UNDEFINED,
            resend_try: PARAM_UNDEFINED,
            resend_time: PARAM_UNDEFINED,
            meta_data: None,
        }
    }
}

impl Sms {
    /// Build a mobile-terminated push message.
    ///
    /// # Examples
    ///
    /// ```
    /// use bearerbox::message::{Sms, SmsType};
    ///
    /// let sms = Sms::new("1234", "306900000000", "hello");
    /// assert_eq!(sms.sms_type, SmsType::MtPush);
    /// assert!(sms.id.is_none());
    /// ```
    #[must_use]
    pub fn new(
        sender: impl Into<String>,
        receiver: impl Into<String>,
        msg_data: impl Into<String>,
    ) -> Self {
        Self {
            sender: Some(sender.into()),
            receiver: Some(receiver.into()),
            msg_data: Some(msg_data.into()),
            sms_type: SmsType::MtPush,
            ..Self::default()
        }
    }

    /// Set the correlation key.
    #[must_use]
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    /// Request delivery reports for the given mask.
    #[must_use]
    pub fn with_dlr(mut self, mask: DlrMask, url: impl Into<String>) -> Self {
        self.dlr_mask = mask;
        self.dlr_url = Some(url.into());
        self
    }
}
