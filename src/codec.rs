//! Wire codec for gateway messages.
//!
//! Frames are a 4-byte big-endian length followed by the message body. The
//! body opens with a 4-byte type tag and carries its fields in a fixed
//! per-type order (see [`octets`] for the field encodings).
//!
//! # Error Handling
//!
//! A malformed body is not a stream error: [`MessageCodec`] yields it as an
//! `Err` item so that the connection keeps reading. Only conditions that
//! leave the stream unusable surface as [`CodecError`].

use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder, LengthDelimitedCodec};

use crate::{
    byte_order::read_network_u32,
    message::{
        Ack,
        AckType,
        Admin,
        AdminCommand,
        Compress,
        DataCoding,
        Datagram,
        DlrMask,
        HeartBeat,
        Message,
        MessageClass,
        MessageType,
        MessageWaitingIndicator,
        ReturnPathIndicator,
        Sms,
        SmsType,
    },
};

pub mod charset;
pub mod error;
pub mod octets;

pub use error::{CodecError, DecodeError, EofError, FramingError};
use charset::TextCharset;
use octets::{FieldReader, write_int, write_octets, write_string, write_uuid};

/// Minimum frame length in bytes.
pub const MIN_FRAME_LENGTH: usize = 64;

/// Maximum frame length in bytes (16 MiB).
pub const MAX_FRAME_LENGTH: usize = 16 * 1024 * 1024;

/// Frame length used unless configured otherwise (64 KiB).
pub const DEFAULT_MAX_FRAME_LENGTH: usize = 64 * 1024;

/// Length prefix header size.
pub const LENGTH_HEADER_SIZE: usize = 4;

pub(crate) fn clamp_frame_length(value: usize) -> usize {
    value.clamp(MIN_FRAME_LENGTH, MAX_FRAME_LENGTH)
}

/// Length-delimited codec producing [`Message`]s.
///
/// # Examples
///
/// ```
/// use bearerbox::{
///     codec::MessageCodec,
///     message::{HeartBeat, Message},
/// };
/// use bytes::BytesMut;
/// use tokio_util::codec::{Decoder, Encoder};
///
/// let mut codec = MessageCodec::default();
/// let mut buf = BytesMut::new();
/// codec.encode(Message::from(HeartBeat::new(7)), &mut buf).unwrap();
/// assert_eq!(&buf[..], &[0, 0, 0, 8, 0, 0, 0, 0, 0, 0, 0, 7]);
///
/// let decoded = codec.decode(&mut buf).unwrap().unwrap();
/// assert_eq!(decoded, Ok(Message::from(HeartBeat::new(7))));
/// ```
#[derive(Debug)]
pub struct MessageCodec {
    encoder: LengthDelimitedCodec,
    max_frame_length: usize,
}

impl MessageCodec {
    /// Create a codec accepting frames of at most `max_frame_length` bytes.
    ///
    /// The value is clamped between 64 bytes and 16 MiB.
    #[must_use]
    pub fn new(max_frame_length: usize) -> Self {
        let max_frame_length = clamp_frame_length(max_frame_length);
        let encoder = LengthDelimitedCodec::builder()
            .length_field_length(LENGTH_HEADER_SIZE)
            .big_endian()
            .max_frame_length(max_frame_length)
            .new_codec();
        Self {
            encoder,
            max_frame_length,
        }
    }

    #[must_use]
    pub fn max_frame_length(&self) -> usize { self.max_frame_length }

    fn check_frame_length(&self, size: usize) -> Result<(), FramingError> {
        if size > self.max_frame_length {
            return Err(FramingError::OversizedFrame {
                size,
                max: self.max_frame_length,
            });
        }
        Ok(())
    }
}

impl Default for MessageCodec {
    fn default() -> Self { Self::new(DEFAULT_MAX_FRAME_LENGTH) }
}

impl Decoder for MessageCodec {
    type Item = Result<Message, DecodeError>;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(size) = announced_length(src) else {
            return Ok(None);
        };
        self.check_frame_length(size)?;
        let needed = LENGTH_HEADER_SIZE + size;
        if src.len() < needed {
            src.reserve(needed - src.len());
            return Ok(None);
        }
        src.advance(LENGTH_HEADER_SIZE);
        let payload = src.split_to(size).freeze();
        Ok(Some(decode_message(payload)))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }
        match self.decode(src)? {
            Some(item) => Ok(Some(item)),
            None => Err(build_eof_error(src).into()),
        }
    }
}

impl Encoder<Message> for MessageCodec {
    type Error = CodecError;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let mut body = BytesMut::new();
        encode_message(&item, &mut body)?;
        if body.len() > self.max_frame_length {
            return Err(FramingError::OversizedFrame {
                size: body.len(),
                max: self.max_frame_length,
            }
            .into());
        }
        self.encoder.encode(body.freeze(), dst)?;
        Ok(())
    }
}

fn announced_length(src: &BytesMut) -> Option<usize> {
    src.get(..LENGTH_HEADER_SIZE)
        .and_then(|slice| <[u8; LENGTH_HEADER_SIZE]>::try_from(slice).ok())
        .map(|bytes| usize::try_from(read_network_u32(bytes)).unwrap_or(usize::MAX))
}

/// Build the EOF error matching how far into a frame the stream ended.
fn build_eof_error(src: &BytesMut) -> EofError {
    let bytes_received = src.len();
    match announced_length(src) {
        Some(expected) => EofError::MidFrame {
            bytes_received: bytes_received.saturating_sub(LENGTH_HEADER_SIZE),
            expected,
        },
        None => EofError::MidHeader {
            bytes_received,
            header_size: LENGTH_HEADER_SIZE,
        },
    }
}

/// Decode one message body (the frame payload without its length prefix).
///
/// Every field is read before the enumerations are validated, so a body
/// that is both truncated and carries an undefined code reports the
/// truncation.
///
/// # Errors
///
/// Returns a [`DecodeError`] describing the first structural violation.
pub fn decode_message(body: Bytes) -> Result<Message, DecodeError> {
    let mut r = FieldReader::new(body);
    let type_id = r.read_int()?;
    let message = match MessageType::from_code(type_id) {
        Some(MessageType::HeartBeat) => Message::HeartBeat(HeartBeat::new(r.read_int()?)),
        Some(MessageType::Admin) => Message::Admin(decode_admin(&mut r)?),
        Some(MessageType::Sms) => Message::Sms(Box::new(decode_sms(&mut r)?)),
        Some(MessageType::Ack) => Message::Ack(decode_ack(&mut r)?),
        Some(MessageType::Datagram) => Message::Datagram(decode_datagram(&mut r)?),
        None => return Err(DecodeError::UnknownMessageType { type_id }),
    };
    if r.remaining() > 0 {
        tracing::trace!(
            remaining = r.remaining(),
            "ignoring trailing bytes after message body"
        );
    }
    Ok(message)
}

fn decode_admin(r: &mut FieldReader) -> Result<Admin, DecodeError> {
    let command = AdminCommand::from_code(r.read_int()?);
    let box_id = r.read_string()?;
    if command.is_undefined() {
        return Err(DecodeError::UndefinedAdminCommand);
    }
    Ok(Admin { command, box_id })
}

fn decode_ack(r: &mut FieldReader) -> Result<Ack, DecodeError> {
    let response = AckType::from_code(r.read_int()?);
    let time = r.read_int()?;
    let id = r.read_uuid()?;
    if response.is_undefined() {
        return Err(DecodeError::UndefinedAckType);
    }
    Ok(Ack { id, response, time })
}

fn decode_datagram(r: &mut FieldReader) -> Result<Datagram, DecodeError> {
    Ok(Datagram {
        source_address: r.read_string()?,
        source_port: r.read_int()?,
        destination_address: r.read_string()?,
        destination_port: r.read_int()?,
        user_data: r.read_octets()?,
    })
}

/// `msg_data` precedes the `charset` label that names its encoding, so it is
/// held as raw octets until the label has been read.
fn decode_sms(r: &mut FieldReader) -> Result<Sms, DecodeError> {
    let sender = r.read_string()?;
    let receiver = r.read_string()?;
    let udh_data = r.read_octets()?;
    let raw_text = r.read_octets()?;
    let mut sms = Sms {
        sender,
        receiver,
        udh_data,
        msg_data: None,
        time: r.read_int()?,
        smsc_id: r.read_string()?,
        smsc_number: r.read_string()?,
        foreign_id: r.read_string()?,
        service: r.read_string()?,
        account: r.read_string()?,
        id: Some(r.read_uuid()?),
        sms_type: SmsType::from_code(r.read_int()?),
        message_class: MessageClass::from_code(r.read_int()?),
        mwi: MessageWaitingIndicator::from_code(r.read_int()?),
        coding: DataCoding::from_code(r.read_int()?),
        compress: Compress::from_code(r.read_int()?),
        validity: r.read_int()?,
        deferred: r.read_int()?,
        dlr_mask: DlrMask::from_bits(r.read_int()?),
        dlr_url: r.read_string()?,
        pid: r.read_int()?,
        alt_dcs: r.read_int()?,
        rpi: ReturnPathIndicator::from_code(r.read_int()?),
        charset: r.read_string()?,
        box_id: r.read_string()?,
        billing_info: r.read_string()?,
        msg_left: r.read_int()?,
        priority: r.read_int()?,
        resend_try: r.read_int()?,
        resend_time: r.read_int()?,
        meta_data: r.read_string()?,
    };
    if sms.sms_type.is_undefined() {
        return Err(DecodeError::UndefinedSmsType);
    }
    let charset = TextCharset::for_decoding(sms.charset.as_deref());
    sms.msg_data = raw_text.map(|raw| charset.decode(&raw));
    Ok(sms)
}

/// Encode one message body, type tag first.
///
/// # Errors
///
/// Returns [`FramingError::OversizedFrame`] if a field is too long for its
/// length prefix and [`CodecError::UnsupportedCharset`] if an sms names a
/// charset its text cannot be written in. `dst` may hold a partial body on
/// error.
pub fn encode_message(message: &Message, dst: &mut BytesMut) -> Result<(), CodecError> {
    write_int(dst, message.message_type().code());
    match message {
        Message::HeartBeat(heartbeat) => write_int(dst, heartbeat.load),
        Message::Admin(admin) => {
            write_int(dst, admin.command.code());
            write_string(dst, admin.box_id.as_deref())?;
        }
        Message::Sms(sms) => encode_sms(sms, dst)?,
        Message::Ack(ack) => {
            write_int(dst, ack.response.code());
            write_int(dst, ack.time);
            write_uuid(dst, Some(&ack.id))?;
        }
        Message::Datagram(datagram) => {
            write_string(dst, datagram.source_address.as_deref())?;
            write_int(dst, datagram.source_port);
            write_string(dst, datagram.destination_address.as_deref())?;
            write_int(dst, datagram.destination_port);
            write_octets(dst, datagram.user_data.as_deref())?;
        }
    }
    Ok(())
}

/// An absent charset is written as UTF-8.
fn encode_sms(sms: &Sms, dst: &mut BytesMut) -> Result<(), CodecError> {
    let charset = match sms.charset.as_deref() {
        None => TextCharset::Utf8,
        Some(label) => TextCharset::from_label(label).ok_or_else(|| {
            CodecError::UnsupportedCharset {
                label: label.to_owned(),
            }
        })?,
    };
    write_string(dst, sms.sender.as_deref())?;
    write_string(dst, sms.receiver.as_deref())?;
    write_octets(dst, sms.udh_data.as_deref())?;
    let text = sms.msg_data.as_deref().map(|text| charset.encode(text));
    write_octets(dst, text.as_deref())?;
    write_int(dst, sms.time);
    write_string(dst, sms.smsc_id.as_deref())?;
    write_string(dst, sms.smsc_number.as_deref())?;
    write_string(dst, sms.foreign_id.as_deref())?;
    write_string(dst, sms.service.as_deref())?;
    write_string(dst, sms.account.as_deref())?;
    write_uuid(dst, sms.id.as_ref())?;
    write_int(dst, sms.sms_type.code());
    write_int(dst, sms.message_class.code());
    write_int(dst, sms.mwi.code());
    write_int(dst, sms.coding.code());
    write_int(dst, sms.compress.code());
    write_int(dst, sms.validity);
    write_int(dst, sms.deferred);
    write_int(dst, sms.dlr_mask.bits());
    write_string(dst, sms.dlr_url.as_deref())?;
    write_int(dst, sms.pid);
    write_int(dst, sms.alt_dcs);
    write_int(dst, sms.rpi.code());
    write_string(dst, Some(charset.label()))?;
    write_string(dst, sms.box_id.as_deref())?;
    write_string(dst, sms.billing_info.as_deref())?;
    write_int(dst, sms.msg_left);
    write_int(dst, sms.priority);
    write_int(dst, sms.resend_try);
    write_int(dst, sms.resend_time);
    write_string(dst, sms.meta_data.as_deref())?;
    Ok(())
}

#[cfg(test)]
mod tests;
