//! Error types for the codec layer.
//!
//! Two classes of failure are kept apart:
//!
//! - [`DecodeError`]: a frame arrived intact but its body violates the message
//!   format. Fatal to that one message only; the stream stays aligned because
//!   the whole frame has already been consumed.
//! - [`CodecError`]: the byte stream itself is unusable (oversized frame,
//!   truncated stream, I/O failure). The connection cannot continue, except
//!   after an oversized or unencodable outbound message, which is refused
//!   before any byte is written.

use std::io;

use thiserror::Error;

/// Structural violation inside a single message body.
///
/// Every variant is a malformed-message condition; the session reports them
/// to its handler and keeps running.
#[non_exhaustive]
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The body ended before a fixed-size field could be read.
    #[error("not enough data to read {field}: {remaining} bytes remaining")]
    NotEnoughData {
        /// Kind of field being read.
        field: &'static str,
        /// Bytes left in the body.
        remaining: usize,
    },

    /// An octet string length prefix was negative (other than `-1`) or
    /// exceeded the remaining body.
    #[error("invalid octet string length {length} with {remaining} bytes remaining")]
    InvalidOctetLength {
        /// Length read from the prefix.
        length: i32,
        /// Bytes left in the body after the prefix.
        remaining: usize,
    },

    /// An identifier field did not hold a UUID in text form.
    #[error("invalid identifier {text:?}")]
    InvalidIdentifier {
        /// Text found in the identifier field. Empty when the field was absent.
        text: String,
    },

    /// An admin message carried a command code the protocol does not define.
    #[error("undefined admin command")]
    UndefinedAdminCommand,

    /// An ack carried a response code the protocol does not define.
    #[error("undefined ack type")]
    UndefinedAckType,

    /// A short message carried a type code the protocol does not define.
    #[error("undefined sms type")]
    UndefinedSmsType,

    /// The frame opened with a type tag the protocol does not define.
    #[error("unknown message type: {type_id}")]
    UnknownMessageType {
        /// Tag that was not recognised.
        type_id: i32,
    },
}

/// Frame-level errors raised while splitting the stream into frames.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FramingError {
    /// Frame exceeds the configured maximum.
    #[error("frame exceeds max length: {size} > {max}")]
    OversizedFrame {
        /// Size of the offending frame.
        size: usize,
        /// Maximum allowed frame size.
        max: usize,
    },
}

/// Stream ended part-way through a frame.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum EofError {
    /// The peer closed while a frame payload was being read.
    #[error("premature EOF: {bytes_received} bytes of {expected} byte frame received")]
    MidFrame {
        /// Payload bytes received before EOF.
        bytes_received: usize,
        /// Payload size announced by the length prefix.
        expected: usize,
    },

    /// The peer closed while the length prefix was being read.
    #[error("premature EOF during header: {bytes_received} of {header_size} header bytes")]
    MidHeader {
        /// Header bytes received before EOF.
        bytes_received: usize,
        /// Size of the length prefix.
        header_size: usize,
    },
}

/// Fatal codec failure; the connection must be torn down.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Framing layer error.
    #[error("framing error: {0}")]
    Framing(#[from] FramingError),

    /// Transport layer I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Stream ended mid-frame.
    #[error("EOF: {0}")]
    Eof(#[from] EofError),

    /// A short message named a character set its text cannot be written in.
    /// Nothing reaches the stream.
    #[error("unsupported charset {label:?}")]
    UnsupportedCharset {
        /// Label carried by the message.
        label: String,
    },
}

impl CodecError {
    /// Returns the error category as a string for logging and metrics.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Framing(_) => "framing",
            Self::Io(_) => "io",
            Self::Eof(_) => "eof",
            Self::UnsupportedCharset { .. } => "charset",
        }
    }
}
