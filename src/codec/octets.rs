//! Primitive field readers and writers for message bodies.
//!
//! The body format has two encodings: a 4-byte network-order signed integer
//! and an octet string, which is an integer length `L` followed by `L` bytes.
//! `L == -1` marks an absent value. Identifiers travel as UUID text inside an
//! octet string.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use uuid::Uuid;

use super::{
    charset::TextCharset,
    error::{DecodeError, FramingError},
};
use crate::byte_order::{read_network_i32, write_network_i32};

/// Length prefix marking an absent octet string.
pub const ABSENT_LENGTH: i32 = -1;

const INT_SIZE: usize = 4;

/// Cursor over a message body.
///
/// # Examples
///
/// ```
/// use bearerbox::codec::octets::FieldReader;
/// use bytes::Bytes;
///
/// let mut reader = FieldReader::new(Bytes::from_static(&[0, 0, 0, 2, b'h', b'i']));
/// assert_eq!(reader.read_string().unwrap().as_deref(), Some("hi"));
/// assert_eq!(reader.remaining(), 0);
/// ```
#[derive(Debug)]
pub struct FieldReader {
    buf: Bytes,
}

impl FieldReader {
    #[must_use]
    pub fn new(buf: Bytes) -> Self { Self { buf } }

    /// Bytes not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize { self.buf.remaining() }

    /// Read a network-order signed integer.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::NotEnoughData`] if fewer than four bytes remain.
    pub fn read_int(&mut self) -> Result<i32, DecodeError> {
        let mut raw = [0u8; INT_SIZE];
        if self.buf.remaining() < INT_SIZE {
            return Err(DecodeError::NotEnoughData {
                field: "integer",
                remaining: self.buf.remaining(),
            });
        }
        self.buf.copy_to_slice(&mut raw);
        Ok(read_network_i32(raw))
    }

    /// Read an octet string as raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::NotEnoughData`] if the length prefix is
    /// truncated and [`DecodeError::InvalidOctetLength`] if the length is
    /// negative (other than `-1`) or exceeds the remaining bytes.
    pub fn read_octets(&mut self) -> Result<Option<Bytes>, DecodeError> {
        let length = self.read_int().map_err(|_| DecodeError::NotEnoughData {
            field: "octet string length",
            remaining: self.buf.remaining(),
        })?;
        if length == ABSENT_LENGTH {
            return Ok(None);
        }
        let remaining = self.buf.remaining();
        match usize::try_from(length) {
            Ok(len) if len <= remaining => Ok(Some(self.buf.split_to(len))),
            _ => Err(DecodeError::InvalidOctetLength { length, remaining }),
        }
    }

    /// Read an octet string as UTF-8 text. Invalid sequences become U+FFFD.
    ///
    /// # Errors
    ///
    /// As [`read_octets`](Self::read_octets).
    pub fn read_string(&mut self) -> Result<Option<String>, DecodeError> {
        Ok(self
            .read_octets()?
            .map(|raw| TextCharset::Utf8.decode(&raw)))
    }

    /// Read a UUID carried as text.
    ///
    /// An absent value is not a valid identifier.
    ///
    /// # Errors
    ///
    /// As [`read_string`](Self::read_string), plus
    /// [`DecodeError::InvalidIdentifier`] when the text is missing or does not
    /// parse.
    pub fn read_uuid(&mut self) -> Result<Uuid, DecodeError> {
        let text = self.read_string()?.unwrap_or_default();
        Uuid::parse_str(&text).map_err(|_| DecodeError::InvalidIdentifier { text })
    }
}

/// Append a network-order signed integer.
pub fn write_int(dst: &mut BytesMut, value: i32) { dst.put_slice(&write_network_i32(value)); }

/// Append an octet string, or the absent marker for `None`.
///
/// # Errors
///
/// Returns [`FramingError::OversizedFrame`] if `value` is longer than an
/// `i32` length prefix can describe.
pub fn write_octets(dst: &mut BytesMut, value: Option<&[u8]>) -> Result<(), FramingError> {
    let Some(value) = value else {
        write_int(dst, ABSENT_LENGTH);
        return Ok(());
    };
    let length = i32::try_from(value.len()).map_err(|_| FramingError::OversizedFrame {
        size: value.len(),
        max: usize::try_from(i32::MAX).unwrap_or(usize::MAX),
    })?;
    write_int(dst, length);
    dst.put_slice(value);
    Ok(())
}

/// Append a text octet string.
///
/// # Errors
///
/// See [`write_octets`].
pub fn write_string(dst: &mut BytesMut, value: Option<&str>) -> Result<(), FramingError> {
    write_octets(dst, value.map(str::as_bytes))
}

/// Append a UUID in its hyphenated text form.
///
/// # Errors
///
/// See [`write_octets`].
pub fn write_uuid(dst: &mut BytesMut, value: Option<&Uuid>) -> Result<(), FramingError> {
    match value {
        Some(id) => {
            let mut text = Uuid::encode_buffer();
            write_string(dst, Some(&*id.hyphenated().encode_lower(&mut text)))
        }
        None => write_string(dst, None),
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rstest::rstest;

    use super::*;

    fn reader(bytes: &[u8]) -> FieldReader { FieldReader::new(Bytes::copy_from_slice(bytes)) }

    #[test]
    fn absent_marker_reads_as_none() {
        let mut r = reader(&[0xff, 0xff, 0xff, 0xff]);
        assert_eq!(r.read_octets(), Ok(None));
    }

    #[rstest]
    #[case::negative(&[0xff, 0xff, 0xff, 0xfe], -2)]
    #[case::too_long(&[0x00, 0x00, 0x00, 0x05, b'a', b'b'], 5)]
    fn bad_lengths_are_rejected(#[case] bytes: &[u8], #[case] length: i32) {
        let err = reader(bytes).read_octets().expect_err("length must be rejected");
        assert!(matches!(err, DecodeError::InvalidOctetLength { length: l, .. } if l == length));
    }

    #[test]
    fn truncated_integer_reports_remaining() {
        let err = reader(&[0x00, 0x01]).read_int().expect_err("two bytes are not an integer");
        assert_eq!(
            err,
            DecodeError::NotEnoughData {
                field: "integer",
                remaining: 2
            }
        );
    }

    #[test]
    fn absent_identifier_is_invalid() {
        let err = reader(&[0xff, 0xff, 0xff, 0xff])
            .read_uuid()
            .expect_err("absent id must not decode");
        assert_eq!(err, DecodeError::InvalidIdentifier { text: String::new() });
    }

    #[test]
    fn identifier_travels_as_text() {
        let id = Uuid::new_v4();
        let mut dst = BytesMut::new();
        write_uuid(&mut dst, Some(&id)).expect("uuid fits");
        assert_eq!(&dst[4..], id.to_string().as_bytes());
        assert_eq!(FieldReader::new(dst.freeze()).read_uuid(), Ok(id));
    }

    #[test]
    fn invalid_utf8_reads_with_replacement() {
        let mut r = reader(&[0x00, 0x00, 0x00, 0x02, b'a', 0xff]);
        assert_eq!(r.read_string(), Ok(Some("a\u{fffd}".to_owned())));
        assert_eq!(r.remaining(), 0);
    }

    proptest! {
        #[test]
        fn octet_strings_survive_the_wire(value in proptest::option::of(proptest::collection::vec(any::<u8>(), 0..256))) {
            let mut dst = BytesMut::new();
            write_octets(&mut dst, value.as_deref()).expect("small value fits");
            let mut r = FieldReader::new(dst.freeze());
            prop_assert_eq!(r.read_octets().expect("valid octets").map(|b| b.to_vec()), value);
            prop_assert_eq!(r.remaining(), 0);
        }

        #[test]
        fn arbitrary_length_prefix_never_overreads(length in any::<i32>(), tail in proptest::collection::vec(any::<u8>(), 0..32)) {
            let mut dst = BytesMut::new();
            write_int(&mut dst, length);
            dst.put_slice(&tail);
            let mut r = FieldReader::new(dst.freeze());
            match r.read_octets() {
                Ok(None) => prop_assert_eq!(length, ABSENT_LENGTH),
                Ok(Some(bytes)) => prop_assert_eq!(i32::try_from(bytes.len()).ok(), Some(length)),
                Err(DecodeError::InvalidOctetLength { .. }) => {
                    prop_assert!(length < ABSENT_LENGTH || usize::try_from(length).is_ok_and(|l| l > tail.len()));
                }
                Err(other) => prop_assert!(false, "unexpected error {other}"),
            }
        }
    }
}
