//! Helpers for explicit network byte-order conversions.
//!
//! Every integer on the gateway wire is a signed 32-bit value in network
//! order. Keeping the conversions here scopes the Clippy expectations to the
//! conversion points instead of scattering lint annotations through the codec.

/// Serialise an `i32` in network byte order (big-endian).
///
/// # Examples
///
/// ```
/// use bearerbox::byte_order::write_network_i32;
///
/// assert_eq!(write_network_i32(-1), [0xff, 0xff, 0xff, 0xff]);
/// assert_eq!(write_network_i32(0x1234_5678), [0x12, 0x34, 0x56, 0x78]);
/// ```
#[must_use]
pub fn write_network_i32(value: i32) -> [u8; 4] {
    #[expect(
        clippy::big_endian_bytes,
        reason = "Network byte order requires big-endian bytes."
    )]
    value.to_be_bytes()
}

/// Parse a network-order `i32` from its on-wire representation.
///
/// # Examples
///
/// ```
/// use bearerbox::byte_order::read_network_i32;
///
/// assert_eq!(read_network_i32([0x00, 0x00, 0x00, 0x03]), 3);
/// assert_eq!(read_network_i32([0xff, 0xff, 0xff, 0xff]), -1);
/// ```
#[must_use]
pub fn read_network_i32(bytes: [u8; 4]) -> i32 {
    #[expect(
        clippy::big_endian_bytes,
        reason = "Network byte order requires big-endian bytes."
    )]
    i32::from_be_bytes(bytes)
}

/// Parse a network-order `u32` from its on-wire representation.
///
/// Frame length prefixes are unsigned even though body integers are not.
///
/// # Examples
///
/// ```
/// use bearerbox::byte_order::read_network_u32;
///
/// assert_eq!(read_network_u32([0xff, 0xff, 0xff, 0xff]), u32::MAX);
/// ```
#[must_use]
pub fn read_network_u32(bytes: [u8; 4]) -> u32 {
    #[expect(
        clippy::big_endian_bytes,
        reason = "Network byte order requires big-endian bytes."
    )]
    u32::from_be_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{read_network_i32, read_network_u32, write_network_i32};

    #[rstest]
    #[case::zero(0, [0x00, 0x00, 0x00, 0x00])]
    #[case::absent_marker(-1, [0xff, 0xff, 0xff, 0xff])]
    #[case::message_tag(4, [0x00, 0x00, 0x00, 0x04])]
    #[case::max(i32::MAX, [0x7f, 0xff, 0xff, 0xff])]
    #[case::min(i32::MIN, [0x80, 0x00, 0x00, 0x00])]
    fn network_order_matches_wire_bytes(#[case] value: i32, #[case] wire: [u8; 4]) {
        assert_eq!(write_network_i32(value), wire);
        assert_eq!(read_network_i32(wire), value);
    }

    #[test]
    fn length_prefix_is_unsigned() {
        assert_eq!(read_network_u32([0x80, 0x00, 0x00, 0x00]), 0x8000_0000);
    }
}
