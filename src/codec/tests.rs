//! Unit tests for message body encoding and frame decoding.

use bytes::{BufMut, Bytes, BytesMut};
use rstest::{fixture, rstest};
use tokio_util::codec::{Decoder, Encoder};
use uuid::Uuid;

use super::*;
use crate::message::PARAM_UNDEFINED;

#[fixture]
fn codec() -> MessageCodec { MessageCodec::default() }

fn frame(body: &[u8]) -> BytesMut {
    let mut buf = BytesMut::new();
    write_int(&mut buf, i32::try_from(body.len()).expect("test body fits"));
    buf.put_slice(body);
    buf
}

fn body(fields: impl FnOnce(&mut BytesMut)) -> Vec<u8> {
    let mut buf = BytesMut::new();
    fields(&mut buf);
    buf.to_vec()
}

fn sample_sms() -> Sms {
    let mut sms = Sms::new("1234", "306900000000", "καλημέρα")
        .with_id(Uuid::new_v4())
        .with_dlr(DlrMask::SUCCESS | DlrMask::FAIL, "http://localhost/dlr");
    sms.udh_data = Some(Bytes::from_static(&[0x05, 0x00, 0x03]));
    sms.coding = DataCoding::Ucs2;
    sms.box_id = Some("sms-box".into());
    sms
}

#[rstest]
#[case::heartbeat(Message::from(HeartBeat::new(42)))]
#[case::admin(Message::from(Admin::identify("sms-box")))]
#[case::ack(Message::from(Ack::new(Uuid::new_v4(), AckType::Buffered)))]
#[case::datagram(Message::from(Datagram {
    source_address: Some("10.0.0.1".into()),
    source_port: 9200,
    destination_address: None,
    destination_port: 9201,
    user_data: Some(Bytes::from_static(b"wdp")),
}))]
#[case::sms(Message::from(Sms {
    charset: Some("UTF-8".into()),
    ..sample_sms()
}))]
#[case::utf16_sms(Message::from(Sms {
    charset: Some("UTF-16BE".into()),
    ..sample_sms()
}))]
fn messages_survive_the_codec(mut codec: MessageCodec, #[case] message: Message) {
    let mut buf = BytesMut::new();
    codec.encode(message.clone(), &mut buf).expect("encode");
    let decoded = codec.decode(&mut buf).expect("frame").expect("complete frame");
    assert_eq!(decoded, Ok(message));
    assert!(buf.is_empty());
}

#[test]
fn ack_fields_follow_wire_order() {
    let id = Uuid::nil();
    let mut dst = BytesMut::new();
    encode_message(&Message::from(Ack::new(id, AckType::Failed)), &mut dst).expect("encode");
    let expected = body(|b| {
        write_int(b, 3);
        write_int(b, 1);
        write_int(b, PARAM_UNDEFINED);
        write_string(b, Some("00000000-0000-0000-0000-000000000000")).expect("fits");
    });
    assert_eq!(&dst[..], &expected[..]);
}

#[test]
fn missing_charset_is_written_as_utf8() {
    let mut dst = BytesMut::new();
    encode_message(&Message::from(sample_sms()), &mut dst).expect("encode");
    let decoded = decode_message(dst.freeze()).expect("decode");
    let Message::Sms(sms) = decoded else {
        panic!("expected sms, got {decoded:?}");
    };
    assert_eq!(sms.charset.as_deref(), Some("UTF-8"));
}

fn position_of(haystack: &[u8], needle: &[u8]) -> usize {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
        .expect("needle present")
}

#[test]
fn text_is_written_in_the_sms_charset() {
    let sms = Sms {
        msg_data: Some("é".into()),
        charset: Some("utf-16be".into()),
        ..sample_sms()
    };
    let mut dst = BytesMut::new();
    encode_message(&Message::from(sms), &mut dst).expect("encode");
    position_of(&dst, &[0, 0, 0, 2, 0x00, 0xe9]);
    position_of(&dst, b"UTF-16BE");
    assert!(dst.windows(2).all(|pair| pair != [0xc3, 0xa9]));
}

#[rstest]
fn unsupported_charset_is_refused(mut codec: MessageCodec) {
    let sms = Sms {
        charset: Some("KOI8-R".into()),
        ..sample_sms()
    };
    let mut dst = BytesMut::new();
    let err = codec.encode(Message::from(sms), &mut dst).expect_err("unknown charset");
    assert!(matches!(err, CodecError::UnsupportedCharset { ref label } if label == "KOI8-R"));
    assert!(dst.is_empty());
}

#[test]
fn undecodable_text_still_yields_the_sms() {
    let sms = Sms {
        msg_data: Some("#mark#".into()),
        ..sample_sms()
    };
    let mut dst = BytesMut::new();
    encode_message(&Message::from(sms.clone()), &mut dst).expect("encode");
    let at = position_of(&dst, b"#mark#");
    dst[at] = 0xe9;

    let Ok(Message::Sms(decoded)) = decode_message(dst.freeze()) else {
        panic!("invalid text must not reject the sms");
    };
    assert_eq!(decoded.msg_data.as_deref(), Some("\u{fffd}mark#"));
    assert_eq!(decoded.id, sms.id);
}

#[rstest]
#[case::admin(
    body(|b| { write_int(b, 1); write_int(b, 9); write_string(b, None).expect("fits"); }),
    DecodeError::UndefinedAdminCommand
)]
#[case::ack(
    body(|b| {
        write_int(b, 3);
        write_int(b, 17);
        write_int(b, 0);
        write_uuid(b, Some(&Uuid::nil())).expect("fits");
    }),
    DecodeError::UndefinedAckType
)]
#[case::unknown_tag(body(|b| write_int(b, 12)), DecodeError::UnknownMessageType { type_id: 12 })]
#[case::ack_without_id(
    body(|b| { write_int(b, 3); write_int(b, 0); write_int(b, 0); write_string(b, None).expect("fits"); }),
    DecodeError::InvalidIdentifier { text: String::new() }
)]
#[case::ack_with_bad_id(
    body(|b| { write_int(b, 3); write_int(b, 0); write_int(b, 0); write_string(b, Some("nope")).expect("fits"); }),
    DecodeError::InvalidIdentifier { text: "nope".into() }
)]
#[case::truncated_heartbeat(
    vec![0, 0, 0, 0, 0, 1],
    DecodeError::NotEnoughData { field: "integer", remaining: 2 }
)]
fn malformed_bodies_are_rejected(#[case] raw: Vec<u8>, #[case] expected: DecodeError) {
    assert_eq!(decode_message(Bytes::from(raw)), Err(expected));
}

#[test]
fn undefined_sms_type_is_rejected() {
    let mut sms = sample_sms();
    sms.sms_type = SmsType::Undefined;
    let mut dst = BytesMut::new();
    encode_message(&Message::from(sms), &mut dst).expect("encode");
    assert_eq!(decode_message(dst.freeze()), Err(DecodeError::UndefinedSmsType));
}

#[test]
fn undefined_optional_enums_are_accepted() {
    let mut sms = sample_sms();
    sms.coding = DataCoding::Undefined;
    sms.compress = Compress::from_code(44);
    sms.message_class = MessageClass::Undefined;
    sms.mwi = MessageWaitingIndicator::Undefined;
    sms.rpi = ReturnPathIndicator::Undefined;
    let mut dst = BytesMut::new();
    encode_message(&Message::from(sms), &mut dst).expect("encode");
    assert!(decode_message(dst.freeze()).is_ok());
}

#[rstest]
fn malformed_frame_does_not_desynchronise_the_stream(mut codec: MessageCodec) {
    let mut buf = frame(&body(|b| write_int(b, 99)));
    codec
        .encode(Message::from(HeartBeat::new(1)), &mut buf)
        .expect("encode");

    let first = codec.decode(&mut buf).expect("frame").expect("complete");
    assert_eq!(first, Err(DecodeError::UnknownMessageType { type_id: 99 }));
    let second = codec.decode(&mut buf).expect("frame").expect("complete");
    assert_eq!(second, Ok(Message::from(HeartBeat::new(1))));
}

#[rstest]
fn partial_frame_waits_for_more_data(mut codec: MessageCodec) {
    let mut buf = frame(&body(|b| {
        write_int(b, 0);
        write_int(b, 5);
    }));
    let mut head = buf.split_to(6);
    assert!(codec.decode(&mut head).expect("no error").is_none());
    head.unsplit(buf);
    assert!(codec.decode(&mut head).expect("no error").is_some());
}

#[rstest]
fn oversized_frame_is_fatal(mut codec: MessageCodec) {
    let mut buf = BytesMut::new();
    write_int(&mut buf, i32::try_from(DEFAULT_MAX_FRAME_LENGTH + 1).expect("fits"));
    let err = codec.decode(&mut buf).expect_err("oversized frame");
    assert!(matches!(
        err,
        CodecError::Framing(FramingError::OversizedFrame { max, .. }) if max == DEFAULT_MAX_FRAME_LENGTH
    ));
}

#[test]
fn oversized_message_is_not_encoded() {
    let mut codec = MessageCodec::new(MIN_FRAME_LENGTH);
    let mut sms = sample_sms();
    sms.msg_data = Some("x".repeat(MIN_FRAME_LENGTH));
    let mut dst = BytesMut::new();
    let err = codec.encode(Message::from(sms), &mut dst).expect_err("too large");
    assert!(matches!(err, CodecError::Framing(_)));
    assert!(dst.is_empty());
}

#[rstest]
#[case::mid_header(vec![0, 0], EofError::MidHeader { bytes_received: 2, header_size: 4 })]
#[case::mid_frame(vec![0, 0, 0, 8, 0, 0], EofError::MidFrame { bytes_received: 2, expected: 8 })]
fn eof_inside_a_frame_is_reported(
    mut codec: MessageCodec,
    #[case] raw: Vec<u8>,
    #[case] expected: EofError,
) {
    let mut buf = BytesMut::from(&raw[..]);
    let err = codec.decode_eof(&mut buf).expect_err("truncated stream");
    assert!(matches!(err, CodecError::Eof(e) if e == expected));
}

#[rstest]
fn clean_eof_ends_the_stream(mut codec: MessageCodec) {
    let mut buf = BytesMut::new();
    assert!(codec.decode_eof(&mut buf).expect("clean close").is_none());
}

#[test]
fn frame_length_is_clamped() {
    assert_eq!(MessageCodec::new(1).max_frame_length(), MIN_FRAME_LENGTH);
    assert_eq!(MessageCodec::new(usize::MAX).max_frame_length(), MAX_FRAME_LENGTH);
}
