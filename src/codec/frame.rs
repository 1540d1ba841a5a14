//! Default length-prefixed frame codec.
//!
//! Layout: one kind byte, a big-endian `u32` body length, then the body.
//! Strings inside a body are `u16`-length-prefixed UTF-8. This is not the
//! MQTT wire format; it is a minimal framing that exercises the full
//! encode/decode path and round-trips through the loopback transport.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::{CodecError, Decoded, PacketCodec};
use crate::message::{OutgoingMessage, QoS};

const KIND_PUBLISH: u8 = 1;
const KIND_SUBSCRIBE: u8 = 2;
const KIND_UNSUBSCRIBE: u8 = 3;
const KIND_PING: u8 = 4;
const KIND_CONNACK: u8 = 5;
const KIND_DISCONNECT: u8 = 6;

const HEADER_LEN: usize = 5;

/// Upper bound on a single frame body; inbound frames claiming more are
/// treated as corruption rather than buffered indefinitely.
const MAX_BODY_LEN: usize = 256 * 1024;

/// Stateless length-prefixed codec. See the module docs for the layout.
#[derive(Debug, Default)]
pub struct FrameCodec;

impl FrameCodec {
    pub fn new() -> Self {
        Self
    }

    fn frame(kind: u8, body: &[u8]) -> Result<Bytes, CodecError> {
        if body.len() > MAX_BODY_LEN {
            return Err(CodecError::Oversized(body.len()));
        }
        let mut out = BytesMut::with_capacity(HEADER_LEN + body.len());
        out.put_u8(kind);
        out.put_u32(body.len() as u32);
        out.put_slice(body);
        Ok(out.freeze())
    }

    fn put_string(body: &mut BytesMut, value: &str) -> Result<(), CodecError> {
        if value.len() > u16::MAX as usize {
            return Err(CodecError::Malformed(format!(
                "string field of {} bytes exceeds u16 length prefix",
                value.len()
            )));
        }
        body.put_u16(value.len() as u16);
        body.put_slice(value.as_bytes());
        Ok(())
    }

    fn take_string(body: &mut Bytes) -> Result<String, CodecError> {
        if body.remaining() < 2 {
            return Err(CodecError::Malformed("truncated string length".to_string()));
        }
        let len = body.get_u16() as usize;
        if body.remaining() < len {
            return Err(CodecError::Malformed("truncated string body".to_string()));
        }
        let raw = body.split_to(len);
        String::from_utf8(raw.to_vec()).map_err(|_| CodecError::InvalidUtf8)
    }
}

impl PacketCodec for FrameCodec {
    fn encode_publish(&mut self, message: &OutgoingMessage) -> Result<Bytes, CodecError> {
        let mut body = BytesMut::with_capacity(4 + message.topic.len() + message.payload.len());
        Self::put_string(&mut body, &message.topic)?;
        body.put_u8(message.qos.level());
        body.put_u8(message.retain as u8);
        body.put_slice(&message.payload);
        Self::frame(KIND_PUBLISH, &body)
    }

    fn encode_subscribe(&mut self, topic_filter: &str, qos: QoS) -> Result<Bytes, CodecError> {
        let mut body = BytesMut::with_capacity(3 + topic_filter.len());
        Self::put_string(&mut body, topic_filter)?;
        body.put_u8(qos.level());
        Self::frame(KIND_SUBSCRIBE, &body)
    }

    fn encode_unsubscribe(&mut self, topic_filter: &str) -> Result<Bytes, CodecError> {
        let mut body = BytesMut::with_capacity(2 + topic_filter.len());
        Self::put_string(&mut body, topic_filter)?;
        Self::frame(KIND_UNSUBSCRIBE, &body)
    }

    fn encode_ping(&mut self) -> Result<Bytes, CodecError> {
        Self::frame(KIND_PING, &[])
    }

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Decoded, CodecError> {
        if buf.len() < HEADER_LEN {
            return Ok(Decoded::Incomplete);
        }
        let kind = buf[0];
        let body_len = u32::from_be_bytes([buf[1], buf[2], buf[3], buf[4]]) as usize;
        if body_len > MAX_BODY_LEN {
            return Err(CodecError::Oversized(body_len));
        }
        if buf.len() < HEADER_LEN + body_len {
            return Ok(Decoded::Incomplete);
        }

        buf.advance(HEADER_LEN);
        let mut body = buf.split_to(body_len).freeze();

        match kind {
            KIND_PUBLISH => {
                let topic = Self::take_string(&mut body)?;
                if body.remaining() < 2 {
                    return Err(CodecError::Malformed("truncated publish flags".to_string()));
                }
                let qos = body.get_u8();
                let _retain = body.get_u8();
                if QoS::from_level(qos).is_none() {
                    return Err(CodecError::Malformed(format!("invalid qos level {qos}")));
                }
                Ok(Decoded::Message {
                    topic,
                    payload: body,
                })
            }
            KIND_CONNACK => Ok(Decoded::ConnectedAck),
            KIND_DISCONNECT => {
                let reason = Self::take_string(&mut body)?;
                Ok(Decoded::DisconnectNotice { reason })
            }
            KIND_SUBSCRIBE => {
                let filter = Self::take_string(&mut body)?;
                Ok(Decoded::Infrastructure(format!("subscribe {filter}")))
            }
            KIND_UNSUBSCRIBE => {
                let filter = Self::take_string(&mut body)?;
                Ok(Decoded::Infrastructure(format!("unsubscribe {filter}")))
            }
            KIND_PING => Ok(Decoded::Infrastructure("ping".to_string())),
            other => Err(CodecError::Malformed(format!("unknown frame kind {other}"))),
        }
    }
}

/// Build a disconnect-notice frame. Used by tests and by peers that want to
/// close a session explicitly.
pub fn encode_disconnect_notice(reason: &str) -> Result<Bytes, CodecError> {
    let mut body = BytesMut::with_capacity(2 + reason.len());
    FrameCodec::put_string(&mut body, reason)?;
    FrameCodec::frame(KIND_DISCONNECT, &body)
}

/// Build a session-acknowledgement frame.
pub fn encode_connected_ack() -> Result<Bytes, CodecError> {
    FrameCodec::frame(KIND_CONNACK, &[])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_one(frame: Bytes) -> Decoded {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::from(&frame[..]);
        let decoded = codec.decode(&mut buf).unwrap();
        assert!(buf.is_empty(), "decode must consume the whole frame");
        decoded
    }

    #[test]
    fn publish_roundtrip() {
        let mut codec = FrameCodec::new();
        let msg = OutgoingMessage::new(
            "sensors/temp",
            Bytes::from_static(b"21.5"),
            QoS::AtLeastOnce,
            true,
        );
        let frame = codec.encode_publish(&msg).unwrap();

        match decode_one(frame) {
            Decoded::Message { topic, payload } => {
                assert_eq!(topic, "sensors/temp");
                assert_eq!(&payload[..], b"21.5");
            }
            other => panic!("expected message, got {other:?}"),
        }
    }

    #[test]
    fn subscribe_frames_are_infrastructure() {
        let mut codec = FrameCodec::new();
        let frame = codec.encode_subscribe("sensors/#", QoS::AtLeastOnce).unwrap();
        assert_eq!(
            decode_one(frame),
            Decoded::Infrastructure("subscribe sensors/#".to_string())
        );

        let frame = codec.encode_unsubscribe("sensors/#").unwrap();
        assert_eq!(
            decode_one(frame),
            Decoded::Infrastructure("unsubscribe sensors/#".to_string())
        );
    }

    #[test]
    fn ping_roundtrip() {
        let mut codec = FrameCodec::new();
        let frame = codec.encode_ping().unwrap();
        assert_eq!(decode_one(frame), Decoded::Infrastructure("ping".to_string()));
    }

    #[test]
    fn disconnect_notice_carries_reason() {
        let frame = encode_disconnect_notice("session taken over").unwrap();
        assert_eq!(
            decode_one(frame),
            Decoded::DisconnectNotice {
                reason: "session taken over".to_string()
            }
        );
    }

    #[test]
    fn connected_ack_roundtrip() {
        let frame = encode_connected_ack().unwrap();
        assert_eq!(decode_one(frame), Decoded::ConnectedAck);
    }

    #[test]
    fn partial_input_is_incomplete() {
        let mut codec = FrameCodec::new();
        let msg = OutgoingMessage::new("t", Bytes::from_static(b"p"), QoS::AtMostOnce, false);
        let frame = codec.encode_publish(&msg).unwrap();

        // Feed the frame one byte at a time; only the last byte completes it.
        let mut buf = BytesMut::new();
        for (i, byte) in frame.iter().enumerate() {
            buf.put_u8(*byte);
            let decoded = codec.decode(&mut buf).unwrap();
            if i + 1 < frame.len() {
                assert_eq!(decoded, Decoded::Incomplete, "byte {i}");
            } else {
                assert!(matches!(decoded, Decoded::Message { .. }));
            }
        }
    }

    #[test]
    fn two_frames_decode_back_to_back() {
        let mut codec = FrameCodec::new();
        let first = codec
            .encode_publish(&OutgoingMessage::new(
                "a",
                Bytes::from_static(b"1"),
                QoS::AtMostOnce,
                false,
            ))
            .unwrap();
        let second = codec.encode_ping().unwrap();

        let mut buf = BytesMut::new();
        buf.put_slice(&first);
        buf.put_slice(&second);

        assert!(matches!(
            codec.decode(&mut buf).unwrap(),
            Decoded::Message { .. }
        ));
        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Decoded::Infrastructure("ping".to_string())
        );
        assert_eq!(codec.decode(&mut buf).unwrap(), Decoded::Incomplete);
    }

    #[test]
    fn unknown_kind_is_malformed() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();
        buf.put_u8(0xEE);
        buf.put_u32(0);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(CodecError::Malformed(_))
        ));
    }

    #[test]
    fn oversized_length_is_rejected_without_buffering() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();
        buf.put_u8(KIND_PUBLISH);
        buf.put_u32((MAX_BODY_LEN + 1) as u32);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(CodecError::Oversized(_))
        ));
    }

    #[test]
    fn invalid_qos_in_publish_is_malformed() {
        let mut buf = BytesMut::new();
        let mut body = BytesMut::new();
        FrameCodec::put_string(&mut body, "t").unwrap();
        body.put_u8(7); // out-of-range qos
        body.put_u8(0);
        let frame = FrameCodec::frame(KIND_PUBLISH, &body).unwrap();
        buf.put_slice(&frame);

        let mut codec = FrameCodec::new();
        assert!(matches!(
            codec.decode(&mut buf),
            Err(CodecError::Malformed(_))
        ));
    }
}
