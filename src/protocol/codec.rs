//! Stream codecs wiring the frame types into `FramedRead`/`FramedWrite`.
//!
//! Requests are reassembled by structural length (the 9 fixed bytes plus
//! the declared opName length) rather than by TML, so a frame declaring
//! the wrong TML still comes off the stream aligned and can be answered
//! with an error code instead of poisoning everything after it.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};
use tracing::debug;

use super::{
    hex_dump, ProtocolError, RequestFrame, ResponseFrame, REQUEST_HEADER_LEN, RESPONSE_LEN,
};

/// Server side: decodes request frames, encodes response frames.
#[derive(Debug, Default)]
pub struct ServerCodec;

impl ServerCodec {
    pub fn new() -> ServerCodec {
        ServerCodec
    }
}

impl Decoder for ServerCodec {
    type Item = (RequestFrame, bool);
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, ProtocolError> {
        if src.len() < REQUEST_HEADER_LEN {
            return Ok(None);
        }
        let name_len = src[REQUEST_HEADER_LEN - 1] as usize;
        let frame_len = REQUEST_HEADER_LEN + name_len;
        if src.len() < frame_len {
            src.reserve(frame_len - src.len());
            return Ok(None);
        }

        let bytes = src.split_to(frame_len);
        debug!("received request (hex): {}", hex_dump(&bytes));
        Ok(Some(RequestFrame::decode(&bytes)))
    }
}

impl Encoder<ResponseFrame> for ServerCodec {
    type Error = ProtocolError;

    fn encode(&mut self, response: ResponseFrame, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        let mark = dst.len();
        response.encode(dst);
        debug!("sending response (hex): {}", hex_dump(&dst[mark..]));
        Ok(())
    }
}

/// Client side: encodes request frames, decodes response frames.
#[derive(Debug, Default)]
pub struct ClientCodec;

impl ClientCodec {
    pub fn new() -> ClientCodec {
        ClientCodec
    }
}

impl Decoder for ClientCodec {
    type Item = ResponseFrame;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<ResponseFrame>, ProtocolError> {
        if src.len() < RESPONSE_LEN {
            return Ok(None);
        }
        let bytes = src.split_to(RESPONSE_LEN);
        debug!("received response (hex): {}", hex_dump(&bytes));
        Ok(Some(ResponseFrame::decode(&bytes)?))
    }
}

impl Encoder<RequestFrame> for ClientCodec {
    type Error = ProtocolError;

    fn encode(&mut self, request: RequestFrame, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        let mark = dst.len();
        request.encode(dst)?;
        debug!("sending request (hex): {}", hex_dump(&dst[mark..]));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Op;

    fn encoded(frame: &RequestFrame) -> BytesMut {
        let mut buf = BytesMut::new();
        frame.encode(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_request_decode_waits_for_full_frame() {
        let frame = RequestFrame::new(Op::Sub, 3, 10, 7);
        let wire = encoded(&frame);

        let mut codec = ServerCodec::new();
        let mut buf = BytesMut::new();

        buf.extend_from_slice(&wire[..5]);
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(&wire[5..12]);
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(&wire[12..]);
        let (decoded, mismatch) = codec.decode(&mut buf).unwrap().unwrap();
        assert!(!mismatch);
        assert_eq!(decoded, frame);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_two_requests_in_one_read() {
        let first = RequestFrame::new(Op::Add, 1, 2, 0);
        let second = RequestFrame::new(Op::Div, 9, 3, 1);

        let mut buf = BytesMut::new();
        buf.extend_from_slice(&encoded(&first));
        buf.extend_from_slice(&encoded(&second));

        let mut codec = ServerCodec::new();
        let (a, _) = codec.decode(&mut buf).unwrap().unwrap();
        let (b, _) = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(a, first);
        assert_eq!(b, second);
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_misdeclared_tml_leaves_stream_aligned() {
        let mut buf = BytesMut::new();
        let mut wire = encoded(&RequestFrame::new(Op::Mul, 4, 4, 2));
        wire[1] = 0x05; // declare a 5-byte frame
        buf.extend_from_slice(&wire);
        buf.extend_from_slice(&encoded(&RequestFrame::new(Op::Add, 1, 1, 3)));

        let mut codec = ServerCodec::new();
        let (bad, mismatch) = codec.decode(&mut buf).unwrap().unwrap();
        assert!(mismatch);
        assert_eq!(bad.request_id, 2);

        let (good, mismatch) = codec.decode(&mut buf).unwrap().unwrap();
        assert!(!mismatch);
        assert_eq!(good.request_id, 3);
    }

    #[test]
    fn test_response_decode_waits_for_eight_bytes() {
        let mut codec = ClientCodec::new();
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&[0x00, 0x08, 0x01, 0x00, 0x00, 0x00]);
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(&[0x0C, 0x00]);
        let response = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(response, ResponseFrame::ok(1, 12));
    }
}
