//! Wire format for the calcwire protocol.
//!
//! Request frame (variable length, big-endian):
//! ```text
//! [TML: u16] [opCode: u8] [operand1: i16] [operand2: i16]
//! [requestId: u8] [opNameLength: u8] [opName: UTF-16 bytes]
//! ```
//! TML is the byte length of the entire frame, itself included, so a
//! self-consistent frame has TML = 9 + opNameLength.
//!
//! Response frame (fixed 8 bytes, big-endian):
//! ```text
//! [TML: u16 = 8] [requestId: u8] [result: i32] [errorCode: u8]
//! ```

pub mod codec;

use bytes::{Buf, BufMut, BytesMut};
use thiserror::Error;

/// The protocol's single generic failure signal: length mismatch,
/// unknown opcode and division by zero all report this value.
pub const ERROR_CODE: u8 = 127;

/// Byte length of the fixed-position request fields, opName excluded.
pub const REQUEST_HEADER_LEN: usize = 9;

/// Responses are always exactly eight bytes.
pub const RESPONSE_LEN: usize = 8;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("opcode {0} is not encodable (valid range 0-5)")]
    Encoding(u8),

    #[error("truncated response frame: {0} bytes, expected 8")]
    TruncatedFrame(usize),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Operation selector carried in the opCode byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Op {
    Div = 0,
    Mul = 1,
    And = 2,
    Or = 3,
    Add = 4,
    Sub = 5,
}

impl Op {
    /// Decodes a raw opcode byte. Returns `None` for anything outside 0-5.
    pub fn from_u8(value: u8) -> Option<Op> {
        match value {
            0 => Some(Op::Div),
            1 => Some(Op::Mul),
            2 => Some(Op::And),
            3 => Some(Op::Or),
            4 => Some(Op::Add),
            5 => Some(Op::Sub),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Op::Div => "div",
            Op::Mul => "mul",
            Op::And => "and",
            Op::Or => "or",
            Op::Add => "add",
            Op::Sub => "sub",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFrame {
    pub op_code: u8,
    pub operand1: i16,
    pub operand2: i16,
    pub request_id: u8,
    pub op_name: String,
}

impl RequestFrame {
    pub fn new(op: Op, operand1: i16, operand2: i16, request_id: u8) -> RequestFrame {
        RequestFrame {
            op_code: op as u8,
            operand1,
            operand2,
            request_id,
            op_name: op.name().to_string(),
        }
    }

    /// Serializes the frame, computing TML from the encoded length.
    ///
    /// Refuses opcodes that can never name an operation; the interactive
    /// input parsing is the primary validation point, this is the
    /// contract backstop.
    pub fn encode(&self, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        if Op::from_u8(self.op_code).is_none() {
            return Err(ProtocolError::Encoding(self.op_code));
        }
        let name = encode_utf16(&self.op_name);
        let tml = (REQUEST_HEADER_LEN + name.len()) as u16;
        dst.reserve(tml as usize);
        dst.put_u16(tml);
        dst.put_u8(self.op_code);
        dst.put_i16(self.operand1);
        dst.put_i16(self.operand2);
        dst.put_u8(self.request_id);
        dst.put_u8(name.len() as u8);
        dst.put_slice(&name);
        Ok(())
    }

    /// Parses one framed request. `src` must hold at least the fixed
    /// header; the stream codec guarantees this before calling.
    ///
    /// A declared TML that disagrees with the bytes actually framed is
    /// reported through the returned flag rather than an error, so the
    /// caller can answer with an error code instead of dropping the
    /// connection.
    pub fn decode(src: &[u8]) -> (RequestFrame, bool) {
        let total = src.len();
        let mut src = src;
        let tml = src.get_u16();
        let op_code = src.get_u8();
        let operand1 = src.get_i16();
        let operand2 = src.get_i16();
        let request_id = src.get_u8();
        let name_len = (src.get_u8() as usize).min(src.remaining());
        let op_name = decode_utf16(&src[..name_len]);

        let frame = RequestFrame {
            op_code,
            operand1,
            operand2,
            request_id,
            op_name,
        };
        (frame, tml as usize != total)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseFrame {
    pub request_id: u8,
    pub result: i32,
    pub error_code: u8,
}

impl ResponseFrame {
    pub fn ok(request_id: u8, result: i32) -> ResponseFrame {
        ResponseFrame {
            request_id,
            result,
            error_code: 0,
        }
    }

    pub fn error(request_id: u8) -> ResponseFrame {
        ResponseFrame {
            request_id,
            result: 0,
            error_code: ERROR_CODE,
        }
    }

    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(RESPONSE_LEN);
        dst.put_u16(RESPONSE_LEN as u16);
        dst.put_u8(self.request_id);
        dst.put_i32(self.result);
        dst.put_u8(self.error_code);
    }

    pub fn decode(src: &[u8]) -> Result<ResponseFrame, ProtocolError> {
        if src.len() < RESPONSE_LEN {
            return Err(ProtocolError::TruncatedFrame(src.len()));
        }
        let mut src = src;
        let _tml = src.get_u16();
        let request_id = src.get_u8();
        let result = src.get_i32();
        let error_code = src.get_u8();
        Ok(ResponseFrame {
            request_id,
            result,
            error_code,
        })
    }
}

/// Operation names travel as UTF-16 with a leading big-endian byte
/// order mark, two bytes per code unit.
fn encode_utf16(name: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(2 + name.len() * 2);
    bytes.extend_from_slice(&[0xFE, 0xFF]);
    for unit in name.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    bytes
}

fn decode_utf16(bytes: &[u8]) -> String {
    let (bytes, big_endian) = match bytes {
        [0xFE, 0xFF, rest @ ..] => (rest, true),
        [0xFF, 0xFE, rest @ ..] => (rest, false),
        _ => (bytes, true),
    };
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| {
            let pair = [pair[0], pair[1]];
            if big_endian {
                u16::from_be_bytes(pair)
            } else {
                u16::from_le_bytes(pair)
            }
        })
        .collect();
    String::from_utf16_lossy(&units)
}

/// Formats frame bytes the way the wire traces print them: two
/// uppercase hex digits per byte, space separated.
pub fn hex_dump(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
