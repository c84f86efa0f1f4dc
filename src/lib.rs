//! Remote integer arithmetic over a small binary TCP protocol.
//!
//! A request frame carries an opcode, two signed 16-bit operands, a
//! correlation id and the operation's UTF-16 name; the server answers
//! every request with a fixed eight-byte response holding a 32-bit
//! result and an error code.

pub mod calc;
pub mod networking;
pub mod protocol;
