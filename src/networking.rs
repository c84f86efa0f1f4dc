pub mod client;
pub mod server;

use crate::protocol::codec::{ClientCodec, ServerCodec};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio_util::codec::{FramedRead, FramedWrite};

// type aliases
type RequestFrameRead = FramedRead<OwnedReadHalf, ServerCodec>;
type ResponseFrameWrite = FramedWrite<OwnedWriteHalf, ServerCodec>;
type ResponseFrameRead = FramedRead<OwnedReadHalf, ClientCodec>;
type RequestFrameWrite = FramedWrite<OwnedWriteHalf, ClientCodec>;
