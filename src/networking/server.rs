use crate::{
    calc,
    networking::{RequestFrameRead, ResponseFrameWrite},
    protocol::{codec::ServerCodec, Op, ResponseFrame},
};
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

/// Binds the listener and serves until the process is terminated.
pub async fn listen(port: u16) -> std::io::Result<()> {
    let address = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(address).await?;
    info!("calcwire: server started at {}", address);
    serve(listener).await
}

/// Accept loop: one spawned task per connection, nothing shared between
/// them. Accepting never waits on a handler.
pub async fn serve(listener: TcpListener) -> std::io::Result<()> {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                info!("accepted connection from {}", addr);
                tokio::spawn(handle_connection(stream, addr));
            }
            Err(e) => warn!("couldn't accept client: {:?}", e),
        }
    }
}

/// Decode-dispatch-respond loop for one connection. Every request frame
/// gets exactly one response frame, in order; only transport failures
/// end the session.
async fn handle_connection(stream: TcpStream, addr: SocketAddr) {
    let (read, write) = stream.into_split();
    let mut stream = RequestFrameRead::new(read, ServerCodec::new());
    let mut sink = ResponseFrameWrite::new(write, ServerCodec::new());

    while let Some(frame) = stream.next().await {
        let (request, length_mismatch) = match frame {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!("request read failure: {:?}", e);
                break;
            }
        };

        let operation = Op::from_u8(request.op_code)
            .map(Op::name)
            .unwrap_or("unknown");
        debug!(
            "request id: {}, operation: {}, operands: {}, {}",
            request.request_id, operation, request.operand1, request.operand2
        );

        let response = if length_mismatch {
            warn!("declared TML does not match received frame length");
            ResponseFrame::error(request.request_id)
        } else {
            let (result, error_code) =
                calc::dispatch(request.op_code, request.operand1, request.operand2);
            ResponseFrame {
                request_id: request.request_id,
                result,
                error_code,
            }
        };

        if let Err(e) = sink.send(response).await {
            warn!("response write failure: {:?}", e);
            break;
        }
    }

    info!("calcwire: closing connection from {}", addr);
}
