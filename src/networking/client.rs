use crate::{
    networking::{RequestFrameWrite, ResponseFrameRead},
    protocol::{codec::ClientCodec, Op, ProtocolError, RequestFrame, ResponseFrame},
};
use futures::{SinkExt, StreamExt};
use std::{io, time::Duration};
use tokio::{
    net::TcpStream,
    time::{timeout, Instant},
};
use tracing::{debug, warn};

/// How long one attempt waits for a response before resending.
pub const RESPONSE_TIMEOUT: Duration = Duration::from_millis(3000);

/// Send attempts per logical request before giving up.
pub const MAX_TRIES: u32 = 5;

/// Retry-loop states for one logical request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestState {
    Built,
    Sent,
    Awaiting,
    Received(ResponseFrame),
    TimedOut,
    GiveUp,
}

/// What one logical request produced.
#[derive(Debug)]
pub enum Outcome {
    /// A complete response arrived. Round-trip time runs from the first
    /// send of the sequence, not from the attempt that was answered.
    Reply {
        response: ResponseFrame,
        round_trip: Duration,
    },
    /// Every attempt timed out.
    NoResponse { attempts: u32 },
}

/// One client connection and its free-running request id.
///
/// A session issues one request at a time. Retries resend the identical
/// frame with the same id and the server does not deduplicate, so a
/// response raised by an earlier attempt of the same request is
/// indistinguishable from one raised by the latest attempt; the session
/// accepts whichever arrives first.
pub struct Session {
    stream: ResponseFrameRead,
    sink: RequestFrameWrite,
    request_id: u8,
    response_timeout: Duration,
}

impl Session {
    pub async fn connect(host: &str, port: u16) -> Result<Session, ProtocolError> {
        let stream = match timeout(RESPONSE_TIMEOUT, TcpStream::connect((host, port))).await {
            Ok(stream) => stream?,
            Err(_) => {
                return Err(io::Error::new(io::ErrorKind::TimedOut, "connect timed out").into())
            }
        };

        let (read, write) = stream.into_split();
        Ok(Session {
            stream: ResponseFrameRead::new(read, ClientCodec::new()),
            sink: RequestFrameWrite::new(write, ClientCodec::new()),
            request_id: 0,
            response_timeout: RESPONSE_TIMEOUT,
        })
    }

    /// The correlation id the next request will carry.
    pub fn request_id(&self) -> u8 {
        self.request_id
    }

    /// Runs one logical request through the retry loop. The id advances
    /// (wrapping mod 256) afterwards whether or not a response arrived.
    ///
    /// `Err` means the transport itself failed; timeouts are not errors,
    /// they surface as [`Outcome::NoResponse`].
    pub async fn request(
        &mut self,
        op: Op,
        operand1: i16,
        operand2: i16,
    ) -> Result<Outcome, ProtocolError> {
        let frame = RequestFrame::new(op, operand1, operand2, self.request_id);
        let outcome = self.run(frame).await;
        self.request_id = self.request_id.wrapping_add(1);
        outcome
    }

    async fn run(&mut self, frame: RequestFrame) -> Result<Outcome, ProtocolError> {
        let started = Instant::now();
        let mut attempts = 0u32;
        let mut state = RequestState::Built;

        loop {
            state = match state {
                RequestState::Built => {
                    self.sink.send(frame.clone()).await?;
                    attempts += 1;
                    RequestState::Sent
                }
                RequestState::Sent => RequestState::Awaiting,
                RequestState::Awaiting => {
                    match timeout(self.response_timeout, self.stream.next()).await {
                        Ok(Some(Ok(response))) => RequestState::Received(response),
                        Ok(Some(Err(e))) => {
                            // a short or unreadable response counts as a
                            // timeout for retry purposes
                            warn!("discarding unreadable response: {}", e);
                            RequestState::TimedOut
                        }
                        Ok(None) => {
                            warn!("server closed the connection before responding");
                            RequestState::TimedOut
                        }
                        Err(_) => {
                            debug!("timeout, retrying...");
                            RequestState::TimedOut
                        }
                    }
                }
                RequestState::TimedOut => {
                    if attempts < MAX_TRIES {
                        // identical frame, same request id
                        self.sink.send(frame.clone()).await?;
                        attempts += 1;
                        RequestState::Sent
                    } else {
                        RequestState::GiveUp
                    }
                }
                RequestState::Received(response) => {
                    return Ok(Outcome::Reply {
                        response,
                        round_trip: started.elapsed(),
                    });
                }
                RequestState::GiveUp => {
                    return Ok(Outcome::NoResponse { attempts });
                }
            };
        }
    }
}
