use calcwire::{
    networking::client::{Outcome, Session},
    protocol::{Op, ProtocolError},
};
use clap::Parser;
use std::io::{self, Write};
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[clap(name = "cwc")]
#[clap(version = "0.1.0")]
#[clap(about = "interactive client for the calcwire protocol", long_about = None)]
struct Args {
    /// Server host name or address.
    host: String,
    /// Server port.
    port: u16,
}

#[tokio::main]
async fn main() -> Result<(), ProtocolError> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let mut session = Session::connect(&args.host, args.port).await?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("enter opcode (0-5), operand1, and operand2 (or 'q' to quit): ");
        io::stdout().flush()?;

        let line = match lines.next_line().await? {
            Some(line) => line,
            None => break,
        };
        let line = line.trim();
        if line.eq_ignore_ascii_case("q") {
            break;
        }

        let (op, operand1, operand2) = match parse_command(line) {
            Some(command) => command,
            None => {
                println!("invalid input, expected: <opcode 0-5> <operand1> <operand2>");
                continue;
            }
        };

        match session.request(op, operand1, operand2).await? {
            Outcome::Reply {
                response,
                round_trip,
            } => {
                let error = if response.error_code == 0 {
                    String::from("OK")
                } else {
                    response.error_code.to_string()
                };
                println!(
                    "request id: {}, result: {}, error code: {}",
                    response.request_id, response.result, error
                );
                println!("round trip time: {} ms", round_trip.as_millis());
            }
            Outcome::NoResponse { attempts } => {
                println!("no response after {} attempts - giving up", attempts);
            }
        }
        println!();
    }

    Ok(())
}

fn parse_command(line: &str) -> Option<(Op, i16, i16)> {
    let mut parts = line.split_whitespace();
    let op = Op::from_u8(parts.next()?.parse().ok()?)?;
    let operand1 = parts.next()?.parse().ok()?;
    let operand2 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((op, operand1, operand2))
}
