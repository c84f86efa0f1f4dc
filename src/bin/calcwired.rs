use calcwire::networking::server;
use clap::Parser;

#[derive(Parser)]
#[clap(name = "calcwired")]
#[clap(version = "0.1.0")]
#[clap(about = "remote arithmetic server for the calcwire protocol", long_about = None)]
struct Args {
    /// Port to listen on.
    port: u16,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    server::listen(args.port).await
}
