//! Sends a batch of messages to an AMQP 1.0 peer and waits until every one
//! of them is accepted.
//!
//! ```sh
//! RUST_LOG=oxamqp=trace cargo run -- -a amqp://localhost:5672/q1 -m 10
//! ```

use std::process::ExitCode;

use clap::Parser;
use oxamqp::{
    connection::{ConnectionEngine, Endpoint},
    sender,
    transport::{self, Driver},
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "send",
    about = "Send messages to an AMQP 1.0 peer and wait for them to be accepted"
)]
struct Args {
    /// Where to send, as amqp://host[:port]/address
    #[arg(
        short = 'a',
        value_name = "URL",
        default_value = "amqp://localhost:5672/example",
        value_parser = parse_endpoint
    )]
    address: Endpoint,

    /// Number of messages to send
    #[arg(short = 'm', value_name = "COUNT", default_value_t = sender::DEFAULT_COUNT)]
    message_count: u32,
}

fn parse_endpoint(s: &str) -> Result<Endpoint, String> {
    Endpoint::parse(s).map_err(|err| err.to_string())
}

/// `<program>:<pid>`
fn container_id() -> String {
    let program = std::env::args()
        .next()
        .and_then(|arg0| {
            std::path::Path::new(&arg0)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| String::from("send"));
    format!("{}:{}", program, std::process::id())
}

async fn run(args: Args) -> Result<u32, oxamqp::Error> {
    let endpoint = args.address;
    let mut engine = ConnectionEngine::builder()
        .container_id(container_id())
        .hostname(endpoint.host.clone())
        .build();
    let mut sender = sender::Builder::new()
        .target(endpoint.address.clone())
        .count(args.message_count)
        .build();

    let stream = transport::connect(&endpoint).await?;
    Driver::new(stream).run(&mut engine, &mut sender).await?;
    Ok(sender.acknowledged())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Malformed options print the usage and exit with status 2
    let args = Args::parse();

    match run(args).await {
        Ok(acknowledged) => {
            println!("{} messages sent and acknowledged", acknowledged);
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("send: {}", err);
            ExitCode::FAILURE
        }
    }
}
