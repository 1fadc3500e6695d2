#![forbid(unsafe_code)]

//! `minecloud-wrapper-ctl`: command-line companion for `minecloud-wrapper`.
//!
//! Talks to the wrapper's HTTP control surface.

use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Debug, Parser)]
#[command(
    name = "minecloud-wrapper-ctl",
    about = "Local CLI for the minecloud-wrapper control surface",
    version,
    long_about = None
)]
struct Cli {
    /// Base URL of the wrapper's HTTP control surface.
    #[arg(long, env = "MINECLOUD_WRAPPER_URL", default_value = "http://127.0.0.1:8080")]
    url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the server status.
    Status,

    /// Stop the server and wait for it to exit.
    Stop,

    /// Save the world.
    Save,

    /// Copy a consistent world snapshot.
    Snapshot,

    /// Send a raw console command.
    Command {
        /// Command text, e.g. `say hello`.
        text: String,
    },
}

type CtlResult<T> = std::result::Result<T, Box<dyn std::error::Error>>;

fn main() {
    let args = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("Failed to start runtime: {err}");
            std::process::exit(1);
        }
    };

    match runtime.block_on(send_request(&args)) {
        Ok(Some(body)) => println!("{body}"),
        Ok(None) => println!("OK"),
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    }
}

/// Issue the request for `args.command`, returning the printable response body.
async fn send_request(args: &Cli) -> CtlResult<Option<String>> {
    let base = args.url.trim_end_matches('/');
    let client = reqwest::Client::new();

    let request = match &args.command {
        Command::Status => client.get(format!("{base}/status")),
        Command::Stop => client.post(format!("{base}/stop")),
        Command::Save => client.post(format!("{base}/save")),
        Command::Snapshot => client.post(format!("{base}/snapshot")),
        Command::Command { text } => client.post(format!("{base}/command")).body(text.clone()),
    };

    let response = request
        .send()
        .await
        .map_err(|err| format!("failed to reach {base}: {err}"))?;
    let status = response.status();

    if status.is_success() {
        if status == reqwest::StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let body: Value = response.json().await?;
        let text = body
            .get("Status")
            .and_then(Value::as_str)
            .map_or_else(|| body.to_string(), str::to_owned);
        return Ok(Some(text));
    }

    let message = match response.json::<Value>().await {
        Ok(body) => body
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_owned(),
        Err(_) => format!("request failed with {status}"),
    };
    Err(message.into())
}
