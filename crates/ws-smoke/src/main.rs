use bombwire_core::LedCommand;
use tokio_tungstenite::tungstenite::Message;

mod smoke;

use smoke::{SmokeError, SmokeOptions};

const DEFAULT_URL: &str = "ws://192.168.0.143/ws";

#[tokio::main]
async fn main() {
    let raw = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_URL.to_string());
    eprintln!("Connecting to {}", raw);

    let reply_timeout = std::env::args().nth(2);

    if let Err(e) = run(&raw, reply_timeout.as_deref()).await {
        eprintln!("{}", e);
        std::process::exit(e.exit_code());
    }
}

// Usage: ws-smoke [URL] [REPLY_TIMEOUT_SECS]. Without a timeout each reply is
// awaited until the device answers or drops the connection.
async fn run(raw: &str, reply_timeout: Option<&str>) -> Result<(), SmokeError> {
    let url = smoke::parse_url(raw)?;
    let opts = SmokeOptions {
        reply_timeout: reply_timeout.map(smoke::parse_reply_timeout).transpose()?,
        ..SmokeOptions::default()
    };
    smoke::run(&url, &opts, print_reply).await?;
    Ok(())
}

fn print_reply(cmd: LedCommand, msg: &Message) {
    match msg {
        Message::Text(t) => println!("{}", t),
        other => {
            eprintln!("{} got a non-text reply", cmd);
            println!("{:?}", other);
        }
    }
}
