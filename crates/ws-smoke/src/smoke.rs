use std::time::Duration;

use bombwire_core::{LedCommand, SMOKE_SEQUENCE};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::time::{sleep, timeout};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum SmokeError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Unsupported scheme {0:?}, expected ws or wss")]
    UnsupportedScheme(String),
    #[error("Invalid reply timeout {0:?}, expected whole seconds")]
    InvalidTimeout(String),
    #[error("WS connect failed: {0}")]
    Connect(#[source] WsError),
    #[error("WS send failed: {0}")]
    Send(#[source] WsError),
    #[error("WS receive error: {0}")]
    Receive(#[source] WsError),
    #[error("WS closed by server")]
    Closed,
    #[error("Timeout waiting for reply to {0}")]
    Timeout(LedCommand),
}

impl SmokeError {
    pub fn exit_code(&self) -> i32 {
        match self {
            SmokeError::Receive(_) => 2,
            SmokeError::Closed => 3,
            SmokeError::Timeout(_) => 4,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SmokeOptions {
    /// Pause between the two commands so the LED is visibly on.
    pub pause: Duration,
    /// `None` waits for each reply as long as the connection stays open.
    pub reply_timeout: Option<Duration>,
}

impl Default for SmokeOptions {
    fn default() -> Self {
        Self { pause: Duration::from_secs(1), reply_timeout: None }
    }
}

pub fn parse_url(raw: &str) -> Result<Url, SmokeError> {
    let url = Url::parse(raw)?;
    match url.scheme() {
        "ws" | "wss" => Ok(url),
        other => Err(SmokeError::UnsupportedScheme(other.to_string())),
    }
}

pub fn parse_reply_timeout(raw: &str) -> Result<Duration, SmokeError> {
    match raw.parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(SmokeError::InvalidTimeout(raw.to_string())),
    }
}

/// Connects, runs the LED sequence, and closes. `on_reply` fires as soon as
/// each reply arrives.
pub async fn run<F>(url: &Url, opts: &SmokeOptions, on_reply: F) -> Result<Vec<Message>, SmokeError>
where
    F: FnMut(LedCommand, &Message),
{
    let (ws_stream, _) = connect_async(url.as_str()).await.map_err(SmokeError::Connect)?;
    exchange(ws_stream, opts, on_reply).await
}

pub async fn exchange<S, F>(ws: S, opts: &SmokeOptions, mut on_reply: F) -> Result<Vec<Message>, SmokeError>
where
    S: Stream<Item = Result<Message, WsError>> + Sink<Message, Error = WsError>,
    F: FnMut(LedCommand, &Message),
{
    let (mut write, mut read) = ws.split();
    let mut replies = Vec::with_capacity(SMOKE_SEQUENCE.len());

    for (i, cmd) in SMOKE_SEQUENCE.into_iter().enumerate() {
        if i > 0 {
            sleep(opts.pause).await;
        }
        write
            .send(Message::Text(cmd.as_str().to_string()))
            .await
            .map_err(SmokeError::Send)?;
        let pending = next_reply(&mut read);
        let reply = match opts.reply_timeout {
            Some(limit) => timeout(limit, pending).await.map_err(|_| SmokeError::Timeout(cmd))??,
            None => pending.await?,
        };
        on_reply(cmd, &reply);
        replies.push(reply);
    }

    // Best effort; the device may already be gone.
    let _ = write.close().await;
    Ok(replies)
}

async fn next_reply<R>(read: &mut R) -> Result<Message, SmokeError>
where
    R: Stream<Item = Result<Message, WsError>> + Unpin,
{
    while let Some(frame) = read.next().await {
        match frame {
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
            Ok(Message::Close(_)) => return Err(SmokeError::Closed),
            Ok(msg) => return Ok(msg),
            Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => return Err(SmokeError::Closed),
            Err(e) => return Err(SmokeError::Receive(e)),
        }
    }
    Err(SmokeError::Closed)
}
