//! WebSocket transport for the market data feed.
//!
//! Pumps frames between a websocket connection and the channels of a
//! [`TransportChannels`] pair. It never looks inside the payloads.

use std::{borrow::Cow, time::Duration};

use futures_util::{SinkExt, StreamExt};
use log::{debug, info, warn};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async,
    tungstenite::protocol::{frame::coding::CloseCode, CloseFrame, Message},
    MaybeTlsStream, WebSocketStream,
};
use tokio_util::sync::CancellationToken;
use url::Url;

use super::feed::TransportChannels;
use crate::utils::error::{Error, Result};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How long to wait for the server's close reply after we send ours.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// WebSocket client with retry on the initial handshake.
#[derive(Debug, Clone)]
pub struct WsClient {
    url: Url,
    max_retries: usize,
    retry_delay: Duration,
}

impl WsClient {
    pub fn new(url: &str) -> Result<Self> {
        Ok(Self { url: Url::parse(url)?, max_retries: 5, retry_delay: Duration::from_secs(2) })
    }

    pub fn with_retries(mut self, max_retries: usize, retry_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = retry_delay;
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Open the connection, retrying up to `max_retries` times.
    pub async fn connect(&self) -> Result<WsStream> {
        let mut attempts = 0;
        loop {
            match connect_async(self.url.as_str()).await {
                Ok((ws_stream, _)) => {
                    info!("Connected to {}", self.url);
                    return Ok(ws_stream);
                }
                Err(e) => {
                    attempts += 1;
                    if attempts > self.max_retries {
                        return Err(Error::Transport(format!(
                            "connection to {} failed after {} attempts: {}",
                            self.url, attempts, e
                        )));
                    }
                    warn!("Connection to {} failed (attempt {}): {}", self.url, attempts, e);
                    tokio::time::sleep(self.retry_delay).await;
                }
            }
        }
    }

    /// Connect and pump messages until cancelled, closed by the server, or failed.
    ///
    /// Failures are also delivered on the inbound channel so the engine stops.
    pub async fn run(&self, channels: TransportChannels, cancel: CancellationToken) -> Result<()> {
        let ws_stream = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            res = self.connect() => res,
        };
        match ws_stream {
            Ok(ws_stream) => pump(ws_stream, channels, cancel).await,
            Err(e) => {
                let reason = match &e {
                    | Error::Transport(msg) => msg.clone(),
                    | other => other.to_string(),
                };
                let _ = channels.inbound.send(Err(Error::Transport(reason))).await;
                Err(e)
            }
        }
    }
}

async fn pump(ws_stream: WsStream, channels: TransportChannels, cancel: CancellationToken) -> Result<()> {
    let TransportChannels { mut outbound, inbound } = channels;
    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("Interrupt received, closing websocket");
                let close = Message::Close(Some(CloseFrame {
                    code: CloseCode::Normal,
                    reason: Cow::Borrowed(""),
                }));
                write.send(close).await?;
                let _ = tokio::time::timeout(CLOSE_TIMEOUT, async {
                    while let Some(Ok(msg)) = read.next().await {
                        if msg.is_close() {
                            break;
                        }
                    }
                })
                .await;
                return Ok(());
            }
            Some(req) = outbound.recv() => {
                debug!("send: {}", String::from_utf8_lossy(&req));
                let text = String::from_utf8(req)
                    .map_err(|e| Error::InvalidArgument(format!("outbound message is not UTF-8: {}", e)))?;
                if let Err(e) = write.send(Message::Text(text)).await {
                    let _ = inbound.send(Err(Error::Transport(format!("write failed: {}", e)))).await;
                    return Err(e.into());
                }
            }
            frame = read.next() => {
                let payload = match frame {
                    | Some(Ok(Message::Text(txt))) => txt.into_bytes(),
                    | Some(Ok(Message::Binary(bin))) => bin,
                    | Some(Ok(Message::Close(frame))) => {
                        info!("Server closed the connection: {:?}", frame);
                        return Ok(());
                    }
                    | Some(Ok(_)) => continue,
                    | Some(Err(e)) => {
                        warn!("WebSocket read error: {}", e);
                        let _ = inbound.send(Err(Error::Transport(format!("read failed: {}", e)))).await;
                        return Err(e.into());
                    }
                    | None => {
                        info!("Server terminated the connection");
                        return Ok(());
                    }
                };
                // Awaiting capacity here is the backpressure on the socket.
                if inbound.send(Ok(payload)).await.is_err() {
                    debug!("Engine has stopped; dropping websocket");
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_new_parses_url() {
        let client = WsClient::new("wss://ws-feed.exchange.coinbase.com").unwrap();
        assert_eq!(client.url().host_str(), Some("ws-feed.exchange.coinbase.com"));
        assert_matches!(WsClient::new("not a url"), Err(Error::Url(_)));
    }

    #[tokio::test]
    async fn test_connect_gives_up_after_retries() {
        // Bind then drop to get a port nobody listens on.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let client = WsClient::new(&format!("ws://127.0.0.1:{}", port))
            .unwrap()
            .with_retries(1, Duration::from_millis(10));
        assert_matches!(client.connect().await, Err(Error::Transport(msg)) if msg.contains("2 attempts"));
    }
}
