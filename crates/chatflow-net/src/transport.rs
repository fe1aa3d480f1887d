//! Transport seam for the channel task.
//!
//! The channel loop only needs to open a connection and move text frames in
//! both directions. [`WsConnector`] does that over a WebSocket; tests use the
//! in-memory connector from [`crate::memory`].

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;

use crate::error::NetError;

/// Opens connections to the server. Called again on every reconnect.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Conn: FrameConnection;

    async fn connect(&self) -> Result<Self::Conn, NetError>;
}

/// An open, bidirectional text-frame connection.
#[async_trait]
pub trait FrameConnection: Send + 'static {
    async fn send(&mut self, frame: String) -> Result<(), NetError>;

    /// Next text frame. `None` once the peer closed the connection.
    async fn recv(&mut self) -> Option<Result<String, NetError>>;

    async fn close(&mut self);
}

/// Connects to a WebSocket endpoint (`ws://` or `wss://`).
#[derive(Debug, Clone)]
pub struct WsConnector {
    url: String,
}

impl WsConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl Connector for WsConnector {
    type Conn = WsConnection;

    async fn connect(&self) -> Result<Self::Conn, NetError> {
        let (stream, response) = connect_async(self.url.as_str()).await?;
        debug!(url = %self.url, status = %response.status(), "WebSocket handshake complete");
        Ok(WsConnection { stream })
    }
}

pub struct WsConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl FrameConnection for WsConnection {
    async fn send(&mut self, frame: String) -> Result<(), NetError> {
        self.stream.send(Message::Text(frame)).await?;
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, NetError>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Close(frame)) => {
                    debug!(?frame, "Server closed the WebSocket");
                    return None;
                }
                // ping/pong are answered by tungstenite; binary frames are not part of the protocol
                Ok(_) => continue,
                Err(e) => return Some(Err(e.into())),
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            debug!(error = %e, "WebSocket close failed");
        }
    }
}
