//! Push channel transport.
//!
//! `PushConnector` opens a channel and hands back a `PushTransport` that
//! yields text frames until the server closes it. The feed session owns
//! the transport and closes it on every exit path.

use async_trait::async_trait;
use futures::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::error::Result;

/// An open push channel
#[async_trait]
pub trait PushTransport: Send {
    /// Next text payload; `None` once the channel is closed
    async fn recv(&mut self) -> Option<Result<String>>;

    /// Close the channel; safe to call more than once
    async fn close(&mut self);
}

/// Opens push channels
#[async_trait]
pub trait PushConnector: Send + Sync {
    async fn connect(&self, url: &Url) -> Result<Box<dyn PushTransport>>;
}

/// WebSocket connector backed by tokio-tungstenite
#[derive(Debug, Clone, Default)]
pub struct WsConnector;

impl WsConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PushConnector for WsConnector {
    async fn connect(&self, url: &Url) -> Result<Box<dyn PushTransport>> {
        let (stream, response) = tokio_tungstenite::connect_async(url.as_str()).await?;
        tracing::debug!(status = %response.status(), "Push channel handshake complete");
        Ok(Box::new(WsTransport {
            stream,
            closed: false,
        }))
    }
}

pub struct WsTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    closed: bool,
}

#[async_trait]
impl PushTransport for WsTransport {
    async fn recv(&mut self) -> Option<Result<String>> {
        if self.closed {
            return None;
        }

        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.as_str().to_owned())),
                Ok(Message::Binary(data)) => match String::from_utf8(data.to_vec()) {
                    Ok(text) => return Some(Ok(text)),
                    Err(_) => {
                        tracing::trace!(len = data.len(), "Ignoring non-UTF-8 binary frame");
                    }
                },
                Ok(Message::Close(frame)) => {
                    tracing::debug!(frame = ?frame, "Push channel closed by server");
                    self.closed = true;
                    return None;
                }
                // Pings are answered by tungstenite on the next read
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) | Ok(Message::Frame(_)) => {}
                Err(e) => return Some(Err(e.into())),
            }
        }
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.stream.close(None).await {
            tracing::debug!(error = %e, "Error while closing push channel");
        }
    }
}
