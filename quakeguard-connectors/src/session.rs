//! Duplex session with the coordinator
//!
//! A session is exposed to the supervisor as a pair of channels
//! ([`SessionLink`]), so the supervisor never touches a socket directly and
//! tests can substitute an in-memory connector.
//!
//! The WebSocket implementation runs two pump tasks:
//! - **writer**: `OutboundFrame`s → socket; ends on `Close`, on socket error,
//!   or when every sender is dropped
//! - **reader**: socket text frames → inbound channel; ends on close frame
//!   or socket error, which drops the inbound sender and signals closure

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use log::{debug, info, warn};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::{frame::coding::CloseCode, CloseFrame};
use tokio_tungstenite::tungstenite::Message;

use crate::ConnectorError;

/// Capacity of each pump channel
pub const SESSION_CHANNEL_CAPACITY: usize = 32;

/// Frame queued for the writer pump
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    Text(String),
    /// Send a normal close frame with this reason and stop writing
    Close(String),
}

/// Open session as seen by the supervisor
#[derive(Debug)]
pub struct SessionLink {
    pub outbound: mpsc::Sender<OutboundFrame>,
    /// Yields inbound text frames; `None` once the session has closed
    pub inbound: mpsc::Receiver<String>,
}

impl SessionLink {
    /// Builds a link and the far ends of both channels
    pub fn pair() -> (SessionLink, mpsc::Receiver<OutboundFrame>, mpsc::Sender<String>) {
        let (out_tx, out_rx) = mpsc::channel(SESSION_CHANNEL_CAPACITY);
        let (in_tx, in_rx) = mpsc::channel(SESSION_CHANNEL_CAPACITY);
        (
            SessionLink {
                outbound: out_tx,
                inbound: in_rx,
            },
            out_rx,
            in_tx,
        )
    }
}

#[async_trait]
pub trait SessionConnector: Send + Sync {
    async fn open(&self) -> Result<SessionLink, ConnectorError>;
}

/// WebSocket client session
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    url: String,
    connect_timeout: Duration,
}

impl WebSocketConnector {
    pub fn new(url: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            url: url.into(),
            connect_timeout,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl SessionConnector for WebSocketConnector {
    async fn open(&self) -> Result<SessionLink, ConnectorError> {
        let handshake = tokio_tungstenite::connect_async(self.url.as_str());
        let (socket, _response) = tokio::time::timeout(self.connect_timeout, handshake)
            .await
            .map_err(|_| ConnectorError::Timeout(self.connect_timeout.as_millis() as u64))?
            .map_err(|e| ConnectorError::Protocol(e.to_string()))?;

        info!("session open: {}", self.url);

        let (mut sink, mut stream) = socket.split();
        let (link, mut out_rx, in_tx) = SessionLink::pair();

        tokio::spawn(async move {
            while let Some(frame) = out_rx.recv().await {
                match frame {
                    OutboundFrame::Text(text) => {
                        if let Err(e) = sink.send(Message::Text(text)).await {
                            warn!("session write failed: {}", e);
                            break;
                        }
                    }
                    OutboundFrame::Close(reason) => {
                        let close = CloseFrame {
                            code: CloseCode::Normal,
                            reason: reason.into(),
                        };
                        if let Err(e) = sink.send(Message::Close(Some(close))).await {
                            debug!("close frame not sent: {}", e);
                        }
                        break;
                    }
                }
            }
            let _ = sink.close().await;
        });

        tokio::spawn(async move {
            while let Some(message) = stream.next().await {
                match message {
                    Ok(Message::Text(text)) => {
                        if in_tx.send(text).await.is_err() {
                            break;
                        }
                    }
                    Ok(Message::Close(frame)) => {
                        debug!("coordinator closed session: {:?}", frame);
                        break;
                    }
                    Ok(_) => {
                        // Binary, ping and pong frames carry nothing for us
                    }
                    Err(e) => {
                        warn!("session read failed: {}", e);
                        break;
                    }
                }
            }
        });

        Ok(link)
    }
}
