//! WebSocket transport: connect, send one subscribe frame, read until closed.
//!
//! Continuation frames are reassembled by `tokio-tungstenite`, so every
//! `Text`/`Binary` item is one complete message.

use actlink_core::constants::SUBSCRIBE_MESSAGE;
use actlink_core::{TransportError, TransportKind};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace};

use super::{ReceiveContext, ReceiveExit, Transport};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Persistent duplex connection to the tracker's WebSocket endpoint.
pub struct StreamTransport {
    address: String,
    ws: Option<WsStream>,
}

impl StreamTransport {
    /// Transport for `address` (e.g. `ws://127.0.0.1:10501/ws`). Nothing is
    /// opened until [`Transport::connect`].
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ws: None,
        }
    }

    /// Endpoint this transport dials.
    pub fn address(&self) -> &str {
        &self.address
    }
}

#[async_trait]
impl Transport for StreamTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Stream
    }

    async fn connect(&mut self) -> Result<(), TransportError> {
        let (ws, response) =
            connect_async(self.address.as_str())
                .await
                .map_err(|e| TransportError::Connect {
                    address: self.address.clone(),
                    reason: e.to_string(),
                })?;
        debug!(address = %self.address, status = %response.status(), "websocket connected");
        self.ws = Some(ws);
        Ok(())
    }

    async fn subscribe(&mut self) -> Result<(), TransportError> {
        let ws = self.ws.as_mut().ok_or(TransportError::NotConnected)?;
        ws.send(Message::Text(SUBSCRIBE_MESSAGE.to_string().into()))
            .await
            .map_err(|e| TransportError::Subscribe(e.to_string()))
    }

    async fn receive(&mut self, ctx: ReceiveContext<'_>) -> ReceiveExit {
        let Some(ws) = self.ws.as_mut() else {
            return ReceiveExit::Failed(TransportError::NotConnected.to_string());
        };

        loop {
            if !ctx.status.state().is_receiving() {
                debug!(state = %ctx.status.state(), "leaving receive loop");
                return ReceiveExit::Closed;
            }

            tokio::select! {
                biased;
                () = ctx.cancel.cancelled() => return ReceiveExit::Cancelled,
                frame = ws.next() => match frame {
                    None => return ReceiveExit::Closed,
                    Some(Err(e)) => return ReceiveExit::Failed(e.to_string()),
                    Some(Ok(Message::Close(frame))) => {
                        debug!(?frame, "tracker sent close frame");
                        return ReceiveExit::Closed;
                    }
                    Some(Ok(Message::Text(text))) => {
                        let _ = ctx.pipeline.ingest_text(text.as_str());
                    }
                    Some(Ok(Message::Binary(bytes))) => {
                        let _ = ctx.pipeline.ingest_bytes(&bytes);
                    }
                    Some(Ok(other)) => trace!(?other, "control frame"),
                },
            }
        }
    }

    async fn close(&mut self) {
        let Some(mut ws) = self.ws.take() else {
            return;
        };
        if let Err(e) = ws.close(None).await {
            debug!(error = %e, "websocket close handshake failed, dropping connection");
        }
    }
}

impl std::fmt::Debug for StreamTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamTransport")
            .field("address", &self.address)
            .field("open", &self.ws.is_some())
            .finish()
    }
}
