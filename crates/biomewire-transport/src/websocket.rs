//! WebSocket transport implementation using `tokio-tungstenite`.
//!
//! Used by the schema-RPC generation: each request is one binary message
//! and the server answers each with one binary message. An empty binary
//! reply acknowledges a request that has no response payload.

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;

use crate::{ConnectionId, Deadline, Transport, TransportError};

type WsStream = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// A request/response [`Transport`] over a WebSocket connection.
pub struct WebSocketTransport {
    id: ConnectionId,
    endpoint: String,
    ws: Option<WsStream>,
    pending: Option<Vec<u8>>,
}

impl WebSocketTransport {
    /// Opens a WebSocket connection to `url` (`ws://host:port/path`).
    pub async fn connect(
        url: &str,
        deadline: Deadline,
    ) -> Result<Self, TransportError> {
        if !url.starts_with("ws://") && !url.starts_with("wss://") {
            return Err(TransportError::InvalidEndpoint(url.to_string()));
        }

        let (ws, _) = deadline
            .run("connect", async {
                tokio_tungstenite::connect_async(url).await.map_err(|e| {
                    TransportError::ConnectFailed {
                        endpoint: url.to_string(),
                        source: std::io::Error::new(
                            std::io::ErrorKind::ConnectionRefused,
                            e,
                        ),
                    }
                })
            })
            .await?;

        let id = ConnectionId::next();
        tracing::debug!(%id, url, "websocket transport connected");

        Ok(Self {
            id,
            endpoint: url.to_string(),
            ws: Some(ws),
            pending: None,
        })
    }

    fn ws(&mut self) -> Result<&mut WsStream, TransportError> {
        self.ws
            .as_mut()
            .ok_or_else(|| TransportError::closed("transport closed"))
    }
}

impl Transport for WebSocketTransport {
    async fn send(
        &mut self,
        frame: &[u8],
        deadline: Deadline,
    ) -> Result<(), TransportError> {
        self.pending = None;
        let id = self.id;
        let ws = self.ws()?;

        let reply = deadline
            .run("send", async {
                ws.send(Message::Binary(frame.to_vec().into()))
                    .await
                    .map_err(|e| {
                        TransportError::SendFailed(std::io::Error::new(
                            std::io::ErrorKind::BrokenPipe,
                            e,
                        ))
                    })?;
                next_binary(&mut *ws).await
            })
            .await?;

        tracing::trace!(%id, sent = frame.len(), reply = reply.len(), "websocket exchange");
        if !reply.is_empty() {
            self.pending = Some(reply);
        }
        Ok(())
    }

    async fn receive(
        &mut self,
        _deadline: Deadline,
    ) -> Result<Vec<u8>, TransportError> {
        self.ws()?;
        self.pending.take().ok_or(TransportError::NoResponse)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.pending = None;
        if let Some(mut ws) = self.ws.take() {
            // A peer that already hung up makes the close handshake fail;
            // the connection is gone either way.
            let _ = ws.close(None).await;
            tracing::debug!(id = %self.id, "websocket transport closed");
        }
        Ok(())
    }

    fn id(&self) -> ConnectionId {
        self.id
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Reads until the next data message, skipping control frames.
async fn next_binary(ws: &mut WsStream) -> Result<Vec<u8>, TransportError> {
    loop {
        match ws.next().await {
            Some(Ok(Message::Binary(data))) => return Ok(data.to_vec()),
            Some(Ok(Message::Text(text))) => {
                return Ok(text.as_bytes().to_vec());
            }
            Some(Ok(Message::Close(_))) | None => {
                return Err(TransportError::closed("server closed websocket"));
            }
            Some(Ok(_)) => continue, // skip ping/pong/frame
            Some(Err(e)) => {
                return Err(TransportError::ReceiveFailed(
                    std::io::Error::new(
                        std::io::ErrorKind::ConnectionReset,
                        e,
                    ),
                ));
            }
        }
    }
}
