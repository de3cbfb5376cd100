//! Generator-side request loop: read a request, answer it, repeat.
//!
//! Each connection gets its own task running [`handle_requests`] over a
//! [`RequestLink`]. Request/response links answer every request, with an
//! empty frame when there is nothing to say; the publish/poll link only
//! publishes real replies.

use std::time::Duration;

use biomewire_protocol::{BiomeDataResponse, BiomeListResponse, Message, WireCodec};
use biomewire_transport::{
    ConnectionId, Deadline, IpcTransport, Transport, TransportError, read_frame, write_frame,
};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite;

use crate::WorldGenerator;

/// How long a reply may wait for the client to drain its stream.
const REPLY_TIMEOUT: Duration = Duration::from_secs(5);

/// The generator's end of one client connection.
pub(crate) trait RequestLink: Send {
    /// The next request frame, or `None` once the client has gone.
    async fn next_request(&mut self) -> Result<Option<Vec<u8>>, TransportError>;

    async fn reply(&mut self, frame: &[u8]) -> Result<(), TransportError>;

    /// Answers a request that has no reply payload.
    async fn acknowledge(&mut self) -> Result<(), TransportError>;
}

/// Serves requests until the client disconnects.
pub(crate) async fn handle_requests<L, C, G>(
    id: ConnectionId,
    link: &mut L,
    codec: &C,
    generator: &G,
) -> Result<(), TransportError>
where
    L: RequestLink,
    C: WireCodec,
    G: WorldGenerator + ?Sized,
{
    tracing::debug!(%id, generation = codec.generation(), "serving client");

    while let Some(frame) = link.next_request().await? {
        let request = match codec.decode(&frame) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(%id, error = %e, "undecodable request");
                link.acknowledge().await?;
                continue;
            }
        };
        tracing::debug!(%id, kind = %request.kind(), "request");

        let reply = match request {
            Message::BiomeDataRequest(request) => {
                Message::BiomeDataResponse(BiomeDataResponse {
                    data: generator.biome_data(&request),
                })
            }
            Message::CreateWorldRequest(request) => {
                generator.create_world(&request);
                link.acknowledge().await?;
                continue;
            }
            Message::BiomeListRequest => Message::BiomeListResponse(BiomeListResponse {
                biomes: generator.biome_list(),
            }),
            other => {
                tracing::warn!(%id, kind = %other.kind(), "client sent a server message");
                link.acknowledge().await?;
                continue;
            }
        };

        let bytes = match codec.encode(&reply) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(%id, error = %e, "reply could not be encoded");
                link.acknowledge().await?;
                continue;
            }
        };
        // An oversized or undelivered reply fails this request only.
        match link.reply(&bytes).await {
            Ok(()) => {}
            Err(e @ (TransportError::FrameTooLarge { .. } | TransportError::Timeout { .. })) => {
                tracing::warn!(%id, error = %e, len = bytes.len(), "reply dropped");
                link.acknowledge().await?;
            }
            Err(e) => return Err(e),
        }
    }

    tracing::debug!(%id, "client disconnected");
    Ok(())
}

// ---------------------------------------------------------------------------
// Links
// ---------------------------------------------------------------------------

impl RequestLink for TcpStream {
    async fn next_request(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        match read_frame(self).await {
            Ok(frame) => Ok(Some(frame)),
            Err(TransportError::ConnectionClosed(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn reply(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        write_frame(self, frame).await
    }

    async fn acknowledge(&mut self) -> Result<(), TransportError> {
        write_frame(self, &[]).await
    }
}

impl RequestLink for WebSocketStream<TcpStream> {
    async fn next_request(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        loop {
            match self.next().await {
                Some(Ok(tungstenite::Message::Binary(data))) => return Ok(Some(data.to_vec())),
                Some(Ok(tungstenite::Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(std::io::Error::new(
                        std::io::ErrorKind::ConnectionReset,
                        e,
                    )));
                }
            }
        }
    }

    async fn reply(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        self.send(tungstenite::Message::Binary(frame.to_vec().into()))
            .await
            .map_err(|e| {
                TransportError::SendFailed(std::io::Error::new(std::io::ErrorKind::BrokenPipe, e))
            })
    }

    async fn acknowledge(&mut self) -> Result<(), TransportError> {
        self.reply(&[]).await
    }
}

impl RequestLink for IpcTransport {
    async fn next_request(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        match self.receive(Deadline::never()).await {
            Ok(frame) => Ok(Some(frame)),
            Err(TransportError::ConnectionClosed(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn reply(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        self.send(frame, Deadline::after(REPLY_TIMEOUT)).await
    }

    async fn acknowledge(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use biomewire_protocol::FramedCodec;

    use super::*;
    use crate::ToyGenerator;

    /// A link whose replies all fail with the same error.
    struct FailingLink {
        requests: VecDeque<Vec<u8>>,
        error: fn() -> TransportError,
        replies: usize,
        acks: usize,
    }

    impl FailingLink {
        fn new(requests: usize, error: fn() -> TransportError) -> Self {
            let frame = FramedCodec.encode(&Message::BiomeListRequest).unwrap();
            Self {
                requests: std::iter::repeat_n(frame, requests).collect(),
                error,
                replies: 0,
                acks: 0,
            }
        }
    }

    impl RequestLink for FailingLink {
        async fn next_request(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
            Ok(self.requests.pop_front())
        }

        async fn reply(&mut self, _frame: &[u8]) -> Result<(), TransportError> {
            self.replies += 1;
            Err((self.error)())
        }

        async fn acknowledge(&mut self) -> Result<(), TransportError> {
            self.acks += 1;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_oversized_reply_fails_only_its_request() {
        let mut link = FailingLink::new(2, || TransportError::FrameTooLarge { len: 9, max: 8 });

        handle_requests(ConnectionId::next(), &mut link, &FramedCodec, &ToyGenerator::new())
            .await
            .unwrap();

        assert_eq!(link.replies, 2);
        assert_eq!(link.acks, 2);
    }

    #[tokio::test]
    async fn test_reply_timeout_fails_only_its_request() {
        let mut link = FailingLink::new(2, || TransportError::Timeout { operation: "send" });

        handle_requests(ConnectionId::next(), &mut link, &FramedCodec, &ToyGenerator::new())
            .await
            .unwrap();

        assert_eq!(link.replies, 2);
    }

    #[tokio::test]
    async fn test_broken_link_ends_the_session() {
        let mut link = FailingLink::new(2, || TransportError::ConnectionClosed("gone".into()));

        let result =
            handle_requests(ConnectionId::next(), &mut link, &FramedCodec, &ToyGenerator::new())
                .await;

        assert!(matches!(result, Err(TransportError::ConnectionClosed(_))));
        assert_eq!(link.replies, 1);
        assert_eq!(link.acks, 0);
    }
}
