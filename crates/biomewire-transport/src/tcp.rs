//! Length-prefixed TCP transport (the ad-hoc socket generation).
//!
//! Frame layout on the socket:
//!
//! ```text
//! ┌──────────────┬────────────────────────┐
//! │ len: u32 BE  │ codec bytes (len)      │
//! └──────────────┴────────────────────────┘
//! ```
//!
//! Every request frame is answered by exactly one reply frame. A reply of
//! length zero is a bare acknowledgement.

use std::net::SocketAddr;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::{ConnectionId, Deadline, Transport, TransportError};

/// Largest frame either side may send (16 MiB).
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// A request/response transport over a single TCP stream.
pub struct TcpTransport {
    id: ConnectionId,
    endpoint: String,
    stream: Option<TcpStream>,
    pending: Option<Vec<u8>>,
}

impl TcpTransport {
    /// Connects to `endpoint`, which is either a bare port on the loopback
    /// interface or a `host:port` socket address.
    pub async fn connect(
        endpoint: &str,
        deadline: Deadline,
    ) -> Result<Self, TransportError> {
        let addr = parse_endpoint(endpoint)?;
        let stream = deadline
            .run("connect", async {
                TcpStream::connect(addr).await.map_err(|source| {
                    TransportError::ConnectFailed {
                        endpoint: endpoint.to_string(),
                        source,
                    }
                })
            })
            .await?;
        stream.set_nodelay(true).map_err(|source| {
            TransportError::ConnectFailed {
                endpoint: endpoint.to_string(),
                source,
            }
        })?;

        let id = ConnectionId::next();
        tracing::debug!(%id, %addr, "tcp transport connected");

        Ok(Self {
            id,
            endpoint: endpoint.to_string(),
            stream: Some(stream),
            pending: None,
        })
    }

    fn stream(&mut self) -> Result<&mut TcpStream, TransportError> {
        self.stream
            .as_mut()
            .ok_or_else(|| TransportError::closed("transport closed"))
    }
}

impl Transport for TcpTransport {
    async fn send(
        &mut self,
        frame: &[u8],
        deadline: Deadline,
    ) -> Result<(), TransportError> {
        if frame.len() > MAX_FRAME_LEN {
            return Err(TransportError::FrameTooLarge {
                len: frame.len(),
                max: MAX_FRAME_LEN,
            });
        }
        self.pending = None;
        let id = self.id;
        let stream = self.stream()?;

        let reply = deadline
            .run("send", async {
                write_frame(&mut *stream, frame).await?;
                read_frame(&mut *stream).await
            })
            .await?;

        tracing::trace!(%id, sent = frame.len(), reply = reply.len(), "tcp exchange");
        if !reply.is_empty() {
            self.pending = Some(reply);
        }
        Ok(())
    }

    async fn receive(
        &mut self,
        _deadline: Deadline,
    ) -> Result<Vec<u8>, TransportError> {
        self.stream()?;
        self.pending.take().ok_or(TransportError::NoResponse)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.pending = None;
        if let Some(mut stream) = self.stream.take() {
            // Peer may already be gone; nothing useful to do with the error.
            let _ = stream.shutdown().await;
            tracing::debug!(id = %self.id, "tcp transport closed");
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

/// Resolves an endpoint descriptor to a socket address.
fn parse_endpoint(endpoint: &str) -> Result<SocketAddr, TransportError> {
    let endpoint = endpoint.trim();
    if let Ok(port) = endpoint.parse::<u16>() {
        return Ok(SocketAddr::from(([127, 0, 0, 1], port)));
    }
    endpoint
        .parse()
        .map_err(|_| TransportError::InvalidEndpoint(endpoint.to_string()))
}

/// Writes one length-prefixed frame.
pub async fn write_frame<W>(
    writer: &mut W,
    frame: &[u8],
) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
{
    if frame.len() > MAX_FRAME_LEN {
        return Err(TransportError::FrameTooLarge {
            len: frame.len(),
            max: MAX_FRAME_LEN,
        });
    }
    let len = frame.len() as u32;
    writer
        .write_all(&len.to_be_bytes())
        .await
        .map_err(TransportError::SendFailed)?;
    writer
        .write_all(frame)
        .await
        .map_err(TransportError::SendFailed)?;
    writer.flush().await.map_err(TransportError::SendFailed)
}

/// Reads one length-prefixed frame.
pub async fn read_frame<R>(reader: &mut R) -> Result<Vec<u8>, TransportError>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            TransportError::closed("peer closed the socket")
        } else {
            TransportError::ReceiveFailed(e)
        }
    })?;
    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        return Err(TransportError::FrameTooLarge {
            len,
            max: MAX_FRAME_LEN,
        });
    }

    let mut frame = vec![0u8; len];
    reader
        .read_exact(&mut frame)
        .await
        .map_err(TransportError::ReceiveFailed)?;
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_port_maps_to_loopback() {
        let addr = parse_endpoint("25565").unwrap();
        assert_eq!(addr, "127.0.0.1:25565".parse().unwrap());
    }

    #[test]
    fn test_socket_address_is_accepted() {
        let addr = parse_endpoint("10.0.0.2:4000").unwrap();
        assert_eq!(addr.port(), 4000);
    }

    #[test]
    fn test_garbage_endpoint_is_rejected() {
        assert!(matches!(
            parse_endpoint("not an endpoint"),
            Err(TransportError::InvalidEndpoint(_))
        ));
    }

    #[tokio::test]
    async fn test_frame_round_trip_over_duplex() {
        let (mut a, mut b) = tokio::io::duplex(64);
        write_frame(&mut a, b"biomes").await.unwrap();
        let frame = read_frame(&mut b).await.unwrap();
        assert_eq!(frame, b"biomes");
    }

    #[tokio::test]
    async fn test_oversized_length_prefix_is_rejected() {
        let (mut a, mut b) = tokio::io::duplex(64);
        let len = (MAX_FRAME_LEN as u32 + 1).to_be_bytes();
        a.write_all(&len).await.unwrap();
        assert!(matches!(
            read_frame(&mut b).await,
            Err(TransportError::FrameTooLarge { .. })
        ));
    }

    #[tokio::test]
    async fn test_oversized_frame_is_not_written() {
        let (mut a, mut b) = tokio::io::duplex(64);
        let frame = vec![0u8; MAX_FRAME_LEN + 1];
        assert!(matches!(
            write_frame(&mut a, &frame).await,
            Err(TransportError::FrameTooLarge { .. })
        ));

        write_frame(&mut a, b"next").await.unwrap();
        assert_eq!(read_frame(&mut b).await.unwrap(), b"next");
    }

    #[tokio::test]
    async fn test_eof_reads_as_connection_closed() {
        let (a, mut b) = tokio::io::duplex(64);
        drop(a);
        assert!(matches!(
            read_frame(&mut b).await,
            Err(TransportError::ConnectionClosed(_))
        ));
    }
}
