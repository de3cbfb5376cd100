//! Transport abstraction layer for biomewire.
//!
//! Provides the [`Transport`] trait that moves encoded frames between a
//! client and a remote world generator. Three implementations exist, one
//! per wire generation:
//!
//! - [`TcpTransport`]: length-prefixed frames over a plain socket.
//!   Request/response.
//! - [`WebSocketTransport`]: one binary message per frame.
//!   Request/response.
//! - [`IpcTransport`]: fragmented publish/poll over an in-process
//!   [`IpcDriver`]. Sends retry while the stream is back-pressured, and
//!   receives reassemble fragments across polls.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod deadline;
mod error;
pub mod ipc;
mod tcp;
#[cfg(feature = "websocket")]
mod websocket;

pub use deadline::Deadline;
pub use error::TransportError;
pub use ipc::{IpcConfig, IpcDriver, IpcTransport};
pub use tcp::{MAX_FRAME_LEN, TcpTransport, read_frame, write_frame};
#[cfg(feature = "websocket")]
pub use websocket::WebSocketTransport;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Allocates the next process-unique id.
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A client-side channel to a remote world generator.
///
/// Transports are owned exclusively by one client, so every method takes
/// `&mut self` and no internal locking is needed.
pub trait Transport: Send + 'static {
    /// Completes any connection handshake.
    ///
    /// Defaults to a no-op for transports that are usable as soon as they
    /// are constructed.
    async fn handshake(
        &mut self,
        deadline: Deadline,
    ) -> Result<(), TransportError> {
        let _ = deadline;
        Ok(())
    }

    /// Sends one encoded frame.
    ///
    /// Request/response transports block here until the peer has replied;
    /// publish/poll transports block only while the stream is full.
    async fn send(
        &mut self,
        frame: &[u8],
        deadline: Deadline,
    ) -> Result<(), TransportError>;

    /// Returns the next complete frame from the peer.
    async fn receive(
        &mut self,
        deadline: Deadline,
    ) -> Result<Vec<u8>, TransportError>;

    /// Closes the transport. Further calls fail with
    /// [`TransportError::ConnectionClosed`].
    async fn close(&mut self) -> Result<(), TransportError>;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;

    /// The endpoint descriptor this transport was built from.
    fn endpoint(&self) -> &str;
}
