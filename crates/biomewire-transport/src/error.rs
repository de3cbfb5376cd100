/// Errors that can occur in the transport layer.
///
/// Every variant is connection-level: once a transport has returned one of
/// these from `send` or `receive`, the channel is no longer trusted.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The endpoint descriptor could not be turned into an address.
    #[error("invalid endpoint {0:?}")]
    InvalidEndpoint(String),

    /// Establishing the connection failed.
    #[error("connect to {endpoint} failed: {source}")]
    ConnectFailed {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    /// The connection was closed.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// A frame exceeded the transport's size limit.
    #[error("frame of {len} bytes exceeds limit of {max} bytes")]
    FrameTooLarge { len: usize, max: usize },

    /// `receive` was called but the peer produced no payload for the
    /// last request (it only acknowledged it).
    #[error("no response pending")]
    NoResponse,

    /// The deadline passed before the operation completed.
    #[error("{operation} timed out")]
    Timeout { operation: &'static str },
}

impl TransportError {
    pub(crate) fn closed(reason: impl Into<String>) -> Self {
        Self::ConnectionClosed(reason.into())
    }
}
