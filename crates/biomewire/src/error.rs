//! Unified error type for the biomewire client.

use std::fmt;

use biomewire_protocol::ProtocolError;
use biomewire_transport::TransportError;

/// The client operation an error happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Connect,
    BiomeDataFetch,
    WorldCreation,
    BiomeListSync,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connect => "connect",
            Self::BiomeDataFetch => "biome data fetch",
            Self::WorldCreation => "world creation",
            Self::BiomeListSync => "biome list sync",
        })
    }
}

/// Everything a [`RemoteWorldClient`](crate::RemoteWorldClient) call can
/// fail with.
///
/// Transport and codec errors never reach the caller directly; they are
/// classified into these variants. Fatal variants (see
/// [`is_fatal`](Self::is_fatal)) leave the client closed.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The connection could not be established.
    #[error("connecting to {endpoint} failed: {source}")]
    ConnectionFailed {
        endpoint: String,
        #[source]
        source: TransportError,
    },

    /// The connection failed mid-operation.
    #[error("{step} failed: {source}")]
    Transport {
        step: Step,
        #[source]
        source: TransportError,
    },

    /// The peer speaks a different schema, or answered with the wrong
    /// message kind.
    #[error("{step} failed: {source}")]
    ProtocolMismatch {
        step: Step,
        #[source]
        source: ProtocolError,
    },

    /// The deadline passed. A late reply would be read as the answer to the
    /// next request, so the channel cannot be reused.
    #[error("{step} timed out during {operation}")]
    Timeout { step: Step, operation: &'static str },

    /// A reply arrived in the right schema but its content is unusable.
    #[error("{step} got a malformed response: {reason}")]
    MalformedResponse { step: Step, reason: String },

    /// The world exists on the generator but its biome list never arrived.
    /// Retry with [`resync_biomes`](crate::RemoteWorldClient::resync_biomes)
    /// while the client is still ready.
    #[error("world created but biomes are unsynced: {source}")]
    WorldCreatedButBiomesUnsynced {
        #[source]
        source: Box<ClientError>,
    },

    /// The request was rejected before anything was sent.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The client was closed, by the caller or by an earlier fatal error.
    #[error("client is closed")]
    ClientClosed,
}

impl ClientError {
    /// Returns `true` if the error closes the client.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::ConnectionFailed { .. }
            | Self::Transport { .. }
            | Self::ProtocolMismatch { .. }
            | Self::Timeout { .. } => true,
            Self::WorldCreatedButBiomesUnsynced { source } => source.is_fatal(),
            Self::MalformedResponse { .. } | Self::InvalidRequest(_) | Self::ClientClosed => false,
        }
    }

    /// The step the error happened in, if it happened inside one.
    pub fn step(&self) -> Option<Step> {
        match self {
            Self::ConnectionFailed { .. } => Some(Step::Connect),
            Self::Transport { step, .. }
            | Self::ProtocolMismatch { step, .. }
            | Self::Timeout { step, .. }
            | Self::MalformedResponse { step, .. } => Some(*step),
            Self::WorldCreatedButBiomesUnsynced { .. } => Some(Step::WorldCreation),
            Self::InvalidRequest(_) | Self::ClientClosed => None,
        }
    }

    pub(crate) fn from_transport(step: Step, source: TransportError) -> Self {
        match source {
            TransportError::Timeout { operation } => Self::Timeout { step, operation },
            TransportError::NoResponse => Self::MalformedResponse {
                step,
                reason: "server acknowledged without a payload".to_string(),
            },
            source => Self::Transport { step, source },
        }
    }

    pub(crate) fn from_decode(step: Step, source: ProtocolError) -> Self {
        if source.is_incompatible_peer() {
            Self::ProtocolMismatch { step, source }
        } else {
            Self::MalformedResponse {
                step,
                reason: source.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use biomewire_protocol::HeaderField;

    #[test]
    fn test_transport_errors_are_fatal() {
        let err = ClientError::from_transport(
            Step::BiomeDataFetch,
            TransportError::ConnectionClosed("gone".into()),
        );
        assert!(err.is_fatal());
        assert_eq!(err.to_string(), "biome data fetch failed: connection closed: gone");
    }

    #[test]
    fn test_timeout_is_its_own_variant() {
        let err = ClientError::from_transport(
            Step::BiomeListSync,
            TransportError::Timeout { operation: "receive" },
        );
        assert!(matches!(
            err,
            ClientError::Timeout {
                step: Step::BiomeListSync,
                operation: "receive"
            }
        ));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_bare_ack_is_malformed_not_fatal() {
        let err = ClientError::from_transport(Step::BiomeDataFetch, TransportError::NoResponse);
        assert!(matches!(err, ClientError::MalformedResponse { .. }));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_decode_classification() {
        let mismatch = ClientError::from_decode(
            Step::BiomeDataFetch,
            ProtocolError::ProtocolMismatch {
                field: HeaderField::SchemaId,
                expected: 1,
                actual: 2,
            },
        );
        assert!(mismatch.is_fatal());

        let truncated = ClientError::from_decode(
            Step::BiomeDataFetch,
            ProtocolError::Truncated {
                needed: 4,
                remaining: 1,
            },
        );
        assert!(!truncated.is_fatal());
    }

    #[test]
    fn test_unsynced_inherits_fatality() {
        let recoverable = ClientError::WorldCreatedButBiomesUnsynced {
            source: Box::new(ClientError::MalformedResponse {
                step: Step::BiomeListSync,
                reason: "short".into(),
            }),
        };
        assert!(!recoverable.is_fatal());

        let fatal = ClientError::WorldCreatedButBiomesUnsynced {
            source: Box::new(ClientError::Timeout {
                step: Step::BiomeListSync,
                operation: "send",
            }),
        };
        assert!(fatal.is_fatal());
        assert_eq!(fatal.step(), Some(Step::WorldCreation));
    }
}
