//! Error types for the protocol layer.
//!
//! A `ProtocolError` always means the bytes themselves were at fault:
//! wrong schema, unknown message kind, or a payload that does not parse.
//! Connection problems live in the transport crate.

use crate::HeaderField;

/// Errors that can occur while encoding, validating, or decoding messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// JSON serialization failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// JSON deserialization failed: malformed body, missing fields, or
    /// wrong field types.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The header names a different schema, or a different message kind
    /// than the one the caller is waiting for.
    #[error("protocol mismatch: expected {field} {expected:#06x}, got {actual:#06x}")]
    ProtocolMismatch {
        field: HeaderField,
        expected: u16,
        actual: u16,
    },

    /// The template id is not one of the known message kinds.
    #[error("unknown message kind (template id {0})")]
    UnknownMessageKind(u16),

    /// The buffer ended before a field could be read.
    #[error("truncated message: needed {needed} bytes, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },

    /// A string field was not valid UTF-8.
    #[error("{field} is not valid UTF-8")]
    InvalidUtf8 { field: &'static str },

    /// A field is too long for its length prefix.
    #[error("{field} is {len} bytes, limit is {max}")]
    FieldTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    /// The message parsed but violates protocol rules.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}

impl ProtocolError {
    /// Returns `true` if the error means the peer speaks a different
    /// protocol, so nothing else it sends can be trusted.
    pub fn is_incompatible_peer(&self) -> bool {
        matches!(
            self,
            Self::ProtocolMismatch { .. } | Self::UnknownMessageKind(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mismatch_display_names_field_and_ids() {
        let err = ProtocolError::ProtocolMismatch {
            field: HeaderField::SchemaId,
            expected: 0x0301,
            actual: 0x0302,
        };
        assert_eq!(
            err.to_string(),
            "protocol mismatch: expected schema id 0x0301, got 0x0302"
        );
    }

    #[test]
    fn test_incompatible_peer_classification() {
        assert!(ProtocolError::UnknownMessageKind(99).is_incompatible_peer());
        assert!(
            !ProtocolError::Truncated {
                needed: 4,
                remaining: 0
            }
            .is_incompatible_peer()
        );
        assert!(
            !ProtocolError::InvalidMessage("bad".into()).is_incompatible_peer()
        );
    }
}
