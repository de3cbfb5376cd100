//! Header validation before a reply is trusted.

use crate::{HeaderField, MessageHeader, MessageKind, ProtocolError};

/// Checks that an incoming header belongs to this client's schema and
/// carries the message kind the client is waiting for.
///
/// The schema id is checked first. A reply from a server running another
/// generation therefore always reports the schema mismatch, even if its
/// template id also differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionGuard {
    schema_id: u16,
}

impl VersionGuard {
    pub fn new(schema_id: u16) -> Self {
        Self { schema_id }
    }

    pub fn schema_id(&self) -> u16 {
        self.schema_id
    }

    /// # Errors
    /// - [`ProtocolError::ProtocolMismatch`] with [`HeaderField::SchemaId`]
    ///   when the schema differs.
    /// - [`ProtocolError::UnknownMessageKind`] when the template id is not
    ///   a known kind.
    /// - [`ProtocolError::ProtocolMismatch`] with [`HeaderField::TemplateId`]
    ///   when it is a known kind but not `expected`.
    pub fn check(
        &self,
        header: &MessageHeader,
        expected: MessageKind,
    ) -> Result<(), ProtocolError> {
        if header.schema_id != self.schema_id {
            tracing::debug!(
                expected = self.schema_id,
                actual = header.schema_id,
                "rejecting message from foreign schema"
            );
            return Err(ProtocolError::ProtocolMismatch {
                field: HeaderField::SchemaId,
                expected: self.schema_id,
                actual: header.schema_id,
            });
        }

        let kind = header.kind()?;
        if kind != expected {
            tracing::debug!(%expected, actual = %kind, "rejecting unexpected message kind");
            return Err(ProtocolError::ProtocolMismatch {
                field: HeaderField::TemplateId,
                expected: expected.template_id(),
                actual: header.template_id,
            });
        }
        Ok(())
    }
}
