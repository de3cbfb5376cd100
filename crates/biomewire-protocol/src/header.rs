//! The fixed header that precedes every message.
//!
//! ```text
//! ┌────────────┬──────────────┬───────────────┬───────────┐
//! │ schema id  │ template id  │ block length  │ version   │
//! │ u16        │ u16          │ u16           │ u16       │
//! └────────────┴──────────────┴───────────────┴───────────┘
//! ```
//!
//! Only the zero-copy generation carries block length and version; the
//! older generations send the first two fields and leave the rest zero.

use std::fmt;

use crate::ProtocolError;

/// The five message kinds and their template ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum MessageKind {
    BiomeDataRequest = 1,
    BiomeDataResponse = 2,
    CreateWorldRequest = 3,
    BiomeListRequest = 4,
    BiomeListResponse = 5,
}

impl MessageKind {
    pub const ALL: [MessageKind; 5] = [
        Self::BiomeDataRequest,
        Self::BiomeDataResponse,
        Self::CreateWorldRequest,
        Self::BiomeListRequest,
        Self::BiomeListResponse,
    ];

    pub fn template_id(self) -> u16 {
        self as u16
    }

    /// Returns `None` for ids that are not a known message kind.
    pub fn from_template_id(id: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.template_id() == id)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::BiomeDataRequest => "BiomeDataRequest",
            Self::BiomeDataResponse => "BiomeDataResponse",
            Self::CreateWorldRequest => "CreateWorldRequest",
            Self::BiomeListRequest => "BiomeListRequest",
            Self::BiomeListResponse => "BiomeListResponse",
        };
        f.write_str(name)
    }
}

/// Which header field a [`ProtocolError::ProtocolMismatch`] is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderField {
    SchemaId,
    TemplateId,
}

impl fmt::Display for HeaderField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SchemaId => f.write_str("schema id"),
            Self::TemplateId => f.write_str("template id"),
        }
    }
}

/// A decoded message header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    pub schema_id: u16,
    pub template_id: u16,
    pub block_length: u16,
    pub version: u16,
}

impl MessageHeader {
    /// Resolves the template id to a message kind.
    ///
    /// # Errors
    /// [`ProtocolError::UnknownMessageKind`] for unrecognised ids.
    pub fn kind(&self) -> Result<MessageKind, ProtocolError> {
        MessageKind::from_template_id(self.template_id)
            .ok_or(ProtocolError::UnknownMessageKind(self.template_id))
    }
}
