//! The [`WireCodec`] trait and its three generations.
//!
//! All three carry the same five messages; they differ only in how the
//! bytes are laid out. A client picks one codec for its lifetime and
//! both ends of a connection must agree on it: the schema id in every
//! header is how a mismatch is caught.
//!
//! | Generation | Codec           | Schema id | Header | Byte order |
//! |------------|-----------------|-----------|--------|------------|
//! | framed     | [`FramedCodec`] | `0x0101`  | 4 B    | big-endian |
//! | json       | [`JsonCodec`]   | `0x0201`  | 4 B    | big-endian |
//! | zero-copy  | [`SbeCodec`]    | `0x0301`  | 8 B    | little     |

mod framed;
#[cfg(feature = "json")]
mod json;
mod sbe;
mod wire;

pub use framed::FramedCodec;
#[cfg(feature = "json")]
pub use json::JsonCodec;
pub use sbe::{BiomeDataView, BiomeListView, SbeCodec};

use crate::{Message, MessageHeader, MessageKind, ProtocolError, VersionGuard};

/// Converts [`Message`]s to and from one wire generation.
///
/// - `Send + Sync + 'static` so a codec can live inside a client that is
///   moved between tasks.
/// - Codecs are stateless; every method takes `&self`.
pub trait WireCodec: Send + Sync + 'static {
    /// Short name used in logs and on the command line.
    fn generation(&self) -> &'static str;

    /// The schema id this codec stamps into every header.
    fn schema_id(&self) -> u16;

    /// Reads only the header, without looking at the body.
    ///
    /// # Errors
    /// [`ProtocolError::Truncated`] if `data` is shorter than a header.
    fn read_header(&self, data: &[u8]) -> Result<MessageHeader, ProtocolError>;

    /// Serializes a message, header included.
    ///
    /// # Errors
    /// [`ProtocolError::FieldTooLong`] if a string or array does not fit
    /// its length prefix.
    fn encode(&self, message: &Message) -> Result<Vec<u8>, ProtocolError>;

    /// Parses a full message. The schema id is checked; the message kind
    /// is whatever the header says.
    ///
    /// # Errors
    /// [`ProtocolError::ProtocolMismatch`] on a foreign schema,
    /// [`ProtocolError::UnknownMessageKind`] on an unknown template id,
    /// otherwise whatever body parsing reports.
    fn decode(&self, data: &[u8]) -> Result<Message, ProtocolError>;

    /// Validates the header against `expected` before decoding the body,
    /// so a wrong reply is rejected without being parsed.
    fn decode_expecting(
        &self,
        data: &[u8],
        expected: MessageKind,
    ) -> Result<Message, ProtocolError> {
        let header = self.read_header(data)?;
        VersionGuard::new(self.schema_id()).check(&header, expected)?;
        self.decode(data)
    }
}
