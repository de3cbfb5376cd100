//! Wire protocol for biomewire.
//!
//! This crate defines what a client and a remote world generator say to
//! each other, independent of how the bytes travel:
//!
//! - **Types** ([`BiomeDataRequest`], [`BiomeListResponse`], [`Message`],
//!   etc.): the five logical messages.
//! - **Header** ([`MessageHeader`], [`MessageKind`]): the schema and
//!   template ids every message starts with.
//! - **Codecs** ([`WireCodec`] trait, [`FramedCodec`], [`JsonCodec`],
//!   [`SbeCodec`]): three generations of byte layout.
//! - **Guard** ([`VersionGuard`]): rejects replies from a peer that speaks
//!   a different generation, or that answered with the wrong message.
//!
//! ```text
//! Transport (bytes) → Protocol (Message) → Client (biome ids, registry)
//! ```

mod codec;
mod error;
mod guard;
mod header;
mod types;

#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use codec::{BiomeDataView, BiomeListView, FramedCodec, SbeCodec, WireCodec};
pub use error::ProtocolError;
pub use guard::VersionGuard;
pub use header::{HeaderField, MessageHeader, MessageKind};
pub use types::{
    BiomeDataRequest, BiomeDataResponse, BiomeId, BiomeListEntry, BiomeListResponse,
    CreateWorldRequest, Message, WorldType,
};
