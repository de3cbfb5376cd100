//! Second generation: a binary header followed by a JSON body.
//!
//! The header is the same 4-byte big-endian schema/template pair as the
//! framed generation, so a peer can tell the two apart before it tries
//! to parse anything. The body is the message struct serialized with
//! `serde_json`, using the camelCase field names of the serde derives.

use bytes::{Buf, BufMut};
use serde::Serialize;

use super::{WireCodec, wire};
use crate::{Message, MessageHeader, MessageKind, ProtocolError};

/// JSON bodies are easy to inspect in a packet capture, at the cost of
/// size. Behind the `json` feature (enabled by default).
///
/// ```rust
/// use biomewire_protocol::{BiomeListEntry, BiomeListResponse, JsonCodec, Message, WireCodec};
///
/// let message = Message::BiomeListResponse(BiomeListResponse {
///     biomes: vec![BiomeListEntry::new(1, "Plains")],
/// });
/// let bytes = JsonCodec.encode(&message).unwrap();
/// assert_eq!(&bytes[4..], br#"{"biomes":[{"biomeId":1,"biomeName":"Plains"}]}"#);
/// assert_eq!(JsonCodec.decode(&bytes).unwrap(), message);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl JsonCodec {
    pub const SCHEMA_ID: u16 = 0x0201;
    pub const HEADER_LEN: usize = 4;
}

fn write_body<T: Serialize>(out: &mut Vec<u8>, body: &T) -> Result<(), ProtocolError> {
    serde_json::to_writer(out, body).map_err(ProtocolError::Encode)
}

impl WireCodec for JsonCodec {
    fn generation(&self) -> &'static str {
        "json"
    }

    fn schema_id(&self) -> u16 {
        Self::SCHEMA_ID
    }

    fn read_header(&self, data: &[u8]) -> Result<MessageHeader, ProtocolError> {
        wire::ensure(data, Self::HEADER_LEN)?;
        let mut buf = data;
        Ok(MessageHeader {
            schema_id: buf.get_u16(),
            template_id: buf.get_u16(),
            block_length: 0,
            version: 0,
        })
    }

    fn encode(&self, message: &Message) -> Result<Vec<u8>, ProtocolError> {
        let mut out = Vec::with_capacity(Self::HEADER_LEN + 64);
        out.put_u16(Self::SCHEMA_ID);
        out.put_u16(message.kind().template_id());

        match message {
            Message::BiomeDataRequest(request) => write_body(&mut out, request)?,
            Message::BiomeDataResponse(response) => write_body(&mut out, response)?,
            Message::CreateWorldRequest(request) => write_body(&mut out, request)?,
            Message::BiomeListRequest => out.put_slice(b"{}"),
            Message::BiomeListResponse(response) => write_body(&mut out, response)?,
        }
        Ok(out)
    }

    fn decode(&self, data: &[u8]) -> Result<Message, ProtocolError> {
        let header = self.read_header(data)?;
        let kind = wire::check_schema(&header, Self::SCHEMA_ID)?;
        let body = &data[Self::HEADER_LEN..];

        let message = match kind {
            MessageKind::BiomeDataRequest => Message::BiomeDataRequest(parse(body)?),
            MessageKind::BiomeDataResponse => Message::BiomeDataResponse(parse(body)?),
            MessageKind::CreateWorldRequest => Message::CreateWorldRequest(parse(body)?),
            MessageKind::BiomeListRequest => Message::BiomeListRequest,
            MessageKind::BiomeListResponse => Message::BiomeListResponse(parse(body)?),
        };
        Ok(message)
    }
}

fn parse<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T, ProtocolError> {
    serde_json::from_slice(body).map_err(ProtocolError::Decode)
}
