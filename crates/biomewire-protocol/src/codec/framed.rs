//! First generation: hand-framed big-endian binary.
//!
//! ```text
//! u16 schema | u16 template | body...
//! ```
//!
//! Strings are a `u16` byte length followed by UTF-8. Arrays are an `i32`
//! element count followed by the elements.

use bytes::{Buf, BufMut};

use super::{WireCodec, wire};
use crate::{
    BiomeDataRequest, BiomeDataResponse, BiomeId, BiomeListEntry, BiomeListResponse,
    CreateWorldRequest, Message, MessageHeader, MessageKind, ProtocolError, WorldType,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct FramedCodec;

impl FramedCodec {
    pub const SCHEMA_ID: u16 = 0x0101;
    pub const HEADER_LEN: usize = 4;
}

impl WireCodec for FramedCodec {
    fn generation(&self) -> &'static str {
        "framed"
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
        let mut out = Vec::with_capacity(Self::HEADER_LEN + 32);
        out.put_u16(Self::SCHEMA_ID);
        out.put_u16(message.kind().template_id());

        match message {
            Message::BiomeDataRequest(request) => {
                out.put_i32(request.x);
                out.put_i32(request.y);
                out.put_i32(request.width);
                out.put_i32(request.height);
                out.put_u8(u8::from(request.quarter_resolution));
            }
            Message::BiomeDataResponse(response) => {
                put_count(&mut out, response.data.len(), "biome data")?;
                out.reserve(response.data.len() * 4);
                for id in &response.data {
                    out.put_i32(*id);
                }
            }
            Message::CreateWorldRequest(request) => {
                out.put_i64(request.seed);
                put_str(&mut out, request.world_type.wire_name(), "world type")?;
                put_str(&mut out, &request.generator_options, "generator options")?;
            }
            Message::BiomeListRequest => {}
            Message::BiomeListResponse(response) => {
                put_count(&mut out, response.biomes.len(), "biome list")?;
                for entry in &response.biomes {
                    out.put_i32(entry.biome_id.0);
                    put_str(&mut out, &entry.biome_name, "biome name")?;
                }
            }
        }
        Ok(out)
    }

    fn decode(&self, data: &[u8]) -> Result<Message, ProtocolError> {
        let header = self.read_header(data)?;
        let kind = wire::check_schema(&header, Self::SCHEMA_ID)?;
        let mut buf = &data[Self::HEADER_LEN..];

        let message = match kind {
            MessageKind::BiomeDataRequest => {
                wire::ensure(buf, 17)?;
                Message::BiomeDataRequest(BiomeDataRequest {
                    x: buf.get_i32(),
                    y: buf.get_i32(),
                    width: buf.get_i32(),
                    height: buf.get_i32(),
                    quarter_resolution: buf.get_u8() != 0,
                })
            }
            MessageKind::BiomeDataResponse => {
                let count = get_count(&mut buf, "biome data")?;
                wire::ensure_array(buf, count, 4)?;
                let data = (0..count).map(|_| buf.get_i32()).collect();
                Message::BiomeDataResponse(BiomeDataResponse { data })
            }
            MessageKind::CreateWorldRequest => {
                wire::ensure(buf, 8)?;
                let seed = buf.get_i64();
                let world_type = WorldType::from_wire_name(get_str(&mut buf, "world type")?);
                let generator_options = get_str(&mut buf, "generator options")?.to_owned();
                Message::CreateWorldRequest(CreateWorldRequest {
                    seed,
                    world_type,
                    generator_options,
                })
            }
            MessageKind::BiomeListRequest => Message::BiomeListRequest,
            MessageKind::BiomeListResponse => {
                let count = get_count(&mut buf, "biome list")?;
                // Each entry is at least an id and an empty name.
                wire::ensure_array(buf, count, 6)?;
                let mut biomes = Vec::with_capacity(count);
                for _ in 0..count {
                    wire::ensure(buf, 4)?;
                    let biome_id = BiomeId(buf.get_i32());
                    let biome_name = get_str(&mut buf, "biome name")?.to_owned();
                    biomes.push(BiomeListEntry {
                        biome_id,
                        biome_name,
                    });
                }
                Message::BiomeListResponse(BiomeListResponse { biomes })
            }
        };

        if buf.has_remaining() {
            return Err(ProtocolError::InvalidMessage(format!(
                "{} trailing bytes after {kind}",
                buf.remaining()
            )));
        }
        Ok(message)
    }
}

fn put_count(out: &mut Vec<u8>, len: usize, field: &'static str) -> Result<(), ProtocolError> {
    let count = i32::try_from(len).map_err(|_| ProtocolError::FieldTooLong {
        field,
        len,
        max: i32::MAX as usize,
    })?;
    out.put_i32(count);
    Ok(())
}

fn put_str(out: &mut Vec<u8>, value: &str, field: &'static str) -> Result<(), ProtocolError> {
    let len = u16::try_from(value.len()).map_err(|_| ProtocolError::FieldTooLong {
        field,
        len: value.len(),
        max: u16::MAX as usize,
    })?;
    out.put_u16(len);
    out.put_slice(value.as_bytes());
    Ok(())
}

fn get_count(buf: &mut &[u8], field: &'static str) -> Result<usize, ProtocolError> {
    wire::ensure(buf, 4)?;
    let count = buf.get_i32();
    usize::try_from(count)
        .map_err(|_| ProtocolError::InvalidMessage(format!("negative {field} count {count}")))
}

fn get_str<'a>(buf: &mut &'a [u8], field: &'static str) -> Result<&'a str, ProtocolError> {
    wire::ensure(buf, 2)?;
    let len = usize::from(buf.get_u16());
    wire::utf8(wire::take(buf, len)?, field)
}
