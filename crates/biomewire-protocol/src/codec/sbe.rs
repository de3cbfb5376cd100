//! Third generation: fixed-layout little-endian messages that can be read
//! in place.
//!
//! ```text
//! header   u16 schema | u16 template | u16 blockLength | u16 version
//! root     blockLength bytes of fixed-width fields
//! groups   u16 entryBlockLength | u32 count | count * entry
//! varData  u32 length | bytes
//! ```
//!
//! Readers honour the sender's `blockLength` for the root block and for
//! each group entry, so a newer peer that appends fields to a block is
//! still readable. A shorter block than this side knows is rejected.
//!
//! Root blocks per message:
//!
//! | Message            | Root block                              | Then                                 |
//! |--------------------|-----------------------------------------|--------------------------------------|
//! | BiomeDataRequest   | x, y, width, height: i32; quarter: u8   |                                      |
//! | BiomeDataResponse  | (empty)                                 | group of `i32`                       |
//! | CreateWorldRequest | seed: i64                               | varData worldType, generatorOptions  |
//! | BiomeListRequest   | (empty)                                 |                                      |
//! | BiomeListResponse  | (empty)                                 | group of `i32` id + varData name     |

use bytes::{Buf, BufMut};

use super::{WireCodec, wire};
use crate::{
    BiomeDataRequest, BiomeDataResponse, BiomeId, BiomeListEntry, BiomeListResponse,
    CreateWorldRequest, HeaderField, Message, MessageHeader, MessageKind, ProtocolError,
    WorldType,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct SbeCodec;

impl SbeCodec {
    pub const SCHEMA_ID: u16 = 0x0301;
    pub const SCHEMA_VERSION: u16 = 1;
    pub const HEADER_LEN: usize = 8;

    const GROUP_HEADER_LEN: usize = 6;
    const ID_ENTRY_LEN: u16 = 4;

    /// Fixed root block length this side writes for each message.
    pub fn block_length(kind: MessageKind) -> u16 {
        match kind {
            MessageKind::BiomeDataRequest => 17,
            MessageKind::CreateWorldRequest => 8,
            MessageKind::BiomeDataResponse
            | MessageKind::BiomeListRequest
            | MessageKind::BiomeListResponse => 0,
        }
    }

    /// Reads a biome data response in place.
    ///
    /// # Errors
    /// [`ProtocolError::ProtocolMismatch`] if `data` is not a biome data
    /// response of this schema, or a truncation error.
    pub fn view_biome_data<'a>(&self, data: &'a [u8]) -> Result<BiomeDataView<'a>, ProtocolError> {
        let (_, _, mut rest) = self.split(data, Some(MessageKind::BiomeDataResponse))?;
        BiomeDataView::parse(&mut rest)
    }

    /// Reads a biome list response, borrowing the names from `data`.
    pub fn view_biome_list<'a>(&self, data: &'a [u8]) -> Result<BiomeListView<'a>, ProtocolError> {
        let (_, _, mut rest) = self.split(data, Some(MessageKind::BiomeListResponse))?;
        BiomeListView::parse(&mut rest)
    }

    /// Splits a message into its root block and whatever follows it.
    fn split<'a>(
        &self,
        data: &'a [u8],
        expected: Option<MessageKind>,
    ) -> Result<(MessageKind, RootBlock<'a>, &'a [u8]), ProtocolError> {
        let header = self.read_header(data)?;
        let kind = wire::check_schema(&header, Self::SCHEMA_ID)?;
        if let Some(expected) = expected {
            if kind != expected {
                return Err(ProtocolError::ProtocolMismatch {
                    field: HeaderField::TemplateId,
                    expected: expected.template_id(),
                    actual: kind.template_id(),
                });
            }
        }

        let known = usize::from(Self::block_length(kind));
        let acting = usize::from(header.block_length);
        if acting < known {
            return Err(ProtocolError::InvalidMessage(format!(
                "{kind} root block is {acting} bytes, need at least {known}"
            )));
        }

        let mut rest = &data[Self::HEADER_LEN..];
        let root = wire::take(&mut rest, acting)?;
        Ok((kind, RootBlock(root), rest))
    }
}

/// Root block bytes, already checked to be at least the known length.
struct RootBlock<'a>(&'a [u8]);

impl WireCodec for SbeCodec {
    fn generation(&self) -> &'static str {
        "zero-copy"
    }

    fn schema_id(&self) -> u16 {
        Self::SCHEMA_ID
    }

    fn read_header(&self, data: &[u8]) -> Result<MessageHeader, ProtocolError> {
        wire::ensure(data, Self::HEADER_LEN)?;
        let mut buf = data;
        Ok(MessageHeader {
            schema_id: buf.get_u16_le(),
            template_id: buf.get_u16_le(),
            block_length: buf.get_u16_le(),
            version: buf.get_u16_le(),
        })
    }

    fn encode(&self, message: &Message) -> Result<Vec<u8>, ProtocolError> {
        let kind = message.kind();
        let mut out = Vec::with_capacity(Self::HEADER_LEN + 32);
        out.put_u16_le(Self::SCHEMA_ID);
        out.put_u16_le(kind.template_id());
        out.put_u16_le(Self::block_length(kind));
        out.put_u16_le(Self::SCHEMA_VERSION);

        match message {
            Message::BiomeDataRequest(request) => {
                out.put_i32_le(request.x);
                out.put_i32_le(request.y);
                out.put_i32_le(request.width);
                out.put_i32_le(request.height);
                out.put_u8(u8::from(request.quarter_resolution));
            }
            Message::BiomeDataResponse(response) => {
                put_group_header(&mut out, Self::ID_ENTRY_LEN, response.data.len(), "biome data")?;
                out.reserve(response.data.len() * 4);
                for id in &response.data {
                    out.put_i32_le(*id);
                }
            }
            Message::CreateWorldRequest(request) => {
                out.put_i64_le(request.seed);
                put_var_data(&mut out, request.world_type.wire_name(), "world type")?;
                put_var_data(&mut out, &request.generator_options, "generator options")?;
            }
            Message::BiomeListRequest => {}
            Message::BiomeListResponse(response) => {
                put_group_header(
                    &mut out,
                    Self::ID_ENTRY_LEN,
                    response.biomes.len(),
                    "biome list",
                )?;
                for entry in &response.biomes {
                    out.put_i32_le(entry.biome_id.0);
                    put_var_data(&mut out, &entry.biome_name, "biome name")?;
                }
            }
        }
        Ok(out)
    }

    fn decode(&self, data: &[u8]) -> Result<Message, ProtocolError> {
        let (kind, RootBlock(mut root), mut rest) = self.split(data, None)?;

        let message = match kind {
            MessageKind::BiomeDataRequest => Message::BiomeDataRequest(BiomeDataRequest {
                x: root.get_i32_le(),
                y: root.get_i32_le(),
                width: root.get_i32_le(),
                height: root.get_i32_le(),
                quarter_resolution: root.get_u8() != 0,
            }),
            MessageKind::BiomeDataResponse => {
                let view = BiomeDataView::parse(&mut rest)?;
                Message::BiomeDataResponse(BiomeDataResponse {
                    data: view.to_vec(),
                })
            }
            MessageKind::CreateWorldRequest => {
                let seed = root.get_i64_le();
                let world_type = WorldType::from_wire_name(get_var_data(&mut rest, "world type")?);
                let generator_options = get_var_data(&mut rest, "generator options")?.to_owned();
                Message::CreateWorldRequest(CreateWorldRequest {
                    seed,
                    world_type,
                    generator_options,
                })
            }
            MessageKind::BiomeListRequest => Message::BiomeListRequest,
            MessageKind::BiomeListResponse => {
                let view = BiomeListView::parse(&mut rest)?;
                Message::BiomeListResponse(view.to_response())
            }
        };
        Ok(message)
    }
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// Biome ids read straight out of a received buffer.
#[derive(Debug, Clone, Copy)]
pub struct BiomeDataView<'a> {
    entries: &'a [u8],
    stride: usize,
    len: usize,
}

impl<'a> BiomeDataView<'a> {
    fn parse(buf: &mut &'a [u8]) -> Result<Self, ProtocolError> {
        let (stride, len) = get_group_header(buf, SbeCodec::ID_ENTRY_LEN, "biome data")?;
        wire::ensure_array(buf, len, stride)?;
        let entries = wire::take(buf, stride * len)?;
        Ok(Self {
            entries,
            stride,
            len,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, index: usize) -> Option<i32> {
        if index >= self.len {
            return None;
        }
        let start = index * self.stride;
        let bytes = self.entries.get(start..start + 4)?;
        Some(i32::from_le_bytes(bytes.try_into().ok()?))
    }

    pub fn iter(&self) -> impl Iterator<Item = i32> + 'a {
        let view = *self;
        (0..view.len).filter_map(move |index| view.get(index))
    }

    pub fn to_vec(&self) -> Vec<i32> {
        self.iter().collect()
    }
}

/// A biome list whose names borrow from the received buffer.
///
/// Variable-length names rule out random access, so the entries are
/// indexed once on construction.
#[derive(Debug, Clone)]
pub struct BiomeListView<'a> {
    entries: Vec<(BiomeId, &'a str)>,
}

impl<'a> BiomeListView<'a> {
    fn parse(buf: &mut &'a [u8]) -> Result<Self, ProtocolError> {
        let (stride, len) = get_group_header(buf, SbeCodec::ID_ENTRY_LEN, "biome list")?;
        // Each entry is its block plus at least an empty name.
        wire::ensure_array(buf, len, stride + 4)?;
        let mut entries = Vec::with_capacity(len);
        for _ in 0..len {
            let mut block = wire::take(buf, stride)?;
            let id = BiomeId(block.get_i32_le());
            let name = get_var_data(buf, "biome name")?;
            entries.push((id, name));
        }
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BiomeId, &'a str)> + '_ {
        self.entries.iter().copied()
    }

    pub fn to_response(&self) -> BiomeListResponse {
        BiomeListResponse {
            biomes: self
                .entries
                .iter()
                .map(|(id, name)| BiomeListEntry {
                    biome_id: *id,
                    biome_name: (*name).to_owned(),
                })
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

fn put_group_header(
    out: &mut Vec<u8>,
    entry_len: u16,
    count: usize,
    field: &'static str,
) -> Result<(), ProtocolError> {
    let count32 = u32::try_from(count).map_err(|_| ProtocolError::FieldTooLong {
        field,
        len: count,
        max: u32::MAX as usize,
    })?;
    out.put_u16_le(entry_len);
    out.put_u32_le(count32);
    Ok(())
}

fn get_group_header(
    buf: &mut &[u8],
    min_entry_len: u16,
    field: &'static str,
) -> Result<(usize, usize), ProtocolError> {
    wire::ensure(buf, SbeCodec::GROUP_HEADER_LEN)?;
    let entry_len = buf.get_u16_le();
    let count = buf.get_u32_le() as usize;
    if entry_len < min_entry_len {
        return Err(ProtocolError::InvalidMessage(format!(
            "{field} entries are {entry_len} bytes, need at least {min_entry_len}"
        )));
    }
    Ok((usize::from(entry_len), count))
}

fn put_var_data(out: &mut Vec<u8>, value: &str, field: &'static str) -> Result<(), ProtocolError> {
    let len = u32::try_from(value.len()).map_err(|_| ProtocolError::FieldTooLong {
        field,
        len: value.len(),
        max: u32::MAX as usize,
    })?;
    out.put_u32_le(len);
    out.put_slice(value.as_bytes());
    Ok(())
}

fn get_var_data<'a>(buf: &mut &'a [u8], field: &'static str) -> Result<&'a str, ProtocolError> {
    wire::ensure(buf, 4)?;
    let len = buf.get_u32_le() as usize;
    wire::utf8(wire::take(buf, len)?, field)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn biome_list() -> Message {
        Message::BiomeListResponse(BiomeListResponse {
            biomes: vec![
                BiomeListEntry::new(0, "Ocean"),
                BiomeListEntry::new(1, "Plains"),
                BiomeListEntry::new(2, "Desert"),
            ],
        })
    }

    #[test]
    fn test_header_is_little_endian_with_version() {
        let bytes = SbeCodec.encode(&Message::BiomeListRequest).unwrap();
        assert_eq!(bytes, vec![0x01, 0x03, 0x04, 0x00, 0x00, 0x00, 0x01, 0x00]);

        let header = SbeCodec.read_header(&bytes).unwrap();
        assert_eq!(header.schema_id, SbeCodec::SCHEMA_ID);
        assert_eq!(header.version, SbeCodec::SCHEMA_VERSION);
    }

    #[test]
    fn test_biome_data_view_reads_in_place() {
        let message = Message::BiomeDataResponse(BiomeDataResponse {
            data: vec![4, 4, 7, -1],
        });
        let bytes = SbeCodec.encode(&message).unwrap();

        let view = SbeCodec.view_biome_data(&bytes).unwrap();
        assert_eq!(view.len(), 4);
        assert_eq!(view.get(2), Some(7));
        assert_eq!(view.get(4), None);
        assert_eq!(view.iter().collect::<Vec<_>>(), vec![4, 4, 7, -1]);
    }

    #[test]
    fn test_biome_list_view_borrows_names() {
        let bytes = SbeCodec.encode(&biome_list()).unwrap();
        let view = SbeCodec.view_biome_list(&bytes).unwrap();

        let names: Vec<&str> = view.iter().map(|(_, name)| name).collect();
        assert_eq!(names, vec!["Ocean", "Plains", "Desert"]);
        assert_eq!(Message::BiomeListResponse(view.to_response()), biome_list());
    }

    #[test]
    fn test_view_of_wrong_message_is_mismatch() {
        let bytes = SbeCodec.encode(&biome_list()).unwrap();
        assert!(matches!(
            SbeCodec.view_biome_data(&bytes),
            Err(ProtocolError::ProtocolMismatch {
                field: HeaderField::TemplateId,
                expected: 2,
                actual: 5,
            })
        ));
    }

    #[test]
    fn test_longer_root_block_from_newer_peer_is_honoured() {
        let request = BiomeDataRequest::new(1, 2, 3, 4, true).unwrap();
        let mut bytes = SbeCodec.encode(&request.into()).unwrap();
        // Pretend the sender appended a 3-byte field to the root block.
        bytes[4] = 20;
        bytes.extend_from_slice(&[9, 9, 9]);

        assert_eq!(
            SbeCodec.decode(&bytes).unwrap(),
            Message::BiomeDataRequest(request)
        );
    }

    #[test]
    fn test_wider_group_entries_are_skipped_correctly() {
        // Hand-built response with 6-byte entries: i32 id + 2 unknown bytes.
        let mut bytes = vec![0x01, 0x03, 0x02, 0x00, 0x00, 0x00, 0x01, 0x00];
        bytes.extend_from_slice(&6u16.to_le_bytes());
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(&[10, 0, 0, 0, 0xaa, 0xbb]);
        bytes.extend_from_slice(&[20, 0, 0, 0, 0xaa, 0xbb]);

        let view = SbeCodec.view_biome_data(&bytes).unwrap();
        assert_eq!(view.to_vec(), vec![10, 20]);
    }

    #[test]
    fn test_short_root_block_is_rejected() {
        let request = BiomeDataRequest::new(1, 2, 3, 4, false).unwrap();
        let mut bytes = SbeCodec.encode(&request.into()).unwrap();
        bytes[4] = 16;
        assert!(matches!(
            SbeCodec.decode(&bytes),
            Err(ProtocolError::InvalidMessage(_))
        ));
    }

    #[test]
    fn test_truncated_group_is_rejected() {
        let mut bytes = SbeCodec
            .encode(&Message::BiomeDataResponse(BiomeDataResponse {
                data: vec![1, 2, 3],
            }))
            .unwrap();
        bytes.truncate(bytes.len() - 2);
        assert!(matches!(
            SbeCodec.decode(&bytes),
            Err(ProtocolError::Truncated { .. })
        ));
    }
}
