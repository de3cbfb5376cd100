//! Every generation must carry the same logical messages and reject the
//! same malformed input.

use biomewire_protocol::{
    BiomeDataRequest, BiomeDataResponse, BiomeListEntry, BiomeListResponse, CreateWorldRequest,
    FramedCodec, HeaderField, JsonCodec, Message, MessageKind, ProtocolError, SbeCodec,
    WireCodec, WorldType,
};

fn codecs() -> Vec<Box<dyn WireCodec>> {
    vec![Box::new(FramedCodec), Box::new(JsonCodec), Box::new(SbeCodec)]
}

/// One representative of each message kind, with awkward values where
/// the wire format has edge cases.
fn contract_table() -> Vec<Message> {
    vec![
        Message::BiomeDataRequest(BiomeDataRequest::new(-1024, 2048, 64, 32, true).unwrap()),
        Message::BiomeDataResponse(BiomeDataResponse {
            data: vec![0, 1, 1, 24, -1, i32::MAX],
        }),
        Message::BiomeDataResponse(BiomeDataResponse { data: Vec::new() }),
        Message::CreateWorldRequest(CreateWorldRequest {
            seed: i64::MIN,
            world_type: WorldType::LargeBiomes,
            generator_options: r#"{"seaLevel":63,"name":"Höhle"}"#.into(),
        }),
        Message::BiomeListRequest,
        Message::BiomeListResponse(BiomeListResponse {
            biomes: vec![
                BiomeListEntry::new(0, "Ocean"),
                BiomeListEntry::new(1, "Plains"),
                BiomeListEntry::new(129, "Sunflower Plains"),
                BiomeListEntry::new(-3, ""),
            ],
        }),
    ]
}

#[test]
fn test_every_generation_carries_the_contract_table() {
    for codec in codecs() {
        for message in contract_table() {
            let bytes = codec.encode(&message).unwrap_or_else(|e| {
                panic!("{} failed to encode {:?}: {e}", codec.generation(), message.kind())
            });

            let header = codec.read_header(&bytes).unwrap();
            assert_eq!(header.schema_id, codec.schema_id());
            assert_eq!(header.template_id, message.kind().template_id());

            let decoded = codec.decode_expecting(&bytes, message.kind()).unwrap();
            assert_eq!(decoded, message, "{} changed the message", codec.generation());
        }
    }
}

#[test]
fn test_schema_ids_are_distinct() {
    let ids: Vec<u16> = codecs().iter().map(|c| c.schema_id()).collect();
    assert_eq!(ids, vec![0x0101, 0x0201, 0x0301]);
}

#[test]
fn test_flipping_schema_byte_is_protocol_mismatch() {
    for codec in codecs() {
        let mut bytes = codec.encode(&Message::BiomeListRequest).unwrap();
        bytes[0] ^= 0xff;

        assert!(
            matches!(
                codec.decode(&bytes),
                Err(ProtocolError::ProtocolMismatch {
                    field: HeaderField::SchemaId,
                    ..
                })
            ),
            "{} accepted a foreign schema",
            codec.generation()
        );
    }
}

#[test]
fn test_cross_generation_reply_is_rejected() {
    let json_reply = JsonCodec
        .encode(&Message::BiomeListResponse(BiomeListResponse::default()))
        .unwrap();

    for codec in [&FramedCodec as &dyn WireCodec, &SbeCodec] {
        let err = codec
            .decode_expecting(&json_reply, MessageKind::BiomeListResponse)
            .unwrap_err();
        assert!(err.is_incompatible_peer());
    }
}

#[test]
fn test_wrong_message_kind_is_rejected_before_parsing() {
    for codec in codecs() {
        let bytes = codec
            .encode(&Message::BiomeDataResponse(BiomeDataResponse { data: vec![1] }))
            .unwrap();

        let err = codec
            .decode_expecting(&bytes, MessageKind::BiomeListResponse)
            .unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::ProtocolMismatch {
                field: HeaderField::TemplateId,
                expected: 5,
                actual: 2,
            }
        ));
    }
}

#[test]
fn test_unknown_template_id_is_reported() {
    for codec in codecs() {
        let mut bytes = codec.encode(&Message::BiomeListRequest).unwrap();
        // Template id is the second u16 in every header.
        bytes[2] = 0x00;
        bytes[3] = 0x00;
        assert!(matches!(
            codec.decode(&bytes),
            Err(ProtocolError::UnknownMessageKind(0))
        ));
    }
}

#[test]
fn test_truncated_messages_fail_cleanly() {
    let message = Message::BiomeListResponse(BiomeListResponse {
        biomes: vec![BiomeListEntry::new(3, "Mountains")],
    });

    for codec in codecs() {
        let bytes = codec.encode(&message).unwrap();
        for len in 0..bytes.len() {
            assert!(
                codec.decode(&bytes[..len]).is_err(),
                "{} decoded a {len}-byte prefix",
                codec.generation()
            );
        }
    }
}
