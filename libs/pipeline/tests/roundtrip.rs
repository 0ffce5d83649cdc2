//! Conversion pipeline properties with a real runtime-resolved protobuf schema.

mod common;

use bridge_api::{ByteEncoding, DecodeRequest, EncodeRequest, ErrorKind, SchemaEncoding};
use pipeline::{DecodePipeline, EncodePipeline};

use common::event_schema;

fn decoder(wire: SchemaEncoding, convert: ByteEncoding) -> DecodePipeline {
    let schema = wire.needs_schema().then(event_schema);
    DecodePipeline::new(DecodeRequest { wire, convert }, schema).unwrap()
}

fn encoder() -> EncodePipeline {
    EncodePipeline::new(
        EncodeRequest {
            input_bytes: ByteEncoding::Raw,
            input_schema: SchemaEncoding::Text,
            output: SchemaEncoding::Binary,
        },
        Some(event_schema()),
    )
    .unwrap()
}

#[test]
fn text_survives_encode_then_decode() {
    let decode = decoder(SchemaEncoding::Binary, ByteEncoding::Raw);
    let encode = encoder();

    for text in [r#"{"name":"alice","id":7}"#, r#"{"name":"bob"}"#, r#"{"id":-3}"#, "{}"] {
        let wire = encode.encode_for_transmission(text.as_bytes().to_vec()).unwrap();
        let shown = decode.decode_for_display(wire).unwrap();
        assert_eq!(String::from_utf8(shown).unwrap(), text);
    }
}

#[test]
fn decode_is_pure_and_repeatable() {
    let decode = decoder(SchemaEncoding::Binary, ByteEncoding::Raw);
    let wire = encoder()
        .encode_for_transmission(br#"{"name":"same","id":1}"#.to_vec())
        .unwrap();

    let first = decode.decode_for_display(wire.clone()).unwrap();
    let second = decode.decode_for_display(wire.clone()).unwrap();
    let from_clone = decode.clone().decode_for_display(wire).unwrap();

    assert_eq!(first, second);
    assert_eq!(first, from_clone);
}

#[test]
fn empty_payload_boundaries() {
    let identity = decoder(SchemaEncoding::Raw, ByteEncoding::Raw);
    assert!(identity.decode_for_display(Vec::new()).unwrap().is_empty());

    let gzip = decoder(SchemaEncoding::Raw, ByteEncoding::Gzip);
    let err = gzip.decode_for_display(Vec::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conversion);

    // an empty protobuf body is a valid message with every field at its default
    let protobuf = decoder(SchemaEncoding::Binary, ByteEncoding::Raw);
    assert_eq!(protobuf.decode_for_display(Vec::new()).unwrap(), b"{}");
}

#[test]
fn malformed_protobuf_is_decode_error() {
    let decode = decoder(SchemaEncoding::Binary, ByteEncoding::Gzip);
    let err = decode.decode_for_display(vec![0x0a, 0xff, 0x01]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decode);
}
