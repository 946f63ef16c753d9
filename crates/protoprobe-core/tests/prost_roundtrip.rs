//! Round trips through prost-encoded messages.
//!
//! prost's derive acts as the reference encoder; every value it writes must
//! come back out of the decoder unchanged.

use pretty_assertions::assert_eq;
use prost::Message;
use protoprobe_core::{
    DecodedMessage, DecodedValue, Decoder, MessageDefinition, SchemaLoader, SchemaRegistry,
};
use std::collections::HashMap;

const GEOMETRY: &str = r#"syntax = "proto2";

message Point {
  required int32 x = 1;
  required int32 y = 2;
}
"#;

const SAMPLE: &str = r#"syntax = "proto2";
import "geometry.proto";

// everything the decoder understands, in one message
message Sample {
  required int32 id = 1;
  required string name = 2;
  repeated int32 tags = 3;
  optional Point origin = 4;
  repeated Point path = 5;
  optional double ratio = 6;
  optional float scale = 7;
  optional sfixed64 stamp = 8;
  optional fixed32 mask = 9;
  optional sfixed32 delta = 10;
  optional bool flag = 11;
  optional uint64 big = 12;
  optional bytes blob = 13;
}
"#;

#[derive(Clone, PartialEq, Message)]
struct Point {
    #[prost(int32, required, tag = "1")]
    x: i32,
    #[prost(int32, required, tag = "2")]
    y: i32,
}

#[derive(Clone, PartialEq, Message)]
struct Sample {
    #[prost(int32, required, tag = "1")]
    id: i32,
    #[prost(string, required, tag = "2")]
    name: String,
    #[prost(int32, repeated, packed = "false", tag = "3")]
    tags: Vec<i32>,
    #[prost(message, optional, tag = "4")]
    origin: Option<Point>,
    #[prost(message, repeated, tag = "5")]
    path: Vec<Point>,
    #[prost(double, optional, tag = "6")]
    ratio: Option<f64>,
    #[prost(float, optional, tag = "7")]
    scale: Option<f32>,
    #[prost(sfixed64, optional, tag = "8")]
    stamp: Option<i64>,
    #[prost(fixed32, optional, tag = "9")]
    mask: Option<u32>,
    #[prost(sfixed32, optional, tag = "10")]
    delta: Option<i32>,
    #[prost(bool, optional, tag = "11")]
    flag: Option<bool>,
    #[prost(uint64, optional, tag = "12")]
    big: Option<u64>,
    #[prost(bytes = "vec", optional, tag = "13")]
    blob: Option<Vec<u8>>,
}

/// Same field numbers as `Point`, but `y` may be left out
#[derive(Clone, PartialEq, Message)]
struct PartialPoint {
    #[prost(int32, required, tag = "1")]
    x: i32,
    #[prost(int32, optional, tag = "2")]
    y: Option<i32>,
}

/// `Point` plus a field the schema does not know
#[derive(Clone, PartialEq, Message)]
struct Point3 {
    #[prost(int32, required, tag = "1")]
    x: i32,
    #[prost(int32, required, tag = "2")]
    y: i32,
    #[prost(int32, required, tag = "3")]
    z: i32,
}

fn registry() -> (SchemaRegistry, MessageDefinition) {
    let imports = HashMap::from([("geometry.proto".to_string(), GEOMETRY.to_string())]);
    let mut registry = SchemaRegistry::new();
    let sample = SchemaLoader::new(imports).load(SAMPLE, &mut registry).unwrap();
    (registry, sample)
}

fn int(message: &DecodedMessage, number: u32) -> Option<i64> {
    message.values(number).first().and_then(DecodedValue::as_int)
}

fn point(message: &DecodedMessage) -> Point {
    Point {
        x: int(message, 1).unwrap() as i32,
        y: int(message, 2).unwrap() as i32,
    }
}

/// Rebuilds the prost struct from the decoded tree
fn rebuild(message: &DecodedMessage) -> Sample {
    Sample {
        id: int(message, 1).unwrap() as i32,
        name: message.values(2)[0].as_text().unwrap().to_string(),
        tags: message
            .values(3)
            .iter()
            .map(|v| v.as_int().unwrap() as i32)
            .collect(),
        origin: message.messages(4).next().map(point),
        path: message.messages(5).map(point).collect(),
        ratio: message.values(6).first().and_then(DecodedValue::as_double),
        scale: message.values(7).first().and_then(DecodedValue::as_float),
        stamp: int(message, 8),
        mask: int(message, 9).map(|v| v as u32),
        delta: int(message, 10).map(|v| v as i32),
        flag: int(message, 11).map(|v| v != 0),
        big: int(message, 12).map(|v| v as u64),
        blob: message
            .values(13)
            .first()
            .and_then(DecodedValue::as_bytes)
            .map(<[u8]>::to_vec),
    }
}

#[test]
fn test_full_sample_round_trip() {
    let (registry, definition) = registry();
    let sample = Sample {
        id: -42,
        name: "river crossing".into(),
        tags: vec![3, 1, 4, 1, 5],
        origin: Some(Point { x: 2, y: 4 }),
        path: vec![Point { x: -1, y: 0 }, Point { x: 300, y: 70000 }],
        ratio: Some(0.125),
        scale: Some(-3.5),
        stamp: Some(-1_700_000_000_000),
        mask: Some(0xDEAD_BEEF),
        delta: Some(-12),
        flag: Some(true),
        big: Some(u64::MAX - 1),
        blob: Some(vec![0, 1, 2, 0xFF]),
    };

    let decoded = Decoder::new(&registry)
        .decode_bytes(&definition, &sample.encode_to_vec())
        .expect("prost output decodes");

    assert!(decoded.is_filled());
    assert_eq!(rebuild(&decoded), sample);
}

#[test]
fn test_required_only_round_trip() {
    let (registry, definition) = registry();
    let sample = Sample {
        id: 7,
        name: String::new(),
        ..Default::default()
    };

    let decoded = Decoder::new(&registry)
        .decode_bytes(&definition, &sample.encode_to_vec())
        .unwrap();
    assert_eq!(rebuild(&decoded), sample);
}

#[test]
fn test_scenario_point() {
    let (registry, _) = registry();
    let point_def = registry.get("Point").unwrap();

    let bytes = Point { x: 2, y: 4 }.encode_to_vec();
    assert_eq!(bytes, vec![0x08, 0x02, 0x10, 0x04]);

    let decoded = Decoder::new(&registry).decode_bytes(point_def, &bytes).unwrap();
    assert_eq!(point(&decoded), Point { x: 2, y: 4 });
}

#[test]
fn test_missing_required_rejected() {
    let (registry, _) = registry();
    let point_def = registry.get("Point").unwrap();

    let bytes = PartialPoint { x: 2, y: None }.encode_to_vec();
    assert_eq!(bytes, vec![0x08, 0x02]);
    assert!(Decoder::new(&registry).decode_bytes(point_def, &bytes).is_none());
}

#[test]
fn test_undeclared_field_rejected() {
    let (registry, _) = registry();
    let point_def = registry.get("Point").unwrap();

    let bytes = Point3 { x: 1, y: 2, z: 3 }.encode_to_vec();
    assert!(Decoder::new(&registry).decode_bytes(point_def, &bytes).is_none());
}

#[test]
fn test_sample_does_not_match_point() {
    let (registry, _) = registry();
    let point_def = registry.get("Point").unwrap();

    let sample = Sample {
        id: 1,
        name: "x".into(),
        ..Default::default()
    };
    assert!(Decoder::new(&registry)
        .decode_bytes(point_def, &sample.encode_to_vec())
        .is_none());
}
