// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Bit-exact layout checks that independent implementations must agree on.

use fory_wire::buffer::Writer;
use fory_wire::types::{STRING, VARINT32, VARINT64};
use fory_wire::{compute_struct_hash, FieldInfo, FieldType, Fory, TypeKey, Value};

fn point_fields() -> Vec<FieldInfo> {
    vec![
        FieldInfo::new("x", FieldType::new(VARINT32, false)),
        FieldInfo::new("y", FieldType::new(VARINT32, false)),
    ]
}

/// Registering `Point{x,y}` under id 100 in schema-consistent mode must
/// produce: ref flag 0, STRUCT type id, varint 100, the 4-byte structural
/// hash, then the two zigzag varints 0x06 and 0x08.
#[test]
fn point_wire_bytes() {
    let mut fory = Fory::default();
    fory.register_struct(100, "Point", point_fields()).unwrap();
    let bytes = fory
        .serialize(&Value::Struct {
            key: TypeKey::Id(100),
            fields: vec![Value::VarInt32(3), Value::VarInt32(4)],
        })
        .unwrap();

    assert_eq!(bytes.len(), 9);
    assert_eq!(bytes[0], 0); // RefValue
    assert_eq!(bytes[1], 27); // STRUCT
    assert_eq!(bytes[2], 100); // varint user type id
    let expected_hash = compute_struct_hash(&point_fields(), fory.is_track_ref());
    assert_eq!(bytes[3..7], expected_hash.to_le_bytes());
    assert_eq!(&bytes[7..], &[0x06, 0x08]); // zigzag(3), zigzag(4)
}

#[test]
fn null_root_is_a_single_flag_byte() {
    let fory = Fory::default();
    assert_eq!(fory.serialize(&Value::Null).unwrap(), vec![0xfd]); // -3
}

#[test]
fn untracked_primitive_root_layout() {
    let fory = Fory::default();
    let bytes = fory.serialize(&Value::VarInt32(-1)).unwrap();
    // NotNullValue flag, VARINT32 tag, zigzag(-1) = 1
    assert_eq!(bytes, vec![0xff, 5, 1]);
}

fn varint_payload_len(entries: usize) -> usize {
    let mut writer = Writer::default();
    for i in 0..entries {
        writer.write_varint32(i as i32);
        writer.write_varint64(i as i64);
    }
    writer.len()
}

/// A uniform map of 1000 entries costs O(1000/255) = 4 chunk headers, not
/// 1000 per-entry type tags.
#[test]
fn uniform_map_pays_four_chunk_headers() {
    let fory = Fory::default();
    let entries: Vec<(Value, Value)> = (0..1000)
        .map(|i| (Value::VarInt32(i), Value::VarInt64(i as i64)))
        .collect();
    let bytes = fory.serialize(&Value::Map(entries)).unwrap();

    // root flag + MAP tag + varuint count 1000 (2 bytes)
    let envelope = 1 + 1 + 2;
    // per chunk: header byte + size byte + key type tag + value type tag
    let chunk_overhead = 4 * 4;
    assert_eq!(
        bytes.len(),
        envelope + chunk_overhead + varint_payload_len(1000)
    );
}

#[test]
fn alternating_map_pays_per_entry_headers() {
    let fory = Fory::default();
    let uniform: Vec<(Value, Value)> = (0..1000)
        .map(|i| (Value::VarInt32(i), Value::VarInt64(i as i64)))
        .collect();
    let alternating: Vec<(Value, Value)> = (0..1000)
        .map(|i| {
            let value = if i % 2 == 0 {
                Value::VarInt64(i as i64)
            } else {
                Value::String("s".to_string())
            };
            (Value::VarInt32(i), value)
        })
        .collect();
    let uniform_len = fory.serialize(&Value::Map(uniform)).unwrap().len();
    let alternating_len = fory.serialize(&Value::Map(alternating)).unwrap().len();
    // every type flip starts a new chunk: ~1000 headers instead of 4
    assert!(alternating_len > uniform_len + 2500);
}

/// Two definitions differing only in declaration order hash identically;
/// wire order is canonical.
#[test]
fn hash_is_order_insensitive_across_instances() {
    let fields_a = vec![
        FieldInfo::new("name", FieldType::new(STRING, true)),
        FieldInfo::new("score", FieldType::new(VARINT64, false)),
    ];
    let fields_b = vec![
        FieldInfo::new("score", FieldType::new(VARINT64, false)),
        FieldInfo::new("name", FieldType::new(STRING, true)),
    ];
    assert_eq!(
        compute_struct_hash(&fields_a, true),
        compute_struct_hash(&fields_b, true)
    );

    let mut writer = Fory::default();
    writer.register_struct(70, "Scored", fields_a).unwrap();
    let mut reader = Fory::default();
    reader.register_struct(70, "Scored", fields_b).unwrap();
    let bytes = writer
        .serialize(&Value::Struct {
            key: TypeKey::Id(70),
            fields: vec![Value::String("n".to_string()), Value::VarInt64(12)],
        })
        .unwrap();
    let decoded = reader.deserialize(&bytes).unwrap();
    assert_eq!(
        decoded,
        Value::Struct {
            key: TypeKey::Id(70),
            fields: vec![Value::VarInt64(12), Value::String("n".to_string())],
        }
    );
}

#[test]
fn compatible_payload_reuses_meta_within_one_pass() {
    let mut fory = Fory::default().compatible(true);
    fory.register_struct(100, "Point", point_fields()).unwrap();
    let point = |x: i32| Value::Struct {
        key: TypeKey::Id(100),
        fields: vec![Value::VarInt32(x), Value::VarInt32(0)],
    };
    let one = fory.serialize(&Value::List(vec![point(1)])).unwrap();
    let three = fory
        .serialize(&Value::List(vec![point(1), point(1), point(1)]))
        .unwrap();
    // the TypeMeta blob is written once; the two extra points cost only
    // their field payloads (6 bytes each), far below a repeated meta blob
    let meta_free_cost = three.len() - one.len();
    assert_eq!(meta_free_cost, 12);
}
