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

use fory_wire::types::{FLOAT64, INT16, STRING, VARINT32, VARINT64};
use fory_wire::{FieldInfo, FieldType, Fory, TypeKey, Value};

fn round_trip(fory: &Fory, value: &Value) -> Value {
    let bytes = fory.serialize(value).unwrap();
    let decoded = fory.deserialize(&bytes).unwrap();
    assert_eq!(&decoded, value);
    decoded
}

#[test]
fn primitives() {
    let fory = Fory::default();
    round_trip(&fory, &Value::Bool(true));
    round_trip(&fory, &Value::Bool(false));
    round_trip(&fory, &Value::Int8(-120));
    round_trip(&fory, &Value::Int16(-30000));
    round_trip(&fory, &Value::Int32(i32::MIN));
    round_trip(&fory, &Value::VarInt32(i32::MAX));
    round_trip(&fory, &Value::Int64(i64::MIN));
    round_trip(&fory, &Value::VarInt64(i64::MAX));
    round_trip(&fory, &Value::Float32(1.25));
    round_trip(&fory, &Value::Float64(-2.5e300));
    round_trip(&fory, &Value::Null);
}

#[test]
fn strings_in_all_three_encodings() {
    let fory = Fory::default();
    round_trip(&fory, &Value::String(String::new()));
    round_trip(&fory, &Value::String("plain ascii".to_string()));
    // all code points <= 0xFF: Latin-1
    round_trip(&fory, &Value::String("déjà vu façade".to_string()));
    // BMP only: UTF-16
    round_trip(&fory, &Value::String("序列化协议".to_string()));
    // astral plane forces UTF-8
    round_trip(&fory, &Value::String("crab 🦀 and friends 🎉".to_string()));
}

#[test]
fn lists_and_sets() {
    let fory = Fory::default();
    round_trip(&fory, &Value::List(vec![]));
    round_trip(
        &fory,
        &Value::List(vec![
            Value::VarInt32(1),
            Value::VarInt32(2),
            Value::VarInt32(3),
        ]),
    );
    // a null makes the collection take the per-element path
    round_trip(
        &fory,
        &Value::List(vec![
            Value::String("a".to_string()),
            Value::Null,
            Value::String("b".to_string()),
        ]),
    );
    // mixed element types
    round_trip(
        &fory,
        &Value::List(vec![
            Value::VarInt32(1),
            Value::String("two".to_string()),
            Value::Float64(3.0),
        ]),
    );
    round_trip(
        &fory,
        &Value::Set(vec![
            Value::String("x".to_string()),
            Value::String("y".to_string()),
        ]),
    );
    // nested lists share only the outer LIST tag
    round_trip(
        &fory,
        &Value::List(vec![
            Value::List(vec![Value::VarInt32(1)]),
            Value::List(vec![Value::String("s".to_string())]),
        ]),
    );
}

#[test]
fn maps() {
    let fory = Fory::default();
    round_trip(&fory, &Value::Map(vec![]));
    round_trip(
        &fory,
        &Value::Map(vec![
            (Value::String("a".to_string()), Value::VarInt32(1)),
            (Value::String("b".to_string()), Value::VarInt32(2)),
        ]),
    );
    // null keys and values force single-entry chunks
    round_trip(
        &fory,
        &Value::Map(vec![
            (Value::String("k".to_string()), Value::Null),
            (Value::Null, Value::VarInt32(9)),
            (Value::Null, Value::Null),
            (Value::String("m".to_string()), Value::VarInt32(3)),
        ]),
    );
    // alternating value types split the chunks
    round_trip(
        &fory,
        &Value::Map(vec![
            (Value::VarInt32(1), Value::String("one".to_string())),
            (Value::VarInt32(2), Value::Float64(2.0)),
            (Value::VarInt32(3), Value::String("three".to_string())),
        ]),
    );
}

fn register_point(fory: &mut Fory) {
    fory.register_struct(
        100,
        "Point",
        vec![
            FieldInfo::new("x", FieldType::new(VARINT32, false)),
            FieldInfo::new("y", FieldType::new(VARINT32, false)),
        ],
    )
    .unwrap();
}

fn point(x: i32, y: i32) -> Value {
    Value::Struct {
        key: TypeKey::Id(100),
        fields: vec![Value::VarInt32(x), Value::VarInt32(y)],
    }
}

#[test]
fn struct_with_every_field_group() {
    let mut fory = Fory::default();
    register_point(&mut fory);
    fory.register_enum(20, "Color", &["green", "red", "blue"])
        .unwrap();
    fory.register_struct(
        101,
        "Sample",
        vec![
            FieldInfo::new("flag", FieldType::new(fory_wire::types::BOOL, false)),
            FieldInfo::new("small", FieldType::new(INT16, false)),
            FieldInfo::new("count", FieldType::new(VARINT32, false)),
            FieldInfo::new("total", FieldType::new(VARINT64, false)),
            FieldInfo::new("ratio", FieldType::new(FLOAT64, false)),
            FieldInfo::new("title", FieldType::new(STRING, false)),
            FieldInfo::new("note", FieldType::new(STRING, true)),
            FieldInfo::new(
                "tags",
                FieldType::list_of(FieldType::new(STRING, false), false),
            ),
            FieldInfo::new(
                "attrs",
                FieldType::map_of(
                    FieldType::new(STRING, false),
                    FieldType::new(VARINT32, false),
                    false,
                ),
            ),
            FieldInfo::new("origin", FieldType::struct_of(100, true)),
            FieldInfo::new("color", FieldType::enum_of(20, false)),
        ],
    )
    .unwrap();

    let sample = Value::Struct {
        key: TypeKey::Id(101),
        fields: vec![
            Value::Bool(true),
            Value::Int16(-7),
            Value::VarInt32(42),
            Value::VarInt64(1 << 40),
            Value::Float64(0.5),
            Value::String("hello".to_string()),
            Value::Null,
            Value::List(vec![
                Value::String("red".to_string()),
                Value::String("blue".to_string()),
            ]),
            Value::Map(vec![(Value::String("n".to_string()), Value::VarInt32(1))]),
            Value::Struct {
                key: TypeKey::Id(100),
                fields: vec![Value::VarInt32(3), Value::VarInt32(4)],
            },
            Value::Enum {
                key: TypeKey::Id(20),
                ordinal: 2,
            },
        ],
    };
    round_trip(&fory, &sample);

    // nullable nested struct set to null
    let mut fields = match &sample {
        Value::Struct { fields, .. } => fields.clone(),
        _ => unreachable!(),
    };
    fields[9] = Value::Null;
    round_trip(
        &fory,
        &Value::Struct {
            key: TypeKey::Id(101),
            fields,
        },
    );
}

#[test]
fn struct_round_trips_in_compatible_mode_too() {
    for compatible in [false, true] {
        let mut fory = Fory::default().compatible(compatible);
        register_point(&mut fory);
        round_trip(&fory, &point(-5, 1 << 20));
        // two values of the same type in one payload reuse the cached meta
        round_trip(&fory, &Value::List(vec![point(1, 2), point(3, 4)]));
    }
}

#[test]
fn named_struct_round_trips_in_both_modes() {
    for compatible in [false, true] {
        let mut fory = Fory::default().compatible(compatible);
        fory.register_struct_by_name(
            "geo",
            "Point",
            vec![
                FieldInfo::new("x", FieldType::new(VARINT32, false)),
                FieldInfo::new("y", FieldType::new(VARINT32, false)),
            ],
        )
        .unwrap();
        let value = Value::Struct {
            key: TypeKey::named("geo", "Point"),
            fields: vec![Value::VarInt32(8), Value::VarInt32(-9)],
        };
        round_trip(&fory, &value);
    }
}

#[test]
fn enums_by_id_and_name() {
    let mut fory = Fory::default();
    fory.register_enum(20, "Color", &["green", "red", "blue"])
        .unwrap();
    fory.register_enum_by_name("demo", "Weekday", &["mon", "tue", "wed"])
        .unwrap();
    round_trip(
        &fory,
        &Value::Enum {
            key: TypeKey::Id(20),
            ordinal: 2,
        },
    );
    round_trip(
        &fory,
        &Value::Enum {
            key: TypeKey::named("demo", "Weekday"),
            ordinal: 0,
        },
    );
}

#[test]
fn unions_carry_their_case_payload() {
    let mut fory = Fory::default();
    fory.register_union(
        30,
        "Scalar",
        vec![
            FieldType::new(VARINT32, false),
            FieldType::new(STRING, false),
        ],
    )
    .unwrap();
    round_trip(
        &fory,
        &Value::Union {
            key: TypeKey::Id(30),
            tag: 0,
            value: Box::new(Value::VarInt32(17)),
        },
    );
    round_trip(
        &fory,
        &Value::Union {
            key: TypeKey::Id(30),
            tag: 1,
            value: Box::new(Value::String("text".to_string())),
        },
    );
}

#[test]
fn ext_payloads_are_opaque_bytes() {
    let mut fory = Fory::default();
    fory.register_ext(40, "Blob").unwrap();
    round_trip(
        &fory,
        &Value::Ext {
            key: TypeKey::Id(40),
            data: vec![0, 1, 2, 254, 255],
        },
    );
    round_trip(
        &fory,
        &Value::Ext {
            key: TypeKey::Id(40),
            data: vec![],
        },
    );
}

#[test]
fn unknown_typed_field_accepts_any_value() {
    let mut fory = Fory::default();
    register_point(&mut fory);
    fory.register_struct(
        102,
        "Envelope",
        vec![FieldInfo::new("payload", FieldType::unknown())],
    )
    .unwrap();
    for payload in [
        Value::Null,
        Value::VarInt32(9),
        Value::String("anything".to_string()),
        Value::List(vec![Value::Bool(true), Value::Null]),
        point(1, 2),
    ] {
        round_trip(
            &fory,
            &Value::Struct {
                key: TypeKey::Id(102),
                fields: vec![payload],
            },
        );
    }
}

#[test]
fn homogeneous_struct_list_shares_one_type_info() {
    let mut fory = Fory::default();
    register_point(&mut fory);
    let uniform = fory
        .serialize(&Value::List(vec![point(1, 2), point(3, 4), point(5, 6)]))
        .unwrap();
    let mixed = fory
        .serialize(&Value::List(vec![
            point(1, 2),
            Value::String("x".to_string()),
            point(5, 6),
        ]))
        .unwrap();
    // the mixed list pays per-element flags and type tags
    let uniform_per_elem = uniform.len() as f64 / 3.0;
    let mixed_per_elem = mixed.len() as f64 / 3.0;
    assert!(uniform_per_elem < mixed_per_elem);
}
