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

//! Compatible-mode schema drift: peers may add, remove and reorder struct
//! fields independently.

use fory_wire::types::{INT32, STRING, VARINT32};
use fory_wire::{Error, FieldInfo, FieldType, Fory, TypeKey, Value};

fn v1_fory() -> Fory {
    let mut fory = Fory::default().compatible(true);
    fory.register_struct(
        10,
        "Person",
        vec![
            FieldInfo::new("name", FieldType::new(STRING, true)),
            FieldInfo::new("age", FieldType::new(VARINT32, false)),
        ],
    )
    .unwrap();
    fory
}

fn v2_fory() -> Fory {
    let mut fory = Fory::default().compatible(true);
    fory.register_struct(
        10,
        "Person",
        vec![
            FieldInfo::new("name", FieldType::new(STRING, true)),
            FieldInfo::new("age", FieldType::new(VARINT32, false)),
            FieldInfo::new("email", FieldType::new(STRING, true)),
        ],
    )
    .unwrap();
    fory
}

fn v1_person(name: &str, age: i32) -> Value {
    Value::Struct {
        key: TypeKey::Id(10),
        fields: vec![Value::String(name.to_string()), Value::VarInt32(age)],
    }
}

#[test]
fn reader_with_extra_fields_gets_defaults() {
    let bytes = v1_fory().serialize(&v1_person("ada", 36)).unwrap();
    let decoded = v2_fory().deserialize(&bytes).unwrap();
    let expected = Value::Struct {
        key: TypeKey::Id(10),
        fields: vec![
            Value::String("ada".to_string()),
            Value::VarInt32(36),
            // absent from the writer's schema: zero value
            Value::Null,
        ],
    };
    assert_eq!(decoded, expected);
}

#[test]
fn unknown_remote_fields_are_skipped_and_dropped_on_reencode() {
    let v2 = v2_fory();
    let person = Value::Struct {
        key: TypeKey::Id(10),
        fields: vec![
            Value::String("ada".to_string()),
            Value::VarInt32(36),
            Value::String("ada@example.com".to_string()),
        ],
    };
    let bytes = v2.serialize(&person).unwrap();

    let v1 = v1_fory();
    let decoded = v1.deserialize(&bytes).unwrap();
    assert_eq!(decoded, v1_person("ada", 36));

    // re-encoding the decoded value no longer carries the email field
    let reencoded = v1.serialize(&decoded).unwrap();
    assert_eq!(v1.deserialize(&reencoded).unwrap(), v1_person("ada", 36));
    let back_in_v2 = v2.deserialize(&reencoded).unwrap();
    let expected = Value::Struct {
        key: TypeKey::Id(10),
        fields: vec![
            Value::String("ada".to_string()),
            Value::VarInt32(36),
            Value::Null,
        ],
    };
    assert_eq!(back_in_v2, expected);
}

#[test]
fn declaration_order_does_not_matter() {
    let mut writer = Fory::default().compatible(true);
    writer
        .register_struct(
            11,
            "Pair",
            vec![
                FieldInfo::new("left", FieldType::new(VARINT32, false)),
                FieldInfo::new("right", FieldType::new(STRING, false)),
            ],
        )
        .unwrap();
    let mut reader = Fory::default().compatible(true);
    reader
        .register_struct(
            11,
            "Pair",
            vec![
                FieldInfo::new("right", FieldType::new(STRING, false)),
                FieldInfo::new("left", FieldType::new(VARINT32, false)),
            ],
        )
        .unwrap();

    let bytes = writer
        .serialize(&Value::Struct {
            key: TypeKey::Id(11),
            fields: vec![Value::VarInt32(1), Value::String("r".to_string())],
        })
        .unwrap();
    let decoded = reader.deserialize(&bytes).unwrap();
    // the reader's declaration order wins in the decoded value
    assert_eq!(
        decoded,
        Value::Struct {
            key: TypeKey::Id(11),
            fields: vec![Value::String("r".to_string()), Value::VarInt32(1)],
        }
    );
}

#[test]
fn unregistered_struct_degrades_to_placeholder() {
    let bytes = v1_fory().serialize(&v1_person("grace", 45)).unwrap();
    let bare = Fory::default().compatible(true);
    let decoded = bare.deserialize(&bytes).unwrap();
    // field data is preserved in the writer's wire order even though the
    // type was never registered here
    let Value::Ref(rc) = decoded else {
        panic!("expected a tracked struct value");
    };
    let inner = rc.borrow();
    let Value::Struct { key, fields } = &*inner else {
        panic!("expected a struct placeholder, got {inner:?}");
    };
    assert_eq!(*key, TypeKey::Id(10));
    assert_eq!(fields.len(), 2);
    assert!(fields.contains(&Value::VarInt32(45)));
    assert!(fields.contains(&Value::String("grace".to_string())));
}

#[test]
fn unknown_enum_degrades_to_placeholder_in_compatible_mode() {
    let mut writer = Fory::default().compatible(true);
    writer.register_enum(21, "Color", &["green", "red"]).unwrap();
    let bytes = writer
        .serialize(&Value::Enum {
            key: TypeKey::Id(21),
            ordinal: 1,
        })
        .unwrap();
    let bare = Fory::default().compatible(true);
    let decoded = bare.deserialize(&bytes).unwrap();
    assert_eq!(
        decoded,
        Value::Enum {
            key: TypeKey::Id(21),
            ordinal: 1,
        }
    );
}

#[test]
fn int_width_change_is_coerced() {
    let mut writer = Fory::default().compatible(true);
    writer
        .register_struct(
            12,
            "Counter",
            vec![FieldInfo::new("n", FieldType::new(INT32, false))],
        )
        .unwrap();
    let mut reader = Fory::default().compatible(true);
    reader
        .register_struct(
            12,
            "Counter",
            vec![FieldInfo::new("n", FieldType::new(VARINT32, false))],
        )
        .unwrap();

    let bytes = writer
        .serialize(&Value::Struct {
            key: TypeKey::Id(12),
            fields: vec![Value::Int32(300)],
        })
        .unwrap();
    let decoded = reader.deserialize(&bytes).unwrap();
    assert_eq!(
        decoded,
        Value::Struct {
            key: TypeKey::Id(12),
            fields: vec![Value::VarInt32(300)],
        }
    );
}

#[test]
fn incompatible_field_type_change_is_an_error() {
    let mut writer = Fory::default().compatible(true);
    writer
        .register_struct(
            13,
            "Record",
            vec![FieldInfo::new("v", FieldType::new(STRING, false))],
        )
        .unwrap();
    let mut reader = Fory::default().compatible(true);
    reader
        .register_struct(
            13,
            "Record",
            vec![FieldInfo::new("v", FieldType::new(VARINT32, false))],
        )
        .unwrap();

    let bytes = writer
        .serialize(&Value::Struct {
            key: TypeKey::Id(13),
            fields: vec![Value::String("not a number".to_string())],
        })
        .unwrap();
    assert!(matches!(
        reader.deserialize(&bytes),
        Err(Error::InvalidData(_))
    ));
}
