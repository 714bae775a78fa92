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

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Wire type identifiers shared by every language implementation.
///
/// Values in the `(8..19)` gap belong to kinds this implementation does not
/// carry (tagged/unsigned integer variants, small floats); they are reserved
/// and rejected on read.
#[derive(Clone, Copy, Debug, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[allow(non_camel_case_types)]
#[repr(u8)]
pub enum TypeId {
    // Unknown/polymorphic type marker.
    UNKNOWN = 0,
    BOOL = 1,
    INT8 = 2,
    INT16 = 3,
    INT32 = 4,
    VARINT32 = 5,
    INT64 = 6,
    VARINT64 = 7,
    FLOAT32 = 19,
    FLOAT64 = 20,
    STRING = 21,
    LIST = 22,
    SET = 23,
    MAP = 24,
    ENUM = 25,
    NAMED_ENUM = 26,
    STRUCT = 27,
    COMPATIBLE_STRUCT = 28,
    NAMED_STRUCT = 29,
    NAMED_COMPATIBLE_STRUCT = 30,
    EXT = 31,
    NAMED_EXT = 32,
    // A tagged union value whose schema identity is not embedded.
    UNION = 33,
    // A union value with an embedded numeric union type id.
    TYPED_UNION = 34,
    // A union value with an embedded union type name.
    NAMED_UNION = 35,
}

pub const UNKNOWN: u32 = TypeId::UNKNOWN as u32;
pub const BOOL: u32 = TypeId::BOOL as u32;
pub const INT8: u32 = TypeId::INT8 as u32;
pub const INT16: u32 = TypeId::INT16 as u32;
pub const INT32: u32 = TypeId::INT32 as u32;
pub const VARINT32: u32 = TypeId::VARINT32 as u32;
pub const INT64: u32 = TypeId::INT64 as u32;
pub const VARINT64: u32 = TypeId::VARINT64 as u32;
pub const FLOAT32: u32 = TypeId::FLOAT32 as u32;
pub const FLOAT64: u32 = TypeId::FLOAT64 as u32;
pub const STRING: u32 = TypeId::STRING as u32;
pub const LIST: u32 = TypeId::LIST as u32;
pub const SET: u32 = TypeId::SET as u32;
pub const MAP: u32 = TypeId::MAP as u32;
pub const ENUM: u32 = TypeId::ENUM as u32;
pub const NAMED_ENUM: u32 = TypeId::NAMED_ENUM as u32;
pub const STRUCT: u32 = TypeId::STRUCT as u32;
pub const COMPATIBLE_STRUCT: u32 = TypeId::COMPATIBLE_STRUCT as u32;
pub const NAMED_STRUCT: u32 = TypeId::NAMED_STRUCT as u32;
pub const NAMED_COMPATIBLE_STRUCT: u32 = TypeId::NAMED_COMPATIBLE_STRUCT as u32;
pub const EXT: u32 = TypeId::EXT as u32;
pub const NAMED_EXT: u32 = TypeId::NAMED_EXT as u32;
pub const UNION: u32 = TypeId::UNION as u32;
pub const TYPED_UNION: u32 = TypeId::TYPED_UNION as u32;
pub const NAMED_UNION: u32 = TypeId::NAMED_UNION as u32;

/// Reference flags preceding a value on the wire.
#[derive(Clone, Copy, Debug, PartialEq, TryFromPrimitive)]
#[repr(i8)]
pub enum RefFlag {
    Null = -3,
    // Ref indicates a back-reference to an already (de)serialized object;
    // a varuint32 reference id follows.
    Ref = -2,
    // NotNullValue indicates a non-null value without reference bookkeeping.
    NotNullValue = -1,
    // RefValue indicates a non-null, referencable value on its first
    // occurrence; the next sequential reference id is assigned implicitly.
    RefValue = 0,
}

/// Schema compatibility mode, selected per instance at configuration time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    // Type declaration must be consistent between serialization peer and
    // deserialization peer; verified by a structural hash.
    SchemaConsistent,
    // Type declarations may differ between peers; fields can be added,
    // removed and reordered independently.
    Compatible,
}

/// `FieldType.type_id` packs a registered numeric user type id above the
/// 8-bit kind: `(user_type_id << 8) | kind`.
#[inline(always)]
pub fn kind_of(type_id: u32) -> u32 {
    type_id & 0xff
}

#[inline(always)]
pub fn user_id_of(type_id: u32) -> u32 {
    type_id >> 8
}

pub static PRIMITIVE_TYPES: [u32; 9] = [
    BOOL, INT8, INT16, INT32, VARINT32, INT64, VARINT64, FLOAT32, FLOAT64,
];

#[inline(always)]
pub fn is_primitive_kind(kind: u32) -> bool {
    PRIMITIVE_TYPES.contains(&kind)
}

#[inline(always)]
pub fn is_user_kind(kind: u32) -> bool {
    (ENUM..=NAMED_UNION).contains(&kind)
}

#[inline(always)]
pub fn is_struct_kind(kind: u32) -> bool {
    matches!(
        kind,
        STRUCT | COMPATIBLE_STRUCT | NAMED_STRUCT | NAMED_COMPATIBLE_STRUCT
    )
}

#[inline(always)]
pub fn is_enum_kind(kind: u32) -> bool {
    kind == ENUM || kind == NAMED_ENUM
}

#[inline(always)]
pub fn is_union_kind(kind: u32) -> bool {
    matches!(kind, UNION | TYPED_UNION | NAMED_UNION)
}

#[inline(always)]
pub fn is_ext_kind(kind: u32) -> bool {
    kind == EXT || kind == NAMED_EXT
}

/// Fields of these kinds are always written dynamically (ref flag + full
/// type info + payload), in both compatibility modes.
#[inline(always)]
pub fn is_dynamic_field_kind(kind: u32) -> bool {
    is_user_kind(kind) || kind == UNKNOWN
}

/// Normalizes a kind for structural-hash fingerprints so that
/// representation-only differences do not change the hash: fixed-width and
/// varint encodings of the same integer width collapse, user struct / enum /
/// ext kinds collapse to UNKNOWN, union kinds collapse to UNION.
pub fn normalize_for_fingerprint(kind: u32) -> u32 {
    match kind {
        INT32 => VARINT32,
        INT64 => VARINT64,
        _ if is_union_kind(kind) => UNION,
        _ if is_user_kind(kind) => UNKNOWN,
        _ => kind,
    }
}

/// Byte width used for wire-order sorting of primitive fields.
pub(crate) fn primitive_size(kind: u32) -> u32 {
    match kind {
        BOOL | INT8 => 1,
        INT16 => 2,
        INT32 | VARINT32 | FLOAT32 => 4,
        INT64 | VARINT64 | FLOAT64 => 8,
        _ => unreachable!("not a primitive kind: {kind}"),
    }
}

/// Variable-width integer kinds sort after fixed-width ones of the same size.
pub(crate) fn is_compress(kind: u32) -> bool {
    matches!(kind, INT32 | INT64 | VARINT32 | VARINT64)
}
