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

//! The dynamic value model the codec operates on.
//!
//! Language bindings translate native objects into this closed tagged
//! variant; one codec function per kind, selected by `match`, replaces the
//! serializer-object-per-type dispatch used elsewhere in the project.

use crate::types::{self, Mode};
use std::cell::RefCell;
use std::rc::Rc;

/// A value with shared identity. Two `Ref`s wrapping the same `SharedValue`
/// serialize as one object plus a back-reference when ref tracking is on.
pub type SharedValue = Rc<RefCell<Value>>;

/// Identity of a registered user type: either a numeric id or a
/// namespace-qualified name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeKey {
    Id(u32),
    Named {
        namespace: String,
        type_name: String,
    },
}

impl TypeKey {
    pub fn named(namespace: &str, type_name: &str) -> TypeKey {
        TypeKey::Named {
            namespace: namespace.to_string(),
            type_name: type_name.to_string(),
        }
    }

    pub fn is_named(&self) -> bool {
        matches!(self, TypeKey::Named { .. })
    }
}

impl std::fmt::Display for TypeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeKey::Id(id) => write!(f, "#{id}"),
            TypeKey::Named {
                namespace,
                type_name,
            } if namespace.is_empty() => write!(f, "{type_name}"),
            TypeKey::Named {
                namespace,
                type_name,
            } => write!(f, "{namespace}.{type_name}"),
        }
    }
}

/// One value of any supported kind.
#[derive(Clone, Debug, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    VarInt32(i32),
    Int64(i64),
    VarInt64(i64),
    Float32(f32),
    Float64(f64),
    String(String),
    List(Vec<Value>),
    Set(Vec<Value>),
    Map(Vec<(Value, Value)>),
    Struct {
        key: TypeKey,
        /// Field values in declaration order of the registered definition.
        fields: Vec<Value>,
    },
    Enum {
        key: TypeKey,
        ordinal: u32,
    },
    Union {
        key: TypeKey,
        tag: u32,
        value: Box<Value>,
    },
    /// Opaque payload produced by a binding-level serializer.
    Ext {
        key: TypeKey,
        data: Vec<u8>,
    },
    Ref(SharedValue),
}

/// Runtime wire type of a value: the base kind plus, for user types, the
/// registration key. Used for collection homogeneity and map chunk runs.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct RuntimeType {
    pub kind: u32,
    pub key: Option<TypeKey>,
}

impl Value {
    pub fn shared(value: Value) -> Value {
        Value::Ref(Rc::new(RefCell::new(value)))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_ref(&self) -> bool {
        matches!(self, Value::Ref(_))
    }

    /// The base wire kind the value serializes as, honoring the mode for
    /// struct values. `None` for `Null`; `Ref` reports its target's kind.
    pub(crate) fn wire_kind(&self, mode: Mode) -> Option<u32> {
        let kind = match self {
            Value::Null => return None,
            Value::Ref(rc) => return rc.borrow().wire_kind(mode),
            Value::Bool(_) => types::BOOL,
            Value::Int8(_) => types::INT8,
            Value::Int16(_) => types::INT16,
            Value::Int32(_) => types::INT32,
            Value::VarInt32(_) => types::VARINT32,
            Value::Int64(_) => types::INT64,
            Value::VarInt64(_) => types::VARINT64,
            Value::Float32(_) => types::FLOAT32,
            Value::Float64(_) => types::FLOAT64,
            Value::String(_) => types::STRING,
            Value::List(_) => types::LIST,
            Value::Set(_) => types::SET,
            Value::Map(_) => types::MAP,
            Value::Struct { key, .. } => match (mode, key.is_named()) {
                (Mode::SchemaConsistent, false) => types::STRUCT,
                (Mode::SchemaConsistent, true) => types::NAMED_STRUCT,
                (Mode::Compatible, false) => types::COMPATIBLE_STRUCT,
                (Mode::Compatible, true) => types::NAMED_COMPATIBLE_STRUCT,
            },
            Value::Enum { key, .. } => {
                if key.is_named() {
                    types::NAMED_ENUM
                } else {
                    types::ENUM
                }
            }
            Value::Union { key, .. } => {
                if key.is_named() {
                    types::NAMED_UNION
                } else {
                    types::TYPED_UNION
                }
            }
            Value::Ext { key, .. } => {
                if key.is_named() {
                    types::NAMED_EXT
                } else {
                    types::EXT
                }
            }
        };
        Some(kind)
    }

    pub(crate) fn type_key(&self) -> Option<TypeKey> {
        match self {
            Value::Struct { key, .. }
            | Value::Enum { key, .. }
            | Value::Union { key, .. }
            | Value::Ext { key, .. } => Some(key.clone()),
            Value::Ref(rc) => rc.borrow().type_key(),
            _ => None,
        }
    }

    pub(crate) fn runtime_type(&self, mode: Mode) -> Option<RuntimeType> {
        self.wire_kind(mode).map(|kind| RuntimeType {
            kind,
            key: self.type_key(),
        })
    }
}

/// Structural equality; `Ref` wrappers compare through to their targets, so
/// a shared value equals its inlined copy. Must not be called on cyclic
/// graphs; identity assertions there use `Rc::ptr_eq` instead.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Ref(a), Value::Ref(b)) => {
                Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow()
            }
            (Value::Ref(a), b) => *a.borrow() == *b,
            (a, Value::Ref(b)) => *a == *b.borrow(),
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int8(a), Value::Int8(b)) => a == b,
            (Value::Int16(a), Value::Int16(b)) => a == b,
            (Value::Int32(a), Value::Int32(b)) => a == b,
            (Value::VarInt32(a), Value::VarInt32(b)) => a == b,
            (Value::Int64(a), Value::Int64(b)) => a == b,
            (Value::VarInt64(a), Value::VarInt64(b)) => a == b,
            (Value::Float32(a), Value::Float32(b)) => a == b,
            (Value::Float64(a), Value::Float64(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) | (Value::Set(a), Value::Set(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (
                Value::Struct { key: ka, fields: fa },
                Value::Struct { key: kb, fields: fb },
            ) => ka == kb && fa == fb,
            (
                Value::Enum { key: ka, ordinal: oa },
                Value::Enum { key: kb, ordinal: ob },
            ) => ka == kb && oa == ob,
            (
                Value::Union {
                    key: ka,
                    tag: ta,
                    value: va,
                },
                Value::Union {
                    key: kb,
                    tag: tb,
                    value: vb,
                },
            ) => ka == kb && ta == tb && va == vb,
            (
                Value::Ext { key: ka, data: da },
                Value::Ext { key: kb, data: db },
            ) => ka == kb && da == db,
            _ => false,
        }
    }
}
