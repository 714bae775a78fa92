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

//! Per-kind codec functions.
//!
//! Dispatch is a `match` over the closed [`Value`] variant / [`TypeId`]
//! kind set, so adding a kind is a compile-error-guided change rather than a
//! new serializer subclass.

pub(crate) mod collection;
pub(crate) mod map;
pub(crate) mod string;
pub(crate) mod struct_;

use crate::ensure;
use crate::error::Error;
use crate::meta::{
    read_meta_name, write_meta_name, FieldType, TypeMeta, NAMESPACE_DECODER, NAMESPACE_ENCODINGS,
    TYPE_NAME_DECODER, TYPE_NAME_ENCODINGS,
};
use crate::resolver::context::{ReadContext, WriteContext};
use crate::resolver::type_resolver::{TypeDef, TypeEntry};
use crate::types::{self, Mode, RefFlag};
use crate::value::{TypeKey, Value};
use std::rc::Rc;

/// Resolved wire type information for one value: the kind tag plus whatever
/// identity and metadata followed it.
pub(crate) struct WireTypeInfo {
    pub kind: u32,
    pub key: Option<TypeKey>,
    pub entry: Option<Rc<TypeEntry>>,
    pub meta: Option<Rc<TypeMeta>>,
}

impl WireTypeInfo {
    fn plain(kind: u32) -> WireTypeInfo {
        WireTypeInfo {
            kind,
            key: None,
            entry: None,
            meta: None,
        }
    }
}

fn lookup_entry(ctx_resolver: &crate::resolver::type_resolver::TypeResolver, key: &TypeKey) -> Result<Rc<TypeEntry>, Error> {
    ctx_resolver
        .get(key)
        .cloned()
        .ok_or_else(|| Error::unknown_type(format!("type {key} is not registered")))
}

fn check_entry_kind(kind: u32, entry: &TypeEntry) -> Result<(), Error> {
    let matches = match entry.def {
        TypeDef::Struct(_) => types::is_struct_kind(kind),
        TypeDef::Enum { .. } => types::is_enum_kind(kind),
        TypeDef::Union { .. } => types::is_union_kind(kind),
        TypeDef::Ext => types::is_ext_kind(kind),
    };
    ensure!(
        matches,
        Error::invalid_data(format!(
            "wire kind {kind} does not match the registration of `{}`",
            entry.type_name
        ))
    );
    Ok(())
}

/// Serializes one value dynamically: ref/null flag, then type info, then
/// payload. This is the entry point for root values and for every position
/// whose static type is unknown.
pub(crate) fn write_any(ctx: &mut WriteContext, value: &Value) -> Result<(), Error> {
    match value {
        Value::Null => {
            ctx.writer.write_i8(RefFlag::Null as i8);
            Ok(())
        }
        Value::Ref(rc) => {
            if ctx.track_ref {
                if ctx.ref_writer.try_write_ref(&mut ctx.writer, rc) {
                    return Ok(());
                }
                let inner = rc.borrow();
                write_type_info(ctx, &inner)?;
                write_payload(ctx, &inner)
            } else {
                // tracking disabled: shared values are inlined as copies
                let inner = rc.borrow();
                write_any(ctx, &inner)
            }
        }
        Value::Struct { .. } if ctx.track_ref => {
            // structs are referencable objects: burn the next id so the
            // sequence stays aligned with the reader
            ctx.writer.write_i8(RefFlag::RefValue as i8);
            ctx.ref_writer.assign_anonymous_id();
            write_type_info(ctx, value)?;
            write_payload(ctx, value)
        }
        _ => {
            ctx.writer.write_i8(RefFlag::NotNullValue as i8);
            write_type_info(ctx, value)?;
            write_payload(ctx, value)
        }
    }
}

/// Deserializes one dynamically-written value.
pub(crate) fn read_any(ctx: &mut ReadContext) -> Result<Value, Error> {
    let flag = ctx.reader.read_i8()?;
    if flag == RefFlag::Null as i8 {
        Ok(Value::Null)
    } else if flag == RefFlag::Ref as i8 {
        let ref_id = ctx.reader.read_varuint32()?;
        Ok(Value::Ref(ctx.ref_reader.get(ref_id)?))
    } else if flag == RefFlag::NotNullValue as i8 {
        let info = read_type_info(ctx)?;
        read_payload(ctx, &info)
    } else if flag == RefFlag::RefValue as i8 {
        // register the placeholder before the payload so that cycles can
        // resolve back-references into the object under construction
        let handle = ctx.ref_reader.reserve();
        let info = read_type_info(ctx)?;
        let value = read_payload(ctx, &info)?;
        *handle.borrow_mut() = value;
        Ok(Value::Ref(handle))
    } else {
        Err(Error::invalid_data(format!("unknown ref flag: {flag}")))
    }
}

/// Writes the type info of a non-null value: the kind tag, then the user
/// type id or names, then (for compatible structs) the pass-local meta.
pub(crate) fn write_type_info(ctx: &mut WriteContext, value: &Value) -> Result<(), Error> {
    match value {
        Value::Ref(rc) => write_type_info(ctx, &rc.borrow()),
        Value::Struct { key, .. } => {
            let entry = lookup_entry(ctx.resolver, key)?;
            check_entry_kind(types::STRUCT, &entry).map_err(|_| {
                Error::invalid_data(format!("type {key} is not registered as a struct"))
            })?;
            match (ctx.mode, key) {
                (Mode::SchemaConsistent, TypeKey::Id(id)) => {
                    ctx.writer.write_varuint32(types::STRUCT);
                    ctx.writer.write_varuint32(*id);
                }
                (Mode::SchemaConsistent, TypeKey::Named { .. }) => {
                    ctx.writer.write_varuint32(types::NAMED_STRUCT);
                    write_meta_name(&mut ctx.writer, &entry.namespace_ms, NAMESPACE_ENCODINGS);
                    write_meta_name(&mut ctx.writer, &entry.type_name_ms, TYPE_NAME_ENCODINGS);
                }
                (Mode::Compatible, TypeKey::Id(id)) => {
                    ctx.writer.write_varuint32(types::COMPATIBLE_STRUCT);
                    ctx.writer.write_varuint32(*id);
                    ctx.write_meta_for(&entry)?;
                }
                (Mode::Compatible, TypeKey::Named { .. }) => {
                    // the TypeMeta blob already carries namespace and name
                    ctx.writer.write_varuint32(types::NAMED_COMPATIBLE_STRUCT);
                    ctx.write_meta_for(&entry)?;
                }
            }
            Ok(())
        }
        Value::Enum { key, .. } => write_user_type_info(ctx, key, types::ENUM, types::NAMED_ENUM),
        Value::Union { key, .. } => {
            write_user_type_info(ctx, key, types::TYPED_UNION, types::NAMED_UNION)
        }
        Value::Ext { key, .. } => write_user_type_info(ctx, key, types::EXT, types::NAMED_EXT),
        _ => {
            let kind = value
                .wire_kind(ctx.mode)
                .ok_or_else(|| Error::invalid_data("null value has no type info"))?;
            ctx.writer.write_varuint32(kind);
            Ok(())
        }
    }
}

fn write_user_type_info(
    ctx: &mut WriteContext,
    key: &TypeKey,
    id_kind: u32,
    named_kind: u32,
) -> Result<(), Error> {
    let entry = lookup_entry(ctx.resolver, key)?;
    check_entry_kind(id_kind, &entry)?;
    match key {
        TypeKey::Id(id) => {
            ctx.writer.write_varuint32(id_kind);
            ctx.writer.write_varuint32(*id);
        }
        TypeKey::Named { .. } => {
            ctx.writer.write_varuint32(named_kind);
            write_meta_name(&mut ctx.writer, &entry.namespace_ms, NAMESPACE_ENCODINGS);
            write_meta_name(&mut ctx.writer, &entry.type_name_ms, TYPE_NAME_ENCODINGS);
        }
    }
    Ok(())
}

/// Reads the type info of a non-null value.
///
/// Unregistered user types are fatal in schema-consistent mode. In
/// compatible mode enums, exts and unions degrade to key-only placeholders
/// and compatible structs to metadata-only placeholders; plain STRUCT tags
/// stay fatal either way because their hash cannot be verified locally.
pub(crate) fn read_type_info(ctx: &mut ReadContext) -> Result<WireTypeInfo, Error> {
    let kind = ctx.reader.read_varuint32()?;
    match kind {
        types::BOOL
        | types::INT8
        | types::INT16
        | types::INT32
        | types::VARINT32
        | types::INT64
        | types::VARINT64
        | types::FLOAT32
        | types::FLOAT64
        | types::STRING
        | types::LIST
        | types::SET
        | types::MAP => Ok(WireTypeInfo::plain(kind)),
        types::STRUCT | types::ENUM | types::EXT | types::TYPED_UNION => {
            let user_type_id = ctx.reader.read_varuint32()?;
            let key = TypeKey::Id(user_type_id);
            let entry = ctx.resolver.get_by_id(user_type_id).cloned();
            if let Some(entry) = &entry {
                check_entry_kind(kind, entry)?;
            } else if kind == types::STRUCT || ctx.mode == Mode::SchemaConsistent {
                return Err(Error::unknown_type(format!(
                    "wire kind {kind} refers to unregistered type id {user_type_id}"
                )));
            }
            Ok(WireTypeInfo {
                kind,
                key: Some(key),
                entry,
                meta: None,
            })
        }
        types::COMPATIBLE_STRUCT => {
            let user_type_id = ctx.reader.read_varuint32()?;
            let entry = ctx.resolver.get_by_id(user_type_id).cloned();
            if let Some(entry) = &entry {
                check_entry_kind(kind, entry)?;
            }
            let meta = ctx.read_meta()?;
            Ok(WireTypeInfo {
                kind,
                key: Some(TypeKey::Id(user_type_id)),
                entry,
                meta: Some(meta),
            })
        }
        types::NAMED_COMPATIBLE_STRUCT => {
            let meta = ctx.read_meta()?;
            let key = TypeKey::named(meta.get_namespace(), meta.get_type_name());
            let entry = ctx
                .resolver
                .get_by_name(meta.get_namespace(), meta.get_type_name())
                .cloned();
            if let Some(entry) = &entry {
                check_entry_kind(kind, entry)?;
            }
            Ok(WireTypeInfo {
                kind,
                key: Some(key),
                entry,
                meta: Some(meta),
            })
        }
        types::NAMED_STRUCT | types::NAMED_ENUM | types::NAMED_EXT | types::NAMED_UNION => {
            let namespace =
                read_meta_name(&mut ctx.reader, &NAMESPACE_DECODER, NAMESPACE_ENCODINGS)?;
            let type_name =
                read_meta_name(&mut ctx.reader, &TYPE_NAME_DECODER, TYPE_NAME_ENCODINGS)?;
            let entry = ctx.resolver.get_by_name(&namespace, &type_name).cloned();
            if let Some(entry) = &entry {
                check_entry_kind(kind, entry)?;
            } else if kind == types::NAMED_STRUCT || ctx.mode == Mode::SchemaConsistent {
                return Err(Error::unknown_type(format!(
                    "wire kind {kind} refers to unregistered type `{namespace}.{type_name}`"
                )));
            }
            Ok(WireTypeInfo {
                kind,
                key: Some(TypeKey::named(&namespace, &type_name)),
                entry,
                meta: None,
            })
        }
        _ => Err(Error::invalid_data(format!(
            "unrecognized type id on the wire: {kind}"
        ))),
    }
}

/// Writes a non-null value's payload. `Ref` wrappers are dereferenced; ref
/// bookkeeping belongs to the caller.
pub(crate) fn write_payload(ctx: &mut WriteContext, value: &Value) -> Result<(), Error> {
    match value {
        Value::Null => Err(Error::invalid_data("null value has no payload")),
        Value::Ref(rc) => write_payload(ctx, &rc.borrow()),
        Value::Bool(v) => {
            ctx.writer.write_u8(u8::from(*v));
            Ok(())
        }
        Value::Int8(v) => {
            ctx.writer.write_i8(*v);
            Ok(())
        }
        Value::Int16(v) => {
            ctx.writer.write_i16(*v);
            Ok(())
        }
        Value::Int32(v) => {
            ctx.writer.write_i32(*v);
            Ok(())
        }
        Value::VarInt32(v) => {
            ctx.writer.write_varint32(*v);
            Ok(())
        }
        Value::Int64(v) => {
            ctx.writer.write_i64(*v);
            Ok(())
        }
        Value::VarInt64(v) => {
            ctx.writer.write_varint64(*v);
            Ok(())
        }
        Value::Float32(v) => {
            ctx.writer.write_f32(*v);
            Ok(())
        }
        Value::Float64(v) => {
            ctx.writer.write_f64(*v);
            Ok(())
        }
        Value::String(s) => {
            string::write_string(&mut ctx.writer, s);
            Ok(())
        }
        Value::List(items) | Value::Set(items) => collection::write_collection(ctx, items, None),
        Value::Map(entries) => map::write_map(ctx, entries, None),
        Value::Struct { key, fields } => {
            let entry = lookup_entry(ctx.resolver, key)?;
            struct_::write_struct(ctx, &entry, fields)
        }
        Value::Enum { key, ordinal } => {
            let entry = lookup_entry(ctx.resolver, key)?;
            let TypeDef::Enum { variants } = &entry.def else {
                return Err(Error::invalid_data(format!(
                    "type {key} is not registered as an enum"
                )));
            };
            ensure!(
                (*ordinal as usize) < variants.len(),
                Error::invalid_enum_value(format!(
                    "ordinal {ordinal} out of range for enum `{}` with {} variants",
                    entry.type_name,
                    variants.len()
                ))
            );
            ctx.writer.write_varuint32(*ordinal);
            Ok(())
        }
        Value::Union { key, tag, value } => {
            let entry = lookup_entry(ctx.resolver, key)?;
            let TypeDef::Union { cases } = &entry.def else {
                return Err(Error::invalid_data(format!(
                    "type {key} is not registered as a union"
                )));
            };
            ensure!(
                (*tag as usize) < cases.len(),
                Error::invalid_data(format!(
                    "case tag {tag} out of range for union `{}` with {} cases",
                    entry.type_name,
                    cases.len()
                ))
            );
            ctx.writer.write_varuint32(*tag);
            write_any(ctx, value)
        }
        Value::Ext { key, data } => {
            lookup_entry(ctx.resolver, key)?;
            ctx.writer.write_varuint32(data.len() as u32);
            ctx.writer.write_bytes(data);
            Ok(())
        }
    }
}

/// Reads a payload according to previously-read type info.
pub(crate) fn read_payload(ctx: &mut ReadContext, info: &WireTypeInfo) -> Result<Value, Error> {
    match info.kind {
        types::BOOL => Ok(Value::Bool(ctx.reader.read_u8()? != 0)),
        types::INT8 => Ok(Value::Int8(ctx.reader.read_i8()?)),
        types::INT16 => Ok(Value::Int16(ctx.reader.read_i16()?)),
        types::INT32 => Ok(Value::Int32(ctx.reader.read_i32()?)),
        types::VARINT32 => Ok(Value::VarInt32(ctx.reader.read_varint32()?)),
        types::INT64 => Ok(Value::Int64(ctx.reader.read_i64()?)),
        types::VARINT64 => Ok(Value::VarInt64(ctx.reader.read_varint64()?)),
        types::FLOAT32 => Ok(Value::Float32(ctx.reader.read_f32()?)),
        types::FLOAT64 => Ok(Value::Float64(ctx.reader.read_f64()?)),
        types::STRING => Ok(Value::String(string::read_string(&mut ctx.reader)?)),
        types::LIST => Ok(Value::List(collection::read_collection(ctx, None)?)),
        types::SET => Ok(Value::Set(collection::read_collection(ctx, None)?)),
        types::MAP => Ok(Value::Map(map::read_map(ctx, None)?)),
        types::ENUM | types::NAMED_ENUM => {
            let ordinal = ctx.reader.read_varuint32()?;
            if let Some(entry) = &info.entry {
                let TypeDef::Enum { variants } = &entry.def else {
                    unreachable!("entry kind checked during type info read");
                };
                ensure!(
                    (ordinal as usize) < variants.len(),
                    Error::invalid_enum_value(format!(
                        "ordinal {ordinal} out of range for enum `{}` with {} variants",
                        entry.type_name,
                        variants.len()
                    ))
                );
            }
            Ok(Value::Enum {
                key: info.key.clone().expect("enum type info carries a key"),
                ordinal,
            })
        }
        types::TYPED_UNION | types::NAMED_UNION => {
            let tag = ctx.reader.read_varuint32()?;
            if let Some(entry) = &info.entry {
                let TypeDef::Union { cases } = &entry.def else {
                    unreachable!("entry kind checked during type info read");
                };
                ensure!(
                    (tag as usize) < cases.len(),
                    Error::invalid_data(format!(
                        "case tag {tag} out of range for union `{}` with {} cases",
                        entry.type_name,
                        cases.len()
                    ))
                );
            }
            let value = read_any(ctx)?;
            Ok(Value::Union {
                key: info.key.clone().expect("union type info carries a key"),
                tag,
                value: Box::new(value),
            })
        }
        types::EXT | types::NAMED_EXT => {
            let len = ctx.reader.read_varuint32()? as usize;
            let data = ctx.reader.read_bytes(len)?.to_vec();
            Ok(Value::Ext {
                key: info.key.clone().expect("ext type info carries a key"),
                data,
            })
        }
        types::STRUCT | types::NAMED_STRUCT => {
            let entry = info
                .entry
                .clone()
                .expect("schema-consistent struct requires a registered entry");
            struct_::read_struct_consistent(ctx, &entry)
        }
        types::COMPATIBLE_STRUCT | types::NAMED_COMPATIBLE_STRUCT => {
            struct_::read_struct_compatible(ctx, info)
        }
        kind => Err(Error::invalid_data(format!(
            "unrecognized type id on the wire: {kind}"
        ))),
    }
}

/// The element/entry read path of a collection or map run: either the
/// statically declared descriptor or the shared wire type info.
pub(crate) enum ElemSource<'a> {
    Declared(&'a FieldType),
    Wire(WireTypeInfo),
}

pub(crate) fn read_element(ctx: &mut ReadContext, source: &ElemSource) -> Result<Value, Error> {
    match source {
        ElemSource::Declared(ft) => struct_::read_declared_payload(ctx, ft),
        ElemSource::Wire(info) => read_payload(ctx, info),
    }
}

/// Reads one element that carries its own ref flag (collection/map runs
/// with the tracking bit set).
pub(crate) fn read_tracked_element(
    ctx: &mut ReadContext,
    source: &ElemSource,
) -> Result<Value, Error> {
    let flag = ctx.reader.read_i8()?;
    if flag == RefFlag::Null as i8 {
        Ok(Value::Null)
    } else if flag == RefFlag::Ref as i8 {
        let ref_id = ctx.reader.read_varuint32()?;
        Ok(Value::Ref(ctx.ref_reader.get(ref_id)?))
    } else if flag == RefFlag::NotNullValue as i8 {
        read_element(ctx, source)
    } else if flag == RefFlag::RefValue as i8 {
        let handle = ctx.ref_reader.reserve();
        let value = read_element(ctx, source)?;
        *handle.borrow_mut() = value;
        Ok(Value::Ref(handle))
    } else {
        Err(Error::invalid_data(format!("unknown ref flag: {flag}")))
    }
}

/// Writes one element of a tracked collection/map run: ref flag, then the
/// payload on first occurrence.
pub(crate) fn write_tracked_element(ctx: &mut WriteContext, value: &Value) -> Result<(), Error> {
    match value {
        Value::Ref(rc) => {
            if !ctx.ref_writer.try_write_ref(&mut ctx.writer, rc) {
                write_payload(ctx, &rc.borrow())?;
            }
            Ok(())
        }
        _ => {
            ctx.writer.write_i8(RefFlag::RefValue as i8);
            ctx.ref_writer.assign_anonymous_id();
            write_payload(ctx, value)
        }
    }
}
