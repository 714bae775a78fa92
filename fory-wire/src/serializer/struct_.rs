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

//! Struct bodies in both compatibility modes.
//!
//! Schema-consistent: a fixed 32-bit structural hash, then fields in wire
//! order with layout decided statically per field. Compatible: fields in
//! the writer's metadata order, each self-describing, with unknown remote
//! fields skipped and missing local fields defaulted.

use crate::ensure;
use crate::error::Error;
use crate::meta::FieldType;
use crate::resolver::context::{ReadContext, WriteContext};
use crate::resolver::type_resolver::TypeEntry;
use crate::serializer::{collection, map, read_any, string, write_any, WireTypeInfo};
use crate::types::{self, RefFlag};
use crate::value::{TypeKey, Value};

pub(crate) fn write_struct(
    ctx: &mut WriteContext,
    entry: &TypeEntry,
    fields: &[Value],
) -> Result<(), Error> {
    let info = entry.struct_info().ok_or_else(|| {
        Error::invalid_data(format!("type `{}` is not a struct", entry.type_name))
    })?;
    ensure!(
        fields.len() == info.fields.len(),
        Error::invalid_data(format!(
            "struct `{}` declares {} fields but the value carries {}",
            entry.type_name,
            info.fields.len(),
            fields.len()
        ))
    );
    let compatible = ctx.mode == types::Mode::Compatible;
    if !compatible {
        ctx.writer.write_i32(info.hash(ctx.track_ref));
    }
    for (decl_idx, field_info) in &info.sorted {
        write_field_value(ctx, &field_info.field_type, &fields[*decl_idx], compatible).map_err(
            |e| match e {
                Error::InvalidData(msg) => Error::invalid_data(format!(
                    "field `{}` of struct `{}`: {msg}",
                    field_info.name, entry.type_name
                )),
                other => other,
            },
        )?;
    }
    Ok(())
}

pub(crate) fn read_struct_consistent(
    ctx: &mut ReadContext,
    entry: &TypeEntry,
) -> Result<Value, Error> {
    let info = entry.struct_info().ok_or_else(|| {
        Error::invalid_data(format!("type `{}` is not a struct", entry.type_name))
    })?;
    let remote_hash = ctx.reader.read_i32()?;
    let local_hash = info.hash(ctx.track_ref);
    if remote_hash != local_hash {
        return Err(Error::schema_hash_mismatch(format!(
            "struct `{}`: peer schema hash {remote_hash} != local {local_hash}; \
             align field names and types on both ends or switch to compatible mode",
            entry.type_name
        )));
    }
    let mut fields = vec![Value::Null; info.fields.len()];
    for (decl_idx, field_info) in &info.sorted {
        fields[*decl_idx] = read_field_value(ctx, &field_info.field_type, false)?;
    }
    Ok(Value::Struct {
        key: entry.key.clone(),
        fields,
    })
}

pub(crate) fn read_struct_compatible(
    ctx: &mut ReadContext,
    info: &WireTypeInfo,
) -> Result<Value, Error> {
    let meta = info
        .meta
        .clone()
        .expect("compatible struct type info carries metadata");
    match &info.entry {
        Some(entry) => {
            let struct_info = entry.struct_info().ok_or_else(|| {
                Error::invalid_data(format!("type `{}` is not a struct", entry.type_name))
            })?;
            let mut fields: Vec<Value> = struct_info
                .fields
                .iter()
                .map(|f| default_value(&f.field_type))
                .collect();
            for remote in meta.get_field_infos() {
                match struct_info.field_index.get(&remote.name) {
                    Some(&decl_idx) => {
                        let local_ft = &struct_info.fields[decl_idx].field_type;
                        let remote_kind = remote.field_type.kind();
                        let local_kind = local_ft.kind();
                        if types::normalize_for_fingerprint(remote_kind)
                            != types::normalize_for_fingerprint(local_kind)
                        {
                            return Err(Error::invalid_data(format!(
                                "field `{}` of struct `{}`: remote kind {remote_kind} cannot \
                                 be coerced to local kind {local_kind}",
                                remote.name, entry.type_name
                            )));
                        }
                        let value = read_field_value(ctx, &remote.field_type, true)?;
                        fields[decl_idx] = coerce_to_local(value, local_ft);
                    }
                    None => {
                        // no such local field: consume the bytes to keep the
                        // stream aligned, then discard
                        skip_field_value(ctx, &remote.field_type)?;
                    }
                }
            }
            Ok(Value::Struct {
                key: entry.key.clone(),
                fields,
            })
        }
        None => {
            // unresolved type: a metadata-only placeholder that still
            // preserves the field data
            let fields = meta
                .get_field_infos()
                .iter()
                .map(|f| read_field_value(ctx, &f.field_type, true))
                .collect::<Result<Vec<_>, _>>()?;
            let key = if meta.is_register_by_name() {
                TypeKey::named(meta.get_namespace(), meta.get_type_name())
            } else {
                TypeKey::Id(meta.get_user_type_id())
            };
            Ok(Value::Struct { key, fields })
        }
    }
}

/// Writes one field per its declared type.
///
/// Dynamic kinds (user types, unknown) are fully self-describing in both
/// modes. Compatible mode prefixes every remaining field with a ref flag
/// and its kind tag; schema-consistent mode writes a flag only for nullable
/// or tracked fields and nothing at all for the rest.
pub(crate) fn write_field_value(
    ctx: &mut WriteContext,
    ft: &FieldType,
    value: &Value,
    compatible: bool,
) -> Result<(), Error> {
    let kind = ft.kind();
    if types::is_dynamic_field_kind(kind) {
        return write_any(ctx, value);
    }
    if compatible {
        return match value {
            Value::Null => {
                ctx.writer.write_i8(RefFlag::Null as i8);
                Ok(())
            }
            Value::Ref(rc) if ctx.track_ref => {
                if ctx.ref_writer.try_write_ref(&mut ctx.writer, rc) {
                    return Ok(());
                }
                ctx.writer.write_varuint32(kind);
                write_declared_payload(ctx, ft, &rc.borrow())
            }
            _ => {
                ctx.writer.write_i8(RefFlag::NotNullValue as i8);
                ctx.writer.write_varuint32(kind);
                write_declared_payload(ctx, ft, value)
            }
        };
    }
    let tracked = ft.tracking_ref && ctx.track_ref;
    if tracked {
        match value {
            Value::Null => {
                ctx.writer.write_i8(RefFlag::Null as i8);
                Ok(())
            }
            Value::Ref(rc) => {
                if ctx.ref_writer.try_write_ref(&mut ctx.writer, rc) {
                    return Ok(());
                }
                write_declared_payload(ctx, ft, &rc.borrow())
            }
            _ => {
                ctx.writer.write_i8(RefFlag::RefValue as i8);
                ctx.ref_writer.assign_anonymous_id();
                write_declared_payload(ctx, ft, value)
            }
        }
    } else if ft.nullable {
        if value.is_null() {
            ctx.writer.write_i8(RefFlag::Null as i8);
            Ok(())
        } else {
            ctx.writer.write_i8(RefFlag::NotNullValue as i8);
            write_declared_payload(ctx, ft, value)
        }
    } else {
        // not representable as null on the wire; the binding must prevent it
        ensure!(
            !value.is_null(),
            Error::invalid_data("null value for a non-nullable field")
        );
        write_declared_payload(ctx, ft, value)
    }
}

pub(crate) fn read_field_value(
    ctx: &mut ReadContext,
    ft: &FieldType,
    compatible: bool,
) -> Result<Value, Error> {
    let kind = ft.kind();
    if types::is_dynamic_field_kind(kind) {
        return read_any(ctx);
    }
    if compatible {
        let flag = ctx.reader.read_i8()?;
        return if flag == RefFlag::Null as i8 {
            Ok(Value::Null)
        } else if flag == RefFlag::Ref as i8 {
            let ref_id = ctx.reader.read_varuint32()?;
            Ok(Value::Ref(ctx.ref_reader.get(ref_id)?))
        } else if flag == RefFlag::NotNullValue as i8 {
            check_kind_tag(ctx, kind)?;
            read_declared_payload(ctx, ft)
        } else if flag == RefFlag::RefValue as i8 {
            let handle = ctx.ref_reader.reserve();
            check_kind_tag(ctx, kind)?;
            let value = read_declared_payload(ctx, ft)?;
            *handle.borrow_mut() = value;
            Ok(Value::Ref(handle))
        } else {
            Err(Error::invalid_data(format!("unknown ref flag: {flag}")))
        };
    }
    let tracked = ft.tracking_ref && ctx.track_ref;
    if tracked {
        let flag = ctx.reader.read_i8()?;
        if flag == RefFlag::Null as i8 {
            Ok(Value::Null)
        } else if flag == RefFlag::Ref as i8 {
            let ref_id = ctx.reader.read_varuint32()?;
            Ok(Value::Ref(ctx.ref_reader.get(ref_id)?))
        } else if flag == RefFlag::RefValue as i8 {
            let handle = ctx.ref_reader.reserve();
            let value = read_declared_payload(ctx, ft)?;
            *handle.borrow_mut() = value;
            Ok(Value::Ref(handle))
        } else if flag == RefFlag::NotNullValue as i8 {
            read_declared_payload(ctx, ft)
        } else {
            Err(Error::invalid_data(format!("unknown ref flag: {flag}")))
        }
    } else if ft.nullable {
        let flag = ctx.reader.read_i8()?;
        if flag == RefFlag::Null as i8 {
            Ok(Value::Null)
        } else if flag == RefFlag::NotNullValue as i8 {
            read_declared_payload(ctx, ft)
        } else {
            Err(Error::invalid_data(format!(
                "unexpected ref flag {flag} for an untracked nullable field"
            )))
        }
    } else {
        read_declared_payload(ctx, ft)
    }
}

/// Consumes one field of the given remote shape without keeping the value,
/// so the stream stays aligned across unknown fields.
pub(crate) fn skip_field_value(ctx: &mut ReadContext, ft: &FieldType) -> Result<(), Error> {
    read_field_value(ctx, ft, true).map(drop)
}

fn check_kind_tag(ctx: &mut ReadContext, expected: u32) -> Result<(), Error> {
    let actual = ctx.reader.read_varuint32()?;
    ensure!(actual == expected, Error::type_mismatch(expected, actual));
    Ok(())
}

fn expect_i32(ft_kind: u32, value: &Value) -> Result<i32, Error> {
    match value {
        Value::Int32(v) | Value::VarInt32(v) => Ok(*v),
        other => Err(mismatch(ft_kind, other)),
    }
}

fn expect_i64(ft_kind: u32, value: &Value) -> Result<i64, Error> {
    match value {
        Value::Int64(v) | Value::VarInt64(v) => Ok(*v),
        other => Err(mismatch(ft_kind, other)),
    }
}

#[cold]
fn mismatch(ft_kind: u32, value: &Value) -> Error {
    // name the variant only: Debug on a full value could chase a cycle
    let got = match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Int8(_) => "int8",
        Value::Int16(_) => "int16",
        Value::Int32(_) => "int32",
        Value::VarInt32(_) => "varint32",
        Value::Int64(_) => "int64",
        Value::VarInt64(_) => "varint64",
        Value::Float32(_) => "float32",
        Value::Float64(_) => "float64",
        Value::String(_) => "string",
        Value::List(_) => "list",
        Value::Set(_) => "set",
        Value::Map(_) => "map",
        Value::Struct { .. } => "struct",
        Value::Enum { .. } => "enum",
        Value::Union { .. } => "union",
        Value::Ext { .. } => "ext",
        Value::Ref(_) => "ref",
    };
    Error::invalid_data(format!(
        "{got} value does not match the declared field kind {ft_kind}"
    ))
}

/// Writes a payload whose type is statically declared (struct fields in
/// wire order, declared collection elements, declared map sides).
pub(crate) fn write_declared_payload(
    ctx: &mut WriteContext,
    ft: &FieldType,
    value: &Value,
) -> Result<(), Error> {
    if let Value::Ref(rc) = value {
        return write_declared_payload(ctx, ft, &rc.borrow());
    }
    let kind = ft.kind();
    match kind {
        types::BOOL => match value {
            Value::Bool(v) => {
                ctx.writer.write_u8(u8::from(*v));
                Ok(())
            }
            other => Err(mismatch(kind, other)),
        },
        types::INT8 => match value {
            Value::Int8(v) => {
                ctx.writer.write_i8(*v);
                Ok(())
            }
            other => Err(mismatch(kind, other)),
        },
        types::INT16 => match value {
            Value::Int16(v) => {
                ctx.writer.write_i16(*v);
                Ok(())
            }
            other => Err(mismatch(kind, other)),
        },
        types::INT32 => {
            let v = expect_i32(kind, value)?;
            ctx.writer.write_i32(v);
            Ok(())
        }
        types::VARINT32 => {
            let v = expect_i32(kind, value)?;
            ctx.writer.write_varint32(v);
            Ok(())
        }
        types::INT64 => {
            let v = expect_i64(kind, value)?;
            ctx.writer.write_i64(v);
            Ok(())
        }
        types::VARINT64 => {
            let v = expect_i64(kind, value)?;
            ctx.writer.write_varint64(v);
            Ok(())
        }
        types::FLOAT32 => match value {
            Value::Float32(v) => {
                ctx.writer.write_f32(*v);
                Ok(())
            }
            other => Err(mismatch(kind, other)),
        },
        types::FLOAT64 => match value {
            Value::Float64(v) => {
                ctx.writer.write_f64(*v);
                Ok(())
            }
            other => Err(mismatch(kind, other)),
        },
        types::STRING => match value {
            Value::String(s) => {
                string::write_string(&mut ctx.writer, s);
                Ok(())
            }
            other => Err(mismatch(kind, other)),
        },
        types::LIST => match value {
            Value::List(items) => collection::write_collection(ctx, items, ft.generics.first()),
            other => Err(mismatch(kind, other)),
        },
        types::SET => match value {
            Value::Set(items) => collection::write_collection(ctx, items, ft.generics.first()),
            other => Err(mismatch(kind, other)),
        },
        types::MAP => match value {
            Value::Map(entries) => {
                let declared = match (ft.generics.first(), ft.generics.get(1)) {
                    (Some(k), Some(v)) => Some((k, v)),
                    _ => None,
                };
                map::write_map(ctx, entries, declared)
            }
            other => Err(mismatch(kind, other)),
        },
        _ => unreachable!("dynamic kinds are handled before declared payloads"),
    }
}

pub(crate) fn read_declared_payload(ctx: &mut ReadContext, ft: &FieldType) -> Result<Value, Error> {
    let kind = ft.kind();
    match kind {
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
        types::LIST => Ok(Value::List(collection::read_collection(
            ctx,
            ft.generics.first(),
        )?)),
        types::SET => Ok(Value::Set(collection::read_collection(
            ctx,
            ft.generics.first(),
        )?)),
        types::MAP => {
            let declared = match (ft.generics.first(), ft.generics.get(1)) {
                (Some(k), Some(v)) => Some((k, v)),
                _ => None,
            };
            Ok(Value::Map(map::read_map(ctx, declared)?))
        }
        _ => unreachable!("dynamic kinds are handled before declared payloads"),
    }
}

/// Zero value for a locally-declared field absent from the remote schema.
/// User kinds default to `Null` rather than a recursively-built struct,
/// which keeps self-referential definitions finite.
pub(crate) fn default_value(ft: &FieldType) -> Value {
    if ft.nullable {
        return Value::Null;
    }
    match ft.kind() {
        types::BOOL => Value::Bool(false),
        types::INT8 => Value::Int8(0),
        types::INT16 => Value::Int16(0),
        types::INT32 => Value::Int32(0),
        types::VARINT32 => Value::VarInt32(0),
        types::INT64 => Value::Int64(0),
        types::VARINT64 => Value::VarInt64(0),
        types::FLOAT32 => Value::Float32(0.0),
        types::FLOAT64 => Value::Float64(0.0),
        types::STRING => Value::String(String::new()),
        types::LIST => Value::List(vec![]),
        types::SET => Value::Set(vec![]),
        types::MAP => Value::Map(vec![]),
        _ => Value::Null,
    }
}

/// Re-tags width-coercible integer values as the local declared kind so a
/// peer's VARINT32 lands in a local INT32 field (and vice versa) without
/// changing the numeric value.
fn coerce_to_local(value: Value, local_ft: &FieldType) -> Value {
    match (value, local_ft.kind()) {
        (Value::VarInt32(v), types::INT32) => Value::Int32(v),
        (Value::Int32(v), types::VARINT32) => Value::VarInt32(v),
        (Value::VarInt64(v), types::INT64) => Value::Int64(v),
        (Value::Int64(v), types::VARINT64) => Value::VarInt64(v),
        (value, _) => value,
    }
}
