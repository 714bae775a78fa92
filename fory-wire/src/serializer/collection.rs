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

//! LIST/SET payloads.
//!
//! Homogeneous, null-free collections write one flag byte and at most one
//! shared type info, then raw element payloads - the per-element type tags
//! and ref flags of the dynamic path are skipped entirely.

use crate::error::Error;
use crate::meta::FieldType;
use crate::resolver::context::{ReadContext, WriteContext};
use crate::serializer::{
    read_any, read_element, read_tracked_element, read_type_info, write_any, write_payload,
    write_tracked_element, write_type_info, ElemSource,
};
use crate::types;
use crate::value::{RuntimeType, Value};

pub(crate) const TRACKING_REF: u8 = 0b1;
pub(crate) const HAS_NULL: u8 = 0b10;
pub(crate) const DECL_ELEMENT_TYPE: u8 = 0b100;
pub(crate) const NOT_SAME_TYPE: u8 = 0b1000;

/// True when a declared element type is concrete enough for the raw payload
/// path: a builtin kind matching every element's runtime kind. Dynamic
/// kinds keep their self-describing encoding.
fn is_declared_match(declared: Option<&FieldType>, runtime: &RuntimeType) -> bool {
    declared.is_some_and(|ft| {
        !types::is_dynamic_field_kind(ft.kind()) && ft.kind() == runtime.kind
    })
}

pub(crate) fn write_collection(
    ctx: &mut WriteContext,
    items: &[Value],
    declared_elem: Option<&FieldType>,
) -> Result<(), Error> {
    ctx.writer.write_varuint32(items.len() as u32);
    if items.is_empty() {
        return Ok(());
    }

    // elements are same-typed only if none is null and every runtime type
    // (kind + user type key) matches the first
    let has_null = items.iter().any(Value::is_null);
    let mut shared: Option<RuntimeType> = None;
    let mut homogeneous = !has_null;
    if homogeneous {
        for item in items {
            let runtime = item
                .runtime_type(ctx.mode)
                .expect("non-null value has a runtime type");
            match &shared {
                None => shared = Some(runtime),
                Some(first) if *first != runtime => {
                    homogeneous = false;
                    break;
                }
                Some(_) => {}
            }
        }
    }

    if !homogeneous {
        let mut header = NOT_SAME_TYPE;
        if has_null {
            header |= HAS_NULL;
        }
        ctx.writer.write_u8(header);
        for item in items {
            write_any(ctx, item)?;
        }
        return Ok(());
    }

    let shared = shared.expect("non-empty homogeneous collection");
    let tracked = ctx.track_ref && items.iter().any(Value::is_ref);
    let mut header = 0u8;
    if tracked {
        header |= TRACKING_REF;
    }
    if is_declared_match(declared_elem, &shared) {
        header |= DECL_ELEMENT_TYPE;
        ctx.writer.write_u8(header);
    } else {
        ctx.writer.write_u8(header);
        write_type_info(ctx, &items[0])?;
    }
    for item in items {
        if tracked {
            write_tracked_element(ctx, item)?;
        } else {
            write_payload(ctx, item)?;
        }
    }
    Ok(())
}

pub(crate) fn read_collection(
    ctx: &mut ReadContext,
    declared_elem: Option<&FieldType>,
) -> Result<Vec<Value>, Error> {
    let len = ctx.reader.read_varuint32()? as usize;
    if len == 0 {
        return Ok(vec![]);
    }
    let header = ctx.reader.read_u8()?;
    if header & (NOT_SAME_TYPE | HAS_NULL) != 0 {
        return (0..len).map(|_| read_any(ctx)).collect();
    }
    let source = if header & DECL_ELEMENT_TYPE != 0 {
        let ft = declared_elem.ok_or_else(|| {
            Error::invalid_data(
                "collection claims a statically declared element type but none is known here",
            )
        })?;
        ElemSource::Declared(ft)
    } else {
        ElemSource::Wire(read_type_info(ctx)?)
    };
    let tracked = header & TRACKING_REF != 0;
    let mut items = Vec::with_capacity(len);
    for _ in 0..len {
        let item = if tracked {
            read_tracked_element(ctx, &source)?
        } else {
            read_element(ctx, &source)?
        };
        items.push(item);
    }
    Ok(items)
}
