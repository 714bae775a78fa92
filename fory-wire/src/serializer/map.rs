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

//! Chunked MAP payloads.
//!
//! Entries are grouped into runs sharing key/value types, null-ness and ref
//! tracking. Each run costs one header byte, one size byte and at most two
//! type infos, so a large uniform map pays O(entries / 255) metadata rather
//! than O(entries). A null key or value forces a single-entry chunk with no
//! size byte.

use crate::ensure;
use crate::error::Error;
use crate::meta::FieldType;
use crate::resolver::context::{ReadContext, WriteContext};
use crate::serializer::{
    read_element, read_tracked_element, read_type_info, write_payload, write_tracked_element,
    write_type_info, ElemSource,
};
use crate::types;
use crate::value::{RuntimeType, Value};

const MAX_CHUNK_SIZE: u8 = 255;

const TRACKING_KEY_REF: u8 = 0b1;
const KEY_NULL: u8 = 0b10;
const DECL_KEY_TYPE: u8 = 0b100;
const TRACKING_VALUE_REF: u8 = 0b1000;
const VALUE_NULL: u8 = 0b10000;
const DECL_VALUE_TYPE: u8 = 0b100000;

fn write_chunk_size(ctx: &mut WriteContext, header_offset: usize, size: u8) {
    ctx.writer.set_bytes(header_offset + 1, &[size]);
}

fn is_declared_match(declared: Option<&FieldType>, runtime: &RuntimeType) -> bool {
    declared.is_some_and(|ft| {
        !types::is_dynamic_field_kind(ft.kind()) && ft.kind() == runtime.kind
    })
}

/// One side of a pending chunk profile.
#[derive(PartialEq)]
struct SideProfile {
    runtime: RuntimeType,
    tracked: bool,
}

fn side_profile(ctx: &WriteContext, value: &Value) -> SideProfile {
    SideProfile {
        runtime: value
            .runtime_type(ctx.mode)
            .expect("non-null value has a runtime type"),
        tracked: ctx.track_ref && value.is_ref(),
    }
}

fn write_side(ctx: &mut WriteContext, value: &Value, tracked: bool) -> Result<(), Error> {
    if tracked {
        write_tracked_element(ctx, value)
    } else {
        write_payload(ctx, value)
    }
}

/// Writes a single-entry chunk for an entry whose other side is null.
/// `null_flag` names the null side; `side` is the present one.
fn write_null_entry(
    ctx: &mut WriteContext,
    null_flag: u8,
    side: &Value,
    declared: Option<&FieldType>,
    tracking_flag: u8,
    decl_flag: u8,
) -> Result<(), Error> {
    let profile = side_profile(ctx, side);
    let mut header = null_flag;
    if profile.tracked {
        header |= tracking_flag;
    }
    if is_declared_match(declared, &profile.runtime) {
        header |= decl_flag;
        ctx.writer.write_u8(header);
    } else {
        ctx.writer.write_u8(header);
        write_type_info(ctx, side)?;
    }
    write_side(ctx, side, profile.tracked)
}

pub(crate) fn write_map(
    ctx: &mut WriteContext,
    entries: &[(Value, Value)],
    declared: Option<(&FieldType, &FieldType)>,
) -> Result<(), Error> {
    ctx.writer.write_varuint32(entries.len() as u32);
    if entries.is_empty() {
        return Ok(());
    }
    let (decl_key, decl_value) = match declared {
        Some((k, v)) => (Some(k), Some(v)),
        None => (None, None),
    };

    let mut header_offset = 0usize;
    let mut pair_counter: u8 = 0;
    let mut profile: Option<(SideProfile, SideProfile)> = None;

    for (key, value) in entries {
        if key.is_null() || value.is_null() {
            if pair_counter > 0 {
                write_chunk_size(ctx, header_offset, pair_counter);
                pair_counter = 0;
            }
            profile = None;
            if key.is_null() && value.is_null() {
                ctx.writer.write_u8(KEY_NULL | VALUE_NULL);
            } else if value.is_null() {
                write_null_entry(
                    ctx,
                    VALUE_NULL,
                    key,
                    decl_key,
                    TRACKING_KEY_REF,
                    DECL_KEY_TYPE,
                )?;
            } else {
                write_null_entry(
                    ctx,
                    KEY_NULL,
                    value,
                    decl_value,
                    TRACKING_VALUE_REF,
                    DECL_VALUE_TYPE,
                )?;
            }
            continue;
        }

        let entry_profile = (side_profile(ctx, key), side_profile(ctx, value));
        if profile.as_ref() != Some(&entry_profile) {
            if pair_counter > 0 {
                write_chunk_size(ctx, header_offset, pair_counter);
                pair_counter = 0;
            }
            // header byte + size byte, patched when the run ends
            header_offset = ctx.writer.skip(2);
            let mut header = 0u8;
            if entry_profile.0.tracked {
                header |= TRACKING_KEY_REF;
            }
            if entry_profile.1.tracked {
                header |= TRACKING_VALUE_REF;
            }
            if is_declared_match(decl_key, &entry_profile.0.runtime) {
                header |= DECL_KEY_TYPE;
            } else {
                write_type_info(ctx, key)?;
            }
            if is_declared_match(decl_value, &entry_profile.1.runtime) {
                header |= DECL_VALUE_TYPE;
            } else {
                write_type_info(ctx, value)?;
            }
            ctx.writer.set_bytes(header_offset, &[header]);
            profile = Some(entry_profile);
        }

        let (key_tracked, value_tracked) = {
            let p = profile.as_ref().unwrap();
            (p.0.tracked, p.1.tracked)
        };
        write_side(ctx, key, key_tracked)?;
        write_side(ctx, value, value_tracked)?;
        pair_counter += 1;
        if pair_counter == MAX_CHUNK_SIZE {
            write_chunk_size(ctx, header_offset, pair_counter);
            pair_counter = 0;
            profile = None;
        }
    }
    if pair_counter > 0 {
        write_chunk_size(ctx, header_offset, pair_counter);
    }
    Ok(())
}

fn read_source<'a>(
    ctx: &mut ReadContext,
    declared: Option<&'a FieldType>,
    decl_bit_set: bool,
) -> Result<ElemSource<'a>, Error> {
    if decl_bit_set {
        let ft = declared.ok_or_else(|| {
            Error::invalid_data(
                "map chunk claims a statically declared type but none is known here",
            )
        })?;
        Ok(ElemSource::Declared(ft))
    } else {
        Ok(ElemSource::Wire(read_type_info(ctx)?))
    }
}

fn read_side(ctx: &mut ReadContext, source: &ElemSource, tracked: bool) -> Result<Value, Error> {
    if tracked {
        read_tracked_element(ctx, source)
    } else {
        read_element(ctx, source)
    }
}

pub(crate) fn read_map(
    ctx: &mut ReadContext,
    declared: Option<(&FieldType, &FieldType)>,
) -> Result<Vec<(Value, Value)>, Error> {
    let len = ctx.reader.read_varuint32()? as usize;
    let mut entries = Vec::with_capacity(len);
    let (decl_key, decl_value) = match declared {
        Some((k, v)) => (Some(k), Some(v)),
        None => (None, None),
    };

    while entries.len() < len {
        let header = ctx.reader.read_u8()?;
        if header & KEY_NULL != 0 && header & VALUE_NULL != 0 {
            entries.push((Value::Null, Value::Null));
            continue;
        }
        if header & KEY_NULL != 0 {
            let source = read_source(ctx, decl_value, header & DECL_VALUE_TYPE != 0)?;
            let value = read_side(ctx, &source, header & TRACKING_VALUE_REF != 0)?;
            entries.push((Value::Null, value));
            continue;
        }
        if header & VALUE_NULL != 0 {
            let source = read_source(ctx, decl_key, header & DECL_KEY_TYPE != 0)?;
            let key = read_side(ctx, &source, header & TRACKING_KEY_REF != 0)?;
            entries.push((key, Value::Null));
            continue;
        }

        let chunk_size = ctx.reader.read_u8()?;
        ensure!(
            chunk_size > 0,
            Error::invalid_data("map chunk with zero entries")
        );
        let key_source = read_source(ctx, decl_key, header & DECL_KEY_TYPE != 0)?;
        let value_source = read_source(ctx, decl_value, header & DECL_VALUE_TYPE != 0)?;
        let key_tracked = header & TRACKING_KEY_REF != 0;
        let value_tracked = header & TRACKING_VALUE_REF != 0;
        ensure!(
            entries.len() + chunk_size as usize <= len,
            Error::invalid_data(format!(
                "map chunk of {chunk_size} entries overruns the declared count {len}"
            ))
        );
        for _ in 0..chunk_size {
            let key = read_side(ctx, &key_source, key_tracked)?;
            let value = read_side(ctx, &value_source, value_tracked)?;
            entries.push((key, value));
        }
    }
    Ok(entries)
}
