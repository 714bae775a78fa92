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

//! Per-pass state. A context is exclusive to one top-level serialize or
//! deserialize invocation and must not be shared across concurrent passes.

use crate::buffer::{Reader, Writer};
use crate::error::Error;
use crate::meta::TypeMeta;
use crate::resolver::ref_resolver::{RefReader, RefWriter};
use crate::resolver::type_resolver::{TypeEntry, TypeResolver};
use crate::types::Mode;
use crate::value::TypeKey;
use std::collections::HashMap;
use std::rc::Rc;

pub struct WriteContext<'a> {
    pub writer: Writer,
    pub(crate) resolver: &'a TypeResolver,
    pub(crate) mode: Mode,
    pub(crate) track_ref: bool,
    pub(crate) ref_writer: RefWriter,
    /// Types whose TypeMeta blob was already written in this pass.
    meta_indices: HashMap<TypeKey, u32>,
}

impl<'a> WriteContext<'a> {
    pub(crate) fn new(resolver: &'a TypeResolver, mode: Mode, track_ref: bool) -> WriteContext<'a> {
        WriteContext {
            writer: Writer::default(),
            resolver,
            mode,
            track_ref,
            ref_writer: RefWriter::new(),
            meta_indices: HashMap::new(),
        }
    }

    /// Writes the pass-local meta index for a compatible struct type; on the
    /// type's first use the full TypeMeta blob follows the index inline.
    pub(crate) fn write_meta_for(&mut self, entry: &TypeEntry) -> Result<(), Error> {
        if let Some(&index) = self.meta_indices.get(&entry.key) {
            self.writer.write_varuint32(index);
            return Ok(());
        }
        let index = self.meta_indices.len() as u32;
        self.meta_indices.insert(entry.key.clone(), index);
        self.writer.write_varuint32(index);
        let info = entry.struct_info().ok_or_else(|| {
            Error::invalid_data(format!(
                "type `{}` is not a struct, cannot write field metadata",
                entry.type_name
            ))
        })?;
        self.writer.write_bytes(&info.meta_bytes);
        Ok(())
    }
}

pub struct ReadContext<'a, 'bf> {
    pub reader: Reader<'bf>,
    pub(crate) resolver: &'a TypeResolver,
    pub(crate) mode: Mode,
    pub(crate) track_ref: bool,
    pub(crate) ref_reader: RefReader,
    /// TypeMeta blobs decoded so far in this pass, by first-use order.
    metas: Vec<Rc<TypeMeta>>,
}

impl<'a, 'bf> ReadContext<'a, 'bf> {
    pub(crate) fn new(
        resolver: &'a TypeResolver,
        mode: Mode,
        track_ref: bool,
        bf: &'bf [u8],
    ) -> ReadContext<'a, 'bf> {
        ReadContext {
            reader: Reader::new(bf),
            resolver,
            mode,
            track_ref,
            ref_reader: RefReader::new(),
            metas: Vec::new(),
        }
    }

    /// Mirror of [`WriteContext::write_meta_for`]: an index equal to the
    /// table size announces an inline blob; smaller indices are back
    /// references; anything else is corrupt.
    pub(crate) fn read_meta(&mut self) -> Result<Rc<TypeMeta>, Error> {
        let index = self.reader.read_varuint32()? as usize;
        if index == self.metas.len() {
            let meta = Rc::new(TypeMeta::from_bytes(&mut self.reader)?);
            self.metas.push(meta.clone());
            Ok(meta)
        } else if let Some(meta) = self.metas.get(index) {
            Ok(meta.clone())
        } else {
            Err(Error::invalid_data(format!(
                "meta index {index} skips ahead of the {} metas seen so far",
                self.metas.len()
            )))
        }
    }
}
