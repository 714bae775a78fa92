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

//! Per-pass reference tables for shared and cyclic object graphs.
//!
//! Ids are assigned in write order and consumed in the same order on read,
//! so every `RefValue` occurrence advances the sequence on both sides even
//! when the value can never be referenced again.

use crate::buffer::Writer;
use crate::error::Error;
use crate::types::RefFlag;
use crate::value::{SharedValue, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Tracks object identities during one serialization pass.
#[derive(Default)]
pub struct RefWriter {
    /// Maps pointer addresses to reference ids.
    refs: HashMap<usize, u32>,
    next_ref_id: u32,
}

impl RefWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes the ref flag for a shared value. Returns `true` when a
    /// back-reference was written and the caller must skip the payload;
    /// otherwise `RefValue` was written, the next id is bound to this
    /// object, and the payload follows.
    pub fn try_write_ref(&mut self, writer: &mut Writer, rc: &SharedValue) -> bool {
        let ptr_addr = Rc::as_ptr(rc) as usize;
        if let Some(&ref_id) = self.refs.get(&ptr_addr) {
            writer.write_i8(RefFlag::Ref as i8);
            writer.write_varuint32(ref_id);
            true
        } else {
            let ref_id = self.next_ref_id;
            self.next_ref_id += 1;
            self.refs.insert(ptr_addr, ref_id);
            writer.write_i8(RefFlag::RefValue as i8);
            false
        }
    }

    /// Consumes the next id for a `RefValue` occurrence that has no shared
    /// identity. Keeps the id sequence aligned with the reader.
    pub fn assign_anonymous_id(&mut self) -> u32 {
        let ref_id = self.next_ref_id;
        self.next_ref_id += 1;
        ref_id
    }

    pub fn reset(&mut self) {
        self.refs.clear();
        self.next_ref_id = 0;
    }
}

/// Resolves reference ids during one deserialization pass.
#[derive(Default)]
pub struct RefReader {
    refs: Vec<SharedValue>,
}

impl RefReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a placeholder under the next id and returns it. The caller
    /// decodes the payload into the placeholder afterwards; registering
    /// first is what lets a value reference itself through its own fields.
    pub fn reserve(&mut self) -> SharedValue {
        let rc: SharedValue = Rc::new(RefCell::new(Value::Null));
        self.refs.push(rc.clone());
        rc
    }

    pub fn get(&self, ref_id: u32) -> Result<SharedValue, Error> {
        self.refs.get(ref_id as usize).cloned().ok_or_else(|| {
            Error::dangling_reference(format!(
                "back-reference to unregistered id {ref_id} (only {} ids assigned)",
                self.refs.len()
            ))
        })
    }

    pub fn reset(&mut self) {
        self.refs.clear();
    }
}
