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

use crate::ensure;
use crate::error::Error;
use crate::meta::{FieldInfo, FieldType};
use crate::resolver::context::{ReadContext, WriteContext};
use crate::resolver::type_resolver::TypeResolver;
use crate::serializer;
use crate::types::Mode;
use crate::value::{TypeKey, Value};

/// One configured codec instance: a compatibility mode, a ref-tracking
/// switch, and the registry of application types.
///
/// Instances are independent; a compatible one and a schema-consistent one
/// coexist in a process without interference. Registration takes `&mut
/// self` and precomputes everything passes need, so `serialize` and
/// `deserialize` only ever read the registry; sharing one instance across
/// threads after registration is safe provided the `Value` graphs
/// themselves are not shared.
///
/// # Examples
///
/// ```
/// use fory_wire::{FieldInfo, FieldType, Fory, TypeId, Value};
///
/// let mut fory = Fory::default();
/// fory.register_struct(
///     100,
///     "Point",
///     vec![
///         FieldInfo::new("x", FieldType::new(TypeId::VARINT32 as u32, false)),
///         FieldInfo::new("y", FieldType::new(TypeId::VARINT32 as u32, false)),
///     ],
/// )
/// .unwrap();
///
/// let point = Value::Struct {
///     key: fory_wire::TypeKey::Id(100),
///     fields: vec![Value::VarInt32(3), Value::VarInt32(4)],
/// };
/// let bytes = fory.serialize(&point).unwrap();
/// assert_eq!(fory.deserialize(&bytes).unwrap(), point);
/// ```
pub struct Fory {
    mode: Mode,
    track_ref: bool,
    type_resolver: TypeResolver,
}

impl Default for Fory {
    fn default() -> Self {
        Fory {
            mode: Mode::SchemaConsistent,
            track_ref: true,
            type_resolver: TypeResolver::default(),
        }
    }
}

impl Fory {
    /// Switches between schema-consistent mode (`false`, the default:
    /// smallest wire size, peers must declare identical structs) and
    /// compatible mode (`true`: full field metadata travels with the data,
    /// peers may add/remove/reorder fields independently).
    pub fn compatible(mut self, compatible: bool) -> Self {
        self.mode = if compatible {
            Mode::Compatible
        } else {
            Mode::SchemaConsistent
        };
        self
    }

    /// Enables or disables reference tracking. With tracking off, shared
    /// values are inlined as independent copies and cyclic graphs cannot be
    /// serialized.
    pub fn track_ref(mut self, track_ref: bool) -> Self {
        self.track_ref = track_ref;
        self
    }

    pub fn get_mode(&self) -> Mode {
        self.mode
    }

    pub fn is_compatible(&self) -> bool {
        self.mode == Mode::Compatible
    }

    pub fn is_track_ref(&self) -> bool {
        self.track_ref
    }

    /// Registers a struct type under a numeric id. `fields` is the
    /// declaration-order field list produced by the binding layer; wire
    /// order and both structural hashes are derived here.
    pub fn register_struct(
        &mut self,
        type_id: u32,
        type_name: &str,
        fields: Vec<FieldInfo>,
    ) -> Result<(), Error> {
        ensure!(
            type_id < (1 << 24),
            Error::invalid_data(format!("user type id {type_id} exceeds 24 bits"))
        );
        self.type_resolver
            .register_struct(TypeKey::Id(type_id), type_name, fields)
    }

    /// Registers a struct type under a namespace-qualified name, the
    /// preferred form for cross-language use.
    pub fn register_struct_by_name(
        &mut self,
        namespace: &str,
        type_name: &str,
        fields: Vec<FieldInfo>,
    ) -> Result<(), Error> {
        self.type_resolver
            .register_struct(TypeKey::named(namespace, type_name), type_name, fields)
    }

    /// Registers an enum type; the wire carries the zero-based ordinal into
    /// `variants`.
    pub fn register_enum(
        &mut self,
        type_id: u32,
        type_name: &str,
        variants: &[&str],
    ) -> Result<(), Error> {
        self.type_resolver.register_enum(
            TypeKey::Id(type_id),
            type_name,
            variants.iter().map(|v| v.to_string()).collect(),
        )
    }

    pub fn register_enum_by_name(
        &mut self,
        namespace: &str,
        type_name: &str,
        variants: &[&str],
    ) -> Result<(), Error> {
        self.type_resolver.register_enum(
            TypeKey::named(namespace, type_name),
            type_name,
            variants.iter().map(|v| v.to_string()).collect(),
        )
    }

    /// Registers a tagged union; `cases` declares one descriptor per case
    /// tag, in tag order.
    pub fn register_union(
        &mut self,
        type_id: u32,
        type_name: &str,
        cases: Vec<FieldType>,
    ) -> Result<(), Error> {
        self.type_resolver
            .register_union(TypeKey::Id(type_id), type_name, cases)
    }

    pub fn register_union_by_name(
        &mut self,
        namespace: &str,
        type_name: &str,
        cases: Vec<FieldType>,
    ) -> Result<(), Error> {
        self.type_resolver
            .register_union(TypeKey::named(namespace, type_name), type_name, cases)
    }

    /// Registers an ext type whose payload is produced and consumed by a
    /// binding-level serializer as an opaque byte string.
    pub fn register_ext(&mut self, type_id: u32, type_name: &str) -> Result<(), Error> {
        self.type_resolver.register_ext(TypeKey::Id(type_id), type_name)
    }

    pub fn register_ext_by_name(
        &mut self,
        namespace: &str,
        type_name: &str,
    ) -> Result<(), Error> {
        self.type_resolver
            .register_ext(TypeKey::named(namespace, type_name), type_name)
    }

    /// Serializes a root value into a self-contained byte payload.
    pub fn serialize(&self, value: &Value) -> Result<Vec<u8>, Error> {
        let mut context = WriteContext::new(&self.type_resolver, self.mode, self.track_ref);
        serializer::write_any(&mut context, value)?;
        Ok(context.writer.dump())
    }

    /// Deserializes a payload produced by [`Fory::serialize`] on a peer
    /// configured with the same mode and ref-tracking setting.
    pub fn deserialize(&self, bf: &[u8]) -> Result<Value, Error> {
        let mut context = ReadContext::new(&self.type_resolver, self.mode, self.track_ref, bf);
        let result = serializer::read_any(&mut context)?;
        let remaining = context.reader.remaining();
        ensure!(
            remaining == 0,
            Error::invalid_data(format!("{remaining} trailing bytes after the root value"))
        );
        Ok(result)
    }
}
