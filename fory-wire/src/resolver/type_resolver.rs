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

//! The type registry: binds application types to numeric ids or
//! namespace-qualified names and caches everything a pass needs to read or
//! write them.
//!
//! Registration happens up front and takes `&mut`; wire order, both
//! structural hashes and the encoded TypeMeta bytes are derived eagerly, so
//! the registry is immutable while passes run and concurrent read-only
//! passes over one instance cannot race.

use crate::error::Error;
use crate::meta::{
    compute_struct_hash, sort_field_infos, FieldInfo, FieldType, MetaString, TypeMeta,
    NAMESPACE_ENCODER, NAMESPACE_ENCODINGS, TYPE_NAME_ENCODER, TYPE_NAME_ENCODINGS,
};
use crate::types;
use crate::value::TypeKey;
use std::collections::HashMap;
use std::rc::Rc;

/// Everything the codec caches about one registered struct type.
pub(crate) struct StructInfo {
    /// Fields in declaration order, as supplied by the binding layer.
    pub fields: Vec<FieldInfo>,
    /// Fields in wire order, each carrying its declaration index.
    pub sorted: Vec<(usize, FieldInfo)>,
    /// Field name -> declaration index.
    pub field_index: HashMap<String, usize>,
    pub hash_untracked: i32,
    pub hash_tracked: i32,
    /// Pre-encoded TypeMeta blob shipped in compatible mode.
    pub meta_bytes: Vec<u8>,
}

impl StructInfo {
    pub fn hash(&self, track_ref: bool) -> i32 {
        if track_ref {
            self.hash_tracked
        } else {
            self.hash_untracked
        }
    }
}

pub(crate) enum TypeDef {
    Struct(StructInfo),
    Enum { variants: Vec<String> },
    Union { cases: Vec<FieldType> },
    Ext,
}

pub(crate) struct TypeEntry {
    pub key: TypeKey,
    /// Display name for diagnostics; by-name registrations reuse the wire
    /// type name.
    pub type_name: String,
    pub namespace_ms: MetaString,
    pub type_name_ms: MetaString,
    pub def: TypeDef,
}

impl TypeEntry {
    pub fn struct_info(&self) -> Option<&StructInfo> {
        match &self.def {
            TypeDef::Struct(info) => Some(info),
            _ => None,
        }
    }

    /// The unnamed base kind this entry serializes as in schema-consistent
    /// mode; named-ness and compatible mode adjust it at write time.
    pub fn base_kind(&self) -> u32 {
        match &self.def {
            TypeDef::Struct(_) => types::STRUCT,
            TypeDef::Enum { .. } => types::ENUM,
            TypeDef::Union { .. } => types::TYPED_UNION,
            TypeDef::Ext => types::EXT,
        }
    }
}

#[derive(Default)]
pub struct TypeResolver {
    by_id: HashMap<u32, Rc<TypeEntry>>,
    by_name: HashMap<(String, String), Rc<TypeEntry>>,
}

impl TypeResolver {
    pub(crate) fn register_struct(
        &mut self,
        key: TypeKey,
        type_name: &str,
        fields: Vec<FieldInfo>,
    ) -> Result<(), Error> {
        let mut field_index = HashMap::with_capacity(fields.len());
        for (idx, field) in fields.iter().enumerate() {
            if field_index.insert(field.name.clone(), idx).is_some() {
                return Err(Error::invalid_data(format!(
                    "duplicate field name `{}` in struct `{type_name}`",
                    field.name
                )));
            }
        }
        let sorted_infos = sort_field_infos(fields.clone());
        let sorted: Vec<(usize, FieldInfo)> = sorted_infos
            .iter()
            .cloned()
            .map(|info| (field_index[&info.name], info))
            .collect();
        let (namespace_ms, type_name_ms) = Self::encode_names(&key, type_name)?;
        let user_type_id = match key {
            TypeKey::Id(id) => id,
            TypeKey::Named { .. } => 0,
        };
        let meta_bytes = TypeMeta::from_fields(
            user_type_id,
            namespace_ms.clone(),
            type_name_ms.clone(),
            key.is_named(),
            sorted_infos,
        )
        .to_bytes()?;
        let info = StructInfo {
            hash_untracked: compute_struct_hash(&fields, false),
            hash_tracked: compute_struct_hash(&fields, true),
            fields,
            sorted,
            field_index,
            meta_bytes,
        };
        self.insert(TypeEntry {
            key,
            type_name: type_name.to_string(),
            namespace_ms,
            type_name_ms,
            def: TypeDef::Struct(info),
        })
    }

    pub(crate) fn register_enum(
        &mut self,
        key: TypeKey,
        type_name: &str,
        variants: Vec<String>,
    ) -> Result<(), Error> {
        let (namespace_ms, type_name_ms) = Self::encode_names(&key, type_name)?;
        self.insert(TypeEntry {
            key,
            type_name: type_name.to_string(),
            namespace_ms,
            type_name_ms,
            def: TypeDef::Enum { variants },
        })
    }

    pub(crate) fn register_union(
        &mut self,
        key: TypeKey,
        type_name: &str,
        cases: Vec<FieldType>,
    ) -> Result<(), Error> {
        let (namespace_ms, type_name_ms) = Self::encode_names(&key, type_name)?;
        self.insert(TypeEntry {
            key,
            type_name: type_name.to_string(),
            namespace_ms,
            type_name_ms,
            def: TypeDef::Union { cases },
        })
    }

    pub(crate) fn register_ext(&mut self, key: TypeKey, type_name: &str) -> Result<(), Error> {
        let (namespace_ms, type_name_ms) = Self::encode_names(&key, type_name)?;
        self.insert(TypeEntry {
            key,
            type_name: type_name.to_string(),
            namespace_ms,
            type_name_ms,
            def: TypeDef::Ext,
        })
    }

    fn encode_names(key: &TypeKey, type_name: &str) -> Result<(MetaString, MetaString), Error> {
        match key {
            TypeKey::Id(_) => Ok((MetaString::default(), MetaString::default())),
            TypeKey::Named {
                namespace,
                type_name: wire_name,
            } => {
                debug_assert_eq!(wire_name, type_name);
                let namespace_ms =
                    NAMESPACE_ENCODER.encode_with_encodings(namespace, NAMESPACE_ENCODINGS)?;
                let type_name_ms =
                    TYPE_NAME_ENCODER.encode_with_encodings(wire_name, TYPE_NAME_ENCODINGS)?;
                Ok((namespace_ms, type_name_ms))
            }
        }
    }

    fn insert(&mut self, entry: TypeEntry) -> Result<(), Error> {
        match &entry.key {
            TypeKey::Id(id) => {
                if self.by_id.contains_key(id) {
                    return Err(Error::duplicate_registration(format!(
                        "type id {id} is already registered"
                    )));
                }
                self.by_id.insert(*id, Rc::new(entry));
            }
            TypeKey::Named {
                namespace,
                type_name,
            } => {
                let map_key = (namespace.clone(), type_name.clone());
                if self.by_name.contains_key(&map_key) {
                    return Err(Error::duplicate_registration(format!(
                        "type name `{namespace}.{type_name}` is already registered"
                    )));
                }
                self.by_name.insert(map_key, Rc::new(entry));
            }
        }
        Ok(())
    }

    pub(crate) fn get(&self, key: &TypeKey) -> Option<&Rc<TypeEntry>> {
        match key {
            TypeKey::Id(id) => self.by_id.get(id),
            TypeKey::Named {
                namespace,
                type_name,
            } => self
                .by_name
                .get(&(namespace.clone(), type_name.clone())),
        }
    }

    pub(crate) fn get_by_id(&self, user_type_id: u32) -> Option<&Rc<TypeEntry>> {
        self.by_id.get(&user_type_id)
    }

    pub(crate) fn get_by_name(&self, namespace: &str, type_name: &str) -> Option<&Rc<TypeEntry>> {
        self.by_name
            .get(&(namespace.to_string(), type_name.to_string()))
    }
}
