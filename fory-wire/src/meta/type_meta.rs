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

//! Self-contained struct metadata: field lists on the wire and the
//! structural hash that guards schema-consistent mode.

use crate::buffer::{Reader, Writer};
use crate::ensure;
use crate::error::Error;
use crate::meta::meta_string::{
    Encoding, MetaString, MetaStringDecoder, FIELD_NAME_DECODER, FIELD_NAME_ENCODER,
    NAMESPACE_DECODER, TYPE_NAME_DECODER,
};
use crate::meta::string_util::murmurhash3_x64_128;
use crate::types;

const SMALL_NUM_FIELDS_THRESHOLD: usize = 0b11111;
const REGISTER_BY_NAME_FLAG: u8 = 0b100000;
const FIELD_NAME_SIZE_THRESHOLD: usize = 0b1111;

const BIG_NAME_THRESHOLD: usize = 0b111111;

const META_SIZE_MASK: u64 = 0xfff;
const HAS_FIELDS_META_FLAG: u64 = 0b1 << 12;
const NUM_HASH_BITS: u32 = 50;

/// Seed for every structural hash; identical across language implementations.
pub const STRUCT_HASH_SEED: u64 = 47;

pub static NAMESPACE_ENCODINGS: &[Encoding] = &[
    Encoding::Utf8,
    Encoding::AllToLowerSpecial,
    Encoding::LowerUpperDigitSpecial,
];

pub static TYPE_NAME_ENCODINGS: &[Encoding] = &[
    Encoding::Utf8,
    Encoding::AllToLowerSpecial,
    Encoding::LowerUpperDigitSpecial,
    Encoding::FirstToLowerSpecial,
];

static FIELD_NAME_ENCODINGS: &[Encoding] = &[
    Encoding::Utf8,
    Encoding::AllToLowerSpecial,
    Encoding::LowerUpperDigitSpecial,
];

/// Shape of one field: wire kind (with the user type id packed above the
/// low byte for id-registered types), nullability, ref-tracking flag and
/// element/key/value descriptors for containers.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldType {
    pub type_id: u32,
    pub nullable: bool,
    pub tracking_ref: bool,
    pub generics: Vec<FieldType>,
}

impl FieldType {
    pub fn new(type_id: u32, nullable: bool) -> Self {
        FieldType {
            type_id,
            nullable,
            tracking_ref: false,
            generics: vec![],
        }
    }

    pub fn tracking(mut self) -> Self {
        self.tracking_ref = true;
        self
    }

    pub fn unknown() -> Self {
        FieldType::new(types::UNKNOWN, true)
    }

    pub fn list_of(elem: FieldType, nullable: bool) -> Self {
        FieldType {
            type_id: types::LIST,
            nullable,
            tracking_ref: false,
            generics: vec![elem],
        }
    }

    pub fn set_of(elem: FieldType, nullable: bool) -> Self {
        FieldType {
            type_id: types::SET,
            nullable,
            tracking_ref: false,
            generics: vec![elem],
        }
    }

    pub fn map_of(key: FieldType, value: FieldType, nullable: bool) -> Self {
        FieldType {
            type_id: types::MAP,
            nullable,
            tracking_ref: false,
            generics: vec![key, value],
        }
    }

    pub fn struct_of(user_type_id: u32, nullable: bool) -> Self {
        FieldType::new((user_type_id << 8) | types::STRUCT, nullable)
    }

    pub fn named_struct(nullable: bool) -> Self {
        FieldType::new(types::NAMED_STRUCT, nullable)
    }

    pub fn enum_of(user_type_id: u32, nullable: bool) -> Self {
        FieldType::new((user_type_id << 8) | types::ENUM, nullable)
    }

    pub fn named_enum(nullable: bool) -> Self {
        FieldType::new(types::NAMED_ENUM, nullable)
    }

    pub fn union_of(user_type_id: u32, nullable: bool) -> Self {
        FieldType::new((user_type_id << 8) | types::TYPED_UNION, nullable)
    }

    pub fn named_union(nullable: bool) -> Self {
        FieldType::new(types::NAMED_UNION, nullable)
    }

    pub fn ext_of(user_type_id: u32, nullable: bool) -> Self {
        FieldType::new((user_type_id << 8) | types::EXT, nullable)
    }

    pub fn named_ext(nullable: bool) -> Self {
        FieldType::new(types::NAMED_EXT, nullable)
    }

    pub fn kind(&self) -> u32 {
        types::kind_of(self.type_id)
    }

    pub fn user_type_id(&self) -> u32 {
        types::user_id_of(self.type_id)
    }

    fn to_bytes(&self, writer: &mut Writer, write_flags: bool) {
        if write_flags {
            let header = (self.type_id << 2)
                | u32::from(self.nullable) << 1
                | u32::from(self.tracking_ref);
            writer.write_varuint32(header);
        } else {
            writer.write_varuint32(self.type_id);
        }
        match self.kind() {
            x if x == types::LIST || x == types::SET => {
                let generic = self.generics.first().cloned().unwrap_or_else(FieldType::unknown);
                generic.to_bytes(writer, true);
            }
            x if x == types::MAP => {
                let key = self.generics.first().cloned().unwrap_or_else(FieldType::unknown);
                let value = self.generics.get(1).cloned().unwrap_or_else(FieldType::unknown);
                key.to_bytes(writer, true);
                value.to_bytes(writer, true);
            }
            _ => {}
        }
    }

    fn from_bytes(
        reader: &mut Reader,
        read_flags: bool,
        nullable: bool,
        tracking_ref: bool,
    ) -> Result<Self, Error> {
        let header = reader.read_varuint32()?;
        let (type_id, nullable, tracking_ref) = if read_flags {
            (header >> 2, (header & 2) != 0, (header & 1) != 0)
        } else {
            (header, nullable, tracking_ref)
        };
        let generics = match types::kind_of(type_id) {
            x if x == types::LIST || x == types::SET => {
                vec![Self::from_bytes(reader, true, false, false)?]
            }
            x if x == types::MAP => vec![
                Self::from_bytes(reader, true, false, false)?,
                Self::from_bytes(reader, true, false, false)?,
            ],
            _ => vec![],
        };
        Ok(FieldType {
            type_id,
            nullable,
            tracking_ref,
            generics,
        })
    }
}

/// One struct field as registered by the binding layer.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldInfo {
    pub name: String,
    /// Compact numeric alias for the name; `-1` when unused. Participates in
    /// the structural hash but is never written into field metadata.
    pub tag_id: i16,
    pub field_type: FieldType,
}

impl FieldInfo {
    pub fn new(name: &str, field_type: FieldType) -> FieldInfo {
        FieldInfo {
            name: name.to_string(),
            tag_id: -1,
            field_type,
        }
    }

    pub fn with_tag_id(mut self, tag_id: i16) -> Self {
        self.tag_id = tag_id;
        self
    }

    fn u8_to_encoding(value: u8) -> Result<Encoding, Error> {
        FIELD_NAME_ENCODINGS
            .get(value as usize)
            .copied()
            .ok_or_else(|| {
                Error::invalid_data(format!(
                    "unsupported field name encoding selector in type meta: {value}"
                ))
            })
    }

    // field bytes: | header | field type | field name |
    // header: | encoding:2 bits | name size:4 bits | nullable:1 bit | tracking ref:1 bit |
    fn to_bytes(&self, writer: &mut Writer) -> Result<(), Error> {
        ensure!(
            !self.name.is_empty(),
            Error::invalid_data("field name must not be empty")
        );
        let meta_string =
            FIELD_NAME_ENCODER.encode_with_encodings(&self.name, FIELD_NAME_ENCODINGS)?;
        let name_size = meta_string.bytes.len() - 1;
        let mut header = (name_size.min(FIELD_NAME_SIZE_THRESHOLD) as u8) << 2;
        if self.field_type.nullable {
            header |= 2;
        }
        if self.field_type.tracking_ref {
            header |= 1;
        }
        let encoding_idx = FIELD_NAME_ENCODINGS
            .iter()
            .position(|x| *x == meta_string.encoding)
            .unwrap() as u8;
        header |= encoding_idx << 6;
        writer.write_u8(header);
        if name_size >= FIELD_NAME_SIZE_THRESHOLD {
            writer.write_varuint32((name_size - FIELD_NAME_SIZE_THRESHOLD) as u32);
        }
        self.field_type.to_bytes(writer, false);
        writer.write_bytes(&meta_string.bytes);
        Ok(())
    }

    fn from_bytes(reader: &mut Reader) -> Result<FieldInfo, Error> {
        let header = reader.read_u8()?;
        let nullable = (header & 2) != 0;
        let tracking_ref = (header & 1) != 0;
        let encoding = Self::u8_to_encoding((header >> 6) & 0b11)?;
        let mut name_size = ((header >> 2) & FIELD_NAME_SIZE_THRESHOLD as u8) as usize;
        if name_size == FIELD_NAME_SIZE_THRESHOLD {
            name_size += reader.read_varuint32()? as usize;
        }
        name_size += 1;
        let field_type = FieldType::from_bytes(reader, false, nullable, tracking_ref)?;
        let name_bytes = reader.read_bytes(name_size)?;
        let name = FIELD_NAME_DECODER.decode(name_bytes, encoding)?;
        Ok(FieldInfo {
            name,
            tag_id: -1,
            field_type,
        })
    }
}

pub(crate) fn write_meta_name(writer: &mut Writer, name: &MetaString, encodings: &[Encoding]) {
    let encoding_idx = encodings
        .iter()
        .position(|x| *x == name.encoding)
        .expect("encoding not in selector table") as u8;
    let bytes = name.bytes.as_slice();
    if bytes.len() >= BIG_NAME_THRESHOLD {
        writer.write_u8((BIG_NAME_THRESHOLD << 2) as u8 | encoding_idx);
        writer.write_varuint32((bytes.len() - BIG_NAME_THRESHOLD) as u32);
    } else {
        writer.write_u8((bytes.len() << 2) as u8 | encoding_idx);
    }
    writer.write_bytes(bytes);
}

pub(crate) fn read_meta_name(
    reader: &mut Reader,
    decoder: &MetaStringDecoder,
    encodings: &[Encoding],
) -> Result<String, Error> {
    let header = reader.read_u8()?;
    let encoding_idx = (header & 0b11) as usize;
    let encoding = *encodings.get(encoding_idx).ok_or_else(|| {
        Error::invalid_data(format!(
            "unsupported name encoding selector in type meta: {encoding_idx}"
        ))
    })?;
    let mut length = (header >> 2) as usize;
    if length >= BIG_NAME_THRESHOLD {
        length += reader.read_varuint32()? as usize;
    }
    let bytes = reader.read_bytes(length)?;
    decoder.decode(bytes, encoding)
}

/// Encoded metadata of one struct type: identity plus the field list in
/// wire order. This is what compatible mode ships next to the payload.
#[derive(Debug)]
pub struct TypeMeta {
    user_type_id: u32,
    namespace: MetaString,
    type_name: MetaString,
    register_by_name: bool,
    field_infos: Vec<FieldInfo>,
}

impl TypeMeta {
    pub fn get_user_type_id(&self) -> u32 {
        self.user_type_id
    }

    pub fn get_namespace(&self) -> &str {
        &self.namespace.original
    }

    pub fn get_type_name(&self) -> &str {
        &self.type_name.original
    }

    pub fn is_register_by_name(&self) -> bool {
        self.register_by_name
    }

    pub fn get_field_infos(&self) -> &[FieldInfo] {
        &self.field_infos
    }

    pub(crate) fn from_fields(
        user_type_id: u32,
        namespace: MetaString,
        type_name: MetaString,
        register_by_name: bool,
        field_infos: Vec<FieldInfo>,
    ) -> TypeMeta {
        TypeMeta {
            user_type_id,
            namespace,
            type_name,
            register_by_name,
            field_infos,
        }
    }

    // layer bytes: | meta header | type identity | fields meta |
    // meta header: | unused:2 bits | register_by_name:1 bit | num fields:5 bits |
    fn layer_to_bytes(&self) -> Result<Vec<u8>, Error> {
        let mut writer = Writer::default();
        let num_fields = self.field_infos.len();
        let mut meta_header = num_fields.min(SMALL_NUM_FIELDS_THRESHOLD) as u8;
        if self.register_by_name {
            meta_header |= REGISTER_BY_NAME_FLAG;
        }
        writer.write_u8(meta_header);
        if num_fields >= SMALL_NUM_FIELDS_THRESHOLD {
            writer.write_varuint32((num_fields - SMALL_NUM_FIELDS_THRESHOLD) as u32);
        }
        if self.register_by_name {
            write_meta_name(&mut writer, &self.namespace, NAMESPACE_ENCODINGS);
            write_meta_name(&mut writer, &self.type_name, TYPE_NAME_ENCODINGS);
        } else {
            writer.write_varuint32(self.user_type_id);
        }
        for field in self.field_infos.iter() {
            field.to_bytes(&mut writer)?;
        }
        Ok(writer.dump())
    }

    // global binary header: | hash:50 bits | unused:1 bit | has_fields_meta:1 bit | meta_size:12 bits |
    pub(crate) fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let layer = self.layer_to_bytes()?;
        let meta_size = layer.len() as u64;
        let mut header = meta_size.min(META_SIZE_MASK);
        if !self.field_infos.is_empty() {
            header |= HAS_FIELDS_META_FLAG;
        }
        let meta_hash = murmurhash3_x64_128(&layer, STRUCT_HASH_SEED).0;
        header |= (meta_hash & ((1u64 << NUM_HASH_BITS) - 1)) << (64 - NUM_HASH_BITS);
        let mut writer = Writer::default();
        writer.write_u64(header);
        if meta_size >= META_SIZE_MASK {
            writer.write_varuint32((meta_size - META_SIZE_MASK) as u32);
        }
        writer.write_bytes(&layer);
        Ok(writer.dump())
    }

    pub(crate) fn from_bytes(reader: &mut Reader) -> Result<TypeMeta, Error> {
        let header = reader.read_u64()?;
        let meta_size = header & META_SIZE_MASK;
        if meta_size == META_SIZE_MASK {
            reader.read_varuint32()?;
        }
        let meta_header = reader.read_u8()?;
        let register_by_name = (meta_header & REGISTER_BY_NAME_FLAG) != 0;
        let mut num_fields = meta_header as usize & SMALL_NUM_FIELDS_THRESHOLD;
        if num_fields == SMALL_NUM_FIELDS_THRESHOLD {
            num_fields += reader.read_varuint32()? as usize;
        }
        let user_type_id;
        let mut namespace = MetaString::default();
        let mut type_name = MetaString::default();
        if register_by_name {
            namespace.original = read_meta_name(reader, &NAMESPACE_DECODER, NAMESPACE_ENCODINGS)?;
            type_name.original = read_meta_name(reader, &TYPE_NAME_DECODER, TYPE_NAME_ENCODINGS)?;
            user_type_id = 0;
        } else {
            user_type_id = reader.read_varuint32()?;
        }
        let mut field_infos = Vec::with_capacity(num_fields);
        for _ in 0..num_fields {
            field_infos.push(FieldInfo::from_bytes(reader)?);
        }
        Ok(TypeMeta {
            user_type_id,
            namespace,
            type_name,
            register_by_name,
            field_infos,
        })
    }
}

/// Orders fields for the wire: non-nullable primitives first (fixed-width
/// before varint, wider first), then nullable primitives, then strings,
/// then lists, sets and maps, then user types, with the field name breaking
/// every tie. Both peers derive the identical order from their own
/// declarations, so schema-consistent payloads need no field names.
pub(crate) fn sort_field_infos(field_infos: Vec<FieldInfo>) -> Vec<FieldInfo> {
    let fields_len = field_infos.len();
    let mut primitive_fields = Vec::new();
    let mut nullable_primitive_fields = Vec::new();
    let mut string_fields = Vec::new();
    let mut list_fields = Vec::new();
    let mut set_fields = Vec::new();
    let mut map_fields = Vec::new();
    let mut other_fields = Vec::new();

    for field_info in field_infos.into_iter() {
        let kind = field_info.field_type.kind();
        if types::is_primitive_kind(kind) {
            if field_info.field_type.nullable {
                nullable_primitive_fields.push(field_info);
            } else {
                primitive_fields.push(field_info);
            }
        } else if kind == types::STRING {
            string_fields.push(field_info);
        } else if kind == types::LIST {
            list_fields.push(field_info);
        } else if kind == types::SET {
            set_fields.push(field_info);
        } else if kind == types::MAP {
            map_fields.push(field_info);
        } else {
            other_fields.push(field_info);
        }
    }

    fn numeric_sorter(a: &FieldInfo, b: &FieldInfo) -> std::cmp::Ordering {
        let (a_kind, b_kind) = (a.field_type.kind(), b.field_type.kind());
        types::is_compress(a_kind)
            .cmp(&types::is_compress(b_kind)) // fixed-width first
            .then_with(|| types::primitive_size(b_kind).cmp(&types::primitive_size(a_kind)))
            .then_with(|| a_kind.cmp(&b_kind))
            .then_with(|| a.name.cmp(&b.name))
    }
    fn name_sorter(a: &FieldInfo, b: &FieldInfo) -> std::cmp::Ordering {
        a.name.cmp(&b.name)
    }
    primitive_fields.sort_by(numeric_sorter);
    nullable_primitive_fields.sort_by(numeric_sorter);
    string_fields.sort_by(name_sorter);
    list_fields.sort_by(name_sorter);
    set_fields.sort_by(name_sorter);
    map_fields.sort_by(name_sorter);
    other_fields.sort_by(name_sorter);

    let mut sorted = Vec::with_capacity(fields_len);
    sorted.extend(primitive_fields);
    sorted.extend(nullable_primitive_fields);
    sorted.extend(string_fields);
    sorted.extend(list_fields);
    sorted.extend(set_fields);
    sorted.extend(map_fields);
    sorted.extend(other_fields);
    sorted
}

/// Computes the 32-bit structural hash of a field list.
///
/// Each field contributes `"<tag_or_name>,<type_id>,<ref>,<nullable>;"` with
/// the name lower-cased and the type id normalized
/// ([`types::normalize_for_fingerprint`]); entries with a tag id sort first
/// (by the decimal tag string), the rest sort by name. The concatenation is
/// hashed with MurmurHash3 x64-128 (seed 47) and the low 32 bits of the
/// first lane, interpreted as signed, are kept. The `<ref>` flag is `1` only
/// when the field tracks references AND `track_ref` is enabled, which is why
/// callers cache one hash per tracking mode.
pub fn compute_struct_hash(field_infos: &[FieldInfo], track_ref: bool) -> i32 {
    let mut entries: Vec<(u8, String, String)> = field_infos
        .iter()
        .map(|field| {
            let type_id = types::normalize_for_fingerprint(field.field_type.kind());
            let ref_flag = u8::from(field.field_type.tracking_ref && track_ref);
            let nullable = u8::from(field.field_type.nullable);
            let (group, key) = if field.tag_id >= 0 {
                (0u8, field.tag_id.to_string())
            } else {
                (1u8, field.name.to_lowercase())
            };
            let entry = format!("{key},{type_id},{ref_flag},{nullable};");
            (group, key, entry)
        })
        .collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
    let fingerprint: String = entries.into_iter().map(|(_, _, entry)| entry).collect();
    if fingerprint.is_empty() {
        return STRUCT_HASH_SEED as i32;
    }
    let (h1, _) = murmurhash3_x64_128(fingerprint.as_bytes(), STRUCT_HASH_SEED);
    (h1 & 0xffff_ffff) as u32 as i32
}
