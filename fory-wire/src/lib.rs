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

//! # Fory wire-format core
//!
//! The language-independent heart of the Fory cross-language serialization
//! protocol: a compact, self-describing binary encoding for primitives,
//! strings, collections, maps, enums, tagged unions and user structs, with
//! bit-exact agreement required between independent implementations.
//!
//! ## Architecture
//!
//! - **`fory`**: the configured instance - registration plus
//!   `serialize`/`deserialize`
//! - **`value`**: the dynamic [`Value`] model bindings feed into the codec
//! - **`buffer`**: little-endian Writer/Reader with varint/zigzag support
//! - **`serializer`**: one codec function per wire kind, `match`-dispatched
//! - **`meta`**: TypeMeta encoding and the structural hash
//! - **`resolver`**: the type registry and per-pass reference tables
//! - **`types`**: the shared wire type id table
//! - **`error`**: the closed error taxonomy
//!
//! ## Compatibility modes
//!
//! - **Schema-consistent** (default): peers must declare identical structs,
//!   verified by a 32-bit structural hash; fields travel in a canonical
//!   wire order with no names attached.
//! - **Compatible**: each struct type ships its field metadata once per
//!   payload, so peers may add, remove or reorder fields; unknown fields
//!   are skipped, missing ones take their defaults.
//!
//! ## Reference tracking
//!
//! With tracking on (default), shared [`Value::Ref`] graphs - including
//! cycles - serialize each object once and back-reference it afterwards.
//! With tracking off, shared values degrade to independent copies.
//!
//! Field discovery is deliberately out of scope: a binding (derive macro,
//! reflection, manual registration) supplies each struct's ordered
//! [`FieldInfo`] list and converts native objects to [`Value`] trees.

pub mod buffer;
pub mod error;
pub mod fory;
pub mod meta;
pub mod resolver;
mod serializer;
pub mod types;
pub mod value;

pub use error::Error;
pub use fory::Fory;
pub use meta::{compute_struct_hash, FieldInfo, FieldType};
pub use types::{Mode, RefFlag, TypeId};
pub use value::{SharedValue, TypeKey, Value};
