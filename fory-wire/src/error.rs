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

use std::borrow::Cow;

use thiserror::Error;

/// Compile-time flag: set `FORY_PANIC_ON_ERROR=1` when building to make every
/// error constructor panic at the call site instead of returning, which turns
/// a propagated error into a full backtrace during debugging.
pub const PANIC_ON_ERROR: bool = option_env!("FORY_PANIC_ON_ERROR").is_some();

/// Error type for all serialization and deserialization operations.
///
/// Construct variants through the static constructor functions
/// ([`Error::invalid_data`], [`Error::unknown_type`], ...) rather than the
/// enum syntax; the constructors honor `FORY_PANIC_ON_ERROR` and keep call
/// sites uniform.
///
/// None of these errors is retried internally: every one aborts the current
/// serialize/deserialize pass and propagates synchronously to the caller.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// A wire type id did not match the locally expected type id.
    #[error("Type mismatch: expected type id {0}, got {1}")]
    TypeMismatch(u32, u32),

    /// A read crossed the end of the input buffer.
    #[error("Buffer out of bound: {0} + {1} > {2}")]
    BufferOutOfBound(usize, usize, usize),

    /// Malformed or truncated bytes: bad varint, bad flag byte, unrecognized
    /// encoding selector, trailing garbage.
    #[error("{0}")]
    InvalidData(Cow<'static, str>),

    /// Schema-consistent mode only: the peer's struct definition hashes
    /// differently from the local one.
    #[error("{0}")]
    SchemaHashMismatch(Cow<'static, str>),

    /// A wire type id or type name has no local registration.
    #[error("{0}")]
    UnknownType(Cow<'static, str>),

    /// A back-reference pointed at an id that was never registered during
    /// this pass.
    #[error("{0}")]
    DanglingReference(Cow<'static, str>),

    /// The numeric id or namespace/name is already bound to another type in
    /// this registry. Raised at registration time, never during a pass.
    #[error("{0}")]
    DuplicateRegistration(Cow<'static, str>),

    /// An enum ordinal outside the registered case list.
    #[error("{0}")]
    InvalidEnumValue(Cow<'static, str>),
}

macro_rules! constructor {
    ($(#[$doc:meta])* $name:ident => $variant:ident) => {
        $(#[$doc])*
        #[inline(always)]
        #[cold]
        #[track_caller]
        pub fn $name<S: Into<Cow<'static, str>>>(s: S) -> Self {
            let err = Error::$variant(s.into());
            if PANIC_ON_ERROR {
                panic!("FORY_PANIC_ON_ERROR: {}", err);
            }
            err
        }
    };
}

impl Error {
    /// Creates a new [`Error::TypeMismatch`] with the expected and actual ids.
    #[inline(always)]
    #[cold]
    #[track_caller]
    pub fn type_mismatch(expected: u32, actual: u32) -> Self {
        let err = Error::TypeMismatch(expected, actual);
        if PANIC_ON_ERROR {
            panic!("FORY_PANIC_ON_ERROR: {}", err);
        }
        err
    }

    /// Creates a new [`Error::BufferOutOfBound`] with the given bounds.
    #[inline(always)]
    #[cold]
    #[track_caller]
    pub fn buffer_out_of_bound(offset: usize, length: usize, capacity: usize) -> Self {
        let err = Error::BufferOutOfBound(offset, length, capacity);
        if PANIC_ON_ERROR {
            panic!("FORY_PANIC_ON_ERROR: {}", err);
        }
        err
    }

    constructor! {
        /// Creates a new [`Error::InvalidData`] from a string or static message.
        invalid_data => InvalidData
    }
    constructor! {
        /// Creates a new [`Error::SchemaHashMismatch`].
        schema_hash_mismatch => SchemaHashMismatch
    }
    constructor! {
        /// Creates a new [`Error::UnknownType`].
        unknown_type => UnknownType
    }
    constructor! {
        /// Creates a new [`Error::DanglingReference`].
        dangling_reference => DanglingReference
    }
    constructor! {
        /// Creates a new [`Error::DuplicateRegistration`].
        duplicate_registration => DuplicateRegistration
    }
    constructor! {
        /// Creates a new [`Error::InvalidEnumValue`].
        invalid_enum_value => InvalidEnumValue
    }
}

/// Ensures a condition holds; otherwise returns the given [`enum@Error`].
///
/// ```
/// use fory_wire::ensure;
/// use fory_wire::error::Error;
///
/// fn check(n: i32) -> Result<(), Error> {
///     ensure!(n > 0, Error::invalid_data("value must be positive"));
///     Ok(())
/// }
/// ```
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !$cond {
            return Err($err);
        }
    };
}
