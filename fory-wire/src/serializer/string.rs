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

use crate::buffer::{Reader, Writer};
use crate::ensure;
use crate::error::Error;

enum StrEncoding {
    Latin1 = 0,
    Utf16 = 1,
    Utf8 = 2,
}

/// Writes the string header `(byte_length << 2) | encoding` followed by the
/// raw bytes. The writer picks the narrowest encoding that round-trips the
/// code points; readers must accept all three regardless.
pub(crate) fn write_string(writer: &mut Writer, s: &str) {
    if s.chars().all(|c| (c as u32) <= 0xFF) {
        let len = s.chars().count() as u64;
        writer.write_varuint36_small((len << 2) | StrEncoding::Latin1 as u64);
        for c in s.chars() {
            writer.write_u8(c as u32 as u8);
        }
    } else if s.chars().all(|c| (c as u32) <= 0xFFFF) {
        // no code point needs a surrogate pair, so UTF-16 is fixed-width
        let units: Vec<u16> = s.encode_utf16().collect();
        writer.write_varuint36_small(((units.len() as u64 * 2) << 2) | StrEncoding::Utf16 as u64);
        for unit in units {
            writer.write_u16(unit);
        }
    } else {
        writer.write_varuint36_small(((s.len() as u64) << 2) | StrEncoding::Utf8 as u64);
        writer.write_bytes(s.as_bytes());
    }
}

pub(crate) fn read_string(reader: &mut Reader) -> Result<String, Error> {
    let header = reader.read_varuint36small()?;
    let len = (header >> 2) as usize;
    match header & 0b11 {
        x if x == StrEncoding::Latin1 as u64 => {
            let bytes = reader.read_bytes(len)?;
            Ok(bytes.iter().map(|&b| b as char).collect())
        }
        x if x == StrEncoding::Utf16 as u64 => {
            ensure!(
                len % 2 == 0,
                Error::invalid_data(format!("odd UTF-16 byte length: {len}"))
            );
            let bytes = reader.read_bytes(len)?;
            let units: Vec<u16> = bytes
                .chunks_exact(2)
                .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16(&units)
                .map_err(|_| Error::invalid_data("malformed UTF-16 string payload"))
        }
        x if x == StrEncoding::Utf8 as u64 => {
            let bytes = reader.read_bytes(len)?;
            std::str::from_utf8(bytes)
                .map(|s| s.to_string())
                .map_err(|_| Error::invalid_data("malformed UTF-8 string payload"))
        }
        tag => Err(Error::invalid_data(format!(
            "unknown string encoding tag: {tag}"
        ))),
    }
}
