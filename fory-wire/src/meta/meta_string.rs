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

//! Compact encodings for namespaces, type names and field names.
//!
//! Identifier-shaped strings pack into 5 or 6 bits per character; arbitrary
//! strings fall back to UTF-8. The chosen encoding travels next to the bytes
//! as a small selector index, so readers never guess.

use crate::ensure;
use crate::error::Error;
use crate::meta::string_util;

const SHORT_MAX_VALUE: usize = i16::MAX as usize;

pub static NAMESPACE_ENCODER: MetaStringEncoder = MetaStringEncoder::new('.', '_');
pub static TYPE_NAME_ENCODER: MetaStringEncoder = MetaStringEncoder::new('$', '_');
pub static FIELD_NAME_ENCODER: MetaStringEncoder = MetaStringEncoder::new('$', '_');

pub static NAMESPACE_DECODER: MetaStringDecoder = MetaStringDecoder::new('.', '_');
pub static TYPE_NAME_DECODER: MetaStringDecoder = MetaStringDecoder::new('$', '_');
pub static FIELD_NAME_DECODER: MetaStringDecoder = MetaStringDecoder::new('$', '_');

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Default)]
pub enum Encoding {
    #[default]
    Utf8,
    LowerSpecial,
    LowerUpperDigitSpecial,
    FirstToLowerSpecial,
    AllToLowerSpecial,
}

/// A string together with its encoded form.
#[derive(Debug, Clone, Default)]
pub struct MetaString {
    pub original: String,
    pub encoding: Encoding,
    pub bytes: Vec<u8>,
}

impl PartialEq for MetaString {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes && self.encoding == other.encoding
    }
}

impl Eq for MetaString {}

pub struct MetaStringEncoder {
    special_char1: char,
    special_char2: char,
}

pub struct MetaStringDecoder {
    special_char1: char,
    special_char2: char,
}

struct StringStatistics {
    digit_count: usize,
    upper_count: usize,
    can_lower_upper_digit_special_encoded: bool,
    can_lower_special_encoded: bool,
}

impl MetaStringEncoder {
    pub const fn new(special_char1: char, special_char2: char) -> Self {
        Self {
            special_char1,
            special_char2,
        }
    }

    /// Encodes with the narrowest encoding drawn from `allowed`; non-ASCII
    /// input always falls back to UTF-8.
    pub fn encode_with_encodings(
        &self,
        input: &str,
        allowed: &[Encoding],
    ) -> Result<MetaString, Error> {
        ensure!(
            input.len() < SHORT_MAX_VALUE,
            Error::invalid_data(format!(
                "meta string too long, max:{SHORT_MAX_VALUE}, current:{}",
                input.len()
            ))
        );
        if input.is_empty() || !string_util::is_latin(input) {
            return Ok(MetaString {
                original: input.to_string(),
                encoding: Encoding::Utf8,
                bytes: input.as_bytes().to_vec(),
            });
        }
        let encoding = self.compute_encoding(input, allowed);
        let bytes = match encoding {
            Encoding::Utf8 => input.as_bytes().to_vec(),
            Encoding::LowerSpecial => self.encode_generic(input, 5)?,
            Encoding::LowerUpperDigitSpecial => self.encode_generic(input, 6)?,
            Encoding::FirstToLowerSpecial => {
                let mut chars: Vec<char> = input.chars().collect();
                chars[0] = chars[0].to_ascii_lowercase();
                self.encode_generic(&chars.iter().collect::<String>(), 5)?
            }
            Encoding::AllToLowerSpecial => {
                let mut escaped = String::with_capacity(input.len() * 2);
                for c in input.chars() {
                    if c.is_ascii_uppercase() {
                        escaped.push('|');
                        escaped.push(c.to_ascii_lowercase());
                    } else {
                        escaped.push(c);
                    }
                }
                self.encode_generic(&escaped, 5)?
            }
        };
        Ok(MetaString {
            original: input.to_string(),
            encoding,
            bytes,
        })
    }

    fn compute_encoding(&self, input: &str, allowed: &[Encoding]) -> Encoding {
        let allow = |e: Encoding| allowed.contains(&e);
        let stats = self.compute_statistics(input);
        if stats.can_lower_special_encoded && allow(Encoding::LowerSpecial) {
            return Encoding::LowerSpecial;
        }
        if stats.can_lower_upper_digit_special_encoded {
            if stats.digit_count != 0 && allow(Encoding::LowerUpperDigitSpecial) {
                return Encoding::LowerUpperDigitSpecial;
            }
            if stats.upper_count == 1
                && input.chars().next().unwrap().is_ascii_uppercase()
                && allow(Encoding::FirstToLowerSpecial)
            {
                return Encoding::FirstToLowerSpecial;
            }
            if ((input.len() + stats.upper_count) * 5) < (input.len() * 6)
                && allow(Encoding::AllToLowerSpecial)
            {
                return Encoding::AllToLowerSpecial;
            }
            if allow(Encoding::LowerUpperDigitSpecial) {
                return Encoding::LowerUpperDigitSpecial;
            }
        }
        Encoding::Utf8
    }

    fn compute_statistics(&self, input: &str) -> StringStatistics {
        let mut can_lower_upper_digit_special_encoded = true;
        let mut can_lower_special_encoded = true;
        let mut digit_count = 0;
        let mut upper_count = 0;
        for c in input.chars() {
            if can_lower_upper_digit_special_encoded
                && !(c.is_ascii_lowercase()
                    || c.is_ascii_uppercase()
                    || c.is_ascii_digit()
                    || c == self.special_char1
                    || c == self.special_char2)
            {
                can_lower_upper_digit_special_encoded = false;
            }
            if can_lower_special_encoded
                && !(c.is_ascii_lowercase() || matches!(c, '.' | '_' | '$' | '|'))
            {
                can_lower_special_encoded = false;
            }
            if c.is_ascii_digit() {
                digit_count += 1;
            }
            if c.is_ascii_uppercase() {
                upper_count += 1;
            }
        }
        StringStatistics {
            digit_count,
            upper_count,
            can_lower_upper_digit_special_encoded,
            can_lower_special_encoded,
        }
    }

    /// Packs characters MSB-first at `bits_per_char` bits each. Bit 0 of the
    /// first byte flags that the final padded char slot must be stripped.
    fn encode_generic(&self, input: &str, bits_per_char: u8) -> Result<Vec<u8>, Error> {
        let total_bits = input.len() * bits_per_char as usize + 1;
        let byte_length = total_bits.div_ceil(8);
        let mut bytes = vec![0u8; byte_length];
        let mut current_bit = 1;
        for c in input.chars() {
            let value = self.char_to_value(c, bits_per_char)?;
            for i in (0..bits_per_char).rev() {
                if (value & (1 << i)) != 0 {
                    bytes[current_bit / 8] |= 1 << (7 - (current_bit % 8));
                }
                current_bit += 1;
            }
        }
        if byte_length * 8 >= total_bits + bits_per_char as usize {
            bytes[0] |= 0x80;
        }
        Ok(bytes)
    }

    fn char_to_value(&self, c: char, bits_per_char: u8) -> Result<u8, Error> {
        match bits_per_char {
            5 => match c {
                'a'..='z' => Ok(c as u8 - b'a'),
                '.' => Ok(26),
                '_' => Ok(27),
                '$' => Ok(28),
                '|' => Ok(29),
                _ => Err(Error::invalid_data(format!(
                    "unsupported character for 5-bit meta string encoding: {c}"
                ))),
            },
            6 => match c {
                'a'..='z' => Ok(c as u8 - b'a'),
                'A'..='Z' => Ok(c as u8 - b'A' + 26),
                '0'..='9' => Ok(c as u8 - b'0' + 52),
                _ if c == self.special_char1 => Ok(62),
                _ if c == self.special_char2 => Ok(63),
                _ => Err(Error::invalid_data(format!(
                    "unsupported character for 6-bit meta string encoding: {c}"
                ))),
            },
            _ => unreachable!(),
        }
    }
}

impl MetaStringDecoder {
    pub const fn new(special_char1: char, special_char2: char) -> Self {
        Self {
            special_char1,
            special_char2,
        }
    }

    pub fn decode(&self, bytes: &[u8], encoding: Encoding) -> Result<String, Error> {
        match encoding {
            Encoding::Utf8 => String::from_utf8(bytes.to_vec())
                .map_err(|_| Error::invalid_data("meta string is not valid UTF-8")),
            Encoding::LowerSpecial => self.decode_generic(bytes, 5),
            Encoding::LowerUpperDigitSpecial => self.decode_generic(bytes, 6),
            Encoding::FirstToLowerSpecial => {
                let mut s = self.decode_generic(bytes, 5)?;
                if let Some(first) = s.get_mut(0..1) {
                    first.make_ascii_uppercase();
                }
                Ok(s)
            }
            Encoding::AllToLowerSpecial => {
                let escaped = self.decode_generic(bytes, 5)?;
                let mut result = String::with_capacity(escaped.len());
                let mut upper_next = false;
                for c in escaped.chars() {
                    if c == '|' {
                        upper_next = true;
                    } else if upper_next {
                        result.push(c.to_ascii_uppercase());
                        upper_next = false;
                    } else {
                        result.push(c);
                    }
                }
                Ok(result)
            }
        }
    }

    fn decode_generic(&self, bytes: &[u8], bits_per_char: u8) -> Result<String, Error> {
        if bytes.is_empty() {
            return Ok(String::new());
        }
        let strip_last = (bytes[0] & 0x80) != 0;
        let mut num_chars = (bytes.len() * 8 - 1) / bits_per_char as usize;
        if strip_last {
            num_chars -= 1;
        }
        let mut result = String::with_capacity(num_chars);
        let mut current_bit = 1;
        for _ in 0..num_chars {
            let mut value = 0u8;
            for _ in 0..bits_per_char {
                value <<= 1;
                if (bytes[current_bit / 8] & (1 << (7 - (current_bit % 8)))) != 0 {
                    value |= 1;
                }
                current_bit += 1;
            }
            result.push(self.value_to_char(value, bits_per_char)?);
        }
        Ok(result)
    }

    fn value_to_char(&self, value: u8, bits_per_char: u8) -> Result<char, Error> {
        match bits_per_char {
            5 => match value {
                0..=25 => Ok((b'a' + value) as char),
                26 => Ok('.'),
                27 => Ok('_'),
                28 => Ok('$'),
                29 => Ok('|'),
                _ => Err(Error::invalid_data(format!(
                    "invalid 5-bit meta string value: {value}"
                ))),
            },
            6 => match value {
                0..=25 => Ok((b'a' + value) as char),
                26..=51 => Ok((b'A' + value - 26) as char),
                52..=61 => Ok((b'0' + value - 52) as char),
                62 => Ok(self.special_char1),
                63 => Ok(self.special_char2),
                _ => unreachable!(),
            },
            _ => unreachable!(),
        }
    }
}
