//! # Protobuf Wire Primitives
//!
//! The building blocks [`crate::ErrorResponse`] is encoded and decoded with.
//!
//! Encoding reuses the varint routines from `prost::encoding`. Decoding is done by
//! [`WireReader`], a cursor over a byte slice that reports *why* an input is rejected
//! (truncated, malformed varint, invalid key...) instead of a single opaque error, and that
//! can hand back the exact bytes of any field it skips so they can be re-emitted later.
//!
//! ## References
//!
//! * [Protocol Buffers Encoding](https://protobuf.dev/programming-guides/encoding/)
pub mod unknown;

use crate::options::DecodeOptions;
use bytes::BufMut;
use std::fmt;

pub use prost::encoding::{encode_varint, encoded_len_varint};

/// A varint never takes more than 10 bytes on the wire.
pub const MAX_VARINT_LEN: usize = 10;

/// Upper bound on group nesting, whatever limit the caller asks for. Groups are skipped
/// recursively, so this keeps hostile input from exhausting the stack.
pub const MAX_RECURSION_LIMIT: u32 = 1000;

/// Field numbers are stored in the upper 29 bits of a key.
pub const MAX_FIELD_NUMBER: u32 = (1 << 29) - 1;

/// The 3-bit tag telling a reader how the bytes of a field are laid out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WireType {
    Varint = 0,
    Fixed64 = 1,
    LengthDelimited = 2,
    StartGroup = 3,
    EndGroup = 4,
    Fixed32 = 5,
}

impl TryFrom<u64> for WireType {
    type Error = u64;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::Fixed64),
            2 => Ok(WireType::LengthDelimited),
            3 => Ok(WireType::StartGroup),
            4 => Ok(WireType::EndGroup),
            5 => Ok(WireType::Fixed32),
            other => Err(other),
        }
    }
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WireType::Varint => "varint",
            WireType::Fixed64 => "fixed64",
            WireType::LengthDelimited => "length-delimited",
            WireType::StartGroup => "start-group",
            WireType::EndGroup => "end-group",
            WireType::Fixed32 => "fixed32",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while reading protobuf bytes.
///
/// Offsets are byte positions in the buffer handed to the decoder.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("Malformed varint at offset {offset}: no terminating byte within 10 bytes")]
    MalformedVarint { offset: usize },

    #[error(
        "Truncated input at offset {offset}: needed {needed} byte(s) but only {remaining} remain"
    )]
    TruncatedInput {
        offset: usize,
        needed: usize,
        remaining: usize,
    },

    #[error("Field '{field}' is not valid UTF-8: {source}")]
    InvalidEncoding {
        field: &'static str,
        source: std::str::Utf8Error,
    },

    #[error("Invalid field key at offset {offset}")]
    InvalidKey { offset: usize },

    #[error("Invalid wire type {value} at offset {offset}")]
    InvalidWireType { offset: usize, value: u64 },

    #[error("Unexpected end-group for field {number} at offset {offset}")]
    UnexpectedEndGroup { offset: usize, number: u32 },

    #[error("Group nesting exceeds the limit of {limit}")]
    RecursionLimitExceeded { limit: u32 },

    #[error("Message of {size} bytes exceeds the limit of {limit} bytes")]
    MessageTooLarge { size: usize, limit: usize },
}

/// A decoded field key: field number plus wire type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Key {
    pub number: u32,
    pub wire_type: WireType,
}

impl Key {
    pub fn new(number: u32, wire_type: WireType) -> Self {
        Self { number, wire_type }
    }

    fn as_varint(&self) -> u64 {
        (u64::from(self.number) << 3) | self.wire_type as u64
    }
}

/// Writes the key of field `number` with the given wire type.
pub fn encode_key(number: u32, wire_type: WireType, buf: &mut impl BufMut) {
    encode_varint(Key::new(number, wire_type).as_varint(), buf);
}

/// Number of bytes the key of field `number` takes on the wire.
pub fn key_len(number: u32) -> usize {
    encoded_len_varint(u64::from(number) << 3)
}

/// One complete field as it appears in the buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawField<'a> {
    pub key: Key,
    /// Position of the first key byte.
    pub offset: usize,
    /// Key and payload, exactly as read.
    pub bytes: &'a [u8],
    /// Length of the key prefix inside `bytes`.
    pub key_len: usize,
}

impl<'a> RawField<'a> {
    /// The field bytes without the key. For length-delimited fields the length prefix is kept.
    pub fn payload(&self) -> &'a [u8] {
        &self.bytes[self.key_len..]
    }
}

/// A forward-only cursor over protobuf bytes.
#[derive(Debug, Clone)]
pub struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// The bytes consumed since `start`.
    pub fn consumed_since(&self, start: usize) -> &'a [u8] {
        &self.buf[start..self.pos]
    }

    pub fn read_varint(&mut self) -> Result<u64, DecodeError> {
        let offset = self.pos;
        let mut value = 0u64;

        for i in 0..MAX_VARINT_LEN {
            let Some(&byte) = self.buf.get(offset + i) else {
                return Err(DecodeError::TruncatedInput {
                    offset,
                    needed: i + 1,
                    remaining: i,
                });
            };

            value |= u64::from(byte & 0x7f) << (7 * i);

            if byte & 0x80 == 0 {
                self.pos = offset + i + 1;
                return Ok(value);
            }
        }

        Err(DecodeError::MalformedVarint { offset })
    }

    pub fn read_key(&mut self) -> Result<Key, DecodeError> {
        let offset = self.pos;
        let raw = self.read_varint()?;

        let number = u32::try_from(raw >> 3).map_err(|_| DecodeError::InvalidKey { offset })?;
        if number == 0 || number > MAX_FIELD_NUMBER {
            return Err(DecodeError::InvalidKey { offset });
        }

        let wire_type = WireType::try_from(raw & 0x7)
            .map_err(|value| DecodeError::InvalidWireType { offset, value })?;

        Ok(Key::new(number, wire_type))
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        let remaining = self.remaining();
        if len > remaining {
            return Err(DecodeError::TruncatedInput {
                offset: self.pos,
                needed: len,
                remaining,
            });
        }

        let bytes = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    /// Reads a length prefix and returns the payload that follows it.
    pub fn read_length_delimited(&mut self) -> Result<&'a [u8], DecodeError> {
        let len = self.read_varint()?;
        self.read_bytes(usize::try_from(len).unwrap_or(usize::MAX))
    }

    /// Moves past the value of a field whose key was just read.
    ///
    /// Groups are followed down to their matching end-group key, at most `recursion_limit`
    /// levels deep (capped at [`MAX_RECURSION_LIMIT`]).
    pub fn skip_value(&mut self, key: Key, recursion_limit: u32) -> Result<(), DecodeError> {
        let recursion_limit = recursion_limit.min(MAX_RECURSION_LIMIT);

        match key.wire_type {
            WireType::Varint => self.read_varint().map(drop),
            WireType::Fixed64 => self.read_bytes(8).map(drop),
            WireType::Fixed32 => self.read_bytes(4).map(drop),
            WireType::LengthDelimited => self.read_length_delimited().map(drop),
            WireType::StartGroup => self.skip_group(key.number, recursion_limit),
            WireType::EndGroup => Err(DecodeError::UnexpectedEndGroup {
                offset: self.pos,
                number: key.number,
            }),
        }
    }

    fn skip_group(&mut self, number: u32, recursion_limit: u32) -> Result<(), DecodeError> {
        let depth = recursion_limit
            .checked_sub(1)
            .ok_or(DecodeError::RecursionLimitExceeded {
                limit: recursion_limit,
            })?;

        loop {
            let offset = self.pos;
            let key = self.read_key()?;

            if key.wire_type == WireType::EndGroup {
                if key.number == number {
                    return Ok(());
                }
                return Err(DecodeError::UnexpectedEndGroup {
                    offset,
                    number: key.number,
                });
            }

            self.skip_value(key, depth).map_err(|err| match err {
                // Report the limit that was configured, not the remaining depth.
                DecodeError::RecursionLimitExceeded { .. } => DecodeError::RecursionLimitExceeded {
                    limit: recursion_limit,
                },
                err => err,
            })?;
        }
    }

    /// Reads the next complete field, or `None` once the buffer is exhausted.
    pub fn next_field(
        &mut self,
        recursion_limit: u32,
    ) -> Option<Result<RawField<'a>, DecodeError>> {
        if self.is_empty() {
            return None;
        }

        Some(self.read_field(recursion_limit))
    }

    fn read_field(&mut self, recursion_limit: u32) -> Result<RawField<'a>, DecodeError> {
        let offset = self.pos;
        let key = self.read_key()?;
        let key_len = self.pos - offset;

        self.skip_value(key, recursion_limit)?;

        Ok(RawField {
            key,
            offset,
            bytes: self.consumed_since(offset),
            key_len,
        })
    }
}

/// Splits a whole payload into its raw fields, in wire order.
///
/// Applies the size and nesting limits of `options` the same way decoding an
/// [`crate::ErrorResponse`] does.
pub fn read_fields<'a>(
    buf: &'a [u8],
    options: &DecodeOptions,
) -> Result<Vec<RawField<'a>>, DecodeError> {
    options.check_message_size(buf.len())?;

    let mut reader = WireReader::new(buf);
    std::iter::from_fn(|| reader.next_field(options.recursion_limit)).collect()
}
