//! # Unknown Fields
//!
//! Fields found on the wire that the schema does not declare. They are kept as raw bytes,
//! key included, so a message read by an older binary can be written back without losing
//! data added by a newer schema.
use super::{RawField, WireType};
use bytes::{BufMut, Bytes};

/// A single field that was not recognized while decoding.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct UnknownField {
    number: u32,
    wire_type: WireType,
    key_len: usize,
    raw: Bytes,
}

impl UnknownField {
    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn wire_type(&self) -> WireType {
        self.wire_type
    }

    /// Key and payload, exactly as they were read.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// The bytes following the key.
    pub fn payload(&self) -> &[u8] {
        &self.raw[self.key_len..]
    }
}

impl From<RawField<'_>> for UnknownField {
    fn from(field: RawField<'_>) -> Self {
        Self {
            number: field.key.number,
            wire_type: field.key.wire_type,
            key_len: field.key_len,
            raw: Bytes::copy_from_slice(field.bytes),
        }
    }
}

/// Unknown fields in the order they were encountered.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct UnknownFieldSet {
    fields: Vec<UnknownField>,
}

impl UnknownFieldSet {
    pub fn push(&mut self, field: UnknownField) {
        self.fields.push(field);
    }

    pub fn extend(&mut self, other: &UnknownFieldSet) {
        self.fields.extend(other.fields.iter().cloned());
    }

    pub fn iter(&self) -> std::slice::Iter<'_, UnknownField> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn clear(&mut self) {
        self.fields.clear();
    }

    pub fn encoded_len(&self) -> usize {
        self.fields.iter().map(|f| f.raw.len()).sum()
    }

    /// Writes every field back verbatim.
    pub fn encode(&self, buf: &mut impl BufMut) {
        for field in &self.fields {
            buf.put_slice(&field.raw);
        }
    }
}

impl<'a> IntoIterator for &'a UnknownFieldSet {
    type Item = &'a UnknownField;
    type IntoIter = std::slice::Iter<'a, UnknownField>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
