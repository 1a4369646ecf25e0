//! # ErrorResponse
//!
//! The error reply of the gRPC Server Reflection Protocol
//! (`grpc.reflection.v1alpha.ErrorResponse`) and its binary codec.
//!
//! ```text
//! message ErrorResponse {
//!   // This field uses the error codes defined in grpc::StatusCode.
//!   int32 error_code = 1;
//!   string error_message = 2;
//! }
//! ```
//!
//! ## Encoding
//!
//! Fields are written in field-number order and zero values are left out, so the default
//! message encodes to zero bytes. Unknown fields collected while decoding are appended
//! verbatim after the known ones.
//!
//! ## Decoding
//!
//! Decoding is all-or-nothing: it returns a complete message or a [`DecodeError`], never a
//! half-filled value. Repeated occurrences of a known field overwrite the previous one, and
//! anything outside the schema (including a known field number with an unexpected wire type)
//! is kept in [`ErrorResponse::unknown_fields`].
use crate::options::DecodeOptions;
use crate::wire::unknown::{UnknownField, UnknownFieldSet};
use crate::wire::{
    RawField, WireReader, WireType, encode_key, encode_varint, encoded_len_varint, key_len,
};
use bytes::BufMut;
use tracing::{debug, trace};

pub use crate::wire::DecodeError;

const ERROR_CODE_TAG: u32 = 1;
const ERROR_MESSAGE_TAG: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    #[error("Insufficient buffer capacity: {required} byte(s) required, {remaining} available")]
    InsufficientCapacity { required: usize, remaining: usize },
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ErrorResponse {
    /// This field uses the error codes defined in grpc::StatusCode.
    pub error_code: i32,
    pub error_message: String,
    /// Fields read from the wire that this schema does not declare.
    pub unknown_fields: UnknownFieldSet,
}

impl ErrorResponse {
    pub fn new(error_code: i32, error_message: impl Into<String>) -> Self {
        Self {
            error_code,
            error_message: error_message.into(),
            unknown_fields: UnknownFieldSet::default(),
        }
    }

    /// Exact number of bytes [`ErrorResponse::encode`] writes.
    pub fn encoded_len(&self) -> usize {
        let mut len = 0;

        if self.error_code != 0 {
            len += key_len(ERROR_CODE_TAG) + encoded_len_varint(int32_to_varint(self.error_code));
        }

        if !self.error_message.is_empty() {
            let size = self.error_message.len();
            len += key_len(ERROR_MESSAGE_TAG) + encoded_len_varint(size as u64) + size;
        }

        len + self.unknown_fields.encoded_len()
    }

    /// Encodes the message into `buf`.
    ///
    /// Fails without writing anything if `buf` cannot hold the whole message.
    pub fn encode(&self, buf: &mut impl BufMut) -> Result<(), EncodeError> {
        check_capacity(self.encoded_len(), buf.remaining_mut())?;

        self.encode_raw(buf);
        Ok(())
    }

    pub fn encode_to_vec(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        self.encode_raw(&mut buf);
        buf
    }

    /// Encodes the message prefixed with its length as a varint, so several messages can be
    /// written back to back on a stream.
    pub fn encode_length_delimited(&self, buf: &mut impl BufMut) -> Result<(), EncodeError> {
        let len = self.encoded_len();
        check_capacity(encoded_len_varint(len as u64) + len, buf.remaining_mut())?;

        encode_varint(len as u64, buf);
        self.encode_raw(buf);
        Ok(())
    }

    pub fn encode_length_delimited_to_vec(&self) -> Vec<u8> {
        let len = self.encoded_len();
        let mut buf = Vec::with_capacity(encoded_len_varint(len as u64) + len);

        encode_varint(len as u64, &mut buf);
        self.encode_raw(&mut buf);
        buf
    }

    fn encode_raw(&self, buf: &mut impl BufMut) {
        if self.error_code != 0 {
            encode_key(ERROR_CODE_TAG, WireType::Varint, buf);
            encode_varint(int32_to_varint(self.error_code), buf);
        }

        if !self.error_message.is_empty() {
            encode_key(ERROR_MESSAGE_TAG, WireType::LengthDelimited, buf);
            encode_varint(self.error_message.len() as u64, buf);
            buf.put_slice(self.error_message.as_bytes());
        }

        self.unknown_fields.encode(buf);
    }

    /// Decodes a message using the default [`DecodeOptions`].
    pub fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        Self::decode_with(buf, &DecodeOptions::default())
    }

    pub fn decode_with(buf: &[u8], options: &DecodeOptions) -> Result<Self, DecodeError> {
        let mut message = Self::default();
        message.merge_with(buf, options)?;
        Ok(message)
    }

    /// Decodes one length-prefixed message from the front of `buf` using the default
    /// [`DecodeOptions`].
    ///
    /// On success `buf` is advanced past the frame, so a stream of frames can be read in a
    /// loop. On error `buf` is left where it was.
    pub fn decode_length_delimited(buf: &mut &[u8]) -> Result<Self, DecodeError> {
        Self::decode_length_delimited_with(buf, &DecodeOptions::default())
    }

    /// Errors inside the frame report offsets relative to the start of the message body.
    pub fn decode_length_delimited_with(
        buf: &mut &[u8],
        options: &DecodeOptions,
    ) -> Result<Self, DecodeError> {
        let input = *buf;
        let mut reader = WireReader::new(input);

        let body = reader.read_length_delimited()?;
        let message = Self::decode_with(body, options)?;

        *buf = &input[reader.position()..];
        Ok(message)
    }

    /// Decodes `buf` on top of this message using the default [`DecodeOptions`].
    ///
    /// Fields present in `buf` overwrite the current ones, unknown fields are appended.
    /// On error `self` is left untouched.
    pub fn merge(&mut self, buf: &[u8]) -> Result<(), DecodeError> {
        self.merge_with(buf, &DecodeOptions::default())
    }

    pub fn merge_with(&mut self, buf: &[u8], options: &DecodeOptions) -> Result<(), DecodeError> {
        options.check_message_size(buf.len())?;

        let mut merged = self.clone();

        decode_fields(&mut merged, buf, options).inspect_err(|err| {
            debug!(error = %err, len = buf.len(), "failed to decode ErrorResponse");
        })?;

        *self = merged;
        Ok(())
    }

    /// Copies the set fields of `other` into this message.
    ///
    /// A non-zero `error_code` and a non-empty `error_message` replace the current values,
    /// unknown fields are appended.
    pub fn merge_from(&mut self, other: &ErrorResponse) {
        if other.error_code != 0 {
            self.error_code = other.error_code;
        }

        if !other.error_message.is_empty() {
            self.error_message.clone_from(&other.error_message);
        }

        self.unknown_fields.extend(&other.unknown_fields);
    }

    /// Resets every field to its default value.
    pub fn clear(&mut self) {
        self.error_code = 0;
        self.error_message.clear();
        self.unknown_fields.clear();
    }
}

fn check_capacity(required: usize, remaining: usize) -> Result<(), EncodeError> {
    if required > remaining {
        return Err(EncodeError::InsufficientCapacity {
            required,
            remaining,
        });
    }

    Ok(())
}

fn decode_fields(
    message: &mut ErrorResponse,
    buf: &[u8],
    options: &DecodeOptions,
) -> Result<(), DecodeError> {
    let mut reader = WireReader::new(buf);

    while !reader.is_empty() {
        let start = reader.position();
        let key = reader.read_key()?;
        let header_len = reader.position() - start;

        match (key.number, key.wire_type) {
            (ERROR_CODE_TAG, WireType::Varint) => {
                // int32 values travel as sign-extended 64-bit varints; keep the low 32 bits.
                message.error_code = reader.read_varint()? as i32;
                trace!(error_code = message.error_code, "decoded error_code");
            }
            (ERROR_MESSAGE_TAG, WireType::LengthDelimited) => {
                let bytes = reader.read_length_delimited()?;
                message.error_message = decode_string("error_message", bytes, options)?;
                trace!(len = bytes.len(), "decoded error_message");
            }
            _ => {
                reader.skip_value(key, options.recursion_limit)?;

                let field = UnknownField::from(RawField {
                    key,
                    offset: start,
                    bytes: reader.consumed_since(start),
                    key_len: header_len,
                });

                debug!(
                    number = field.number(),
                    wire_type = %field.wire_type(),
                    "preserving unknown field"
                );
                message.unknown_fields.push(field);
            }
        }
    }

    Ok(())
}

fn decode_string(
    field: &'static str,
    bytes: &[u8],
    options: &DecodeOptions,
) -> Result<String, DecodeError> {
    match std::str::from_utf8(bytes) {
        Ok(s) => Ok(s.to_owned()),
        Err(source) if options.strict_utf8 => Err(DecodeError::InvalidEncoding { field, source }),
        Err(_) => Ok(String::from_utf8_lossy(bytes).into_owned()),
    }
}

fn int32_to_varint(value: i32) -> u64 {
    // Negative int32 values are sign-extended, which always takes 10 bytes.
    i64::from(value) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOT_FOUND_BYTES: [u8; 13] = [
        0x08, 0x05, 0x12, 0x09, b'n', b'o', b't', b' ', b'f', b'o', b'u', b'n', b'd',
    ];

    #[test]
    fn encodes_not_found_reply() {
        let message = ErrorResponse::new(5, "not found");

        assert_eq!(message.encode_to_vec(), NOT_FOUND_BYTES);
        assert_eq!(message.encoded_len(), NOT_FOUND_BYTES.len());
    }

    #[test]
    fn decodes_not_found_reply() {
        let message = ErrorResponse::decode(&NOT_FOUND_BYTES).unwrap();

        assert_eq!(message, ErrorResponse::new(5, "not found"));
    }

    #[test]
    fn default_message_encodes_to_nothing() {
        let message = ErrorResponse::default();

        assert!(message.encode_to_vec().is_empty());
        assert_eq!(message.encoded_len(), 0);
    }

    #[test]
    fn empty_buffer_decodes_to_default() {
        let message = ErrorResponse::decode(&[]).unwrap();

        assert_eq!(message.error_code, 0);
        assert_eq!(message.error_message, "");
        assert!(message.unknown_fields.is_empty());
    }

    #[test]
    fn only_non_zero_fields_are_written() {
        assert_eq!(ErrorResponse::new(12, "").encode_to_vec(), [0x08, 0x0c]);
        assert_eq!(
            ErrorResponse::new(0, "x").encode_to_vec(),
            [0x12, 0x01, b'x']
        );
    }

    #[test]
    fn negative_codes_use_ten_byte_varints() {
        let message = ErrorResponse::new(-1, "");
        let bytes = message.encode_to_vec();

        assert_eq!(bytes.len(), 11);
        assert_eq!(message.encoded_len(), 11);
        assert_eq!(ErrorResponse::decode(&bytes).unwrap().error_code, -1);
    }

    #[test]
    fn last_occurrence_of_a_field_wins() {
        let bytes = [
            0x08, 0x05, 0x12, 0x01, b'a', // code 5, message "a"
            0x08, 0x0d, 0x12, 0x01, b'b', // code 13, message "b"
        ];

        assert_eq!(
            ErrorResponse::decode(&bytes).unwrap(),
            ErrorResponse::new(13, "b")
        );
    }

    #[test]
    fn unknown_fields_are_re_emitted_after_known_fields() {
        let bytes = [
            0x18, 0x2a, // 3: varint 42
            0x08, 0x05, // 1: varint 5
            0x22, 0x02, b'h', b'i', // 4: "hi"
        ];

        let message = ErrorResponse::decode(&bytes).unwrap();
        assert_eq!(message.error_code, 5);
        assert_eq!(message.unknown_fields.len(), 2);

        assert_eq!(
            message.encode_to_vec(),
            [0x08, 0x05, 0x18, 0x2a, 0x22, 0x02, b'h', b'i']
        );
    }

    #[test]
    fn known_number_with_wrong_wire_type_is_unknown() {
        // Field 1 as a fixed32 instead of a varint.
        let bytes = [0x0d, 1, 0, 0, 0];

        let message = ErrorResponse::decode(&bytes).unwrap();

        assert_eq!(message.error_code, 0);
        assert_eq!(message.unknown_fields.len(), 1);
        assert_eq!(message.encode_to_vec(), bytes);
    }

    #[test]
    fn truncated_string_fails() {
        let err = ErrorResponse::decode(&NOT_FOUND_BYTES[..8]).unwrap_err();

        assert_eq!(
            err,
            DecodeError::TruncatedInput {
                offset: 4,
                needed: 9,
                remaining: 4
            }
        );
    }

    #[test]
    fn truncated_varint_fails() {
        let err = ErrorResponse::decode(&[0x08, 0x80]).unwrap_err();

        assert!(matches!(err, DecodeError::TruncatedInput { offset: 1, .. }));
    }

    #[test]
    fn overlong_varint_fails() {
        let mut bytes = vec![0x08];
        bytes.extend([0xff; 10]);
        bytes.push(0x01);

        assert_eq!(
            ErrorResponse::decode(&bytes),
            Err(DecodeError::MalformedVarint { offset: 1 })
        );
    }

    #[test]
    fn invalid_utf8_is_rejected_when_strict() {
        let bytes = [0x12, 0x02, 0xc3, 0x28];

        let err = ErrorResponse::decode(&bytes).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::InvalidEncoding {
                field: "error_message",
                ..
            }
        ));

        let lossy = ErrorResponse::decode_with(&bytes, &DecodeOptions::lossy()).unwrap();
        assert_eq!(lossy.error_message, "\u{fffd}(");
    }

    #[test]
    fn oversized_input_is_rejected_before_parsing() {
        let options = DecodeOptions::default().with_max_message_size(4);

        assert_eq!(
            ErrorResponse::decode_with(&NOT_FOUND_BYTES, &options),
            Err(DecodeError::MessageTooLarge {
                size: 13,
                limit: 4
            })
        );
    }

    #[test]
    fn failed_merge_leaves_message_untouched() {
        let mut message = ErrorResponse::new(3, "bad argument");

        // A valid field followed by a truncated one.
        let bytes = [0x08, 0x05, 0x12, 0x05, b'a'];
        assert!(message.merge(&bytes).is_err());

        assert_eq!(message, ErrorResponse::new(3, "bad argument"));
    }

    #[test]
    fn merge_overwrites_fields_present_in_input() {
        let mut message = ErrorResponse::new(3, "bad argument");

        message.merge(&[0x08, 0x05]).unwrap();

        assert_eq!(message, ErrorResponse::new(5, "bad argument"));
    }

    #[test]
    fn merge_from_skips_zero_values() {
        let mut message = ErrorResponse::new(3, "bad argument");

        message.merge_from(&ErrorResponse::new(0, "other"));
        assert_eq!(message, ErrorResponse::new(3, "other"));

        message.merge_from(&ErrorResponse::new(12, ""));
        assert_eq!(message, ErrorResponse::new(12, "other"));
    }

    #[test]
    fn clear_resets_to_default() {
        let mut message = ErrorResponse::decode(&[0x08, 0x05, 0x18, 0x01]).unwrap();

        message.clear();

        assert_eq!(message, ErrorResponse::default());
    }

    #[test]
    fn encode_into_small_buffer_fails_without_writing() {
        let message = ErrorResponse::new(5, "not found");
        let mut storage = [0u8; 4];
        let mut buf = &mut storage[..];

        assert_eq!(
            message.encode(&mut buf),
            Err(EncodeError::InsufficientCapacity {
                required: 13,
                remaining: 4
            })
        );
        assert_eq!(storage, [0; 4]);
    }

    #[test]
    fn encode_into_buf_mut_matches_encode_to_vec() {
        let message = ErrorResponse::new(5, "not found");
        let mut buf = bytes::BytesMut::new();

        message.encode(&mut buf).unwrap();

        assert_eq!(&buf[..], &NOT_FOUND_BYTES[..]);
    }

    #[test]
    fn length_delimited_frames_are_read_back_to_back() {
        let mut stream = ErrorResponse::new(5, "not found").encode_length_delimited_to_vec();
        ErrorResponse::default()
            .encode_length_delimited(&mut stream)
            .unwrap();
        ErrorResponse::new(12, "").encode_length_delimited(&mut stream).unwrap();

        assert_eq!(stream[0], 13);
        assert_eq!(&stream[1..14], &NOT_FOUND_BYTES[..]);
        assert_eq!(stream[14], 0);

        let mut input = &stream[..];
        assert_eq!(
            ErrorResponse::decode_length_delimited(&mut input).unwrap(),
            ErrorResponse::new(5, "not found")
        );
        assert_eq!(
            ErrorResponse::decode_length_delimited(&mut input).unwrap(),
            ErrorResponse::default()
        );
        assert_eq!(
            ErrorResponse::decode_length_delimited(&mut input).unwrap(),
            ErrorResponse::new(12, "")
        );
        assert!(input.is_empty());
    }

    #[test]
    fn short_length_delimited_frame_is_truncated() {
        let frame = ErrorResponse::new(5, "not found").encode_length_delimited_to_vec();
        let mut input = &frame[..3];

        assert_eq!(
            ErrorResponse::decode_length_delimited(&mut input),
            Err(DecodeError::TruncatedInput {
                offset: 1,
                needed: 13,
                remaining: 2
            })
        );
        assert_eq!(input.len(), 3);

        let mut empty: &[u8] = &[];
        assert!(matches!(
            ErrorResponse::decode_length_delimited(&mut empty),
            Err(DecodeError::TruncatedInput { offset: 0, .. })
        ));
    }

    #[test]
    fn length_delimited_encode_checks_prefix_capacity() {
        let message = ErrorResponse::new(5, "not found");
        let mut storage = [0u8; 13];
        let mut buf = &mut storage[..];

        assert_eq!(
            message.encode_length_delimited(&mut buf),
            Err(EncodeError::InsufficientCapacity {
                required: 14,
                remaining: 13
            })
        );
    }

    #[test]
    fn equal_messages_hash_equally() {
        use std::collections::HashSet;

        let set: HashSet<_> = [
            ErrorResponse::new(5, "not found"),
            ErrorResponse::decode(&NOT_FOUND_BYTES).unwrap(),
        ]
        .into_iter()
        .collect();

        assert_eq!(set.len(), 1);
    }
}

#[cfg(test)]
mod proptest_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn decode_inverts_encode(code in any::<i32>(), text in ".*") {
            let message = ErrorResponse::new(code, text);
            let bytes = message.encode_to_vec();

            prop_assert_eq!(bytes.len(), message.encoded_len());
            prop_assert_eq!(ErrorResponse::decode(&bytes).unwrap(), message);
        }

        #[test]
        fn prefixes_never_panic_or_yield_partial_strings(code in 1..i32::MAX, text in ".{1,64}") {
            let bytes = ErrorResponse::new(code, text).encode_to_vec();

            for cut in 1..bytes.len() {
                match ErrorResponse::decode(&bytes[..cut]) {
                    // Cutting right after the first field is a valid, shorter message.
                    Ok(decoded) => {
                        prop_assert_eq!(decoded.error_code, code);
                        prop_assert_eq!(decoded.error_message, "");
                    }
                    Err(err) => prop_assert!(
                        matches!(err, DecodeError::TruncatedInput { .. }),
                        "unexpected error {:?}",
                        err
                    ),
                }
            }
        }

        #[test]
        fn arbitrary_bytes_never_panic(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
            if let Ok(message) = ErrorResponse::decode_with(&bytes, &DecodeOptions::lossy()) {
                // Whatever was accepted can be written and read again.
                let encoded = message.encode_to_vec();
                let again = ErrorResponse::decode_with(&encoded, &DecodeOptions::lossy());
                prop_assert_eq!(again.unwrap(), message);
            }
        }
    }
}
