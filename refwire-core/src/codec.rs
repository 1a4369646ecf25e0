//! # ErrorResponse Codec
//!
//! This module implements `tonic::codec::Codec` so that `tonic` can carry [`ErrorResponse`]
//! values directly, using the strict decoder of this crate instead of a generated `prost` type.
//!
//! ## How it works
//!
//! 1. **Encoder**: writes the message straight into the gRPC frame buffer.
//! 2. **Decoder**: takes the bytes of one frame and decodes them with the codec's
//!    [`DecodeOptions`]. Decode failures become `Status::internal`.
use crate::{DecodeOptions, ErrorResponse};
use bytes::{Buf, BufMut};
use tonic::{
    Status,
    codec::{Codec, DecodeBuf, Decoder, EncodeBuf, Encoder},
};

/// A `tonic` codec for [`ErrorResponse`] in both directions.
#[derive(Debug, Clone, Default)]
pub struct ErrorResponseCodec {
    options: DecodeOptions,
}

impl ErrorResponseCodec {
    pub fn new(options: DecodeOptions) -> Self {
        Self { options }
    }
}

impl Codec for ErrorResponseCodec {
    type Encode = ErrorResponse;
    type Decode = ErrorResponse;

    type Encoder = ErrorResponseEncoder;
    type Decoder = ErrorResponseDecoder;

    fn encoder(&mut self) -> Self::Encoder {
        ErrorResponseEncoder
    }

    fn decoder(&mut self) -> Self::Decoder {
        ErrorResponseDecoder(self.options.clone())
    }
}

/// Responsible for writing an [`ErrorResponse`] into a gRPC frame.
#[derive(Debug, Clone, Default)]
pub struct ErrorResponseEncoder;

impl Encoder for ErrorResponseEncoder {
    type Item = ErrorResponse;
    type Error = Status;

    fn encode(&mut self, item: Self::Item, dst: &mut EncodeBuf<'_>) -> Result<(), Self::Error> {
        encode_frame(&item, dst)
    }
}

/// Responsible for reading an [`ErrorResponse`] out of a gRPC frame.
#[derive(Debug, Clone, Default)]
pub struct ErrorResponseDecoder(DecodeOptions);

impl Decoder for ErrorResponseDecoder {
    type Item = ErrorResponse;
    type Error = Status;

    fn decode(&mut self, src: &mut DecodeBuf<'_>) -> Result<Option<Self::Item>, Self::Error> {
        decode_frame(src, &self.0).map(Some)
    }
}

fn encode_frame(item: &ErrorResponse, dst: &mut impl BufMut) -> Result<(), Status> {
    item.encode(dst)
        .map_err(|e| Status::internal(format!("Failed to encode ErrorResponse: {}", e)))
}

fn decode_frame(src: &mut impl Buf, options: &DecodeOptions) -> Result<ErrorResponse, Status> {
    let bytes = src.copy_to_bytes(src.remaining());

    ErrorResponse::decode_with(&bytes, options)
        .map_err(|e| Status::internal(format!("Failed to decode ErrorResponse: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonic::Code;

    #[test]
    fn frames_round_trip() {
        let message = ErrorResponse::not_found("my.pkg.Service");
        let mut frame = bytes::BytesMut::new();

        encode_frame(&message, &mut frame).unwrap();
        let decoded = decode_frame(&mut frame.freeze(), &DecodeOptions::default()).unwrap();

        assert_eq!(decoded, message);
    }

    #[test]
    fn decode_consumes_the_whole_frame() {
        let mut frame = bytes::Bytes::from_static(&[0x08, 0x05]);

        decode_frame(&mut frame, &DecodeOptions::default()).unwrap();

        assert!(!frame.has_remaining());
    }

    #[test]
    fn corrupt_frames_become_internal_errors() {
        let mut frame = bytes::Bytes::from_static(&[0x12, 0x05, b'a']);

        let status = decode_frame(&mut frame, &DecodeOptions::default()).unwrap_err();

        assert_eq!(status.code(), Code::Internal);
        assert!(status.message().contains("Truncated input"));
    }

    #[test]
    fn decoder_uses_codec_options() {
        let mut codec = ErrorResponseCodec::new(DecodeOptions::lossy());
        let ErrorResponseDecoder(options) = codec.decoder();

        assert!(!options.strict_utf8);
    }
}
