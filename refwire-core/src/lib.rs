//! # Refwire Core
//!
//! `refwire-core` is the library behind the `refwire` CLI. It provides a typed value and a
//! strict binary codec for `grpc.reflection.v1alpha.ErrorResponse`, the message a gRPC
//! Server Reflection service sends back when a request cannot be answered.
//!
//! ## Key Components
//!
//! * **[`ErrorResponse`]:** The message itself. It encodes to and decodes from the protobuf
//!   binary wire format, omitting zero values and keeping unknown fields byte-for-byte.
//! * **[`DecodeOptions`]:** Knobs for decoding (UTF-8 strictness, group nesting limit,
//!   maximum input size).
//! * **[`wire`]:** The low-level protobuf wire primitives the codec is built on.
//!
//! ## Integrations
//!
//! * **[`status`]:** Conversions between [`ErrorResponse`] and `tonic::Status` / `tonic::Code`.
//! * **[`json`]:** The proto3 canonical JSON mapping (`{"errorCode": 5, "errorMessage": "..."}`).
//! * **[`codec`]:** An implementation of `tonic::codec::Codec` carrying [`ErrorResponse`] values.
//!
//! ## Re-exports
//!
//! This crate re-exports `prost` and `tonic` to ensure that consumers
//! use compatible versions of these underlying dependencies.
pub mod codec;
pub mod json;
pub mod message;
pub mod options;
pub mod status;
pub mod wire;

pub use message::{DecodeError, EncodeError, ErrorResponse};
pub use options::DecodeOptions;

// Re-exports
pub use prost;
pub use tonic;
