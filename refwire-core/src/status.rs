//! # gRPC Status Mapping
//!
//! `error_code` carries one of the canonical gRPC status codes. This module bridges
//! [`ErrorResponse`] and `tonic`'s [`Status`] / [`Code`] types so a reflection reply can be
//! turned into a regular gRPC error and back.
use crate::ErrorResponse;
use tonic::{Code, Status};

/// Canonical names of every gRPC status code, indexed by numeric value.
const CODE_NAMES: [(Code, &str); 17] = [
    (Code::Ok, "OK"),
    (Code::Cancelled, "CANCELLED"),
    (Code::Unknown, "UNKNOWN"),
    (Code::InvalidArgument, "INVALID_ARGUMENT"),
    (Code::DeadlineExceeded, "DEADLINE_EXCEEDED"),
    (Code::NotFound, "NOT_FOUND"),
    (Code::AlreadyExists, "ALREADY_EXISTS"),
    (Code::PermissionDenied, "PERMISSION_DENIED"),
    (Code::ResourceExhausted, "RESOURCE_EXHAUSTED"),
    (Code::FailedPrecondition, "FAILED_PRECONDITION"),
    (Code::Aborted, "ABORTED"),
    (Code::OutOfRange, "OUT_OF_RANGE"),
    (Code::Unimplemented, "UNIMPLEMENTED"),
    (Code::Internal, "INTERNAL"),
    (Code::Unavailable, "UNAVAILABLE"),
    (Code::DataLoss, "DATA_LOSS"),
    (Code::Unauthenticated, "UNAUTHENTICATED"),
];

/// The canonical upper snake case name of `code` (e.g. `NOT_FOUND`).
pub fn code_name(code: Code) -> &'static str {
    CODE_NAMES[code as usize].1
}

/// Label for a raw `error_code` value: its canonical name, or `non-canonical` when the value
/// is not one of the gRPC status codes.
pub fn describe_code(value: i32) -> &'static str {
    usize::try_from(value)
        .ok()
        .and_then(|index| CODE_NAMES.get(index))
        .map_or("non-canonical", |(_, name)| *name)
}

/// Parses a status code from its number or its name.
///
/// Names are matched ignoring case, `_` and `-`, so `NOT_FOUND`, `not-found` and
/// `NotFound` are all accepted. Numbers outside the canonical range are rejected.
pub fn parse_code(value: &str) -> Option<Code> {
    let value = value.trim();

    if let Ok(number) = value.parse::<usize>() {
        return CODE_NAMES.get(number).map(|(code, _)| *code);
    }

    let normalized = normalize(value);
    CODE_NAMES
        .iter()
        .find(|(_, name)| normalize(name) == normalized)
        .map(|(code, _)| *code)
}

fn normalize(value: &str) -> String {
    value
        .chars()
        .filter(|c| *c != '_' && *c != '-')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

impl ErrorResponse {
    pub fn from_code(code: Code, error_message: impl Into<String>) -> Self {
        Self::new(code as i32, error_message)
    }

    pub fn not_found(error_message: impl Into<String>) -> Self {
        Self::from_code(Code::NotFound, error_message)
    }

    pub fn invalid_argument(error_message: impl Into<String>) -> Self {
        Self::from_code(Code::InvalidArgument, error_message)
    }

    pub fn unimplemented(error_message: impl Into<String>) -> Self {
        Self::from_code(Code::Unimplemented, error_message)
    }

    /// The status code carried by `error_code`.
    ///
    /// Values outside the canonical range map to [`Code::Unknown`].
    pub fn code(&self) -> Code {
        Code::from_i32(self.error_code)
    }
}

impl From<&Status> for ErrorResponse {
    fn from(status: &Status) -> Self {
        Self::from_code(status.code(), status.message())
    }
}

impl From<Status> for ErrorResponse {
    fn from(status: Status) -> Self {
        Self::from(&status)
    }
}

impl From<ErrorResponse> for Status {
    fn from(response: ErrorResponse) -> Self {
        Status::new(response.code(), response.error_message)
    }
}
