//! # Decode Options
//!
//! Settings that change how strictly [`crate::ErrorResponse`] accepts its input.
//!
//! The defaults match what `prost` does: strings must be valid UTF-8, groups may nest
//! up to 100 levels deep and there is no upper bound on the message size.
use crate::wire::DecodeError;
use serde::{Deserialize, Serialize};

/// Group nesting limit applied when skipping unknown group fields.
pub const DEFAULT_RECURSION_LIMIT: u32 = 100;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct DecodeOptions {
    /// Reject `error_message` payloads that are not valid UTF-8.
    ///
    /// When disabled, invalid sequences are replaced with `U+FFFD`.
    pub strict_utf8: bool,
    /// How deep unknown group fields may nest before decoding gives up.
    ///
    /// Values above [`crate::wire::MAX_RECURSION_LIMIT`] are treated as that limit.
    pub recursion_limit: u32,
    /// Inputs longer than this many bytes are rejected before any parsing happens.
    pub max_message_size: Option<usize>,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            strict_utf8: true,
            recursion_limit: DEFAULT_RECURSION_LIMIT,
            max_message_size: None,
        }
    }
}

impl DecodeOptions {
    /// Options that accept invalid UTF-8 in string fields.
    pub fn lossy() -> Self {
        Self {
            strict_utf8: false,
            ..Self::default()
        }
    }

    pub fn with_recursion_limit(mut self, limit: u32) -> Self {
        self.recursion_limit = limit;
        self
    }

    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = Some(size);
        self
    }

    /// Fails with [`DecodeError::MessageTooLarge`] if `size` is over `max_message_size`.
    pub fn check_message_size(&self, size: usize) -> Result<(), DecodeError> {
        match self.max_message_size {
            Some(limit) if size > limit => Err(DecodeError::MessageTooLarge { size, limit }),
            _ => Ok(()),
        }
    }
}
