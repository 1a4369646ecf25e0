//! # CLI
//!
//! This module defines the command-line interface of `refwire` using `clap`.
//!
//! It is responsible for parsing user input and performing validation (e.g., turning status code
//! names into numbers and hex strings into bytes).
use clap::{Args, Parser, Subcommand};
use refwire_core::status::parse_code;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "refwire",
    version,
    about = "Encode, decode and inspect gRPC reflection ErrorResponse payloads"
)]
pub struct Cli {
    #[command(flatten)]
    pub decode: DecodeArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Overrides for the decode options stored in the config file.
#[derive(Args, Default)]
pub struct DecodeArgs {
    /// Path to a JSON config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Replace invalid UTF-8 in strings instead of failing
    #[arg(long, global = true)]
    pub lossy: bool,

    /// Maximum nesting of unknown group fields (capped at 1000)
    #[arg(long, global = true)]
    pub recursion_limit: Option<u32>,

    /// Reject payloads larger than this many bytes
    #[arg(long, global = true)]
    pub max_size: Option<usize>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Encode an ErrorResponse and print it as hex
    ///
    /// ## Examples:
    ///
    /// ```bash
    /// refwire encode --code NOT_FOUND --message "not found"
    /// ```
    Encode {
        /// Status code, as a number or a name (e.g. 5, NOT_FOUND, not-found)
        #[arg(short, long, value_parser = parse_status_code, allow_negative_numbers = true)]
        code: i32,

        /// Error message
        #[arg(short, long, default_value = "")]
        message: String,
    },

    /// Decode a hex payload and print it as JSON
    Decode {
        /// Hex encoded payload, or '-' to read it from stdin
        #[arg(value_parser = parse_payload)]
        payload: Payload,
    },

    /// List every field of a hex payload, known or unknown
    Inspect {
        /// Hex encoded payload, or '-' to read it from stdin
        #[arg(value_parser = parse_payload)]
        payload: Payload,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    Stdin,
    Bytes(Vec<u8>),
}

fn parse_status_code(value: &str) -> Result<i32, String> {
    if let Ok(number) = value.trim().parse::<i32>() {
        return Ok(number);
    }

    parse_code(value)
        .map(|code| code as i32)
        .ok_or_else(|| format!("Unknown status code: '{value}'"))
}

fn parse_payload(value: &str) -> Result<Payload, String> {
    if value == "-" {
        return Ok(Payload::Stdin);
    }

    decode_hex(value).map(Payload::Bytes)
}

/// Decodes hex text, ignoring whitespace and an optional `0x` prefix.
pub fn decode_hex(value: &str) -> Result<Vec<u8>, String> {
    let compact: String = value.chars().filter(|c| !c.is_whitespace()).collect();
    let digits = compact
        .strip_prefix("0x")
        .or_else(|| compact.strip_prefix("0X"))
        .unwrap_or(&compact);

    hex::decode(digits).map_err(|e| format!("Invalid hex payload: {e}"))
}
