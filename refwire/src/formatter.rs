use colored::*;
use refwire_core::{
    DecodeError, ErrorResponse,
    status::describe_code,
    wire::{RawField, WireReader, WireType},
};
use std::fmt::Display;

/// A wrapper struct for a formatted, colored string.
///
/// Implements `Display` so it can be printed directly.
pub struct FormattedString(pub String);

/// A successfully decoded payload.
pub struct DecodedReply(pub ErrorResponse);

/// Every field of a payload, in wire order.
pub struct FieldList<'a>(pub Vec<RawField<'a>>);

pub struct GenericError<T: Display>(pub &'static str, pub T);

impl std::fmt::Display for FormattedString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f)?;
        writeln!(f, "{}", self.0)?;
        Ok(())
    }
}

impl From<DecodedReply> for FormattedString {
    fn from(DecodedReply(reply): DecodedReply) -> Self {
        let json = reply.to_json();
        let mut out = serde_json::to_string_pretty(&json).unwrap_or_else(|_| json.to_string());

        out.push_str(&format!(
            "\n\n{} {} ({})",
            "status:".cyan(),
            describe_code(reply.error_code).green(),
            reply.error_code
        ));

        if !reply.unknown_fields.is_empty() {
            out.push_str(&format!(
                "\n{} {}",
                "unknown fields:".cyan(),
                reply.unknown_fields.len().to_string().yellow()
            ));
            for field in &reply.unknown_fields {
                out.push_str(&format!(
                    "\n  - #{} {} ({} bytes)",
                    field.number(),
                    field.wire_type(),
                    field.raw().len()
                ));
            }
        }

        FormattedString(out)
    }
}

impl From<FieldList<'_>> for FormattedString {
    fn from(FieldList(fields): FieldList<'_>) -> Self {
        if fields.is_empty() {
            return FormattedString(
                "Empty payload (all fields at their defaults)."
                    .yellow()
                    .to_string(),
            );
        }

        let mut out = String::new();
        for field in fields {
            let name = match (field.key.number, field.key.wire_type) {
                (1, WireType::Varint) => "error_code".green(),
                (2, WireType::LengthDelimited) => "error_message".green(),
                _ => "unknown".yellow(),
            };

            out.push_str(&format!(
                "@{:<4} #{} {} {} = {}\n",
                field.offset,
                field.key.number,
                field.key.wire_type.to_string().cyan(),
                name,
                describe_value(&field)
            ));
        }

        FormattedString(out.trim_end().to_string())
    }
}

fn describe_value(field: &RawField<'_>) -> String {
    let payload = field.payload();
    let mut reader = WireReader::new(payload);

    match (field.key.number, field.key.wire_type) {
        (1, WireType::Varint) => match reader.read_varint() {
            Ok(value) => {
                let code = value as i32;
                format!("{} ({})", code, describe_code(code))
            }
            Err(err) => err.to_string(),
        },
        (_, WireType::Varint) => match reader.read_varint() {
            Ok(value) => value.to_string(),
            Err(err) => err.to_string(),
        },
        (2, WireType::LengthDelimited) => match reader.read_length_delimited() {
            Ok(bytes) => format!("{:?}", String::from_utf8_lossy(bytes)),
            Err(err) => err.to_string(),
        },
        (_, WireType::LengthDelimited) => match reader.read_length_delimited() {
            Ok(bytes) => format!("[{} bytes] {}", bytes.len(), hex::encode(bytes)),
            Err(err) => err.to_string(),
        },
        (_, WireType::Fixed32 | WireType::Fixed64) => hex::encode(payload),
        (_, WireType::StartGroup | WireType::EndGroup) => {
            format!("group [{} bytes]", payload.len())
        }
    }
}

impl From<DecodeError> for FormattedString {
    fn from(err: DecodeError) -> Self {
        FormattedString(format!("{}\n\n'{}'", "Decode Failed:".red().bold(), err))
    }
}

impl From<std::io::Error> for FormattedString {
    fn from(err: std::io::Error) -> Self {
        FormattedString(format!(
            "{}\n\n'{}'",
            "Failed to read input:".red().bold(),
            err
        ))
    }
}

impl<T: Display> From<GenericError<T>> for FormattedString {
    fn from(GenericError(msg, err): GenericError<T>) -> Self {
        FormattedString(format!("{}:\n\n'{}'", msg.red().bold(), err))
    }
}
