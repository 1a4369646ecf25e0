//! # JSON Mapping
//!
//! The proto3 canonical JSON form of [`ErrorResponse`]:
//!
//! ```json
//! { "errorCode": 5, "errorMessage": "not found" }
//! ```
//!
//! Zero values are omitted on output. On input both the `lowerCamelCase` JSON names and the
//! original `snake_case` field names are accepted. `errorCode` may be a number or a numeric
//! string, and missing or `null` fields take their defaults.
//! Unknown protobuf fields have no JSON representation and are dropped.
use crate::ErrorResponse;
use serde::{Deserialize, Deserializer, Serialize, de::Error as _};

#[derive(Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct ErrorResponseJson {
    #[serde(
        alias = "error_code",
        deserialize_with = "deserialize_int32",
        skip_serializing_if = "Option::is_none"
    )]
    error_code: Option<i32>,
    #[serde(alias = "error_message", skip_serializing_if = "Option::is_none")]
    error_message: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Int32Value {
    Number(i32),
    Text(String),
}

fn deserialize_int32<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Int32Value>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Int32Value::Number(value)) => Ok(Some(value)),
        Some(Int32Value::Text(text)) => text
            .parse()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("invalid int32 value: {text:?}"))),
    }
}

impl ErrorResponse {
    pub fn to_json(&self) -> serde_json::Value {
        let json = ErrorResponseJson {
            error_code: Some(self.error_code).filter(|code| *code != 0),
            error_message: Some(self.error_message.clone()).filter(|text| !text.is_empty()),
        };

        serde_json::to_value(json).unwrap_or_default()
    }

    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        let json: ErrorResponseJson = serde_json::from_value(value)?;
        Ok(Self::new(
            json.error_code.unwrap_or_default(),
            json.error_message.unwrap_or_default(),
        ))
    }
}
