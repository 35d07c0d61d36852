//! The JSON response envelope.
//!
//! Every standard response body has the same five fields:
//!
//! ```json
//! {
//!   "status": 1,
//!   "status_number": "0000000",
//!   "status_code": "SSSSSS",
//!   "status_message": "Success",
//!   "data": null
//! }
//! ```
//!
//! `data` is always present and is `null` when no payload was supplied.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The envelope's own success flag, serialized as `0` or `1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EnvelopeStatus {
    /// `0`
    #[default]
    Failed,
    /// `1`
    Success,
}

impl EnvelopeStatus {
    /// Numeric wire value.
    #[must_use]
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Failed => 0,
            Self::Success => 1,
        }
    }
}

impl fmt::Display for EnvelopeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed => f.write_str("failed"),
            Self::Success => f.write_str("success"),
        }
    }
}

impl Serialize for EnvelopeStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for EnvelopeStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match u8::deserialize(deserializer)? {
            0 => Ok(Self::Failed),
            1 => Ok(Self::Success),
            other => Err(serde::de::Error::custom(format!(
                "envelope status must be 0 or 1, got {other}"
            ))),
        }
    }
}

/// Standard response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Success flag.
    pub status: EnvelopeStatus,
    /// Application-defined status number.
    pub status_number: String,
    /// Application-defined status code.
    pub status_code: String,
    /// Human-readable message.
    pub status_message: String,
    /// Optional payload; `null` on the wire when absent.
    pub data: Option<serde_json::Value>,
}

impl Envelope {
    /// Build an envelope from its parts.
    #[must_use]
    pub fn new(
        status: EnvelopeStatus,
        number: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
        data: Option<serde_json::Value>,
    ) -> Self {
        Self {
            status,
            status_number: number.into(),
            status_code: code.into(),
            status_message: message.into(),
            data,
        }
    }

    /// Serialize to JSON bytes.
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_serialize_without_payload_as_null_data() {
        let env = Envelope::new(EnvelopeStatus::Success, "0000000", "SSSSSS", "Success", None);
        let json = String::from_utf8(env.to_json().unwrap()).unwrap();
        assert_eq!(
            json,
            r#"{"status":1,"status_number":"0000000","status_code":"SSSSSS","status_message":"Success","data":null}"#
        );
    }

    #[test]
    fn test_should_serialize_failed_status_as_zero() {
        let env = Envelope::new(
            EnvelopeStatus::Failed,
            "400",
            "DECODE_ERROR",
            "bad body",
            Some(serde_json::json!({"field": "age"})),
        );
        let parsed: serde_json::Value = serde_json::from_slice(&env.to_json().unwrap()).unwrap();
        assert_eq!(parsed["status"], 0);
        assert_eq!(parsed["data"]["field"], "age");
    }

    #[test]
    fn test_should_reject_unknown_status_flag() {
        let json = r#"{"status":2,"status_number":"","status_code":"","status_message":"","data":null}"#;
        assert!(serde_json::from_str::<Envelope>(json).is_err());
    }
}
