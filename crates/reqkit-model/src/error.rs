//! Error types for request ingestion, parameter access, and uploaded files.
//!
//! Type mismatches in typed getters are not errors: they fall back to the
//! zero value of the requested type. The variants here cover the conditions a
//! caller has to act on.

use std::fmt;

/// The body encoding being decoded when a [`RequestError::Decode`] occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyKind {
    /// `multipart/form-data`
    Multipart,
    /// `application/x-www-form-urlencoded`
    Form,
    /// `application/json`
    Json,
}

impl BodyKind {
    /// Returns the media type this kind corresponds to.
    #[must_use]
    pub fn media_type(&self) -> &'static str {
        match self {
            Self::Multipart => "multipart/form-data",
            Self::Form => "application/x-www-form-urlencoded",
            Self::Json => "application/json",
        }
    }
}

impl fmt::Display for BodyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.media_type())
    }
}

/// Errors raised while building or reading a request context.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// The body does not match its declared content type.
    #[error("malformed {kind} body: {message}")]
    Decode {
        /// Encoding that failed.
        kind: BodyKind,
        /// What was wrong.
        message: String,
    },

    /// The transport failed while delivering the body.
    #[error("failed to read request body: {0}")]
    BodyRead(String),

    /// The body exceeded the configured size limit.
    #[error("request body exceeds {limit} bytes")]
    BodyTooLarge {
        /// Configured limit in bytes.
        limit: usize,
    },

    /// A required parameter is missing.
    #[error("no such parameter: {0}")]
    NotFound(String),

    /// A time parameter did not match any accepted layout.
    #[error("{0}: RFC3339 required")]
    Format(String),

    /// The raw body was already consumed by ingestion or a previous decode.
    #[error("request body already consumed")]
    BodyConsumed,

    /// The raw body could not be decoded into the requested type.
    #[error("failed to decode request body: {0}")]
    StructDecode(#[source] serde_json::Error),
}

impl RequestError {
    /// Build a decode error for the given body kind.
    #[must_use]
    pub fn decode(kind: BodyKind, message: impl Into<String>) -> Self {
        Self::Decode {
            kind,
            message: message.into(),
        }
    }

    /// HTTP status reported at the transport boundary.
    ///
    /// Every malformed body is a client error, whatever its encoding.
    #[must_use]
    pub fn status_code(&self) -> http::StatusCode {
        match self {
            Self::Decode { .. } | Self::StructDecode(_) | Self::Format(_) => {
                http::StatusCode::BAD_REQUEST
            }
            Self::BodyTooLarge { .. } => http::StatusCode::PAYLOAD_TOO_LARGE,
            Self::NotFound(_) => http::StatusCode::NOT_FOUND,
            Self::BodyRead(_) | Self::BodyConsumed => http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code, used as the envelope `status_code`.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Decode { .. } => "DECODE_ERROR",
            Self::BodyRead(_) => "BODY_READ_ERROR",
            Self::BodyTooLarge { .. } => "BODY_TOO_LARGE",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Format(_) => "FORMAT_ERROR",
            Self::BodyConsumed => "BODY_CONSUMED",
            Self::StructDecode(_) => "STRUCT_DECODE_ERROR",
        }
    }
}

/// How many files a multipart field holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    /// Exactly one file.
    Single,
    /// Two or more files.
    Multiple,
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single => f.write_str("a single file"),
            Self::Multiple => f.write_str("multiple files"),
        }
    }
}

/// Errors raised by the uploaded-file accessors.
#[derive(Debug, thiserror::Error)]
pub enum FileError {
    /// No file was uploaded under the field.
    #[error("no such file: {0}")]
    NotFound(String),

    /// The field was accessed with the wrong one/many assumption.
    #[error("field {field} holds {actual}, use the {} accessor instead", accessor_for(.actual))]
    WrongCardinality {
        /// Field name.
        field: String,
        /// What the field actually holds.
        actual: Cardinality,
    },

    /// Reading the upload or writing the destination failed.
    #[error("file I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

fn accessor_for(actual: &Cardinality) -> &'static str {
    match actual {
        Cardinality::Single => "single-file",
        Cardinality::Multiple => "multi-file",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_map_every_malformed_body_to_bad_request() {
        for kind in [BodyKind::Multipart, BodyKind::Form, BodyKind::Json] {
            let err = RequestError::decode(kind, "boom");
            assert_eq!(err.status_code(), http::StatusCode::BAD_REQUEST);
            assert_eq!(err.code(), "DECODE_ERROR");
        }
    }

    #[test]
    fn test_should_name_rfc3339_in_format_error() {
        let err = RequestError::Format("created_at".to_owned());
        assert!(err.to_string().contains("RFC3339 required"));
    }

    #[test]
    fn test_should_describe_cardinality_mismatch() {
        let err = FileError::WrongCardinality {
            field: "avatar".to_owned(),
            actual: Cardinality::Multiple,
        };
        let msg = err.to_string();
        assert!(msg.contains("avatar"));
        assert!(msg.contains("multi-file"));
    }

    #[test]
    fn test_should_map_body_limit_to_payload_too_large() {
        let err = RequestError::BodyTooLarge { limit: 10 };
        assert_eq!(err.status_code(), http::StatusCode::PAYLOAD_TOO_LARGE);
    }
}
