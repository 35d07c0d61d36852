//! JSON envelope responses.
//!
//! A [`Responder`] holds the transport status for one response and is
//! consumed by whichever `reply*` method writes the body, so a response is
//! written exactly once and its status cannot change afterwards.

use http::StatusCode;
use reqkit_model::{Envelope, EnvelopeStatus, RequestError};
use serde::Serialize;
use tracing::{error, warn};

use crate::body::ResponseBody;

/// Content type of every reqkit response.
pub const CONTENT_TYPE: &str = "application/json";

/// Builder for one outbound JSON response.
#[derive(Debug, PartialEq, Eq)]
pub struct Responder {
    status: StatusCode,
}

impl Default for Responder {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
        }
    }
}

impl Responder {
    /// A responder with transport status 200.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current transport status.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Set the transport status from a numeric code. Codes outside
    /// `100..=999` are ignored.
    pub fn set_http_code(&mut self, code: u16) {
        match StatusCode::from_u16(code) {
            Ok(status) => self.status = status,
            Err(_) => warn!(code, "ignoring invalid HTTP status code"),
        }
    }

    /// Set the transport status.
    pub fn set_http_status_code(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Write an envelope.
    ///
    /// If `data` cannot be serialized the response becomes a 500 failure
    /// envelope instead.
    pub fn reply<T: Serialize + ?Sized>(
        self,
        status: EnvelopeStatus,
        number: &str,
        code: &str,
        message: &str,
        data: Option<&T>,
    ) -> http::Response<ResponseBody> {
        let data = match data.map(serde_json::to_value).transpose() {
            Ok(data) => data,
            Err(err) => {
                error!(error = %err, code, "failed to serialize response payload");
                return serialization_failure();
            }
        };

        let envelope = Envelope::new(status, number, code, message, data);
        match envelope.to_json() {
            Ok(json) => json_response(self.status, json),
            Err(err) => {
                error!(error = %err, code, "failed to serialize response envelope");
                serialization_failure()
            }
        }
    }

    /// Write a success envelope without payload.
    pub fn reply_success(
        self,
        number: &str,
        code: &str,
        message: &str,
    ) -> http::Response<ResponseBody> {
        self.reply::<()>(EnvelopeStatus::Success, number, code, message, None)
    }

    /// Write a success envelope carrying `data`.
    pub fn reply_success_with<T: Serialize + ?Sized>(
        self,
        number: &str,
        code: &str,
        message: &str,
        data: &T,
    ) -> http::Response<ResponseBody> {
        self.reply(EnvelopeStatus::Success, number, code, message, Some(data))
    }

    /// Write a failure envelope without payload.
    pub fn reply_failed(
        self,
        number: &str,
        code: &str,
        message: &str,
    ) -> http::Response<ResponseBody> {
        self.reply::<()>(EnvelopeStatus::Failed, number, code, message, None)
    }

    /// Write a failure envelope carrying `data`.
    pub fn reply_failed_with<T: Serialize + ?Sized>(
        self,
        number: &str,
        code: &str,
        message: &str,
        data: &T,
    ) -> http::Response<ResponseBody> {
        self.reply(EnvelopeStatus::Failed, number, code, message, Some(data))
    }

    /// Write `payload` as the whole body with transport status `status`,
    /// without an envelope.
    pub fn reply_custom<T: Serialize + ?Sized>(
        mut self,
        status: StatusCode,
        payload: &T,
    ) -> http::Response<ResponseBody> {
        self.status = status;
        match serde_json::to_vec(payload) {
            Ok(json) => json_response(self.status, json),
            Err(err) => {
                error!(error = %err, "failed to serialize custom response");
                serialization_failure()
            }
        }
    }
}

/// Render an ingestion error as a failure envelope.
///
/// The transport status and the envelope's `status_number` both carry the
/// error's HTTP status; `status_code` carries its machine code.
#[must_use]
pub fn error_to_response(err: &RequestError) -> http::Response<ResponseBody> {
    let status = err.status_code();
    let mut responder = Responder::new();
    responder.set_http_status_code(status);
    responder.reply_failed(status.as_str(), err.code(), &err.to_string())
}

fn json_response(status: StatusCode, json: Vec<u8>) -> http::Response<ResponseBody> {
    http::Response::builder()
        .status(status)
        .header(http::header::CONTENT_TYPE, CONTENT_TYPE)
        .body(ResponseBody::from_json(json))
        .expect("valid JSON response")
}

fn serialization_failure() -> http::Response<ResponseBody> {
    let body = br#"{"status":0,"status_number":"500","status_code":"SERIALIZATION_ERROR","status_message":"failed to serialize response","data":null}"#;
    json_response(StatusCode::INTERNAL_SERVER_ERROR, body.to_vec())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use bytes::Bytes;
    use http_body_util::BodyExt;

    use super::*;

    async fn body_string(resp: http::Response<ResponseBody>) -> String {
        let bytes: Bytes = resp.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_should_write_success_envelope_with_null_data() {
        let resp = Responder::new().reply_success("0000000", "SSSSSS", "Success");
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("content-type").and_then(|v| v.to_str().ok()),
            Some(CONTENT_TYPE)
        );
        assert_eq!(
            body_string(resp).await,
            r#"{"status":1,"status_number":"0000000","status_code":"SSSSSS","status_message":"Success","data":null}"#
        );
    }

    #[tokio::test]
    async fn test_should_keep_transport_status_independent_of_envelope() {
        let mut responder = Responder::new();
        responder.set_http_code(422);
        let resp = responder.reply_failed_with("1000001", "VALID", "bad input", &["age"]);
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json: serde_json::Value = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(json["status"], 0);
        assert_eq!(json["data"][0], "age");
    }

    #[test]
    fn test_should_ignore_invalid_status_code() {
        let mut responder = Responder::new();
        responder.set_http_code(42);
        assert_eq!(responder.status(), StatusCode::OK);
        responder.set_http_status_code(StatusCode::CREATED);
        assert_eq!(responder.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_should_write_custom_payload_without_envelope() {
        let resp =
            Responder::new().reply_custom(StatusCode::ACCEPTED, &BTreeMap::from([("ok", true)]));
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
        assert_eq!(body_string(resp).await, r#"{"ok":true}"#);
    }

    #[tokio::test]
    async fn test_should_render_request_error_as_failure_envelope() {
        let err = RequestError::BodyTooLarge { limit: 8 };
        let resp = error_to_response(&err);
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let json: serde_json::Value = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(json["status"], 0);
        assert_eq!(json["status_number"], "413");
        assert_eq!(json["status_code"], "BODY_TOO_LARGE");
        assert_eq!(json["data"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn test_should_fall_back_to_server_error_on_unserializable_payload() {
        // JSON object keys must be strings.
        let payload = BTreeMap::from([((1, 2), "x")]);
        let resp = Responder::new().reply_success_with("0", "S", "ok", &payload);
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_string(resp).await.contains("SERIALIZATION_ERROR"));
    }
}
