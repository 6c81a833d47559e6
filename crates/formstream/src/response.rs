//! Upload outcomes as status + JSON body.

use std::fmt;

use formstream_core::UploadError;
use serde::Serialize;

use crate::binding::ValidationErrors;

/// HTTP status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusCode(u16);

impl StatusCode {
    /// 200 OK
    pub const OK: Self = Self(200);
    /// 400 Bad Request
    pub const BAD_REQUEST: Self = Self(400);
    /// 408 Request Timeout
    pub const REQUEST_TIMEOUT: Self = Self(408);
    /// 500 Internal Server Error
    pub const INTERNAL_SERVER_ERROR: Self = Self(500);

    /// Create a status code from a u16.
    #[must_use]
    pub const fn from_u16(code: u16) -> Self {
        Self(code)
    }

    /// Get the numeric value.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Check if status is success (2xx).
    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 >= 200 && self.0 < 300
    }

    /// Check if status is client error (4xx).
    #[must_use]
    pub const fn is_client_error(self) -> bool {
        self.0 >= 400 && self.0 < 500
    }

    /// Get the canonical reason phrase.
    #[must_use]
    pub fn canonical_reason(self) -> &'static str {
        match self.0 {
            200 => "OK",
            400 => "Bad Request",
            408 => "Request Timeout",
            500 => "Internal Server Error",
            _ => "Unknown",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.0, self.canonical_reason())
    }
}

/// What a successful upload reports back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FileUploadResult {
    /// Bound `Name`.
    pub name: String,
    /// Bound `Age`.
    pub age: Option<i32>,
    /// Bound `Zipcode`.
    pub zipcode: Option<String>,
    /// Where the last uploaded file was kept, if any.
    pub file_path: Option<String>,
}

/// Status plus JSON body, ready for the transport layer.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadResponse {
    status: StatusCode,
    body: serde_json::Value,
}

impl UploadResponse {
    /// 200 with `result` as the body.
    #[must_use]
    pub fn ok(result: &FileUploadResult) -> Self {
        Self {
            status: StatusCode::OK,
            body: serde_json::to_value(result).unwrap_or(serde_json::Value::Null),
        }
    }

    /// `{"detail": "<detail>"}` with the given status.
    #[must_use]
    pub fn detail(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            body: serde_json::json!({ "detail": detail.into() }),
        }
    }

    /// 400 listing every validation failure.
    #[must_use]
    pub fn validation(errors: &ValidationErrors) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: errors.to_json(),
        }
    }

    /// Map a decoding failure. Messages are fixed per kind so that paths and
    /// I/O details never reach the client.
    #[must_use]
    pub fn from_upload_error(err: &UploadError) -> Self {
        match err {
            UploadError::InvalidContentType { content_type } => Self::detail(
                StatusCode::BAD_REQUEST,
                format!("Expected a multipart request, but got {content_type}"),
            ),
            UploadError::TimedOut => {
                Self::detail(StatusCode::REQUEST_TIMEOUT, "Request body timed out")
            }
            UploadError::StorageWriteError(_) => Self::detail(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to store uploaded file",
            ),
            UploadError::Io(_) => {
                Self::detail(StatusCode::BAD_REQUEST, "Failed to read request body")
            }
            // The remaining messages carry only limits and fixed text.
            other => Self::detail(StatusCode::BAD_REQUEST, other.to_string()),
        }
    }

    /// Response status.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// JSON body.
    #[must_use]
    pub fn body(&self) -> &serde_json::Value {
        &self.body
    }

    /// Serialized body bytes.
    #[must_use]
    pub fn body_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(&self.body).unwrap_or_else(|_| b"{}".to_vec())
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;
    use crate::binding::{ValidationError, form_loc};

    #[test]
    fn result_uses_pascal_case_keys() {
        let resp = UploadResponse::ok(&FileUploadResult {
            name: "Alice".into(),
            age: None,
            zipcode: Some("12345".into()),
            file_path: None,
        });
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.body(),
            &serde_json::json!({"Name": "Alice", "Age": null, "Zipcode": "12345", "FilePath": null})
        );
    }

    #[test]
    fn content_type_mismatch_message() {
        let resp = UploadResponse::from_upload_error(&UploadError::InvalidContentType {
            content_type: "text/plain".into(),
        });
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            resp.body(),
            &serde_json::json!({"detail": "Expected a multipart request, but got text/plain"})
        );
    }

    #[test]
    fn storage_failure_hides_details() {
        let err = UploadError::StorageWriteError(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "/var/tmp/secret-path denied",
        ));
        let resp = UploadResponse::from_upload_error(&err);
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let text = String::from_utf8(resp.body_bytes()).unwrap();
        assert!(!text.contains("secret-path"));
    }

    #[test]
    fn timeout_and_limits() {
        assert_eq!(
            UploadResponse::from_upload_error(&UploadError::TimedOut).status(),
            StatusCode::REQUEST_TIMEOUT
        );
        let resp =
            UploadResponse::from_upload_error(&UploadError::ValueCountLimitExceeded { limit: 3 });
        assert!(resp.status().is_client_error());
        assert_eq!(resp.body()["detail"], "form value count limit 3 exceeded");
    }

    #[test]
    fn validation_body() {
        let mut errors = ValidationErrors::new();
        errors.push(ValidationError::missing(form_loc("Name")));
        let resp = UploadResponse::validation(&errors);
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(resp.body()["detail"][0]["loc"], serde_json::json!(["form", "Name"]));
    }
}
