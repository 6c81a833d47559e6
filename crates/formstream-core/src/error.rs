//! Errors raised while streaming a multipart request.

use std::io;

/// Errors that can occur while parsing a multipart upload.
///
/// Every variant is terminal for the request: a multipart stream cannot be
/// rewound, so there is no partial retry.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// The request is not `multipart/*`.
    #[error("expected a multipart request, but got {content_type}")]
    InvalidContentType {
        /// The declared Content-Type (empty when absent).
        content_type: String,
    },
    /// Missing boundary in Content-Type header.
    #[error("missing boundary in multipart Content-Type")]
    MissingBoundary,
    /// Boundary exceeds the configured length.
    #[error("multipart boundary length {len} exceeds limit of {max}")]
    BoundaryTooLong { len: usize, max: usize },
    /// Framing or section header parse failure.
    #[error("malformed multipart body: {detail}")]
    MalformedMultipartBody { detail: &'static str },
    /// Too many headers in one section.
    #[error("multipart headers count limit {limit} exceeded")]
    HeadersCountLimitExceeded { limit: usize },
    /// Section header block too large.
    #[error("multipart headers length limit {limit} exceeded")]
    HeadersLengthLimitExceeded { limit: usize },
    /// A single section body is larger than allowed.
    #[error("multipart section length limit {limit} exceeded")]
    SectionTooLarge { limit: u64 },
    /// Too many form values.
    #[error("form value count limit {limit} exceeded")]
    ValueCountLimitExceeded { limit: usize },
    /// A single form value is too long.
    #[error("form value length limit {limit} exceeded")]
    ValueLengthLimitExceeded { limit: usize },
    /// Persisting an uploaded file failed.
    #[error("failed to store uploaded file")]
    StorageWriteError(#[source] io::Error),
    /// Reading the request body failed.
    #[error("failed to read request body")]
    Io(#[source] io::Error),
    /// The request did not finish within the configured deadline.
    #[error("multipart request timed out")]
    TimedOut,
}

impl UploadError {
    pub(crate) fn malformed(detail: &'static str) -> Self {
        Self::MalformedMultipartBody { detail }
    }

    /// Returns true when the client sent something unacceptable (a 4xx
    /// condition), false for server-side storage failures.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::StorageWriteError(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages_carry_limits() {
        let err = UploadError::ValueCountLimitExceeded { limit: 1000 };
        assert_eq!(err.to_string(), "form value count limit 1000 exceeded");

        let err = UploadError::BoundaryTooLong { len: 71, max: 70 };
        assert_eq!(
            err.to_string(),
            "multipart boundary length 71 exceeds limit of 70"
        );
    }

    #[test]
    fn storage_error_hides_path_and_is_server_side() {
        let err = UploadError::StorageWriteError(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "/tmp/secret-upload.tmp",
        ));
        assert!(!err.to_string().contains("/tmp"));
        assert!(!err.is_client_error());
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn parse_errors_are_client_errors() {
        assert!(UploadError::MissingBoundary.is_client_error());
        assert!(UploadError::malformed("x").is_client_error());
        assert!(UploadError::TimedOut.is_client_error());
    }
}
