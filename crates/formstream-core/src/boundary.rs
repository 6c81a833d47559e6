//! Boundary extraction from the request Content-Type.
//!
//! Content-Type format: `multipart/form-data; boundary=----WebKitFormBoundary...`

use crate::error::UploadError;
use crate::header::ParamHeader;

/// Returns true if `content_type` declares a `multipart/*` media type.
#[must_use]
pub fn is_multipart_content_type(content_type: &str) -> bool {
    ParamHeader::parse(content_type).is_some_and(|h| is_multipart(h.value()))
}

fn is_multipart(media_type: &str) -> bool {
    media_type
        .split_once('/')
        .is_some_and(|(ty, sub)| ty.eq_ignore_ascii_case("multipart") && !sub.is_empty())
}

/// Validate that the request is multipart and return its boundary token.
///
/// The token is returned without surrounding quotes and without the leading
/// `--` that precedes it in the body.
pub fn extract_boundary(content_type: &str, max_len: usize) -> Result<String, UploadError> {
    let invalid = || UploadError::InvalidContentType {
        content_type: content_type.to_string(),
    };
    let header = ParamHeader::parse(content_type).ok_or_else(invalid)?;
    if !is_multipart(header.value()) {
        return Err(invalid());
    }

    let boundary = header
        .param("boundary")
        .filter(|b| !b.is_empty())
        .ok_or(UploadError::MissingBoundary)?;
    if boundary.len() > max_len {
        return Err(UploadError::BoundaryTooLong {
            len: boundary.len(),
            max: max_len,
        });
    }
    Ok(boundary.to_string())
}
