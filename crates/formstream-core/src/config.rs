//! Form parsing limits.
//!
//! [`FormOptions`] is built once at startup and shared read-only by every
//! request. Each component receives it explicitly; nothing reads limits from
//! global state.

use std::time::Duration;

use serde::Deserialize;

/// RFC 2046 recommends multipart boundary length <= 70 characters.
pub const DEFAULT_BOUNDARY_LENGTH_LIMIT: usize = 70;

/// Default maximum number of form values per request.
pub const DEFAULT_VALUE_COUNT_LIMIT: usize = 1024;

/// Default maximum length of a single decoded form value (4MB).
pub const DEFAULT_VALUE_LENGTH_LIMIT: usize = 4 * 1024 * 1024;

/// Default maximum number of headers per section.
pub const DEFAULT_HEADERS_COUNT_LIMIT: usize = 16;

/// Default maximum size of a section's header block (16KB).
pub const DEFAULT_HEADERS_LENGTH_LIMIT: usize = 16 * 1024;

/// Default maximum size of a single section body (128MB).
pub const DEFAULT_BODY_LENGTH_LIMIT: u64 = 128 * 1024 * 1024;

/// Default read buffer size (16KB).
pub const DEFAULT_BUFFER_SIZE: usize = 16 * 1024;

/// Configuration for streaming form parsing.
///
/// Deserializes from JSON with every missing key falling back to its default:
///
/// ```
/// use formstream_core::FormOptions;
///
/// let options = FormOptions::from_json(r#"{ "value_count_limit": 10 }"#).unwrap();
/// assert_eq!(options.get_value_count_limit(), 10);
/// assert_eq!(options.get_boundary_length_limit(), 70);
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FormOptions {
    /// Maximum boundary length in bytes.
    multipart_boundary_length_limit: usize,
    /// Maximum number of accumulated form values.
    value_count_limit: usize,
    /// Maximum decoded length of one form value.
    value_length_limit: usize,
    /// Maximum number of headers in one section.
    multipart_headers_count_limit: usize,
    /// Maximum size of one section's header block.
    multipart_headers_length_limit: usize,
    /// Maximum size of one section body; `None` disables the check.
    multipart_body_length_limit: Option<u64>,
    /// Size of each read from the underlying stream.
    buffer_size: usize,
    /// Deadline for parsing the whole request.
    request_timeout_ms: Option<u64>,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            multipart_boundary_length_limit: DEFAULT_BOUNDARY_LENGTH_LIMIT,
            value_count_limit: DEFAULT_VALUE_COUNT_LIMIT,
            value_length_limit: DEFAULT_VALUE_LENGTH_LIMIT,
            multipart_headers_count_limit: DEFAULT_HEADERS_COUNT_LIMIT,
            multipart_headers_length_limit: DEFAULT_HEADERS_LENGTH_LIMIT,
            multipart_body_length_limit: Some(DEFAULT_BODY_LENGTH_LIMIT),
            buffer_size: DEFAULT_BUFFER_SIZE,
            request_timeout_ms: None,
        }
    }
}

impl FormOptions {
    /// Create a new configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load options from a JSON document.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Set the maximum boundary length.
    #[must_use]
    pub fn boundary_length_limit(mut self, len: usize) -> Self {
        self.multipart_boundary_length_limit = len;
        self
    }

    /// Set the maximum number of form values.
    #[must_use]
    pub fn value_count_limit(mut self, count: usize) -> Self {
        self.value_count_limit = count;
        self
    }

    /// Set the maximum length of a single form value.
    #[must_use]
    pub fn value_length_limit(mut self, len: usize) -> Self {
        self.value_length_limit = len;
        self
    }

    /// Set the maximum number of headers per section.
    #[must_use]
    pub fn headers_count_limit(mut self, count: usize) -> Self {
        self.multipart_headers_count_limit = count;
        self
    }

    /// Set the maximum header block size per section.
    #[must_use]
    pub fn headers_length_limit(mut self, len: usize) -> Self {
        self.multipart_headers_length_limit = len;
        self
    }

    /// Set the maximum body size per section.
    #[must_use]
    pub fn body_length_limit(mut self, len: Option<u64>) -> Self {
        self.multipart_body_length_limit = len;
        self
    }

    /// Set the read buffer size. Values below 1 are clamped to 1.
    #[must_use]
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }

    /// Set the whole-request parse deadline.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout_ms =
            timeout.map(|t| u64::try_from(t.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Get the maximum boundary length.
    #[must_use]
    pub fn get_boundary_length_limit(&self) -> usize {
        self.multipart_boundary_length_limit
    }

    /// Get the maximum number of form values.
    #[must_use]
    pub fn get_value_count_limit(&self) -> usize {
        self.value_count_limit
    }

    /// Get the maximum length of a single form value.
    #[must_use]
    pub fn get_value_length_limit(&self) -> usize {
        self.value_length_limit
    }

    /// Get the maximum number of headers per section.
    #[must_use]
    pub fn get_headers_count_limit(&self) -> usize {
        self.multipart_headers_count_limit
    }

    /// Get the maximum header block size per section.
    #[must_use]
    pub fn get_headers_length_limit(&self) -> usize {
        self.multipart_headers_length_limit
    }

    /// Get the maximum body size per section.
    #[must_use]
    pub fn get_body_length_limit(&self) -> Option<u64> {
        self.multipart_body_length_limit
    }

    /// Get the read buffer size.
    #[must_use]
    pub fn get_buffer_size(&self) -> usize {
        self.buffer_size.max(1)
    }

    /// Get the whole-request parse deadline.
    #[must_use]
    pub fn get_request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}
