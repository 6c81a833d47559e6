//! Streaming `multipart/form-data` decoding for formstream.
//!
//! This crate turns one request body into form values and at most one stored
//! file without ever holding the body in memory:
//! - [`extract_boundary`] validates the request's `Content-Type`
//! - [`SectionReader`] walks the body one [`Section`] at a time
//! - [`ContentDisposition`] classifies each section
//! - [`FieldAccumulator`] collects form values under a count limit
//! - [`FileSink`] copies file sections to unique temporary files
//! - [`read_multipart`] drives all of the above for a whole request
//!
//! # Design Principles
//!
//! - Memory bounded by the read buffer, not by body size
//! - Every limit breach is a typed [`UploadError`]
//! - Dropping the request future leaves no partial files behind
//!
//! # Example
//!
//! ```no_run
//! use formstream_core::{FileSink, FormOptions, read_multipart};
//!
//! # async fn run(body: &[u8]) -> Result<(), formstream_core::UploadError> {
//! let options = FormOptions::default().value_count_limit(100);
//! let form = read_multipart(
//!     "multipart/form-data; boundary=xyz",
//!     body,
//!     &options,
//!     &FileSink::temp(),
//! )
//! .await?;
//! println!("name = {:?}", form.fields.get("name"));
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod accumulator;
pub mod boundary;
pub mod charset;
pub mod config;
pub mod disposition;
pub mod driver;
pub mod error;
pub mod header;
pub mod section;
pub mod sink;

#[cfg(test)]
mod test_support;

pub use accumulator::{FieldAccumulator, FormFields, normalize_undefined};
pub use boundary::{extract_boundary, is_multipart_content_type};
pub use charset::{decode_text, resolve_charset};
pub use config::{
    DEFAULT_BODY_LENGTH_LIMIT, DEFAULT_BOUNDARY_LENGTH_LIMIT, DEFAULT_BUFFER_SIZE,
    DEFAULT_HEADERS_COUNT_LIMIT, DEFAULT_HEADERS_LENGTH_LIMIT, DEFAULT_VALUE_COUNT_LIMIT,
    DEFAULT_VALUE_LENGTH_LIMIT, FormOptions,
};
pub use disposition::ContentDisposition;
pub use driver::{StreamedForm, read_multipart};
pub use error::UploadError;
pub use header::ParamHeader;
pub use section::{Section, SectionHeaders, SectionReader};
pub use sink::{FileSink, UploadedFile};

// Re-exported so callers can name resolved charsets without a direct dependency.
pub use encoding_rs::Encoding;
