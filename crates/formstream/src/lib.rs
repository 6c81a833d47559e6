//! Streaming multipart uploads with typed form binding.
//!
//! formstream decodes a `multipart/form-data` request body section by
//! section, stores the uploaded file on disk as it arrives and binds the
//! remaining form values into a typed request:
//!
//! - **Bounded memory**: the body is never buffered whole
//! - **Typed limits**: every limit breach is an [`UploadError`]
//! - **No leftovers**: failed or cancelled uploads leave no files behind
//! - **FastAPI-style errors**: validation failures as `{type, loc, msg}`
//!
//! # Quick Start
//!
//! ```no_run
//! use formstream::prelude::*;
//!
//! # async fn run(content_type: &str, body: &[u8]) {
//! let options = FormOptions::default();
//! let sink = FileSink::temp();
//! let response = stream_upload(content_type, body, &options, &sink).await;
//! println!("{} {}", response.status(), response.body());
//! # }
//! ```
//!
//! # Crate Structure
//!
//! - [`formstream_core`]: boundary, section reader, accumulator, file sink
//! - [`binding`]: [`FromFormFields`] and validation errors
//! - [`response`]: status + JSON mapping
//! - [`handler`]: [`stream_upload`], the end-to-end flow

#![forbid(unsafe_code)]

pub mod binding;
pub mod handler;
pub mod response;

// Re-export the core crate
pub use formstream_core as core;

pub use binding::{FileUploadRequest, FromFormFields, LocItem, ValidationError, ValidationErrors};
pub use formstream_core::{
    ContentDisposition, FieldAccumulator, FileSink, FormFields, FormOptions, Section,
    SectionReader, StreamedForm, UploadError, UploadedFile, read_multipart,
};
pub use handler::stream_upload;
pub use response::{FileUploadResult, StatusCode, UploadResponse};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::{
        FileSink, FileUploadRequest, FileUploadResult, FormFields, FormOptions, FromFormFields,
        StatusCode, StreamedForm, UploadError, UploadResponse, UploadedFile, ValidationError,
        ValidationErrors, read_multipart, stream_upload,
    };
}
