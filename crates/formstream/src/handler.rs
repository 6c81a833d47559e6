//! The upload endpoint: stream, bind, respond.

use formstream_core::{FileSink, FormOptions, read_multipart};
use tokio::io::AsyncRead;
use tracing::{error, info, warn};

use crate::binding::{FileUploadRequest, FromFormFields};
use crate::response::{FileUploadResult, UploadResponse};

/// Handle one upload request end to end.
///
/// On success the stored file (if any) is kept and its path reported as
/// `FilePath`; on any failure nothing is left on disk.
pub async fn stream_upload<R: AsyncRead + Unpin>(
    content_type: &str,
    body: R,
    options: &FormOptions,
    sink: &FileSink,
) -> UploadResponse {
    let form = match read_multipart(content_type, body, options, sink).await {
        Ok(form) => form,
        Err(err) => {
            if err.is_client_error() {
                warn!(error = %err, "rejected upload request");
            } else {
                error!(error = %err, "upload failed");
            }
            return UploadResponse::from_upload_error(&err);
        }
    };

    let request = match FileUploadRequest::from_form_fields(&form.fields) {
        Ok(request) => request,
        Err(errors) => {
            warn!(errors = errors.len(), "upload form failed validation");
            return UploadResponse::validation(&errors);
        }
    };

    let file_path = form
        .file
        .map(|file| file.into_path().to_string_lossy().into_owned());
    info!(
        sections = form.sections,
        has_file = file_path.is_some(),
        "upload accepted"
    );
    UploadResponse::ok(&FileUploadResult {
        name: request.name,
        age: request.age,
        zipcode: request.zipcode,
        file_path,
    })
}
