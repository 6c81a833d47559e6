//! Request-level orchestration.
//!
//! Pulls sections one at a time and routes each by its Content-Disposition:
//! files go to the [`FileSink`], form values to the [`FieldAccumulator`],
//! anything else is drained and dropped. Sections are never processed
//! concurrently; each one's framing depends on the previous being consumed.

use tokio::io::AsyncRead;
use tracing::{debug, info};

use crate::accumulator::{FieldAccumulator, FormFields, normalize_undefined};
use crate::boundary::extract_boundary;
use crate::charset::{decode_text, resolve_charset};
use crate::config::FormOptions;
use crate::disposition::ContentDisposition;
use crate::error::UploadError;
use crate::section::SectionReader;
use crate::sink::{FileSink, UploadedFile};

/// Everything collected from one multipart request.
#[derive(Debug)]
pub struct StreamedForm {
    /// Accumulated form values.
    pub fields: FormFields,
    /// The last uploaded file, if any. Earlier uploads in the same request
    /// were deleted when replaced.
    pub file: Option<UploadedFile>,
    /// Number of sections read, including skipped ones.
    pub sections: usize,
}

/// Parse a multipart request body.
///
/// The boundary is validated before a single body byte is read. When
/// [`FormOptions::request_timeout`] is set the whole parse is bounded by it;
/// on expiry every file written so far is removed.
pub async fn read_multipart<R: AsyncRead + Unpin>(
    content_type: &str,
    body: R,
    options: &FormOptions,
    sink: &FileSink,
) -> Result<StreamedForm, UploadError> {
    match options.get_request_timeout() {
        Some(limit) => tokio::time::timeout(limit, drive(content_type, body, options, sink))
            .await
            .map_err(|_| UploadError::TimedOut)?,
        None => drive(content_type, body, options, sink).await,
    }
}

async fn drive<R: AsyncRead + Unpin>(
    content_type: &str,
    body: R,
    options: &FormOptions,
    sink: &FileSink,
) -> Result<StreamedForm, UploadError> {
    let boundary = extract_boundary(content_type, options.get_boundary_length_limit())?;
    let mut reader = SectionReader::new(&boundary, body, options);
    let mut fields = FieldAccumulator::new(options.get_value_count_limit());
    let mut file: Option<UploadedFile> = None;
    let mut sections = 0usize;

    while let Some(mut section) = reader.next_section().await? {
        sections += 1;
        match section.disposition() {
            ContentDisposition::FileField { .. } => {
                let stored = sink.store(&mut section).await?;
                info!(section = sections, bytes = stored.len(), "stored upload");
                if file.replace(stored).is_some() {
                    debug!(section = sections, "discarded earlier upload in favor of newer one");
                }
            }
            ContentDisposition::FormField { name } => {
                let encoding = resolve_charset(section.content_type());
                let bytes = section
                    .read_to_end(options.get_value_length_limit())
                    .await?;
                let value = normalize_undefined(decode_text(&bytes, encoding));
                debug!(section = sections, field = %name, charset = encoding.name(), "form value");
                fields.append(name, value)?;
            }
            ContentDisposition::Other => {
                let skipped = section.drain().await?;
                debug!(section = sections, skipped, "skipped unrecognized section");
            }
        }
    }

    debug!(
        sections,
        values = fields.value_count(),
        has_file = file.is_some(),
        "multipart body complete"
    );
    Ok(StreamedForm {
        fields: fields.into_results(),
        file,
        sections,
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::test_support::{BrokenReader, StallingReader};

    const CT: &str = "multipart/form-data; boundary=b";

    #[tokio::test]
    async fn routes_fields_files_and_other_sections() {
        let dir = tempfile::tempdir().unwrap();
        let body = concat!(
            "--b\r\n",
            "Content-Disposition: form-data; name=\"Name\"\r\n",
            "\r\n",
            "Alice\r\n",
            "--b\r\n",
            "Content-Disposition: attachment; filename=\"x\"\r\n",
            "\r\n",
            "ignored\r\n",
            "--b\r\n",
            "\r\n",
            "no disposition\r\n",
            "--b\r\n",
            "Content-Disposition: form-data; name=\"file\"; filename=\"a.txt\"\r\n",
            "\r\n",
            "hello\r\n",
            "--b--\r\n"
        );
        let form = read_multipart(
            CT,
            body.as_bytes(),
            &FormOptions::default(),
            &FileSink::new(dir.path()),
        )
        .await
        .unwrap();

        assert_eq!(form.sections, 4);
        assert_eq!(form.fields.get_all("Name"), ["Alice"]);
        assert_eq!(form.fields.len(), 1);
        let file = form.file.expect("stored file");
        assert_eq!(std::fs::read(file.path()).unwrap(), b"hello");
    }

    #[tokio::test]
    async fn last_file_wins_and_earlier_is_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let body = concat!(
            "--b\r\n",
            "Content-Disposition: form-data; name=\"f\"; filename=\"1.txt\"\r\n",
            "\r\n",
            "first\r\n",
            "--b\r\n",
            "Content-Disposition: form-data; name=\"f\"; filename=\"2.txt\"\r\n",
            "\r\n",
            "second\r\n",
            "--b--"
        );
        let form = read_multipart(
            CT,
            body.as_bytes(),
            &FormOptions::default(),
            &FileSink::new(dir.path()),
        )
        .await
        .unwrap();

        let file = form.file.expect("stored file");
        assert_eq!(file.filename(), Some("2.txt"));
        assert_eq!(std::fs::read(file.path()).unwrap(), b"second");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn charset_and_undefined_are_applied() {
        let body: &[u8] = b"--b\r\n\
Content-Disposition: form-data; name=\"city\"\r\n\
Content-Type: text/plain; charset=iso-8859-1\r\n\
\r\n\
M\xfcnchen\r\n\
--b\r\n\
Content-Disposition: form-data; name=\"zip\"\r\n\
\r\n\
Undefined\r\n\
--b\r\n\
Content-Disposition: form-data; name=\"seven\"\r\n\
Content-Type: text/plain; charset=utf-7\r\n\
\r\n\
+AGEAYg-\r\n\
--b--";
        let form = read_multipart(CT, body, &FormOptions::default(), &FileSink::temp())
            .await
            .unwrap();
        assert_eq!(form.fields.get("city"), Some("München"));
        assert_eq!(form.fields.get("zip"), Some(""));
        // UTF-7 is decoded as UTF-8, so the text stays literal.
        assert_eq!(form.fields.get("seven"), Some("+AGEAYg-"));
    }

    #[tokio::test]
    async fn non_multipart_is_rejected_before_reading() {
        let err = read_multipart(
            "text/plain",
            BrokenReader,
            &FormOptions::default(),
            &FileSink::temp(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, UploadError::InvalidContentType { .. }));
    }

    #[tokio::test]
    async fn body_read_failure_is_io_error() {
        let err = read_multipart(CT, BrokenReader, &FormOptions::default(), &FileSink::temp())
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Io(_)));
    }

    #[tokio::test]
    async fn value_length_limit_applies_to_fields_only() {
        let dir = tempfile::tempdir().unwrap();
        let body = concat!(
            "--b\r\n",
            "Content-Disposition: form-data; name=\"f\"; filename=\"big.txt\"\r\n",
            "\r\n",
            "0123456789\r\n",
            "--b\r\n",
            "Content-Disposition: form-data; name=\"v\"\r\n",
            "\r\n",
            "0123456789\r\n",
            "--b--"
        );
        let options = FormOptions::default().value_length_limit(5);
        let err = read_multipart(CT, body.as_bytes(), &options, &FileSink::new(dir.path()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            UploadError::ValueLengthLimitExceeded { limit: 5 }
        ));
        // The file stored before the failure is cleaned up with the request.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn timeout_aborts_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let mut head =
            b"--b\r\nContent-Disposition: form-data; name=f; filename=f\r\n\r\n".to_vec();
        head.extend_from_slice(&[0u8; 1024]);
        let options = FormOptions::default().request_timeout(Some(Duration::from_millis(30)));
        let err = read_multipart(
            CT,
            StallingReader::new(head),
            &options,
            &FileSink::new(dir.path()),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, UploadError::TimedOut));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
