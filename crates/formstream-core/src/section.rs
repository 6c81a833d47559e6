//! Forward-only section reader over a streamed multipart body.
//!
//! The reader holds at most one read buffer plus a delimiter-sized look-behind,
//! regardless of body size. Each [`Section`] mutably borrows its reader, so a
//! section cannot be used after the next one is requested; whatever it left
//! unread is discarded on advance.
//!
//! # Example
//!
//! ```ignore
//! let mut reader = SectionReader::new(&boundary, body, &options);
//! while let Some(mut section) = reader.next_section().await? {
//!     while let Some(chunk) = section.next_chunk().await? {
//!         sink.write_all(chunk).await?;
//!     }
//! }
//! ```

use std::collections::HashMap;

use memchr::memmem;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::trace;

use crate::config::FormOptions;
use crate::disposition::ContentDisposition;
use crate::error::UploadError;

const CRLF: &[u8] = b"\r\n";

/// Longest run of spaces and tabs accepted between a boundary and its CRLF.
pub const MAX_TRANSPORT_PADDING: usize = 64;

/// Header block of one section. Names are case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct SectionHeaders {
    inner: HashMap<String, String>,
}

impl SectionHeaders {
    /// Get a header value by name (case-insensitive).
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Insert a header. A repeated name replaces the earlier value.
    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.inner.insert(name.to_ascii_lowercase(), value.into());
    }

    /// Iterate over all headers as (lowercased name, value) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns the number of headers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns true if there are no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    /// Yielding body bytes (or skipping the preamble).
    ReadingBody,
    /// The buffer starts with a complete delimiter and the rest of its line.
    AtDelimiter,
    /// The closing delimiter was consumed.
    Done,
}

enum Scan {
    /// A delimiter starts at the first offset and is followed by a line tail
    /// (`--`, or padding plus CRLF) of the second length.
    Delimiter(usize, usize),
    /// This many leading bytes are body data; zero means more input is needed.
    Data(usize),
}

/// What follows `CRLF--boundary` in the buffer.
#[derive(Debug, PartialEq, Eq)]
enum LineTail {
    /// A real delimiter whose line tail spans this many bytes.
    Complete(usize),
    /// Body data that merely looks like a delimiter.
    NotADelimiter,
    /// Undecidable until more bytes arrive.
    Incomplete,
    /// More than [`MAX_TRANSPORT_PADDING`] padding bytes.
    PaddingTooLong,
}

/// Classify the bytes after a delimiter candidate.
///
/// `dash-boundary transport-padding CRLF` per RFC 2046: the boundary may be
/// followed by spaces or tabs before the CRLF. The closing `--` must follow
/// the boundary directly; anything after it is epilogue.
fn line_tail(rest: &[u8]) -> LineTail {
    if rest.starts_with(b"--") {
        return LineTail::Complete(2);
    }
    let padding = rest
        .iter()
        .take_while(|&&b| b == b' ' || b == b'\t')
        .count();
    if padding > MAX_TRANSPORT_PADDING {
        return LineTail::PaddingTooLong;
    }
    match &rest[padding..] {
        [b'\r', b'\n', ..] => LineTail::Complete(padding + 2),
        [] | [b'\r'] => LineTail::Incomplete,
        [b'-'] if padding == 0 => LineTail::Incomplete,
        _ => LineTail::NotADelimiter,
    }
}

/// Lazy, finite, non-restartable sequence of sections.
#[derive(Debug)]
pub struct SectionReader<R> {
    inner: R,
    buf: Vec<u8>,
    /// `CRLF--boundary`.
    delimiter: Vec<u8>,
    stage: Stage,
    /// Length of the boundary line tail once `stage` is `AtDelimiter`.
    delimiter_tail: usize,
    /// Bytes at the front of `buf` already handed out by `body_chunk`.
    pending: usize,
    section_len: u64,
    eof: bool,
    headers_count_limit: usize,
    headers_length_limit: usize,
    body_length_limit: Option<u64>,
    buffer_size: usize,
}

impl<R: AsyncRead + Unpin> SectionReader<R> {
    /// Create a reader for `boundary` (without the leading `--`).
    pub fn new(boundary: &str, inner: R, options: &FormOptions) -> Self {
        let mut delimiter = Vec::with_capacity(boundary.len() + 4);
        delimiter.extend_from_slice(b"\r\n--");
        delimiter.extend_from_slice(boundary.as_bytes());

        Self {
            inner,
            // The opening delimiter may sit at the very start of the stream,
            // where it has no preceding CRLF; seed one so the same scan finds it.
            buf: CRLF.to_vec(),
            delimiter,
            stage: Stage::ReadingBody,
            delimiter_tail: 0,
            pending: 0,
            section_len: 0,
            eof: false,
            headers_count_limit: options.get_headers_count_limit(),
            headers_length_limit: options.get_headers_length_limit(),
            body_length_limit: options.get_body_length_limit(),
            buffer_size: options.get_buffer_size(),
        }
    }

    /// Advance to the next section.
    ///
    /// Discards whatever the previous section left unread. Returns `Ok(None)`
    /// once the closing delimiter has been read, and on every call after that.
    pub async fn next_section(&mut self) -> Result<Option<Section<'_, R>>, UploadError> {
        let mut skipped = 0usize;
        while let Some(chunk) = self.body_chunk().await? {
            skipped += chunk.len();
        }
        self.consume_pending();
        if skipped > 0 {
            trace!(skipped, "discarded unread section bytes");
        }

        if self.stage == Stage::Done {
            return Ok(None);
        }

        let end = self.delimiter.len();
        let closing = self.buf[end..].starts_with(b"--");
        self.buf.drain(..end + self.delimiter_tail);
        if closing {
            self.stage = Stage::Done;
            self.buf = Vec::new();
            trace!("reached closing boundary");
            return Ok(None);
        }

        let headers = self.read_headers().await?;
        self.stage = Stage::ReadingBody;
        self.section_len = 0;
        trace!(headers = headers.len(), "section headers parsed");
        Ok(Some(Section {
            reader: self,
            headers,
        }))
    }

    /// Next run of body bytes for the current section, or `None` at its end.
    async fn body_chunk(&mut self) -> Result<Option<&[u8]>, UploadError> {
        self.consume_pending();
        if self.stage != Stage::ReadingBody {
            return Ok(None);
        }

        loop {
            match self.scan()? {
                Scan::Delimiter(0, tail) => {
                    self.stage = Stage::AtDelimiter;
                    self.delimiter_tail = tail;
                    return Ok(None);
                }
                Scan::Delimiter(n, _) | Scan::Data(n) if n > 0 => {
                    self.section_len = self.section_len.saturating_add(n as u64);
                    if let Some(limit) = self.body_length_limit {
                        if self.section_len > limit {
                            return Err(UploadError::SectionTooLarge { limit });
                        }
                    }
                    self.pending = n;
                    return Ok(Some(&self.buf[..n]));
                }
                _ => {
                    if self.fill().await? == 0 {
                        return Err(UploadError::malformed(
                            "unexpected end of stream before boundary",
                        ));
                    }
                }
            }
        }
    }

    fn scan(&self) -> Result<Scan, UploadError> {
        let delim = self.delimiter.as_slice();
        let mut from = 0;
        while let Some(rel) = memmem::find(&self.buf[from..], delim) {
            let idx = from + rel;
            let end = idx + delim.len();
            match line_tail(&self.buf[end..]) {
                LineTail::Complete(tail) => return Ok(Scan::Delimiter(idx, tail)),
                LineTail::NotADelimiter => from = idx + 1,
                LineTail::PaddingTooLong => {
                    return Err(UploadError::malformed("boundary line padding too long"));
                }
                LineTail::Incomplete if self.eof => {
                    return Err(UploadError::malformed(
                        "unexpected end of stream after boundary",
                    ));
                }
                LineTail::Incomplete => return Ok(Scan::Data(idx)),
            }
        }
        // A delimiter may still be completing at the tail of the buffer.
        Ok(Scan::Data(self.buf.len().saturating_sub(delim.len() - 1)))
    }

    async fn read_headers(&mut self) -> Result<SectionHeaders, UploadError> {
        let mut headers = SectionHeaders::default();
        let mut count = 0usize;
        let mut block_len = 0usize;

        loop {
            let Some(line_end) = memmem::find(&self.buf, CRLF) else {
                if block_len + self.buf.len() > self.headers_length_limit {
                    return Err(UploadError::HeadersLengthLimitExceeded {
                        limit: self.headers_length_limit,
                    });
                }
                if self.fill().await? == 0 {
                    return Err(UploadError::malformed(
                        "unexpected end of stream in section headers",
                    ));
                }
                continue;
            };

            block_len += line_end + CRLF.len();
            if block_len > self.headers_length_limit {
                return Err(UploadError::HeadersLengthLimitExceeded {
                    limit: self.headers_length_limit,
                });
            }
            if line_end == 0 {
                self.buf.drain(..CRLF.len());
                return Ok(headers);
            }

            count += 1;
            if count > self.headers_count_limit {
                return Err(UploadError::HeadersCountLimitExceeded {
                    limit: self.headers_count_limit,
                });
            }

            let line = std::str::from_utf8(&self.buf[..line_end])
                .map_err(|_| UploadError::malformed("invalid UTF-8 in section header"))?;
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| UploadError::malformed("section header line without a colon"))?;
            let name = name.trim();
            if name.is_empty() {
                return Err(UploadError::malformed("empty section header name"));
            }
            headers.insert(name, value.trim());
            self.buf.drain(..line_end + CRLF.len());
        }
    }

    fn consume_pending(&mut self) {
        if self.pending > 0 {
            self.buf.drain(..self.pending);
            self.pending = 0;
        }
    }

    /// Read once from the underlying stream. Returns 0 at end of stream.
    async fn fill(&mut self) -> Result<usize, UploadError> {
        if self.eof {
            return Ok(0);
        }
        self.buf.reserve(self.buffer_size);
        let n = (&mut self.inner)
            .take(self.buffer_size as u64)
            .read_buf(&mut self.buf)
            .await
            .map_err(UploadError::Io)?;
        if n == 0 {
            self.eof = true;
        }
        Ok(n)
    }
}

/// One part of a multipart body.
///
/// The body is read-once and ends exactly at the next delimiter.
#[derive(Debug)]
pub struct Section<'r, R> {
    reader: &'r mut SectionReader<R>,
    headers: SectionHeaders,
}

impl<R: AsyncRead + Unpin> Section<'_, R> {
    /// All headers of this section.
    #[must_use]
    pub fn headers(&self) -> &SectionHeaders {
        &self.headers
    }

    /// Get a header value by name (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Raw Content-Disposition header.
    #[must_use]
    pub fn content_disposition(&self) -> Option<&str> {
        self.headers.get("content-disposition")
    }

    /// Raw Content-Type header.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type")
    }

    /// Classified Content-Disposition.
    #[must_use]
    pub fn disposition(&self) -> ContentDisposition {
        ContentDisposition::parse(self.content_disposition())
    }

    /// Next run of body bytes, or `None` once the body is exhausted.
    pub async fn next_chunk(&mut self) -> Result<Option<&[u8]>, UploadError> {
        self.reader.body_chunk().await
    }

    /// Read the rest of the body into memory, failing with
    /// [`UploadError::ValueLengthLimitExceeded`] past `limit` bytes.
    pub async fn read_to_end(&mut self, limit: usize) -> Result<Vec<u8>, UploadError> {
        let mut out = Vec::new();
        while let Some(chunk) = self.next_chunk().await? {
            if out.len() + chunk.len() > limit {
                return Err(UploadError::ValueLengthLimitExceeded { limit });
            }
            out.extend_from_slice(chunk);
        }
        Ok(out)
    }

    /// Discard the rest of the body, returning how many bytes were skipped.
    pub async fn drain(&mut self) -> Result<u64, UploadError> {
        let mut skipped = 0u64;
        while let Some(chunk) = self.next_chunk().await? {
            skipped += chunk.len() as u64;
        }
        Ok(skipped)
    }
}
