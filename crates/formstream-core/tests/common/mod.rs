//! Shared helpers for formstream-core integration tests.

#![allow(dead_code)]

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, ReadBuf};

/// A part to encode.
#[derive(Debug, Clone)]
pub enum Part {
    Field { name: String, value: String },
    File {
        name: String,
        filename: String,
        bytes: Vec<u8>,
    },
}

/// Encode `parts` as a multipart body. Written independently of the decoder.
pub fn encode(boundary: &str, parts: &[Part]) -> Vec<u8> {
    encode_padded(boundary, parts, &[])
}

/// Like [`encode`], but each boundary line carries transport padding (spaces
/// and tabs before its CRLF), cycling through `padding`.
pub fn encode_padded(boundary: &str, parts: &[Part], padding: &[String]) -> Vec<u8> {
    let pad = |i: usize| padding.get(i % padding.len().max(1)).map_or("", String::as_str);
    let mut out = Vec::new();
    for (i, part) in parts.iter().enumerate() {
        out.extend_from_slice(format!("--{boundary}{}\r\n", pad(i)).as_bytes());
        match part {
            Part::Field { name, value } => {
                out.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                out.extend_from_slice(value.as_bytes());
            }
            Part::File {
                name,
                filename,
                bytes,
            } => {
                out.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                out.extend_from_slice(bytes);
            }
        }
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(format!("--{boundary}--{}\r\n", pad(parts.len())).as_bytes());
    out
}

/// Replays `data` in reads whose sizes cycle through `sizes`.
pub struct ChunkedReader {
    data: Vec<u8>,
    pos: usize,
    sizes: Vec<usize>,
    next: usize,
}

impl ChunkedReader {
    pub fn new(data: Vec<u8>, sizes: Vec<usize>) -> Self {
        let sizes = if sizes.is_empty() { vec![1] } else { sizes };
        Self {
            data,
            pos: 0,
            sizes,
            next: 0,
        }
    }
}

impl AsyncRead for ChunkedReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let step = self.sizes[self.next % self.sizes.len()].max(1);
        self.next += 1;
        let n = (self.data.len() - self.pos).min(step).min(buf.remaining());
        let start = self.pos;
        buf.put_slice(&self.data[start..start + n]);
        self.pos += n;
        Poll::Ready(Ok(()))
    }
}

/// Number of entries in `dir`.
pub fn entries(dir: &std::path::Path) -> usize {
    std::fs::read_dir(dir).map(Iterator::count).unwrap_or(0)
}
