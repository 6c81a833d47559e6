//! Temporary-file storage for uploaded sections.
//!
//! Ownership contract: [`FileSink::store`] hands the new file to the caller as
//! an [`UploadedFile`]. Dropping it deletes the file; [`UploadedFile::into_path`]
//! releases the file to whoever takes the path. A store that fails or is
//! cancelled never leaves a partial file behind.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncRead, AsyncWriteExt};
use tracing::{debug, warn};

use crate::disposition::ContentDisposition;
use crate::error::UploadError;
use crate::section::Section;

static UPLOAD_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Allocates unique files in a directory and copies section bodies into them.
#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
    prefix: String,
}

impl FileSink {
    /// Store uploads under `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            prefix: String::from("formstream-upload"),
        }
    }

    /// Store uploads in the system temporary directory.
    #[must_use]
    pub fn temp() -> Self {
        Self::new(std::env::temp_dir())
    }

    /// Set the file name prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Directory new files are created in.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Copy the rest of `section`'s body, byte for byte, into a fresh file.
    ///
    /// Storage failures surface as [`UploadError::StorageWriteError`]; errors
    /// from the body stream itself are passed through unchanged. Either way
    /// the partial file is removed.
    pub async fn store<R: AsyncRead + Unpin>(
        &self,
        section: &mut Section<'_, R>,
    ) -> Result<UploadedFile, UploadError> {
        let (field_name, filename) = match section.disposition() {
            ContentDisposition::FileField { name, filename } => (name, Some(filename)),
            other => (other.name().map(str::to_string), None),
        };
        let content_type = section.content_type().map(str::to_string);

        let (path, file) = self
            .create_unique()
            .await
            .map_err(UploadError::StorageWriteError)?;
        let guard = PartialFile { path: Some(path) };
        // Bound after the guard so every early return closes the handle before
        // the guard removes the path.
        let mut file = file;

        let mut len = 0u64;
        while let Some(chunk) = section.next_chunk().await? {
            file.write_all(chunk)
                .await
                .map_err(UploadError::StorageWriteError)?;
            len += chunk.len() as u64;
        }
        file.flush().await.map_err(UploadError::StorageWriteError)?;
        drop(file);

        let path = guard.disarm();
        debug!(bytes = len, "stored uploaded file");
        Ok(UploadedFile {
            path,
            len,
            field_name,
            filename,
            content_type,
            persisted: false,
        })
    }

    async fn create_unique(&self) -> io::Result<(PathBuf, File)> {
        let ts_nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();

        for _ in 0..32 {
            let counter = UPLOAD_COUNTER.fetch_add(1, Ordering::Relaxed);
            let candidate = self.dir.join(format!(
                "{}-{}-{ts_nanos}-{counter}.tmp",
                self.prefix,
                std::process::id()
            ));

            match OpenOptions::new()
                .create_new(true)
                .write(true)
                .open(&candidate)
                .await
            {
                Ok(file) => return Ok((candidate, file)),
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {}
                Err(err) => return Err(err),
            }
        }

        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            "failed to allocate unique upload file",
        ))
    }
}

/// Removes a half-written file unless disarmed. Runs on error returns and
/// when the owning future is dropped mid-copy.
struct PartialFile {
    path: Option<PathBuf>,
}

impl PartialFile {
    fn disarm(mut self) -> PathBuf {
        self.path.take().unwrap_or_default()
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            if let Err(err) = std::fs::remove_file(&path) {
                if err.kind() != io::ErrorKind::NotFound {
                    warn!(error = %err, "failed to remove partial upload");
                }
            }
        }
    }
}

/// A stored upload. Owns its file until [`into_path`](Self::into_path).
#[derive(Debug)]
pub struct UploadedFile {
    path: PathBuf,
    len: u64,
    field_name: Option<String>,
    filename: Option<String>,
    content_type: Option<String>,
    persisted: bool,
}

impl UploadedFile {
    /// Where the bytes were written.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of bytes written.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Returns true if the upload was empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Form field the file arrived under.
    #[must_use]
    pub fn field_name(&self) -> Option<&str> {
        self.field_name.as_deref()
    }

    /// Client-supplied file name. Untrusted.
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Declared Content-Type of the section.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Release ownership: the file is kept and the caller becomes responsible
    /// for deleting it.
    #[must_use]
    pub fn into_path(mut self) -> PathBuf {
        self.persisted = true;
        std::mem::take(&mut self.path)
    }

    /// Move the file to `dest` and release ownership.
    ///
    /// On failure the upload keeps its original path and is still deleted on
    /// drop.
    pub async fn persist(mut self, dest: impl AsRef<Path>) -> io::Result<PathBuf> {
        let dest = dest.as_ref().to_path_buf();
        tokio::fs::rename(&self.path, &dest).await?;
        self.persisted = true;
        Ok(dest)
    }

    /// Delete the file now.
    pub async fn remove(mut self) -> io::Result<()> {
        self.persisted = true;
        match tokio::fs::remove_file(&self.path).await {
            Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err),
            _ => Ok(()),
        }
    }
}

impl Drop for UploadedFile {
    fn drop(&mut self) {
        if self.persisted {
            return;
        }
        let _ = std::fs::remove_file(&self.path);
    }
}
