//! Upload store
//!
//! Writes decoded request payloads under the uploads directory, one
//! subdirectory per request: `<uploads>/<request id>/<filename>`. Concurrent
//! requests never share a file, even when the client filenames match.
//! Client filenames are reduced to a single path component before use;
//! anything that could escape the directory is rejected.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

/// Upload store errors
#[derive(Debug, Error)]
pub enum UploadError {
    /// Filename empty, dotted, or containing a path separator
    #[error("Unsafe filename: {0:?}")]
    UnsafeFilename(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Directory of uploaded recordings, partitioned by request
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path the upload `filename` of request `request_id` is stored at
    pub fn path_for(&self, request_id: Uuid, filename: &str) -> Result<PathBuf, UploadError> {
        let name = sanitize_filename(filename)?;
        Ok(self.dir.join(request_id.to_string()).join(name))
    }

    /// Write `bytes` to `<dir>/<request_id>/<filename>`, creating directories
    /// as needed. The request directory must not already exist.
    pub async fn save(
        &self,
        request_id: Uuid,
        filename: &str,
        bytes: &[u8],
    ) -> Result<PathBuf, UploadError> {
        let path = self.path_for(request_id, filename)?;
        let request_dir = self.dir.join(request_id.to_string());
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::create_dir(&request_dir).await?;
        tokio::fs::write(&path, bytes).await?;
        debug!(file = %path.display(), bytes = bytes.len(), "Upload stored");
        Ok(path)
    }
}

/// Accept a bare file name only
pub fn sanitize_filename(filename: &str) -> Result<&str, UploadError> {
    let name = filename.trim();
    let unsafe_name = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0'])
        || name.contains("..");
    if unsafe_name {
        return Err(UploadError::UnsafeFilename(filename.to_string()));
    }
    Ok(name)
}
