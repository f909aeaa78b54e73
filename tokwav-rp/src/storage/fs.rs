//! Filesystem blob store
//!
//! Layout:
//! ```text
//! <root>/
//!   <bucket>/
//!     <name>               object bytes
//!     .<name>.meta.json    content type and length
//! ```
//!
//! Objects are written to a hidden `tempfile` in the bucket and persisted
//! (renamed) into place, so readers never see a partial object.

use super::{validate_key, Blob, BlobStore, StoredBlob};
use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Serialize, Deserialize)]
struct Sidecar {
    content_type: String,
    length: u64,
}

/// Stores each bucket as a directory under a root folder
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn bucket_dir(&self, bucket: &str) -> Result<PathBuf, PipelineError> {
        validate_key("bucket", bucket)?;
        Ok(self.root.join(bucket))
    }

    fn object_paths(&self, bucket: &str, name: &str) -> Result<(PathBuf, PathBuf), PipelineError> {
        validate_key("object", name)?;
        let dir = self.bucket_dir(bucket)?;
        Ok((dir.join(name), dir.join(format!(".{}.meta.json", name))))
    }
}

fn io_error(action: &str, path: &Path, err: std::io::Error) -> PipelineError {
    PipelineError::Storage(format!("Failed to {} {}: {}", action, path.display(), err))
}

/// Write through a temp file in the same directory, then rename
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PipelineError> {
    let dir = path
        .parent()
        .ok_or_else(|| PipelineError::Storage(format!("No parent directory for {}", path.display())))?;

    // Dropped (and removed) on any early return
    let mut tmp = tempfile::Builder::new()
        .prefix(".")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| io_error("create temp file in", dir, e))?;

    tmp.write_all(bytes).map_err(|e| io_error("write", path, e))?;
    tmp.as_file().sync_all().map_err(|e| io_error("sync", path, e))?;
    tmp.persist(path).map_err(|e| io_error("persist", path, e.error))?;
    Ok(())
}

impl BlobStore for FsBlobStore {
    fn ensure_bucket(&self, bucket: &str) -> Result<(), PipelineError> {
        let dir = self.bucket_dir(bucket)?;
        if !dir.is_dir() {
            fs::create_dir_all(&dir).map_err(|e| io_error("create bucket", &dir, e))?;
            info!("Created storage bucket: {}", dir.display());
        }
        Ok(())
    }

    fn put(
        &self,
        bucket: &str,
        name: &str,
        bytes: &[u8],
        length: u64,
        content_type: &str,
    ) -> Result<StoredBlob, PipelineError> {
        if bytes.len() as u64 != length {
            return Err(PipelineError::Storage(format!(
                "Declared length {} does not match {} bytes",
                length,
                bytes.len()
            )));
        }

        let (object_path, sidecar_path) = self.object_paths(bucket, name)?;
        if !object_path.parent().is_some_and(Path::is_dir) {
            return Err(PipelineError::Storage(format!("Bucket '{}' does not exist", bucket)));
        }

        let sidecar = serde_json::to_vec(&Sidecar {
            content_type: content_type.to_string(),
            length,
        })
        .map_err(|e| PipelineError::Storage(format!("Failed to encode blob metadata: {}", e)))?;

        write_atomic(&object_path, bytes)?;
        write_atomic(&sidecar_path, &sidecar)?;

        debug!("Stored {} bytes at {}/{}", length, bucket, name);

        Ok(StoredBlob {
            bucket: bucket.to_string(),
            name: name.to_string(),
            length,
        })
    }

    fn get(&self, bucket: &str, name: &str) -> Result<Option<Blob>, PipelineError> {
        let (object_path, sidecar_path) = self.object_paths(bucket, name)?;
        if !object_path.exists() {
            return Ok(None);
        }

        let bytes = fs::read(&object_path).map_err(|e| io_error("read", &object_path, e))?;

        let content_type = match fs::read(&sidecar_path) {
            Ok(raw) => serde_json::from_slice::<Sidecar>(&raw)
                .map(|s| s.content_type)
                .map_err(|e| PipelineError::Storage(format!("Corrupt blob metadata for {}: {}", name, e)))?,
            Err(_) => {
                warn!("No metadata for {}/{}, assuming octet-stream", bucket, name);
                "application/octet-stream".to_string()
            }
        };

        Ok(Some(Blob { bytes, content_type }))
    }

    fn delete(&self, bucket: &str, name: &str) -> Result<(), PipelineError> {
        let (object_path, sidecar_path) = self.object_paths(bucket, name)?;

        for path in [&object_path, &sidecar_path] {
            match fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(io_error("delete", path, e)),
            }
        }

        debug!("Deleted {}/{}", bucket, name);
        Ok(())
    }
}
