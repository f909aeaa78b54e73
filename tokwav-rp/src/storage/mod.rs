//! Blob storage for finished artifacts
//!
//! Artifacts are written under a bucket with a caller-chosen unique name.
//! The store is synchronous; async callers run it on the blocking pool.

mod fs;

pub use fs::FsBlobStore;

use crate::error::PipelineError;

/// A stored object read back from a store
#[derive(Debug, Clone, PartialEq)]
pub struct Blob {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Location of an object after a successful put
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub bucket: String,
    pub name: String,
    pub length: u64,
}

impl StoredBlob {
    /// `"{bucket}/{name}"`, the path recorded in metadata
    pub fn storage_path(&self) -> String {
        format!("{}/{}", self.bucket, self.name)
    }
}

/// Object store for audio artifacts
///
/// Storage failures surface as [`PipelineError::Storage`].
pub trait BlobStore: Send + Sync {
    /// Create the bucket if it does not exist yet.
    fn ensure_bucket(&self, bucket: &str) -> Result<(), PipelineError>;

    /// Store `bytes` under `name`.
    ///
    /// `length` must equal `bytes.len()`. Putting the same name twice replaces
    /// the object, so a retried put is idempotent.
    fn put(
        &self,
        bucket: &str,
        name: &str,
        bytes: &[u8],
        length: u64,
        content_type: &str,
    ) -> Result<StoredBlob, PipelineError>;

    /// Fetch an object, `None` if it does not exist.
    fn get(&self, bucket: &str, name: &str) -> Result<Option<Blob>, PipelineError>;

    /// Remove an object. Removing a missing object is not an error.
    fn delete(&self, bucket: &str, name: &str) -> Result<(), PipelineError>;
}

/// Reject names that could escape their bucket
pub(crate) fn validate_key(kind: &str, key: &str) -> Result<(), PipelineError> {
    let invalid = key.is_empty()
        || key == "."
        || key == ".."
        || key.starts_with('.')
        || key.contains(['/', '\\', '\0']);

    if invalid {
        return Err(PipelineError::Storage(format!("Invalid {} name '{}'", kind, key)));
    }
    Ok(())
}
