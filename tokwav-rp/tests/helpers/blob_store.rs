//! In-memory blob store that records every call

use std::collections::HashMap;
use std::sync::Mutex;
use tokwav_rp::storage::{Blob, BlobStore, StoredBlob};
use tokwav_rp::PipelineError;

#[derive(Default)]
pub struct RecordingBlobStore {
    objects: Mutex<HashMap<(String, String), Blob>>,
    puts: Mutex<Vec<String>>,
    deletes: Mutex<Vec<String>>,
    fail_puts: bool,
}

impl RecordingBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every put fails
    pub fn failing() -> Self {
        Self {
            fail_puts: true,
            ..Self::default()
        }
    }

    /// `"{bucket}/{name}"` of every put attempt
    pub fn puts(&self) -> Vec<String> {
        self.puts.lock().unwrap().clone()
    }

    pub fn deletes(&self) -> Vec<String> {
        self.deletes.lock().unwrap().clone()
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }
}

impl BlobStore for RecordingBlobStore {
    fn ensure_bucket(&self, _bucket: &str) -> Result<(), PipelineError> {
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
        self.puts.lock().unwrap().push(format!("{}/{}", bucket, name));
        if self.fail_puts {
            return Err(PipelineError::Storage("synthetic storage fault".to_string()));
        }
        assert_eq!(bytes.len() as u64, length);

        self.objects.lock().unwrap().insert(
            (bucket.to_string(), name.to_string()),
            Blob {
                bytes: bytes.to_vec(),
                content_type: content_type.to_string(),
            },
        );
        Ok(StoredBlob {
            bucket: bucket.to_string(),
            name: name.to_string(),
            length,
        })
    }

    fn get(&self, bucket: &str, name: &str) -> Result<Option<Blob>, PipelineError> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), name.to_string()))
            .cloned())
    }

    fn delete(&self, bucket: &str, name: &str) -> Result<(), PipelineError> {
        self.deletes.lock().unwrap().push(format!("{}/{}", bucket, name));
        self.objects
            .lock()
            .unwrap()
            .remove(&(bucket.to_string(), name.to_string()));
        Ok(())
    }
}
