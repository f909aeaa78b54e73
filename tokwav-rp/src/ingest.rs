//! Ingest: pipeline run plus storage and metadata handoff
//!
//! The artifact is stored under `"{uuid}.wav"` in the configured bucket, then
//! a metadata row pointing at `"{bucket}/{uuid}.wav"` is inserted. When the
//! insert fails the stored object is removed again (best effort) so no
//! orphaned blob outlives a failed request.

use crate::codec::EncodedPayload;
use crate::db::recordings::{self, NewRecording, Recording};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Decode, store and record one upload.
///
/// The pipeline and the blob write run on the blocking pool.
pub async fn ingest(state: &AppState, payload: EncodedPayload, filename: String) -> ApiResult<Recording> {
    let pipeline = state.pipeline();
    let artifact = tokio::task::spawn_blocking(move || pipeline.run(&payload))
        .await
        .map_err(|e| ApiError::Internal(format!("Pipeline task failed: {}", e)))??;

    let bucket = state.config.bucket.clone();
    let object_name = format!("{}.wav", Uuid::new_v4());
    let duration = artifact.duration_seconds;
    let sample_rate = artifact.sample_rate;

    let store = Arc::clone(&state.blob_store);
    let stored = {
        let bucket = bucket.clone();
        let object_name = object_name.clone();
        tokio::task::spawn_blocking(move || {
            store.put(
                &bucket,
                &object_name,
                &artifact.bytes,
                artifact.len() as u64,
                artifact.content_type(),
            )
        })
        .await
        .map_err(|e| ApiError::Internal(format!("Storage task failed: {}", e)))??
    };

    let storage_path = stored.storage_path();
    let created = recordings::create_recording(
        &state.db,
        NewRecording {
            filename: &filename,
            original_path: &storage_path,
            duration,
            sample_rate,
        },
    )
    .await;

    match created {
        Ok(recording) => {
            info!(
                "Stored recording {} at {} ({:.3}s)",
                recording.id, storage_path, duration
            );
            Ok(recording)
        }
        Err(err) => {
            error!("Metadata insert failed for {}: {}", storage_path, err);
            remove_orphan(state, bucket, object_name).await;
            Err(err.into())
        }
    }
}

async fn remove_orphan(state: &AppState, bucket: String, object_name: String) {
    let store = Arc::clone(&state.blob_store);
    let result = tokio::task::spawn_blocking(move || store.delete(&bucket, &object_name)).await;

    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Failed to remove orphaned blob: {}", e),
        Err(e) => warn!("Orphan cleanup task failed: {}", e),
    }
}

