//! Shared application state

use crate::codec::{BufferLedger, CodecDecoder};
use crate::config::ServiceConfig;
use crate::pipeline::Pipeline;
use crate::storage::BlobStore;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Instant;

/// State handed to every handler
///
/// Cloning is cheap; everything behind it is shared.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    /// Loaded once at startup, read-only afterwards
    pub decoder: Arc<dyn CodecDecoder>,
    pub blob_store: Arc<dyn BlobStore>,
    pub config: Arc<ServiceConfig>,
    /// Decode buffer accounting across all requests
    pub ledger: Arc<BufferLedger>,
    pub startup_time: Instant,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        decoder: Arc<dyn CodecDecoder>,
        blob_store: Arc<dyn BlobStore>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            db,
            decoder,
            blob_store,
            config: Arc::new(config),
            ledger: BufferLedger::new(),
            startup_time: Instant::now(),
        }
    }

    /// A pipeline bound to the shared decoder and configured settings
    pub fn pipeline(&self) -> Pipeline {
        Pipeline::new(Arc::clone(&self.decoder), self.config.pipeline)
            .with_ledger(Arc::clone(&self.ledger))
    }
}
