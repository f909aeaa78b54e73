//! # tokwav recording processor (tokwav-rp)
//!
//! Turns neural-codec token uploads into 22.05 kHz mono WAV recordings.
//!
//! **Pipeline:** payload validation → frame demux → batched neural decode →
//! sinc resampling (rubato) → incremental WAV writing (hound) → blob store +
//! SQLite metadata handoff.
//!
//! The decode pipeline is synchronous and bounded to one batch of decode
//! buffers at a time; the axum service runs it on the blocking pool.

pub mod api;
pub mod audio;
pub mod codec;
pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod pipeline;
pub mod state;
pub mod storage;

pub use api::create_router;
pub use error::{ApiError, ErrorKind, PipelineError, Stage};
pub use pipeline::{Pipeline, PipelineSettings, PipelineState, ResampleMode};
pub use state::AppState;
