//! Batch decoding through an external neural decoder
//!
//! The decoder itself sits behind [`CodecDecoder`]; it is loaded once at
//! startup and shared read-only between requests. [`BatchDecoder`] drives one
//! call per [`Batch`], supplies the neutral scale and enforces the output
//! shape (`frames * hop_length` samples).

use crate::codec::ledger::{BufferLedger, Tracked};
use crate::codec::Batch;
use crate::error::PipelineError;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Failure reported by a decoder backend
#[derive(Debug, Error)]
#[error("{0}")]
pub struct DecoderFailure(pub String);

impl DecoderFailure {
    pub fn new(detail: impl Into<String>) -> Self {
        DecoderFailure(detail.into())
    }
}

impl From<std::io::Error> for DecoderFailure {
    fn from(err: std::io::Error) -> Self {
        DecoderFailure(err.to_string())
    }
}

impl From<serde_json::Error> for DecoderFailure {
    fn from(err: serde_json::Error) -> Self {
        DecoderFailure(err.to_string())
    }
}

/// Code indices for one batch, `(depth, frames)` row-major
#[derive(Debug, Clone, Copy)]
pub struct CodeBatch<'a> {
    pub depth: usize,
    pub frames: usize,
    pub codes: &'a [i64],
}

impl CodeBatch<'_> {
    /// Codes of one codebook row
    pub fn row(&self, codebook: usize) -> &[i64] {
        &self.codes[codebook * self.frames..(codebook + 1) * self.frames]
    }
}

/// Pretrained neural codec decoder
///
/// Implementations must be stateless per call: decoding batch N must not
/// depend on batches decoded before it.
pub trait CodecDecoder: Send + Sync {
    /// PCM samples produced per input frame
    fn hop_length(&self) -> usize;

    /// Decode one batch to mono PCM.
    ///
    /// `scale` holds one gain per frame.
    fn decode(&self, batch: CodeBatch<'_>, scale: &[f32]) -> Result<Vec<f32>, DecoderFailure>;

    /// Reclaim any accelerator-side cache. Called after every batch and once
    /// more when a run ends.
    fn release_cache(&self) {}

    fn name(&self) -> &str {
        "decoder"
    }
}

/// PCM from exactly one batch, at the request's declared source rate
#[derive(Debug)]
pub struct DecodedSegment {
    pub index: usize,
    pub sample_rate: u32,
    samples: Tracked<f32>,
}

impl DecodedSegment {
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Runs the external decoder once per batch
pub struct BatchDecoder<'a> {
    decoder: &'a dyn CodecDecoder,
    ledger: &'a Arc<BufferLedger>,
}

impl<'a> BatchDecoder<'a> {
    pub fn new(decoder: &'a dyn CodecDecoder, ledger: &'a Arc<BufferLedger>) -> Self {
        Self { decoder, ledger }
    }

    /// Decode `batch`. Codes and scale are released before this returns; the
    /// decoded PCM lives until the returned segment is dropped.
    pub fn decode(&self, batch: &Batch<'_>, source_rate: u32) -> Result<DecodedSegment, PipelineError> {
        let index = batch.index();
        let frames = batch.frames();

        let codes = Tracked::new(batch.codes(), self.ledger);
        let scale = Tracked::new(neutral_scale(frames), self.ledger);

        let code_batch = CodeBatch {
            depth: batch.depth(),
            frames,
            codes: &codes,
        };
        let decoded = self
            .decoder
            .decode(code_batch, &scale)
            .map_err(|e| PipelineError::Decode {
                batch: index,
                detail: e.to_string(),
            })?;
        drop(codes);
        drop(scale);

        let mut samples = Tracked::new(decoded, self.ledger);
        let expected = frames * self.decoder.hop_length();

        if samples.len() < expected {
            return Err(PipelineError::Decode {
                batch: index,
                detail: format!(
                    "decoder returned {} samples for {} frames, expected {}",
                    samples.len(),
                    frames,
                    expected
                ),
            });
        }
        if samples.len() > expected {
            debug!(
                "Batch {}: trimming {} trailing samples past {} frames",
                index,
                samples.len() - expected,
                frames
            );
            samples.truncate(expected);
        }

        Ok(DecodedSegment {
            index,
            sample_rate: source_rate,
            samples,
        })
    }
}

/// Uniform scale: every frame decoded at unit gain
pub fn neutral_scale(frames: usize) -> Vec<f32> {
    vec![1.0; frames]
}

/// Apply per-frame gains to decoded PCM, `hop_length` samples per frame
pub fn apply_frame_scale(samples: &mut [f32], scale: &[f32], hop_length: usize) {
    if hop_length == 0 {
        return;
    }
    for (chunk, gain) in samples.chunks_mut(hop_length).zip(scale) {
        if *gain != 1.0 {
            chunk.iter_mut().for_each(|s| *s *= gain);
        }
    }
}
