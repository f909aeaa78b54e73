//! Decode/resample/write orchestration
//!
//! One [`Pipeline::run`] turns an [`EncodedPayload`] into an [`AudioArtifact`]:
//!
//! ```text
//! Validating -> Demuxing -> [Decoding(i) -> Resampling(i) -> Writing(i)]* -> Finalizing -> Done
//! ```
//!
//! Batches run strictly one after another. Any failure moves the run to
//! `Aborted`: the partially written container is dropped, decode buffers are
//! released and the originating error is returned. Nothing is retried.
//!
//! Cleanup is scoped: a [`BatchScope`] guard per batch and a run guard around
//! the whole loop both release decoder resources on every exit path.

mod state;

pub use state::PipelineState;

use crate::audio::{AudioArtifact, ResampledSegment, Resampler, StreamWriter, CANONICAL_SAMPLE_RATE};
use crate::codec::{
    BatchDecoder, BufferLedger, CodecDecoder, EncodedPayload, FrameDemuxer, FrameLayout,
    DEFAULT_BATCH_SIZE,
};
use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// When resampling happens relative to decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResampleMode {
    /// Resample each decoded batch on its own and stream it to the writer
    #[default]
    PerSegment,
    /// Concatenate all decoded PCM, resample once, write once
    WholeBuffer,
}

/// Tunables for a pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Frames per decode call
    pub batch_size: NonZeroUsize,
    pub layout: FrameLayout,
    pub resample_mode: ResampleMode,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            batch_size: NonZeroUsize::new(DEFAULT_BATCH_SIZE).unwrap_or(NonZeroUsize::MIN),
            layout: FrameLayout::default(),
            resample_mode: ResampleMode::default(),
        }
    }
}

/// Streaming decode pipeline bound to a shared decoder
#[derive(Clone)]
pub struct Pipeline {
    decoder: Arc<dyn CodecDecoder>,
    settings: PipelineSettings,
    ledger: Arc<BufferLedger>,
}

impl Pipeline {
    pub fn new(decoder: Arc<dyn CodecDecoder>, settings: PipelineSettings) -> Self {
        Self {
            decoder,
            settings,
            ledger: BufferLedger::new(),
        }
    }

    /// Account decode buffers against an existing ledger
    pub fn with_ledger(mut self, ledger: Arc<BufferLedger>) -> Self {
        self.ledger = ledger;
        self
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn ledger(&self) -> &Arc<BufferLedger> {
        &self.ledger
    }

    /// Run the pipeline to completion. Blocking.
    pub fn run(&self, payload: &EncodedPayload) -> Result<AudioArtifact, PipelineError> {
        self.run_traced(payload).0
    }

    /// Like [`Pipeline::run`], also returning every state the run passed through.
    pub fn run_traced(
        &self,
        payload: &EncodedPayload,
    ) -> (Result<AudioArtifact, PipelineError>, Vec<PipelineState>) {
        let mut run = RunScope::new(self.decoder.as_ref(), &self.ledger);

        let result = self.execute(payload, &mut run);
        match &result {
            Ok(artifact) => {
                run.advance(PipelineState::Done);
                info!(
                    "Pipeline done: {} samples at {}Hz ({:.3}s, {} bytes)",
                    artifact.frame_count,
                    artifact.sample_rate,
                    artifact.duration_seconds,
                    artifact.len()
                );
            }
            Err(err) => {
                warn!("Pipeline aborted during {}: {}", run.current(), err);
                run.advance(PipelineState::Aborted);
            }
        }

        let states = run.take_states();
        (result, states)
    }

    fn execute(&self, payload: &EncodedPayload, run: &mut RunScope<'_>) -> Result<AudioArtifact, PipelineError> {
        payload.validate()?;

        run.advance(PipelineState::Demuxing);
        let demuxer = FrameDemuxer::new(payload, self.settings.batch_size, self.settings.layout)?;
        let source_rate = payload.source_sample_rate();

        info!(
            "Decoding {} frames in {} batches of {} ({}Hz -> {}Hz, {:?})",
            demuxer.total_frames(),
            demuxer.batch_count(),
            demuxer.batch_size(),
            source_rate,
            CANONICAL_SAMPLE_RATE,
            self.settings.resample_mode
        );

        let mut writer = StreamWriter::open(CANONICAL_SAMPLE_RATE)?;
        let batch_decoder = BatchDecoder::new(self.decoder.as_ref(), &self.ledger);

        match self.settings.resample_mode {
            ResampleMode::PerSegment => {
                for batch in demuxer.batches() {
                    let index = batch.index();
                    let _scope = BatchScope::new(index, self.decoder.as_ref(), &self.ledger);

                    run.advance(PipelineState::Decoding(index));
                    let decoded = batch_decoder.decode(&batch, source_rate)?;

                    let resampled = if decoded.is_empty() {
                        ResampledSegment::empty()
                    } else {
                        run.advance(PipelineState::Resampling(Some(index)));
                        Resampler::resample(decoded.samples(), decoded.sample_rate)
                            .map_err(|e| e.at_batch(index))?
                    };
                    drop(decoded);

                    run.advance(PipelineState::Writing(Some(index)));
                    writer.append(&resampled).map_err(|e| e.at_batch(index))?;
                }
            }
            ResampleMode::WholeBuffer => {
                let mut pcm = Vec::new();
                for batch in demuxer.batches() {
                    let index = batch.index();
                    let _scope = BatchScope::new(index, self.decoder.as_ref(), &self.ledger);

                    run.advance(PipelineState::Decoding(index));
                    let decoded = batch_decoder.decode(&batch, source_rate)?;
                    pcm.extend_from_slice(decoded.samples());
                }

                if !pcm.is_empty() {
                    run.advance(PipelineState::Resampling(None));
                    let resampled = Resampler::resample(&pcm, source_rate)?;
                    drop(pcm);

                    run.advance(PipelineState::Writing(None));
                    writer.append(&resampled)?;
                }
            }
        }

        run.advance(PipelineState::Finalizing);
        writer.finalize()
    }
}

/// Per-batch cleanup guard
struct BatchScope<'a> {
    index: usize,
    decoder: &'a dyn CodecDecoder,
    ledger: &'a BufferLedger,
}

impl<'a> BatchScope<'a> {
    fn new(index: usize, decoder: &'a dyn CodecDecoder, ledger: &'a BufferLedger) -> Self {
        Self { index, decoder, ledger }
    }
}

impl Drop for BatchScope<'_> {
    fn drop(&mut self) {
        self.decoder.release_cache();
        trace!(
            "Batch {} released ({} decode buffers live)",
            self.index,
            self.ledger.live_buffers()
        );
    }
}

/// Run-level state tracking and cleanup guard
struct RunScope<'a> {
    decoder: &'a dyn CodecDecoder,
    ledger: &'a BufferLedger,
    states: Vec<PipelineState>,
}

impl<'a> RunScope<'a> {
    fn new(decoder: &'a dyn CodecDecoder, ledger: &'a BufferLedger) -> Self {
        Self {
            decoder,
            ledger,
            states: vec![PipelineState::Validating],
        }
    }

    fn current(&self) -> PipelineState {
        self.states
            .last()
            .copied()
            .unwrap_or(PipelineState::Validating)
    }

    fn advance(&mut self, next: PipelineState) {
        let current = self.current();
        debug_assert!(
            current.can_transition_to(next),
            "illegal pipeline transition {} -> {}",
            current,
            next
        );
        trace!("Pipeline {} -> {}", current, next);
        self.states.push(next);
    }

    fn take_states(&mut self) -> Vec<PipelineState> {
        std::mem::take(&mut self.states)
    }
}

impl Drop for RunScope<'_> {
    fn drop(&mut self) {
        self.decoder.release_cache();
        debug!(
            "Run released: {} decode buffers live, peak {} buffers / {} bytes",
            self.ledger.live_buffers(),
            self.ledger.peak_buffers(),
            self.ledger.peak_bytes()
        );
    }
}
