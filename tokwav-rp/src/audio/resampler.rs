//! Audio resampling using rubato
//!
//! Converts decoded PCM to the canonical 22.05kHz output rate with a windowed
//! sinc filter. Each call treats its input as an isolated finite buffer: the
//! filter starts from silence and is flushed at the end, so resampling
//! segments one by one is not bit-identical to resampling their concatenation
//! (small edge artifacts at segment boundaries).

use crate::error::PipelineError;
use rubato::{
    Resampler as RubatoResampler, SincFixedIn, SincInterpolationParameters,
    SincInterpolationType, WindowFunction,
};
use tracing::debug;

/// Output sample rate for every artifact
pub const CANONICAL_SAMPLE_RATE: u32 = 22_050;

/// Input frames fed to rubato per process call
const CHUNK_FRAMES: usize = 1024;

/// Mono PCM at the canonical output rate
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResampledSegment {
    pub samples: Vec<f32>,
}

impl ResampledSegment {
    pub fn new(samples: Vec<f32>) -> Self {
        Self { samples }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Band-limited resampler for mono buffers.
pub struct Resampler;

impl Resampler {
    /// Resample mono audio to [`CANONICAL_SAMPLE_RATE`].
    pub fn resample(input: &[f32], input_rate: u32) -> Result<ResampledSegment, PipelineError> {
        Self::resample_to(input, input_rate, CANONICAL_SAMPLE_RATE).map(ResampledSegment::new)
    }

    /// Resample mono audio between arbitrary rates.
    ///
    /// # Returns
    /// Exactly `floor(len * output_rate / input_rate)` samples, aligned with
    /// the input (filter delay removed).
    ///
    /// # Errors
    /// Empty input, a non-finite sample, a zero rate, or a rubato failure.
    pub fn resample_to(input: &[f32], input_rate: u32, output_rate: u32) -> Result<Vec<f32>, PipelineError> {
        if input.is_empty() {
            return Err(PipelineError::resample("empty input buffer"));
        }
        if let Some(position) = input.iter().position(|s| !s.is_finite()) {
            return Err(PipelineError::resample(format!(
                "non-finite sample {} at position {}",
                input[position], position
            )));
        }
        if input_rate == 0 || output_rate == 0 {
            return Err(PipelineError::resample(format!(
                "invalid sample rates {} -> {}",
                input_rate, output_rate
            )));
        }

        // If already at target rate, return copy
        if input_rate == output_rate {
            debug!("Sample rate already at {}Hz, skipping resample", output_rate);
            return Ok(input.to_vec());
        }

        let expected = Self::output_len(input.len(), input_rate, output_rate);
        let mut resampler = Self::create_sinc_resampler(input_rate, output_rate)?;
        let delay = resampler.output_delay();

        let mut output = Vec::with_capacity(expected + delay + CHUNK_FRAMES);
        let mut position = 0;

        // Full chunks
        while input.len() - position >= resampler.input_frames_next() {
            let needed = resampler.input_frames_next();
            let frames: [&[f32]; 1] = [&input[position..position + needed]];
            let chunk = resampler
                .process(&frames[..], None)
                .map_err(|e| PipelineError::resample(format!("Resampling failed: {}", e)))?;
            output.extend_from_slice(&chunk[0]);
            position += needed;
        }

        // Remainder (zero-padded by rubato)
        if position < input.len() {
            let frames: [&[f32]; 1] = [&input[position..]];
            let chunk = resampler
                .process_partial(Some(&frames[..]), None)
                .map_err(|e| PipelineError::resample(format!("Resampling failed: {}", e)))?;
            output.extend_from_slice(&chunk[0]);
        }

        // Flush the filter until the delayed tail is out
        while output.len() < delay + expected {
            let tail = resampler
                .process_partial::<&[f32]>(None, None)
                .map_err(|e| PipelineError::resample(format!("Resampling flush failed: {}", e)))?;
            if tail[0].is_empty() {
                break;
            }
            output.extend_from_slice(&tail[0]);
        }

        output.drain(..delay.min(output.len()));
        output.truncate(expected);

        debug!(
            "Resampled {} samples at {}Hz to {} samples at {}Hz",
            input.len(),
            input_rate,
            output.len(),
            output_rate
        );

        Ok(output)
    }

    /// Output length for `len` input samples: `floor(len * out / in)`
    pub fn output_len(len: usize, input_rate: u32, output_rate: u32) -> usize {
        ((len as u64 * output_rate as u64) / input_rate as u64) as usize
    }

    /// Create a high-quality sinc resampler.
    fn create_sinc_resampler(input_rate: u32, output_rate: u32) -> Result<SincFixedIn<f32>, PipelineError> {
        let params = SincInterpolationParameters {
            sinc_len: 256,
            f_cutoff: 0.95,
            interpolation: SincInterpolationType::Linear,
            oversampling_factor: 256,
            window: WindowFunction::BlackmanHarris2,
        };

        SincFixedIn::<f32>::new(
            output_rate as f64 / input_rate as f64,
            1.0,
            params,
            CHUNK_FRAMES,
            1,
        )
        .map_err(|e| PipelineError::resample(format!("Failed to create sinc resampler: {}", e)))
    }
}
