//! Synthetic decoders

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokwav_rp::codec::{CodeBatch, CodecDecoder, DecoderFailure};

/// Hop length of the synthetic decoders (samples per frame)
pub const TEST_HOP: usize = 320;

/// DC level a marker decoder emits for a code
pub fn level_for(code: i64) -> f32 {
    code as f32 / 16.0
}

/// Emits `hop` samples per frame at `level_for(first codebook code)`,
/// scaled by the frame's gain. Counts every call.
#[derive(Default)]
pub struct MarkerDecoder {
    calls: AtomicUsize,
    releases: AtomicUsize,
    frames_seen: Mutex<Vec<usize>>,
}

impl MarkerDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    /// Frames passed to each decode call, in call order
    pub fn frames_seen(&self) -> Vec<usize> {
        self.frames_seen.lock().unwrap().clone()
    }
}

impl CodecDecoder for MarkerDecoder {
    fn hop_length(&self) -> usize {
        TEST_HOP
    }

    fn decode(&self, batch: CodeBatch<'_>, scale: &[f32]) -> Result<Vec<f32>, DecoderFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.frames_seen.lock().unwrap().push(batch.frames);

        assert_eq!(batch.codes.len(), batch.depth * batch.frames);
        assert_eq!(scale.len(), batch.frames);

        let mut samples = Vec::with_capacity(batch.frames * TEST_HOP);
        for (frame, &code) in batch.row(0).iter().enumerate() {
            let level = level_for(code) * scale[frame];
            samples.extend(std::iter::repeat(level).take(TEST_HOP));
        }
        Ok(samples)
    }

    fn release_cache(&self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }

    fn name(&self) -> &str {
        "marker"
    }
}

/// A [`MarkerDecoder`] that fails on one call (0-based)
pub struct FailingDecoder {
    inner: MarkerDecoder,
    fail_on: usize,
}

impl FailingDecoder {
    pub fn new(fail_on: usize) -> Self {
        Self {
            inner: MarkerDecoder::new(),
            fail_on,
        }
    }

    pub fn calls(&self) -> usize {
        self.inner.calls()
    }

    pub fn releases(&self) -> usize {
        self.inner.releases()
    }
}

impl CodecDecoder for FailingDecoder {
    fn hop_length(&self) -> usize {
        TEST_HOP
    }

    fn decode(&self, batch: CodeBatch<'_>, scale: &[f32]) -> Result<Vec<f32>, DecoderFailure> {
        if self.inner.calls() == self.fail_on {
            self.inner.calls.fetch_add(1, Ordering::SeqCst);
            return Err(DecoderFailure::new("synthetic decoder fault"));
        }
        self.inner.decode(batch, scale)
    }

    fn release_cache(&self) {
        self.inner.release_cache();
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// A [`MarkerDecoder`] whose output on one call (0-based) contains a NaN
pub struct NanDecoder {
    inner: MarkerDecoder,
    corrupt_on: usize,
}

impl NanDecoder {
    pub fn new(corrupt_on: usize) -> Self {
        Self {
            inner: MarkerDecoder::new(),
            corrupt_on,
        }
    }

    pub fn calls(&self) -> usize {
        self.inner.calls()
    }

    pub fn releases(&self) -> usize {
        self.inner.releases()
    }
}

impl CodecDecoder for NanDecoder {
    fn hop_length(&self) -> usize {
        TEST_HOP
    }

    fn decode(&self, batch: CodeBatch<'_>, scale: &[f32]) -> Result<Vec<f32>, DecoderFailure> {
        let call = self.inner.calls();
        let mut samples = self.inner.decode(batch, scale)?;
        if call == self.corrupt_on {
            if let Some(first) = samples.first_mut() {
                *first = f32::NAN;
            }
        }
        Ok(samples)
    }

    fn release_cache(&self) {
        self.inner.release_cache();
    }

    fn name(&self) -> &str {
        "nan"
    }
}

/// Zero hop length: every batch decodes to an empty segment
#[derive(Default)]
pub struct HoplessDecoder {
    calls: AtomicUsize,
}

impl HoplessDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CodecDecoder for HoplessDecoder {
    fn hop_length(&self) -> usize {
        0
    }

    fn decode(&self, _batch: CodeBatch<'_>, _scale: &[f32]) -> Result<Vec<f32>, DecoderFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }

    fn name(&self) -> &str {
        "hopless"
    }
}
