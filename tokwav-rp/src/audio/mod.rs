//! PCM post-processing: resampling to the canonical rate and WAV output

pub mod resampler;
pub mod writer;

pub use resampler::{ResampledSegment, Resampler, CANONICAL_SAMPLE_RATE};
pub use writer::{AudioArtifact, StreamWriter, WAV_CONTENT_TYPE};
