//! Incremental WAV writer
//!
//! One writer per request. Segments are appended in arrival order as 16-bit
//! mono PCM; the sample count is tracked exactly and finalize fixes up the
//! RIFF header. Duration is always `frame_count / sample_rate`.

use crate::audio::ResampledSegment;
use crate::error::PipelineError;
use hound::{SampleFormat, WavSpec, WavWriter};
use std::cell::RefCell;
use std::io::{self, Cursor, Seek, SeekFrom, Write};
use std::rc::Rc;
use tracing::debug;

/// MIME type of finished artifacts
pub const WAV_CONTENT_TYPE: &str = "audio/wav";

/// Finished output of a pipeline run
#[derive(Debug, Clone, PartialEq)]
pub struct AudioArtifact {
    pub bytes: Vec<u8>,
    pub sample_rate: u32,
    /// Total samples written (mono, so samples == frames)
    pub frame_count: u64,
    pub duration_seconds: f64,
}

impl AudioArtifact {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn content_type(&self) -> &'static str {
        WAV_CONTENT_TYPE
    }
}

/// In-memory sink shared between the hound writer and the stream writer, so
/// the bytes can be recovered after hound finalizes.
#[derive(Clone, Default)]
struct SinkBuffer(Rc<RefCell<Cursor<Vec<u8>>>>);

impl Write for SinkBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.borrow_mut().flush()
    }
}

impl Seek for SinkBuffer {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.0.borrow_mut().seek(pos)
    }
}

/// Appends resampled segments to a single-channel 16-bit WAV container
pub struct StreamWriter {
    sink: SinkBuffer,
    writer: WavWriter<SinkBuffer>,
    sample_rate: u32,
    frame_count: u64,
    segments: usize,
}

impl StreamWriter {
    /// Open a sink; the WAV header is written immediately.
    pub fn open(sample_rate: u32) -> Result<Self, PipelineError> {
        let spec = WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };

        let sink = SinkBuffer::default();
        let writer = WavWriter::new(sink.clone(), spec)
            .map_err(|e| PipelineError::write(format!("Failed to open WAV sink: {}", e)))?;

        Ok(Self {
            sink,
            writer,
            sample_rate,
            frame_count: 0,
            segments: 0,
        })
    }

    /// Append one segment. Empty segments are accepted and write nothing.
    pub fn append(&mut self, segment: &ResampledSegment) -> Result<(), PipelineError> {
        for &sample in &segment.samples {
            self.writer
                .write_sample(to_pcm16(sample))
                .map_err(|e| PipelineError::write(format!("Failed to append sample: {}", e)))?;
        }

        self.frame_count += segment.samples.len() as u64;
        self.segments += 1;
        Ok(())
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn segments_written(&self) -> usize {
        self.segments
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Fix up the header and hand back the finished container.
    pub fn finalize(self) -> Result<AudioArtifact, PipelineError> {
        let StreamWriter {
            sink,
            writer,
            sample_rate,
            frame_count,
            segments,
        } = self;

        writer
            .finalize()
            .map_err(|e| PipelineError::write(format!("Failed to finalize WAV: {}", e)))?;

        let bytes = Rc::try_unwrap(sink.0)
            .map_err(|_| PipelineError::write("WAV sink still shared after finalize"))?
            .into_inner()
            .into_inner();

        debug!(
            "Finalized WAV: {} segments, {} samples, {} bytes",
            segments,
            frame_count,
            bytes.len()
        );

        Ok(AudioArtifact {
            bytes,
            sample_rate,
            frame_count,
            duration_seconds: frame_count as f64 / sample_rate as f64,
        })
    }
}

/// Clip to [-1.0, 1.0] and scale to i16
fn to_pcm16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16
}
