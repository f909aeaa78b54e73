//! Test helpers for tokwav-rp integration tests
//!
//! - Synthetic decoders that turn code values into recognizable DC levels
//! - A blob store that records every call
//! - Payload builders and WAV read-back

#![allow(dead_code)]

pub mod blob_store;
pub mod decoders;

pub use blob_store::RecordingBlobStore;
pub use decoders::{level_for, FailingDecoder, HoplessDecoder, MarkerDecoder, NanDecoder, TEST_HOP};

use hound::WavReader;
use std::io::Cursor;
use tokwav_rp::codec::{EncodedPayload, FrameLayout, CODEBOOK_DEPTH};

/// Build a payload where every codebook of frame `f` carries `frame_codes[f]`.
pub fn frame_codes_payload(
    frame_codes: &[i64],
    batch_size: usize,
    layout: FrameLayout,
    source_rate: u32,
) -> EncodedPayload {
    let mut values = Vec::with_capacity(frame_codes.len() * CODEBOOK_DEPTH);

    match layout {
        FrameLayout::Chunked => {
            for chunk in frame_codes.chunks(batch_size) {
                for _ in 0..CODEBOOK_DEPTH {
                    values.extend(chunk.iter().map(|&c| c as f32));
                }
            }
        }
        FrameLayout::CodebookMajor => {
            for _ in 0..CODEBOOK_DEPTH {
                values.extend(frame_codes.iter().map(|&c| c as f32));
            }
        }
    }

    EncodedPayload::from_values(&values, source_rate)
}

/// One marker code per batch: batch `i` carries code `i + 1` in every frame.
pub fn batch_marker_payload(batches: usize, batch_size: usize, source_rate: u32) -> EncodedPayload {
    let frame_codes: Vec<i64> = (0..batches)
        .flat_map(|b| std::iter::repeat(b as i64 + 1).take(batch_size))
        .collect();
    frame_codes_payload(&frame_codes, batch_size, FrameLayout::Chunked, source_rate)
}

/// Read a finished WAV back into its spec and samples
pub fn read_wav(bytes: &[u8]) -> (hound::WavSpec, Vec<i16>) {
    let mut reader = WavReader::new(Cursor::new(bytes.to_vec())).expect("valid WAV");
    let spec = reader.spec();
    let samples = reader
        .samples::<i16>()
        .map(|s| s.expect("readable sample"))
        .collect();
    (spec, samples)
}

/// PCM16 value the writer produces for a float level
pub fn pcm16(level: f32) -> i16 {
    (level.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16
}
