//! Frame demuxer
//!
//! Slices a validated payload into batches of whole frames. Batches borrow the
//! payload bytes and only materialize their code indices when the decoder asks
//! for them, so iterating is free and can be restarted at will.

use crate::codec::{EncodedPayload, CODEBOOK_DEPTH};
use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;

const VALUE_BYTES: usize = std::mem::size_of::<f32>();

/// How code values are arranged in the flat payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FrameLayout {
    /// Consecutive runs of `batch_size * depth` values, each run laid out as
    /// `(depth, frames_in_batch)`.
    #[default]
    Chunked,
    /// The whole buffer is one `(depth, total_frames)` matrix, as emitted by
    /// the browser-side encoder. A batch is a column range of every row.
    CodebookMajor,
}

/// Splits an [`EncodedPayload`] into [`Batch`]es
#[derive(Debug, Clone, Copy)]
pub struct FrameDemuxer<'a> {
    bytes: &'a [u8],
    total_frames: usize,
    batch_size: usize,
    layout: FrameLayout,
}

impl<'a> FrameDemuxer<'a> {
    /// Validate the payload and prepare batching.
    ///
    /// Fails with `MalformedInput` when the frame-depth invariant is broken.
    pub fn new(
        payload: &'a EncodedPayload,
        batch_size: NonZeroUsize,
        layout: FrameLayout,
    ) -> Result<Self, PipelineError> {
        let total_frames = payload.validate()?;

        Ok(Self {
            bytes: payload.bytes(),
            total_frames,
            batch_size: batch_size.get(),
            layout,
        })
    }

    pub fn total_frames(&self) -> usize {
        self.total_frames
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn layout(&self) -> FrameLayout {
        self.layout
    }

    pub fn batch_count(&self) -> usize {
        self.total_frames.div_ceil(self.batch_size)
    }

    /// Iterate batches from the start. Each call yields a fresh sequence.
    pub fn batches(&self) -> Batches<'a> {
        Batches {
            demuxer: *self,
            next_index: 0,
        }
    }
}

/// Lazy batch sequence produced by [`FrameDemuxer::batches`]
#[derive(Debug, Clone)]
pub struct Batches<'a> {
    demuxer: FrameDemuxer<'a>,
    next_index: usize,
}

impl<'a> Iterator for Batches<'a> {
    type Item = Batch<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let d = &self.demuxer;
        let first_frame = self.next_index * d.batch_size;
        if first_frame >= d.total_frames {
            return None;
        }

        let frames = d.batch_size.min(d.total_frames - first_frame);
        let batch = Batch {
            index: self.next_index,
            first_frame,
            frames,
            bytes: d.bytes,
            total_frames: d.total_frames,
            layout: d.layout,
        };
        self.next_index += 1;
        Some(batch)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.demuxer.batch_count().saturating_sub(self.next_index);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Batches<'_> {}

/// A contiguous run of whole frames, decoded in one call
#[derive(Debug, Clone, Copy)]
pub struct Batch<'a> {
    index: usize,
    first_frame: usize,
    frames: usize,
    bytes: &'a [u8],
    total_frames: usize,
    layout: FrameLayout,
}

impl Batch<'_> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn first_frame(&self) -> usize {
        self.first_frame
    }

    /// Frames in this batch (the last batch may be short)
    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn depth(&self) -> usize {
        CODEBOOK_DEPTH
    }

    /// Materialize the code indices as a `(depth, frames)` row-major matrix.
    ///
    /// Float values are truncated toward zero.
    pub fn codes(&self) -> Vec<i64> {
        let mut codes = Vec::with_capacity(CODEBOOK_DEPTH * self.frames);

        match self.layout {
            FrameLayout::Chunked => {
                let start = self.first_frame * CODEBOOK_DEPTH;
                let end = start + self.frames * CODEBOOK_DEPTH;
                codes.extend((start..end).map(|i| self.value(i)));
            }
            FrameLayout::CodebookMajor => {
                for codebook in 0..CODEBOOK_DEPTH {
                    let row = codebook * self.total_frames + self.first_frame;
                    codes.extend((row..row + self.frames).map(|i| self.value(i)));
                }
            }
        }

        codes
    }

    fn value(&self, index: usize) -> i64 {
        let at = index * VALUE_BYTES;
        let raw = [
            self.bytes[at],
            self.bytes[at + 1],
            self.bytes[at + 2],
            self.bytes[at + 3],
        ];
        f32::from_le_bytes(raw) as i64
    }
}
