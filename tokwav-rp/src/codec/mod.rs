//! Neural codec token handling
//!
//! Payload validation, frame demuxing and batch decoding through an external
//! neural decoder. Everything here is synchronous; the HTTP layer moves runs
//! onto the blocking pool.

pub mod decoder;
pub mod demux;
#[cfg(feature = "candle")]
pub mod encodec;
pub mod ledger;
pub mod payload;

pub use decoder::{BatchDecoder, CodeBatch, CodecDecoder, DecodedSegment, DecoderFailure};
pub use demux::{Batch, Batches, FrameDemuxer, FrameLayout};
pub use ledger::{BufferLedger, Tracked};
pub use payload::{EncodedPayload, FormatTag};

use std::ops::RangeInclusive;

/// Quantized code channels per time-step frame
pub const CODEBOOK_DEPTH: usize = 8;

/// Frames per decode call unless configured otherwise
pub const DEFAULT_BATCH_SIZE: usize = 75;

/// Source rate assumed when the client does not declare one
pub const DEFAULT_SOURCE_RATE: u32 = 24_000;

/// Declared source rates a payload may carry
pub const SOURCE_RATE_RANGE: RangeInclusive<u32> = 8_000..=192_000;
