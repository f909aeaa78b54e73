//! Client-submitted token payloads
//!
//! The wire format is a flat buffer of little-endian f32 values, one per code
//! index, `CODEBOOK_DEPTH` values per frame. Validation happens once, before
//! any decoder resource is touched.

use crate::codec::{CODEBOOK_DEPTH, SOURCE_RATE_RANGE};
use crate::error::PipelineError;
use std::fmt;
use std::str::FromStr;

const VALUE_BYTES: usize = std::mem::size_of::<f32>();

/// Supported payload formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatTag {
    /// EnCodec-style 8-codebook token frames
    CodecV1,
}

impl FormatTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormatTag::CodecV1 => "codec-v1",
        }
    }
}

impl FromStr for FormatTag {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            // "encodec" is what the browser client has always sent
            "codec-v1" | "encodec" => Ok(FormatTag::CodecV1),
            other => Err(PipelineError::MalformedInput(format!(
                "Unsupported format '{}': only codec-v1 is supported",
                other
            ))),
        }
    }
}

impl fmt::Display for FormatTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw request payload, read-only for the lifetime of a run
#[derive(Debug, Clone)]
pub struct EncodedPayload {
    bytes: Vec<u8>,
    source_sample_rate: u32,
    format_tag: String,
}

impl EncodedPayload {
    pub fn new(bytes: Vec<u8>, source_sample_rate: u32, format_tag: impl Into<String>) -> Self {
        Self {
            bytes,
            source_sample_rate,
            format_tag: format_tag.into(),
        }
    }

    /// Build a payload from already-decoded code values (tests, tooling)
    pub fn from_values(values: &[f32], source_sample_rate: u32) -> Self {
        let bytes = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        Self::new(bytes, source_sample_rate, FormatTag::CodecV1.as_str())
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn source_sample_rate(&self) -> u32 {
        self.source_sample_rate
    }

    pub fn format_tag(&self) -> &str {
        &self.format_tag
    }

    /// Check the format tag, declared rate and frame-depth invariant.
    ///
    /// Returns the number of frames the payload holds.
    pub fn validate(&self) -> Result<usize, PipelineError> {
        self.format_tag.parse::<FormatTag>()?;

        if !SOURCE_RATE_RANGE.contains(&self.source_sample_rate) {
            return Err(PipelineError::MalformedInput(format!(
                "Source sample rate {} Hz outside supported range {}..={} Hz",
                self.source_sample_rate,
                SOURCE_RATE_RANGE.start(),
                SOURCE_RATE_RANGE.end()
            )));
        }

        if self.bytes.len() % VALUE_BYTES != 0 {
            return Err(PipelineError::MalformedInput(format!(
                "Payload length {} is not a whole number of 32-bit values",
                self.bytes.len()
            )));
        }

        let values = self.bytes.len() / VALUE_BYTES;
        if values % CODEBOOK_DEPTH != 0 {
            return Err(PipelineError::MalformedInput(format!(
                "Payload holds {} values, not divisible by codebook depth {}",
                values, CODEBOOK_DEPTH
            )));
        }

        Ok(values / CODEBOOK_DEPTH)
    }
}
