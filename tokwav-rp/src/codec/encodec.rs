//! EnCodec 24 kHz decoder backed by candle
//!
//! Loads `config.json` and `model.safetensors` (the `facebook/encodec_24khz`
//! layout) from a model directory once at startup. Only the decode half of
//! the model is exercised.

use crate::codec::decoder::{apply_frame_scale, CodeBatch, CodecDecoder, DecoderFailure};
use crate::config::DeviceKind;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::encodec;
use serde::Deserialize;
use std::path::Path;
use tracing::info;

impl From<candle_core::Error> for DecoderFailure {
    fn from(err: candle_core::Error) -> Self {
        DecoderFailure(err.to_string())
    }
}

/// Fields read from `config.json` in addition to the model config
#[derive(Debug, Deserialize)]
struct FrameGeometry {
    upsampling_ratios: Vec<usize>,
    codebook_size: usize,
    sampling_rate: u32,
}

pub struct EncodecDecoder {
    model: encodec::Model,
    device: Device,
    hop_length: usize,
    codebook_size: usize,
    native_rate: u32,
}

impl EncodecDecoder {
    pub fn load(model_dir: &Path, device: DeviceKind) -> Result<Self, DecoderFailure> {
        let config_text = std::fs::read_to_string(model_dir.join("config.json"))?;
        let config: encodec::Config = serde_json::from_str(&config_text)?;
        let geometry: FrameGeometry = serde_json::from_str(&config_text)?;

        let device = match device {
            DeviceKind::Cpu => Device::Cpu,
            DeviceKind::Cuda(ordinal) => Device::new_cuda(ordinal)?,
        };

        let weights = model_dir.join("model.safetensors");
        // SAFETY: the weights file is opened read-only and not modified while mapped
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[weights], DType::F32, &device)? };
        let model = encodec::Model::new(&config, vb)?;

        let hop_length = geometry.upsampling_ratios.iter().product();
        info!(
            "EnCodec decoder loaded from {} (hop {}, {} Hz, {} codes/codebook)",
            model_dir.display(),
            hop_length,
            geometry.sampling_rate,
            geometry.codebook_size
        );

        Ok(Self {
            model,
            device,
            hop_length,
            codebook_size: geometry.codebook_size,
            native_rate: geometry.sampling_rate,
        })
    }

    pub fn native_rate(&self) -> u32 {
        self.native_rate
    }

    fn checked_codes(&self, batch: &CodeBatch<'_>) -> Result<Vec<u32>, DecoderFailure> {
        batch
            .codes
            .iter()
            .map(|&code| {
                if code < 0 || code as usize >= self.codebook_size {
                    Err(DecoderFailure(format!(
                        "code {} outside codebook of size {}",
                        code, self.codebook_size
                    )))
                } else {
                    Ok(code as u32)
                }
            })
            .collect()
    }
}

impl CodecDecoder for EncodecDecoder {
    fn hop_length(&self) -> usize {
        self.hop_length
    }

    fn decode(&self, batch: CodeBatch<'_>, scale: &[f32]) -> Result<Vec<f32>, DecoderFailure> {
        let codes = self.checked_codes(&batch)?;
        let codes = Tensor::from_vec(codes, (1, batch.depth, batch.frames), &self.device)?;

        let pcm = self.model.decode(&codes)?;
        let mut samples = pcm.flatten_all()?.to_vec1::<f32>()?;

        apply_frame_scale(&mut samples, scale, self.hop_length);
        Ok(samples)
    }

    // Tensors are freed on drop; candle keeps no allocator cache to evict.
    fn release_cache(&self) {}

    fn name(&self) -> &str {
        "encodec-24khz"
    }
}
