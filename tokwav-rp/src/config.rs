//! tokwav-rp configuration
//!
//! Bootstrap settings are layered: CLI, environment, TOML file, then
//! compiled defaults. The resolved [`ServiceConfig`] is validated once at
//! startup and shared read-only afterwards.

use crate::codec::{FrameLayout, DEFAULT_BATCH_SIZE, DEFAULT_SOURCE_RATE, SOURCE_RATE_RANGE};
use crate::pipeline::{PipelineSettings, ResampleMode};
use serde::Deserialize;
use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokwav_common::config::resolve_root_folder;
use tokwav_common::{Error, Result};

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 5780;

/// Default upload limit for encoded payloads (64 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1";
const DEFAULT_BUCKET: &str = "recordings";
const DATABASE_FILE: &str = "tokwav.db";
const MODEL_SUBDIR: &str = "models/encodec_24khz";

/// Compute device for the decoder backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceKind {
    #[default]
    Cpu,
    /// CUDA device ordinal
    Cuda(usize),
}

impl FromStr for DeviceKind {
    type Err = Error;

    /// Accepts `cpu`, `cuda` and `cuda:N`
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpu" => Ok(DeviceKind::Cpu),
            "cuda" => Ok(DeviceKind::Cuda(0)),
            other => other
                .strip_prefix("cuda:")
                .and_then(|ordinal| ordinal.parse().ok())
                .map(DeviceKind::Cuda)
                .ok_or_else(|| Error::Config(format!("Unknown decoder device '{}'", s))),
        }
    }
}

/// `[storage]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    pub bucket: String,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            bucket: DEFAULT_BUCKET.to_string(),
        }
    }
}

/// `[pipeline]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineSection {
    pub batch_size: usize,
    pub layout: FrameLayout,
    pub resample_mode: ResampleMode,
    pub default_source_rate: u32,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            layout: FrameLayout::default(),
            resample_mode: ResampleMode::default(),
            default_source_rate: DEFAULT_SOURCE_RATE,
        }
    }
}

/// `[decoder]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DecoderSection {
    pub model_dir: Option<PathBuf>,
    pub device: String,
}

impl Default for DecoderSection {
    fn default() -> Self {
        Self {
            model_dir: None,
            device: "cpu".to_string(),
        }
    }
}

/// Contents of the TOML bootstrap file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub bind_addr: Option<String>,
    pub port: Option<u16>,
    pub database_path: Option<PathBuf>,
    pub max_upload_bytes: Option<usize>,
    pub storage: StorageSection,
    pub pipeline: PipelineSection,
    pub decoder: DecoderSection,
}

/// Values supplied on the command line (or their env fallbacks)
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub root_folder: Option<PathBuf>,
    pub bind_addr: Option<String>,
    pub port: Option<u16>,
    pub database_path: Option<PathBuf>,
    pub model_dir: Option<PathBuf>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub root_folder: PathBuf,
    pub bind_addr: String,
    pub port: u16,
    pub database_path: PathBuf,
    pub bucket: String,
    pub pipeline: PipelineSettings,
    /// Rate assumed when an upload omits `sample_rate`
    pub default_source_rate: u32,
    pub model_dir: PathBuf,
    pub device: DeviceKind,
    pub max_upload_bytes: usize,
}

impl ServiceConfig {
    /// Merge CLI overrides onto the TOML file and fill in defaults.
    pub fn resolve(cli: CliOverrides, toml: TomlConfig) -> Result<Self> {
        let root_folder = resolve_root_folder(cli.root_folder.as_deref(), toml.root_folder.as_deref());

        let database_path = cli
            .database_path
            .or(toml.database_path)
            .unwrap_or_else(|| root_folder.join(DATABASE_FILE));

        let model_dir = cli
            .model_dir
            .or(toml.decoder.model_dir)
            .unwrap_or_else(|| root_folder.join(MODEL_SUBDIR));

        let batch_size = NonZeroUsize::new(toml.pipeline.batch_size)
            .ok_or_else(|| Error::Config("pipeline.batch_size must be at least 1".to_string()))?;

        let config = Self {
            bind_addr: cli
                .bind_addr
                .or(toml.bind_addr)
                .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            port: cli.port.or(toml.port).unwrap_or(DEFAULT_PORT),
            database_path,
            bucket: toml.storage.bucket,
            pipeline: PipelineSettings {
                batch_size,
                layout: toml.pipeline.layout,
                resample_mode: toml.pipeline.resample_mode,
            },
            default_source_rate: toml.pipeline.default_source_rate,
            model_dir,
            device: toml.decoder.device.parse()?,
            max_upload_bytes: toml.max_upload_bytes.unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            root_folder,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !SOURCE_RATE_RANGE.contains(&self.default_source_rate) {
            return Err(Error::Config(format!(
                "pipeline.default_source_rate {} outside {}..={} Hz",
                self.default_source_rate,
                SOURCE_RATE_RANGE.start(),
                SOURCE_RATE_RANGE.end()
            )));
        }
        if self.max_upload_bytes == 0 {
            return Err(Error::Config("max_upload_bytes must be positive".to_string()));
        }
        if self.bucket.is_empty() || self.bucket.contains(['/', '\\']) || self.bucket == ".." {
            return Err(Error::Config(format!("Invalid storage bucket '{}'", self.bucket)));
        }
        self.socket_addr().map(|_| ())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.bind_addr, self.port)
            .parse()
            .map_err(|e| Error::Config(format!("Invalid bind address {}:{}: {}", self.bind_addr, self.port, e)))
    }

    /// Directory holding blob buckets
    pub fn blob_root(&self) -> &Path {
        &self.root_folder
    }
}
