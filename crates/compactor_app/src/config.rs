use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use compactor_engine::{CodecSettings, EngineSettings, ImageSettings, SimulationSettings};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::logging::LogDestination;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

/// Settings file for the `compactor` binary, in RON. Every field is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub output_dir: PathBuf,
    pub log: LogDestination,
    /// One of `off`, `error`, `warn`, `info`, `debug`, `trace`.
    pub log_level: String,
    pub image: ImageConfig,
    pub codec: CodecConfig,
    pub simulation: SimulationConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./compacted"),
            log: LogDestination::default(),
            log_level: "info".to_string(),
            image: ImageConfig::default(),
            codec: CodecConfig::default(),
            simulation: SimulationConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    pub max_dimension: u32,
    pub max_output_bytes: u64,
    pub initial_quality: u8,
    pub min_quality: u8,
    pub max_attempts: usize,
}

impl Default for ImageConfig {
    fn default() -> Self {
        let image = ImageSettings::default();
        Self {
            max_dimension: image.max_dimension,
            max_output_bytes: image.max_output_bytes,
            initial_quality: image.initial_quality,
            min_quality: image.min_quality,
            max_attempts: image.max_attempts,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    pub ffmpeg_path: Option<PathBuf>,
    /// Defaults to `compactor-codec` under the system temp dir.
    pub cache_dir: Option<PathBuf>,
    pub bundle_url: Option<String>,
    pub bundle_sha256: Option<String>,
    pub max_bundle_bytes: u64,
    pub connect_timeout_ms: u64,
    pub download_timeout_ms: u64,
    pub search_path: bool,
    pub audio_bitrate_kbps: u32,
    pub video_crf: u8,
}

impl Default for CodecConfig {
    fn default() -> Self {
        let codec = CodecSettings::default();
        Self {
            ffmpeg_path: codec.ffmpeg_path,
            cache_dir: None,
            bundle_url: codec.bundle_url,
            bundle_sha256: codec.bundle_sha256,
            max_bundle_bytes: codec.max_bundle_bytes,
            connect_timeout_ms: millis(codec.connect_timeout),
            download_timeout_ms: millis(codec.download_timeout),
            search_path: codec.search_path,
            audio_bitrate_kbps: codec.audio_bitrate_kbps,
            video_crf: codec.video_crf,
        }
    }
}

/// Pass-through behaviour for media when no codec is available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub steps: u32,
    pub step_delay_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let simulation = SimulationSettings::default();
        Self {
            steps: simulation.steps,
            step_delay_ms: millis(simulation.step_delay),
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron(&text)
    }

    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(text)?)
    }

    /// Unknown level names fall back to `info`.
    pub fn level_filter(&self) -> LevelFilter {
        LevelFilter::from_str(self.log_level.trim()).unwrap_or(LevelFilter::Info)
    }

    pub fn engine_settings(&self) -> EngineSettings {
        let defaults = CodecSettings::default();
        EngineSettings {
            image: ImageSettings {
                max_dimension: self.image.max_dimension,
                max_output_bytes: self.image.max_output_bytes,
                initial_quality: self.image.initial_quality,
                min_quality: self.image.min_quality,
                max_attempts: self.image.max_attempts,
            },
            codec: CodecSettings {
                ffmpeg_path: self.codec.ffmpeg_path.clone(),
                cache_dir: self.codec.cache_dir.clone().unwrap_or(defaults.cache_dir),
                bundle_url: self.codec.bundle_url.clone(),
                bundle_sha256: self.codec.bundle_sha256.clone(),
                max_bundle_bytes: self.codec.max_bundle_bytes,
                connect_timeout: Duration::from_millis(self.codec.connect_timeout_ms),
                download_timeout: Duration::from_millis(self.codec.download_timeout_ms),
                search_path: self.codec.search_path,
                audio_bitrate_kbps: self.codec.audio_bitrate_kbps,
                video_crf: self.codec.video_crf,
            },
            simulation: SimulationSettings {
                steps: self.simulation.steps,
                step_delay: Duration::from_millis(self.simulation.step_delay_ms),
            },
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
