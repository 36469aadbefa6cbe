use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct EngineSettings {
    pub image: ImageSettings,
    pub codec: CodecSettings,
    pub simulation: SimulationSettings,
}

#[derive(Debug, Clone)]
pub struct ImageSettings {
    /// Longest side after resizing, in pixels.
    pub max_dimension: u32,
    /// Encoding stops early once an attempt fits in this many bytes.
    pub max_output_bytes: u64,
    pub initial_quality: u8,
    pub min_quality: u8,
    pub max_attempts: usize,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            max_dimension: 1920,
            max_output_bytes: 1024 * 1024,
            initial_quality: 80,
            min_quality: 40,
            max_attempts: 6,
        }
    }
}

/// Where the ffmpeg runtime comes from. Candidates are tried in field order.
#[derive(Debug, Clone)]
pub struct CodecSettings {
    pub ffmpeg_path: Option<PathBuf>,
    pub cache_dir: PathBuf,
    pub bundle_url: Option<String>,
    /// Hex SHA-256 the downloaded bundle must match, if set.
    pub bundle_sha256: Option<String>,
    pub max_bundle_bytes: u64,
    pub connect_timeout: Duration,
    pub download_timeout: Duration,
    pub search_path: bool,
    pub audio_bitrate_kbps: u32,
    pub video_crf: u8,
}

impl Default for CodecSettings {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            cache_dir: std::env::temp_dir().join("compactor-codec"),
            bundle_url: None,
            bundle_sha256: None,
            max_bundle_bytes: 256 * 1024 * 1024,
            connect_timeout: Duration::from_secs(10),
            download_timeout: Duration::from_secs(300),
            search_path: true,
            audio_bitrate_kbps: 128,
            video_crf: 28,
        }
    }
}

/// Pacing of the pass-through used when no codec runtime is usable.
#[derive(Debug, Clone)]
pub struct SimulationSettings {
    pub steps: u32,
    pub step_delay: Duration,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            steps: 20,
            step_delay: Duration::from_millis(100),
        }
    }
}
