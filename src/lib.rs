use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

pub mod batch;
pub mod color;
pub mod engine;
pub mod fonts;
pub mod job;
pub mod log_sink;
pub mod params;
pub mod placement;
pub mod render;
pub mod timestamp;
pub mod validation;
pub mod worker;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub fonts: FontConfig,
    #[serde(default)]
    pub video: VideoConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: PathBuf,
    #[serde(default = "default_ffprobe")]
    pub ffprobe: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FontConfig {
    #[serde(default = "default_font_directory")]
    pub directory: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VideoConfig {
    /// Size assumed for a video whose dimensions cannot be probed.
    #[serde(default = "default_probe_fallback_width")]
    pub probe_fallback_width: u32,
    #[serde(default = "default_probe_fallback_height")]
    pub probe_fallback_height: u32,
}

fn default_ffmpeg() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_ffprobe() -> PathBuf {
    PathBuf::from("ffprobe")
}

fn default_font_directory() -> PathBuf {
    if cfg!(windows) {
        PathBuf::from("C:/Windows/Fonts")
    } else {
        PathBuf::from("/usr/share/fonts/truetype")
    }
}

fn default_probe_fallback_width() -> u32 {
    720
}

fn default_probe_fallback_height() -> u32 {
    1280
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ffmpeg: default_ffmpeg(),
            ffprobe: default_ffprobe(),
        }
    }
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            directory: default_font_directory(),
        }
    }
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            probe_fallback_width: default_probe_fallback_width(),
            probe_fallback_height: default_probe_fallback_height(),
        }
    }
}

impl VideoConfig {
    pub fn fallback_size(&self) -> (u32, u32) {
        (self.probe_fallback_width, self.probe_fallback_height)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {0:?}: {1}")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("invalid config {0:?}: {1}")]
    Parse(PathBuf, #[source] toml_edit::de::Error),
}

impl Config {
    /// Load `path`, or the defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
        let config = toml_edit::de::from_str::<Config>(&content)
            .map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        info!("Configuration loaded from: {:?}", path);
        Ok(config)
    }
}
