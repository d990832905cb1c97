use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    #[serde(default)]
    pub scanner: ScannerConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub analyzer: AnalyzerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    #[serde(default = "default_photo_extensions")]
    pub photo_extensions: Vec<String>,

    #[serde(default = "default_video_extensions")]
    pub video_extensions: Vec<String>,

    /// Appended to the full file name to form the sidecar path,
    /// e.g. `clip.mp4` -> `clip.mp4.meta.json`.
    #[serde(default = "default_sidecar_suffix")]
    pub sidecar_suffix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Worker threads for the ingest pool. Each worker blocks on external
    /// processes and analyzer calls, so keep this small.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    #[serde(default = "default_analyzer_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_analyzer_model")]
    pub model: String,

    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mediacat")
        .join("catalog.db")
}

fn default_photo_extensions() -> Vec<String> {
    [
        "jpg", "jpeg", "png", "tiff", "tif", "heic", "heif", "webp", "cr2", "cr3", "nef", "arw",
        "dng", "raf",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_video_extensions() -> Vec<String> {
    ["mp4", "mov", "avi", "mkv", "mts", "m2ts", "mxf", "r3d", "braw"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_sidecar_suffix() -> String {
    ".meta.json".to_string()
}

fn default_workers() -> usize {
    4
}

fn default_analyzer_endpoint() -> String {
    "http://127.0.0.1:1234/v1".to_string()
}

fn default_analyzer_model() -> String {
    "gemma-3-4b".to_string()
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            photo_extensions: default_photo_extensions(),
            video_extensions: default_video_extensions(),
            sidecar_suffix: default_sidecar_suffix(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
        }
    }
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            endpoint: default_analyzer_endpoint(),
            model: default_analyzer_model(),
            api_key: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            scanner: ScannerConfig::default(),
            pipeline: PipelineConfig::default(),
            analyzer: AnalyzerConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            // Create default config
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;

        Ok(())
    }

    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mediacat")
    }

    fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }
}
