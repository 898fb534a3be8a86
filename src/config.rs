use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::{
    error::{ConfigError, Result},
    report::ReportFormat,
    video::{DecoderKind, FfmpegOpener},
};

/// PSNR threshold used when a video entry does not set one, in dB
pub const DEFAULT_THRESHOLD: f64 = 30.0;

/// Main configuration for a comparison run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Reference/compressed pairs to compare, in report order
    #[serde(default)]
    pub videos: Vec<VideoPairConfig>,

    /// Report output settings
    #[serde(default)]
    pub report: ReportConfig,

    /// Decoding and scheduling settings
    #[serde(default)]
    pub processing: ProcessingConfig,
}

/// On-disk configuration syntax, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|ext| ext.to_str()).map(str::to_lowercase).as_deref() {
            Some("toml") => Ok(Self::Toml),
            Some("json") => Ok(Self::Json),
            _ => Err(ConfigError::UnsupportedFormat { path: path.display().to_string() }.into()),
        }
    }
}

impl Config {
    /// Load configuration from a TOML or JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)?;
        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound { path: path.display().to_string() })?;

        let parse_failed = |reason: String| ConfigError::ParseFailed {
            path: path.display().to_string(),
            reason,
        };

        let config: Config = match format {
            ConfigFormat::Toml => toml::from_str(&content).map_err(|e| parse_failed(e.to_string()))?,
            ConfigFormat::Json => serde_json::from_str(&content).map_err(|e| parse_failed(e.to_string()))?,
        };
        Ok(config)
    }

    /// Save configuration to a TOML or JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let invalid = |value: String| ConfigError::InvalidValue { key: "config".to_string(), value };

        let content = match ConfigFormat::from_path(path)? {
            ConfigFormat::Toml => toml::to_string_pretty(self).map_err(|e| invalid(e.to_string()))?,
            ConfigFormat::Json => serde_json::to_string_pretty(self).map_err(|e| invalid(e.to_string()))?,
        };

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.videos.is_empty() {
            return Err(ConfigError::MissingKey { key: "videos".to_string() }.into());
        }
        for (index, video) in self.videos.iter().enumerate() {
            video.validate(index)?;
        }
        self.report.validate()?;
        self.processing.validate()?;
        Ok(())
    }
}

/// One reference/compressed pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoPairConfig {
    /// Reference (original) video
    pub reference_video: String,

    /// Compressed video compared against the reference
    pub compressed_video: String,

    /// Frames with PSNR strictly below this (dB) count as poor
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

impl VideoPairConfig {
    pub fn new<R: Into<String>, C: Into<String>>(reference_video: R, compressed_video: C, threshold: f64) -> Self {
        Self {
            reference_video: reference_video.into(),
            compressed_video: compressed_video.into(),
            threshold,
        }
    }

    fn validate(&self, index: usize) -> Result<()> {
        if self.reference_video.trim().is_empty() {
            return Err(ConfigError::MissingKey { key: format!("videos[{}].reference_video", index) }.into());
        }
        if self.compressed_video.trim().is_empty() {
            return Err(ConfigError::MissingKey { key: format!("videos[{}].compressed_video", index) }.into());
        }
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(ConfigError::InvalidValue {
                key: format!("videos[{}].threshold", index),
                value: self.threshold.to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// Report output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Output directory; falls back to the working directory when unset or missing
    #[serde(default)]
    pub folder: Option<PathBuf>,

    /// Base file name without extension
    #[serde(default)]
    pub name: Option<String>,

    /// Formats to write
    #[serde(default = "default_formats")]
    pub formats: Vec<ReportFormat>,
}

fn default_formats() -> Vec<ReportFormat> {
    vec![ReportFormat::Html]
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            folder: None,
            name: None,
            formats: default_formats(),
        }
    }
}

impl ReportConfig {
    /// Directory reports are written to
    pub fn resolve_folder(&self) -> Result<PathBuf> {
        match &self.folder {
            Some(folder) if folder.is_dir() => Ok(folder.clone()),
            _ => Ok(std::env::current_dir()?),
        }
    }

    /// Base file name, timestamped when not configured
    pub fn resolve_name(&self, now: &DateTime<Local>) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("report_{}", now.format("%Y%m%d_%H_%M_%S")),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.formats.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "report.formats".to_string(),
                value: "[]".to_string(),
            }
            .into());
        }
        if let Some(name) = &self.name {
            if name.trim().is_empty() || name.contains(['/', '\\']) {
                return Err(ConfigError::InvalidValue {
                    key: "report.name".to_string(),
                    value: name.clone(),
                }
                .into());
            }
        }
        Ok(())
    }
}

/// Decoding and scheduling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Decoder backend
    #[serde(default)]
    pub decoder: DecoderKind,

    /// Number of pairs evaluated concurrently
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// ffmpeg binary used for decoding
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg_path: PathBuf,

    /// ffprobe binary used for stream metadata
    #[serde(default = "default_ffprobe")]
    pub ffprobe_path: PathBuf,
}

fn default_workers() -> usize {
    num_cpus::get()
}

fn default_ffmpeg() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_ffprobe() -> PathBuf {
    PathBuf::from("ffprobe")
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            decoder: DecoderKind::default(),
            workers: default_workers(),
            ffmpeg_path: default_ffmpeg(),
            ffprobe_path: default_ffprobe(),
        }
    }
}

impl ProcessingConfig {
    /// ffmpeg opener built from the configured binary paths
    pub fn ffmpeg_opener(&self) -> FfmpegOpener {
        FfmpegOpener::new(&self.ffmpeg_path, &self.ffprobe_path)
    }

    fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(ConfigError::InvalidValue {
                key: "processing.workers".to_string(),
                value: self.workers.to_string(),
            }
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QualityError;
    use tempfile::tempdir;

    fn sample_config() -> Config {
        Config {
            videos: vec![VideoPairConfig::new("ref.mov", "cmp.mp4", 35.0)],
            ..Config::default()
        }
    }

    #[test]
    fn test_default_config_needs_videos() {
        let err = Config::default().validate().unwrap_err();
        assert!(matches!(err, QualityError::Config(ConfigError::MissingKey { .. })));
        assert!(sample_config().validate().is_ok());
    }

    #[test]
    fn test_toml_roundtrip() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("compare.toml");

        let original = sample_config();
        original.save_to_file(&file_path).unwrap();
        let loaded = Config::from_file(&file_path).unwrap();

        assert_eq!(loaded.videos, original.videos);
        assert_eq!(loaded.processing.workers, original.processing.workers);
        assert_eq!(loaded.report.formats, vec![ReportFormat::Html]);
    }

    #[test]
    fn test_json_with_defaults() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("compare.json");
        std::fs::write(
            &file_path,
            r#"{"videos": [{"reference_video": "./test.mov", "compressed_video": "./test.mp4"}],
                "processing": {"decoder": "image_sequence", "workers": 2}}"#,
        )
        .unwrap();

        let config = Config::from_file(&file_path).unwrap();
        assert_eq!(config.videos[0].threshold, DEFAULT_THRESHOLD);
        assert_eq!(config.processing.decoder, DecoderKind::ImageSequence);
        assert_eq!(config.processing.workers, 2);
        assert_eq!(config.processing.ffmpeg_path, PathBuf::from("ffmpeg"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unsupported_extension() {
        let err = Config::from_file("compare.yaml").unwrap_err();
        assert!(matches!(err, QualityError::Config(ConfigError::UnsupportedFormat { .. })));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        let err = Config::from_file(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, QualityError::Config(ConfigError::FileNotFound { .. })));
    }

    #[test]
    fn test_malformed_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("broken.json");
        std::fs::write(&file_path, "{ not json").unwrap();
        let err = Config::from_file(&file_path).unwrap_err();
        assert!(matches!(err, QualityError::Config(ConfigError::ParseFailed { .. })));
    }

    #[test]
    fn test_invalid_threshold() {
        let mut config = sample_config();
        config.videos[0].threshold = f64::NAN;
        assert!(config.validate().is_err());
        config.videos[0].threshold = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_workers_and_formats() {
        let mut config = sample_config();
        config.processing.workers = 0;
        assert!(config.validate().is_err());

        let mut config = sample_config();
        config.report.formats.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_report_folder_falls_back_to_cwd() {
        let dir = tempdir().unwrap();
        let mut report = ReportConfig::default();
        assert_eq!(report.resolve_folder().unwrap(), std::env::current_dir().unwrap());

        report.folder = Some(dir.path().join("does-not-exist"));
        assert_eq!(report.resolve_folder().unwrap(), std::env::current_dir().unwrap());

        report.folder = Some(dir.path().to_path_buf());
        assert_eq!(report.resolve_folder().unwrap(), dir.path());
    }

    #[test]
    fn test_report_name_is_timestamped_by_default() {
        use chrono::TimeZone;
        let now = Local.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        let mut report = ReportConfig::default();
        assert_eq!(report.resolve_name(&now), "report_20240305_14_07_09");

        report.name = Some("nightly".to_string());
        assert_eq!(report.resolve_name(&now), "nightly");
    }
}
