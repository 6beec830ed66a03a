//! Session configuration.
//!
//! Options are resolved once per session and validated up front: a bad
//! ratio or quality is reported here instead of surfacing as a device error.

use crate::geometry::{AspectMode, SizePolicy};
use crate::postprocess::DEFAULT_JPEG_QUALITY;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// What a failed or negative autofocus does to a capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FocusGate {
    /// Capture whatever the focus callback reports. Some drivers report
    /// spurious failures.
    #[default]
    IgnoreResult,
    /// Abort the capture with `FocusFailed` when focus reports failure.
    RequireSuccess,
}

/// Where the still rotation comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RotationSource {
    /// The orientation tag the driver wrote into the still.
    #[default]
    Exif,
    /// The picture rotation computed when the session was configured.
    Computed,
}

/// Caller-facing session options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionOptions {
    /// Ratios to try, in priority order.
    pub aspect_ratios: Vec<AspectMode>,
    pub use_front_camera: bool,
    pub can_switch_camera: bool,
    pub size_policy: SizePolicy,
    pub focus_gate: FocusGate,
    pub rotation_source: RotationSource,
    /// JPEG quality of finished stills, 1 to 100.
    pub jpeg_quality: u8,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            aspect_ratios: vec![AspectMode::Auto],
            use_front_camera: false,
            can_switch_camera: false,
            size_policy: SizePolicy::MidRank,
            focus_gate: FocusGate::IgnoreResult,
            rotation_source: RotationSource::Exif,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl SessionOptions {
    /// Options asking for the given ratios, in order.
    pub fn with_aspect_ratios(aspect_ratios: impl IntoIterator<Item = AspectMode>) -> Self {
        Self {
            aspect_ratios: aspect_ratios.into_iter().collect(),
            ..Default::default()
        }
    }

    /// Validates the options.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.aspect_ratios.is_empty() {
            return Err(ConfigError::NoAspectRatios);
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(ConfigError::InvalidJpegQuality(self.jpeg_quality));
        }
        if let SizePolicy::Threshold { preview, picture } = self.size_policy {
            for size in [preview, picture] {
                if size.width == 0 || size.height == 0 {
                    return Err(ConfigError::InvalidSize(size.to_string()));
                }
            }
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid aspect ratio {0:?} (expected \"auto\" or W:H with both positive)")]
    InvalidAspectRatio(String),
    #[error("invalid size {0:?} (expected WxH with both positive)")]
    InvalidSize(String),
    #[error("at least one aspect ratio is required")]
    NoAspectRatios,
    #[error("invalid JPEG quality {0} (must be 1-100)")]
    InvalidJpegQuality(u8),
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub session: SessionOptions,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Capture loop settings for the demo binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Number of pictures to take, 0 to run until interrupted.
    pub count: u32,
    /// Delay between capture requests in milliseconds.
    pub interval_ms: u64,
    /// Directory finished stills are written to.
    pub directory: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            count: 3,
            interval_ms: 500,
            directory: PathBuf::from("captures"),
        }
    }
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.session.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{AspectRatio, Size};

    #[test]
    fn test_default_options_valid() {
        assert!(SessionOptions::default().validate().is_ok());
    }

    #[test]
    fn test_empty_ratio_list_invalid() {
        let options = SessionOptions::with_aspect_ratios([]);
        assert!(matches!(
            options.validate(),
            Err(ConfigError::NoAspectRatios)
        ));
    }

    #[test]
    fn test_zero_quality_invalid() {
        let options = SessionOptions {
            jpeg_quality: 0,
            ..Default::default()
        };
        assert!(matches!(
            options.validate(),
            Err(ConfigError::InvalidJpegQuality(0))
        ));
    }

    #[test]
    fn test_parse_full_file() {
        let config = FileConfig::from_toml(
            r#"
            [session]
            aspect_ratios = ["16:9", "4:3", "auto"]
            use_front_camera = true
            focus_gate = "require-success"
            rotation_source = "computed"
            jpeg_quality = 85
            size_policy = { kind = "threshold", preview = "1280x720", picture = "1920x1080" }

            [output]
            count = 0
            directory = "/tmp/shots"
            "#,
        )
        .unwrap();

        let session = &config.session;
        assert_eq!(
            session.aspect_ratios,
            vec![
                AspectMode::Fixed(AspectRatio::WIDE),
                AspectMode::Fixed(AspectRatio::STANDARD),
                AspectMode::Auto,
            ]
        );
        assert!(session.use_front_camera);
        assert!(!session.can_switch_camera);
        assert_eq!(session.focus_gate, FocusGate::RequireSuccess);
        assert_eq!(session.rotation_source, RotationSource::Computed);
        assert_eq!(session.jpeg_quality, 85);
        assert_eq!(
            session.size_policy,
            SizePolicy::Threshold {
                preview: Size::new(1280, 720),
                picture: Size::new(1920, 1080),
            }
        );
        assert_eq!(config.output.count, 0);
        assert_eq!(config.output.interval_ms, 500);
    }

    #[test]
    fn test_bad_ratio_rejected_at_parse() {
        let result = FileConfig::from_toml("[session]\naspect_ratios = [\"4:0\"]\n");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = FileConfig::from_toml("").unwrap();
        assert_eq!(config.session, SessionOptions::default());
    }
}
