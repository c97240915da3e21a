//! Configuration schema types for `sheetsmith.toml`
//!
//! Every section is optional; missing keys fall back to the defaults below.

use serde::{Deserialize, Serialize};

use crate::background::{BackgroundClassifier, DEFAULT_CHANNEL_TOLERANCE};
use crate::bounds::DEFAULT_MARGIN;
use crate::color::{parse_color, ColorError};
use crate::export::ExportOptions;
use crate::playback::{Playback, DEFAULT_FPS, MAX_FPS};
use crate::repack::{RepackOptions, DEFAULT_PADDING};
use crate::surface::TRANSPARENT;

/// Smart-crop repack settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepackConfig {
    /// Space added on each side of the largest content box
    #[serde(default = "default_padding")]
    pub padding: u32,
    /// Outward margin around each detected content box
    #[serde(default = "default_margin")]
    pub margin: u32,
    /// Background distance threshold in 0-255 channel units
    #[serde(default = "default_channel_tolerance")]
    pub channel_tolerance: f32,
}

impl Default for RepackConfig {
    fn default() -> Self {
        Self {
            padding: default_padding(),
            margin: default_margin(),
            channel_tolerance: default_channel_tolerance(),
        }
    }
}

fn default_padding() -> u32 {
    DEFAULT_PADDING
}

fn default_margin() -> u32 {
    DEFAULT_MARGIN
}

fn default_channel_tolerance() -> f32 {
    DEFAULT_CHANNEL_TOLERANCE
}

/// Live preview settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewConfig {
    /// Color masked to transparency in previews
    #[serde(default = "default_key_color")]
    pub key_color: String,
    /// Masking tolerance, percent of the RGB cube diagonal
    #[serde(default = "default_tolerance")]
    pub tolerance: f32,
    /// Pixel stride for preview-only bounds scans
    #[serde(default = "default_stride")]
    pub stride: u32,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            key_color: default_key_color(),
            tolerance: default_tolerance(),
            stride: default_stride(),
        }
    }
}

fn default_key_color() -> String {
    "#FFFFFF".to_string()
}

fn default_tolerance() -> f32 {
    15.0
}

fn default_stride() -> u32 {
    2
}

/// Playback settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    #[serde(default = "default_fps")]
    pub fps: u32,
    /// Skip deleted frames while looping
    #[serde(default = "default_true")]
    pub skip_deleted: bool,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            skip_deleted: true,
        }
    }
}

fn default_fps() -> u32 {
    DEFAULT_FPS
}

fn default_true() -> bool {
    true
}

/// Export settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Fill color for the exported sheet (transparent when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    /// Color turned transparent in the exported sheet
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transparent_key: Option<String>,
    /// Tolerance for `transparent_key`, percent
    #[serde(default = "default_tolerance")]
    pub tolerance: f32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            background: None,
            transparent_key: None,
            tolerance: default_tolerance(),
        }
    }
}

/// Complete `sheetsmith.toml` configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudioConfig {
    #[serde(default)]
    pub repack: RepackConfig,
    #[serde(default)]
    pub preview: PreviewConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

/// A validation error in the configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "preview.key_color")
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sheetsmith.toml: '{}' {}", self.field, self.message)
    }
}

impl StudioConfig {
    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();
        let mut push = |field: &str, message: String| {
            errors.push(ConfigValidationError { field: field.to_string(), message });
        };

        if !self.repack.channel_tolerance.is_finite() || self.repack.channel_tolerance < 0.0 {
            push("repack.channel_tolerance", "must be a non-negative number".to_string());
        }
        if let Err(e) = parse_color(&self.preview.key_color) {
            push("preview.key_color", format!("is not a color: {}", e));
        }
        if !(0.0..=100.0).contains(&self.preview.tolerance) {
            push("preview.tolerance", "must be between 0 and 100".to_string());
        }
        if self.preview.stride == 0 {
            push("preview.stride", "must be a positive integer".to_string());
        }
        if self.playback.fps == 0 || self.playback.fps > MAX_FPS {
            push("playback.fps", format!("must be between 1 and {}", MAX_FPS));
        }
        if let Some(Err(e)) = self.export.background.as_deref().map(parse_color) {
            push("export.background", format!("is not a color: {}", e));
        }
        if let Some(Err(e)) = self.export.transparent_key.as_deref().map(parse_color) {
            push("export.transparent_key", format!("is not a color: {}", e));
        }
        if !(0.0..=100.0).contains(&self.export.tolerance) {
            push("export.tolerance", "must be between 0 and 100".to_string());
        }

        errors
    }

    /// Check if validation passed
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }

    pub fn repack_options(&self) -> RepackOptions {
        RepackOptions {
            padding: self.repack.padding,
            margin: self.repack.margin,
            channel_tolerance: self.repack.channel_tolerance,
        }
    }

    pub fn playback(&self) -> Playback {
        Playback::new(self.playback.fps).with_skip_deleted(self.playback.skip_deleted)
    }

    /// Classifier for live transparency preview.
    pub fn preview_mask(&self) -> Result<BackgroundClassifier, ColorError> {
        let key = parse_color(&self.preview.key_color)?;
        Ok(BackgroundClassifier::from_percent(key, self.preview.tolerance))
    }

    pub fn export_options(&self) -> Result<ExportOptions, ColorError> {
        let background = match &self.export.background {
            Some(color) => parse_color(color)?,
            None => TRANSPARENT,
        };
        let transparency = match &self.export.transparent_key {
            Some(color) => Some(BackgroundClassifier::from_percent(parse_color(color)?, self.export.tolerance)),
            None => None,
        };
        Ok(ExportOptions { background, transparency })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config: StudioConfig = toml::from_str("").unwrap();
        assert_eq!(config, StudioConfig::default());
        assert!(config.is_valid());
        assert_eq!(config.repack_options(), RepackOptions::default());
        assert_eq!(config.playback().fps(), DEFAULT_FPS);
    }

    #[test]
    fn test_export_tolerance_same_with_or_without_table() {
        let bare: StudioConfig = toml::from_str("").unwrap();
        let table: StudioConfig = toml::from_str("[export]\ntransparent_key = \"#FFFFFF\"\n").unwrap();
        assert_eq!(bare.export.tolerance, 15.0);
        assert_eq!(bare.export.tolerance, table.export.tolerance);
    }

    #[test]
    fn test_default_export_key_masks_near_white() {
        let mut config: StudioConfig = toml::from_str("").unwrap();
        config.export.transparent_key = Some("#FFFFFF".to_string());
        let classifier = config.export_options().unwrap().transparency.unwrap();
        assert!(classifier.matches(Rgba([250, 250, 248, 255])));
        assert!(!classifier.matches(Rgba([30, 30, 160, 255])));
    }

    #[test]
    fn test_partial_sections() {
        let config: StudioConfig = toml::from_str(
            r##"
            [repack]
            padding = 6

            [export]
            transparent_key = "#00FF00"
            tolerance = 20
            "##,
        )
        .unwrap();
        assert_eq!(config.repack.padding, 6);
        assert_eq!(config.repack.margin, DEFAULT_MARGIN);

        let options = config.export_options().unwrap();
        assert_eq!(options.background, TRANSPARENT);
        let classifier = options.transparency.unwrap();
        assert_eq!(classifier.reference(), Rgba([0, 255, 0, 255]));
    }

    #[test]
    fn test_validation_collects_all_errors() {
        let mut config = StudioConfig::default();
        config.preview.key_color = "#XYZ".to_string();
        config.preview.stride = 0;
        config.playback.fps = 0;
        config.export.tolerance = 150.0;

        let errors = config.validate();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec!["preview.key_color", "preview.stride", "playback.fps", "export.tolerance"]
        );
        assert!(errors[0].to_string().starts_with("sheetsmith.toml: 'preview.key_color'"));
    }

    #[test]
    fn test_preview_mask_from_key_color() {
        let mut config = StudioConfig::default();
        config.preview.key_color = "lime".to_string();
        let mask = config.preview_mask().unwrap();
        assert!(mask.matches(Rgba([5, 250, 5, 255])));
    }
}
