//! Configuration loading and discovery for `sheetsmith.toml`
//!
//! Provides functions to find, load, and merge configuration.

use super::schema::StudioConfig;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the configuration file
pub const CONFIG_FILE: &str = "sheetsmith.toml";

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("Failed to parse sheetsmith.toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error
    #[error("Config validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
}

/// CLI arguments that can override config values
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub padding: Option<u32>,
    pub margin: Option<u32>,
    pub channel_tolerance: Option<f32>,
    pub fps: Option<u32>,
    pub background: Option<String>,
    pub transparent_key: Option<String>,
    pub tolerance: Option<f32>,
}

/// Find sheetsmith.toml by walking up from the current working directory.
///
/// Search order:
/// 1. Walk up from current directory looking for sheetsmith.toml
/// 2. Check XDG_CONFIG_HOME/sheetsmith/sheetsmith.toml (or ~/.config/sheetsmith/sheetsmith.toml)
pub fn find_config() -> Option<PathBuf> {
    if let Ok(cwd) = env::current_dir() {
        if let Some(path) = find_config_from(cwd) {
            return Some(path);
        }
    }

    find_xdg_config()
}

/// Find sheetsmith.toml in the XDG config directory.
pub fn find_xdg_config() -> Option<PathBuf> {
    let xdg_config = env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|_| env::var("HOME").map(|h| PathBuf::from(h).join(".config")))
        .ok()?;

    let config_path = xdg_config.join("sheetsmith").join(CONFIG_FILE);
    config_path.exists().then_some(config_path)
}

/// Find sheetsmith.toml by walking up from a specific directory.
pub fn find_config_from(start: PathBuf) -> Option<PathBuf> {
    let mut current = start;

    loop {
        let config_path = current.join(CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Load configuration from a file, or discover one.
///
/// With no explicit path and nothing discovered, returns the defaults.
pub fn load_config(path: Option<&Path>) -> Result<StudioConfig, ConfigError> {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config(),
    };

    match config_path {
        Some(p) => load_config_file(&p),
        None => Ok(StudioConfig::default()),
    }
}

/// Load configuration from a specific file path.
fn load_config_file(path: &Path) -> Result<StudioConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Parse and validate configuration text.
pub fn parse_config(contents: &str) -> Result<StudioConfig, ConfigError> {
    let config: StudioConfig = toml::from_str(contents)?;

    let errors = config.validate();
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()));
    }

    Ok(config)
}

/// Merge CLI overrides into a configuration.
///
/// CLI arguments take precedence over config file values.
pub fn merge_cli_overrides(config: &mut StudioConfig, overrides: &CliOverrides) {
    if let Some(padding) = overrides.padding {
        config.repack.padding = padding;
    }
    if let Some(margin) = overrides.margin {
        config.repack.margin = margin;
    }
    if let Some(tolerance) = overrides.channel_tolerance {
        config.repack.channel_tolerance = tolerance;
    }
    if let Some(fps) = overrides.fps {
        config.playback.fps = fps;
    }
    if let Some(ref background) = overrides.background {
        config.export.background = Some(background.clone());
    }
    if let Some(ref key) = overrides.transparent_key {
        config.export.transparent_key = Some(key.clone());
    }
    if let Some(tolerance) = overrides.tolerance {
        config.export.tolerance = tolerance;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_find_config_in_current_dir() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = temp.path().join(CONFIG_FILE);
        File::create(&config_path)
            .expect("should create config file")
            .write_all(b"[repack]\npadding = 3")
            .expect("should write config content");

        let found = find_config_from(temp.path().to_path_buf());
        assert_eq!(found, Some(config_path));
    }

    #[test]
    fn test_find_config_in_parent_dir() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = temp.path().join(CONFIG_FILE);
        File::create(&config_path).expect("should create config file");

        let subdir = temp.path().join("art").join("heroes");
        fs::create_dir_all(&subdir).expect("should create subdirectories");

        let found = find_config_from(subdir);
        assert_eq!(found, Some(config_path));
    }

    #[test]
    fn test_load_explicit_path() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = temp.path().join("custom.toml");
        fs::write(&config_path, "[playback]\nfps = 12\nskip_deleted = false\n").expect("should write config");

        let config = load_config(Some(&config_path)).expect("should load config");
        assert_eq!(config.playback.fps, 12);
        assert!(!config.playback.skip_deleted);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let temp = TempDir::new().expect("should create temp dir");
        let err = load_config(Some(&temp.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_parse_rejects_invalid_values() {
        let err = parse_config("[playback]\nfps = 500\n").unwrap_err();
        match err {
            ConfigError::Validation(messages) => {
                assert_eq!(messages.len(), 1);
                assert!(messages[0].contains("playback.fps"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_bad_toml() {
        assert!(matches!(parse_config("[repack\n"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_cli_overrides_win() {
        let mut config = parse_config("[repack]\npadding = 1\n").unwrap();
        let overrides = CliOverrides {
            padding: Some(8),
            transparent_key: Some("#0F0".to_string()),
            ..Default::default()
        };
        merge_cli_overrides(&mut config, &overrides);
        assert_eq!(config.repack.padding, 8);
        assert_eq!(config.export.transparent_key.as_deref(), Some("#0F0"));
        assert_eq!(config.repack.margin, 4);
    }
}
