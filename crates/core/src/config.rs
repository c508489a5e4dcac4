//! Editor tunables and their on-disk store

use crate::annotation::TextSpec;
use crate::geometry::{Size, HANDLE_HIT_SLOP, HANDLE_SIZE, MINIMUM_ANNOTATION_SIZE};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Floor applied to every annotation after a mutation
    pub minimum_annotation_size: Size,
    pub handle_size: f32,
    pub handle_hit_slop: f32,
    /// Added to measured text when sizing a new text box
    pub placement_padding: Size,
    /// Longest side of a newly placed stamp; larger images are scaled down
    pub max_stamp_side: f32,
    pub min_font_size: f32,
    pub max_font_size: f32,
    /// Content and styling armed by a plain "add text" command
    pub default_text: TextSpec,
    pub zoom: f32,
    pub page_spacing: f32,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            minimum_annotation_size: MINIMUM_ANNOTATION_SIZE,
            handle_size: HANDLE_SIZE,
            handle_hit_slop: HANDLE_HIT_SLOP,
            placement_padding: Size::new(16.0, 12.0),
            max_stamp_side: 240.0,
            min_font_size: 8.0,
            max_font_size: 96.0,
            default_text: TextSpec::default(),
            zoom: 1.0,
            page_spacing: 16.0,
        }
    }
}

impl EditorConfig {
    /// `size` limited to the font range; never panics, even on a malformed range.
    pub fn clamp_font_size(&self, size: f32) -> f32 {
        size.max(self.min_font_size).min(self.max_font_size)
    }

    /// Reject settings the editor cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (min, max) = (self.min_font_size, self.max_font_size);
        if !min.is_finite() || !max.is_finite() || min <= 0.0 || min > max {
            return Err(ConfigError::Invalid(format!(
                "font size range {min}..={max} must be finite, positive and ordered"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unable to resolve local config directory")]
    NoConfigDirectory,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("unsupported config version {0}")]
    UnsupportedVersion(u32),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigEnvelope {
    version: u32,
    config: EditorConfig,
}

/// Reads and writes `config.json` under a root directory.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    root: PathBuf,
}

impl ConfigStore {
    pub fn from_default_project() -> Result<Self, ConfigError> {
        let dirs = ProjectDirs::from("dev", "Stampdesk", "Stampdesk")
            .ok_or(ConfigError::NoConfigDirectory)?;

        Ok(Self { root: dirs.config_dir().to_path_buf() })
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self) -> PathBuf {
        self.root.join("config.json")
    }

    /// Stored config, or defaults when none has been saved.
    pub fn load(&self) -> Result<EditorConfig, ConfigError> {
        load_file(&self.path())
    }

    pub fn save(&self, config: &EditorConfig) -> Result<(), ConfigError> {
        fs::create_dir_all(&self.root)?;

        let envelope = ConfigEnvelope { version: CONFIG_SCHEMA_VERSION, config: config.clone() };
        let bytes = serde_json::to_vec_pretty(&envelope)?;
        fs::write(self.path(), bytes)?;
        tracing::debug!(path = %self.path().display(), "saved editor config");
        Ok(())
    }
}

/// Load a config file written by [`ConfigStore::save`]; a missing file yields defaults.
pub fn load_file(path: &Path) -> Result<EditorConfig, ConfigError> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return Ok(EditorConfig::default());
    }

    let bytes = fs::read(path)?;
    let envelope: ConfigEnvelope = serde_json::from_slice(&bytes)?;
    if envelope.version != CONFIG_SCHEMA_VERSION {
        return Err(ConfigError::UnsupportedVersion(envelope.version));
    }
    envelope.config.validate()?;

    Ok(envelope.config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_round_trip() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let store = ConfigStore::with_root(temp.path());

        let config = EditorConfig { max_stamp_side: 320.0, zoom: 1.5, ..EditorConfig::default() };

        store.save(&config).expect("save should succeed");
        let loaded = store.load().expect("load should succeed");

        assert_eq!(loaded, config);
    }

    #[test]
    fn load_defaults_when_file_absent() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let store = ConfigStore::with_root(temp.path());

        let loaded = store.load().expect("load should succeed");
        assert_eq!(loaded, EditorConfig::default());
    }

    #[test]
    fn partial_config_fills_defaults() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let path = temp.path().join("config.json");
        fs::write(&path, r#"{"version":1,"config":{"max_font_size":72.0}}"#)
            .expect("write should succeed");

        let loaded = load_file(&path).expect("load should succeed");
        assert_eq!(loaded.max_font_size, 72.0);
        assert_eq!(loaded.min_font_size, 8.0);
    }

    #[test]
    fn rejects_unknown_version() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let path = temp.path().join("config.json");
        fs::write(&path, r#"{"version":9,"config":{}}"#).expect("write should succeed");

        let err = load_file(&path).expect_err("version 9 is unknown");
        assert!(matches!(err, ConfigError::UnsupportedVersion(9)));
    }

    #[test]
    fn rejects_inverted_font_range() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let path = temp.path().join("config.json");
        fs::write(&path, r#"{"version":1,"config":{"min_font_size":100.0}}"#)
            .expect("write should succeed");

        let err = load_file(&path).expect_err("min above max is unusable");
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn clamp_survives_malformed_range() {
        let config = EditorConfig { min_font_size: 100.0, ..EditorConfig::default() };
        assert_eq!(config.clamp_font_size(12.0), 96.0);

        let config = EditorConfig { max_font_size: f32::NAN, ..EditorConfig::default() };
        assert_eq!(config.clamp_font_size(4.0), 8.0);
    }

    #[test]
    fn font_size_is_clamped() {
        let config = EditorConfig::default();

        assert_eq!(config.clamp_font_size(200.0), 96.0);
        assert_eq!(config.clamp_font_size(1.0), 8.0);
        assert_eq!(config.clamp_font_size(12.0), 12.0);
    }
}
