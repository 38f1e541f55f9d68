//! TOML configuration.
//!
//! Every field has a default, so a missing file or a partial file is valid.
//! The file is looked up from an explicit path, then `PLANEFIT_CONFIG`, then
//! the platform config directory.

use crate::raster::{BoundaryStyle, MarkerStyle};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const CONFIG_ENV_VAR: &str = "PLANEFIT_CONFIG";

/// Errors that may occur while loading, saving or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config at {path}: {source}")]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config to TOML at {path}: {source}")]
    SerializeToml {
        path: PathBuf,
        source: toml::ser::Error,
    },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub canvas: CanvasConfig,
    pub boundary: BoundaryConfig,
    pub training: TrainingConfig,
    pub marker: MarkerConfig,
}

/// Pixel size of the drawing surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 800,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundaryConfig {
    /// Grid samples per axis.
    pub resolution: u32,
    /// Overlay opacity, 0-255.
    pub alpha: u8,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            resolution: crate::raster::DEFAULT_RESOLUTION,
            alpha: crate::raster::DEFAULT_OVERLAY_ALPHA,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Used when the epoch field is empty or not a positive number.
    pub default_epochs: u32,
    /// Redraw the boundary every this many epochs.
    pub update_interval: u32,
    pub hidden_units: usize,
    pub learning_rate: f64,
    pub batch_size: usize,
    pub shuffle: bool,
    /// Fixed seed for weight init and shuffling; random when absent.
    pub seed: Option<u64>,
    /// Fewest points that may be trained on.
    pub min_points: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            default_epochs: 1000,
            update_interval: 10,
            hidden_units: 4,
            learning_rate: 0.001,
            batch_size: 32,
            shuffle: true,
            seed: None,
            min_points: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerConfig {
    pub radius: f32,
    pub border: f32,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        let marker = MarkerStyle::default();
        Self {
            radius: marker.radius,
            border: marker.border,
        }
    }
}

impl AppConfig {
    /// Rejects values that would make training or rendering meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.canvas.width == 0 || self.canvas.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "canvas must be non-empty, got {}x{}",
                self.canvas.width, self.canvas.height
            )));
        }
        if self.boundary.resolution == 0 {
            return Err(ConfigError::Invalid("boundary.resolution must be positive".into()));
        }
        let t = &self.training;
        if t.default_epochs == 0 {
            return Err(ConfigError::Invalid("training.default_epochs must be positive".into()));
        }
        if t.update_interval == 0 {
            return Err(ConfigError::Invalid("training.update_interval must be positive".into()));
        }
        if t.hidden_units == 0 {
            return Err(ConfigError::Invalid("training.hidden_units must be positive".into()));
        }
        if t.batch_size == 0 {
            return Err(ConfigError::Invalid("training.batch_size must be positive".into()));
        }
        if !(t.learning_rate.is_finite() && t.learning_rate > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "training.learning_rate must be a positive number, got {}",
                t.learning_rate
            )));
        }
        if self.marker.border < 0.0 || self.marker.radius < self.marker.border {
            return Err(ConfigError::Invalid(
                "marker.radius must be at least marker.border".into(),
            ));
        }
        Ok(())
    }

    pub fn boundary_style(&self) -> BoundaryStyle {
        BoundaryStyle {
            resolution: self.boundary.resolution,
            alpha: self.boundary.alpha,
            marker: self.marker_style(),
            ..BoundaryStyle::default()
        }
    }

    pub fn marker_style(&self) -> MarkerStyle {
        MarkerStyle {
            radius: self.marker.radius,
            border: self.marker.border,
            ..MarkerStyle::default()
        }
    }

    /// Loads and validates `path`, returning defaults if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: AppConfig = toml::from_str(&text).map_err(|source| ConfigError::ParseToml {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        tracing::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Resolves the config location and loads it.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match config_path(explicit) {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let text = toml::to_string_pretty(self).map_err(|source| ConfigError::SerializeToml {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, text).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Explicit path, then `PLANEFIT_CONFIG`, then `<config dir>/planefit/config.toml`.
pub fn config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(path) = std::env::var_os(CONFIG_ENV_VAR).filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(path));
    }
    directories::ProjectDirs::from("", "", "planefit")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = AppConfig::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.boundary.resolution, 200);
        assert_eq!(config.boundary.alpha, 50);
        assert_eq!(config.training.default_epochs, 1000);
        assert_eq!(config.training.update_interval, 10);
        assert_eq!(config.training.min_points, 2);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(
            &path,
            "[canvas]\nwidth = 640\n\n[training]\nseed = 7\nhidden_units = 8\n",
        )
        .unwrap();
        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.canvas.width, 640);
        assert_eq!(config.canvas.height, 800);
        assert_eq!(config.training.seed, Some(7));
        assert_eq!(config.training.hidden_units, 8);
        assert_eq!(config.training.batch_size, 32);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);
        let mut config = AppConfig::default();
        config.training.seed = Some(99);
        config.boundary.resolution = 50;
        config.save_to(&path).unwrap();
        assert_eq!(AppConfig::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[boundary]\nresolution = 0\n").unwrap();
        assert!(matches!(AppConfig::load_from(&path), Err(ConfigError::Invalid(_))));

        let mut config = AppConfig::default();
        config.canvas.height = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = AppConfig::default();
        config.training.learning_rate = -1.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_malformed_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[training\n").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ParseToml { .. })
        ));
    }

    #[test]
    fn test_explicit_path_wins() {
        let path = PathBuf::from("/tmp/custom.toml");
        assert_eq!(config_path(Some(&path)), Some(path));
    }

    #[test]
    fn test_boundary_style_uses_config() {
        let mut config = AppConfig::default();
        config.boundary.alpha = 80;
        config.marker.radius = 6.0;
        let style = config.boundary_style();
        assert_eq!(style.alpha, 80);
        assert_eq!(style.resolution, 200);
        assert_eq!(style.marker.radius, 6.0);
        assert_eq!(style.positive, [255, 0, 0]);
    }
}
