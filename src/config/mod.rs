//! Configuration file support for examscriber.
//!
//! This module handles loading and validating user settings from the configuration file
//! located at `~/.config/examscriber/config.toml`. Settings include toolbar defaults,
//! history depth and export tuning.
//!
//! If no config file exists, sensible defaults are used automatically.

pub mod enums;
pub mod types;

// Re-export commonly used types at module level
pub use enums::{ColorSpec, ExportPipeline};
pub use types::{DrawingConfig, ExportConfig, HistoryConfig};

use anyhow::{Context, Result};
use log::{debug, info};
use schemars::{JsonSchema, Schema, schema_for};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure containing all user settings.
///
/// This is the root configuration type that gets deserialized from the TOML file.
/// All fields have sensible defaults and will use those if not specified in the config file.
///
/// # Example TOML
/// ```toml
/// [drawing]
/// default_tool = "pen"
/// default_color = "red"
/// default_size = 4.0
///
/// [history]
/// max_depth = 100
///
/// [export]
/// pipeline = "raster"
/// raster_scale = 2.0
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default, JsonSchema)]
pub struct Config {
    /// Toolbar defaults (tool, color, size, opacity)
    #[serde(default)]
    pub drawing: DrawingConfig,

    /// Undo/redo limits
    #[serde(default)]
    pub history: HistoryConfig,

    /// Exporter selection and tuning
    #[serde(default)]
    pub export: ExportConfig,
}

impl Config {
    /// Validates and clamps all configuration values to acceptable ranges.
    ///
    /// Invalid values are clamped to the nearest valid value and a warning is logged.
    ///
    /// Validated ranges:
    /// - `default_size`: 0.5 - 50.0
    /// - `default_opacity`: 0.0 - 1.0
    /// - `raster_scale`: 0.5 - 4.0
    ///
    /// An unrecognised `default_color` falls back to red.
    pub fn validate_and_clamp(&mut self) {
        // Size: 0.5 - 50.0
        if !(0.5..=50.0).contains(&self.drawing.default_size) {
            log::warn!(
                "Invalid default_size {:.1}, clamping to 0.5-50.0 range",
                self.drawing.default_size
            );
            self.drawing.default_size = clamp_or(self.drawing.default_size, 0.5, 50.0, 4.0);
        }

        // Opacity: 0.0 - 1.0
        if !(0.0..=1.0).contains(&self.drawing.default_opacity) {
            log::warn!(
                "Invalid default_opacity {:.2}, clamping to 0.0-1.0 range",
                self.drawing.default_opacity
            );
            self.drawing.default_opacity = clamp_or(self.drawing.default_opacity, 0.0, 1.0, 1.0);
        }

        // Raster scale: 0.5 - 4.0
        if !(0.5..=4.0).contains(&self.export.raster_scale) {
            log::warn!(
                "Invalid raster_scale {:.2}, clamping to 0.5-4.0 range",
                self.export.raster_scale
            );
            self.export.raster_scale = clamp_or(self.export.raster_scale, 0.5, 4.0, 2.0);
        }

        if self.drawing.default_color.resolve().is_none() {
            log::warn!(
                "Invalid default_color {:?}, falling back to 'red'",
                self.drawing.default_color
            );
            self.drawing.default_color = ColorSpec::Name("red".to_string());
        }
    }

    /// Returns the path to the configuration file.
    ///
    /// The config file is located at `~/.config/examscriber/config.toml`.
    ///
    /// # Errors
    /// Returns an error if the config directory cannot be determined (e.g., HOME not set).
    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not find config directory")?
            .join("examscriber");

        Ok(config_dir.join("config.toml"))
    }

    /// Loads configuration from the default location, or returns defaults if not found.
    ///
    /// # Errors
    /// Returns an error if:
    /// - The config directory path cannot be determined
    /// - The file exists but cannot be read
    /// - The file exists but contains invalid TOML syntax
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    /// Loads configuration from `config_path`, or returns defaults if the file
    /// does not exist. All loaded values are validated and clamped.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            info!("Config file not found, using defaults");
            debug!("Expected config at: {}", config_path.display());
            return Ok(Self::default());
        }

        let config_str = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config from {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config from {}", config_path.display()))?;

        // Validate and clamp values to acceptable ranges
        config.validate_and_clamp();

        info!("Loaded config from {}", config_path.display());
        debug!("Config: {:?}", config);

        Ok(config)
    }

    /// Saves the current configuration to `config_path`, creating the parent
    /// directory if it doesn't exist.
    ///
    /// # Errors
    /// Returns an error if:
    /// - The config directory cannot be created
    /// - The config cannot be serialized to TOML
    /// - The file cannot be written
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let config_str = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(config_path, config_str)
            .with_context(|| format!("Failed to write config to {}", config_path.display()))?;

        info!("Saved config to {}", config_path.display());
        Ok(())
    }

    /// Writes the documented example config to the user's config directory.
    ///
    /// # Errors
    /// Returns an error if a config file already exists at the target path or
    /// the file cannot be written.
    pub fn create_default_file() -> Result<PathBuf> {
        let config_path = Self::get_config_path()?;

        if config_path.exists() {
            return Err(anyhow::anyhow!(
                "Config file already exists at {}",
                config_path.display()
            ));
        }

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let default_config = include_str!("../../config.example.toml");
        fs::write(&config_path, default_config)?;

        info!("Created default config at {}", config_path.display());
        Ok(config_path)
    }

    /// JSON schema describing the config file, for editor tooling.
    pub fn json_schema() -> Schema {
        schema_for!(Config)
    }
}

/// Clamps `value`, mapping NaN to `fallback`.
fn clamp_or(value: f64, min: f64, max: f64, fallback: f64) -> f64 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(min, max)
    }
}
