//! Configuration type definitions.

use super::enums::{ColorSpec, ExportPipeline};
use crate::input::Tool;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Drawing-related settings.
///
/// Controls the toolbar state when an authoring session starts. The host UI
/// changes these at runtime through [`ToolSettings`](crate::input::ToolSettings).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DrawingConfig {
    /// Tool selected at startup: pen, highlighter or eraser
    #[serde(default)]
    pub default_tool: Tool,

    /// Default stroke color - a named color (red, green, blue, yellow, orange, pink, white, black),
    /// a `#rrggbb` string, or an RGB array like `[255, 0, 0]` for red
    #[serde(default = "default_color")]
    pub default_color: ColorSpec,

    /// Default stroke size in document units (valid range: 0.5 - 50.0)
    #[serde(default = "default_size")]
    pub default_size: f64,

    /// Default stroke opacity (valid range: 0.0 - 1.0)
    /// The highlighter caps this at 0.4 regardless
    #[serde(default = "default_opacity")]
    pub default_opacity: f64,
}

impl Default for DrawingConfig {
    fn default() -> Self {
        Self {
            default_tool: Tool::default(),
            default_color: default_color(),
            default_size: default_size(),
            default_opacity: default_opacity(),
        }
    }
}

/// Undo/redo settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default, JsonSchema)]
pub struct HistoryConfig {
    /// Maximum undo steps kept per page; 0 keeps every step
    #[serde(default)]
    pub max_depth: usize,
}

/// Export settings.
///
/// Picks the exporter and tunes the raster pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExportConfig {
    /// Exporter used when the CLI does not override it
    #[serde(default)]
    pub pipeline: ExportPipeline,

    /// Raster pixels per document unit (valid range: 0.5 - 4.0)
    #[serde(default = "default_raster_scale")]
    pub raster_scale: f64,

    /// Deflate generated content streams
    #[serde(default)]
    pub compress_streams: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            pipeline: ExportPipeline::default(),
            raster_scale: default_raster_scale(),
            compress_streams: false,
        }
    }
}

// =============================================================================
// Default value functions
// =============================================================================

fn default_color() -> ColorSpec {
    ColorSpec::Name("red".to_string())
}

fn default_size() -> f64 {
    4.0
}

fn default_opacity() -> f64 {
    1.0
}

fn default_raster_scale() -> f64 {
    2.0
}
