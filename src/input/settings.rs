//! Active toolbar configuration.

use super::tool::Tool;
use crate::config::DrawingConfig;

/// Tool, color, size and opacity applied to the next stroke.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSettings {
    pub tool: Tool,
    /// `#rrggbb`
    pub color: String,
    /// Base line width in document units
    pub size: f64,
    pub opacity: f64,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self::from_config(&DrawingConfig::default())
    }
}

impl ToolSettings {
    /// Builds the initial toolbar state from the `[drawing]` config section.
    pub fn from_config(config: &DrawingConfig) -> Self {
        Self {
            tool: config.default_tool,
            color: config.default_color.to_color().to_hex(),
            size: config.default_size,
            opacity: config.default_opacity,
        }
    }
}
