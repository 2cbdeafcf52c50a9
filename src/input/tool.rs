//! Drawing tool selection.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Highest opacity a highlighter stroke is ever drawn or exported with.
pub const HIGHLIGHTER_MAX_OPACITY: f64 = 0.4;

/// Drawing tool selection.
///
/// The tool decides how a stroke composites with what is already on the page.
/// Every consumer (live render, vector export, raster layer) matches on it
/// exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    /// Opaque ink drawn over existing content
    #[default]
    Pen,
    /// Translucent multiply-blended marker
    Highlighter,
    /// Removes previously drawn ink
    Eraser,
}

impl Tool {
    /// Opacity actually used for a stroke drawn with this tool.
    ///
    /// Highlighter opacity is capped at [`HIGHLIGHTER_MAX_OPACITY`]; the eraser
    /// always removes fully.
    pub fn effective_opacity(self, configured: f64) -> f64 {
        let opacity = configured.clamp(0.0, 1.0);
        match self {
            Tool::Pen => opacity,
            Tool::Highlighter => opacity.min(HIGHLIGHTER_MAX_OPACITY),
            Tool::Eraser => 1.0,
        }
    }

    /// Lowercase name as used in config files and stroke JSON.
    pub fn as_str(self) -> &'static str {
        match self {
            Tool::Pen => "pen",
            Tool::Highlighter => "highlighter",
            Tool::Eraser => "eraser",
        }
    }
}

impl std::str::FromStr for Tool {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "pen" => Ok(Tool::Pen),
            "highlighter" => Ok(Tool::Highlighter),
            "eraser" => Ok(Tool::Eraser),
            other => Err(format!("unknown tool '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn highlighter_opacity_is_capped() {
        assert_eq!(Tool::Highlighter.effective_opacity(1.0), HIGHLIGHTER_MAX_OPACITY);
        assert_eq!(Tool::Highlighter.effective_opacity(0.2), 0.2);
        assert_eq!(Tool::Pen.effective_opacity(0.7), 0.7);
        assert_eq!(Tool::Eraser.effective_opacity(0.1), 1.0);
    }

    #[test]
    fn parses_tool_names() {
        assert_eq!("Highlighter".parse::<Tool>(), Ok(Tool::Highlighter));
        assert!("marker".parse::<Tool>().is_err());
    }
}
