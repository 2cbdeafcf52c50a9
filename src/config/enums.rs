//! Configuration enum types.

use crate::draw::{Color, RED, color::name_to_color};
use log::warn;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Which exporter burns annotations into the document.
#[derive(
    Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, JsonSchema, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ExportPipeline {
    /// Native line-drawing operators appended to each page
    #[default]
    Vector,
    /// A flattened image overlay rendered on a background worker
    Raster,
}

impl ExportPipeline {
    pub fn as_str(self) -> &'static str {
        match self {
            ExportPipeline::Vector => "vector",
            ExportPipeline::Raster => "raster",
        }
    }
}

/// Color specification - a named color, a hex string or RGB values.
///
/// # Examples
/// ```toml
/// # Named color
/// default_color = "red"
///
/// # Hex color
/// default_color = "#1e40af"
///
/// # Custom RGB color (0-255 per component)
/// default_color = [255, 128, 0]  # Orange
/// ```
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
#[serde(untagged)]
pub enum ColorSpec {
    /// Named color (red, green, blue, yellow, orange, pink, white, black) or `#rrggbb`
    Name(String),
    /// RGB color as [red, green, blue] where each component is 0-255
    Rgb([u8; 3]),
}

impl ColorSpec {
    /// Converts the color specification to a [`Color`] struct.
    ///
    /// Names are looked up first, then parsed as hex. Anything unrecognised
    /// falls back to red with a warning.
    pub fn to_color(&self) -> Color {
        self.resolve().unwrap_or_else(|| {
            warn!("Unknown color {:?}, using red", self);
            RED
        })
    }

    /// The color this value names, if it names one.
    pub fn resolve(&self) -> Option<Color> {
        match self {
            ColorSpec::Name(name) => name_to_color(name).or_else(|| Color::from_hex(name)),
            ColorSpec::Rgb([r, g, b]) => Some(Color {
                r: *r as f64 / 255.0,
                g: *g as f64 / 255.0,
                b: *b as f64 / 255.0,
                a: 1.0,
            }),
        }
    }
}
