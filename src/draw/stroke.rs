//! Stroke and annotation definitions.

use crate::input::Tool;
use serde::{Deserialize, Serialize};

/// Pressure assumed when the input device does not report any.
pub const DEFAULT_PRESSURE: f64 = 0.5;

/// A point in document space (page units, not device pixels).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    /// Device pressure in 0.0..=1.0, absent for mice and other pressure-less devices
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure: Option<f64>,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            pressure: None,
        }
    }

    pub fn with_pressure(x: f64, y: f64, pressure: f64) -> Self {
        Self {
            x,
            y,
            pressure: Some(pressure),
        }
    }

    /// Reported pressure clamped to 0.0..=1.0, or [`DEFAULT_PRESSURE`].
    pub fn pressure_or_default(&self) -> f64 {
        self.pressure
            .map(|p| p.clamp(0.0, 1.0))
            .unwrap_or(DEFAULT_PRESSURE)
    }
}

/// A freehand mark drawn with one tool, color, size and opacity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub id: String,
    pub tool: Tool,
    /// `#rrggbb`
    pub color: String,
    /// Base line width in document units
    pub size: f64,
    pub opacity: f64,
    pub points: Vec<Point>,
}

impl Stroke {
    /// Starts a new stroke with a fresh identifier.
    pub fn begin(tool: Tool, color: impl Into<String>, size: f64, opacity: f64, first: Point) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            tool,
            color: color.into(),
            size,
            opacity: opacity.clamp(0.0, 1.0),
            points: vec![first],
        }
    }

    /// Strokes with fewer than two points are never committed or drawn.
    pub fn is_drawable(&self) -> bool {
        self.points.len() >= 2
    }
}

/// A persisted mark on a page.
///
/// Only strokes exist today; consumers match exhaustively so new kinds are a
/// compile error rather than a silent skip.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Annotation {
    Stroke(Stroke),
}

impl Annotation {
    pub fn id(&self) -> &str {
        match self {
            Annotation::Stroke(stroke) => &stroke.id,
        }
    }

    pub fn as_stroke(&self) -> Option<&Stroke> {
        match self {
            Annotation::Stroke(stroke) => Some(stroke),
        }
    }
}

impl From<Stroke> for Annotation {
    fn from(stroke: Stroke) -> Self {
        Annotation::Stroke(stroke)
    }
}
