//! Annotation data model and rendering primitives (Cairo-based).
//!
//! This module defines the core drawing types used for page annotation:
//! - [`Color`]: RGBA color representation with hex parsing
//! - [`Point`], [`Stroke`], [`Annotation`]: the vector marks users draw
//! - [`PageInfo`] and the per-page maps
//! - Stroke smoothing and Cairo rendering functions

pub mod color;
pub mod page;
pub mod path;
pub mod render;
pub mod stroke;

// Re-export commonly used types at module level
pub use color::Color;
pub use page::{PageAnnotations, PageInfo, PageInfoMap};
pub use path::{PathSegment, WeightedSegment, pressure_width, smoothed_segments};
pub use render::{render_annotation, render_page, render_stroke};
pub use stroke::{Annotation, DEFAULT_PRESSURE, Point, Stroke};

pub use color::{BLACK, BLUE, GREEN, ORANGE, PINK, RED, WHITE, YELLOW};
