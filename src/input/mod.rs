//! Input handling and tool state machine.
//!
//! This module translates pointer events from the host into document-space
//! strokes. It holds the active toolbar settings, maps device coordinates onto
//! the page, and drives the `Idle -> Drawing -> Idle` pointer lifecycle.

pub mod events;
pub mod geometry;
pub mod settings;
pub mod surface;
pub mod tool;

// Re-export commonly used types at module level
pub use events::{PointerButton, PointerEvent};
pub use geometry::{SurfaceGeometry, SurfaceRect};
pub use settings::ToolSettings;
pub use surface::{AnnotationSurface, PointerState, StrokeSink, SurfaceError};
pub use tool::{HIGHLIGHTER_MAX_OPACITY, Tool};
