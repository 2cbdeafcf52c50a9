//! Library exports for the examscriber annotation engine.
//!
//! Exposes the stroke model, the pointer-driven annotation surface, the undo
//! history and both export pipelines so that a document viewer can embed the
//! engine and the command-line tool can drive exports headlessly.

pub mod config;
pub mod draw;
pub mod export;
pub mod history;
pub mod input;

pub use config::Config;
pub use draw::{Annotation, PageAnnotations, PageInfo, PageInfoMap, Stroke};
pub use export::{DocumentExporter, ExportError, RasterExporter, VectorExporter};
pub use history::AnnotationStore;
pub use input::{AnnotationSurface, Tool};
