//! Error and callback types shared by the exporters.

use std::fmt;
use thiserror::Error;

/// Receives export progress in `0.0..=1.0`.
pub type ProgressCallback = Box<dyn FnMut(f64) + Send>;

/// One page the raster worker could not process.
#[derive(Debug, Clone, PartialEq)]
pub struct PageFailure {
    pub page_number: u32,
    pub error: String,
}

impl fmt::Display for PageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page {}: {}", self.page_number, self.error)
    }
}

/// Errors that can occur while exporting annotations.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to decode document: {0}")]
    Decode(#[from] lopdf::Error),

    #[error("Failed to encode document: {0}")]
    Encode(String),

    #[error("Failed to rasterize annotation layer: {0}")]
    Raster(String),

    #[error("Export failed on {} page(s): {}", .0.len(), join_failures(.0))]
    PageFailures(Vec<PageFailure>),

    #[error("Raster worker is not running")]
    WorkerUnavailable,
}

fn join_failures(failures: &[PageFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
