//! Burning annotations into the source document.
//!
//! Two interchangeable pipelines implement [`DocumentExporter`]:
//! - [`VectorExporter`]: native line operators appended to each page's content
//! - [`RasterExporter`]: an SVG layer rasterized on a background worker and
//!   embedded as a full-page image overlay
//!
//! Both take the original bytes by value and hand back the mutated document.

pub mod document;
pub mod pipeline;
pub mod raster;
pub mod svg;
pub mod vector;
pub mod worker;

mod types;

pub use pipeline::RasterExporter;
pub use svg::layer_svg;
pub use types::{ExportError, PageFailure, ProgressCallback};
pub use vector::VectorExporter;
pub use worker::{
    CompleteMessage, ErrorMessage, ProcessMessage, ProgressMessage, RasterOptions, RasterWorker,
    WorkerRequest, WorkerResponse,
};

use crate::config::{ExportConfig, ExportPipeline};
use crate::draw::{PageAnnotations, PageInfoMap};
use async_trait::async_trait;

/// Entry point shared by both export pipelines.
#[async_trait]
pub trait DocumentExporter: Send + Sync {
    /// Returns `source` with every drawable stroke in `annotations` burned in.
    ///
    /// `progress` receives monotonically increasing values in `0.0..=1.0`,
    /// ending with exactly `1.0` on success. Pages missing from `pages` or from
    /// the document are skipped with a warning.
    async fn export(
        &self,
        source: Vec<u8>,
        pages: &PageInfoMap,
        annotations: &PageAnnotations,
        progress: Option<ProgressCallback>,
    ) -> Result<Vec<u8>, ExportError>;
}

/// Builds the exporter selected by `config.pipeline`.
///
/// The raster pipeline spawns its worker on `runtime_handle`.
pub fn exporter_for(
    config: &ExportConfig,
    runtime_handle: &tokio::runtime::Handle,
) -> Box<dyn DocumentExporter> {
    match config.pipeline {
        ExportPipeline::Vector => Box::new(VectorExporter::new(config.compress_streams)),
        ExportPipeline::Raster => Box::new(RasterExporter::new(
            runtime_handle,
            RasterOptions {
                scale: config.raster_scale,
                compress_streams: config.compress_streams,
            },
        )),
    }
}

/// Forwards progress to an optional callback, clamped and never decreasing.
pub(crate) struct ProgressReporter {
    callback: Option<ProgressCallback>,
    last: f64,
}

impl ProgressReporter {
    pub(crate) fn new(callback: Option<ProgressCallback>) -> Self {
        Self {
            callback,
            last: 0.0,
        }
    }

    pub(crate) fn report(&mut self, value: f64) {
        let value = value.clamp(0.0, 1.0).max(self.last);
        self.last = value;
        if let Some(callback) = self.callback.as_mut() {
            callback(value);
        }
    }

    /// Reports a position inside the `[start, end]` band.
    pub(crate) fn report_band(&mut self, start: f64, end: f64, done: usize, total: usize) {
        let fraction = if total == 0 {
            1.0
        } else {
            done as f64 / total as f64
        };
        self.report(start + (end - start) * fraction);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recording() -> (ProgressCallback, Arc<Mutex<Vec<f64>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        (Box::new(move |v| sink.lock().unwrap().push(v)), seen)
    }

    #[test]
    fn reporter_never_goes_backwards() {
        let (callback, seen) = recording();
        let mut reporter = ProgressReporter::new(Some(callback));
        reporter.report(0.5);
        reporter.report(0.2);
        reporter.report(7.0);
        assert_eq!(*seen.lock().unwrap(), vec![0.5, 0.5, 1.0]);
    }

    #[test]
    fn band_with_no_work_jumps_to_its_end() {
        let (callback, seen) = recording();
        let mut reporter = ProgressReporter::new(Some(callback));
        reporter.report_band(0.1, 0.9, 0, 0);
        reporter.report_band(0.1, 0.9, 3, 4);
        assert_eq!(*seen.lock().unwrap(), vec![0.9, 0.9]);
    }
}
