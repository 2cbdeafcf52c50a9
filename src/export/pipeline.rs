//! Raster export: feeds pages through a [`RasterWorker`] one at a time.

use super::document;
use super::svg::layer_svg;
use super::worker::{
    PageJob, ProcessMessage, RasterOptions, RasterWorker, WorkerResponse, rasterize_page,
};
use super::{DocumentExporter, ExportError, PageFailure, ProgressCallback, ProgressReporter};
use crate::draw::{Annotation, PageAnnotations, PageInfoMap};
use async_trait::async_trait;
use log::{debug, info, warn};

const LOAD_DONE: f64 = 0.1;
const PAGES_DONE: f64 = 0.9;

/// Progress messages a page job emits before its terminal message.
const PAGE_STEPS: usize = 5;

/// Burns annotations in as one flattened image per page, rendered off the
/// calling task.
///
/// The document moves into the worker with each page and comes back with the
/// response, so no copy of it is ever made. Failed pages are collected and
/// reported together once every page has been attempted.
pub struct RasterExporter {
    runtime_handle: tokio::runtime::Handle,
    options: RasterOptions,
    page_job: PageJob,
}

impl RasterExporter {
    pub fn new(runtime_handle: &tokio::runtime::Handle, options: RasterOptions) -> Self {
        Self {
            runtime_handle: runtime_handle.clone(),
            options,
            page_job: rasterize_page,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_page_job(mut self, page_job: PageJob) -> Self {
        self.page_job = page_job;
        self
    }
}

#[async_trait]
impl DocumentExporter for RasterExporter {
    async fn export(
        &self,
        source: Vec<u8>,
        pages: &PageInfoMap,
        annotations: &PageAnnotations,
        progress: Option<ProgressCallback>,
    ) -> Result<Vec<u8>, ExportError> {
        let mut progress = ProgressReporter::new(progress);

        // A document that does not decode fails the export before any page is sent.
        let page_ids = document::load(&source)?.get_pages();
        let total_pages = page_ids.len() as u32;
        progress.report(LOAD_DONE);

        let mut jobs = Vec::new();
        for (&page_number, list) in annotations {
            if !list.iter().any(is_drawable) {
                continue;
            }
            match pages.get(&page_number) {
                Some(info) if page_ids.contains_key(&page_number) => {
                    jobs.push((page_number, layer_svg(info, list)));
                }
                _ => warn!(
                    "Skipping {} annotations for unknown page {}",
                    list.len(),
                    page_number
                ),
            }
        }
        info!(
            "Raster export: {} of {} pages carry annotations",
            jobs.len(),
            total_pages
        );

        let mut worker =
            RasterWorker::spawn_with_job(&self.runtime_handle, self.options, self.page_job);
        let mut current = source;
        let mut failures = Vec::new();
        let total_steps = jobs.len() * (PAGE_STEPS + 1);

        for (index, (page_number, vector_layer)) in jobs.into_iter().enumerate() {
            worker.send(ProcessMessage {
                page_bytes: current,
                vector_layer,
                page_number,
                total_pages,
            })?;

            let mut steps = 0;
            current = loop {
                match worker.recv().await {
                    Some(WorkerResponse::Progress(message)) => {
                        debug!("Page {}: {}", message.page_number, message.status);
                        steps = (steps + 1).min(PAGE_STEPS);
                        progress.report_band(
                            LOAD_DONE,
                            PAGES_DONE,
                            index * (PAGE_STEPS + 1) + steps,
                            total_steps,
                        );
                    }
                    Some(WorkerResponse::Complete(message)) => break message.page_bytes,
                    Some(WorkerResponse::Error(message)) => {
                        failures.push(PageFailure {
                            page_number: message.page_number,
                            error: message.error,
                        });
                        match message.page_bytes {
                            Some(original) => break original,
                            // The document went down with the page job.
                            None => return Err(ExportError::PageFailures(failures)),
                        }
                    }
                    None => return Err(ExportError::WorkerUnavailable),
                }
            };
            progress.report_band(
                LOAD_DONE,
                PAGES_DONE,
                (index + 1) * (PAGE_STEPS + 1),
                total_steps,
            );
        }

        if !failures.is_empty() {
            return Err(ExportError::PageFailures(failures));
        }

        progress.report(1.0);
        info!("Raster export finished ({} bytes)", current.len());
        Ok(current)
    }
}

fn is_drawable(annotation: &Annotation) -> bool {
    match annotation {
        Annotation::Stroke(stroke) => stroke.is_drawable(),
    }
}
