//! Background raster worker and its message protocol.
//!
//! The worker owns no state shared with the caller: requests and responses
//! travel over unbounded channels and page bytes are moved, never copied,
//! in both directions. Each page runs on the blocking pool; a failure (even a
//! panic) becomes an [`ErrorMessage`] for that page and the worker keeps
//! serving the rest of the queue.

use super::ExportError;
use super::raster;
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Asks the worker to burn `vector_layer` into page `page_number`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessMessage {
    /// The document holding the page
    pub page_bytes: Vec<u8>,
    /// SVG serialization of the page's annotation layer
    pub vector_layer: String,
    pub page_number: u32,
    pub total_pages: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressMessage {
    pub page_number: u32,
    pub total_pages: u32,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteMessage {
    pub page_number: u32,
    pub page_bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorMessage {
    pub page_number: u32,
    pub error: String,
    /// The untouched input, handed back so the caller keeps its document.
    /// Absent only when the page job panicked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_bytes: Option<Vec<u8>>,
}

/// Caller -> worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WorkerRequest {
    Process(ProcessMessage),
}

/// Worker -> caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WorkerResponse {
    Progress(ProgressMessage),
    Complete(CompleteMessage),
    Error(ErrorMessage),
}

/// Raster settings applied to every page the worker processes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterOptions {
    /// Pixels per page unit
    pub scale: f64,
    pub compress_streams: bool,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            scale: 2.0,
            compress_streams: false,
        }
    }
}

/// Work done for one page on the blocking pool: takes the document, the page
/// number and the SVG layer, reports phases, returns the new document.
pub(crate) type PageJob = fn(
    &[u8],
    u32,
    &str,
    RasterOptions,
    &mut dyn FnMut(&str),
) -> Result<Vec<u8>, ExportError>;

/// The production [`PageJob`]: rasterize the layer and embed it.
pub(crate) fn rasterize_page(
    page_bytes: &[u8],
    page_number: u32,
    vector_layer: &str,
    options: RasterOptions,
    progress: &mut dyn FnMut(&str),
) -> Result<Vec<u8>, ExportError> {
    raster::rasterize_into_page(
        page_bytes,
        page_number,
        vector_layer,
        options.scale,
        options.compress_streams,
        progress,
    )
}

/// Handle to a running raster worker.
///
/// Dropping the handle closes the request channel; the worker finishes the
/// page it is on and exits.
pub struct RasterWorker {
    request_tx: mpsc::UnboundedSender<WorkerRequest>,
    response_rx: mpsc::UnboundedReceiver<WorkerResponse>,
}

impl RasterWorker {
    /// Spawns the worker loop on `runtime_handle`.
    pub fn spawn(runtime_handle: &tokio::runtime::Handle, options: RasterOptions) -> Self {
        Self::spawn_with_job(runtime_handle, options, rasterize_page)
    }

    pub(crate) fn spawn_with_job(
        runtime_handle: &tokio::runtime::Handle,
        options: RasterOptions,
        job: PageJob,
    ) -> Self {
        let (request_tx, mut request_rx) = mpsc::unbounded_channel::<WorkerRequest>();
        let (response_tx, response_rx) = mpsc::unbounded_channel::<WorkerResponse>();

        runtime_handle.spawn(async move {
            while let Some(request) = request_rx.recv().await {
                match request {
                    WorkerRequest::Process(message) => {
                        process_page(message, options, job, &response_tx).await;
                    }
                }
            }
            debug!("Raster worker stopped");
        });

        Self {
            request_tx,
            response_rx,
        }
    }

    /// Queues a page. Pages are processed in the order they are sent.
    pub fn send(&self, message: ProcessMessage) -> Result<(), ExportError> {
        self.request_tx
            .send(WorkerRequest::Process(message))
            .map_err(|_| ExportError::WorkerUnavailable)
    }

    /// Next response, or `None` once the worker has exited.
    pub async fn recv(&mut self) -> Option<WorkerResponse> {
        self.response_rx.recv().await
    }
}

async fn process_page(
    message: ProcessMessage,
    options: RasterOptions,
    job: PageJob,
    responses: &mpsc::UnboundedSender<WorkerResponse>,
) {
    let ProcessMessage {
        page_bytes,
        vector_layer,
        page_number,
        total_pages,
    } = message;

    if page_number == 0 || page_number > total_pages {
        error!("Rejecting page {page_number}: document has {total_pages} pages");
        respond(
            responses,
            WorkerResponse::Error(ErrorMessage {
                page_number,
                error: format!("page {page_number} is outside 1..={total_pages}"),
                page_bytes: Some(page_bytes),
            }),
        );
        return;
    }

    let progress_tx = responses.clone();
    let job = tokio::task::spawn_blocking(move || {
        let mut report = |status: &str| {
            respond(
                &progress_tx,
                WorkerResponse::Progress(ProgressMessage {
                    page_number,
                    total_pages,
                    status: status.to_string(),
                }),
            );
        };
        report("loading");
        let result = job(&page_bytes, page_number, &vector_layer, options, &mut report);
        (result, page_bytes)
    });

    let response = match job.await {
        Ok((Ok(bytes), _original)) => {
            info!("Page {page_number}/{total_pages} rasterized");
            WorkerResponse::Complete(CompleteMessage {
                page_number,
                page_bytes: bytes,
            })
        }
        Ok((Err(err), original)) => {
            error!("Page {page_number} failed: {err}");
            WorkerResponse::Error(ErrorMessage {
                page_number,
                error: err.to_string(),
                page_bytes: Some(original),
            })
        }
        Err(join_error) => {
            error!("Page {page_number} job aborted: {join_error}");
            WorkerResponse::Error(ErrorMessage {
                page_number,
                error: format!("page job aborted: {join_error}"),
                page_bytes: None,
            })
        }
    };
    respond(responses, response);
}

fn respond(responses: &mpsc::UnboundedSender<WorkerResponse>, response: WorkerResponse) {
    if responses.send(response).is_err() {
        debug!("Raster worker response dropped: caller went away");
    }
}

#[cfg(test)]
impl RasterWorker {
    pub(crate) fn with_closed_channel_for_test() -> Self {
        let (request_tx, request_rx) = mpsc::unbounded_channel::<WorkerRequest>();
        drop(request_rx);
        let (_response_tx, response_rx) = mpsc::unbounded_channel::<WorkerResponse>();
        Self {
            request_tx,
            response_rx,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::{Annotation, PageInfo, Point, Stroke};
    use crate::export::document::fixtures::blank_pdf;
    use crate::export::layer_svg;
    use crate::input::Tool;

    fn layer() -> String {
        let mut stroke = Stroke::begin(Tool::Pen, "#0000ff", 3.0, 1.0, Point::new(5.0, 5.0));
        stroke.points.push(Point::new(50.0, 40.0));
        layer_svg(&PageInfo::new(100.0, 100.0), &[Annotation::Stroke(stroke)])
    }

    fn process(page_bytes: Vec<u8>, vector_layer: String, page_number: u32) -> ProcessMessage {
        ProcessMessage {
            page_bytes,
            vector_layer,
            page_number,
            total_pages: 2,
        }
    }

    /// Collects responses until the page's terminal message.
    async fn until_done(worker: &mut RasterWorker) -> (Vec<String>, WorkerResponse) {
        let mut statuses = Vec::new();
        loop {
            match worker.recv().await.expect("worker alive") {
                WorkerResponse::Progress(progress) => statuses.push(progress.status),
                terminal => return (statuses, terminal),
            }
        }
    }

    #[tokio::test]
    async fn page_completes_with_progress_first() {
        let mut worker =
            RasterWorker::spawn(&tokio::runtime::Handle::current(), RasterOptions::default());
        let source = blank_pdf(&[(100.0, 100.0), (100.0, 100.0)]);
        worker.send(process(source, layer(), 2)).unwrap();

        let (statuses, terminal) = until_done(&mut worker).await;
        assert_eq!(
            statuses,
            ["loading", "rasterizing", "encoding", "embedding", "saving"]
        );
        let WorkerResponse::Complete(complete) = terminal else {
            panic!("expected completion, got {terminal:?}");
        };
        assert_eq!(complete.page_number, 2);
        assert!(lopdf::Document::load_mem(&complete.page_bytes).is_ok());
    }

    #[tokio::test]
    async fn out_of_range_page_errors_without_stopping_the_queue() {
        let mut worker =
            RasterWorker::spawn(&tokio::runtime::Handle::current(), RasterOptions::default());
        let source = blank_pdf(&[(100.0, 100.0), (100.0, 100.0)]);

        // Both in flight before either is answered.
        worker.send(process(source.clone(), layer(), 7)).unwrap();
        worker.send(process(source.clone(), layer(), 1)).unwrap();

        let (statuses, terminal) = until_done(&mut worker).await;
        assert!(statuses.is_empty());
        let WorkerResponse::Error(rejected) = terminal else {
            panic!("expected an error, got {terminal:?}");
        };
        assert_eq!(rejected.page_number, 7);
        assert!(rejected.error.contains('7'));
        assert_eq!(rejected.page_bytes.as_deref(), Some(source.as_slice()));

        let (_, terminal) = until_done(&mut worker).await;
        assert!(matches!(
            terminal,
            WorkerResponse::Complete(CompleteMessage { page_number: 1, .. })
        ));
    }

    #[tokio::test]
    async fn failed_page_hands_bytes_back() {
        let mut worker =
            RasterWorker::spawn(&tokio::runtime::Handle::current(), RasterOptions::default());
        let source = blank_pdf(&[(100.0, 100.0)]);
        worker
            .send(process(source.clone(), "<svg".to_string(), 1))
            .unwrap();

        let (_, terminal) = until_done(&mut worker).await;
        let WorkerResponse::Error(failed) = terminal else {
            panic!("expected an error, got {terminal:?}");
        };
        assert_eq!(failed.page_number, 1);
        assert!(failed.error.contains("annotation layer"));
        assert_eq!(failed.page_bytes, Some(source));
    }

    /// Crashes on page 1, renders every other page normally.
    fn crash_on_first_page(
        page_bytes: &[u8],
        page_number: u32,
        vector_layer: &str,
        options: RasterOptions,
        progress: &mut dyn FnMut(&str),
    ) -> Result<Vec<u8>, ExportError> {
        if page_number == 1 {
            panic!("renderer crashed");
        }
        rasterize_page(page_bytes, page_number, vector_layer, options, progress)
    }

    #[tokio::test]
    async fn panicking_page_job_is_reported_and_the_queue_continues() {
        let mut worker = RasterWorker::spawn_with_job(
            &tokio::runtime::Handle::current(),
            RasterOptions::default(),
            crash_on_first_page,
        );
        let source = blank_pdf(&[(100.0, 100.0), (100.0, 100.0)]);
        worker.send(process(source.clone(), layer(), 1)).unwrap();
        worker.send(process(source, layer(), 2)).unwrap();

        let (_, terminal) = until_done(&mut worker).await;
        let WorkerResponse::Error(crashed) = terminal else {
            panic!("expected an error, got {terminal:?}");
        };
        assert_eq!(crashed.page_number, 1);
        assert!(crashed.error.contains("aborted"));
        assert_eq!(crashed.page_bytes, None);

        let (_, terminal) = until_done(&mut worker).await;
        assert!(matches!(
            terminal,
            WorkerResponse::Complete(CompleteMessage { page_number: 2, .. })
        ));
    }

    #[test]
    fn send_fails_once_worker_is_gone() {
        let worker = RasterWorker::with_closed_channel_for_test();
        let err = worker.send(process(Vec::new(), String::new(), 1)).unwrap_err();
        assert!(matches!(err, ExportError::WorkerUnavailable));
    }

    #[test]
    fn messages_are_tagged_with_camel_case_fields() {
        let response = WorkerResponse::Progress(ProgressMessage {
            page_number: 3,
            total_pages: 4,
            status: "encoding".to_string(),
        });
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "progress",
                "pageNumber": 3,
                "totalPages": 4,
                "status": "encoding",
            })
        );

        let request: WorkerRequest = serde_json::from_value(serde_json::json!({
            "type": "process",
            "pageBytes": [37, 80],
            "vectorLayer": "<svg/>",
            "pageNumber": 1,
            "totalPages": 1,
        }))
        .unwrap();
        let WorkerRequest::Process(message) = request;
        assert_eq!(message.page_bytes, b"%P");

        let error = serde_json::to_value(WorkerResponse::Error(ErrorMessage {
            page_number: 2,
            error: "boom".to_string(),
            page_bytes: None,
        }))
        .unwrap();
        assert!(error.get("pageBytes").is_none());
    }
}
