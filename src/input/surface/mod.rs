//! Pointer state machine for the annotation surface.

use super::events::{PointerButton, PointerEvent};
use super::geometry::{SurfaceGeometry, SurfaceRect};
use super::settings::ToolSettings;
use crate::draw::{Annotation, PageInfo, Stroke, render_page};
use crate::history::AnnotationStore;
use log::{debug, warn};
use thiserror::Error;


/// Receives the stroke lifecycle emitted by [`AnnotationSurface`].
///
/// The surface never touches annotation state itself; whoever owns the state
/// (normally [`AnnotationStore`](crate::history::AnnotationStore)) implements this.
pub trait StrokeSink {
    /// A new stroke with its first point.
    fn stroke_started(&mut self, page: u32, stroke: &Stroke);
    /// The active stroke gained a point.
    fn stroke_updated(&mut self, page: u32, stroke: &Stroke);
    /// The stroke is finished and has at least two points.
    fn stroke_completed(&mut self, page: u32, stroke: Stroke);
    /// The stroke ended with a single point and must not be kept.
    fn stroke_discarded(&mut self, page: u32, stroke_id: &str);
}

/// Errors from drawing into the surface's raster buffer.
#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("No raster surface attached")]
    Unavailable,

    #[error("Cairo error: {0}")]
    Cairo(#[from] cairo::Error),
}

/// Current pointer mode.
#[derive(Debug, Clone, PartialEq)]
pub enum PointerState {
    /// Not drawing - waiting for a pointer-down
    Idle,
    /// A pointer is captured and feeding points into `stroke`
    Drawing { pointer_id: i32, stroke: Stroke },
}

/// Captures pointer input over one page and turns it into strokes.
///
/// Pointer handlers are infallible: without an attached buffer, layout or page
/// information they simply do nothing. Rendering is requested through
/// `needs_redraw` and carried out by [`render`](Self::render).
pub struct AnnotationSurface {
    page: u32,
    page_info: Option<PageInfo>,
    settings: ToolSettings,
    scale: f64,
    rect: Option<SurfaceRect>,
    buffer: Option<cairo::ImageSurface>,
    state: PointerState,
    captured_pointer: Option<i32>,
    /// Whether the buffer is stale and should be re-rendered
    pub needs_redraw: bool,
}

impl AnnotationSurface {
    /// Creates a detached surface on page 1 at scale 1.0.
    pub fn new(settings: ToolSettings) -> Self {
        Self {
            page: 1,
            page_info: None,
            settings,
            scale: 1.0,
            rect: None,
            buffer: None,
            state: PointerState::Idle,
            captured_pointer: None,
            needs_redraw: true,
        }
    }

    /// Allocates the raster buffer the surface draws into.
    pub fn attach(&mut self, pixel_width: i32, pixel_height: i32) -> Result<(), SurfaceError> {
        let buffer = cairo::ImageSurface::create(cairo::Format::ARgb32, pixel_width, pixel_height)?;
        self.buffer = Some(buffer);
        self.needs_redraw = true;
        Ok(())
    }

    /// Drops the raster buffer; pointer input is ignored until re-attached.
    pub fn detach(&mut self) {
        self.buffer = None;
    }

    pub fn buffer(&self) -> Option<&cairo::ImageSurface> {
        self.buffer.as_ref()
    }

    /// Updates where the surface sits on screen.
    pub fn set_layout(&mut self, rect: SurfaceRect) {
        self.rect = Some(rect);
    }

    /// Updates the viewport scale (surface pixels per document unit).
    pub fn set_viewport_scale(&mut self, scale: f64) {
        if scale <= 0.0 {
            warn!("Ignoring non-positive viewport scale {scale}");
            return;
        }
        if (scale - self.scale).abs() > f64::EPSILON {
            self.scale = scale;
            self.needs_redraw = true;
        }
    }

    pub fn viewport_scale(&self) -> f64 {
        self.scale
    }

    /// Switches to another page, finishing any stroke in progress first.
    pub fn set_page(&mut self, page: u32, info: PageInfo, sink: &mut impl StrokeSink) {
        if let PointerState::Drawing { pointer_id, .. } = self.state {
            self.finish_stroke(pointer_id, sink);
        }
        self.page = page;
        self.page_info = Some(info);
        self.needs_redraw = true;
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_info(&self) -> Option<PageInfo> {
        self.page_info
    }

    /// Applies a new toolbar configuration to subsequent strokes.
    pub fn set_settings(&mut self, settings: ToolSettings) {
        self.settings = settings;
    }

    pub fn settings(&self) -> &ToolSettings {
        &self.settings
    }

    pub fn state(&self) -> &PointerState {
        &self.state
    }

    pub fn is_drawing(&self) -> bool {
        matches!(self.state, PointerState::Drawing { .. })
    }

    /// The pointer currently captured by a drag, if any.
    pub fn captured_pointer(&self) -> Option<i32> {
        self.captured_pointer
    }

    /// The stroke being drawn, for live preview.
    pub fn active_stroke(&self) -> Option<&Stroke> {
        match &self.state {
            PointerState::Drawing { stroke, .. } => Some(stroke),
            PointerState::Idle => None,
        }
    }

    /// Current device-to-document mapping, available once a buffer, a layout
    /// and page information are all present.
    pub fn geometry(&self) -> Option<SurfaceGeometry> {
        let buffer = self.buffer.as_ref()?;
        let rect = self.rect?;
        self.page_info?;
        Some(SurfaceGeometry {
            rect,
            pixel_width: buffer.width() as f64,
            pixel_height: buffer.height() as f64,
            scale: self.scale,
        })
    }

    /// Processes a pointer-down: captures the pointer and starts a stroke.
    pub fn on_pointer_down(&mut self, event: &PointerEvent, sink: &mut impl StrokeSink) {
        if event.button != PointerButton::Primary || self.is_drawing() {
            return;
        }
        let Some(geometry) = self.geometry() else {
            debug!("Pointer down ignored: surface not ready");
            return;
        };

        let point = geometry.to_document(event.client_x, event.client_y, event.pressure);
        let stroke = Stroke::begin(
            self.settings.tool,
            self.settings.color.clone(),
            self.settings.size,
            self.settings.opacity,
            point,
        );
        debug!(
            "Stroke {} started on page {} with {:?}",
            stroke.id, self.page, stroke.tool
        );

        self.captured_pointer = Some(event.pointer_id);
        sink.stroke_started(self.page, &stroke);
        self.state = PointerState::Drawing {
            pointer_id: event.pointer_id,
            stroke,
        };
        self.needs_redraw = true;
    }

    /// Processes pointer motion; only the captured pointer extends the stroke.
    pub fn on_pointer_move(&mut self, event: &PointerEvent, sink: &mut impl StrokeSink) {
        let Some(geometry) = self.geometry() else {
            return;
        };
        if let PointerState::Drawing { pointer_id, stroke } = &mut self.state {
            if *pointer_id != event.pointer_id {
                return;
            }
            let point = geometry.to_document(event.client_x, event.client_y, event.pressure);
            stroke.points.push(point);
            sink.stroke_updated(self.page, stroke);
            self.needs_redraw = true;
        }
    }

    /// Processes pointer-up.
    pub fn on_pointer_up(&mut self, event: &PointerEvent, sink: &mut impl StrokeSink) {
        self.finish_stroke(event.pointer_id, sink);
    }

    /// Processes pointer-cancel (e.g. the platform took over the gesture).
    pub fn on_pointer_cancel(&mut self, event: &PointerEvent, sink: &mut impl StrokeSink) {
        self.finish_stroke(event.pointer_id, sink);
    }

    /// Processes the pointer leaving the surface.
    pub fn on_pointer_leave(&mut self, event: &PointerEvent, sink: &mut impl StrokeSink) {
        self.finish_stroke(event.pointer_id, sink);
    }

    /// Ends the drag of `pointer_id`, releasing capture and returning to idle.
    ///
    /// A stroke that never got a second point is discarded instead of
    /// completed, so a tap leaves no mark.
    fn finish_stroke(&mut self, pointer_id: i32, sink: &mut impl StrokeSink) {
        let captured = matches!(
            self.state,
            PointerState::Drawing { pointer_id: id, .. } if id == pointer_id
        );
        if !captured {
            return;
        }

        let PointerState::Drawing { stroke, .. } =
            std::mem::replace(&mut self.state, PointerState::Idle)
        else {
            return;
        };
        self.captured_pointer = None;
        self.needs_redraw = true;

        if stroke.is_drawable() {
            debug!(
                "Stroke {} completed with {} points",
                stroke.id,
                stroke.points.len()
            );
            sink.stroke_completed(self.page, stroke);
        } else {
            debug!("Stroke {} discarded: single point", stroke.id);
            sink.stroke_discarded(self.page, &stroke.id);
        }
    }

    /// Redraws the buffer from the page's committed annotations plus the
    /// active stroke.
    pub fn render(&mut self, annotations: &[Annotation]) -> Result<(), SurfaceError> {
        let buffer = self.buffer.as_ref().ok_or(SurfaceError::Unavailable)?;
        let ctx = cairo::Context::new(buffer)?;
        render_page(&ctx, annotations, self.active_stroke(), self.scale)?;
        drop(ctx);
        self.needs_redraw = false;
        Ok(())
    }

    /// Renders only when something changed since the last render.
    ///
    /// Returns whether a render happened.
    pub fn render_if_needed(&mut self, annotations: &[Annotation]) -> Result<bool, SurfaceError> {
        if !self.needs_redraw {
            return Ok(false);
        }
        self.render(annotations)?;
        Ok(true)
    }

    /// Marks the buffer stale, e.g. after the store changed behind the
    /// surface's back.
    pub fn invalidate(&mut self) {
        self.needs_redraw = true;
    }

    /// Undoes the last action on the current page, scheduling a redraw when
    /// anything changed.
    pub fn undo(&mut self, store: &mut AnnotationStore) -> bool {
        let changed = store.undo(self.page);
        self.needs_redraw |= changed;
        changed
    }

    /// Redoes on the current page, scheduling a redraw when anything changed.
    pub fn redo(&mut self, store: &mut AnnotationStore) -> bool {
        let changed = store.redo(self.page);
        self.needs_redraw |= changed;
        changed
    }

    /// Clears the current page (undoably) and schedules a redraw.
    pub fn clear_page(&mut self, store: &mut AnnotationStore) {
        store.clear_page(self.page);
        self.needs_redraw = true;
    }
}
