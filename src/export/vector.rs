//! Vector export: strokes become native line-drawing operators.

use super::document;
use super::{DocumentExporter, ExportError, ProgressCallback, ProgressReporter};
use crate::draw::{Annotation, Color, PageAnnotations, PageInfo, PageInfoMap, Stroke, WHITE};
use crate::input::Tool;
use async_trait::async_trait;
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId, dictionary};
use log::{debug, info, warn};
use std::collections::HashMap;

/// Highlighter segments are drawn this much wider than the configured size.
pub const HIGHLIGHTER_WIDTH_FACTOR: f64 = 1.5;

const LOAD_DONE: f64 = 0.1;
const DRAW_DONE: f64 = 0.9;

/// Draws every stroke as line segments directly into its page's content.
///
/// Document y grows upward, so every point is written as `pageHeight - y`.
/// Erasers overpaint in opaque white rather than removing anything.
#[derive(Debug, Clone, Default)]
pub struct VectorExporter {
    compress_streams: bool,
}

impl VectorExporter {
    pub fn new(compress_streams: bool) -> Self {
        Self { compress_streams }
    }
}

#[async_trait]
impl DocumentExporter for VectorExporter {
    async fn export(
        &self,
        source: Vec<u8>,
        pages: &PageInfoMap,
        annotations: &PageAnnotations,
        progress: Option<ProgressCallback>,
    ) -> Result<Vec<u8>, ExportError> {
        let mut progress = ProgressReporter::new(progress);
        let mut doc = document::load(&source)?;
        drop(source);
        progress.report(LOAD_DONE);

        let page_ids = doc.get_pages();
        let total: usize = annotations.values().map(Vec::len).sum();
        let mut done = 0;
        info!(
            "Vector export: {} annotations on {} pages",
            total,
            annotations.len()
        );

        for (&page_number, list) in annotations {
            if list.is_empty() {
                continue;
            }

            let target = page_ids
                .get(&page_number)
                .copied()
                .zip(pages.get(&page_number).copied());
            let Some((page_id, info)) = target else {
                warn!(
                    "Skipping {} annotations for unknown page {}",
                    list.len(),
                    page_number
                );
                done += list.len();
                progress.report_band(LOAD_DONE, DRAW_DONE, done, total);
                continue;
            };

            let mut page = PageWriter::new(&mut doc, page_id, info);
            for annotation in list {
                match annotation {
                    Annotation::Stroke(stroke) => page.draw_stroke(stroke)?,
                }
                done += 1;
                progress.report_band(LOAD_DONE, DRAW_DONE, done, total);
            }
            page.finish()?;

            // Let the caller observe progress between pages.
            tokio::task::yield_now().await;
        }

        progress.report(DRAW_DONE);
        let bytes = document::save(&mut doc, self.compress_streams)?;
        progress.report(1.0);
        info!("Vector export finished ({} bytes)", bytes.len());
        Ok(bytes)
    }
}

/// Accumulates the operators for one page.
struct PageWriter<'a> {
    doc: &'a mut Document,
    page_id: ObjectId,
    info: PageInfo,
    operations: Vec<Operation>,
    /// Opacity (in thousandths) -> ExtGState resource name
    graphics_states: HashMap<u32, String>,
}

impl<'a> PageWriter<'a> {
    fn new(doc: &'a mut Document, page_id: ObjectId, info: PageInfo) -> Self {
        let mut operations = Vec::new();
        // Keep annotations aligned with the page when its MediaBox is offset.
        if let Some([x0, y0, _, _]) = document::media_box(doc, page_id) {
            if x0 != 0.0 || y0 != 0.0 {
                operations.push(Operation::new(
                    "cm",
                    vec![real(1.0), real(0.0), real(0.0), real(1.0), real(x0), real(y0)],
                ));
            }
        }

        Self {
            doc,
            page_id,
            info,
            operations,
            graphics_states: HashMap::new(),
        }
    }

    fn draw_stroke(&mut self, stroke: &Stroke) -> Result<(), ExportError> {
        if !stroke.is_drawable() {
            debug!("Skipping stroke {} with a single point", stroke.id);
            return Ok(());
        }

        let thickness = stroke.size * self.info.user_unit_or_default();
        let (color, width, opacity) = match stroke.tool {
            Tool::Pen => (
                Color::from_hex_or_black(&stroke.color),
                thickness,
                stroke.tool.effective_opacity(stroke.opacity),
            ),
            Tool::Highlighter => (
                Color::from_hex_or_black(&stroke.color),
                thickness * HIGHLIGHTER_WIDTH_FACTOR,
                stroke.tool.effective_opacity(stroke.opacity),
            ),
            Tool::Eraser => (WHITE, thickness, 1.0),
        };

        self.operations.push(Operation::new("q", vec![]));
        if opacity < 1.0 {
            let name = self.graphics_state(opacity)?;
            self.operations
                .push(Operation::new("gs", vec![Object::Name(name.into_bytes())]));
        }
        self.operations.push(Operation::new(
            "RG",
            vec![real(color.r), real(color.g), real(color.b)],
        ));
        self.operations.push(Operation::new("w", vec![real(width)]));
        self.operations.push(Operation::new("J", vec![Object::Integer(1)]));
        self.operations.push(Operation::new("j", vec![Object::Integer(1)]));

        // One subpath per point pair, painted by a single S so translucent
        // segments do not darken where they meet.
        let height = self.info.height;
        for pair in stroke.points.windows(2) {
            let (from, to) = (pair[0], pair[1]);
            self.operations
                .push(Operation::new("m", vec![real(from.x), real(height - from.y)]));
            self.operations
                .push(Operation::new("l", vec![real(to.x), real(height - to.y)]));
        }
        self.operations.push(Operation::new("S", vec![]));
        self.operations.push(Operation::new("Q", vec![]));
        Ok(())
    }

    /// ExtGState resource name for a stroke/fill alpha, created on first use.
    fn graphics_state(&mut self, opacity: f64) -> Result<String, ExportError> {
        let key = (opacity * 1000.0).round() as u32;
        if let Some(name) = self.graphics_states.get(&key) {
            return Ok(name.clone());
        }

        let alpha = key as f64 / 1000.0;
        let name = document::add_page_resource(
            self.doc,
            self.page_id,
            "ExtGState",
            "ExamGS",
            dictionary! {
                "Type" => "ExtGState",
                "CA" => real(alpha),
                "ca" => real(alpha),
            }
            .into(),
        )?;
        self.graphics_states.insert(key, name.clone());
        Ok(name)
    }

    fn finish(self) -> Result<(), ExportError> {
        if self.operations.is_empty() {
            return Ok(());
        }
        let content = Content {
            operations: self.operations,
        }
        .encode()
        .map_err(|e| ExportError::Encode(e.to_string()))?;
        document::append_page_content(self.doc, self.page_id, content)
    }
}

fn real(value: f64) -> Object {
    Object::Real(value as f32)
}
