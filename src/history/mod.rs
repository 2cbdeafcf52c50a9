//! Per-page annotation store with snapshot-based undo/redo.
//!
//! Every checkpoint stores the *whole* annotation list of a page, so undo and
//! redo swap complete lists and never depend on how many points a stroke had.
//! Live preview updates (`add_stroke`, `update_stroke`) never create
//! checkpoints; only `finalize_stroke` and `clear_page` do.

use crate::config::HistoryConfig;
use crate::draw::{Annotation, PageAnnotations, Stroke};
use crate::input::StrokeSink;
use log::debug;
use std::collections::BTreeMap;


/// Undo/redo stacks for one page. The last element of each is its top.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryEntry {
    pub past: Vec<Vec<Annotation>>,
    pub future: Vec<Vec<Annotation>>,
}

/// Owns every page's annotations and history for one authoring session.
///
/// Input capture feeds it through [`StrokeSink`]; exporters read it through
/// [`annotations`](Self::annotations). Pages are created lazily on first use.
#[derive(Debug, Clone, Default)]
pub struct AnnotationStore {
    pages: PageAnnotations,
    history: BTreeMap<u32, HistoryEntry>,
    /// Maximum snapshots kept in `past` per page (0 = unlimited)
    max_depth: usize,
}

impl AnnotationStore {
    /// Creates an empty store with unlimited history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store keeping at most `max_depth` undo steps per page
    /// (0 = unlimited).
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            max_depth,
            ..Self::default()
        }
    }

    /// Creates an empty store limited by the `[history]` config section.
    pub fn from_config(config: &HistoryConfig) -> Self {
        Self::with_max_depth(config.max_depth)
    }

    /// All pages' annotations, for exporters.
    pub fn annotations(&self) -> &PageAnnotations {
        &self.pages
    }

    /// Annotations of one page in draw order (empty if the page was never touched).
    pub fn page_annotations(&self, page: u32) -> &[Annotation] {
        self.pages.get(&page).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn history(&self, page: u32) -> Option<&HistoryEntry> {
        self.history.get(&page)
    }

    /// Appends a stroke for live preview. Not a history checkpoint.
    pub fn add_stroke(&mut self, page: u32, stroke: Stroke) {
        self.pages.entry(page).or_default().push(Annotation::Stroke(stroke));
    }

    /// Replaces the stroke with the same id, or appends it. Not a history
    /// checkpoint.
    pub fn update_stroke(&mut self, page: u32, stroke: Stroke) {
        let list = self.pages.entry(page).or_default();
        upsert(list, stroke);
    }

    /// Commits a finished stroke and records an undo checkpoint.
    ///
    /// The checkpoint is the list as it was before the stroke began: a live
    /// preview copy with the same id is left out, so one undo removes the
    /// whole stroke. Committing clears the redo stack.
    ///
    /// A stroke with fewer than two points is never committed: its preview
    /// copy is discarded and no checkpoint is recorded.
    pub fn finalize_stroke(&mut self, page: u32, stroke: Stroke) {
        if !stroke.is_drawable() {
            debug!("Refusing to commit single-point stroke {}", stroke.id);
            self.discard_stroke(page, &stroke.id);
            return;
        }
        let list = self.pages.entry(page).or_default();
        let before: Vec<Annotation> = list
            .iter()
            .filter(|annotation| annotation.id() != stroke.id)
            .cloned()
            .collect();
        debug!("Finalizing stroke {} on page {}", stroke.id, page);
        upsert(list, stroke);
        self.checkpoint(page, before);
    }

    /// Removes a stroke without touching history (used for single-point taps).
    ///
    /// Returns whether anything was removed.
    pub fn discard_stroke(&mut self, page: u32, stroke_id: &str) -> bool {
        let Some(list) = self.pages.get_mut(&page) else {
            return false;
        };
        let before = list.len();
        list.retain(|annotation| annotation.id() != stroke_id);
        before != list.len()
    }

    /// Empties a page. Undoable like any other action. See [`undo`](Self::undo)
    /// about re-rendering.
    pub fn clear_page(&mut self, page: u32) {
        let current = std::mem::take(self.pages.entry(page).or_default());
        debug!("Clearing {} annotations on page {}", current.len(), page);
        self.checkpoint(page, current);
    }

    /// Restores the previous snapshot. Returns `false` when there is none.
    ///
    /// A surface showing this page must be re-rendered afterwards;
    /// [`AnnotationSurface::undo`](crate::input::AnnotationSurface::undo) does both.
    pub fn undo(&mut self, page: u32) -> bool {
        let Some(entry) = self.history.get_mut(&page) else {
            return false;
        };
        let Some(previous) = entry.past.pop() else {
            return false;
        };
        let current = std::mem::replace(self.pages.entry(page).or_default(), previous);
        entry.future.push(current);
        true
    }

    /// Re-applies the most recently undone snapshot. Returns `false` when
    /// there is none. See [`undo`](Self::undo) about re-rendering.
    pub fn redo(&mut self, page: u32) -> bool {
        let Some(entry) = self.history.get_mut(&page) else {
            return false;
        };
        let Some(next) = entry.future.pop() else {
            return false;
        };
        let current = std::mem::replace(self.pages.entry(page).or_default(), next);
        entry.past.push(current);
        true
    }

    pub fn can_undo(&self, page: u32) -> bool {
        self.history
            .get(&page)
            .is_some_and(|entry| !entry.past.is_empty())
    }

    pub fn can_redo(&self, page: u32) -> bool {
        self.history
            .get(&page)
            .is_some_and(|entry| !entry.future.is_empty())
    }

    /// Forgets every page and its history (end of the authoring session).
    pub fn reset(&mut self) {
        self.pages.clear();
        self.history.clear();
    }

    fn checkpoint(&mut self, page: u32, snapshot: Vec<Annotation>) {
        let entry = self.history.entry(page).or_default();
        entry.past.push(snapshot);
        entry.future.clear();
        if self.max_depth > 0 && entry.past.len() > self.max_depth {
            let overflow = entry.past.len() - self.max_depth;
            entry.past.drain(..overflow);
        }
    }
}

fn upsert(list: &mut Vec<Annotation>, stroke: Stroke) {
    match list.iter_mut().find(|annotation| annotation.id() == stroke.id) {
        Some(slot) => *slot = Annotation::Stroke(stroke),
        None => list.push(Annotation::Stroke(stroke)),
    }
}

impl StrokeSink for AnnotationStore {
    fn stroke_started(&mut self, page: u32, stroke: &Stroke) {
        self.add_stroke(page, stroke.clone());
    }

    fn stroke_updated(&mut self, page: u32, stroke: &Stroke) {
        self.update_stroke(page, stroke.clone());
    }

    fn stroke_completed(&mut self, page: u32, stroke: Stroke) {
        self.finalize_stroke(page, stroke);
    }

    fn stroke_discarded(&mut self, page: u32, stroke_id: &str) {
        self.discard_stroke(page, stroke_id);
    }
}
