//! Interactive annotation surface
//!
//! Sits between a host view and the open document. The host forwards pointer
//! and key input in view coordinates; the surface resolves it against the
//! page layout and either consumes it (placing, selecting, moving, resizing
//! or editing annotations) or hands it back as [`EventDisposition::Forwarded`]
//! for the host's own scrolling and text selection.
//!
//! State changes the host cares about are queued as [`SurfaceEvent`]s and
//! drained with [`AnnotationSurface::take_events`].

use crate::annotation::{Annotation, AnnotationId, Bitmap, Page, TextSpec, TextStyle};
use crate::config::EditorConfig;
use crate::document::Document;
use crate::error::EditorError;
use crate::geometry::{clamp_to_page, Handle, Point, Rect, Size};
use crate::layout::{MetricTextMeasurer, TextMeasurer};
use crate::manipulation::{DragKind, DragState};
use crate::overlay::SelectionOverlay;
use crate::text_edit::{EditOutcome, EditSession, InlineTextEditor};
use crate::view::ViewLayout;
use pdf_engine::RgbaImage;

/// What the next click on a page will create
#[derive(Debug, Clone, PartialEq)]
pub enum PendingPlacement {
    Text(TextSpec),
    Image(Bitmap),
}

impl PendingPlacement {
    pub fn kind(&self) -> PlacementKind {
        match self {
            PendingPlacement::Text(_) => PlacementKind::Text,
            PendingPlacement::Image(_) => PlacementKind::Image,
        }
    }
}

/// Payload-free tag of the pending placement, for hosts toggling UI state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementKind {
    None,
    Text,
    Image,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub page_index: usize,
    pub annotation_id: AnnotationId,
}

/// Whether the surface handled an input event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDisposition {
    Consumed,
    /// Not ours; the host should run its default handling.
    Forwarded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceEvent {
    PendingPlacementChanged(PlacementKind),
    SelectionChanged(Option<Selection>),
    RedrawRequested,
}

/// Pointer shape a host should show at a view point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorHint {
    Default,
    Crosshair,
    Move,
    Resize(Handle),
}

pub struct AnnotationSurface {
    config: EditorConfig,
    measurer: Box<dyn TextMeasurer>,
    document: Option<Document>,
    layout: ViewLayout,
    pending: Option<PendingPlacement>,
    selection: Option<Selection>,
    drag: Option<DragState>,
    editor: InlineTextEditor,
    overlay: SelectionOverlay,
    events: Vec<SurfaceEvent>,
}

impl AnnotationSurface {
    pub fn new(config: EditorConfig) -> Self {
        Self::with_measurer(config, Box::new(MetricTextMeasurer::default()))
    }

    pub fn with_measurer(config: EditorConfig, measurer: Box<dyn TextMeasurer>) -> Self {
        Self {
            layout: ViewLayout::new(config.zoom, config.page_spacing),
            editor: InlineTextEditor::new(config.minimum_annotation_size),
            overlay: SelectionOverlay::new(config.handle_size, config.handle_hit_slop),
            config,
            measurer,
            document: None,
            pending: None,
            selection: None,
            drag: None,
            events: Vec::new(),
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn measurer(&self) -> &dyn TextMeasurer {
        self.measurer.as_ref()
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    /// Direct document access; call [`AnnotationSurface::refresh`] after mutating annotations.
    pub fn document_mut(&mut self) -> Option<&mut Document> {
        self.document.as_mut()
    }

    pub fn layout(&self) -> &ViewLayout {
        &self.layout
    }

    pub fn selection(&self) -> Option<Selection> {
        self.selection
    }

    pub fn selected_annotation(&self) -> Option<&Annotation> {
        let selection = self.selection?;
        self.document.as_ref()?.page(selection.page_index)?.get(selection.annotation_id)
    }

    pub fn pending_placement(&self) -> Option<&PendingPlacement> {
        self.pending.as_ref()
    }

    pub fn drag(&self) -> Option<&DragState> {
        self.drag.as_ref()
    }

    pub fn edit_session(&self) -> Option<&EditSession> {
        self.editor.session()
    }

    pub fn overlay(&self) -> &SelectionOverlay {
        &self.overlay
    }

    /// Swap the displayed document and return the previous one.
    ///
    /// A live edit is cancelled against the outgoing document first. Pending
    /// placement, selection and drag state never carry over.
    pub fn set_document(&mut self, document: Option<Document>) -> Option<Document> {
        if let Some(outcome) = self.editor.cancel() {
            tracing::debug!(annotation = %outcome.annotation_id(), "cancelled edit on document swap");
            self.apply_edit_outcome(outcome);
        }
        self.drag = None;
        self.set_pending(None);
        self.set_selection(None);

        let previous = std::mem::replace(&mut self.document, document);
        let page_boxes = self
            .document
            .as_ref()
            .map(|document| document.pages().iter().map(Page::visible_box).collect())
            .unwrap_or_default();
        self.layout.set_pages(page_boxes);
        self.layout.set_scroll_offset(Point::default());
        self.refresh_overlay();

        previous
    }

    pub fn set_zoom(&mut self, zoom: f32) {
        self.layout.set_zoom(zoom);
        self.sync_edit_transform();
        self.refresh_overlay();
    }

    pub fn scroll_to(&mut self, offset: Point) {
        self.layout.set_scroll_offset(offset);
        self.sync_edit_transform();
        self.refresh_overlay();
    }

    /// View position of a page-space point, for hosts that script input.
    pub fn view_point(&self, page_index: usize, page_point: Point) -> Option<Point> {
        Some(self.layout.transform(page_index)?.to_view(page_point))
    }

    pub fn arm_text_placement(&mut self, spec: TextSpec) {
        self.set_pending(Some(PendingPlacement::Text(spec)));
    }

    pub fn arm_image_placement(&mut self, bitmap: Bitmap) {
        self.set_pending(Some(PendingPlacement::Image(bitmap)));
    }

    pub fn disarm_placement(&mut self) {
        self.set_pending(None);
    }

    pub fn pointer_down(&mut self, point: Point, click_count: u32) -> EventDisposition {
        self.commit_edit();

        if self.pending.is_some() {
            let Some((page_index, page_point)) = self.layout.page_at(point) else {
                return EventDisposition::Forwarded;
            };
            if let Some(pending) = self.pending.take() {
                self.events.push(SurfaceEvent::PendingPlacementChanged(PlacementKind::None));
                self.place(pending, page_index, page_point);
            }
            return EventDisposition::Consumed;
        }

        if let Some(selection) = self.selection {
            if let Some(handle) = self.overlay.hit_test_handle(point) {
                let bounds = self.annotation_bounds(selection);
                let transform = self.layout.transform(selection.page_index);
                if let (Some(bounds), Some(transform)) = (bounds, transform) {
                    self.drag = Some(DragState::resizing(
                        selection.annotation_id,
                        selection.page_index,
                        handle,
                        bounds,
                        transform.to_page(point),
                    ));
                    return EventDisposition::Consumed;
                }
            }
        }

        let hit = self.layout.page_at(point).and_then(|(page_index, page_point)| {
            let page = self.document.as_ref()?.page(page_index)?;
            let annotation = page.get(page.hit_test(page_point)?)?;
            Some((page_index, page_point, annotation.id(), annotation.is_text()))
        });
        let Some((page_index, page_point, annotation_id, is_text)) = hit else {
            self.drag = None;
            self.set_selection(None);
            return EventDisposition::Forwarded;
        };

        if click_count >= 2 && is_text {
            self.begin_edit(page_index, annotation_id);
            return EventDisposition::Consumed;
        }

        let selection = Selection { page_index, annotation_id };
        self.set_selection(Some(selection));
        self.drag = self
            .annotation_bounds(selection)
            .map(|bounds| DragState::moving(annotation_id, page_index, bounds, page_point));
        EventDisposition::Consumed
    }

    pub fn pointer_drag(&mut self, point: Point) -> EventDisposition {
        let Some(drag) = self.drag.as_mut() else {
            return EventDisposition::Forwarded;
        };
        let Some(transform) = self.layout.transform(drag.page_index) else {
            return EventDisposition::Consumed;
        };
        drag.update_position(transform.to_page(point));
        let drag = *drag;

        let min_size = self.config.minimum_annotation_size;
        if let Some(page) = self.document.as_mut().and_then(|doc| doc.page_mut(drag.page_index)) {
            let bounds = drag.calculate_bounds(page.visible_box(), min_size);
            if let Some(annotation) = page.get_mut(drag.annotation_id) {
                annotation.set_bounds(bounds);
            }
        }

        self.refresh_overlay();
        EventDisposition::Consumed
    }

    pub fn pointer_up(&mut self, _point: Point) -> EventDisposition {
        let Some(drag) = self.drag.take() else {
            return EventDisposition::Forwarded;
        };

        let bounds = self.annotation_bounds(Selection {
            page_index: drag.page_index,
            annotation_id: drag.annotation_id,
        });
        tracing::debug!(annotation = %drag.annotation_id, kind = ?drag.kind, ?bounds, "finished drag");
        EventDisposition::Consumed
    }

    /// Escape: abandon a live edit, restoring the annotation.
    pub fn cancel_key(&mut self) -> EventDisposition {
        match self.editor.cancel() {
            Some(outcome) => {
                self.apply_edit_outcome(outcome);
                self.refresh_overlay();
                EventDisposition::Consumed
            }
            None => EventDisposition::Forwarded,
        }
    }

    /// Replace the text of the live edit; false when nothing is being edited.
    pub fn set_edit_text(&mut self, text: impl Into<String>) -> bool {
        let changed = self.editor.set_text(text, self.measurer.as_ref());
        if changed {
            self.request_redraw();
        }
        changed
    }

    /// Finish a live edit, keeping the text. Blank text deletes the annotation.
    pub fn commit_edit(&mut self) -> bool {
        let Some(outcome) = self.editor.commit() else {
            return false;
        };
        self.apply_edit_outcome(outcome);
        self.refresh_overlay();
        true
    }

    /// Step the font size of the edited or selected text annotation.
    ///
    /// Sizes are clamped to the configured range. A selected (not edited)
    /// box is rescaled about its center by the size ratio so the text keeps
    /// fitting. Returns the resulting size.
    pub fn adjust_font_size(&mut self, delta: f32) -> Result<f32, EditorError> {
        let delta = if delta.is_finite() {
            delta
        } else {
            tracing::warn!(delta, "ignoring non-finite font size step");
            0.0
        };

        if let Some(current) = self.editor.session().map(|session| session.font().size) {
            let size = self.config.clamp_font_size(current + delta);
            self.editor.set_font_size(size, self.measurer.as_ref());
            self.request_redraw();
            return Ok(size);
        }

        let selection = self.selection.ok_or(EditorError::NoEligibleSelection)?;
        let min_size = self.config.minimum_annotation_size;
        let page = self
            .document
            .as_mut()
            .and_then(|doc| doc.page_mut(selection.page_index))
            .ok_or(EditorError::NoEligibleSelection)?;
        let page_box = page.visible_box();
        let annotation =
            page.get_mut(selection.annotation_id).ok_or(EditorError::NoEligibleSelection)?;
        let bounds = annotation.bounds();
        let body = annotation.text_body_mut().ok_or(EditorError::NoEligibleSelection)?;

        let old_size = body.style.font.size;
        let new_size = self.config.clamp_font_size(old_size + delta);
        body.style.font.size = new_size;

        if old_size > 0.0 && (new_size - old_size).abs() > f32::EPSILON {
            let scaled = bounds.scaled_about_center(new_size / old_size);
            annotation.set_bounds(clamp_to_page(scaled, page_box, min_size));
        }

        self.refresh_overlay();
        Ok(new_size)
    }

    /// Remove the selected annotation.
    pub fn delete_selection(&mut self) -> bool {
        let Some(selection) = self.selection else {
            return false;
        };
        let removed = self
            .document
            .as_mut()
            .and_then(|doc| doc.page_mut(selection.page_index))
            .and_then(|page| page.remove(selection.annotation_id))
            .is_some();

        self.drag = None;
        self.set_selection(None);
        self.refresh_overlay();
        removed
    }

    pub fn cursor_at(&self, point: Point) -> CursorHint {
        if self.pending.is_some() {
            return match self.layout.page_at(point) {
                Some(_) => CursorHint::Crosshair,
                None => CursorHint::Default,
            };
        }
        if let Some(drag) = &self.drag {
            return match drag.kind {
                DragKind::Move => CursorHint::Move,
                DragKind::Resize(handle) => CursorHint::Resize(handle),
            };
        }
        if let Some(handle) = self.overlay.hit_test_handle(point) {
            return CursorHint::Resize(handle);
        }

        let over_annotation = self.layout.page_at(point).is_some_and(|(page_index, page_point)| {
            self.document
                .as_ref()
                .and_then(|doc| doc.page(page_index))
                .and_then(|page| page.hit_test(page_point))
                .is_some()
        });
        if over_annotation {
            CursorHint::Move
        } else {
            CursorHint::Default
        }
    }

    /// Re-validate the selection and rebuild the overlay after outside changes.
    pub fn refresh(&mut self) {
        if let Some(selection) = self.selection {
            if self.annotation_bounds(selection).is_none() {
                self.drag = None;
                self.set_selection(None);
            }
        }
        self.refresh_overlay();
    }

    /// Drain queued notifications, oldest first.
    pub fn take_events(&mut self) -> Vec<SurfaceEvent> {
        std::mem::take(&mut self.events)
    }

    /// Draw a page's annotations and, when it holds the selection, the overlay.
    ///
    /// `canvas` is the page raster at the current zoom with the page's
    /// top-left corner at pixel (0, 0).
    pub fn render_page(&self, page_index: usize, canvas: &mut RgbaImage) {
        let Some(page) = self.document.as_ref().and_then(|doc| doc.page(page_index)) else {
            return;
        };
        let Some(transform) = self.layout.transform(page_index) else {
            return;
        };

        let canvas_transform = transform.with_origin(Point::default());
        for annotation in page.annotations() {
            annotation.draw(canvas, &canvas_transform);
        }

        if self.selection.is_some_and(|selection| selection.page_index == page_index) {
            self.overlay.paint(canvas, transform.origin());
        }
    }

    fn place(&mut self, pending: PendingPlacement, page_index: usize, at: Point) {
        let min_size = self.config.minimum_annotation_size;

        let mut annotation = match pending {
            PendingPlacement::Text(spec) => {
                let metrics = self.measurer.measure(&spec.content, &spec.font, None);
                let padding = self.config.placement_padding;
                let size = Size::new(metrics.width + padding.width, metrics.height + padding.height)
                    .at_least(min_size);
                let style = TextStyle::from_spec(&spec);
                Annotation::text(Rect::centered_at(at, size), spec.content, style)
            }
            PendingPlacement::Image(bitmap) => {
                let size = stamp_size(&bitmap, self.config.max_stamp_side).at_least(min_size);
                Annotation::stamp(Rect::centered_at(at, size), bitmap)
            }
        };

        let Some(page) = self.document.as_mut().and_then(|doc| doc.page_mut(page_index)) else {
            return;
        };
        annotation.set_bounds(clamp_to_page(annotation.bounds(), page.visible_box(), min_size));
        let bounds = annotation.bounds();
        let annotation_id = page.push(annotation);

        tracing::info!(page = page_index, annotation = %annotation_id, ?bounds, "placed annotation");
        self.set_selection(Some(Selection { page_index, annotation_id }));
    }

    fn begin_edit(&mut self, page_index: usize, annotation_id: AnnotationId) {
        self.drag = None;
        self.set_selection(None);

        let Some(transform) = self.layout.transform(page_index) else {
            return;
        };
        let Some(page) = self.document.as_ref().and_then(|doc| doc.page(page_index)) else {
            return;
        };
        if self.editor.begin(page, annotation_id, transform, self.measurer.as_ref()) {
            tracing::debug!(annotation = %annotation_id, "began inline edit");
        }
        self.refresh_overlay();
    }

    fn apply_edit_outcome(&mut self, outcome: EditOutcome) {
        let min_size = self.config.minimum_annotation_size;
        let Some(page) = self.document.as_mut().and_then(|doc| doc.page_mut(outcome.page_index()))
        else {
            return;
        };
        let page_box = page.visible_box();

        match outcome {
            EditOutcome::Delete { annotation_id, .. } => {
                page.remove(annotation_id);
                tracing::debug!(annotation = %annotation_id, "removed blank text annotation");
                if self.selection.is_some_and(|selection| selection.annotation_id == annotation_id) {
                    self.set_selection(None);
                }
            }
            EditOutcome::Update { annotation_id, contents, font, text_color, bounds, .. } => {
                if let Some(annotation) = page.get_mut(annotation_id) {
                    annotation.set_bounds(clamp_to_page(bounds, page_box, min_size));
                    if let Some(body) = annotation.text_body_mut() {
                        body.contents = contents;
                        body.style.font = font;
                        body.style.text_color = text_color;
                    }
                }
            }
            EditOutcome::Restore { annotation_id, snapshot, .. } => {
                if let Some(annotation) = page.get_mut(annotation_id) {
                    annotation.set_bounds(snapshot.bounds);
                    if let Some(body) = annotation.text_body_mut() {
                        body.contents = snapshot.contents;
                    }
                }
            }
        }
    }

    fn annotation_bounds(&self, selection: Selection) -> Option<Rect> {
        let page = self.document.as_ref()?.page(selection.page_index)?;
        Some(page.get(selection.annotation_id)?.bounds())
    }

    fn set_pending(&mut self, pending: Option<PendingPlacement>) {
        let before = self.pending.as_ref().map(PendingPlacement::kind);
        let after = pending.as_ref().map(PendingPlacement::kind);
        self.pending = pending;

        // Re-arming the same kind with a new payload still counts as a change.
        if before.is_some() || after.is_some() {
            self.events.push(SurfaceEvent::PendingPlacementChanged(
                after.unwrap_or(PlacementKind::None),
            ));
        }
    }

    fn set_selection(&mut self, selection: Option<Selection>) {
        if self.selection != selection {
            self.selection = selection;
            self.events.push(SurfaceEvent::SelectionChanged(selection));
        }
        self.refresh_overlay();
    }

    fn sync_edit_transform(&mut self) {
        let Some(page_index) = self.editor.session().map(EditSession::page_index) else {
            return;
        };
        if let Some(transform) = self.layout.transform(page_index) {
            self.editor.set_transform(transform);
        }
    }

    fn refresh_overlay(&mut self) {
        let selection_rect = self
            .selection
            .filter(|_| !self.editor.is_active())
            .and_then(|selection| {
                let bounds = self.annotation_bounds(selection)?;
                Some(self.layout.transform(selection.page_index)?.rect_to_view(bounds))
            });

        match selection_rect {
            Some(rect) => self.overlay.update(rect),
            None => self.overlay.clear(),
        }
        self.request_redraw();
    }

    fn request_redraw(&mut self) {
        if self.events.last() != Some(&SurfaceEvent::RedrawRequested) {
            self.events.push(SurfaceEvent::RedrawRequested);
        }
    }
}

/// Natural stamp size: the bitmap scaled down so its longer side fits `max_side`.
fn stamp_size(bitmap: &RgbaImage, max_side: f32) -> Size {
    let (width, height) = bitmap.dimensions();
    let (width, height) = (width.max(1) as f32, height.max(1) as f32);
    if width.max(height) <= max_side {
        Size::new(width, height)
    } else if width >= height {
        Size::new(max_side, height * max_side / width)
    } else {
        Size::new(width * max_side / height, max_side)
    }
}
