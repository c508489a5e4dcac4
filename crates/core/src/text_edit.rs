//! Inline editing of free-text annotations
//!
//! An edit session overlays an editable text frame (view space) on one text
//! annotation. The frame keeps its width and top edge while its height tracks
//! the laid-out text. Ending the session yields an [`EditOutcome`] for the
//! caller to apply to the document: the editor never touches pages itself.

use crate::annotation::{AnnotationId, Color, FontSpec, Page};
use crate::geometry::{Rect, Size};
use crate::layout::TextMeasurer;
use crate::view::PageTransform;

/// Annotation state captured when editing began
#[derive(Debug, Clone, PartialEq)]
pub struct EditSnapshot {
    pub contents: String,
    pub bounds: Rect,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditSession {
    annotation_id: AnnotationId,
    page_index: usize,
    snapshot: EditSnapshot,
    text: String,
    font: FontSpec,
    text_color: Color,
    frame: Rect,
    transform: PageTransform,
}

impl EditSession {
    pub fn annotation_id(&self) -> AnnotationId {
        self.annotation_id
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn snapshot(&self) -> &EditSnapshot {
        &self.snapshot
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn font(&self) -> &FontSpec {
        &self.font
    }

    pub fn text_color(&self) -> Color {
        self.text_color
    }

    /// Editable frame in view space
    pub fn frame(&self) -> Rect {
        self.frame
    }
}

/// How a finished session changes its annotation
#[derive(Debug, Clone, PartialEq)]
pub enum EditOutcome {
    /// Text was left blank: remove the annotation.
    Delete { annotation_id: AnnotationId, page_index: usize },
    /// Write the edited text, styling and frame back.
    Update {
        annotation_id: AnnotationId,
        page_index: usize,
        contents: String,
        font: FontSpec,
        text_color: Color,
        bounds: Rect,
    },
    /// Edit abandoned: put the snapshot back.
    Restore { annotation_id: AnnotationId, page_index: usize, snapshot: EditSnapshot },
}

impl EditOutcome {
    pub fn annotation_id(&self) -> AnnotationId {
        match self {
            EditOutcome::Delete { annotation_id, .. }
            | EditOutcome::Update { annotation_id, .. }
            | EditOutcome::Restore { annotation_id, .. } => *annotation_id,
        }
    }

    pub fn page_index(&self) -> usize {
        match self {
            EditOutcome::Delete { page_index, .. }
            | EditOutcome::Update { page_index, .. }
            | EditOutcome::Restore { page_index, .. } => *page_index,
        }
    }
}

/// Owns at most one live edit session.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineTextEditor {
    session: Option<EditSession>,
    min_size: Size,
}

impl InlineTextEditor {
    pub fn new(min_size: Size) -> Self {
        Self { session: None, min_size }
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&EditSession> {
        self.session.as_ref()
    }

    /// Start editing a text annotation of `page`.
    ///
    /// Returns false, leaving any current session untouched, when a session
    /// is already live or the annotation is missing or not text.
    pub fn begin(
        &mut self,
        page: &Page,
        annotation_id: AnnotationId,
        transform: PageTransform,
        measurer: &dyn TextMeasurer,
    ) -> bool {
        if self.session.is_some() {
            return false;
        }
        let Some(annotation) = page.get(annotation_id) else {
            return false;
        };
        let Some(body) = annotation.text_body() else {
            return false;
        };

        self.session = Some(EditSession {
            annotation_id,
            page_index: page.index(),
            snapshot: EditSnapshot { contents: body.contents.clone(), bounds: annotation.bounds() },
            text: body.contents.clone(),
            font: body.style.font.clone(),
            text_color: body.style.text_color,
            frame: transform.rect_to_view(annotation.bounds()),
            transform,
        });
        self.adjust_height(measurer);
        true
    }

    /// Replace the session text and resize the frame to fit.
    pub fn set_text(&mut self, text: impl Into<String>, measurer: &dyn TextMeasurer) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        session.text = text.into();
        self.adjust_height(measurer);
        true
    }

    pub fn set_font_size(&mut self, size: f32, measurer: &dyn TextMeasurer) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        session.font.size = size;
        self.adjust_height(measurer);
        true
    }

    /// Re-anchor the frame after the page moved or the zoom changed.
    pub fn set_transform(&mut self, transform: PageTransform) {
        if let Some(session) = self.session.as_mut() {
            let page_frame = session.transform.rect_to_page(session.frame);
            session.frame = transform.rect_to_view(page_frame);
            session.transform = transform;
        }
    }

    /// Fit the frame height to the text at the current width.
    ///
    /// Never shrinks below the minimum annotation height at the current zoom.
    pub fn adjust_height(&mut self, measurer: &dyn TextMeasurer) {
        let min_height = self.min_size.height;
        let Some(session) = self.session.as_mut() else {
            return;
        };

        let scale = session.transform.scale();
        let page_width = session.frame.width / scale;
        let metrics = measurer.measure(&session.text, &session.font, Some(page_width));
        session.frame.height = (metrics.height * scale).max(min_height * scale);
    }

    /// End the session, keeping the edit.
    pub fn commit(&mut self) -> Option<EditOutcome> {
        let session = self.session.take()?;

        if session.text.trim().is_empty() {
            return Some(EditOutcome::Delete {
                annotation_id: session.annotation_id,
                page_index: session.page_index,
            });
        }

        let frame = session.transform.rect_to_page(session.frame);
        let size = frame.size().at_least(self.min_size);
        let bounds = Rect::new(frame.min_x(), frame.max_y() - size.height, size.width, size.height);

        Some(EditOutcome::Update {
            annotation_id: session.annotation_id,
            page_index: session.page_index,
            contents: session.text,
            font: session.font,
            text_color: session.text_color,
            bounds,
        })
    }

    /// End the session, discarding the edit.
    pub fn cancel(&mut self) -> Option<EditOutcome> {
        let session = self.session.take()?;

        Some(EditOutcome::Restore {
            annotation_id: session.annotation_id,
            page_index: session.page_index,
            snapshot: session.snapshot,
        })
    }
}
