//! Selection overlay: outline and corner handles drawn above the page
//!
//! Everything here lives in view space. The overlay is a passive display
//! list; the surface decides when to show, move or hide it.

use crate::annotation::{fill_rect, Color};
use crate::geometry::{handle_rects, hit_test_handle, Handle, HandleRects, Point, Rect};
use pdf_engine::RgbaImage;

const OUTLINE_WIDTH: f32 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct SelectionOverlay {
    handle_size: f32,
    hit_slop: f32,
    color: Color,
    visible: Option<(Rect, HandleRects)>,
}

impl SelectionOverlay {
    pub fn new(handle_size: f32, hit_slop: f32) -> Self {
        Self { handle_size, hit_slop, color: Color::SELECTION_BLUE, visible: None }
    }

    /// Show the overlay around `selection` (view space).
    pub fn update(&mut self, selection: Rect) {
        self.visible = Some((selection, handle_rects(selection, self.handle_size)));
    }

    pub fn clear(&mut self) {
        self.visible = None;
    }

    pub fn is_visible(&self) -> bool {
        self.visible.is_some()
    }

    pub fn selection_rect(&self) -> Option<Rect> {
        self.visible.map(|(rect, _)| rect)
    }

    pub fn handles(&self) -> Option<&HandleRects> {
        self.visible.as_ref().map(|(_, handles)| handles)
    }

    /// Handle under a view point, with hit slop applied
    pub fn hit_test_handle(&self, point: Point) -> Option<Handle> {
        let (_, handles) = self.visible.as_ref()?;
        hit_test_handle(point, handles, self.hit_slop)
    }

    /// Paint outline and handles onto a canvas whose top-left sits at `canvas_origin` in view space.
    pub fn paint(&self, canvas: &mut RgbaImage, canvas_origin: Point) {
        let Some((selection, handles)) = &self.visible else {
            return;
        };
        let local = |rect: Rect| rect.translated(-canvas_origin.x, -canvas_origin.y);
        let outline = local(*selection);

        for edge in [
            Rect::new(outline.min_x(), outline.min_y(), outline.width, OUTLINE_WIDTH),
            Rect::new(outline.min_x(), outline.max_y() - OUTLINE_WIDTH, outline.width, OUTLINE_WIDTH),
            Rect::new(outline.min_x(), outline.min_y(), OUTLINE_WIDTH, outline.height),
            Rect::new(outline.max_x() - OUTLINE_WIDTH, outline.min_y(), OUTLINE_WIDTH, outline.height),
        ] {
            fill_rect(canvas, edge, self.color);
        }

        for (_, handle) in handles.iter() {
            let handle = local(handle);
            fill_rect(canvas, handle, Color::WHITE);
            fill_rect(canvas, handle.expanded(-OUTLINE_WIDTH), self.color);
        }
    }
}
