//! Move and resize drags on a selected annotation
//!
//! A drag remembers the annotation's bounds when it started and recomputes the
//! new bounds from that snapshot on every pointer update, so intermediate
//! clamping never accumulates.

use crate::annotation::AnnotationId;
use crate::geometry::{clamp_to_page, resized_bounds, Handle, Point, Rect, Size};

/// What the pointer is doing to the annotation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragKind {
    /// Whole-box translation
    Move,
    /// Corner resize; the opposite corner stays fixed
    Resize(Handle),
}

/// In-progress drag on one annotation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragState {
    /// ID of annotation being manipulated
    pub annotation_id: AnnotationId,

    pub page_index: usize,

    pub kind: DragKind,

    /// Bounds before the drag started
    pub original_bounds: Rect,

    /// Drag start position in page coordinates
    pub drag_start: Point,

    /// Current drag position in page coordinates
    pub current_position: Point,
}

impl DragState {
    pub fn moving(
        annotation_id: AnnotationId,
        page_index: usize,
        original_bounds: Rect,
        drag_start: Point,
    ) -> Self {
        Self {
            annotation_id,
            page_index,
            kind: DragKind::Move,
            original_bounds,
            drag_start,
            current_position: drag_start,
        }
    }

    pub fn resizing(
        annotation_id: AnnotationId,
        page_index: usize,
        handle: Handle,
        original_bounds: Rect,
        drag_start: Point,
    ) -> Self {
        Self {
            annotation_id,
            page_index,
            kind: DragKind::Resize(handle),
            original_bounds,
            drag_start,
            current_position: drag_start,
        }
    }

    pub fn update_position(&mut self, position: Point) {
        self.current_position = position;
    }

    /// Bounds for the current pointer position, kept on `page_box`.
    pub fn calculate_bounds(&self, page_box: Rect, min_size: Size) -> Rect {
        let raw = match self.kind {
            DragKind::Move => self.original_bounds.translated(
                self.current_position.x - self.drag_start.x,
                self.current_position.y - self.drag_start.y,
            ),
            DragKind::Resize(handle) => {
                resized_bounds(self.original_bounds, handle, self.current_position, min_size)
            }
        };

        clamp_to_page(raw, page_box, min_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::MINIMUM_ANNOTATION_SIZE;

    const LETTER: Rect = Rect { x: 0.0, y: 0.0, width: 612.0, height: 792.0 };

    #[test]
    fn test_move_translates_by_pointer_delta() {
        let mut drag = DragState::moving(
            uuid::Uuid::new_v4(),
            0,
            Rect::new(100.0, 100.0, 60.0, 40.0),
            Point::new(120.0, 110.0),
        );
        drag.update_position(Point::new(150.0, 90.0));

        assert_eq!(
            drag.calculate_bounds(LETTER, MINIMUM_ANNOTATION_SIZE),
            Rect::new(130.0, 80.0, 60.0, 40.0)
        );
    }

    #[test]
    fn test_move_is_clamped_to_page() {
        let mut drag = DragState::moving(
            uuid::Uuid::new_v4(),
            0,
            Rect::new(590.0, 10.0, 60.0, 40.0),
            Point::new(600.0, 30.0),
        );
        drag.update_position(Point::new(650.0, 30.0));

        assert_eq!(
            drag.calculate_bounds(LETTER, MINIMUM_ANNOTATION_SIZE),
            Rect::new(552.0, 10.0, 60.0, 40.0)
        );
    }

    #[test]
    fn test_resize_uses_original_bounds_each_update() {
        let mut drag = DragState::resizing(
            uuid::Uuid::new_v4(),
            0,
            Handle::BottomRight,
            Rect::new(100.0, 100.0, 100.0, 80.0),
            Point::new(200.0, 100.0),
        );

        drag.update_position(Point::new(0.0, 500.0));
        let collapsed = drag.calculate_bounds(LETTER, MINIMUM_ANNOTATION_SIZE);
        assert_eq!(collapsed.size(), MINIMUM_ANNOTATION_SIZE);

        drag.update_position(Point::new(260.0, 60.0));
        assert_eq!(
            drag.calculate_bounds(LETTER, MINIMUM_ANNOTATION_SIZE),
            Rect::new(100.0, 60.0, 160.0, 120.0)
        );
    }
}
