//! Continuous vertical page layout and page/view coordinate conversion
//!
//! Pages are stacked top to bottom with a fixed gap, each scaled by the zoom
//! factor. View space has its origin at the top-left of the scrolled viewport
//! with y growing downward.

use crate::geometry::{Point, Rect};

/// Maps between one page's space and view space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageTransform {
    page_box: Rect,
    /// View position of the page's top-left corner
    origin: Point,
    scale: f32,
}

impl PageTransform {
    pub fn new(page_box: Rect, origin: Point, scale: f32) -> Self {
        let scale = if scale > 0.0 { scale } else { 1.0 };
        Self { page_box, origin, scale }
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn origin(&self) -> Point {
        self.origin
    }

    pub fn page_box(&self) -> Rect {
        self.page_box
    }

    /// Page-sized rectangle in view space
    pub fn view_rect(&self) -> Rect {
        Rect::new(
            self.origin.x,
            self.origin.y,
            self.page_box.width * self.scale,
            self.page_box.height * self.scale,
        )
    }

    pub fn to_view(&self, point: Point) -> Point {
        Point::new(
            self.origin.x + (point.x - self.page_box.min_x()) * self.scale,
            self.origin.y + (self.page_box.max_y() - point.y) * self.scale,
        )
    }

    pub fn to_page(&self, point: Point) -> Point {
        Point::new(
            self.page_box.min_x() + (point.x - self.origin.x) / self.scale,
            self.page_box.max_y() - (point.y - self.origin.y) / self.scale,
        )
    }

    pub fn rect_to_view(&self, rect: Rect) -> Rect {
        let top_left = self.to_view(Point::new(rect.min_x(), rect.max_y()));
        Rect::new(top_left.x, top_left.y, rect.width * self.scale, rect.height * self.scale)
    }

    pub fn rect_to_page(&self, rect: Rect) -> Rect {
        let bottom_left = self.to_page(Point::new(rect.min_x(), rect.max_y()));
        Rect::new(bottom_left.x, bottom_left.y, rect.width / self.scale, rect.height / self.scale)
    }

    /// Same mapping, with the page's top-left corner moved to `origin`.
    pub fn with_origin(&self, origin: Point) -> Self {
        Self { origin, ..*self }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewLayout {
    page_boxes: Vec<Rect>,
    zoom: f32,
    page_spacing: f32,
    scroll_offset: Point,
}

impl Default for ViewLayout {
    fn default() -> Self {
        Self { page_boxes: Vec::new(), zoom: 1.0, page_spacing: 16.0, scroll_offset: Point::default() }
    }
}

impl ViewLayout {
    pub fn new(zoom: f32, page_spacing: f32) -> Self {
        Self { zoom: sanitize_zoom(zoom), page_spacing: page_spacing.max(0.0), ..Self::default() }
    }

    pub fn set_pages(&mut self, page_boxes: Vec<Rect>) {
        self.page_boxes = page_boxes;
    }

    pub fn page_count(&self) -> usize {
        self.page_boxes.len()
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn set_zoom(&mut self, zoom: f32) {
        self.zoom = sanitize_zoom(zoom);
    }

    pub fn page_spacing(&self) -> f32 {
        self.page_spacing
    }

    pub fn scroll_offset(&self) -> Point {
        self.scroll_offset
    }

    pub fn set_scroll_offset(&mut self, offset: Point) {
        self.scroll_offset = offset;
    }

    /// Height of the whole stack in view units, spacing included
    pub fn content_height(&self) -> f32 {
        let pages: f32 = self.page_boxes.iter().map(|page| page.height * self.zoom).sum();
        pages + self.page_spacing * (self.page_boxes.len() + 1) as f32
    }

    pub fn transform(&self, page_index: usize) -> Option<PageTransform> {
        let page_box = *self.page_boxes.get(page_index)?;
        let above: f32 = self.page_boxes[..page_index]
            .iter()
            .map(|page| page.height * self.zoom + self.page_spacing)
            .sum();

        let origin = Point::new(
            self.page_spacing - self.scroll_offset.x,
            self.page_spacing + above - self.scroll_offset.y,
        );
        Some(PageTransform::new(page_box, origin, self.zoom))
    }

    /// Page under a view point and the point in that page's space.
    ///
    /// Points in the gaps between pages hit nothing.
    pub fn page_at(&self, point: Point) -> Option<(usize, Point)> {
        (0..self.page_boxes.len()).find_map(|index| {
            let transform = self.transform(index)?;
            transform.view_rect().contains(point).then(|| (index, transform.to_page(point)))
        })
    }
}

fn sanitize_zoom(zoom: f32) -> f32 {
    if zoom.is_finite() && zoom > 0.0 {
        zoom
    } else {
        1.0
    }
}
