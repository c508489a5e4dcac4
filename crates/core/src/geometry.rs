//! Geometry and resize-handle model
//!
//! Pure functions over points and rectangles. Page space follows PDF
//! conventions (origin bottom-left, y up, points); view space is the on-screen
//! surface (origin top-left, y down, pixels). Both use the same `Point` and
//! `Rect` types; function docs state which space they expect.

use serde::{Deserialize, Serialize};

/// Smallest size an annotation may take after any mutation.
pub const MINIMUM_ANNOTATION_SIZE: Size = Size { width: 48.0, height: 32.0 };

/// Side length of a square resize handle.
pub const HANDLE_SIZE: f32 = 10.0;

/// Extra margin around a handle that still counts as a hit.
pub const HANDLE_HIT_SLOP: f32 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f32, dy: f32) -> Self {
        Self { x: self.x + dx, y: self.y + dy }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Component-wise maximum.
    pub fn at_least(self, floor: Size) -> Self {
        Self { width: self.width.max(floor.width), height: self.height.max(floor.height) }
    }
}

/// Axis-aligned rectangle stored as origin plus size.
///
/// The origin is the corner with the smallest coordinates: bottom-left in page
/// space, top-left in view space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Normalized rectangle spanning two edge pairs.
    pub fn from_edges(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Self {
        Self {
            x: min_x.min(max_x),
            y: min_y.min(max_y),
            width: (max_x - min_x).abs(),
            height: (max_y - min_y).abs(),
        }
    }

    pub fn centered_at(center: Point, size: Size) -> Self {
        Self {
            x: center.x - size.width / 2.0,
            y: center.y - size.height / 2.0,
            width: size.width,
            height: size.height,
        }
    }

    pub fn min_x(&self) -> f32 {
        self.x
    }

    pub fn min_y(&self) -> f32 {
        self.y
    }

    pub fn max_x(&self) -> f32 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f32 {
        self.y + self.height
    }

    pub fn size(&self) -> Size {
        Size { width: self.width, height: self.height }
    }

    pub fn center(&self) -> Point {
        Point { x: self.x + self.width / 2.0, y: self.y + self.height / 2.0 }
    }

    /// Inclusive containment test.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.min_x()
            && point.x <= self.max_x()
            && point.y >= self.min_y()
            && point.y <= self.max_y()
    }

    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.min_x() >= self.min_x()
            && other.max_x() <= self.max_x()
            && other.min_y() >= self.min_y()
            && other.max_y() <= self.max_y()
    }

    pub fn translated(&self, dx: f32, dy: f32) -> Self {
        Self { x: self.x + dx, y: self.y + dy, ..*self }
    }

    pub fn expanded(&self, amount: f32) -> Self {
        Self {
            x: self.x - amount,
            y: self.y - amount,
            width: self.width + amount * 2.0,
            height: self.height + amount * 2.0,
        }
    }

    /// Scale both dimensions by `factor`, keeping the center fixed.
    pub fn scaled_about_center(&self, factor: f32) -> Self {
        Self::centered_at(
            self.center(),
            Size { width: self.width * factor, height: self.height * factor },
        )
    }
}

/// Corner resize handles of a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handle {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Handle {
    /// Hit-testing order.
    pub const ALL: [Handle; 4] =
        [Handle::TopLeft, Handle::TopRight, Handle::BottomLeft, Handle::BottomRight];
}

/// Handle squares for one selection rectangle, in `Handle::ALL` order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandleRects([(Handle, Rect); 4]);

impl HandleRects {
    pub fn get(&self, handle: Handle) -> Rect {
        self.0
            .iter()
            .find(|(candidate, _)| *candidate == handle)
            .map(|(_, rect)| *rect)
            .unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Handle, Rect)> + '_ {
        self.0.iter().copied()
    }
}

/// Handle squares centered on the corners of a view-space selection rectangle.
pub fn handle_rects(selection: Rect, handle_size: f32) -> HandleRects {
    let size = Size::new(handle_size, handle_size);
    let corner = |handle| match handle {
        Handle::TopLeft => Point::new(selection.min_x(), selection.min_y()),
        Handle::TopRight => Point::new(selection.max_x(), selection.min_y()),
        Handle::BottomLeft => Point::new(selection.min_x(), selection.max_y()),
        Handle::BottomRight => Point::new(selection.max_x(), selection.max_y()),
    };

    HandleRects(Handle::ALL.map(|handle| (handle, Rect::centered_at(corner(handle), size))))
}

/// First handle whose square, grown by `slop` on every side, contains `point`.
pub fn hit_test_handle(point: Point, handles: &HandleRects, slop: f32) -> Option<Handle> {
    handles.iter().find(|(_, rect)| rect.expanded(slop).contains(point)).map(|(handle, _)| handle)
}

/// Resize a page-space rectangle by dragging one corner handle to `point`.
///
/// The two edges adjacent to the handle follow the point; the opposite edges
/// stay put. Moving edges stop where the rectangle would drop below
/// `min_size`. Page space is y-up, so "top" is the max-Y edge.
pub fn resized_bounds(initial: Rect, handle: Handle, point: Point, min_size: Size) -> Rect {
    let (left, bottom, right, top) =
        (initial.min_x(), initial.min_y(), initial.max_x(), initial.max_y());

    match handle {
        Handle::TopLeft => {
            let width = (right - point.x).max(min_size.width);
            let height = (point.y - bottom).max(min_size.height);
            Rect::new(right - width, bottom, width, height)
        }
        Handle::TopRight => {
            let width = (point.x - left).max(min_size.width);
            let height = (point.y - bottom).max(min_size.height);
            Rect::new(left, bottom, width, height)
        }
        Handle::BottomLeft => {
            let width = (right - point.x).max(min_size.width);
            let height = (top - point.y).max(min_size.height);
            Rect::new(right - width, top - height, width, height)
        }
        Handle::BottomRight => {
            let width = (point.x - left).max(min_size.width);
            let height = (top - point.y).max(min_size.height);
            Rect::new(left, top - height, width, height)
        }
    }
}

/// Keep a rectangle on its page.
///
/// Width and height are floored to `min_size` and, when the page itself is
/// at least `min_size`, capped to the page size. The rectangle is then
/// translated (never rescaled) per axis, min edge first, until it lies inside
/// `page`.
pub fn clamp_to_page(rect: Rect, page: Rect, min_size: Size) -> Rect {
    let mut size = rect.size().at_least(min_size);
    if page.width >= min_size.width {
        size.width = size.width.min(page.width);
    }
    if page.height >= min_size.height {
        size.height = size.height.min(page.height);
    }

    let mut x = rect.x;
    if x < page.min_x() {
        x = page.min_x();
    }
    if x + size.width > page.max_x() {
        x = page.max_x() - size.width;
    }

    let mut y = rect.y;
    if y < page.min_y() {
        y = page.min_y();
    }
    if y + size.height > page.max_y() {
        y = page.max_y() - size.height;
    }

    Rect::new(x, y, size.width, size.height)
}
