//! Annotation data model
//!
//! Editable free-text boxes and image stamps placed on document pages.
//! Bounds are stored in page space (PDF points, y up).

use crate::geometry::{Point, Rect};
use crate::view::PageTransform;
use pdf_engine::RgbaImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Unique identifier for an annotation
///
/// Generated using UUID v4; stable while the document stays open.
pub type AnnotationId = uuid::Uuid;

/// Decoded raster shared between a pending placement and the stamps created from it.
pub type Bitmap = Arc<RgbaImage>;

/// RGBA color representation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Create an opaque color
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Opaque color from normalized RGB components (0.0 to 1.0)
    pub fn from_normalized_rgb(rgb: [f32; 3]) -> Self {
        let channel = |value: f32| (value.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self::rgb(channel(rgb[0]), channel(rgb[1]), channel(rgb[2]))
    }

    /// Normalized RGB components, alpha dropped
    pub fn to_normalized_rgb(&self) -> [f32; 3] {
        [self.r as f32 / 255.0, self.g as f32 / 255.0, self.b as f32 / 255.0]
    }

    pub fn is_transparent(&self) -> bool {
        self.a == 0
    }

    pub const BLACK: Color = Color { r: 0, g: 0, b: 0, a: 255 };
    pub const WHITE: Color = Color { r: 255, g: 255, b: 255, a: 255 };
    pub const YELLOW: Color = Color { r: 255, g: 255, b: 0, a: 255 };
    pub const SELECTION_BLUE: Color = Color { r: 0, g: 122, b: 255, a: 255 };
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid color '{0}', expected #RRGGBB or #RRGGBBAA")]
pub struct ParseColorError(String);

impl FromStr for Color {
    type Err = ParseColorError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let hex = value.trim().trim_start_matches('#');
        let invalid = || ParseColorError(value.to_owned());

        if !hex.is_ascii() || (hex.len() != 6 && hex.len() != 8) {
            return Err(invalid());
        }

        let channel = |index: usize| {
            u8::from_str_radix(&hex[index * 2..index * 2 + 2], 16).map_err(|_| invalid())
        };

        let alpha = if hex.len() == 8 { channel(3)? } else { 255 };
        Ok(Color::new(channel(0)?, channel(1)?, channel(2)?, alpha))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)?;
        if self.a != 255 {
            write!(f, "{:02X}", self.a)?;
        }
        Ok(())
    }
}

/// Font family and size in points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontSpec {
    pub family: String,
    pub size: f32,
}

impl FontSpec {
    pub fn new(family: impl Into<String>, size: f32) -> Self {
        Self { family: family.into(), size }
    }
}

impl Default for FontSpec {
    fn default() -> Self {
        Self { family: "Helvetica".to_owned(), size: 14.0 }
    }
}

/// What a text placement will create: content plus styling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextSpec {
    pub content: String,
    pub font: FontSpec,
    pub text_color: Color,
    /// `None` leaves the box unfilled.
    pub background: Option<Color>,
}

impl Default for TextSpec {
    fn default() -> Self {
        Self {
            content: "Text".to_owned(),
            font: FontSpec::default(),
            text_color: Color::BLACK,
            background: None,
        }
    }
}

/// Styling of a free-text annotation
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub font: FontSpec,
    pub text_color: Color,
    pub background: Option<Color>,
    /// Wrap contents to the box width instead of only breaking on newlines
    pub multiline: bool,
    pub printable: bool,
}

impl TextStyle {
    pub fn from_spec(spec: &TextSpec) -> Self {
        Self {
            font: spec.font.clone(),
            text_color: spec.text_color,
            background: spec.background.filter(|color| !color.is_transparent()),
            multiline: true,
            printable: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextBody {
    pub contents: String,
    pub style: TextStyle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StampBody {
    pub bitmap: Bitmap,
    pub printable: bool,
}

/// Annotation variants the editor manages
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationBody {
    Text(TextBody),
    Stamp(StampBody),
}

/// A single annotation on a page
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    id: AnnotationId,
    bounds: Rect,
    body: AnnotationBody,
}

impl Annotation {
    pub fn text(bounds: Rect, contents: impl Into<String>, style: TextStyle) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            bounds,
            body: AnnotationBody::Text(TextBody { contents: contents.into(), style }),
        }
    }

    pub fn stamp(bounds: Rect, bitmap: Bitmap) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            bounds,
            body: AnnotationBody::Stamp(StampBody { bitmap, printable: true }),
        }
    }

    pub fn id(&self) -> AnnotationId {
        self.id
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn set_bounds(&mut self, bounds: Rect) {
        self.bounds = bounds;
    }

    pub fn body(&self) -> &AnnotationBody {
        &self.body
    }

    pub fn is_text(&self) -> bool {
        matches!(self.body, AnnotationBody::Text(_))
    }

    /// Text contents, `None` for stamps
    pub fn contents(&self) -> Option<&str> {
        match &self.body {
            AnnotationBody::Text(text) => Some(&text.contents),
            AnnotationBody::Stamp(_) => None,
        }
    }

    pub fn text_body(&self) -> Option<&TextBody> {
        match &self.body {
            AnnotationBody::Text(text) => Some(text),
            AnnotationBody::Stamp(_) => None,
        }
    }

    pub fn text_body_mut(&mut self) -> Option<&mut TextBody> {
        match &mut self.body {
            AnnotationBody::Text(text) => Some(text),
            AnnotationBody::Stamp(_) => None,
        }
    }

    pub fn is_printable(&self) -> bool {
        match &self.body {
            AnnotationBody::Text(text) => text.style.printable,
            AnnotationBody::Stamp(stamp) => stamp.printable,
        }
    }

    pub fn set_printable(&mut self, printable: bool) {
        match &mut self.body {
            AnnotationBody::Text(text) => text.style.printable = printable,
            AnnotationBody::Stamp(stamp) => stamp.printable = printable,
        }
    }

    pub fn hit_test(&self, point: Point) -> bool {
        self.bounds.contains(point)
    }

    /// Composite the annotation onto a page raster.
    ///
    /// Stamps scale their bitmap into the bounds with nearest-neighbor
    /// sampling and alpha blending. Text boxes paint their background only;
    /// glyph rendering is left to the PDF backend once saved.
    pub fn draw(&self, canvas: &mut RgbaImage, transform: &PageTransform) {
        let target = transform.rect_to_view(self.bounds);

        match &self.body {
            AnnotationBody::Stamp(stamp) => draw_bitmap(canvas, target, &stamp.bitmap),
            AnnotationBody::Text(text) => {
                if let Some(background) = text.style.background {
                    fill_rect(canvas, target, background);
                }
            }
        }
    }
}

/// Pixel span of `rect` clipped to the canvas, as `(x0, y0, x1, y1)`.
fn clipped_span(canvas: &RgbaImage, rect: Rect) -> Option<(u32, u32, u32, u32)> {
    let (width, height) = canvas.dimensions();
    let x0 = rect.min_x().floor().max(0.0) as u32;
    let y0 = rect.min_y().floor().max(0.0) as u32;
    let x1 = (rect.max_x().ceil().max(0.0) as u32).min(width);
    let y1 = (rect.max_y().ceil().max(0.0) as u32).min(height);

    (x0 < x1 && y0 < y1).then_some((x0, y0, x1, y1))
}

fn blend(dst: &mut image::Rgba<u8>, src: [u8; 4]) {
    let alpha = src[3] as u32;
    if alpha == 0 {
        return;
    }
    for channel in 0..3 {
        let blended = (src[channel] as u32 * alpha + dst.0[channel] as u32 * (255 - alpha)) / 255;
        dst.0[channel] = blended as u8;
    }
    dst.0[3] = (alpha + dst.0[3] as u32 * (255 - alpha) / 255).min(255) as u8;
}

pub(crate) fn fill_rect(canvas: &mut RgbaImage, rect: Rect, color: Color) {
    let Some((x0, y0, x1, y1)) = clipped_span(canvas, rect) else {
        return;
    };
    let src = [color.r, color.g, color.b, color.a];
    for y in y0..y1 {
        for x in x0..x1 {
            blend(canvas.get_pixel_mut(x, y), src);
        }
    }
}

fn draw_bitmap(canvas: &mut RgbaImage, rect: Rect, bitmap: &RgbaImage) {
    let (source_width, source_height) = bitmap.dimensions();
    if source_width == 0 || source_height == 0 || rect.width <= 0.0 || rect.height <= 0.0 {
        return;
    }
    let Some((x0, y0, x1, y1)) = clipped_span(canvas, rect) else {
        return;
    };

    for y in y0..y1 {
        let v = ((y as f32 + 0.5 - rect.min_y()) / rect.height).clamp(0.0, 1.0);
        let sy = ((v * source_height as f32) as u32).min(source_height - 1);
        for x in x0..x1 {
            let u = ((x as f32 + 0.5 - rect.min_x()) / rect.width).clamp(0.0, 1.0);
            let sx = ((u * source_width as f32) as u32).min(source_width - 1);
            blend(canvas.get_pixel_mut(x, y), bitmap.get_pixel(sx, sy).0);
        }
    }
}

/// One document page and the annotations on it, bottom of the z-order first.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    index: usize,
    visible_box: Rect,
    annotations: Vec<Annotation>,
}

impl Page {
    pub fn new(index: usize, visible_box: Rect) -> Self {
        Self { index, visible_box, annotations: Vec::new() }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Crop box of the page in page space
    pub fn visible_box(&self) -> Rect {
        self.visible_box
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    /// Add an annotation on top of the z-order
    pub fn push(&mut self, annotation: Annotation) -> AnnotationId {
        let id = annotation.id();
        self.annotations.push(annotation);
        id
    }

    pub fn get(&self, id: AnnotationId) -> Option<&Annotation> {
        self.annotations.iter().find(|annotation| annotation.id() == id)
    }

    pub fn get_mut(&mut self, id: AnnotationId) -> Option<&mut Annotation> {
        self.annotations.iter_mut().find(|annotation| annotation.id() == id)
    }

    pub fn remove(&mut self, id: AnnotationId) -> Option<Annotation> {
        let position = self.annotations.iter().position(|annotation| annotation.id() == id)?;
        Some(self.annotations.remove(position))
    }

    /// Topmost annotation whose bounds contain `point`
    pub fn hit_test(&self, point: Point) -> Option<AnnotationId> {
        self.annotations
            .iter()
            .rev()
            .find(|annotation| annotation.hit_test(point))
            .map(Annotation::id)
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }
}
