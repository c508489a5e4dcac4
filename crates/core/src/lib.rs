//! Stampdesk Core Library
//!
//! Interactive annotation layer for PDF documents: placing free-text boxes
//! and image stamps, selecting, moving, resizing and inline editing them.

pub mod annotation;
pub mod config;
pub mod document;
pub mod editor;
pub mod error;
pub mod geometry;
pub mod layout;
pub mod manipulation;
pub mod overlay;
pub mod surface;
pub mod text_edit;
pub mod view;

pub use annotation::{
    Annotation, AnnotationBody, AnnotationId, Bitmap, Color, FontSpec, Page, ParseColorError,
    StampBody, TextBody, TextSpec, TextStyle,
};
pub use config::{ConfigError, ConfigStore, EditorConfig};
pub use document::Document;
pub use editor::{Editor, PrintService};
pub use error::{EditorError, Notice, Severity};
pub use geometry::{
    clamp_to_page, handle_rects, hit_test_handle, resized_bounds, Handle, HandleRects, Point,
    Rect, Size, HANDLE_HIT_SLOP, HANDLE_SIZE, MINIMUM_ANNOTATION_SIZE,
};
pub use layout::{MetricTextMeasurer, TextMeasurer, TextMetrics};
pub use manipulation::{DragKind, DragState};
pub use overlay::SelectionOverlay;
pub use surface::{
    AnnotationSurface, CursorHint, EventDisposition, PendingPlacement, PlacementKind, Selection,
    SurfaceEvent,
};
pub use text_edit::{EditOutcome, EditSession, EditSnapshot, InlineTextEditor};
pub use view::{PageTransform, ViewLayout};
