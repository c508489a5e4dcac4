//! PDF document provider for the annotation editor.
//!
//! Opens documents, reports page boxes, produces page rasters and reads/writes
//! the native annotation objects the editor manages (`/FreeText` and image
//! `/Stamp` annotations).

mod native;

#[cfg(any(test, feature = "test-support"))]
pub mod fixtures;

pub use native::{NativeAnnotation, NativeFreeText, NativeStamp, PageAnnotations};

use image::{ImageBuffer, Rgba};
use lopdf::{Document, ObjectId};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub type RgbaImage = ImageBuffer<Rgba<u8>, Vec<u8>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentHandle(u64);

impl DocumentHandle {
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Rectangle in PDF user space (origin bottom-left, y up, points).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl PageBox {
    pub const LETTER: PageBox = PageBox { x: 0.0, y: 0.0, width: 612.0, height: 792.0 };

    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Build a normalized box from two opposite corners.
    pub fn from_corners(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x: x0.min(x1), y: y0.min(y1), width: (x1 - x0).abs(), height: (y1 - y0).abs() }
    }

    pub fn max_x(&self) -> f32 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f32 {
        self.y + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderRequest {
    pub page_index: u32,
    pub scale: f32,
}

impl Default for RenderRequest {
    fn default() -> Self {
        Self { page_index: 0, scale: 1.0 }
    }
}

#[derive(Debug, Clone)]
pub enum OpenSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl From<PathBuf> for OpenSource {
    fn from(value: PathBuf) -> Self {
        Self::Path(value)
    }
}

impl From<&Path> for OpenSource {
    fn from(value: &Path) -> Self {
        Self::Path(value.to_path_buf())
    }
}

impl From<Vec<u8>> for OpenSource {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PdfEngineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF parse error: {0}")]
    Parse(#[from] lopdf::Error),
    #[error("invalid handle {0}")]
    InvalidHandle(u64),
    #[error("page {page} out of range (page_count={page_count})")]
    PageOutOfRange { page: u32, page_count: u32 },
    #[error("encrypted PDFs are not supported in the default backend")]
    EncryptedUnsupported,
    #[error("backend error: {0}")]
    Backend(String),
}

pub trait PdfEngine {
    fn open(&mut self, source: OpenSource) -> Result<DocumentHandle, PdfEngineError>;
    fn page_count(&self, handle: DocumentHandle) -> Result<u32, PdfEngineError>;
    /// Visible box of a page: CropBox when present, otherwise MediaBox.
    fn page_box(&self, handle: DocumentHandle, page_index: u32) -> Result<PageBox, PdfEngineError>;
    fn render_page(
        &self,
        handle: DocumentHandle,
        request: RenderRequest,
    ) -> Result<RgbaImage, PdfEngineError>;
    /// Editor-managed annotations of a page, bottom of the z-order first.
    fn annotations(
        &self,
        handle: DocumentHandle,
        page_index: u32,
    ) -> Result<Vec<NativeAnnotation>, PdfEngineError>;
    /// Serialize the document with its managed annotations replaced by `pages`.
    fn write_to_bytes(
        &self,
        handle: DocumentHandle,
        pages: &[PageAnnotations],
    ) -> Result<Vec<u8>, PdfEngineError>;
    fn write(
        &self,
        handle: DocumentHandle,
        pages: &[PageAnnotations],
        path: &Path,
    ) -> Result<(), PdfEngineError> {
        let bytes = self.write_to_bytes(handle, pages)?;
        fs::write(path, bytes)?;
        Ok(())
    }
    fn close(&mut self, handle: DocumentHandle) -> Result<(), PdfEngineError>;
}

#[derive(Debug, Clone)]
struct DocumentRecord {
    document: Document,
    page_ids: Vec<ObjectId>,
    page_boxes: Vec<PageBox>,
}

#[derive(Debug, Default)]
pub struct LopdfEngine {
    next_handle: u64,
    docs: HashMap<DocumentHandle, DocumentRecord>,
}

impl LopdfEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn parse(bytes: &[u8]) -> Result<DocumentRecord, PdfEngineError> {
        if bytes.windows("/Encrypt".len()).any(|window| window == b"/Encrypt") {
            return Err(PdfEngineError::EncryptedUnsupported);
        }

        let document = Document::load_mem(bytes)?;
        let page_ids: Vec<ObjectId> = document.get_pages().into_values().collect();

        if page_ids.is_empty() {
            return Err(PdfEngineError::Backend("document has no pages".to_owned()));
        }

        let page_boxes = page_ids
            .iter()
            .map(|page_id| {
                native::inherited_box(&document, *page_id, b"CropBox")
                    .or_else(|| native::inherited_box(&document, *page_id, b"MediaBox"))
                    .unwrap_or(PageBox::LETTER)
            })
            .collect();

        Ok(DocumentRecord { document, page_ids, page_boxes })
    }

    fn record(&self, handle: DocumentHandle) -> Result<&DocumentRecord, PdfEngineError> {
        self.docs.get(&handle).ok_or(PdfEngineError::InvalidHandle(handle.raw()))
    }

    fn page_id(&self, handle: DocumentHandle, page_index: u32) -> Result<ObjectId, PdfEngineError> {
        let record = self.record(handle)?;
        record.page_ids.get(page_index as usize).copied().ok_or(PdfEngineError::PageOutOfRange {
            page: page_index,
            page_count: record.page_ids.len() as u32,
        })
    }
}

impl PdfEngine for LopdfEngine {
    fn open(&mut self, source: OpenSource) -> Result<DocumentHandle, PdfEngineError> {
        let bytes = match source {
            OpenSource::Path(path) => fs::read(path)?,
            OpenSource::Bytes(bytes) => bytes,
        };

        let record = Self::parse(&bytes)?;

        self.next_handle += 1;
        let handle = DocumentHandle(self.next_handle);
        tracing::debug!(handle = handle.raw(), pages = record.page_ids.len(), "opened document");
        self.docs.insert(handle, record);

        Ok(handle)
    }

    fn page_count(&self, handle: DocumentHandle) -> Result<u32, PdfEngineError> {
        Ok(self.record(handle)?.page_ids.len() as u32)
    }

    fn page_box(&self, handle: DocumentHandle, page_index: u32) -> Result<PageBox, PdfEngineError> {
        let record = self.record(handle)?;
        record.page_boxes.get(page_index as usize).copied().ok_or(PdfEngineError::PageOutOfRange {
            page: page_index,
            page_count: record.page_boxes.len() as u32,
        })
    }

    fn render_page(
        &self,
        handle: DocumentHandle,
        request: RenderRequest,
    ) -> Result<RgbaImage, PdfEngineError> {
        let page_box = self.page_box(handle, request.page_index)?;
        let scale = if request.scale <= 0.0 { 1.0 } else { request.scale };

        let width = (page_box.width * scale).round().max(1.0) as u32;
        let height = (page_box.height * scale).round().max(1.0) as u32;

        let mut image = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));

        if width >= 4 && height >= 4 {
            for x in 0..width {
                image.put_pixel(x, 0, Rgba([220, 220, 220, 255]));
                image.put_pixel(x, height - 1, Rgba([220, 220, 220, 255]));
            }
            for y in 0..height {
                image.put_pixel(0, y, Rgba([220, 220, 220, 255]));
                image.put_pixel(width - 1, y, Rgba([220, 220, 220, 255]));
            }
        }

        Ok(image)
    }

    fn annotations(
        &self,
        handle: DocumentHandle,
        page_index: u32,
    ) -> Result<Vec<NativeAnnotation>, PdfEngineError> {
        let page_id = self.page_id(handle, page_index)?;
        let record = self.record(handle)?;
        Ok(native::read_page_annotations(&record.document, page_id))
    }

    fn write_to_bytes(
        &self,
        handle: DocumentHandle,
        pages: &[PageAnnotations],
    ) -> Result<Vec<u8>, PdfEngineError> {
        let record = self.record(handle)?;
        let mut document = record.document.clone();

        for (index, page_id) in record.page_ids.iter().enumerate() {
            let annotations = pages
                .iter()
                .find(|page| page.page_index as usize == index)
                .map(|page| page.annotations.as_slice())
                .unwrap_or(&[]);
            native::replace_page_annotations(&mut document, *page_id, annotations)?;
        }

        document.prune_objects();

        let mut bytes = Vec::new();
        document.save_to(&mut bytes)?;
        tracing::debug!(handle = handle.raw(), size = bytes.len(), "serialized document");
        Ok(bytes)
    }

    fn close(&mut self, handle: DocumentHandle) -> Result<(), PdfEngineError> {
        self.docs.remove(&handle).map(|_| ()).ok_or(PdfEngineError::InvalidHandle(handle.raw()))
    }
}

pub fn default_engine() -> LopdfEngine {
    LopdfEngine::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn open_blank(engine: &mut LopdfEngine, sizes: &[(f32, f32)]) -> DocumentHandle {
        engine
            .open(OpenSource::Bytes(fixtures::blank_pdf(sizes)))
            .expect("open should succeed")
    }

    fn free_text(contents: &str) -> NativeAnnotation {
        NativeAnnotation::FreeText(NativeFreeText {
            rect: PageBox::new(100.0, 200.0, 120.0, 40.0),
            contents: contents.to_owned(),
            font_family: "Helvetica".to_owned(),
            font_size: 18.0,
            text_color: [1.0, 0.0, 0.0],
            background: Some([1.0, 1.0, 0.0]),
            printable: true,
            lines: vec![contents.to_owned()],
            line_height: 21.6,
        })
    }

    #[test]
    fn opens_pdf_and_reads_page_count() {
        let mut engine = LopdfEngine::new();
        let handle = open_blank(&mut engine, &[(612.0, 792.0), (300.0, 400.0)]);

        assert_eq!(engine.page_count(handle).expect("count should succeed"), 2);
        assert_eq!(
            engine.page_box(handle, 1).expect("box should resolve"),
            PageBox::new(0.0, 0.0, 300.0, 400.0)
        );
    }

    #[test]
    fn render_page_matches_page_box_at_scale() {
        let mut engine = LopdfEngine::new();
        let handle = open_blank(&mut engine, &[(200.0, 100.0)]);

        let image = engine
            .render_page(handle, RenderRequest { page_index: 0, scale: 2.0 })
            .expect("page should render");

        assert_eq!(image.dimensions(), (400, 200));
    }

    #[test]
    fn invalid_handle_returns_error() {
        let engine = LopdfEngine::new();
        let err =
            engine.page_count(DocumentHandle(999)).expect_err("should fail for unknown handle");

        assert!(matches!(err, PdfEngineError::InvalidHandle(999)));
    }

    #[test]
    fn page_out_of_range_is_reported() {
        let mut engine = LopdfEngine::new();
        let handle = open_blank(&mut engine, &[(612.0, 792.0)]);

        let err = engine.page_box(handle, 3).expect_err("page 3 does not exist");
        assert!(matches!(err, PdfEngineError::PageOutOfRange { page: 3, page_count: 1 }));
    }

    #[test]
    fn rejects_garbage_bytes() {
        let mut engine = LopdfEngine::new();
        let err = engine
            .open(OpenSource::Bytes(b"not a pdf".to_vec()))
            .expect_err("garbage should not parse");

        assert!(matches!(err, PdfEngineError::Parse(_)));
    }

    #[test]
    fn written_free_text_reads_back() {
        let mut engine = LopdfEngine::new();
        let handle = open_blank(&mut engine, &[(612.0, 792.0)]);

        let bytes = engine
            .write_to_bytes(
                handle,
                &[PageAnnotations { page_index: 0, annotations: vec![free_text("Héllo (1)")] }],
            )
            .expect("write should succeed");

        let reopened = engine.open(OpenSource::Bytes(bytes)).expect("reopen should succeed");
        let annotations = engine.annotations(reopened, 0).expect("annotations should load");

        assert_eq!(annotations.len(), 1);
        let NativeAnnotation::FreeText(text) = &annotations[0] else {
            panic!("expected free text");
        };
        assert_eq!(text.contents, "Héllo (1)");
        assert_eq!(text.font_family, "Helvetica");
        assert!((text.font_size - 18.0).abs() < 0.01);
        assert_eq!(text.text_color, [1.0, 0.0, 0.0]);
        assert_eq!(text.background, Some([1.0, 1.0, 0.0]));
        assert!(text.printable);
        assert!((text.rect.x - 100.0).abs() < 0.01);
        assert!((text.rect.height - 40.0).abs() < 0.01);
    }

    #[test]
    fn written_stamp_reads_back_with_pixels() {
        let mut engine = LopdfEngine::new();
        let handle = open_blank(&mut engine, &[(612.0, 792.0)]);

        let mut bitmap = RgbaImage::from_pixel(4, 2, Rgba([10, 20, 30, 255]));
        bitmap.put_pixel(3, 1, Rgba([200, 100, 50, 128]));
        let stamp = NativeAnnotation::Stamp(NativeStamp {
            rect: PageBox::new(50.0, 60.0, 96.0, 48.0),
            image: Arc::new(bitmap),
            printable: true,
        });

        let bytes = engine
            .write_to_bytes(handle, &[PageAnnotations { page_index: 0, annotations: vec![stamp] }])
            .expect("write should succeed");

        let reopened = engine.open(OpenSource::Bytes(bytes)).expect("reopen should succeed");
        let annotations = engine.annotations(reopened, 0).expect("annotations should load");

        let NativeAnnotation::Stamp(stamp) = &annotations[0] else {
            panic!("expected stamp");
        };
        assert_eq!(stamp.image.dimensions(), (4, 2));
        assert_eq!(*stamp.image.get_pixel(0, 0), Rgba([10, 20, 30, 255]));
        assert_eq!(*stamp.image.get_pixel(3, 1), Rgba([200, 100, 50, 128]));
        assert!((stamp.rect.width - 96.0).abs() < 0.01);
    }

    #[test]
    fn rewriting_replaces_previous_managed_annotations() {
        let mut engine = LopdfEngine::new();
        let handle = open_blank(&mut engine, &[(612.0, 792.0)]);

        let first = engine
            .write_to_bytes(
                handle,
                &[PageAnnotations {
                    page_index: 0,
                    annotations: vec![free_text("one"), free_text("two")],
                }],
            )
            .expect("write should succeed");
        let reopened = engine.open(OpenSource::Bytes(first)).expect("reopen should succeed");

        let second = engine
            .write_to_bytes(
                reopened,
                &[PageAnnotations { page_index: 0, annotations: vec![free_text("three")] }],
            )
            .expect("rewrite should succeed");
        let final_handle = engine.open(OpenSource::Bytes(second)).expect("reopen should succeed");

        let annotations = engine.annotations(final_handle, 0).expect("annotations should load");
        assert_eq!(annotations.len(), 1);
        assert!(matches!(&annotations[0], NativeAnnotation::FreeText(text) if text.contents == "three"));
    }

    #[test]
    fn write_to_path_creates_file() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let path = temp.path().join("annotated.pdf");
        let mut engine = LopdfEngine::new();
        let handle = open_blank(&mut engine, &[(612.0, 792.0)]);

        engine.write(handle, &[], &path).expect("write should succeed");
        let reopened = engine.open(OpenSource::from(path.as_path())).expect("reopen should succeed");
        assert_eq!(engine.page_count(reopened).expect("count should succeed"), 1);
    }
}
