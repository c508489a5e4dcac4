//! Editor facade: document lifecycle around an [`AnnotationSurface`]
//!
//! Owns the PDF engine and the surface, and turns engine failures into
//! [`EditorError`]s the host can show via [`crate::Notice`].

use crate::annotation::{Bitmap, TextSpec};
use crate::config::EditorConfig;
use crate::document::Document;
use crate::error::EditorError;
use crate::surface::AnnotationSurface;
use pdf_engine::{LopdfEngine, OpenSource, PdfEngine, RenderRequest, RgbaImage};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Receives the serialized document when the user prints.
pub trait PrintService {
    fn print(&mut self, title: &str, pdf: &[u8]);
}

pub struct Editor<E: PdfEngine = LopdfEngine> {
    engine: E,
    surface: AnnotationSurface,
}

impl Editor<LopdfEngine> {
    pub fn with_default_engine(config: EditorConfig) -> Self {
        Self::new(pdf_engine::default_engine(), config)
    }
}

impl<E: PdfEngine> Editor<E> {
    pub fn new(engine: E, config: EditorConfig) -> Self {
        Self { engine, surface: AnnotationSurface::new(config) }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn surface(&self) -> &AnnotationSurface {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut AnnotationSurface {
        &mut self.surface
    }

    pub fn document(&self) -> Option<&Document> {
        self.surface.document()
    }

    pub fn open_document(&mut self, path: impl AsRef<Path>) -> Result<(), EditorError> {
        let path = path.as_ref();
        let document = Document::load(&mut self.engine, OpenSource::from(path)).map_err(|source| {
            tracing::error!(path = %path.display(), error = %source, "failed to open document");
            EditorError::DocumentLoadFailure { path: path.to_path_buf(), source }
        })?;
        self.replace_document(Some(document));
        Ok(())
    }

    pub fn open_bytes(&mut self, bytes: Vec<u8>) -> Result<(), EditorError> {
        let document = Document::load(&mut self.engine, OpenSource::Bytes(bytes)).map_err(|source| {
            tracing::error!(error = %source, "failed to open in-memory document");
            EditorError::DocumentLoadFailure { path: PathBuf::from("<memory>"), source }
        })?;
        self.replace_document(Some(document));
        Ok(())
    }

    pub fn close(&mut self) {
        self.replace_document(None);
    }

    /// Write the document with its current annotations to `path`.
    pub fn save_document(&mut self, path: impl AsRef<Path>) -> Result<(), EditorError> {
        let path = path.as_ref();
        let document = self.surface.document().ok_or(EditorError::NoActiveDocument)?;

        document.save(&self.engine, self.surface.measurer(), path).map_err(|source| {
            tracing::error!(path = %path.display(), error = %source, "failed to save document");
            EditorError::SaveFailure { path: path.to_path_buf(), source }
        })?;

        if let Some(document) = self.surface.document_mut() {
            document.set_path(path);
        }
        Ok(())
    }

    pub fn print_document(&self, printer: &mut dyn PrintService) -> Result<(), EditorError> {
        let document = self.surface.document().ok_or(EditorError::NoActiveDocument)?;
        let bytes = document
            .to_bytes(&self.engine, self.surface.measurer())
            .map_err(EditorError::PrintFailure)?;

        tracing::info!(title = %document.title(), size = bytes.len(), "sending document to printer");
        printer.print(&document.title(), &bytes);
        Ok(())
    }

    pub fn arm_text_placement(&mut self, spec: TextSpec) -> Result<(), EditorError> {
        self.require_document()?;
        self.surface.arm_text_placement(spec);
        Ok(())
    }

    /// Arm text placement with the configured default content and style.
    pub fn arm_default_text_placement(&mut self) -> Result<(), EditorError> {
        let spec = self.surface.config().default_text.clone();
        self.arm_text_placement(spec)
    }

    pub fn arm_image_placement(&mut self, bitmap: Bitmap) -> Result<(), EditorError> {
        self.require_document()?;
        self.surface.arm_image_placement(bitmap);
        Ok(())
    }

    /// Decode an image file and arm it for placement.
    ///
    /// Decode failures are logged and leave placement untouched.
    pub fn arm_image_placement_from_path(&mut self, path: impl AsRef<Path>) -> Result<(), EditorError> {
        self.require_document()?;
        let path = path.as_ref();

        let bitmap = image::open(path)
            .map_err(|source| {
                tracing::warn!(path = %path.display(), error = %source, "could not decode image");
                EditorError::ImageDecodeFailure { path: path.to_path_buf(), source }
            })?
            .to_rgba8();

        tracing::debug!(path = %path.display(), size = ?bitmap.dimensions(), "decoded stamp image");
        self.surface.arm_image_placement(Arc::new(bitmap));
        Ok(())
    }

    pub fn adjust_font_size(&mut self, delta: f32) -> Result<f32, EditorError> {
        self.require_document()?;
        self.surface.adjust_font_size(delta)
    }

    /// Page raster at the current zoom with annotations and selection drawn on top.
    pub fn render_page(&self, page_index: usize) -> Result<RgbaImage, EditorError> {
        let document = self.surface.document().ok_or(EditorError::NoActiveDocument)?;
        if page_index >= document.page_count() {
            return Err(EditorError::PageOutOfRange { page: page_index, page_count: document.page_count() });
        }

        let request =
            RenderRequest { page_index: page_index as u32, scale: self.surface.layout().zoom() };
        let mut canvas = self
            .engine
            .render_page(document.handle(), request)
            .map_err(|source| EditorError::RenderFailure { page: page_index, source })?;

        self.surface.render_page(page_index, &mut canvas);
        Ok(canvas)
    }

    fn require_document(&self) -> Result<(), EditorError> {
        self.surface.document().map(|_| ()).ok_or(EditorError::NoActiveDocument)
    }

    fn replace_document(&mut self, document: Option<Document>) {
        if let Some(previous) = self.surface.set_document(document) {
            if let Err(error) = self.engine.close(previous.handle()) {
                tracing::warn!(%error, "failed to release previous document");
            }
        }
    }
}
