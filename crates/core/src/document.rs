//! Open document: pages and the annotations the editor manages on them
//!
//! Loading pulls page boxes and existing free-text/stamp annotations from the
//! PDF engine. Saving hands the current annotation set back to the engine,
//! which rewrites the managed annotations of every page.

use crate::annotation::{Annotation, AnnotationBody, AnnotationId, Color, FontSpec, Page, TextStyle};
use crate::geometry::Rect;
use crate::layout::TextMeasurer;
use pdf_engine::{
    DocumentHandle, NativeAnnotation, NativeFreeText, NativeStamp, OpenSource, PageAnnotations,
    PageBox, PdfEngine, PdfEngineError,
};
use std::path::{Path, PathBuf};

/// Gap between a text box edge and its laid-out lines, in points.
const TEXT_INSET: f32 = 2.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    handle: DocumentHandle,
    path: Option<PathBuf>,
    pages: Vec<Page>,
}

impl Document {
    pub fn load(engine: &mut dyn PdfEngine, source: OpenSource) -> Result<Self, PdfEngineError> {
        let path = match &source {
            OpenSource::Path(path) => Some(path.clone()),
            OpenSource::Bytes(_) => None,
        };

        let handle = engine.open(source)?;
        let page_count = engine.page_count(handle)?;

        let mut pages = Vec::with_capacity(page_count as usize);
        for page_index in 0..page_count {
            let visible_box = rect_from_box(engine.page_box(handle, page_index)?);
            let mut page = Page::new(page_index as usize, visible_box);
            for native in engine.annotations(handle, page_index)? {
                page.push(annotation_from_native(native));
            }
            pages.push(page);
        }

        tracing::info!(
            pages = pages.len(),
            annotations = pages.iter().map(Page::len).sum::<usize>(),
            path = ?path,
            "loaded document"
        );

        Ok(Self { handle, path, pages })
    }

    pub fn handle(&self) -> DocumentHandle {
        self.handle
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn set_path(&mut self, path: impl Into<PathBuf>) {
        self.path = Some(path.into());
    }

    /// Display title: file name, or "Untitled" for in-memory documents
    pub fn title(&self) -> String {
        self.path
            .as_deref()
            .and_then(Path::file_name)
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Untitled".to_owned())
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page(&self, index: usize) -> Option<&Page> {
        self.pages.get(index)
    }

    pub fn page_mut(&mut self, index: usize) -> Option<&mut Page> {
        self.pages.get_mut(index)
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn annotation_count(&self) -> usize {
        self.pages.iter().map(Page::len).sum()
    }

    /// Page index and annotation for an id
    pub fn find(&self, id: AnnotationId) -> Option<(usize, &Annotation)> {
        self.pages
            .iter()
            .find_map(|page| page.get(id).map(|annotation| (page.index(), annotation)))
    }

    /// Annotations of every page in engine form.
    pub fn to_native(&self, measurer: &dyn TextMeasurer) -> Vec<PageAnnotations> {
        self.pages
            .iter()
            .map(|page| PageAnnotations {
                page_index: page.index() as u32,
                annotations: page
                    .annotations()
                    .iter()
                    .map(|annotation| native_from_annotation(annotation, measurer))
                    .collect(),
            })
            .collect()
    }

    pub fn to_bytes(
        &self,
        engine: &dyn PdfEngine,
        measurer: &dyn TextMeasurer,
    ) -> Result<Vec<u8>, PdfEngineError> {
        engine.write_to_bytes(self.handle, &self.to_native(measurer))
    }

    pub fn save(
        &self,
        engine: &dyn PdfEngine,
        measurer: &dyn TextMeasurer,
        path: &Path,
    ) -> Result<(), PdfEngineError> {
        engine.write(self.handle, &self.to_native(measurer), path)?;
        tracing::info!(path = %path.display(), annotations = self.annotation_count(), "saved document");
        Ok(())
    }
}

fn rect_from_box(page_box: PageBox) -> Rect {
    Rect::new(page_box.x, page_box.y, page_box.width, page_box.height)
}

fn box_from_rect(rect: Rect) -> PageBox {
    PageBox::new(rect.x, rect.y, rect.width, rect.height)
}

fn annotation_from_native(native: NativeAnnotation) -> Annotation {
    match native {
        NativeAnnotation::FreeText(text) => {
            let style = TextStyle {
                font: FontSpec::new(text.font_family, text.font_size),
                text_color: Color::from_normalized_rgb(text.text_color),
                background: text.background.map(Color::from_normalized_rgb),
                multiline: true,
                printable: text.printable,
            };
            Annotation::text(rect_from_box(text.rect), text.contents, style)
        }
        NativeAnnotation::Stamp(stamp) => {
            let mut annotation = Annotation::stamp(rect_from_box(stamp.rect), stamp.image);
            annotation.set_printable(stamp.printable);
            annotation
        }
    }
}

fn native_from_annotation(annotation: &Annotation, measurer: &dyn TextMeasurer) -> NativeAnnotation {
    let rect = box_from_rect(annotation.bounds());

    match annotation.body() {
        AnnotationBody::Text(text) => {
            let font = &text.style.font;
            let lines = if text.style.multiline {
                let width = (annotation.bounds().width - TEXT_INSET * 2.0).max(0.0);
                measurer.layout_lines(&text.contents, font, Some(width))
            } else {
                measurer.layout_lines(&text.contents, font, None)
            };

            NativeAnnotation::FreeText(NativeFreeText {
                rect,
                contents: text.contents.clone(),
                font_family: font.family.clone(),
                font_size: font.size,
                text_color: text.style.text_color.to_normalized_rgb(),
                background: text.style.background.map(|color| color.to_normalized_rgb()),
                printable: text.style.printable,
                lines,
                line_height: measurer.line_height(font),
            })
        }
        AnnotationBody::Stamp(stamp) => NativeAnnotation::Stamp(NativeStamp {
            rect,
            image: stamp.bitmap.clone(),
            printable: stamp.printable,
        }),
    }
}
