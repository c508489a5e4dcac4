//! Editor errors and the user-facing notices derived from them

use crate::config::ConfigError;
use pdf_engine::PdfEngineError;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error("could not open {}: {source}", path.display())]
    DocumentLoadFailure {
        path: PathBuf,
        #[source]
        source: PdfEngineError,
    },
    #[error("could not save {}: {source}", path.display())]
    SaveFailure {
        path: PathBuf,
        #[source]
        source: PdfEngineError,
    },
    #[error("could not prepare the document for printing: {0}")]
    PrintFailure(#[source] PdfEngineError),
    #[error("could not render page {page}: {source}")]
    RenderFailure {
        page: usize,
        #[source]
        source: PdfEngineError,
    },
    #[error("no document is open")]
    NoActiveDocument,
    #[error("select a text annotation first")]
    NoEligibleSelection,
    #[error("could not decode image {}: {source}", path.display())]
    ImageDecodeFailure {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("page {page} does not exist (document has {page_count} pages)")]
    PageOutOfRange { page: usize, page_count: usize },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Severity levels with different presentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation failed
    Error,
    /// Operation partially failed but the editor continues
    Warning,
    /// Notification of an issue that was handled
    Info,
}

impl Severity {
    /// Get the display title for this severity level
    pub fn title(&self) -> &'static str {
        match self {
            Severity::Error => "Error",
            Severity::Warning => "Warning",
            Severity::Info => "Notice",
        }
    }
}

/// Message a host should show to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub severity: Severity,
    pub title: String,
    pub message: String,
}

impl Notice {
    /// Notice for an error, or `None` when the failure is only logged.
    ///
    /// Image decode failures fall in the second group: the placement is
    /// simply not armed.
    pub fn from_error(error: &EditorError) -> Option<Notice> {
        let (severity, title) = match error {
            EditorError::DocumentLoadFailure { .. } => (Severity::Error, "Unable to Open Document"),
            EditorError::SaveFailure { .. } => (Severity::Error, "Unable to Save Document"),
            EditorError::PrintFailure(_) => (Severity::Error, "Unable to Print Document"),
            EditorError::RenderFailure { .. } => (Severity::Warning, "Unable to Render Page"),
            EditorError::NoActiveDocument => (Severity::Info, "No Document"),
            EditorError::NoEligibleSelection => (Severity::Info, "No Text Annotation Selected"),
            EditorError::PageOutOfRange { .. } => (Severity::Warning, "Page Not Found"),
            EditorError::Config(_) => (Severity::Warning, "Settings Not Loaded"),
            EditorError::ImageDecodeFailure { .. } => return None,
        };

        Some(Notice { severity, title: title.to_owned(), message: error.to_string() })
    }
}
