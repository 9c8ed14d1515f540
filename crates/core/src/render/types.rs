//! Types for document rendering.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::notify::Attachment;
use crate::source::{CandidateLot, TrackedEntity};

/// Errors that can occur while rendering a document.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to write document {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("PDF generation failed: {0}")]
    Pdf(String),

    #[error("Render task failed: {0}")]
    Task(String),
}

/// A rendered file on local storage.
///
/// The file is removed when the guard is dropped, whatever happened to it
/// in between. A failed removal is logged and otherwise ignored.
#[derive(Debug)]
pub struct RenderedDocument {
    path: PathBuf,
    file_name: String,
    content_type: String,
}

impl RenderedDocument {
    pub fn new(
        path: impl Into<PathBuf>,
        file_name: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            file_name: file_name.into(),
            content_type: content_type.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Name shown to recipients.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Describe the file as a notification attachment.
    pub fn attachment(&self) -> Attachment {
        Attachment {
            path: self.path.clone(),
            file_name: self.file_name.clone(),
            content_type: self.content_type.clone(),
        }
    }
}

impl Drop for RenderedDocument {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Removed rendered document"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to remove rendered document"
            ),
        }
    }
}

/// Trait for document renderers.
pub trait DocumentRenderer: Send + Sync {
    /// Backend name for logs and metrics.
    fn name(&self) -> &str;

    /// Render the application document for a lot found under `entity`.
    fn render(
        &self,
        entity: &TrackedEntity,
        lot: &CandidateLot,
    ) -> Result<RenderedDocument, RenderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_removes_file_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        std::fs::write(&path, b"data").unwrap();

        let doc = RenderedDocument::new(&path, "Заявка.pdf", "application/pdf");
        assert!(doc.path().exists());
        drop(doc);

        assert!(!path.exists());
    }

    #[test]
    fn test_guard_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.pdf");

        let doc = RenderedDocument::new(&path, "Заявка.pdf", "application/pdf");
        drop(doc);
    }

    #[test]
    fn test_attachment_carries_display_name() {
        let doc = RenderedDocument::new("/nonexistent/abc.pdf", "Заявка.pdf", "application/pdf");
        let attachment = doc.attachment();
        assert_eq!(attachment.file_name, "Заявка.pdf");
        assert_eq!(attachment.content_type, "application/pdf");
        assert_eq!(attachment.path, PathBuf::from("/nonexistent/abc.pdf"));
    }
}
