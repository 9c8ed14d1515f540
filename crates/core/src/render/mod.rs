//! Application document rendering.
//!
//! This module provides a `DocumentRenderer` trait and a PDF backend. A
//! rendered file is owned by a `RenderedDocument` guard that deletes it
//! when dropped.

mod pdf;
mod types;

pub use pdf::{application_lines, DocumentLine, PdfRenderer};
pub use types::*;
