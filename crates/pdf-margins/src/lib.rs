//! Margin canvases, ink compositing and N-up export for paginated documents
//!
//! A page can be shrunk inside a larger canvas so the space around it can
//! be drawn on. This crate resolves that geometry, converts ink between
//! view, canvas and document space, composites the page with its two ink
//! layers, lays pages out N-up and exports whole documents.

pub mod constants;
mod document;
pub mod export;
pub mod geometry;
mod ink;
pub mod layout;
mod options;
pub mod render;
mod stats;
pub mod store;
mod types;

pub use document::{AnnotatedDocument, ChangeKind, DocumentEvent, DocumentSnapshot};
pub use export::{
    CancellationToken, RenderedPage, composite_single, export_document, export_document_sync,
    export_to_bytes, load_pdf, print_sheets, save_pdf,
};
pub use ink::*;
pub use options::*;
pub use stats::calculate_statistics;
pub use store::{ImagePage, ImagePageStore, PageStore, PdfPageStore};
pub use types::*;
