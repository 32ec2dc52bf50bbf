use std::path::PathBuf;

use thiserror::Error;

mod worker;

// Re-export types from library crates
pub use pdf_margins::{
    CancellationToken, DocumentEvent, ExportOptions, MarginConfig, MarginError, PageInk,
};
pub use worker::worker_task;

/// Commands sent from UI to worker
#[derive(Debug)]
pub enum PdfCommand {
    /// Open a PDF, or a PNG/JPEG as a one-page document
    Load {
        path: PathBuf,
    },
    SetMarginConfig {
        doc_id: DocumentId,
        page_index: usize,
        config: MarginConfig,
    },
    SetInk {
        doc_id: DocumentId,
        page_index: usize,
        ink: PageInk,
    },
    CompositePage {
        doc_id: DocumentId,
        page_index: usize,
        supersample: f32,
    },
    Export {
        doc_id: DocumentId,
        options: ExportOptions,
        output_path: PathBuf,
    },
    /// Stop the running export between pages
    CancelExport,
    Close {
        doc_id: DocumentId,
    },
}

/// Updates sent from worker to UI
#[derive(Debug, Clone)]
pub enum PdfUpdate {
    Loaded {
        doc_id: DocumentId,
        page_count: usize,
    },
    /// Annotation state of a page changed
    DocumentChanged {
        doc_id: DocumentId,
        event: DocumentEvent,
    },
    PageComposited {
        doc_id: DocumentId,
        page_index: usize,
        width: usize,
        height: usize,
        rgba_data: Vec<u8>,
    },
    ExportComplete {
        path: PathBuf,
        pages: usize,
    },
    ExportCancelled,
    Closed {
        doc_id: DocumentId,
    },
    Error {
        message: String,
    },
}

/// Handle to a loaded document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentId(pub u64);

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Unknown document {0:?}")]
    UnknownDocument(DocumentId),
    #[error("An export is already running")]
    ExportInProgress,
    #[error(transparent)]
    Engine(#[from] MarginError),
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}
